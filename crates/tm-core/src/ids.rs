//! Typed integer identifiers.
//!
//! The inner integer is `pub`; use `.index()` when an id addresses a `Vec`.

use std::fmt;

macro_rules! typed_id {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(pub u32);

        impl $name {
            /// Placeholder for "no id"; also the `Default`.
            pub const INVALID: $name = $name(u32::MAX);

            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

typed_id! {
    /// A movement agent, vehicle or traveller.  Handed out by the run
    /// context's counter and never reused within a run.
    AgentId
}

typed_id! {
    /// Map-graph node.
    NodeId
}

typed_id! {
    /// Directed map-graph edge.
    EdgeId
}

typed_id! {
    /// A transit route; each route has exactly one control system.
    RouteId
}
