//! Presentation layer tag shared by transit routes and the agents on them.
//!
//! The layer has no effect on routing; it tells visualisation and reporting
//! collaborators whether an agent is drawn on the street level or below it.

/// The layer an agent is currently shown on.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Layer {
    /// Street level: buses, trams, pedestrians (default).
    #[default]
    Surface,
    /// Metro and other underground rail.
    Underground,
}

impl Layer {
    /// Human-readable label, useful for log lines and report columns.
    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Surface     => "surface",
            Layer::Underground => "underground",
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
