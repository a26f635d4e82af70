//! Simulation time model.
//!
//! # Design
//!
//! Time is an integer count of **milliseconds** since the simulation epoch.
//! Timetables arrive as fractional seconds and are converted once at load
//! time:
//!
//!   sim_time_ms = round(seconds * 1000)
//!
//! Using an integer as the canonical time unit means all schedule arithmetic
//! is exact (no floating-point drift), event times can key a `BTreeMap`, and
//! comparisons are O(1).  Speeds stay `f64` (metres per second) because they
//! are only ever used to derive a duration, which is rounded back to whole
//! milliseconds.

use std::fmt;

// ── SimTime ──────────────────────────────────────────────────────────────────

/// An absolute simulation timestamp, in milliseconds since the epoch.
///
/// Signed so that "departure − now" deltas can be expressed without
/// wrapping when an agent is behind its timetable.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SimTime(pub i64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    /// Convert external fractional seconds to a timestamp (rounded to ms).
    #[inline]
    pub fn from_secs_f64(secs: f64) -> SimTime {
        SimTime((secs * 1000.0).round() as i64)
    }

    #[inline]
    pub fn from_secs(secs: i64) -> SimTime {
        SimTime(secs * 1000)
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Signed milliseconds from `earlier` to `self` (negative if `self` is
    /// before `earlier`).
    #[inline]
    pub fn delta_ms(self, earlier: SimTime) -> i64 {
        self.0 - earlier.0
    }

    /// Signed seconds from `earlier` to `self`.
    #[inline]
    pub fn delta_secs(self, earlier: SimTime) -> f64 {
        self.delta_ms(earlier) as f64 / 1000.0
    }
}

impl std::ops::Add<SimDuration> for SimTime {
    type Output = SimTime;
    #[inline]
    fn add(self, rhs: SimDuration) -> SimTime {
        SimTime(self.0.saturating_add(rhs.0.min(i64::MAX as u64) as i64))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={:.3}s", self.as_secs_f64())
    }
}

// ── SimDuration ──────────────────────────────────────────────────────────────

/// A non-negative span of simulated time, in milliseconds.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SimDuration(pub u64);

impl SimDuration {
    pub const ZERO: SimDuration = SimDuration(0);

    #[inline]
    pub fn from_millis(ms: u64) -> SimDuration {
        SimDuration(ms)
    }

    #[inline]
    pub fn from_secs(secs: u64) -> SimDuration {
        SimDuration(secs * 1000)
    }

    /// Convert fractional seconds, rounding up so an agent never arrives
    /// before the correct millisecond.  Negative and NaN inputs clamp to zero.
    #[inline]
    pub fn from_secs_f64(secs: f64) -> SimDuration {
        if secs.is_nan() || secs <= 0.0 {
            return SimDuration::ZERO;
        }
        SimDuration((secs * 1000.0).ceil() as u64)
    }

    /// Clamp a signed millisecond delta at zero.
    #[inline]
    pub fn from_delta_ms(ms: i64) -> SimDuration {
        SimDuration(ms.max(0) as u64)
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for SimDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// The driver's notion of "now".
///
/// `SimClock` is cheap to copy and intentionally holds no heap data.  It only
/// ever moves forward.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    /// Current simulated time.
    pub now: SimTime,
}

impl SimClock {
    pub fn new(start: SimTime) -> Self {
        Self { now: start }
    }

    /// Move the clock to `t`.  Earlier timestamps are ignored so the clock
    /// stays monotonic.
    #[inline]
    pub fn advance_to(&mut self, t: SimTime) {
        if t > self.now {
            self.now = t;
        }
    }

    /// Break the current time into (day, hour, minute) components from the
    /// epoch.  Useful for human-readable logging without a datetime library.
    pub fn elapsed_dhm(&self) -> (u64, u32, u32) {
        let total_secs = (self.now.0.max(0) / 1000) as u64;
        let days = total_secs / 86_400;
        let hours = ((total_secs % 86_400) / 3_600) as u32;
        let minutes = ((total_secs % 3_600) / 60) as u32;
        (days, hours, minutes)
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (d, h, m) = self.elapsed_dhm();
        write!(f, "{} (day {} {:02}:{:02})", self.now, d, h, m)
    }
}

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// Top-level run configuration.
///
/// Typically loaded from a TOML file by the application crate and passed to
/// the simulation driver.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    /// Time at which every agent receives its first wait-time request.
    pub start: SimTime,

    /// The run stops once the next event lies beyond this time.
    pub end: SimTime,

    /// Master RNG seed.  The same seed always produces identical results.
    pub seed: u64,

    /// How long an agent that produced no path waits before being asked
    /// again.  Plays the role of the host update interval.
    pub retry_interval: SimDuration,
}

impl SimConfig {
    /// Reject configurations the driver cannot run.
    pub fn validate(&self) -> crate::CoreResult<()> {
        if self.end < self.start {
            return Err(crate::CoreError::Config(format!(
                "end {} is before start {}",
                self.end, self.start
            )));
        }
        if self.retry_interval.is_zero() {
            return Err(crate::CoreError::Config(
                "retry_interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Construct a `SimClock` pre-configured for this run.
    pub fn make_clock(&self) -> SimClock {
        SimClock::new(self.start)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start:          SimTime::ZERO,
            end:            SimTime::from_secs(86_400),
            seed:           0,
            retry_interval: SimDuration::from_secs(1),
        }
    }
}
