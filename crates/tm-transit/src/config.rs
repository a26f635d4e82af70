//! Transit tuning parameters.
//!
//! Every field has a default, so a TOML `[transit]` table only needs the
//! values it changes:
//!
//! ```toml
//! [transit]
//! walk_speed          = [0.8, 1.4]
//! vehicle_node_types  = [1]
//! continuation_probs  = [0.9, 0.6, 0.3]
//! ```

use serde::{Deserialize, Serialize};

use tm_core::SimDuration;
use tm_spatial::NodeTypeFilter;

use crate::{TransitError, TransitResult};

/// Per-run transit configuration shared by the factories.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitConfig {
    /// Node types vehicles may drive through.  Empty means every type.
    pub vehicle_node_types: Vec<u8>,

    /// Node types travellers may walk through.  Empty means every type.
    pub walk_node_types: Vec<u8>,

    /// Walking speed range `[min, max]` in m/s; each traveller leg draws
    /// uniformly from it.
    pub walk_speed: [f64; 2],

    /// How far behind its timetable (seconds) a vehicle may be before the
    /// drift is reported as a schedule-data warning.
    pub schedule_slack_s: f64,

    /// Leg duration (seconds) used when a vehicle is so late that the time
    /// left until its scheduled arrival is not positive.
    pub min_leg_s: f64,

    /// Speed range `[min, max]` in m/s for loop-route vehicles.
    pub loop_speed: [f64; 2],

    /// Dwell range `[min, max]` in seconds for loop-route vehicles.
    pub loop_dwell_s: [f64; 2],

    /// Continuation probabilities for open-ended riders, indexed by the
    /// number of consecutive stops already ridden (saturating).
    pub continuation_probs: Vec<f64>,
}

impl Default for TransitConfig {
    fn default() -> Self {
        Self {
            vehicle_node_types: Vec::new(),
            walk_node_types:    Vec::new(),
            walk_speed:         [0.8, 1.4],
            schedule_slack_s:   1.0,
            min_leg_s:          1.0,
            loop_speed:         [7.0, 10.0],
            loop_dwell_s:       [10.0, 30.0],
            continuation_probs: vec![0.5],
        }
    }
}

impl TransitConfig {
    /// Reject values no agent can run with.
    pub fn validate(&self) -> TransitResult<()> {
        check_range("walk_speed", self.walk_speed, true)?;
        check_range("loop_speed", self.loop_speed, true)?;
        check_range("loop_dwell_s", self.loop_dwell_s, false)?;
        if !(self.schedule_slack_s.is_finite() && self.schedule_slack_s >= 0.0) {
            return Err(TransitError::Config(format!(
                "schedule_slack_s must be a non-negative number, got {}",
                self.schedule_slack_s
            )));
        }
        if !(self.min_leg_s.is_finite() && self.min_leg_s > 0.0) {
            return Err(TransitError::Config(format!(
                "min_leg_s must be positive, got {}",
                self.min_leg_s
            )));
        }
        crate::ContinuationModel::check(&self.continuation_probs)
    }

    pub fn vehicle_filter(&self) -> NodeTypeFilter {
        filter_for(&self.vehicle_node_types)
    }

    pub fn walk_filter(&self) -> NodeTypeFilter {
        filter_for(&self.walk_node_types)
    }

    pub fn schedule_slack(&self) -> SimDuration {
        SimDuration::from_secs_f64(self.schedule_slack_s)
    }
}

fn filter_for(types: &[u8]) -> NodeTypeFilter {
    if types.is_empty() {
        NodeTypeFilter::any()
    } else {
        NodeTypeFilter::only(types)
    }
}

fn check_range(name: &str, [lo, hi]: [f64; 2], strictly_positive: bool) -> TransitResult<()> {
    let lo_ok = if strictly_positive { lo > 0.0 } else { lo >= 0.0 };
    if lo.is_finite() && hi.is_finite() && lo_ok && hi >= lo {
        Ok(())
    } else {
        Err(TransitError::Config(format!("{name} must be an ordered range, got [{lo}, {hi}]")))
    }
}
