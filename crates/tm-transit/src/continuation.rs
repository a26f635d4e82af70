//! Stop-by-stop continuation decisions for open-ended riders.

use tm_core::AgentRng;

use crate::{TransitError, TransitResult};

/// A bounded Markov chain over "consecutive stops ridden".
///
/// With probabilities `[p0, …, pN-1]` and current index `i`, a rider keeps
/// riding iff a uniform draw `r` satisfies `r < p[i]`.  Continuing advances
/// `i` (saturating at `N-1`); stopping resets it to 0.
#[derive(Clone, Debug, PartialEq)]
pub struct ContinuationModel {
    probs: Vec<f64>,
    index: usize,
}

impl ContinuationModel {
    /// Fails on an empty table or a probability outside `[0, 1]`.
    pub fn new(probs: Vec<f64>) -> TransitResult<Self> {
        Self::check(&probs)?;
        Ok(Self { probs, index: 0 })
    }

    pub(crate) fn check(probs: &[f64]) -> TransitResult<()> {
        if probs.is_empty() {
            return Err(TransitError::Config("continuation probability table is empty".into()));
        }
        if let Some(p) = probs.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(TransitError::Config(format!(
                "continuation probability {p} is outside [0, 1]"
            )));
        }
        Ok(())
    }

    /// Decide with an explicit draw `r ∈ [0, 1)`.
    pub fn continue_trip(&mut self, r: f64) -> bool {
        if r < self.probs[self.index] {
            if self.index + 1 < self.probs.len() {
                self.index += 1;
            }
            true
        } else {
            self.index = 0;
            false
        }
    }

    /// Decide with a draw from the rider's own RNG.
    pub fn decide(&mut self, rng: &mut AgentRng) -> bool {
        let r = rng.unit();
        self.continue_trip(r)
    }

    /// Consecutive stops ridden so far (saturated).
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probs
    }
}
