//! Outcome classification.
//!
//! The single decision point the search controller consults after every
//! probe. Everything here is pure: no I/O, no re-probing.

use serde::Serialize;

use crate::constants::{PLATEAU_THRESHOLD_DEFAULT, TRUNCATION_THRESHOLD_DEFAULT};
use crate::probe::ProbeOutcome;

/// Verdict for a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// The server honored the request and capacity kept growing.
    Ok,
    /// The server silently consumed less input than it was given.
    Truncated,
    /// Capacity stopped growing meaningfully over the previous best.
    Plateaued,
    /// The call itself failed.
    Failed,
}

impl Classification {
    pub fn label(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Truncated => "TRUNCATED",
            Self::Plateaued => "PLATEAU",
            Self::Failed => "FAILED",
        }
    }
}

/// Tunable ratios behind the verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    /// Input below `requested * truncation` is truncation.
    pub truncation: f64,
    /// Tokens at or below `previous_best * plateau` is a plateau.
    pub plateau: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            truncation: TRUNCATION_THRESHOLD_DEFAULT,
            plateau: PLATEAU_THRESHOLD_DEFAULT,
        }
    }
}

impl Thresholds {
    /// Whether `observed` input falls short of `requested`.
    pub fn is_truncated(&self, observed: u64, requested: u64) -> bool {
        (observed as f64) < requested as f64 * self.truncation
    }

    /// Whether `observed` fails to clear `previous_best` by the plateau ratio.
    pub fn is_plateau(&self, observed: u64, previous_best: u64) -> bool {
        (observed as f64) <= previous_best as f64 * self.plateau
    }

    /// Classify an input-capacity probe.
    ///
    /// `requested` is the approximate size of the prompt that was sent.
    /// `previous_best` is `None` for the first probe of a regime, or when the
    /// regime has no plateau rule; a plateau is never reported without one.
    pub fn classify_context(
        &self,
        outcome: &ProbeOutcome,
        requested: u64,
        previous_best: Option<u64>,
    ) -> Classification {
        let Some(observed) = outcome.input_tokens() else {
            return Classification::Failed;
        };
        if self.is_truncated(observed, requested) {
            return Classification::Truncated;
        }
        match previous_best {
            Some(best) if self.is_plateau(observed, best) => Classification::Plateaued,
            _ => Classification::Ok,
        }
    }

    /// Classify an output-budget probe.
    ///
    /// A plateau needs both a short answer (`output < budget`) and no
    /// meaningful growth over `previous_best`.
    pub fn classify_output(
        &self,
        outcome: &ProbeOutcome,
        budget: u64,
        previous_best: u64,
    ) -> Classification {
        let Some(observed) = outcome.output_tokens() else {
            return Classification::Failed;
        };
        if observed < budget && self.is_plateau(observed, previous_best) {
            Classification::Plateaued
        } else {
            Classification::Ok
        }
    }
}
