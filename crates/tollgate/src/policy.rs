//! Score-threshold decision policy.

use tollgate_common::constants::SCORE_THRESHOLD;
use tollgate_common::{Decision, RejectReason, VerificationResult};

use crate::config::AppConfig;

/// Turns a siteverify answer into a verdict
#[derive(Debug, Clone)]
pub struct ScorePolicy {
    /// Lowest accepted score (inclusive)
    threshold: f64,
    /// Handed to accepted clients
    redirect_url: String,
}

impl ScorePolicy {
    pub fn new(redirect_url: impl Into<String>) -> Self {
        Self {
            threshold: SCORE_THRESHOLD,
            redirect_url: redirect_url.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.redirect_url.clone())
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Decide on a verification result.
    ///
    /// Never accepts without a comparable score. A score equal to the
    /// threshold is accepted.
    pub fn decide(&self, result: &VerificationResult) -> Decision {
        if !result.success {
            return Decision::Rejected {
                reason: RejectReason::VerificationFailed,
                score: result.score,
            };
        }

        match result.score {
            None => Decision::Rejected {
                reason: RejectReason::MissingScore,
                score: None,
            },
            Some(score) if score < self.threshold => Decision::Rejected {
                reason: RejectReason::LowScore,
                score: Some(score),
            },
            Some(score) => Decision::Accepted {
                score,
                redirect: self.redirect_url.clone(),
            },
        }
    }
}
