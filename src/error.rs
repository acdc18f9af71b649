//! Error type shared by every stage of the sampler.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ArsError>;

/**
Every way a call to the sampler can fail.

Failures are fatal: no partial sample vector is ever returned alongside an
error. Recoverable conditions (equal or reversed bounds, candidates outside
the bounds, singular initial points) are reported through `tracing` warnings
instead and never surface here.
*/
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArsError {
    /// Bounds were not given as exactly two values, or one of them is NaN.
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),

    /// An initial abscissa does not lie strictly inside the bounds.
    #[error("initial point {point} lies outside the bounds ({lower}, {upper})")]
    InitialPointOutOfBounds { point: f64, lower: f64, upper: f64 },

    /// Every initial point produced a non-finite log density or derivative.
    #[error("the log density or its derivative is non-finite at every initial point")]
    AllInitialPointsInvalid,

    /// The derivative of the log density is not strictly decreasing.
    #[error(
        "log density is not concave: derivative {right_slope} at x = {right} \
         is not below derivative {left_slope} at x = {left}"
    )]
    NotLogConcave {
        left: f64,
        left_slope: f64,
        right: f64,
        right_slope: f64,
    },

    /// The exponentiated upper hull cannot be normalized over the domain.
    #[error("upper hull is not integrable: {0}")]
    UnboundedEnvelope(String),

    /// The upper hull integrates to zero (or to a non-finite value).
    #[error("upper hull has no probability mass (total = {0})")]
    ZeroMassEnvelope(f64),

    /// The adaptive loop did not collect enough samples in time.
    #[error("gave up after {iterations} iterations with {accepted} of {requested} samples")]
    MaxIterationsExceeded {
        iterations: usize,
        accepted: usize,
        requested: usize,
    },
}

impl ArsError {
    /// True for the errors raised while checking caller input, before any
    /// sampling takes place.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            ArsError::InvalidBounds(_)
                | ArsError::InitialPointOutOfBounds { .. }
                | ArsError::AllInitialPointsInvalid
        )
    }
}
