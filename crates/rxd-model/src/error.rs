//! Error types for rxd-model.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown particle type: {0}")]
    UnknownParticleType(String),

    #[error("particle type registered twice: {0}")]
    DuplicateParticleType(String),

    #[error("reaction {0}: negative rate {1}")]
    NegativeRate(String, f64),

    #[error("reaction {0}: weights {1} and {2} must lie in [0, 1] and sum to 1")]
    InvalidWeights(String, f64, f64),

    #[error("reaction {0}: negative distance {1}")]
    NegativeDistance(String, f64),
}

pub type Result<T> = std::result::Result<T, ModelError>;
