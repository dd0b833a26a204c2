//! Error types for rxd-kernel.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("cannot remove entry {index}: only {active} active entries")]
    CompactionUnderflow { index: usize, active: usize },

    #[error("entry index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, KernelError>;
