//! Error types for cadenza-core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Scale degree out of range: {0} (expected 1-7)")]
    InvalidDegree(u8),
    #[error("Tempo must be positive, got {0}")]
    InvalidTempo(f64),
}

pub type Result<T> = std::result::Result<T, CoreError>;
