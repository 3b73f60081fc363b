use thiserror::Error;

use crate::dataloader::error::DataLoaderError;
use crate::inference::error::InferenceError;

use super::metrics::MetricError;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error(transparent)]
    DataLoader(#[from] DataLoaderError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Metric(#[from] MetricError),

    #[error("Invalid evaluation config: {0}")]
    InvalidConfig(String),
}

impl EvalError {
    /// Whether a failure on one batch may be skipped without aborting the run.
    pub fn is_recoverable(&self) -> bool {
        match self {
            EvalError::DataLoader(e) => e.is_recoverable(),
            EvalError::Inference(e) => e.is_recoverable(),
            EvalError::Metric(e) => matches!(e, MetricError::LengthMismatch { .. }),
            EvalError::InvalidConfig(_) => false,
        }
    }
}
