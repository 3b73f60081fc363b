use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Failed to load model {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("Input shape mismatch: model expects {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Inference failed: {0}")]
    Run(String),

    #[error("Inference ran out of resources: {0}")]
    ResourceExhausted(String),

    #[error("Unknown {kind} '{value}'")]
    UnknownOption { kind: &'static str, value: String },
}

impl InferenceError {
    /// Errors that only concern the batch being run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, InferenceError::ShapeMismatch { .. } | InferenceError::Run(_))
    }

    /// Splits backend run failures into allocation failures, which will not
    /// go away on the next batch, and everything else.
    pub(crate) fn from_run_failure(message: String) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("out of memory") || lower.contains("failed to allocate") || lower.contains("bad_alloc") {
            InferenceError::ResourceExhausted(message)
        } else {
            InferenceError::Run(message)
        }
    }
}
