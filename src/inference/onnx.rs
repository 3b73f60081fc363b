//! [`InferenceSession`] backed by ONNX Runtime through the `ort` crate.

use std::path::{Path, PathBuf};

use log::{debug, info};
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::{Tensor, ValueType};

use crate::dataloader::data_batch::DataBatch;

use super::error::InferenceError;
use super::provider::{open_with_fallback, ExecutionProviderKind, OptimizationLevel};
use super::session::{check_input_shape, InferenceSession, Scores};

#[derive(Clone, Debug, Default)]
pub struct SessionOptions {
    pub optimization_level: OptimizationLevel,
    /// Threads used within an operator; `None` leaves the runtime default.
    pub intra_threads: Option<usize>,
}

/// Name and declared shape of the model's first input.
struct InputSpec {
    name: String,
    dimensions: Vec<i64>,
    ty: TensorElementType,
}

impl InputSpec {
    fn from_value_type(name: &str, vt: &ValueType) -> Result<Self, String> {
        match vt {
            ValueType::Tensor { ty, shape, .. } => Ok(InputSpec {
                name: name.to_string(),
                dimensions: shape.iter().copied().collect(),
                ty: *ty,
            }),
            _ => Err(format!("unsupported input type: {:?}", vt)),
        }
    }
}

/// A loaded model bound to exactly one execution provider.
///
/// The runtime session is released when this value is dropped, so an early
/// return out of an evaluation still frees it.
pub struct OnnxSession {
    session: Session,
    input: InputSpec,
    provider: ExecutionProviderKind,
    model_path: PathBuf,
}

fn build_session(
    model_path: &Path,
    provider: ExecutionProviderKind,
    options: &SessionOptions,
) -> Result<Session, ort::Error> {
    let mut builder = Session::builder()?
        .with_optimization_level(options.optimization_level.to_ort())?
        .with_execution_providers([provider.dispatch()])?;
    if let Some(threads) = options.intra_threads {
        builder = builder.with_intra_threads(threads)?;
    }
    builder.commit_from_file(model_path)
}

impl OnnxSession {
    /// Loads `model_path` on the first provider of `preferred_providers` that
    /// registers. Fails with [`InferenceError::ModelLoad`] when the file is
    /// missing or unreadable, or when no listed provider can run it.
    pub fn load(
        model_path: &Path,
        preferred_providers: &[ExecutionProviderKind],
        options: &SessionOptions,
    ) -> Result<Self, InferenceError> {
        let load_error = |reason: String| InferenceError::ModelLoad {
            path: model_path.display().to_string(),
            reason,
        };

        if !model_path.is_file() {
            return Err(load_error("file not found".to_string()));
        }

        let (provider, session) = open_with_fallback(preferred_providers, ExecutionProviderKind::is_available, |provider| {
            build_session(model_path, provider, options)
        })
        .map_err(load_error)?;

        let first_input = session
            .inputs
            .first()
            .ok_or_else(|| load_error("model has no inputs".to_string()))?;
        let input = InputSpec::from_value_type(&first_input.name, &first_input.input_type).map_err(load_error)?;
        if session.outputs.is_empty() {
            return Err(load_error("model has no outputs".to_string()));
        }

        info!(
            "Loaded {} on {} (input '{}' {:?} {:?})",
            model_path.display(),
            provider,
            input.name,
            input.dimensions,
            input.ty
        );

        Ok(OnnxSession {
            session,
            input,
            provider,
            model_path: model_path.to_owned(),
        })
    }

    pub fn provider(&self) -> ExecutionProviderKind {
        self.provider
    }

    pub fn input_dimensions(&self) -> &[i64] {
        &self.input.dimensions
    }

    /// Releases the runtime session.
    pub fn close(self) {
        drop(self);
    }
}

impl InferenceSession for OnnxSession {
    fn run(&mut self, batch: &DataBatch) -> Result<Scores, InferenceError> {
        if self.input.ty != TensorElementType::Float32 {
            return Err(InferenceError::ShapeMismatch {
                expected: format!("{:?} input", self.input.ty),
                actual: "Float32 input".to_string(),
            });
        }
        let shape = batch.shape();
        check_input_shape(&self.input.dimensions, &shape)?;

        let dimensions: Vec<i64> = shape.iter().map(|&d| d as i64).collect();
        let tensor = Tensor::from_array((dimensions, batch.data.clone()))
            .map_err(|e| InferenceError::Run(format!("failed to create input tensor: {}", e)))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input.name.as_str() => tensor])
            .map_err(|e| InferenceError::from_run_failure(e.to_string()))?;

        let (out_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Run(e.to_string()))?;

        Scores::from_output(out_shape, data, batch.samples_in_batch)
    }
}

impl Drop for OnnxSession {
    fn drop(&mut self) {
        debug!("Releasing ONNX session for {}", self.model_path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_fails_before_touching_the_runtime() {
        let result = OnnxSession::load(
            Path::new("/no/such/model.onnx"),
            &ExecutionProviderKind::DEFAULT_PRIORITY,
            &SessionOptions::default(),
        );
        assert!(matches!(result, Err(InferenceError::ModelLoad { .. })));
    }

    #[test]
    fn no_usable_provider_is_a_model_load_error() {
        let model = tempfile::NamedTempFile::new().unwrap();
        let result = OnnxSession::load(model.path(), &[], &SessionOptions::default());
        match result {
            Err(InferenceError::ModelLoad { reason, .. }) => {
                assert_eq!(reason, "no execution provider available out of []")
            }
            _ => panic!("expected a model load error"),
        }
    }
}
