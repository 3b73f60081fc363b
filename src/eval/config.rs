use std::path::PathBuf;

use crate::dataloader::config::DataLoaderConfig;
use crate::dataloader::transform::{Compose, CIFAR10_MEAN, CIFAR10_STD, RGB_CHANNELS};
use crate::inference::onnx::SessionOptions;
use crate::inference::provider::ExecutionProviderKind;

use super::error::EvalError;

pub const DEFAULT_MODEL_PATH: &str = "pretrained/efficientnetv2_rw_t_quant_0.onnx";
pub const DEFAULT_ITERATIONS: usize = 2;

#[derive(Clone, Debug)]
pub struct EvalConfig {
    pub model_path: PathBuf,
    pub providers: Vec<ExecutionProviderKind>,
    pub session: SessionOptions,
    pub loader: DataLoaderConfig,
    pub iterations: usize,
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
    pub progress: bool,
}

impl EvalConfig {
    pub fn build(self) -> Result<Self, EvalError> {
        if self.iterations == 0 {
            return Err(EvalError::InvalidConfig("iterations must be at least 1".into()));
        }
        if self.providers.is_empty() {
            return Err(EvalError::InvalidConfig("at least one execution provider is required".into()));
        }
        if self.mean.len() != self.std.len() {
            return Err(EvalError::InvalidConfig(format!(
                "mean has {} channels but std has {}",
                self.mean.len(),
                self.std.len()
            )));
        }
        // Both file datasets decode to RGB
        if self.mean.len() != RGB_CHANNELS {
            return Err(EvalError::InvalidConfig(format!(
                "normalization needs {} channel statistics, got {}",
                RGB_CHANNELS,
                self.mean.len()
            )));
        }
        let loader = self.loader.build()?;

        Ok(Self { loader, ..self })
    }

    /// Preprocessing applied after tensor conversion.
    pub fn transform(&self) -> Result<Compose, EvalError> {
        Ok(Compose::normalized(&self.mean, &self.std)?)
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            providers: ExecutionProviderKind::DEFAULT_PRIORITY.to_vec(),
            session: SessionOptions::default(),
            loader: DataLoaderConfig::default(),
            iterations: DEFAULT_ITERATIONS,
            mean: CIFAR10_MEAN.to_vec(),
            std: CIFAR10_STD.to_vec(),
            progress: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_reference_run() {
        let config = EvalConfig::default().build().unwrap();
        assert_eq!(config.iterations, 2);
        assert_eq!(config.loader.batch_size, 1024);
        assert_eq!(config.providers, vec![ExecutionProviderKind::Cuda, ExecutionProviderKind::Cpu]);
        assert!(config.transform().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let zero_iterations = EvalConfig { iterations: 0, ..Default::default() };
        assert!(zero_iterations.build().is_err());

        let no_providers = EvalConfig { providers: Vec::new(), ..Default::default() };
        assert!(no_providers.build().is_err());

        let ragged = EvalConfig { mean: vec![0.5], ..Default::default() };
        assert!(ragged.build().is_err());

        let single_channel = EvalConfig { mean: vec![0.5], std: vec![0.5], ..Default::default() };
        assert!(matches!(single_channel.build(), Err(EvalError::InvalidConfig(ref msg)) if msg.contains("3 channel")));

        let bad_loader = EvalConfig {
            loader: DataLoaderConfig { batch_size: 0, ..Default::default() },
            ..Default::default()
        };
        assert!(matches!(bad_loader.build(), Err(EvalError::DataLoader(_))));
    }
}
