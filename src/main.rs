//! Evaluates an ONNX image classifier on a labeled dataset and prints the
//! top-1 accuracy of every run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use onnx_eval::dataloader::cifar10::{Cifar10Dataset, Cifar10Split};
use onnx_eval::dataloader::config::{DataLoaderConfig, DEFAULT_SHUFFLE_SEED};
use onnx_eval::dataloader::dataloader::DataLoader;
use onnx_eval::dataloader::dataset::Dataset;
use onnx_eval::dataloader::imagesdir::ImageFolderDataset;
use onnx_eval::dataloader::info::log_dataset_info;
use onnx_eval::eval::config::{EvalConfig, DEFAULT_ITERATIONS, DEFAULT_MODEL_PATH};
use onnx_eval::eval::evaluator::run_model_iterations;
use onnx_eval::inference::onnx::SessionOptions;
use onnx_eval::inference::provider::{ExecutionProviderKind, OptimizationLevel};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DatasetFormat {
    /// CIFAR-10 binary batches
    Cifar10,
    /// One sub-directory of images per class
    ImageFolder,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Split {
    Train,
    Test,
}

/// Top-1 accuracy of an ONNX image classifier
#[derive(Parser, Debug)]
#[command(name = "onnx_eval", version)]
struct Args {
    /// Path to the .onnx model
    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    model: PathBuf,

    /// Dataset root directory
    #[arg(long)]
    data_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = DatasetFormat::Cifar10)]
    dataset_format: DatasetFormat,

    /// CIFAR-10 split to evaluate
    #[arg(long, value_enum, default_value_t = Split::Test)]
    split: Split,

    #[arg(long, default_value_t = 1024)]
    batch_size: usize,

    #[arg(long, default_value_t = DEFAULT_SHUFFLE_SEED)]
    seed: u64,

    /// Evaluate in dataset order
    #[arg(long)]
    no_shuffle: bool,

    /// Keep the final partial batch
    #[arg(long)]
    keep_last: bool,

    /// Number of full evaluation runs
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,

    /// Execution providers in order of preference
    #[arg(long, value_delimiter = ',', default_value = "cuda,cpu")]
    providers: Vec<ExecutionProviderKind>,

    /// Data loading threads, 0 loads on the main thread
    #[arg(long)]
    workers: Option<usize>,

    /// Batches loaded ahead of inference
    #[arg(long, default_value_t = 4)]
    prefetch: usize,

    /// Per-channel normalization mean
    #[arg(long, value_delimiter = ',')]
    mean: Option<Vec<f32>>,

    /// Per-channel normalization standard deviation
    #[arg(long, value_delimiter = ',')]
    std: Option<Vec<f32>>,

    /// disable, basic, extended or all
    #[arg(long, default_value = "all")]
    optimization_level: OptimizationLevel,

    /// Intra-op threads for the runtime
    #[arg(long)]
    intra_threads: Option<usize>,

    #[arg(long)]
    no_progress: bool,
}

impl Args {
    fn eval_config(&self) -> Result<EvalConfig> {
        let defaults = EvalConfig::default();
        let loader = DataLoaderConfig {
            prefetch_count: self.prefetch,
            batch_size: self.batch_size,
            num_workers: self.workers.unwrap_or(defaults.loader.num_workers),
            shuffle: !self.no_shuffle,
            shuffle_seed: Some(self.seed),
            drop_last: !self.keep_last,
        };

        let config = EvalConfig {
            model_path: self.model.clone(),
            providers: self.providers.clone(),
            session: SessionOptions {
                optimization_level: self.optimization_level,
                intra_threads: self.intra_threads,
            },
            loader,
            iterations: self.iterations,
            mean: self.mean.clone().unwrap_or(defaults.mean),
            std: self.std.clone().unwrap_or(defaults.std),
            progress: !self.no_progress,
        };

        Ok(config.build()?)
    }
}

fn evaluate_dataset<D: Dataset + 'static>(dataset: D, config: &EvalConfig) -> Result<()> {
    let loader = DataLoader::new(dataset, config.loader.clone()).context("failed to set up the data loader")?;
    log_dataset_info(&loader);

    run_model_iterations(&loader, config, |_, report| println!("{}", report.accuracy))
        .with_context(|| format!("evaluation of {} failed", config.model_path.display()))?;

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.eval_config()?;
    let transform = Box::new(config.transform()?);

    match args.dataset_format {
        DatasetFormat::Cifar10 => {
            let split = match args.split {
                Split::Train => Cifar10Split::Train,
                Split::Test => Cifar10Split::Test,
            };
            let dataset = Cifar10Dataset::new(&args.data_dir, split, transform)
                .with_context(|| format!("failed to load CIFAR-10 from {}", args.data_dir.display()))?;
            evaluate_dataset(dataset, &config)
        }
        DatasetFormat::ImageFolder => {
            let dataset = ImageFolderDataset::new(&args.data_dir, transform)
                .with_context(|| format!("failed to load images from {}", args.data_dir.display()))?;
            evaluate_dataset(dataset, &config)
        }
    }
}
