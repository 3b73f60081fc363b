use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};

use crate::dataloader::dataloader::DataLoader;
use crate::dataloader::dataset::Dataset;
use crate::inference::error::InferenceError;
use crate::inference::onnx::OnnxSession;
use crate::inference::session::InferenceSession;

use super::config::EvalConfig;
use super::error::EvalError;
use super::metrics::LabelPairs;

/// Outcome of one pass over the dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalReport {
    pub accuracy: f64,
    pub evaluated_samples: usize,
    pub processed_batches: usize,
    pub skipped_batches: usize,
    pub total_batches: usize,
}

fn progress_bar(total: usize, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let style = ProgressStyle::with_template("{bar:40} {pos}/{len} batches [{elapsed_precise}<{eta_precise}]")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::new(total as u64).with_style(style)
}

/// Runs every batch of one pass through `session` and reduces the
/// predictions to top-1 accuracy.
///
/// A batch that fails in a recoverable way is logged and skipped, which
/// shrinks the sample count behind the reported accuracy. Anything else
/// aborts the pass.
pub fn evaluate<D, S>(loader: &DataLoader<D>, session: &mut S, progress: bool) -> Result<EvalReport, EvalError>
where
    D: Dataset + 'static,
    S: InferenceSession + ?Sized,
{
    let batches = loader.iter();
    let total_batches = batches.len();
    let pb = progress_bar(total_batches, progress);

    let mut pairs = LabelPairs::with_capacity(total_batches * loader.config().batch_size);
    let mut processed_batches = 0;
    let mut skipped_batches = 0;

    for (batch_idx, batch) in batches.enumerate() {
        let outcome = batch.map_err(EvalError::from).and_then(|batch| {
            let scores = session.run(&batch)?;
            pairs.record_batch(&batch.labels, &scores)?;
            Ok(())
        });

        match outcome {
            Ok(()) => processed_batches += 1,
            Err(e) if e.is_recoverable() => {
                warn!("Skipping batch {}: {}", batch_idx, e);
                skipped_batches += 1;
            }
            Err(e) => {
                pb.abandon();
                return Err(e);
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let accuracy = pairs.accuracy()?;
    if skipped_batches > 0 {
        warn!(
            "{} of {} batches skipped, accuracy covers {} samples",
            skipped_batches,
            total_batches,
            pairs.len()
        );
    }

    Ok(EvalReport {
        accuracy,
        evaluated_samples: pairs.len(),
        processed_batches,
        skipped_batches,
        total_batches,
    })
}

/// Opens an ONNX session for `config.model_path`, evaluates one pass and
/// releases the session on every path out.
pub fn evaluate_model<D: Dataset + 'static>(loader: &DataLoader<D>, config: &EvalConfig) -> Result<EvalReport, EvalError> {
    let mut session = OnnxSession::load(&config.model_path, &config.providers, &config.session)?;
    let report = evaluate(loader, &mut session, config.progress);
    session.close();
    report
}

fn repeat<F, R>(iterations: usize, mut run_once: F, mut on_report: R) -> Result<Vec<EvalReport>, EvalError>
where
    F: FnMut() -> Result<EvalReport, EvalError>,
    R: FnMut(usize, &EvalReport),
{
    let mut reports = Vec::with_capacity(iterations);
    for iteration in 0..iterations {
        debug!("Starting iteration {}", iteration);
        let report = run_once()?;
        info!(
            "Iteration {}: accuracy {:.4} over {} samples",
            iteration, report.accuracy, report.evaluated_samples
        );
        on_report(iteration, &report);
        reports.push(report);
    }
    Ok(reports)
}

/// Repeats the whole pipeline `iterations` times with a fresh session and a
/// reset seed each time, handing every report to `on_report` as it lands.
pub fn run_iterations<D, S, F, R>(
    loader: &DataLoader<D>,
    iterations: usize,
    progress: bool,
    mut open_session: F,
    on_report: R,
) -> Result<Vec<EvalReport>, EvalError>
where
    D: Dataset + 'static,
    S: InferenceSession,
    F: FnMut() -> Result<S, InferenceError>,
    R: FnMut(usize, &EvalReport),
{
    repeat(
        iterations,
        || {
            let mut session = open_session()?;
            evaluate(loader, &mut session, progress)
        },
        on_report,
    )
}

/// [`evaluate_model`] repeated `config.iterations` times.
pub fn run_model_iterations<D, R>(loader: &DataLoader<D>, config: &EvalConfig, on_report: R) -> Result<Vec<EvalReport>, EvalError>
where
    D: Dataset + 'static,
    R: FnMut(usize, &EvalReport),
{
    repeat(config.iterations, || evaluate_model(loader, config), on_report)
}
