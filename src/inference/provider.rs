use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, CoreMLExecutionProvider, DirectMLExecutionProvider,
    ExecutionProvider, ExecutionProviderDispatch, TensorRTExecutionProvider,
};
use ort::session::builder::GraphOptimizationLevel;

use super::error::InferenceError;

/// Backends a session can be asked to run on, in the caller's order of preference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionProviderKind {
    Cuda,
    TensorRt,
    DirectMl,
    CoreMl,
    Cpu,
}

impl ExecutionProviderKind {
    pub const DEFAULT_PRIORITY: [ExecutionProviderKind; 2] = [ExecutionProviderKind::Cuda, ExecutionProviderKind::Cpu];

    pub fn name(&self) -> &'static str {
        match self {
            ExecutionProviderKind::Cuda => "cuda",
            ExecutionProviderKind::TensorRt => "tensorrt",
            ExecutionProviderKind::DirectMl => "directml",
            ExecutionProviderKind::CoreMl => "coreml",
            ExecutionProviderKind::Cpu => "cpu",
        }
    }

    /// Whether the linked ONNX Runtime build ships this provider.
    pub(crate) fn is_available(&self) -> bool {
        let available = match self {
            ExecutionProviderKind::Cuda => CUDAExecutionProvider::default().is_available(),
            ExecutionProviderKind::TensorRt => TensorRTExecutionProvider::default().is_available(),
            ExecutionProviderKind::DirectMl => DirectMLExecutionProvider::default().is_available(),
            ExecutionProviderKind::CoreMl => CoreMLExecutionProvider::default().is_available(),
            ExecutionProviderKind::Cpu => CPUExecutionProvider::default().is_available(),
        };

        match available {
            Ok(available) => available,
            Err(e) => {
                debug!("Could not query {} execution provider: {}", self.name(), e);
                false
            }
        }
    }

    pub(crate) fn dispatch(&self) -> ExecutionProviderDispatch {
        let dispatch = match self {
            ExecutionProviderKind::Cuda => CUDAExecutionProvider::default().build(),
            ExecutionProviderKind::TensorRt => TensorRTExecutionProvider::default().build(),
            ExecutionProviderKind::DirectMl => DirectMLExecutionProvider::default().build(),
            ExecutionProviderKind::CoreMl => CoreMLExecutionProvider::default().build(),
            ExecutionProviderKind::Cpu => CPUExecutionProvider::default().build(),
        };
        // A failed registration fails the build instead of silently running on the CPU
        dispatch.error_on_failure()
    }
}

/// Calls `open` with each provider of `preferred` that `available` reports,
/// in order, and returns the first one that opens.
///
/// A provider that is compiled in can still fail to register, for example
/// CUDA on a machine without a GPU, so a failed `open` moves on to the next
/// entry. The error names every provider that was tried.
pub fn open_with_fallback<T, E, F>(
    preferred: &[ExecutionProviderKind],
    available: impl Fn(&ExecutionProviderKind) -> bool,
    mut open: F,
) -> Result<(ExecutionProviderKind, T), String>
where
    E: fmt::Display,
    F: FnMut(ExecutionProviderKind) -> Result<T, E>,
{
    let mut failures = Vec::new();
    for &kind in preferred {
        if !available(&kind) {
            debug!("{} execution provider is not available, trying the next one", kind);
            continue;
        }
        match open(kind) {
            Ok(opened) => {
                debug!("Selected {} execution provider", kind);
                return Ok((kind, opened));
            }
            Err(e) => {
                warn!("{} execution provider failed, trying the next one: {}", kind, e);
                failures.push(format!("{}: {}", kind, e));
            }
        }
    }

    if failures.is_empty() {
        let names: Vec<&str> = preferred.iter().map(|k| k.name()).collect();
        Err(format!("no execution provider available out of [{}]", names.join(", ")))
    } else {
        Err(format!("every available execution provider failed ({})", failures.join("; ")))
    }
}

impl fmt::Display for ExecutionProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExecutionProviderKind {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cuda" => Ok(ExecutionProviderKind::Cuda),
            "tensorrt" | "trt" => Ok(ExecutionProviderKind::TensorRt),
            "directml" | "dml" => Ok(ExecutionProviderKind::DirectMl),
            "coreml" => Ok(ExecutionProviderKind::CoreMl),
            "cpu" => Ok(ExecutionProviderKind::Cpu),
            _ => Err(InferenceError::UnknownOption { kind: "execution provider", value: s.to_string() }),
        }
    }
}

/// Graph optimization applied when the session is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OptimizationLevel {
    Disable,
    Basic,
    Extended,
    #[default]
    All,
}

impl OptimizationLevel {
    pub(crate) fn to_ort(self) -> GraphOptimizationLevel {
        match self {
            OptimizationLevel::Disable => GraphOptimizationLevel::Disable,
            OptimizationLevel::Basic => GraphOptimizationLevel::Level1,
            OptimizationLevel::Extended => GraphOptimizationLevel::Level2,
            OptimizationLevel::All => GraphOptimizationLevel::Level3,
        }
    }
}

impl FromStr for OptimizationLevel {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disable" | "none" => Ok(OptimizationLevel::Disable),
            "basic" => Ok(OptimizationLevel::Basic),
            "extended" => Ok(OptimizationLevel::Extended),
            "all" => Ok(OptimizationLevel::All),
            _ => Err(InferenceError::UnknownOption { kind: "optimization level", value: s.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_down_the_list() {
        let preferred = [ExecutionProviderKind::Cuda, ExecutionProviderKind::TensorRt, ExecutionProviderKind::Cpu];
        let (selected, _) =
            open_with_fallback(&preferred, |k| *k == ExecutionProviderKind::Cpu, |k| Ok::<_, String>(k)).unwrap();
        assert_eq!(selected, ExecutionProviderKind::Cpu);
    }

    #[test]
    fn prefers_earlier_entries() {
        let preferred = [ExecutionProviderKind::Cuda, ExecutionProviderKind::Cpu];
        let (selected, _) = open_with_fallback(&preferred, |_| true, |k| Ok::<_, String>(k)).unwrap();
        assert_eq!(selected, ExecutionProviderKind::Cuda);
    }

    #[test]
    fn nothing_available_is_an_error() {
        let mut opened = 0;
        let reason = open_with_fallback(
            &[ExecutionProviderKind::Cuda, ExecutionProviderKind::Cpu],
            |_| false,
            |_| {
                opened += 1;
                Ok::<_, String>(())
            },
        )
        .unwrap_err();
        assert_eq!(reason, "no execution provider available out of [cuda, cpu]");
        assert_eq!(opened, 0);
    }

    #[test]
    fn registration_failure_moves_to_the_next_provider() {
        let mut tried = Vec::new();
        let (selected, session) = open_with_fallback(
            &[ExecutionProviderKind::Cuda, ExecutionProviderKind::Cpu],
            |_| true,
            |k| {
                tried.push(k);
                match k {
                    ExecutionProviderKind::Cuda => Err("CUDA failure 100: no CUDA-capable device is detected"),
                    _ => Ok("cpu session"),
                }
            },
        )
        .unwrap();

        assert_eq!(selected, ExecutionProviderKind::Cpu);
        assert_eq!(session, "cpu session");
        assert_eq!(tried, vec![ExecutionProviderKind::Cuda, ExecutionProviderKind::Cpu]);
    }

    #[test]
    fn every_failure_is_reported() {
        let reason = open_with_fallback(
            &[ExecutionProviderKind::Cuda, ExecutionProviderKind::Cpu],
            |_| true,
            |k| Err::<(), _>(format!("{} broke", k)),
        )
        .unwrap_err();
        assert!(reason.contains("cuda: cuda broke"));
        assert!(reason.contains("cpu: cpu broke"));
    }

    #[test]
    fn parses_names() {
        assert_eq!("CUDA".parse::<ExecutionProviderKind>().unwrap(), ExecutionProviderKind::Cuda);
        assert_eq!("trt".parse::<ExecutionProviderKind>().unwrap(), ExecutionProviderKind::TensorRt);
        assert!("tpu".parse::<ExecutionProviderKind>().is_err());
        assert_eq!("extended".parse::<OptimizationLevel>().unwrap(), OptimizationLevel::Extended);
        assert_eq!(OptimizationLevel::default(), OptimizationLevel::All);
    }
}
