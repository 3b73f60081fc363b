pub mod config;
pub mod error;
pub mod evaluator;
pub mod metrics;
