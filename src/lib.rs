//! Top-1 accuracy evaluation of ONNX image classifiers.
//!
//! A [`dataloader::dataloader::DataLoader`] draws seeded, fixed-size batches
//! from a labeled dataset, an [`inference::session::InferenceSession`] turns
//! each batch into class scores, and [`eval::evaluator::evaluate`] reduces the
//! arg-max predictions to an accuracy.

pub mod dataloader;
pub mod eval;
pub mod inference;
pub mod thread_pool;
