pub mod error;
pub mod onnx;
pub mod provider;
pub mod session;
