pub mod cifar10;
pub mod config;
pub mod data_batch;
pub mod dataloader;
pub mod dataset;
pub mod error;
pub mod imagesdir;
pub mod info;
pub mod par_iter;
pub mod sampler;
pub mod transform;
