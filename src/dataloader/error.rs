use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataLoaderError {
    // IO and dataset discovery
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("No samples found in the dataset")]
    EmptyDataset,

    // Record level errors, these only spoil the batch they occur in
    #[error("Corrupt record in {file}: {reason}")]
    CorruptRecord { file: String, reason: String },

    #[error("Label {label} out of range for {num_classes} classes")]
    InvalidLabel { label: usize, num_classes: usize },

    #[error("Image {path} is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    ImageSizeMismatch {
        path: String,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Sample index {index} out of range for dataset of {len} samples")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Sample shape {actual:?} differs from the batch shape {expected:?}")]
    SampleShapeMismatch { expected: [usize; 3], actual: [usize; 3] },

    #[error("Transform error: {0}")]
    Transform(String),

    // Config
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(usize),

    #[error("Invalid prefetch count: {0}")]
    InvalidPrefetchCount(usize),

    #[error("Cannot normalize {actual} channels with {expected} channel statistics")]
    ChannelMismatch { expected: usize, actual: usize },

    // Threading
    #[error("Worker {0} disconnected before finishing its batch")]
    WorkerDisconnected(usize),
}

impl DataLoaderError {
    /// Whether the evaluation loop may skip the affected batch and carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DataLoaderError::IoError(_)
                | DataLoaderError::ImageError(_)
                | DataLoaderError::CorruptRecord { .. }
                | DataLoaderError::InvalidLabel { .. }
                | DataLoaderError::ImageSizeMismatch { .. }
                | DataLoaderError::SampleShapeMismatch { .. }
                | DataLoaderError::Transform(_)
        )
    }
}
