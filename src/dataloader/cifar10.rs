use std::path::{Path, PathBuf};

use log::info;
use rand::rngs::StdRng;

use super::dataset::{Dataset, Sample};
use super::error::DataLoaderError;
use super::transform::{ImageTensor, Transform, RGB_CHANNELS};

pub const CIFAR10_NUM_CLASSES: usize = 10;
pub const CIFAR10_IMAGE_SIZE: u32 = 32;

const CIFAR10_CHANNELS: usize = RGB_CHANNELS;
const CIFAR10_IMAGE_BYTES: usize = 32 * 32 * CIFAR10_CHANNELS;
// One label byte followed by the red, green and blue planes
const CIFAR10_RECORD_BYTES: usize = 1 + CIFAR10_IMAGE_BYTES;
const CIFAR10_EXTRACTED_DIR: &str = "cifar-10-batches-bin";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cifar10Split {
    Train,
    Test,
}

impl Cifar10Split {
    fn file_names(&self) -> Vec<String> {
        match self {
            Cifar10Split::Train => (1..=5).map(|i| format!("data_batch_{}.bin", i)).collect(),
            Cifar10Split::Test => vec!["test_batch.bin".to_string()],
        }
    }
}

/// CIFAR-10 in its binary distribution format, held fully in memory.
pub struct Cifar10Dataset {
    records: Vec<u8>,
    num_records: usize,
    transform: Box<dyn Transform>,
}

impl Cifar10Dataset {
    /// `root` may be the extracted `cifar-10-batches-bin` directory or its parent.
    pub fn new(root: &Path, split: Cifar10Split, transform: Box<dyn Transform>) -> Result<Self, DataLoaderError> {
        let dir = resolve_batches_dir(root)?;

        let mut records = Vec::new();
        for name in split.file_names() {
            let file = dir.join(&name);
            let bytes = std::fs::read(&file)?;
            if bytes.len() % CIFAR10_RECORD_BYTES != 0 {
                return Err(DataLoaderError::CorruptRecord {
                    file: file.display().to_string(),
                    reason: format!(
                        "length {} is not a multiple of the {} byte record size",
                        bytes.len(),
                        CIFAR10_RECORD_BYTES
                    ),
                });
            }
            records.extend_from_slice(&bytes);
        }

        let num_records = records.len() / CIFAR10_RECORD_BYTES;
        if num_records == 0 {
            return Err(DataLoaderError::EmptyDataset);
        }

        info!("Loaded {} CIFAR-10 {:?} records from {}", num_records, split, dir.display());

        Ok(Cifar10Dataset { records, num_records, transform })
    }

    fn record(&self, index: usize) -> Result<&[u8], DataLoaderError> {
        if index >= self.num_records {
            return Err(DataLoaderError::IndexOutOfRange { index, len: self.num_records });
        }
        let start = index * CIFAR10_RECORD_BYTES;
        Ok(&self.records[start..start + CIFAR10_RECORD_BYTES])
    }
}

fn resolve_batches_dir(root: &Path) -> Result<PathBuf, DataLoaderError> {
    let nested = root.join(CIFAR10_EXTRACTED_DIR);
    if nested.is_dir() {
        return Ok(nested);
    }
    if root.is_dir() {
        return Ok(root.to_owned());
    }
    Err(DataLoaderError::DirectoryNotFound(root.display().to_string()))
}

impl Dataset for Cifar10Dataset {
    fn len(&self) -> usize {
        self.num_records
    }

    fn get(&self, index: usize, rng: &mut StdRng) -> Result<Sample, DataLoaderError> {
        let record = self.record(index)?;
        let label = record[0] as usize;
        if label >= CIFAR10_NUM_CLASSES {
            return Err(DataLoaderError::InvalidLabel { label, num_classes: CIFAR10_NUM_CLASSES });
        }

        // Records are already planar, so only scaling is needed to reach C x H x W
        let tensor = ImageTensor {
            data: record[1..].iter().map(|&b| b as f32 / 255.0).collect(),
            shape: [CIFAR10_CHANNELS, CIFAR10_IMAGE_SIZE as usize, CIFAR10_IMAGE_SIZE as usize],
        };
        let tensor = self.transform.apply(tensor, rng)?;

        Ok(Sample::new(tensor.data, tensor.shape, label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataloader::transform::Compose;
    use rand::SeedableRng;

    fn write_records(dir: &Path, name: &str, labels: &[u8]) {
        let mut bytes = Vec::new();
        for (i, &label) in labels.iter().enumerate() {
            bytes.push(label);
            bytes.extend(std::iter::repeat(i as u8).take(CIFAR10_IMAGE_BYTES));
        }
        std::fs::write(dir.join(name), bytes).unwrap();
    }

    #[test]
    fn reads_test_split_from_parent_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let batches = tmp.path().join(CIFAR10_EXTRACTED_DIR);
        std::fs::create_dir(&batches).unwrap();
        write_records(&batches, "test_batch.bin", &[3, 7, 1]);

        let ds = Cifar10Dataset::new(tmp.path(), Cifar10Split::Test, Box::new(Compose::identity())).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(ds.len(), 3);

        let sample = ds.get(1, &mut rng).unwrap();
        assert_eq!(sample.label, 7);
        assert_eq!(sample.shape, [3, 32, 32]);
        assert!(sample.data.iter().all(|&v| v == 1.0 / 255.0));
    }

    #[test]
    fn rejects_truncated_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("test_batch.bin"), vec![0u8; CIFAR10_RECORD_BYTES + 5]).unwrap();

        let result = Cifar10Dataset::new(tmp.path(), Cifar10Split::Test, Box::new(Compose::identity()));
        assert!(matches!(result, Err(DataLoaderError::CorruptRecord { .. })));
    }

    #[test]
    fn out_of_range_label_is_a_record_error() {
        let tmp = tempfile::tempdir().unwrap();
        write_records(tmp.path(), "test_batch.bin", &[0, 42]);

        let ds = Cifar10Dataset::new(tmp.path(), Cifar10Split::Test, Box::new(Compose::identity())).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let err = ds.get(1, &mut rng).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn missing_root_is_reported() {
        let result = Cifar10Dataset::new(Path::new("/definitely/not/here"), Cifar10Split::Test, Box::new(Compose::identity()));
        assert!(matches!(result, Err(DataLoaderError::DirectoryNotFound(_))));
    }
}
