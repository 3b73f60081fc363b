use rand::rngs::StdRng;

use super::error::DataLoaderError;

/// A single image tensor in `C x H x W` order with its class label.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub data: Vec<f32>,
    pub shape: [usize; 3],
    pub label: usize,
}

impl Sample {
    pub fn new(data: Vec<f32>, shape: [usize; 3], label: usize) -> Self {
        debug_assert_eq!(data.len(), shape.iter().product::<usize>());
        Sample { data, shape, label }
    }
}

/// Random access labeled dataset.
///
/// `get` receives the RNG of the worker loading the sample, so random
/// transforms stay reproducible for a fixed seed and worker count.
pub trait Dataset: Send + Sync {
    fn len(&self) -> usize;

    fn get(&self, index: usize, rng: &mut StdRng) -> Result<Sample, DataLoaderError>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dataset over samples already held in memory.
pub struct InMemoryDataset {
    samples: Vec<Sample>,
}

impl InMemoryDataset {
    pub fn new(samples: Vec<Sample>) -> Result<Self, DataLoaderError> {
        if samples.is_empty() {
            return Err(DataLoaderError::EmptyDataset);
        }
        Ok(InMemoryDataset { samples })
    }
}

impl Dataset for InMemoryDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn get(&self, index: usize, _rng: &mut StdRng) -> Result<Sample, DataLoaderError> {
        self.samples
            .get(index)
            .cloned()
            .ok_or(DataLoaderError::IndexOutOfRange { index, len: self.samples.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn in_memory_get_and_bounds() {
        let samples = (0..3)
            .map(|i| Sample::new(vec![i as f32; 4], [1, 2, 2], i))
            .collect();
        let dataset = InMemoryDataset::new(samples).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.get(2, &mut rng).unwrap().label, 2);
        assert!(matches!(
            dataset.get(3, &mut rng),
            Err(DataLoaderError::IndexOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn in_memory_rejects_empty() {
        assert!(matches!(InMemoryDataset::new(Vec::new()), Err(DataLoaderError::EmptyDataset)));
    }
}
