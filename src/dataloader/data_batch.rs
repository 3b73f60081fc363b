use super::dataset::Sample;
use super::error::DataLoaderError;

/// `samples_in_batch` samples stacked into one `N x C x H x W` buffer.
#[derive(Clone, Debug)]
pub struct DataBatch {
    pub data: Vec<f32>,
    pub samples_in_batch: usize,
    pub sample_shape: [usize; 3],
    pub labels: Vec<usize>,
    pub indices: Vec<usize>,
    pub batch_number: usize,
}

impl DataBatch {
    /// Stacks samples in order. Every sample must have the shape of the first.
    pub fn from_samples(
        batch_number: usize,
        indices: Vec<usize>,
        samples: Vec<Sample>,
    ) -> Result<Self, DataLoaderError> {
        let sample_shape = samples.first().map(|s| s.shape).unwrap_or([0, 0, 0]);
        let elements_per_sample: usize = sample_shape.iter().product();

        let mut data = Vec::with_capacity(elements_per_sample * samples.len());
        let mut labels = Vec::with_capacity(samples.len());
        for sample in samples {
            if sample.shape != sample_shape {
                return Err(DataLoaderError::SampleShapeMismatch {
                    expected: sample_shape,
                    actual: sample.shape,
                });
            }
            data.extend_from_slice(&sample.data);
            labels.push(sample.label);
        }

        Ok(DataBatch {
            data,
            samples_in_batch: labels.len(),
            sample_shape,
            labels,
            indices,
            batch_number,
        })
    }

    /// Input tensor shape, batch dimension first.
    pub fn shape(&self) -> [usize; 4] {
        let [c, h, w] = self.sample_shape;
        [self.samples_in_batch, c, h, w]
    }

    pub fn elements_per_sample(&self) -> usize {
        self.sample_shape.iter().product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stacks_samples_in_order() {
        let samples = vec![
            Sample::new(vec![1.0, 2.0], [1, 1, 2], 4),
            Sample::new(vec![3.0, 4.0], [1, 1, 2], 9),
        ];
        let batch = DataBatch::from_samples(7, vec![11, 3], samples).unwrap();
        assert_eq!(batch.shape(), [2, 1, 1, 2]);
        assert_eq!(batch.data, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(batch.labels, vec![4, 9]);
        assert_eq!(batch.batch_number, 7);
    }

    #[test]
    fn rejects_ragged_samples() {
        let samples = vec![
            Sample::new(vec![1.0, 2.0], [1, 1, 2], 0),
            Sample::new(vec![3.0], [1, 1, 1], 1),
        ];
        assert!(matches!(
            DataBatch::from_samples(0, vec![0, 1], samples),
            Err(DataLoaderError::SampleShapeMismatch { .. })
        ));
    }
}
