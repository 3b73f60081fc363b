use crate::dataloader::data_batch::DataBatch;

use super::error::InferenceError;

/// Class scores for a batch, one row of `num_classes` values per sample.
#[derive(Clone, Debug, PartialEq)]
pub struct Scores {
    data: Vec<f32>,
    num_classes: usize,
}

impl Scores {
    pub fn new(data: Vec<f32>, num_classes: usize) -> Result<Self, InferenceError> {
        if num_classes == 0 || data.len() % num_classes != 0 {
            return Err(InferenceError::ShapeMismatch {
                expected: format!("a multiple of {} scores", num_classes),
                actual: format!("{} scores", data.len()),
            });
        }
        Ok(Scores { data, num_classes })
    }

    /// Builds scores from a `[N, K]` (or `[N, K, 1, ...]`) output tensor and
    /// checks that it has one row per input sample.
    pub fn from_output(shape: &[i64], data: &[f32], expected_rows: usize) -> Result<Self, InferenceError> {
        let mismatch = || InferenceError::ShapeMismatch {
            expected: format!("[{}, num_classes]", expected_rows),
            actual: format!("{:?}", shape),
        };

        let (&rows, rest) = shape.split_first().ok_or_else(mismatch)?;
        if rows != expected_rows as i64 || rest.is_empty() || rest[1..].iter().any(|&d| d != 1) {
            return Err(mismatch());
        }

        let num_classes = usize::try_from(rest[0]).map_err(|_| mismatch())?;
        if data.len() != expected_rows * num_classes {
            return Err(mismatch());
        }

        Scores::new(data.to_vec(), num_classes)
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.num_classes
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.num_classes)
    }
}

/// Request/response inference over whole batches.
pub trait InferenceSession {
    fn run(&mut self, batch: &DataBatch) -> Result<Scores, InferenceError>;
}

impl<S: InferenceSession + ?Sized> InferenceSession for Box<S> {
    fn run(&mut self, batch: &DataBatch) -> Result<Scores, InferenceError> {
        (**self).run(batch)
    }
}

/// Checks a batch shape against the model's declared input dimensions.
/// Negative dimensions are symbolic and accept any size.
pub fn check_input_shape(declared: &[i64], actual: &[usize]) -> Result<(), InferenceError> {
    let matches = declared.len() == actual.len()
        && declared
            .iter()
            .zip(actual)
            .all(|(&d, &a)| d < 0 || d == a as i64);

    if matches {
        Ok(())
    } else {
        Err(InferenceError::ShapeMismatch {
            expected: format!("{:?}", declared),
            actual: format!("{:?}", actual),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_batch_dimension_accepts_any_size() {
        assert!(check_input_shape(&[-1, 3, 32, 32], &[1024, 3, 32, 32]).is_ok());
        assert!(check_input_shape(&[8, 3, 32, 32], &[8, 3, 32, 32]).is_ok());
    }

    #[test]
    fn fixed_dimension_and_rank_must_match() {
        assert!(check_input_shape(&[-1, 3, 224, 224], &[4, 3, 32, 32]).is_err());
        assert!(check_input_shape(&[-1, 3, 32], &[4, 3, 32, 32]).is_err());
    }

    #[test]
    fn output_rows_must_match_batch() {
        let scores = Scores::from_output(&[2, 3], &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0], 2).unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores.rows().nth(1).unwrap(), &[3.0, 4.0, 5.0]);

        assert!(Scores::from_output(&[3, 2], &[0.0; 6], 2).is_err());
        assert!(Scores::from_output(&[2], &[0.0; 2], 2).is_err());
    }

    #[test]
    fn trailing_unit_dimensions_are_squeezed() {
        let scores = Scores::from_output(&[1, 4, 1, 1], &[0.0, 0.0, 1.0, 0.0], 1).unwrap();
        assert_eq!(scores.num_classes(), 4);
    }

    #[test]
    fn ragged_scores_are_rejected() {
        assert!(Scores::new(vec![0.0; 5], 2).is_err());
        assert!(Scores::new(vec![], 0).is_err());
    }
}
