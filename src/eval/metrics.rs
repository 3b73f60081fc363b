use thiserror::Error;

use crate::inference::session::Scores;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MetricError {
    #[error("No samples evaluated")]
    EmptyInput,

    #[error("Label sequences differ in length: {trues} true vs {predicted} predicted")]
    LengthMismatch { trues: usize, predicted: usize },
}

/// Index of the largest score, first one on ties. NaN never wins.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        let better = match best {
            Some((_, max)) => score > max,
            None => !score.is_nan(),
        };
        if better {
            best = Some((i, score));
        }
    }
    // All NaN still yields a prediction
    best.map(|(i, _)| i).or(if scores.is_empty() { None } else { Some(0) })
}

/// Fraction of positions where `trues[i] == predicted[i]`.
pub fn accuracy(trues: &[usize], predicted: &[usize]) -> Result<f64, MetricError> {
    if trues.is_empty() {
        return Err(MetricError::EmptyInput);
    }
    if trues.len() != predicted.len() {
        return Err(MetricError::LengthMismatch { trues: trues.len(), predicted: predicted.len() });
    }

    let correct = trues.iter().zip(predicted).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / trues.len() as f64)
}

/// True and predicted labels in evaluation order.
#[derive(Clone, Debug, Default)]
pub struct LabelPairs {
    pub trues: Vec<usize>,
    pub predicted: Vec<usize>,
}

impl LabelPairs {
    pub fn with_capacity(capacity: usize) -> Self {
        LabelPairs {
            trues: Vec::with_capacity(capacity),
            predicted: Vec::with_capacity(capacity),
        }
    }

    /// Records one batch. Nothing is recorded unless every row has a prediction.
    pub fn record_batch(&mut self, labels: &[usize], scores: &Scores) -> Result<(), MetricError> {
        if labels.len() != scores.len() {
            return Err(MetricError::LengthMismatch { trues: labels.len(), predicted: scores.len() });
        }

        let predictions = scores
            .rows()
            .map(argmax)
            .collect::<Option<Vec<_>>>()
            .ok_or(MetricError::EmptyInput)?;

        self.trues.extend_from_slice(labels);
        self.predicted.extend(predictions);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.trues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trues.is_empty()
    }

    pub fn accuracy(&self) -> Result<f64, MetricError> {
        accuracy(&self.trues, &self.predicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_first_max_wins() {
        assert_eq!(argmax(&[0.1, 0.7, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[-3.0]), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn argmax_skips_nan() {
        assert_eq!(argmax(&[f32::NAN, 0.5, 0.2]), Some(1));
        assert_eq!(argmax(&[0.5, f32::NAN, 0.9]), Some(2));
        assert_eq!(argmax(&[f32::NAN, f32::NAN]), Some(0));
    }

    #[test]
    fn identical_sequences_score_one() {
        assert_eq!(accuracy(&[1, 2, 3], &[1, 2, 3]), Ok(1.0));
    }

    #[test]
    fn disjoint_sequences_score_zero() {
        assert_eq!(accuracy(&[1, 2, 3], &[0, 0, 0]), Ok(0.0));
    }

    #[test]
    fn partial_match_is_a_ratio() {
        let acc = accuracy(&[0, 1, 2, 3], &[0, 1, 9, 9]).unwrap();
        assert_eq!(acc, 0.5);
        assert!((0.0..=1.0).contains(&acc));
    }

    #[test]
    fn empty_input_is_a_defined_error() {
        assert_eq!(accuracy(&[], &[]), Err(MetricError::EmptyInput));
        assert_eq!(LabelPairs::default().accuracy(), Err(MetricError::EmptyInput));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        assert_eq!(
            accuracy(&[1, 2], &[1]),
            Err(MetricError::LengthMismatch { trues: 2, predicted: 1 })
        );
    }

    #[test]
    fn records_batches_in_order() {
        let mut pairs = LabelPairs::default();
        let scores = Scores::new(vec![0.9, 0.1, 0.2, 0.8], 2).unwrap();
        pairs.record_batch(&[0, 0], &scores).unwrap();
        assert_eq!(pairs.trues, vec![0, 0]);
        assert_eq!(pairs.predicted, vec![0, 1]);
        assert_eq!(pairs.accuracy(), Ok(0.5));

        assert!(pairs.record_batch(&[1], &scores).is_err());
        assert_eq!(pairs.len(), 2);
    }
}
