//! Labeled records, dense datasets and the stratified train/test split

use crate::error::TrainingError;
use crate::feature_vector::FeatureVector;
use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// One training example
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRecord {
    pub features: FeatureVector,
    pub is_fraud: bool,
}

/// Dense feature matrix with binary labels, columns in `feature_names` order
#[derive(Debug, Clone)]
pub struct Dataset {
    pub features: Array2<f64>,
    pub labels: Vec<usize>,
    pub feature_names: Vec<String>,
}

impl Dataset {
    pub fn from_records(
        records: &[LabeledRecord],
        feature_names: &[String],
    ) -> Result<Self, TrainingError> {
        if records.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        if feature_names.is_empty() {
            return Err(TrainingError::Shape("feature schema is empty".to_string()));
        }

        let mut features = Array2::zeros((records.len(), feature_names.len()));
        for (mut row, record) in features.outer_iter_mut().zip(records) {
            row.assign(&record.features.align(feature_names));
        }
        if let Some(col) = features
            .axis_iter(Axis(1))
            .position(|col| col.iter().any(|v| !v.is_finite()))
        {
            return Err(TrainingError::Shape(format!(
                "feature {} contains non-finite values",
                feature_names[col]
            )));
        }

        Ok(Self {
            features,
            labels: records.iter().map(|r| usize::from(r.is_fraud)).collect(),
            feature_names: feature_names.to_vec(),
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn fraud_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }

    /// Rows at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: self.features.select(Axis(0), indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            feature_names: self.feature_names.clone(),
        }
    }
}

/// Split row indices into `(train, test)` keeping each label's proportion.
///
/// Every class keeps at least one training row, and classes with two or more
/// rows contribute at least one test row.
pub fn stratified_split(
    labels: &[usize],
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), TrainingError> {
    if labels.len() < 2 {
        return Err(TrainingError::InsufficientSamples {
            samples: labels.len(),
            required: 2,
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    let n_classes = labels.iter().copied().max().unwrap_or(0) + 1;
    for class in 0..n_classes {
        let mut members: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == class).collect();
        if members.is_empty() {
            continue;
        }
        members.shuffle(&mut rng);

        let count = members.len();
        let wanted = (count as f64 * test_fraction).round() as usize;
        let n_test = if count > 1 { wanted.clamp(1, count - 1) } else { 0 };

        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(amount: f64, is_fraud: bool) -> LabeledRecord {
        LabeledRecord {
            features: FeatureVector::new().with("amount", amount),
            is_fraud,
        }
    }

    #[test]
    fn test_from_records_aligns_and_defaults() {
        let schema = vec!["amount".to_string(), "hour".to_string()];
        let dataset =
            Dataset::from_records(&[record(10.0, false), record(20.0, true)], &schema).unwrap();

        assert_eq!(dataset.features.shape(), &[2, 2]);
        assert_eq!(dataset.features[[1, 0]], 20.0);
        assert_eq!(dataset.features[[1, 1]], 0.0);
        assert_eq!(dataset.labels, vec![0, 1]);
        assert_eq!(dataset.fraud_count(), 1);
    }

    #[test]
    fn test_non_finite_feature_rejected() {
        let schema = vec!["amount".to_string()];
        let err = Dataset::from_records(&[record(f64::NAN, false)], &schema).unwrap_err();
        assert!(matches!(err, TrainingError::Shape(_)));
    }

    #[test]
    fn test_stratified_split_preserves_ratio() {
        let labels: Vec<usize> = (0..1000).map(|i| usize::from(i % 4 == 0)).collect();
        let (train, test) = stratified_split(&labels, 0.2, 42).unwrap();

        assert_eq!(train.len() + test.len(), 1000);
        assert_eq!(test.len(), 200);
        let test_fraud = test.iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!(test_fraud, 50);

        let mut all: Vec<usize> = train.iter().chain(&test).copied().collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 1000);
    }

    #[test]
    fn test_split_is_deterministic() {
        let labels: Vec<usize> = (0..100).map(|i| i % 2).collect();
        assert_eq!(
            stratified_split(&labels, 0.3, 9).unwrap(),
            stratified_split(&labels, 0.3, 9).unwrap()
        );
    }

    #[test]
    fn test_tiny_inputs() {
        assert!(matches!(
            stratified_split(&[1], 0.2, 0),
            Err(TrainingError::InsufficientSamples { .. })
        ));

        let (train, test) = stratified_split(&[0, 0, 1], 0.2, 0).unwrap();
        assert!(train.iter().any(|&i| i == 2));
        assert_eq!(test.len(), 1);
    }
}
