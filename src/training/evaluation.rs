//! Held-out classification metrics

use crate::models::artifact::ModelMetrics;

impl ModelMetrics {
    /// Accuracy, precision, recall and F1 for the positive (fraud) class.
    /// Undefined ratios (no predicted or no actual positives) are 0.0.
    pub fn from_predictions(actual: &[usize], predicted: &[usize]) -> Self {
        let (mut tp, mut fp, mut tn, mut fn_) = (0usize, 0usize, 0usize, 0usize);
        for (&a, &p) in actual.iter().zip(predicted) {
            match (a == 1, p == 1) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (false, false) => tn += 1,
                (true, false) => fn_ += 1,
            }
        }

        let total = tp + fp + tn + fn_;
        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };

        let accuracy = ratio(tp + tn, total);
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy,
            precision,
            recall,
            f1_score,
        }
    }
}
