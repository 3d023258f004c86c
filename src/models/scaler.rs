//! Per-feature standardization

use crate::error::TrainingError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Zero-mean, unit-variance scaler fitted once on training data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    /// Fit column means and population standard deviations.
    ///
    /// Constant columns get a scale of 1.0 so they map to 0.0 instead of NaN.
    pub fn fit(x: ArrayView2<'_, f64>) -> Result<Self, TrainingError> {
        if x.nrows() == 0 {
            return Err(TrainingError::EmptyDataset);
        }
        let mean = x
            .mean_axis(Axis(0))
            .ok_or(TrainingError::EmptyDataset)?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s.is_finite() && s > f64::EPSILON { s } else { 1.0 });

        Ok(Self { mean, scale })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        (&x - &self.mean) / &self.scale
    }

    pub fn transform_row(&self, row: ArrayView1<'_, f64>) -> Array1<f64> {
        (&row - &self.mean) / &self.scale
    }
}
