//! Named feature values with explicit schema alignment

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Ordered mapping from feature name to value.
///
/// Insertion order is preserved so the encoder's output reads in schema order,
/// but scoring never relies on it: [`FeatureVector::align`] reorders against the
/// artifact's feature names and fills absent names with `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    /// Set a feature, replacing any previous value under the same name
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    /// Builder form of [`FeatureVector::insert`]
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    /// Remove a feature, returning its value
    pub fn remove(&mut self, name: &str) -> Option<f64> {
        let idx = self.values.iter().position(|(n, _)| n == name)?;
        Some(self.values.remove(idx).1)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Value of a binary flag feature; absent counts as unset
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).unwrap_or(0.0) >= 0.5
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Lay the values out in `schema` order. Names missing from this vector
    /// become `0.0`; names not in the schema are ignored.
    pub fn align(&self, schema: &[String]) -> Array1<f64> {
        schema
            .iter()
            .map(|name| self.get(name).unwrap_or(0.0))
            .collect()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut vector = FeatureVector::new();
        for (name, value) in iter {
            vector.insert(name, value);
        }
        vector
    }
}
