//! Embedding data structure.
//!
//! An [`Embedding`] is the projection of one trajectory onto the fitted
//! principal components: `R` coordinates, one per retained component, in
//! descending order of explained variance.

use std::ops::Index;

use serde::{Deserialize, Serialize};

/// Reduced-dimension representation of one trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    values: Vec<f64>,
}

impl Embedding {
    /// Wrap raw component scores.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Embedding dimension R.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Component scores.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Consume into the raw score vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }

    /// Inner product with another embedding of the same dimension.
    ///
    /// # Panics
    ///
    /// Panics if the two embeddings differ in dimension.
    #[must_use]
    pub fn dot(&self, other: &Self) -> f64 {
        assert_eq!(
            self.dim(),
            other.dim(),
            "inner product of embeddings with different dimensions"
        );
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum()
    }
}

impl From<Vec<f64>> for Embedding {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl Index<usize> for Embedding {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.values[index]
    }
}
