//! Explained-variance summary of a fitted model.
//!
//! Used to judge how much of the trajectory variance the retained rank
//! captures, and how evenly it is spread across components.

use crate::engine::IncrementalPca;
use crate::math::linalg::SvdBackend;

/// Variance analysis of a fitted model.
#[derive(Debug, Clone, PartialEq)]
pub struct VarianceReport {
    /// Retained rank R.
    pub n_components: usize,

    /// Fraction of total variance per component, descending.
    pub explained_variance_ratio: Vec<f64>,

    /// Running sum of `explained_variance_ratio`.
    pub cumulative_ratio: Vec<f64>,

    /// Percentage of variance captured by the first component.
    pub pc1_variance_percent: f64,

    /// Effective dimensionality (exponential of the spectral entropy).
    pub effective_dimensionality: f64,

    /// Mean variance of the discarded components.
    pub noise_variance: f64,
}

impl VarianceReport {
    /// Summarise a fitted model. Returns `None` before the first ingest.
    #[must_use]
    pub fn from_model<B: SvdBackend>(model: &IncrementalPca<B>) -> Option<Self> {
        let state = model.state()?;
        let ratios: Vec<f64> = state.explained_variance_ratio().iter().copied().collect();

        let cumulative_ratio = ratios
            .iter()
            .scan(0.0, |acc, &r| {
                *acc += r;
                Some(*acc)
            })
            .collect();

        let pc1_variance_percent = ratios.first().map_or(0.0, |r| r * 100.0);

        // Entropy over the retained spectrum, renormalised to sum to one.
        let retained: f64 = ratios.iter().sum();
        let proportions: Vec<f64> = ratios
            .iter()
            .filter(|&&r| r > 1e-12)
            .map(|&r| r / retained)
            .collect();
        let effective_dimensionality = if proportions.is_empty() {
            0.0
        } else {
            let entropy: f64 = -proportions.iter().map(|&p| p * p.ln()).sum::<f64>();
            entropy.exp()
        };

        Some(Self {
            n_components: state.rank(),
            explained_variance_ratio: ratios,
            cumulative_ratio,
            pc1_variance_percent,
            effective_dimensionality,
            noise_variance: state.noise_variance(),
        })
    }

    /// Fraction of total variance kept by all retained components.
    #[must_use]
    pub fn total_explained(&self) -> f64 {
        self.cumulative_ratio.last().copied().unwrap_or(0.0)
    }

    /// Smallest number of components reaching `fraction` of the variance.
    #[must_use]
    pub fn components_for(&self, fraction: f64) -> Option<usize> {
        self.cumulative_ratio
            .iter()
            .position(|&c| c >= fraction)
            .map(|i| i + 1)
    }
}
