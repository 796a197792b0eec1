//! Incremental PCA engine.
//!
//! The engine keeps a running mean and a truncated SVD of everything it has
//! seen, and folds in one batch at a time without ever forming the full
//! `N × D` data matrix or a `D × D` covariance matrix.
//!
//! # Update
//!
//! With `n` samples seen so far and a batch of `m` rows:
//!
//! 1. Center the batch by its own mean.
//! 2. Merge means: `mean' = (n·mean + m·batch_mean) / (n + m)`.
//! 3. Mean-shift correction row: `sqrt(n·m / (n + m)) · (batch_mean − mean)`.
//! 4. Stack `diag(S)·components`, the correction row, and the centered batch.
//! 5. Thin SVD of the stack; keep the top `min(R, D, n + m)` triplets.
//! 6. Swap in the new state.
//!
//! Each update costs roughly `O((R + B)·D·min(R + B, D))`, independent of the
//! total number of samples.
//!
//! # Determinism
//!
//! Singular values are sorted with a stable sort, so tied values keep the
//! backend's order. Results can therefore differ slightly between SVD
//! backends, and between batch sizes, since truncation happens per batch.
//! [`IncrementalPca::transform`] itself is a pure function of the state.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};

use crate::config::PcaConfig;
use crate::dataset::Dataset;
use crate::embedding::Embedding;
use crate::error::{PcaError, Result};
use crate::feeder::{Batch, BatchFeeder};
use crate::math::linalg::{
    all_finite, center_rows, column_means, column_variances, normalize_svd, NalgebraSvd,
    SvdBackend,
};
use crate::parser::ParsedTrajectory;

/// Fitted model state. Replaced wholesale on every ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct PcaState {
    mean: DVector<f64>,
    var: DVector<f64>,
    singular_values: DVector<f64>,
    components: DMatrix<f64>,
    explained_variance: DVector<f64>,
    explained_variance_ratio: DVector<f64>,
    noise_variance: f64,
    n_samples_seen: usize,
}

impl PcaState {
    /// Feature dimension D.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Retained rank R.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.components.nrows()
    }

    /// Running per-feature mean.
    #[must_use]
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Running per-feature population variance.
    #[must_use]
    pub fn variance(&self) -> &DVector<f64> {
        &self.var
    }

    /// Singular values, descending.
    #[must_use]
    pub fn singular_values(&self) -> &DVector<f64> {
        &self.singular_values
    }

    /// Orthonormal basis, one component per row (`R × D`).
    #[must_use]
    pub fn components(&self) -> &DMatrix<f64> {
        &self.components
    }

    /// Variance captured by each component.
    #[must_use]
    pub fn explained_variance(&self) -> &DVector<f64> {
        &self.explained_variance
    }

    /// Fraction of total variance captured by each component.
    #[must_use]
    pub fn explained_variance_ratio(&self) -> &DVector<f64> {
        &self.explained_variance_ratio
    }

    /// Mean variance of the discarded components.
    #[must_use]
    pub fn noise_variance(&self) -> f64 {
        self.noise_variance
    }

    /// Number of samples folded into the state.
    #[must_use]
    pub fn n_samples_seen(&self) -> usize {
        self.n_samples_seen
    }
}

/// Incremental PCA over a pluggable SVD backend.
///
/// # Example
///
/// ```
/// use trajectory_pca::{Dataset, IncrementalPca, PcaConfig};
///
/// let dataset = Dataset::from_texts([
///     "[[0, 0], [1, 1]]",
///     "[[1, 1], [2, 2]]",
///     "[[2, 2], [3, 3]]",
/// ])?;
/// let config = PcaConfig::default().with_n_components(2).with_batch_size(2);
///
/// let model = trajectory_pca::fit(&dataset, &config)?;
/// let embedding = model.transform(dataset[0].as_slice())?;
/// assert_eq!(embedding.dim(), 2);
/// # Ok::<(), trajectory_pca::PcaError>(())
/// ```
#[derive(Debug, Clone)]
pub struct IncrementalPca<B: SvdBackend = NalgebraSvd> {
    config: PcaConfig,
    backend: B,
    state: Option<PcaState>,
    batches_ingested: usize,
}

impl IncrementalPca<NalgebraSvd> {
    /// Create an unfitted engine using the nalgebra backend.
    ///
    /// # Errors
    ///
    /// Returns [`PcaError::InvalidConfig`] if the configuration is invalid.
    pub fn new(config: PcaConfig) -> Result<Self> {
        let backend = NalgebraSvd::from_config(&config);
        Self::with_backend(config, backend)
    }
}

impl<B: SvdBackend> IncrementalPca<B> {
    /// Create an unfitted engine with a custom SVD backend.
    ///
    /// # Errors
    ///
    /// Returns [`PcaError::InvalidConfig`] if the configuration is invalid.
    pub fn with_backend(config: PcaConfig, backend: B) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            backend,
            state: None,
            batches_ingested: 0,
        })
    }

    /// Fold one batch into the model.
    ///
    /// # Errors
    ///
    /// See [`IncrementalPca::partial_fit`]. On error the previous state is
    /// kept unchanged.
    pub fn ingest(&mut self, batch: &Batch<'_>) -> Result<()> {
        self.partial_fit(&batch.to_matrix())
    }

    /// Fold a dense `m × D` block of samples into the model.
    ///
    /// # Errors
    ///
    /// - [`PcaError::EmptyDataset`] for a block with no rows
    /// - [`PcaError::DimensionMismatch`] if `D` differs from the fitted state
    /// - [`PcaError::Numerical`] for non-finite input or a failed decomposition
    pub fn partial_fit(&mut self, samples: &DMatrix<f64>) -> Result<()> {
        let next = self.updated_state(samples)?;
        self.state = Some(next);
        self.batches_ingested += 1;
        Ok(())
    }

    fn updated_state(&self, samples: &DMatrix<f64>) -> Result<PcaState> {
        let (m, d) = samples.shape();
        if m == 0 {
            return Err(PcaError::EmptyDataset);
        }
        if !all_finite(samples) {
            return Err(PcaError::numerical("batch contains non-finite values"));
        }

        let (n, prev_mean, prev_var) = match &self.state {
            Some(state) if state.dim() != d => {
                return Err(PcaError::dimension_mismatch(
                    state.n_samples_seen,
                    state.dim(),
                    d,
                ));
            }
            Some(state) => (state.n_samples_seen, state.mean.clone(), state.var.clone()),
            None => (0, DVector::zeros(d), DVector::zeros(d)),
        };

        let total = n + m;
        let (nf, mf, tf) = (n as f64, m as f64, total as f64);

        let batch_mean = column_means(samples);
        let batch_var = column_variances(samples, &batch_mean);
        let shift = &batch_mean - &prev_mean;

        let mean = (&prev_mean * nf + &batch_mean * mf) / tf;
        // Chan et al. pairwise merge of population variances.
        let var = (&prev_var * nf + &batch_var * mf + shift.component_mul(&shift) * (nf * mf / tf))
            / tf;

        let centered = center_rows(samples, &batch_mean);
        let augmented = match &self.state {
            None => centered,
            Some(state) => {
                let r = state.rank();
                let mut stacked = DMatrix::zeros(r + 1 + m, d);
                for i in 0..r {
                    stacked
                        .row_mut(i)
                        .copy_from(&(state.components.row(i) * state.singular_values[i]));
                }
                let correction = &shift * (nf * mf / tf).sqrt();
                stacked.row_mut(r).copy_from(&correction.transpose());
                stacked.rows_mut(r + 1, m).copy_from(&centered);
                stacked
            }
        };

        let svd = normalize_svd(self.backend.thin_svd(augmented)?);
        let available = svd.singular_values.len();
        let rank = self.config.effective_rank(d, total).min(available);

        let singular_values = svd.singular_values.rows(0, rank).into_owned();
        let components = svd.v_t.rows(0, rank).into_owned();
        if !(all_finite(&components) && singular_values.iter().all(|s| s.is_finite())) {
            return Err(PcaError::numerical(
                "decomposition produced non-finite components",
            ));
        }

        let all_variance = svd.singular_values.map(|s| s * s / (tf - 1.0).max(1.0));
        let explained_variance = all_variance.rows(0, rank).into_owned();

        let total_scatter = var.sum() * tf;
        let explained_variance_ratio = if total_scatter > 0.0 {
            singular_values.map(|s| s * s / total_scatter)
        } else {
            warn!(
                "Degenerate data after {total} samples: zero total variance, \
                 embeddings will be all zero"
            );
            DVector::zeros(rank)
        };

        let noise_variance = if rank < d.min(total) && rank < available {
            all_variance.rows(rank, available - rank).mean()
        } else {
            0.0
        };

        Ok(PcaState {
            mean,
            var,
            singular_values,
            components,
            explained_variance,
            explained_variance_ratio,
            noise_variance,
            n_samples_seen: total,
        })
    }

    /// Project one vector onto the fitted components.
    ///
    /// # Errors
    ///
    /// - [`PcaError::NotFitted`] before the first ingest
    /// - [`PcaError::DimensionMismatch`] if `x.len()` differs from D
    pub fn transform(&self, x: &[f64]) -> Result<Embedding> {
        let state = self.fitted()?;
        project(state, 0, x)
    }

    /// Project every trajectory with the current state, preserving order.
    ///
    /// Projections are independent, so with the `parallel` feature they run
    /// on the rayon pool.
    ///
    /// # Errors
    ///
    /// Same as [`IncrementalPca::transform`], naming the offending index.
    pub fn transform_all(&self, trajectories: &[ParsedTrajectory]) -> Result<Vec<Embedding>> {
        let state = self.fitted()?;
        project_all(state, trajectories)
    }

    /// Map an embedding back to the original feature space.
    ///
    /// # Errors
    ///
    /// - [`PcaError::NotFitted`] before the first ingest
    /// - [`PcaError::DimensionMismatch`] if the embedding rank differs from R
    pub fn inverse_transform(&self, embedding: &Embedding) -> Result<Vec<f64>> {
        let state = self.fitted()?;
        if embedding.dim() != state.rank() {
            return Err(PcaError::dimension_mismatch(
                0,
                state.rank(),
                embedding.dim(),
            ));
        }
        let scores = DVector::from_column_slice(embedding.as_slice());
        let restored = state.components.transpose() * scores + &state.mean;
        Ok(restored.iter().copied().collect())
    }

    fn fitted(&self) -> Result<&PcaState> {
        self.state.as_ref().ok_or(PcaError::NotFitted)
    }

    /// Current state, if any batch has been ingested.
    #[must_use]
    pub fn state(&self) -> Option<&PcaState> {
        self.state.as_ref()
    }

    /// Whether at least one batch has been ingested.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Retained rank R (0 before fitting).
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.state.as_ref().map_or(0, PcaState::rank)
    }

    /// Samples folded in so far.
    #[must_use]
    pub fn n_samples_seen(&self) -> usize {
        self.state.as_ref().map_or(0, PcaState::n_samples_seen)
    }

    /// Feature dimension D, once fitted.
    #[must_use]
    pub fn dim(&self) -> Option<usize> {
        self.state.as_ref().map(PcaState::dim)
    }

    /// Number of successful ingests.
    #[must_use]
    pub const fn batches_ingested(&self) -> usize {
        self.batches_ingested
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> &PcaConfig {
        &self.config
    }

    /// Drop the fitted state.
    pub fn reset(&mut self) {
        self.state = None;
        self.batches_ingested = 0;
    }
}

fn project(state: &PcaState, index: usize, x: &[f64]) -> Result<Embedding> {
    if x.len() != state.dim() {
        return Err(PcaError::dimension_mismatch(index, state.dim(), x.len()));
    }
    let centered = DVector::from_column_slice(x) - &state.mean;
    let scores = &state.components * centered;
    Ok(Embedding::new(scores.iter().copied().collect()))
}

#[cfg(feature = "parallel")]
fn project_all(state: &PcaState, trajectories: &[ParsedTrajectory]) -> Result<Vec<Embedding>> {
    use rayon::prelude::*;

    trajectories
        .par_iter()
        .enumerate()
        .map(|(i, t)| project(state, i, t.as_slice()))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn project_all(state: &PcaState, trajectories: &[ParsedTrajectory]) -> Result<Vec<Embedding>> {
    trajectories
        .iter()
        .enumerate()
        .map(|(i, t)| project(state, i, t.as_slice()))
        .collect()
}

/// Fit a model over the whole dataset, one batch at a time, in order.
///
/// # Errors
///
/// Fails on an empty dataset, inconsistent dimensions, invalid configuration
/// or a numerical failure. No partially fitted model is ever returned.
pub fn fit(dataset: &Dataset, config: &PcaConfig) -> Result<IncrementalPca> {
    ingest_all(IncrementalPca::new(config.clone())?, dataset, None)
}

/// Like [`fit`], but stops before the next batch once `cancel` is set.
///
/// # Errors
///
/// Returns [`PcaError::Cancelled`] when interrupted; the partial model is
/// dropped.
pub fn fit_cancellable(
    dataset: &Dataset,
    config: &PcaConfig,
    cancel: &AtomicBool,
) -> Result<IncrementalPca> {
    ingest_all(IncrementalPca::new(config.clone())?, dataset, Some(cancel))
}

/// Fit with a custom SVD backend.
///
/// # Errors
///
/// Same as [`fit`].
pub fn fit_with_backend<B: SvdBackend>(
    dataset: &Dataset,
    config: &PcaConfig,
    backend: B,
) -> Result<IncrementalPca<B>> {
    ingest_all(
        IncrementalPca::with_backend(config.clone(), backend)?,
        dataset,
        None,
    )
}

/// Fit, then embed every trajectory with the final state.
///
/// Embeddings come back in dataset order. Every trajectory is projected with
/// the final model, never with the intermediate state of its own batch.
///
/// # Errors
///
/// Same as [`fit`].
pub fn fit_transform(
    dataset: &Dataset,
    config: &PcaConfig,
) -> Result<(IncrementalPca, Vec<Embedding>)> {
    let model = fit(dataset, config)?;
    let embeddings = model.transform_all(dataset.as_slice())?;
    Ok((model, embeddings))
}

fn ingest_all<B: SvdBackend>(
    mut engine: IncrementalPca<B>,
    dataset: &Dataset,
    cancel: Option<&AtomicBool>,
) -> Result<IncrementalPca<B>> {
    let feeder = BatchFeeder::new(dataset, engine.config.batch_size)?;
    let n_batches = feeder.n_batches();
    info!(
        "Fitting incremental PCA: {} trajectories, dim {}, {} batches of up to {}",
        dataset.len(),
        feeder.dim(),
        n_batches,
        feeder.batch_size()
    );

    for batch in feeder {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            warn!(
                "Fit cancelled after {}/{} batches, discarding model",
                engine.batches_ingested, n_batches
            );
            return Err(PcaError::Cancelled {
                batches_ingested: engine.batches_ingested,
            });
        }

        engine.ingest(&batch)?;
        debug!(
            "Ingested batch {}/{} (records {}..{}), rank {}",
            engine.batches_ingested,
            n_batches,
            batch.start(),
            batch.start() + batch.len(),
            engine.n_components()
        );
    }

    info!(
        "Fitted {} components over {} samples",
        engine.n_components(),
        engine.n_samples_seen()
    );
    Ok(engine)
}
