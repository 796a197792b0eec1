//! End-to-end embedding run.
//!
//! `run` validates the configuration, loads the dataset, fits the model,
//! embeds every trajectory with the final state and writes the result. Any
//! failure aborts the whole run before the output file is created.

use log::info;

use crate::config::{PcaConfig, RunConfig};
use crate::dataset::{load_dataset, Dataset};
use crate::engine::{fit, IncrementalPca};
use crate::error::Result;
use crate::store::EmbeddingStore;
use crate::variance::VarianceReport;

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Number of trajectories embedded.
    pub n_trajectories: usize,

    /// Trajectory dimension D.
    pub dim: usize,

    /// Embedding rank R.
    pub rank: usize,

    /// Number of ingest batches.
    pub batches: usize,

    /// Variance captured by the retained components.
    pub variance: Option<VarianceReport>,
}

/// Fit on `dataset` and embed it, in order.
///
/// # Errors
///
/// Propagates any parsing, dimension, fitting or cardinality error.
pub fn embed_dataset(
    dataset: &Dataset,
    config: &PcaConfig,
) -> Result<(IncrementalPca, EmbeddingStore)> {
    let model = fit(dataset, config)?;
    let embeddings = model.transform_all(dataset.as_slice())?;
    let store = EmbeddingStore::new(embeddings, dataset.len())?;
    Ok((model, store))
}

/// Run the full pipeline described by `config`.
///
/// # Errors
///
/// Returns the first error encountered; no output is written in that case.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    config.validate()?;

    let dataset = load_dataset(&config.input, &config.format)?;
    let (model, store) = embed_dataset(&dataset, &config.pca)?;

    let variance = VarianceReport::from_model(&model);
    if let Some(report) = &variance {
        info!(
            "Retained {} components explaining {:.2}% of variance (effective dim {:.2})",
            report.n_components,
            report.total_explained() * 100.0,
            report.effective_dimensionality
        );
    }

    store.write_json(&config.output)?;

    Ok(RunSummary {
        n_trajectories: store.len(),
        dim: model.dim().unwrap_or(0),
        rank: store.rank(),
        batches: model.batches_ingested(),
        variance,
    })
}
