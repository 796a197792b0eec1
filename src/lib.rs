//! Trajectory PCA Library
//!
//! Fixed-size embeddings for variable-length GPS trajectories via
//! incremental principal component analysis.
//!
//! Trajectories arrive as bracketed coordinate lists, are flattened into
//! `D`-dimensional vectors, and are folded into a truncated SVD one batch at
//! a time. Once every batch has been ingested, each trajectory is projected
//! onto the final basis, giving one `R`-dimensional embedding per input, in
//! input order. Embeddings are suited to similarity search, clustering and
//! indexing.
//!
//! # Features
//!
//! - **Streaming fit**: memory for the fit is `O(batch_size × D)`, not `O(N × D)`
//! - **Exact when lossless**: with `R = D` the projection is a pure rotation
//! - **Swappable SVD**: the decomposition sits behind [`SvdBackend`]
//! - **Parallel transform**: the projection pass runs on rayon (`parallel` feature)
//!
//! # Quick Start
//!
//! ```
//! use trajectory_pca::{fit_transform, Dataset, PcaConfig};
//!
//! let dataset = Dataset::from_texts([
//!     "[[0.0, 0.0], [1.0, 1.0]]",
//!     "[[1.0, 1.0], [2.0, 2.0]]",
//!     "[[2.0, 2.0], [3.0, 3.0]]",
//! ])?;
//!
//! let config = PcaConfig::default().with_n_components(2).with_batch_size(2);
//! let (model, embeddings) = fit_transform(&dataset, &config)?;
//!
//! assert_eq!(model.n_samples_seen(), 3);
//! assert_eq!(embeddings.len(), 3);
//! assert_eq!(embeddings[0].dim(), 2);
//! # Ok::<(), trajectory_pca::PcaError>(())
//! ```
//!
//! # Pipeline
//!
//! | Stage | Item | Output |
//! |-------|------|--------|
//! | Parse | [`parse_trajectory`] | [`ParsedTrajectory`] |
//! | Load | [`load_dataset`] | [`Dataset`] |
//! | Batch | [`BatchFeeder`] | [`Batch`] |
//! | Fit | [`IncrementalPca::ingest`] | [`PcaState`] |
//! | Embed | [`IncrementalPca::transform_all`] | [`Embedding`] |
//! | Store | [`EmbeddingStore`] | `{"xn": [[...]]}` |

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::many_single_char_names)]

pub mod config;
pub mod dataset;
pub mod decoder;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod feeder;
pub mod math;
pub mod parser;
pub mod pipeline;
pub mod store;
pub mod variance;

// Re-exports for convenient access
pub use config::{InputFormat, PcaConfig, RunConfig, DEFAULT_BATCH_SIZE, DEFAULT_N_COMPONENTS};
pub use dataset::{load_dataset, read_dataset, Dataset};
pub use decoder::{compute_reconstruction_error, reconstruct_trajectory};
pub use embedding::Embedding;
pub use engine::{
    fit, fit_cancellable, fit_transform, fit_with_backend, IncrementalPca, PcaState,
};
pub use error::{PcaError, Result};
pub use feeder::{feed, Batch, BatchFeeder};
pub use math::{NalgebraSvd, SvdBackend, ThinSvd};
pub use parser::{format_trajectory, parse_trajectory, ParsedTrajectory};
pub use pipeline::{embed_dataset, run, RunSummary};
pub use store::{store, EmbeddingStore, EMBEDDINGS_KEY};
pub use variance::VarianceReport;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
