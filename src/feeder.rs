//! Ordered batch streaming over a dataset.
//!
//! [`BatchFeeder`] hands out contiguous slices of at most `batch_size`
//! trajectories, in record order. A batch is only turned into a dense matrix
//! when the engine ingests it, so the ingest phase holds one `batch_size × D`
//! matrix at a time.

use nalgebra::DMatrix;

use crate::dataset::Dataset;
use crate::error::{PcaError, Result};
use crate::parser::ParsedTrajectory;

/// A contiguous run of trajectories from the dataset.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    start: usize,
    dim: usize,
    rows: &'a [ParsedTrajectory],
}

impl<'a> Batch<'a> {
    /// Index of the first trajectory in the dataset.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// Number of trajectories in the batch.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch is empty. Feeders never emit empty batches.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Shared trajectory dimension D.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Trajectories in the batch.
    #[must_use]
    pub const fn rows(&self) -> &'a [ParsedTrajectory] {
        self.rows
    }

    /// Dense `len × dim` matrix, one trajectory per row.
    #[must_use]
    pub fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.rows.len(), self.dim, |i, j| self.rows[i].as_slice()[j])
    }
}

/// Lazy, ordered sequence of batches over a validated dataset.
#[derive(Debug, Clone)]
pub struct BatchFeeder<'a> {
    rows: &'a [ParsedTrajectory],
    batch_size: usize,
    dim: usize,
    next: usize,
}

impl<'a> BatchFeeder<'a> {
    /// Validate the dataset and prepare to stream it.
    ///
    /// Every trajectory must share the dimension of the first one. The check
    /// covers the whole dataset before the first batch is available.
    ///
    /// # Errors
    ///
    /// - [`PcaError::EmptyDataset`] if there are no trajectories
    /// - [`PcaError::InvalidConfig`] if `batch_size` is zero
    /// - [`PcaError::DimensionMismatch`] naming the first offending record
    pub fn new(dataset: &'a Dataset, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(PcaError::invalid_config("batch_size must be at least 1"));
        }
        let rows = dataset.as_slice();
        let dim = dataset.first_dim().ok_or(PcaError::EmptyDataset)?;

        if let Some((index, bad)) = rows.iter().enumerate().find(|(_, t)| t.dim() != dim) {
            return Err(PcaError::dimension_mismatch(index, dim, bad.dim()));
        }

        Ok(Self {
            rows,
            batch_size,
            dim,
            next: 0,
        })
    }

    /// Shared trajectory dimension D.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Configured batch size.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Total number of batches over the whole dataset.
    #[must_use]
    pub fn n_batches(&self) -> usize {
        self.rows.len().div_ceil(self.batch_size)
    }
}

impl<'a> Iterator for BatchFeeder<'a> {
    type Item = Batch<'a>;

    fn next(&mut self) -> Option<Batch<'a>> {
        if self.next >= self.rows.len() {
            return None;
        }
        let start = self.next;
        let end = (start + self.batch_size).min(self.rows.len());
        self.next = end;

        Some(Batch {
            start,
            dim: self.dim,
            rows: &self.rows[start..end],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.rows.len() - self.next).div_ceil(self.batch_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BatchFeeder<'_> {}

/// Validate `dataset` and stream it in batches of `batch_size`.
///
/// # Errors
///
/// See [`BatchFeeder::new`].
pub fn feed(dataset: &Dataset, batch_size: usize) -> Result<BatchFeeder<'_>> {
    BatchFeeder::new(dataset, batch_size)
}
