//! Linear algebra utilities for incremental PCA.
//!
//! The engine only needs a thin SVD of a dense matrix. That requirement is
//! captured by [`SvdBackend`] so the decomposition can be swapped without
//! touching the engine; [`NalgebraSvd`] is the default implementation.

use std::cmp::Ordering;

use nalgebra::{DMatrix, DVector, SVD};

use crate::config::PcaConfig;
use crate::error::{PcaError, Result};

/// Largest accepted `‖U·S·Vᵀ − A‖ / max(‖A‖, 1)` for a decomposition.
const RECOMPOSE_TOLERANCE: f64 = 1e-9;

/// Thin singular value decomposition, right factor only.
#[derive(Debug, Clone)]
pub struct ThinSvd {
    /// Singular values sorted in descending order.
    pub singular_values: DVector<f64>,

    /// Right singular vectors as rows, aligned with `singular_values`.
    pub v_t: DMatrix<f64>,
}

/// A dense SVD routine.
///
/// Implementations must return singular values with matching rows of `V^T`.
/// Ordering and sign are normalised afterwards by [`normalize_svd`], so a
/// backend may return them in any order.
pub trait SvdBackend: Send + Sync {
    /// Decompose `matrix` (m×n) into `min(m, n)` singular triplets.
    ///
    /// # Errors
    ///
    /// Returns [`PcaError::Numerical`] if the decomposition fails or does not
    /// reproduce `matrix`.
    fn thin_svd(&self, matrix: DMatrix<f64>) -> Result<ThinSvd>;
}

/// Golub-Kahan bidiagonal SVD from nalgebra.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NalgebraSvd {
    /// Convergence tolerance.
    pub eps: f64,

    /// Iteration cap, `0` for unbounded.
    pub max_iterations: usize,
}

impl Default for NalgebraSvd {
    fn default() -> Self {
        Self {
            eps: f64::EPSILON,
            max_iterations: 0,
        }
    }
}

impl NalgebraSvd {
    /// Backend configured from engine parameters.
    #[must_use]
    pub fn from_config(config: &PcaConfig) -> Self {
        Self {
            eps: config.svd_eps,
            max_iterations: config.max_svd_iterations,
        }
    }
}

impl SvdBackend for NalgebraSvd {
    fn thin_svd(&self, matrix: DMatrix<f64>) -> Result<ThinSvd> {
        let (nrows, ncols) = matrix.shape();
        let keep = nrows.min(ncols);

        // Wide inputs are padded with zero rows to a square matrix. Zero rows
        // leave S and V unchanged; the padded triplets are dropped below.
        let padded = if nrows < ncols {
            matrix.resize_vertically(ncols, 0.0)
        } else {
            matrix
        };

        let svd = SVD::try_new(padded.clone(), true, true, self.eps, self.max_iterations)
            .ok_or_else(|| {
                PcaError::numerical(format!("SVD of {nrows}x{ncols} matrix did not converge"))
            })?;
        let singular_values = svd.singular_values.clone();
        let v_t = svd
            .v_t
            .clone()
            .ok_or_else(|| PcaError::numerical("SVD returned no right singular vectors"))?;

        let recomposed = svd
            .recompose()
            .map_err(|e| PcaError::numerical(format!("SVD recomposition failed: {e}")))?;
        let residual = (&recomposed - &padded).norm();
        let tolerance = RECOMPOSE_TOLERANCE * padded.norm().max(1.0);
        if residual.is_nan() || residual > tolerance {
            return Err(PcaError::numerical(format!(
                "SVD of {nrows}x{ncols} matrix has recomposition residual {residual:e}"
            )));
        }

        let sorted = normalize_svd(ThinSvd {
            singular_values,
            v_t,
        });
        Ok(ThinSvd {
            singular_values: sorted.singular_values.rows(0, keep).into_owned(),
            v_t: sorted.v_t.rows(0, keep).into_owned(),
        })
    }
}

/// Sort singular triplets in descending order and fix component signs.
///
/// The sort is stable: equal singular values keep the backend's output
/// order, so different backends may disagree on tied components.
#[must_use]
pub fn normalize_svd(svd: ThinSvd) -> ThinSvd {
    let ThinSvd {
        singular_values,
        v_t,
    } = svd;

    let mut order: Vec<usize> = (0..singular_values.len()).collect();
    order.sort_by(|&a, &b| {
        singular_values[b]
            .partial_cmp(&singular_values[a])
            .unwrap_or(Ordering::Equal)
    });

    let sorted_values =
        DVector::from_iterator(order.len(), order.iter().map(|&i| singular_values[i]));
    let mut sorted_v_t = v_t.select_rows(order.iter());
    apply_sign_correction(&mut sorted_v_t);

    ThinSvd {
        singular_values: sorted_values,
        v_t: sorted_v_t,
    }
}

/// Flip each row of `v_t` so its largest-magnitude entry is positive.
///
/// Singular vectors are only defined up to sign; this pins one
/// orientation so repeated fits give the same components.
pub fn apply_sign_correction(v_t: &mut DMatrix<f64>) {
    for mut row in v_t.row_iter_mut() {
        let max_idx = row
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.abs().partial_cmp(&b.abs()).unwrap_or(Ordering::Equal))
            .map_or(0, |(i, _)| i);

        if row.ncols() > 0 && row[max_idx] < 0.0 {
            for value in row.iter_mut() {
                *value = -*value;
            }
        }
    }
}

/// Per-column mean of an m×n matrix.
#[must_use]
pub fn column_means(matrix: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(
        matrix.ncols(),
        matrix.column_iter().map(|col| col.sum() / col.len() as f64),
    )
}

/// Per-column population variance around the given means.
#[must_use]
pub fn column_variances(matrix: &DMatrix<f64>, means: &DVector<f64>) -> DVector<f64> {
    DVector::from_iterator(
        matrix.ncols(),
        matrix.column_iter().zip(means.iter()).map(|(col, &mean)| {
            col.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / col.len() as f64
        }),
    )
}

/// Subtract `means` from every row.
#[must_use]
pub fn center_rows(matrix: &DMatrix<f64>, means: &DVector<f64>) -> DMatrix<f64> {
    let mut centered = matrix.clone();
    for mut row in centered.row_iter_mut() {
        for (value, &mean) in row.iter_mut().zip(means.iter()) {
            *value -= mean;
        }
    }
    centered
}

/// Whether every entry of the matrix is finite.
#[must_use]
pub fn all_finite(matrix: &DMatrix<f64>) -> bool {
    matrix.iter().all(|v| v.is_finite())
}
