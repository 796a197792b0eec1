//! Mathematical utilities for incremental PCA.
//!
//! - [`linalg`]: SVD backend abstraction, sign correction, column statistics

pub mod linalg;

pub use linalg::{apply_sign_correction, normalize_svd, NalgebraSvd, SvdBackend, ThinSvd};
