//! Trajectory reconstruction from embeddings.
//!
//! Reconstruction maps an embedding back through the fitted components and
//! adds the mean back. With `R = D` the basis is a full rotation and the
//! round trip is exact up to floating-point error; with `R < D` the result
//! is the closest point in the retained subspace.

use crate::embedding::Embedding;
use crate::engine::IncrementalPca;
use crate::error::Result;
use crate::math::linalg::SvdBackend;
use crate::parser::ParsedTrajectory;

/// Reconstruct a trajectory from its embedding.
///
/// # Errors
///
/// Returns [`crate::PcaError::NotFitted`] for an unfitted model, or
/// [`crate::PcaError::DimensionMismatch`] if the embedding rank differs from
/// the model's.
pub fn reconstruct_trajectory<B: SvdBackend>(
    model: &IncrementalPca<B>,
    embedding: &Embedding,
) -> Result<ParsedTrajectory> {
    let coords = model.inverse_transform(embedding)?;
    ParsedTrajectory::from_coords(coords)
}

/// Root mean square error between two coordinate vectors.
///
/// Returns `INFINITY` for mismatched lengths and `0` for empty input.
#[must_use]
pub fn compute_reconstruction_error(original: &[f64], reconstructed: &[f64]) -> f64 {
    if original.len() != reconstructed.len() {
        return f64::INFINITY;
    }

    if original.is_empty() {
        return 0.0;
    }

    let mse: f64 = original
        .iter()
        .zip(reconstructed.iter())
        .map(|(o, r)| (o - r) * (o - r))
        .sum::<f64>()
        / original.len() as f64;

    mse.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PcaConfig;
    use crate::dataset::Dataset;
    use crate::engine::fit;

    fn circle_tracks(n: usize, points: usize) -> Dataset {
        (0..n)
            .map(|i| {
                let radius = 1.0 + i as f64 * 0.1;
                let phase = i as f64 * 0.3;
                let pts: Vec<[f64; 2]> = (0..points)
                    .map(|k| {
                        let a = phase + k as f64 * 0.5;
                        [radius * a.cos(), radius * a.sin()]
                    })
                    .collect();
                ParsedTrajectory::from_points(&pts).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_round_trip_lossless() {
        let dataset = circle_tracks(20, 3);
        let model = fit(&dataset, &PcaConfig::lossless().with_batch_size(4)).unwrap();
        assert_eq!(model.n_components(), 6);

        for t in &dataset {
            let e = model.transform(t.as_slice()).unwrap();
            let r = reconstruct_trajectory(&model, &e).unwrap();
            let rmse = compute_reconstruction_error(t.as_slice(), r.as_slice());
            assert!(rmse < 1e-9, "RMSE too high: {rmse}");
        }
    }

    #[test]
    fn test_round_trip_lossy() {
        let dataset = circle_tracks(20, 4);
        let config = PcaConfig::default().with_n_components(2).with_batch_size(5);
        let model = fit(&dataset, &config).unwrap();

        let t = &dataset[3];
        let e = model.transform(t.as_slice()).unwrap();
        let r = reconstruct_trajectory(&model, &e).unwrap();
        assert_eq!(r.dim(), t.dim());
        let rmse = compute_reconstruction_error(t.as_slice(), r.as_slice());
        // Projection onto the subspace never does worse than the mean alone.
        let baseline =
            compute_reconstruction_error(t.as_slice(), model.state().unwrap().mean().as_slice());
        assert!(rmse.is_finite());
        assert!(rmse <= baseline + 1e-12, "RMSE {rmse} above baseline {baseline}");
    }

    #[test]
    fn test_error_edge_cases() {
        assert_eq!(compute_reconstruction_error(&[], &[]), 0.0);
        assert!(compute_reconstruction_error(&[1.0], &[1.0, 2.0]).is_infinite());
        let rmse = compute_reconstruction_error(&[0.0, 0.0], &[3.0, 4.0]);
        assert!((rmse - 12.5f64.sqrt()).abs() < 1e-12);
    }
}
