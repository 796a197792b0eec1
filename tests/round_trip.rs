//! Properties of the fitted basis across ranks and batch sizes.

use approx::assert_relative_eq;
use trajectory_pca::{
    compute_reconstruction_error, fit, fit_transform, format_trajectory, parse_trajectory,
    reconstruct_trajectory, Dataset, Embedding, ParsedTrajectory, PcaConfig,
};

// =============================================================================
// TRAJECTORY GENERATORS
// =============================================================================

/// Taxi-like tracks: a drifting start point with a bent heading.
fn generate_tracks(n: usize, points: usize) -> Dataset {
    (0..n)
        .map(|i| {
            let t = i as f64;
            let start = [-8.6 + 0.01 * (t * 1.7).sin(), 41.1 + 0.01 * (t * 0.9).cos()];
            let heading = 0.4 * t;
            let pts: Vec<[f64; 2]> = (0..points)
                .map(|k| {
                    let s = k as f64 * 0.002;
                    let bend = heading + 0.3 * (k as f64 * t * 0.37).sin();
                    [start[0] + s * bend.cos(), start[1] + s * bend.sin()]
                })
                .collect();
            ParsedTrajectory::from_points(&pts).unwrap()
        })
        .collect()
}

fn gram(embeddings: &[Embedding]) -> Vec<Vec<f64>> {
    embeddings
        .iter()
        .map(|a| embeddings.iter().map(|b| a.dot(b)).collect())
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[test]
fn test_text_round_trip() {
    let dataset = generate_tracks(5, 6);
    for t in &dataset {
        let text = format_trajectory(t);
        let parsed = parse_trajectory(&text).unwrap();
        assert_eq!(&parsed, t);
    }
}

#[test]
fn test_lossless_reconstruction() {
    let dataset = generate_tracks(30, 4);
    let model = fit(&dataset, &PcaConfig::lossless().with_batch_size(7)).unwrap();
    assert_eq!(model.n_components(), 8);

    for t in &dataset {
        let e = model.transform(t.as_slice()).unwrap();
        let r = reconstruct_trajectory(&model, &e).unwrap();
        let rmse = compute_reconstruction_error(t.as_slice(), r.as_slice());
        assert!(rmse < 1e-9, "RMSE too high: {rmse}");
    }
}

#[test]
fn test_rank_bounded_by_dimension_and_samples() {
    let dataset = generate_tracks(3, 5);
    let (model, embeddings) =
        fit_transform(&dataset, &PcaConfig::default().with_n_components(50)).unwrap();

    // min(50, D = 10, N = 3)
    assert_eq!(model.n_components(), 3);
    assert!(embeddings.iter().all(|e| e.dim() == 3));
}

#[test]
fn test_gram_matrix_independent_of_batch_size() {
    let dataset = generate_tracks(24, 3);

    let (_, small) = fit_transform(&dataset, &PcaConfig::lossless().with_batch_size(5)).unwrap();
    let (_, large) = fit_transform(&dataset, &PcaConfig::lossless().with_batch_size(24)).unwrap();
    assert_eq!(small[0].dim(), large[0].dim());

    // With R = D both are rotations of the same centered data.
    for (row_a, row_b) in gram(&small).iter().zip(gram(&large).iter()) {
        for (a, b) in row_a.iter().zip(row_b.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_fit_is_deterministic() {
    let dataset = generate_tracks(40, 5);
    let config = PcaConfig::default().with_n_components(4).with_batch_size(9);

    let (_, first) = fit_transform(&dataset, &config).unwrap();
    let (_, second) = fit_transform(&dataset, &config).unwrap();
    assert_eq!(first, second);
}
