//! Configuration for incremental PCA and end-to-end runs.
//!
//! [`PcaConfig`] holds the engine parameters, [`InputFormat`] describes the
//! delimiter-separated source records, and [`RunConfig`] bundles both with the
//! input and output paths. All three are built once and passed down by
//! reference; nothing in the crate reads global state.
//!
//! # Example
//!
//! ```
//! use trajectory_pca::PcaConfig;
//!
//! let config = PcaConfig::default().with_n_components(8).with_batch_size(64);
//! assert!(config.validate().is_ok());
//! ```

use std::path::{Path, PathBuf};

use crate::error::{PcaError, Result};

/// Default target rank of the embedding.
pub const DEFAULT_N_COMPONENTS: usize = 50;

/// Default number of trajectories per ingest batch.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Parameters of the incremental PCA engine.
#[derive(Debug, Clone, PartialEq)]
pub struct PcaConfig {
    /// Target embedding rank R. Clamped to the data dimension and the number
    /// of samples seen when either is smaller.
    pub n_components: usize,

    /// Number of trajectories ingested per update.
    pub batch_size: usize,

    /// Convergence tolerance handed to the SVD backend.
    pub svd_eps: f64,

    /// Iteration cap for the SVD backend. `0` iterates until convergence.
    pub max_svd_iterations: usize,
}

impl Default for PcaConfig {
    fn default() -> Self {
        Self {
            n_components: DEFAULT_N_COMPONENTS,
            batch_size: DEFAULT_BATCH_SIZE,
            svd_eps: f64::EPSILON,
            max_svd_iterations: 0,
        }
    }
}

impl PcaConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.n_components == 0 {
            return Err(PcaError::invalid_config("n_components must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(PcaError::invalid_config("batch_size must be at least 1"));
        }
        if !(self.svd_eps.is_finite() && self.svd_eps > 0.0) {
            return Err(PcaError::invalid_config(
                "svd_eps must be finite and positive",
            ));
        }
        Ok(())
    }

    /// Lossless preset: keep every component the data supports.
    #[must_use]
    pub fn lossless() -> Self {
        Self {
            n_components: usize::MAX,
            ..Self::default()
        }
    }

    /// Set the target rank.
    #[must_use]
    pub const fn with_n_components(mut self, n_components: usize) -> Self {
        self.n_components = n_components;
        self
    }

    /// Set the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the SVD iteration cap.
    #[must_use]
    pub const fn with_max_svd_iterations(mut self, max_iterations: usize) -> Self {
        self.max_svd_iterations = max_iterations;
        self
    }

    /// Rank actually retained for `dim` features after `n_samples` samples.
    #[must_use]
    pub fn effective_rank(&self, dim: usize, n_samples: usize) -> usize {
        self.n_components.min(dim).min(n_samples)
    }
}

/// Layout of the delimiter-separated source records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFormat {
    /// Field delimiter. The trajectory is the first field.
    pub delimiter: char,

    /// Whether the first record is a header to skip.
    pub has_header: bool,
}

impl Default for InputFormat {
    fn default() -> Self {
        Self {
            delimiter: ';',
            has_header: true,
        }
    }
}

impl InputFormat {
    /// Validate the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the delimiter collides with the trajectory syntax.
    pub fn validate(&self) -> Result<()> {
        if matches!(self.delimiter, '[' | ']' | '"' | '\n' | '\r') {
            return Err(PcaError::invalid_config(format!(
                "delimiter {:?} clashes with the trajectory syntax",
                self.delimiter
            )));
        }
        Ok(())
    }

    /// Set the delimiter.
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set whether a header record is present.
    #[must_use]
    pub const fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }
}

/// Immutable description of one end-to-end run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Source CSV file.
    pub input: PathBuf,

    /// Destination JSON file.
    pub output: PathBuf,

    /// Source record layout.
    pub format: InputFormat,

    /// Engine parameters.
    pub pca: PcaConfig,
}

impl RunConfig {
    /// Create a run configuration with default format and engine settings.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            format: InputFormat::default(),
            pca: PcaConfig::default(),
        }
    }

    /// Set the engine parameters.
    #[must_use]
    pub fn with_pca(mut self, pca: PcaConfig) -> Self {
        self.pca = pca;
        self
    }

    /// Set the source record layout.
    #[must_use]
    pub fn with_format(mut self, format: InputFormat) -> Self {
        self.format = format;
        self
    }

    /// Validate paths and nested configuration.
    ///
    /// Path checks are purely lexical; nothing is opened.
    ///
    /// # Errors
    ///
    /// Returns [`PcaError::FileFormat`] for a wrong input or output extension,
    /// or [`PcaError::InvalidConfig`] for bad engine or format settings.
    pub fn validate(&self) -> Result<()> {
        if !has_extension(&self.input, "csv") {
            return Err(PcaError::file_format("Input", "CSV", &self.input));
        }
        if !has_extension(&self.output, "json") {
            return Err(PcaError::file_format("Output", "JSON", &self.output));
        }
        self.format.validate()?;
        self.pca.validate()
    }
}

fn has_extension(path: &Path, expected: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PcaConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.n_components, 50);
        assert_eq!(config.batch_size, 500);
    }

    #[test]
    fn test_validation() {
        let mut config = PcaConfig::default();

        config.n_components = 0;
        assert!(config.validate().is_err());

        config.n_components = 2;
        config.batch_size = 0;
        assert!(config.validate().is_err());

        config.batch_size = 10;
        config.svd_eps = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder_pattern() {
        let config = PcaConfig::default()
            .with_n_components(3)
            .with_batch_size(7)
            .with_max_svd_iterations(100);
        assert_eq!(config.n_components, 3);
        assert_eq!(config.batch_size, 7);
        assert_eq!(config.max_svd_iterations, 100);
    }

    #[test]
    fn test_effective_rank_clamps() {
        let config = PcaConfig::default().with_n_components(10);
        assert_eq!(config.effective_rank(4, 100), 4);
        assert_eq!(config.effective_rank(40, 3), 3);
        assert_eq!(config.effective_rank(40, 100), 10);
        assert_eq!(PcaConfig::lossless().effective_rank(6, 100), 6);
    }

    #[test]
    fn test_run_config_extensions() {
        assert!(RunConfig::new("porto.csv", "porto.json").validate().is_ok());
        assert!(RunConfig::new("PORTO.CSV", "out.JSON").validate().is_ok());

        let err = RunConfig::new("porto.txt", "porto.json")
            .validate()
            .unwrap_err();
        assert!(matches!(err, PcaError::FileFormat { role: "Input", .. }));

        let err = RunConfig::new("porto.csv", "porto.pkl")
            .validate()
            .unwrap_err();
        assert!(matches!(err, PcaError::FileFormat { role: "Output", .. }));
    }

    #[test]
    fn test_input_format_rejects_bracket_delimiter() {
        let format = InputFormat::default().with_delimiter('[');
        assert!(format.validate().is_err());
        assert!(InputFormat::default().with_delimiter(',').validate().is_ok());
    }
}
