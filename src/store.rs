//! Ordered embedding output.
//!
//! [`EmbeddingStore`] holds one embedding per input trajectory, in input
//! order, and serialises them as a single JSON object mapping the key `xn`
//! to an `N × R` array:
//!
//! ```text
//! {"xn": [[-2.0, 0.0], [0.0, 0.0], [2.0, 0.0]]}
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::embedding::Embedding;
use crate::error::{PcaError, Result};

/// Key under which the embedding matrix is stored.
pub const EMBEDDINGS_KEY: &str = "xn";

/// Embeddings in dataset order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingStore {
    #[serde(rename = "xn")]
    embeddings: Vec<Embedding>,
}

impl EmbeddingStore {
    /// Collect embeddings, checking they cover the whole dataset.
    ///
    /// # Errors
    ///
    /// - [`PcaError::CardinalityMismatch`] if `embeddings.len() != expected_len`
    /// - [`PcaError::DimensionMismatch`] if the embeddings disagree on rank
    pub fn new(embeddings: Vec<Embedding>, expected_len: usize) -> Result<Self> {
        if embeddings.len() != expected_len {
            return Err(PcaError::CardinalityMismatch {
                expected: expected_len,
                actual: embeddings.len(),
            });
        }
        if let Some(first) = embeddings.first() {
            let rank = first.dim();
            if let Some((index, bad)) = embeddings.iter().enumerate().find(|(_, e)| e.dim() != rank)
            {
                return Err(PcaError::dimension_mismatch(index, rank, bad.dim()));
            }
        }
        Ok(Self { embeddings })
    }

    /// Number of embeddings N.
    #[must_use]
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Embedding dimension R (0 when empty).
    #[must_use]
    pub fn rank(&self) -> usize {
        self.embeddings.first().map_or(0, Embedding::dim)
    }

    /// `(N, R)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.len(), self.rank())
    }

    /// Embeddings in dataset order.
    #[must_use]
    pub fn embeddings(&self) -> &[Embedding] {
        &self.embeddings
    }

    /// Row slices in dataset order.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.embeddings.iter().map(Embedding::as_slice)
    }

    /// Consume into the embeddings.
    #[must_use]
    pub fn into_embeddings(self) -> Vec<Embedding> {
        self.embeddings
    }

    /// Serialise to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`PcaError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Write the store to `path`.
    ///
    /// The data goes to a uniquely named temporary file in the destination
    /// directory and is renamed into place once complete, so `path` never
    /// holds a partial result.
    ///
    /// # Errors
    ///
    /// Returns [`PcaError::Io`] or [`PcaError::Serialization`]; the temporary
    /// file is removed on failure.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PcaError::io(path, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, self)?;
            writer.flush().map_err(|e| PcaError::io(path, e))?;
        }
        tmp.persist(path).map_err(|e| PcaError::io(path, e.error))?;

        info!(
            "Wrote {}x{} embeddings to {}",
            self.len(),
            self.rank(),
            path.display()
        );
        Ok(())
    }

    /// Read a store written by [`EmbeddingStore::write_json`].
    ///
    /// # Errors
    ///
    /// Returns [`PcaError::Io`], [`PcaError::Serialization`], or
    /// [`PcaError::DimensionMismatch`] for ragged rows.
    pub fn read_json(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| PcaError::io(path, e))?;
        let store: Self = serde_json::from_reader(BufReader::new(file))?;
        let len = store.len();
        Self::new(store.embeddings, len)
    }
}

/// Collect ordered embeddings into a store.
///
/// # Errors
///
/// See [`EmbeddingStore::new`].
pub fn store(embeddings: Vec<Embedding>, expected_len: usize) -> Result<EmbeddingStore> {
    EmbeddingStore::new(embeddings, expected_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Embedding> {
        vec![
            Embedding::new(vec![-2.0, 0.0]),
            Embedding::new(vec![0.0, 0.0]),
            Embedding::new(vec![2.0, 0.5]),
        ]
    }

    #[test]
    fn test_shape_and_order() {
        let s = store(sample(), 3).unwrap();
        assert_eq!(s.shape(), (3, 2));
        let rows: Vec<&[f64]> = s.rows().collect();
        assert_eq!(rows[2], &[2.0, 0.5]);
    }

    #[test]
    fn test_cardinality_check() {
        let err = store(sample(), 4).unwrap_err();
        assert!(matches!(
            err,
            PcaError::CardinalityMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let mut rows = sample();
        rows.push(Embedding::new(vec![1.0]));
        assert!(matches!(
            store(rows, 4),
            Err(PcaError::DimensionMismatch { index: 3, .. })
        ));
    }

    #[test]
    fn test_json_layout() {
        let s = store(sample(), 3).unwrap();
        let json = s.to_json().unwrap();
        assert_eq!(json, r#"{"xn":[[-2.0,0.0],[0.0,0.0],[2.0,0.5]]}"#);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get(EMBEDDINGS_KEY).is_some());
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");

        let s = store(sample(), 3).unwrap();
        s.write_json(&path).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("out.json")]);
        assert_eq!(EmbeddingStore::read_json(&path).unwrap(), s);
    }

    #[test]
    fn test_write_leaves_neighbouring_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let neighbour = dir.path().join("out.json.tmp");
        std::fs::write(&neighbour, "keep me").unwrap();

        let s = store(sample(), 3).unwrap();
        s.write_json(&path).unwrap();
        s.write_json(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&neighbour).unwrap(), "keep me");
        assert_eq!(EmbeddingStore::read_json(&path).unwrap(), s);
    }

    #[test]
    fn test_unwritable_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.json");
        let err = store(sample(), 3).unwrap().write_json(&path).unwrap_err();
        assert!(matches!(err, PcaError::Io { .. }));
        assert!(!path.exists());
    }
}
