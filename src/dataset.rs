//! Dataset loading.
//!
//! Source files hold one trajectory per record, as the first field of a
//! delimiter-separated line:
//!
//! ```text
//! POLYLINE;TRIP_ID
//! [[-8.618643, 41.141412], [-8.618499, 41.141376]];1372636858620000589
//! ```
//!
//! The record order is the only link between a trajectory and its embedding,
//! so it is preserved exactly.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::Index;
use std::path::Path;

use log::{debug, info, trace};

use crate::config::InputFormat;
use crate::error::{PcaError, Result};
use crate::parser::{parse_trajectory, ParsedTrajectory};

/// Ordered, read-only collection of parsed trajectories.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    trajectories: Vec<ParsedTrajectory>,
}

impl Dataset {
    /// Wrap already-parsed trajectories, keeping their order.
    #[must_use]
    pub fn new(trajectories: Vec<ParsedTrajectory>) -> Self {
        Self { trajectories }
    }

    /// Parse trajectory strings in order.
    ///
    /// # Errors
    ///
    /// Returns [`PcaError::Record`] wrapping the first parse failure.
    pub fn from_texts<I, S>(texts: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| parse_trajectory(text.as_ref()).map_err(|e| e.at_record(i)))
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    /// Number of trajectories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    /// Whether the dataset holds no trajectories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    /// Dimension of the first trajectory, if any.
    #[must_use]
    pub fn first_dim(&self) -> Option<usize> {
        self.trajectories.first().map(ParsedTrajectory::dim)
    }

    /// Trajectories in record order.
    #[must_use]
    pub fn as_slice(&self) -> &[ParsedTrajectory] {
        &self.trajectories
    }

    /// Iterate in record order.
    pub fn iter(&self) -> std::slice::Iter<'_, ParsedTrajectory> {
        self.trajectories.iter()
    }
}

impl Index<usize> for Dataset {
    type Output = ParsedTrajectory;

    fn index(&self, index: usize) -> &ParsedTrajectory {
        &self.trajectories[index]
    }
}

impl FromIterator<ParsedTrajectory> for Dataset {
    fn from_iter<T: IntoIterator<Item = ParsedTrajectory>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a ParsedTrajectory;
    type IntoIter = std::slice::Iter<'a, ParsedTrajectory>;

    fn into_iter(self) -> Self::IntoIter {
        self.trajectories.iter()
    }
}

/// Load a dataset from a delimiter-separated file.
///
/// # Errors
///
/// Returns [`PcaError::Io`] if the file cannot be opened or read, or
/// [`PcaError::Record`] for the first malformed trajectory.
pub fn load_dataset(path: &Path, format: &InputFormat) -> Result<Dataset> {
    let file = File::open(path).map_err(|e| PcaError::io(path, e))?;
    info!("Loading trajectories from {}", path.display());
    read_records(BufReader::new(file), format, path)
}

/// Read a dataset from any buffered source.
///
/// # Errors
///
/// Same as [`load_dataset`], with I/O errors reported against `<stream>`.
pub fn read_dataset<R: BufRead>(reader: R, format: &InputFormat) -> Result<Dataset> {
    read_records(reader, format, Path::new("<stream>"))
}

fn read_records<R: BufRead>(reader: R, format: &InputFormat, origin: &Path) -> Result<Dataset> {
    format.validate()?;

    let mut lines = reader.lines();
    if format.has_header {
        if let Some(header) = lines.next() {
            let header = header.map_err(|e| PcaError::io(origin, e))?;
            debug!("Skipping header: {header}");
        }
    }

    let mut trajectories = Vec::new();
    for line in lines {
        let line = line.map_err(|e| PcaError::io(origin, e))?;
        if line.trim().is_empty() {
            continue;
        }

        let index = trajectories.len();
        let field = first_field(&line, format.delimiter);
        let trajectory = parse_trajectory(field).map_err(|e| e.at_record(index))?;
        trace!("Record {index}: {} points", trajectory.n_points());
        trajectories.push(trajectory);
    }

    info!("Loaded {} trajectories", trajectories.len());
    Ok(Dataset::new(trajectories))
}

/// First field of a record. Delimiters inside brackets or double quotes do
/// not split; surrounding quotes are removed.
fn first_field(line: &str, delimiter: char) -> &str {
    let mut depth = 0usize;
    let mut quoted = false;
    let mut end = line.len();

    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '[' if !quoted => depth += 1,
            ']' if !quoted => depth = depth.saturating_sub(1),
            c if c == delimiter && depth == 0 && !quoted => {
                end = i;
                break;
            }
            _ => {}
        }
    }

    let field = line[..end].trim();
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .unwrap_or(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_first_field() {
        assert_eq!(first_field("[[1, 2]];abc", ';'), "[[1, 2]]");
        assert_eq!(first_field("[[1, 2], [3, 4]],abc", ','), "[[1, 2], [3, 4]]");
        assert_eq!(first_field("\"[[1, 2]]\";x", ';'), "[[1, 2]]");
        assert_eq!(first_field("\"[[1;2]]\"", ';'), "[[1;2]]");
        assert_eq!(first_field("[[1, 2]]", ';'), "[[1, 2]]");
    }

    #[test]
    fn test_read_with_header() {
        let input = "POLYLINE;ID\n[[0, 0], [1, 1]];a\n\n[[1, 1], [2, 2]];b\n";
        let dataset = read_dataset(Cursor::new(input), &InputFormat::default()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset[1].as_slice(), &[1.0, 1.0, 2.0, 2.0]);
        assert_eq!(dataset.first_dim(), Some(4));
    }

    #[test]
    fn test_read_without_header() {
        let format = InputFormat::default().with_header(false);
        let dataset = read_dataset(Cursor::new("[[0, 0]]\r\n[[5, 6]]\r\n"), &format).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset[0].as_slice(), &[0.0, 0.0]);
    }

    #[test]
    fn test_header_only_is_empty() {
        let dataset = read_dataset(Cursor::new("POLYLINE\n"), &InputFormat::default()).unwrap();
        assert!(dataset.is_empty());
        assert_eq!(dataset.first_dim(), None);
    }

    #[test]
    fn test_bad_record_reports_index() {
        let input = "h\n[[0, 0]]\n[[1,2],[3]]\n";
        let err = read_dataset(Cursor::new(input), &InputFormat::default()).unwrap_err();
        match err {
            PcaError::Record { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(*source, PcaError::Parse { position: 9, .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_texts() {
        let dataset = Dataset::from_texts(["[[0, 0]]", "[[1, 1]]"]).unwrap();
        assert_eq!(dataset.iter().count(), 2);
        assert!(Dataset::from_texts(["[[0, 0]]", "[0, 0]"]).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_dataset(Path::new("/nonexistent/tracks.csv"), &InputFormat::default())
            .unwrap_err();
        assert!(matches!(err, PcaError::Io { .. }));
    }
}
