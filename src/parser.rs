//! Trajectory text parsing.
//!
//! A trajectory is written as a bracketed list of coordinate pairs:
//!
//! ```text
//! [[-8.618643, 41.141412], [-8.618499, 41.141376], [-8.620326, 41.14251]]
//! ```
//!
//! [`parse_trajectory`] scans this byte by byte and flattens the pairs into a
//! single vector `[x0, y0, x1, y1, ...]`, so `N` points yield dimension `2N`.
//! Errors carry the byte offset where scanning stopped.

use std::fmt;

use crate::error::{PcaError, Result};

/// A parsed trajectory: flat, immutable `[x0, y0, x1, y1, ...]` coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTrajectory {
    coords: Vec<f64>,
}

impl ParsedTrajectory {
    /// Build a trajectory from flat coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`PcaError::Parse`] if `coords` is empty, has odd length, or
    /// contains a non-finite value.
    pub fn from_coords(coords: Vec<f64>) -> Result<Self> {
        if coords.is_empty() {
            return Err(PcaError::parse(0, "trajectory has no points"));
        }
        if coords.len() % 2 != 0 {
            return Err(PcaError::parse(
                0,
                format!("odd coordinate count {}", coords.len()),
            ));
        }
        if let Some(i) = coords.iter().position(|v| !v.is_finite()) {
            return Err(PcaError::parse(0, format!("non-finite coordinate at {i}")));
        }
        Ok(Self { coords })
    }

    /// Build a trajectory from `[x, y]` points.
    ///
    /// # Errors
    ///
    /// Same conditions as [`ParsedTrajectory::from_coords`].
    pub fn from_points(points: &[[f64; 2]]) -> Result<Self> {
        Self::from_coords(points.iter().flatten().copied().collect())
    }

    /// Dimension D (twice the point count).
    #[must_use]
    pub fn dim(&self) -> usize {
        self.coords.len()
    }

    /// Number of `[x, y]` points.
    #[must_use]
    pub fn n_points(&self) -> usize {
        self.coords.len() / 2
    }

    /// Flat coordinate slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.coords
    }

    /// Iterate over `[x, y]` points.
    pub fn points(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
        self.coords.chunks_exact(2).map(|p| [p[0], p[1]])
    }

    /// Consume into the flat coordinate vector.
    #[must_use]
    pub fn into_coords(self) -> Vec<f64> {
        self.coords
    }
}

impl fmt::Display for ParsedTrajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, [x, y]) in self.points().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            // Debug formatting is the shortest representation that parses back exactly.
            write!(f, "[{x:?}, {y:?}]")?;
        }
        f.write_str("]")
    }
}

/// Parse a bracketed coordinate list into a [`ParsedTrajectory`].
///
/// # Errors
///
/// Returns [`PcaError::Parse`] on missing or unbalanced brackets, a pair that
/// does not hold exactly two fields, a non-numeric or non-finite field, an
/// empty list, or trailing characters after the closing bracket.
///
/// # Example
///
/// ```
/// use trajectory_pca::parse_trajectory;
///
/// let t = parse_trajectory("[[0.0, 0.0], [1.0, 1.5]]")?;
/// assert_eq!(t.as_slice(), &[0.0, 0.0, 1.0, 1.5]);
/// # Ok::<(), trajectory_pca::PcaError>(())
/// ```
pub fn parse_trajectory(text: &str) -> Result<ParsedTrajectory> {
    let mut scanner = Scanner::new(text);
    let mut coords = Vec::new();

    scanner.expect(b'[', "missing opening bracket")?;
    if scanner.peek() == Some(b']') {
        return Err(scanner.error("trajectory has no points"));
    }

    loop {
        let [x, y] = scanner.pair()?;
        coords.push(x);
        coords.push(y);

        match scanner.peek() {
            Some(b',') => scanner.bump(),
            Some(b']') => {
                scanner.bump();
                break;
            }
            None => return Err(scanner.error("unbalanced brackets: list is not closed")),
            Some(_) => return Err(scanner.error("expected ',' or ']' after pair")),
        }
    }

    if scanner.peek().is_some() {
        return Err(scanner.error("unexpected characters after closing bracket"));
    }

    Ok(ParsedTrajectory { coords })
}

/// Render a trajectory in the bracket convention accepted by [`parse_trajectory`].
#[must_use]
pub fn format_trajectory(trajectory: &ParsedTrajectory) -> String {
    trajectory.to_string()
}

/// Byte scanner over trajectory text. Delimiters are ASCII, so byte offsets
/// always fall on `char` boundaries when slicing out a field.
struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    /// Next non-whitespace byte, without consuming it.
    fn peek(&mut self) -> Option<u8> {
        let bytes = self.text.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        bytes.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn error(&self, reason: impl Into<String>) -> PcaError {
        PcaError::parse(self.pos, reason)
    }

    fn expect(&mut self, byte: u8, reason: &str) -> Result<()> {
        if self.peek() == Some(byte) {
            self.bump();
            Ok(())
        } else {
            Err(self.error(reason))
        }
    }

    fn pair(&mut self) -> Result<[f64; 2]> {
        self.expect(b'[', "expected '[' to open a coordinate pair")?;
        let x = self.field()?;

        match self.peek() {
            Some(b',') => self.bump(),
            Some(b']') => return Err(self.error("pair has one field, expected two")),
            None => return Err(self.error("unbalanced brackets: pair is not closed")),
            Some(_) => return Err(self.error("expected ',' between pair fields")),
        }

        let y = self.field()?;

        match self.peek() {
            Some(b']') => self.bump(),
            Some(b',') => return Err(self.error("pair has more than two fields")),
            None => return Err(self.error("unbalanced brackets: pair is not closed")),
            Some(_) => return Err(self.error("expected ']' to close a coordinate pair")),
        }

        Ok([x, y])
    }

    fn field(&mut self) -> Result<f64> {
        let start = match self.peek() {
            Some(b',' | b']') => return Err(self.error("empty field")),
            Some(b'[') => return Err(self.error("unexpected '[' inside a pair")),
            None => return Err(self.error("unbalanced brackets: pair is not closed")),
            Some(_) => self.pos,
        };

        let bytes = self.text.as_bytes();
        while self.pos < bytes.len()
            && !matches!(bytes[self.pos], b',' | b'[' | b']')
            && !bytes[self.pos].is_ascii_whitespace()
        {
            self.pos += 1;
        }

        let token = &self.text[start..self.pos];
        let value: f64 = token
            .parse()
            .map_err(|_| PcaError::parse(start, format!("non-numeric field '{token}'")))?;
        if !value.is_finite() {
            return Err(PcaError::parse(start, format!("non-finite field '{token}'")));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_position(text: &str) -> usize {
        match parse_trajectory(text) {
            Err(PcaError::Parse { position, .. }) => position,
            other => panic!("expected parse error for {text:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_simple() {
        let t = parse_trajectory("[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]").unwrap();
        assert_eq!(t.dim(), 6);
        assert_eq!(t.n_points(), 3);
        assert_eq!(t.as_slice(), &[0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_parse_tolerates_whitespace_and_integers() {
        let t = parse_trajectory("  [ [1,2] ,[ -3.5 , 4e2 ] ]\n").unwrap();
        assert_eq!(t.as_slice(), &[1.0, 2.0, -3.5, 400.0]);
    }

    #[test]
    fn test_parse_gps_precision() {
        let t = parse_trajectory("[[-8.618643, 41.141412], [-8.618499, 41.141376]]").unwrap();
        let points: Vec<[f64; 2]> = t.points().collect();
        assert_eq!(points[0], [-8.618643, 41.141412]);
        assert_eq!(points[1], [-8.618499, 41.141376]);
    }

    #[test]
    fn test_pair_with_one_field() {
        assert_eq!(parse_position("[[1,2],[3]]"), 9);
    }

    #[test]
    fn test_pair_with_three_fields() {
        let err = parse_trajectory("[[1, 2, 3]]").unwrap_err();
        assert!(err.to_string().contains("more than two fields"));
    }

    #[test]
    fn test_non_numeric_field() {
        let err = parse_trajectory("[[1, abc]]").unwrap_err();
        assert!(err.to_string().contains("'abc'"));
        assert_eq!(parse_position("[[1, abc]]"), 5);
    }

    #[test]
    fn test_non_finite_field() {
        assert!(parse_trajectory("[[1, NaN]]").is_err());
        assert!(parse_trajectory("[[inf, 1]]").is_err());
    }

    #[test]
    fn test_unbalanced_brackets() {
        assert!(parse_trajectory("[[1, 2], [3, 4]").is_err());
        assert!(parse_trajectory("[[1, 2], [3, 4").is_err());
        assert!(parse_trajectory("[1, 2]").is_err());
        assert!(parse_trajectory("1, 2").is_err());
        assert!(parse_trajectory("").is_err());
    }

    #[test]
    fn test_trailing_garbage() {
        assert_eq!(parse_position("[[1, 2]] x"), 9);
        assert!(parse_trajectory("[[1, 2]]]").is_err());
    }

    #[test]
    fn test_empty_list_and_fields() {
        assert!(parse_trajectory("[]").is_err());
        assert!(parse_trajectory("[[, 2]]").is_err());
        assert!(parse_trajectory("[[1, ]]").is_err());
        assert!(parse_trajectory("[[1, 2],]").is_err());
    }

    #[test]
    fn test_format_round_trip() {
        let text = "[[0.1, -0.2], [123456.789, 0.5], [3.0, 4.0]]";
        let t = parse_trajectory(text).unwrap();
        let formatted = format_trajectory(&t);
        assert_eq!(formatted, text);
        assert_eq!(parse_trajectory(&formatted).unwrap(), t);

        let tiny = parse_trajectory("[[1e-9, -41.141412345678]]").unwrap();
        let reparsed = parse_trajectory(&format_trajectory(&tiny)).unwrap();
        assert_eq!(reparsed.as_slice(), tiny.as_slice());
    }

    #[test]
    fn test_from_coords_validation() {
        assert!(ParsedTrajectory::from_coords(vec![]).is_err());
        assert!(ParsedTrajectory::from_coords(vec![1.0, 2.0, 3.0]).is_err());
        assert!(ParsedTrajectory::from_coords(vec![1.0, f64::NAN]).is_err());
        let t = ParsedTrajectory::from_points(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert_eq!(t.into_coords(), vec![1.0, 2.0, 3.0, 4.0]);
    }
}
