//! Gnuplot-style block data files.
//!
//! Rows are whitespace-delimited numbers. Rows are grouped into contiguous
//! blocks that share one x coordinate, with y varying row by row:
//!
//! ```text
//! # optional comment header
//! 0.0  0.0  1.0
//! 0.0  1.0  2.0
//!
//! 1.0  0.0  3.0
//! 1.0  1.0  4.0
//! ```
//!
//! Each block becomes one grid column; each in-block row becomes one grid row.
//! Blank lines and lines starting with `#` are skipped. Block length is taken
//! from the first change of the x column, not from the blank lines.
//! x and y values must be finite.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::{DataError, GridDataset};

/// Relative tolerance when comparing a block's y values with the first block.
pub const Y_TOLERANCE: f64 = 1e-9;

/// Zero-based column indices of the x, y and z values in a block file.
/// Serialized as a `[x, y, z]` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[usize; 3]", into = "[usize; 3]")]
pub struct BlockColumns {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Default for BlockColumns {
    fn default() -> Self {
        Self { x: 0, y: 1, z: 2 }
    }
}

impl BlockColumns {
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    fn required_fields(&self) -> usize {
        self.x.max(self.y).max(self.z) + 1
    }
}

impl From<[usize; 3]> for BlockColumns {
    fn from([x, y, z]: [usize; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<BlockColumns> for [usize; 3] {
    fn from(c: BlockColumns) -> Self {
        [c.x, c.y, c.z]
    }
}

impl std::fmt::Display for BlockColumns {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

impl std::str::FromStr for BlockColumns {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(format!("expected three comma-separated column indices, got '{}'", s));
        }
        let mut idx = [0usize; 3];
        for (slot, part) in idx.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| format!("invalid column index '{}'", part))?;
        }
        Ok(Self::new(idx[0], idx[1], idx[2]))
    }
}

/// One data row picked out of the file: (x, y, z) and its 1-based line number.
#[derive(Debug, Clone, Copy)]
struct Sample {
    line: usize,
    x: f64,
    y: f64,
    z: f64,
}

impl GridDataset {
    /// Load a block-structured file, picking x, y and z from `columns`.
    pub fn load_block_file(path: &Path, columns: BlockColumns) -> Result<Self, DataError> {
        let content = fs::read_to_string(path)?;
        let dataset = parse_blocks(&content, columns)?;
        log::info!(
            "Loaded {} ({} blocks x {} rows, columns {})",
            path.display(),
            dataset.nx(),
            dataset.ny(),
            columns
        );
        Ok(dataset)
    }

    /// Write the dataset as blocks of `x y z` rows, one block per column,
    /// preceded by `comment` verbatim.
    pub fn save_block_file(&self, path: &Path, comment: &str) -> Result<(), DataError> {
        fs::write(path, self.to_block_text(comment))?;
        log::info!(
            "Saved {}x{} grid to {}",
            self.ny(),
            self.nx(),
            path.display()
        );
        Ok(())
    }

    /// Block-file text for this dataset; see [`Self::save_block_file`].
    pub fn to_block_text(&self, comment: &str) -> String {
        let mut out = String::new();
        if !comment.is_empty() {
            out.push_str(comment);
            if !comment.ends_with('\n') {
                out.push('\n');
            }
        }
        let grid = self.grid();
        for (i, x) in self.xrange().iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            for (j, y) in self.yrange().iter().enumerate() {
                let _ = writeln!(out, "{}\t{}\t{}", x, y, grid[[j, i]]);
            }
        }
        out
    }
}

/// Parse block-file text into a dataset.
pub fn parse_blocks(content: &str, columns: BlockColumns) -> Result<GridDataset, DataError> {
    let samples = read_samples(content, columns)?;
    let total = samples.len();
    if total == 0 {
        return Err(DataError::malformed(0, "no data rows found"));
    }

    // Block length: first row whose x differs from the first row's x.
    let first_x = samples[0].x;
    let block_size = samples[1..]
        .iter()
        .position(|s| s.x != first_x)
        .map_or(total, |p| p + 1);
    let nblocks = total / block_size;
    let used = nblocks * block_size;
    if used < total {
        log::warn!(
            "Discarding {} trailing row(s) of an incomplete block (block size {})",
            total - used,
            block_size
        );
    }

    let first_block = &samples[..block_size];
    let yrange = Array1::from_iter(first_block.iter().map(|s| s.y));
    let mut xrange = Array1::zeros(nblocks);
    let mut grid = Array2::zeros((block_size, nblocks));

    for (b, block) in samples[..used].chunks_exact(block_size).enumerate() {
        for (j, (sample, reference)) in block.iter().zip(first_block).enumerate() {
            if !same_coordinate(sample.y, reference.y) {
                return Err(DataError::malformed(
                    sample.line,
                    format!(
                        "block {} has y = {} where the first block has y = {}",
                        b + 1,
                        sample.y,
                        reference.y
                    ),
                ));
            }
            grid[[j, b]] = sample.z;
        }
        xrange[b] = block[block_size - 1].x;
    }

    GridDataset::new(grid, xrange, yrange)
}

fn read_samples(content: &str, columns: BlockColumns) -> Result<Vec<Sample>, DataError> {
    let needed = columns.required_fields();
    let mut samples = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() < needed {
            return Err(DataError::malformed(
                line_no,
                format!("expected at least {} columns, found {}", needed, fields.len()),
            ));
        }
        let field = |i: usize| -> Result<f64, DataError> {
            fields[i].parse::<f64>().map_err(|_| {
                DataError::malformed(line_no, format!("'{}' is not a number", fields[i]))
            })
        };
        let sample = Sample {
            line: line_no,
            x: field(columns.x)?,
            y: field(columns.y)?,
            z: field(columns.z)?,
        };
        if !sample.x.is_finite() || !sample.y.is_finite() {
            return Err(DataError::malformed(
                line_no,
                format!("coordinates must be finite, got x = {}, y = {}", sample.x, sample.y),
            ));
        }
        samples.push(sample);
    }

    Ok(samples)
}

fn same_coordinate(a: f64, b: f64) -> bool {
    let scale = 1.0f64.max(a.abs()).max(b.abs());
    (a - b).abs() <= Y_TOLERANCE * scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_single_row_file() {
        let d = parse_blocks("0.0 0.0 5.0\n", BlockColumns::default()).unwrap();
        assert_eq!(d.shape(), (1, 1));
        assert!((d.grid()[[0, 0]] - 5.0).abs() < 1e-12);
        assert_eq!(d.xrange(), &array![0.0]);
        assert_eq!(d.yrange(), &array![0.0]);
    }

    #[test]
    fn test_two_block_file() {
        let text = "0 0 1\n0 1 2\n\n1 0 3\n1 1 4\n";
        let d = parse_blocks(text, BlockColumns::default()).unwrap();
        assert_eq!(d.grid(), &array![[1.0, 3.0], [2.0, 4.0]]);
        assert_eq!(d.xrange(), &array![0.0, 1.0]);
        assert_eq!(d.yrange(), &array![0.0, 1.0]);
    }

    #[test]
    fn test_trailing_partial_block_dropped() {
        let text = "0 0 1\n0 1 2\n\n1 0 3\n1 1 4\n\n2 0 5\n";
        let d = parse_blocks(text, BlockColumns::default()).unwrap();
        assert_eq!(d.shape(), (2, 2));
        assert_eq!(d.xrange(), &array![0.0, 1.0]);
    }

    #[test]
    fn test_custom_columns_and_comments() {
        let text = "# header line\n# z y x extra\n9 0 10 a\n8 1 10 b\n\n7 0 20 c\n6 1 20 d\n";
        let cols = BlockColumns::new(2, 1, 0);
        let d = parse_blocks(text, cols).unwrap();
        assert_eq!(d.grid(), &array![[9.0, 7.0], [8.0, 6.0]]);
        assert_eq!(d.xrange(), &array![10.0, 20.0]);
    }

    #[test]
    fn test_x_taken_from_last_row_of_block() {
        // x drifts slightly inside the block; the last value wins
        let text = "0 0 1\n0 1 2\n1 0 3\n1.001 1 4\n";
        let d = parse_blocks(text, BlockColumns::default()).unwrap();
        assert!((d.xrange()[1] - 1.001).abs() < 1e-12);
    }

    #[test]
    fn test_inconsistent_y_rejected() {
        let text = "0 0 1\n0 1 2\n\n1 0 3\n1 2 4\n";
        let err = parse_blocks(text, BlockColumns::default()).unwrap_err();
        assert!(matches!(err, DataError::MalformedInput { line: 5, .. }));
    }

    #[test]
    fn test_empty_and_unparsable_rejected() {
        assert!(matches!(
            parse_blocks("# only a comment\n\n", BlockColumns::default()),
            Err(DataError::MalformedInput { .. })
        ));
        assert!(matches!(
            parse_blocks("0 0 x\n", BlockColumns::default()),
            Err(DataError::MalformedInput { line: 1, .. })
        ));
        assert!(matches!(
            parse_blocks("0 0\n", BlockColumns::default()),
            Err(DataError::MalformedInput { line: 1, .. })
        ));
    }

    #[test]
    fn test_non_finite_coordinates_rejected() {
        for text in ["nan 0 1\nnan 1 2\n", "0 0 1\n0 inf 2\n", "0 0 1\n0 1 2\n\n-inf 0 3\n-inf 1 4\n"] {
            assert!(
                matches!(
                    parse_blocks(text, BlockColumns::default()),
                    Err(DataError::MalformedInput { .. })
                ),
                "accepted {:?}",
                text
            );
        }
        let err = parse_blocks("0 0 1\n0 NaN 2\n", BlockColumns::default()).unwrap_err();
        assert!(matches!(err, DataError::MalformedInput { line: 2, .. }));
    }

    #[test]
    fn test_non_finite_z_kept() {
        let d = parse_blocks("0 0 nan\n0 1 inf\n", BlockColumns::default()).unwrap();
        assert_eq!(d.shape(), (2, 1));
        assert!(d.grid()[[0, 0]].is_nan());
        assert!(d.grid()[[1, 0]].is_infinite());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.dat");
        let d = GridDataset::new(
            array![[0.1, -2.5, 3.0], [1e-7, 5.25, 6.0]],
            array![-1.0, 0.5, 2.0],
            array![0.3, 0.7],
        )
        .unwrap();
        d.save_block_file(&path, "# saved by test").unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# saved by test\n"));

        let back = GridDataset::load_block_file(&path, BlockColumns::default()).unwrap();
        assert_eq!(back.shape(), d.shape());
        for (a, b) in back.grid().iter().zip(d.grid().iter()) {
            assert!((a - b).abs() < 1e-12);
        }
        for (a, b) in back.xrange().iter().zip(d.xrange().iter()) {
            assert!((a - b).abs() < 1e-12);
        }
        for (a, b) in back.yrange().iter().zip(d.yrange().iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = GridDataset::load_block_file(Path::new("/nonexistent/grid.dat"), BlockColumns::default());
        assert!(matches!(err, Err(DataError::Io(_))));
    }

    #[test]
    fn test_columns_from_str() {
        assert_eq!("2, 0,1".parse::<BlockColumns>().unwrap(), BlockColumns::new(2, 0, 1));
        assert!("1,2".parse::<BlockColumns>().is_err());
        assert!("a,b,c".parse::<BlockColumns>().is_err());
    }
}
