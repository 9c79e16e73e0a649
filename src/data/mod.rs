//! Gridded colorplot data: the dataset model, the gnuplot block format,
//! and measurement helpers working on axis coordinates.

pub mod gnuplot;
pub mod grid;
pub mod measure;

pub use gnuplot::BlockColumns;
pub use grid::GridDataset;

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("shape mismatch: grid is {ny}x{nx} (rows x columns) but xrange has {xlen} and yrange has {ylen} entries")]
    ShapeMismatch {
        nx: usize,
        ny: usize,
        xlen: usize,
        ylen: usize,
    },
    #[error("grid must contain at least one sample")]
    EmptyGrid,
    #[error("index window x={x0}..={x1}, y={y0}..={y1} is outside a {ny}x{nx} grid")]
    IndexOutOfBounds {
        x0: usize,
        x1: usize,
        y0: usize,
        y1: usize,
        nx: usize,
        ny: usize,
    },
    #[error("malformed input at line {line}: {reason}")]
    MalformedInput { line: usize, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DataError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        DataError::MalformedInput {
            line,
            reason: reason.into(),
        }
    }
}
