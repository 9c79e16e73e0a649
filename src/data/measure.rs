//! Measurements in axis coordinates: line cuts, distances and slopes.
//!
//! These back the interactive linecut/slope/distance tools; the tools only
//! supply the two end points.


use super::GridDataset;

/// A point in data (axis) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Samples taken along a path through the grid.
#[derive(Debug, Clone, Default)]
pub struct Linecut {
    /// Distance of each sample from the start of the cut
    pub position: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub values: Vec<f64>,
}

impl Linecut {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Slope `dy/dx` of the segment from `a` to `b`; `None` for a vertical segment.
pub fn slope(a: Point, b: Point) -> Option<f64> {
    let dx = b.x - a.x;
    if dx == 0.0 {
        return None;
    }
    Some((b.y - a.y) / dx)
}

impl GridDataset {
    /// The grid row nearest to `y`, sampled at every x.
    pub fn horizontal_cut(&self, y: f64) -> Linecut {
        let j = self.get_y_index(y);
        let row_y = self.yrange()[j];
        let x: Vec<f64> = self.xrange().to_vec();
        let x0 = x[0];
        Linecut {
            position: x.iter().map(|v| (v - x0).abs()).collect(),
            y: vec![row_y; x.len()],
            values: self.grid().row(j).to_vec(),
            x,
        }
    }

    /// The grid column nearest to `x`, sampled at every y.
    pub fn vertical_cut(&self, x: f64) -> Linecut {
        let i = self.get_x_index(x);
        let col_x = self.xrange()[i];
        let y: Vec<f64> = self.yrange().to_vec();
        let y0 = y[0];
        Linecut {
            position: y.iter().map(|v| (v - y0).abs()).collect(),
            x: vec![col_x; y.len()],
            values: self.grid().column(i).to_vec(),
            y,
        }
    }

    /// `npoints` evenly spaced nearest-neighbor samples from `start` to `end`.
    pub fn linecut(&self, start: Point, end: Point, npoints: usize) -> Linecut {
        let mut cut = Linecut::default();
        if npoints == 0 {
            return cut;
        }
        let total = distance(start, end);
        for k in 0..npoints {
            let t = if npoints == 1 {
                0.0
            } else {
                k as f64 / (npoints - 1) as f64
            };
            let x = start.x + t * (end.x - start.x);
            let y = start.y + t * (end.y - start.y);
            cut.position.push(t * total);
            cut.x.push(x);
            cut.y.push(y);
            cut.values.push(self.value_at(x, y));
        }
        cut
    }
}
