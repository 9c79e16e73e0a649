//! GridDataset: a 2D sample grid together with its x and y axis coordinates.
//!
//! The grid is indexed `[row, column]` = `[y, x]`, so its shape is `(ny, nx)`.
//! Every transform returns a fresh dataset; grid and ranges are replaced
//! together so no caller ever sees a grid whose shape disagrees with its
//! ranges.

use ndarray::{s, Array1, Array2};

use super::DataError;

#[derive(Debug, Clone, PartialEq)]
pub struct GridDataset {
    grid: Array2<f64>,
    xrange: Array1<f64>,
    yrange: Array1<f64>,
}

impl GridDataset {
    /// Build a dataset from a grid of shape `(ny, nx)` and its two ranges.
    pub fn new(
        grid: Array2<f64>,
        xrange: Array1<f64>,
        yrange: Array1<f64>,
    ) -> Result<Self, DataError> {
        check_shape(&grid, &xrange, &yrange)?;
        Ok(Self {
            grid,
            xrange,
            yrange,
        })
    }

    /// Build a dataset from a grid, defaulting to index ranges `0..nx`, `0..ny`
    /// when no ranges are given.
    pub fn from_array(
        grid: Array2<f64>,
        ranges: Option<(Array1<f64>, Array1<f64>)>,
    ) -> Result<Self, DataError> {
        let (xrange, yrange) = match ranges {
            Some(r) => r,
            None => {
                let (ny, nx) = grid.dim();
                (index_range(nx), index_range(ny))
            }
        };
        Self::new(grid, xrange, yrange)
    }

    /// Build a dataset from row vectors (row = y), with index ranges.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, DataError> {
        let ny = rows.len();
        let nx = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != nx) {
            return Err(DataError::ShapeMismatch {
                nx,
                ny,
                xlen: nx,
                ylen: ny,
            });
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let grid = Array2::from_shape_vec((ny, nx), flat).map_err(|_| DataError::EmptyGrid)?;
        Self::from_array(grid, None)
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn grid(&self) -> &Array2<f64> {
        &self.grid
    }

    pub fn xrange(&self) -> &Array1<f64> {
        &self.xrange
    }

    pub fn yrange(&self) -> &Array1<f64> {
        &self.yrange
    }

    pub fn nx(&self) -> usize {
        self.xrange.len()
    }

    pub fn ny(&self) -> usize {
        self.yrange.len()
    }

    /// `(ny, nx)`, matching the grid's own dimensions.
    pub fn shape(&self) -> (usize, usize) {
        self.grid.dim()
    }

    /// Replace the grid, keeping the current ranges.
    pub fn set_grid(&mut self, grid: Array2<f64>) -> Result<(), DataError> {
        check_shape(&grid, &self.xrange, &self.yrange)?;
        self.grid = grid;
        Ok(())
    }

    /// Replace both ranges, keeping the current grid.
    pub fn set_ranges(&mut self, xrange: Array1<f64>, yrange: Array1<f64>) -> Result<(), DataError> {
        check_shape(&self.grid, &xrange, &yrange)?;
        self.xrange = xrange;
        self.yrange = yrange;
        Ok(())
    }

    /// A dataset with the same ranges and a new grid of the same shape.
    pub fn with_grid(&self, grid: Array2<f64>) -> Result<Self, DataError> {
        Self::new(grid, self.xrange.clone(), self.yrange.clone())
    }

    /// Apply `f` to every sample, keeping the ranges.
    pub fn map_values<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        Self {
            grid: self.grid.mapv(f),
            xrange: self.xrange.clone(),
            yrange: self.yrange.clone(),
        }
    }

    /// Independent copy: grid and both ranges get their own storage.
    pub fn deep_copy(&self) -> Self {
        Self {
            grid: self.grid.to_owned(),
            xrange: self.xrange.to_owned(),
            yrange: self.yrange.to_owned(),
        }
    }

    // ── Derived scalars ────────────────────────────────────────────────

    pub fn xmin(&self) -> f64 {
        self.xrange.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn xmax(&self) -> f64 {
        self.xrange.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn ymin(&self) -> f64 {
        self.yrange.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn ymax(&self) -> f64 {
        self.yrange.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn zmin(&self) -> f64 {
        self.grid.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn zmax(&self) -> f64 {
        self.grid.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// First x coordinate. Differs from `xmin` when the range descends.
    pub fn xleft(&self) -> f64 {
        self.xrange[0]
    }

    pub fn xright(&self) -> f64 {
        self.xrange[self.nx() - 1]
    }

    pub fn ybottom(&self) -> f64 {
        self.yrange[0]
    }

    pub fn ytop(&self) -> f64 {
        self.yrange[self.ny() - 1]
    }

    /// Average signed step along x; zero for a single column.
    pub fn dx(&self) -> f64 {
        average_step(&self.xrange)
    }

    /// Average signed step along y; zero for a single row.
    pub fn dy(&self) -> f64 {
        average_step(&self.yrange)
    }

    // ── Coordinate lookup ──────────────────────────────────────────────

    /// Index of the column whose x coordinate is closest to `value`.
    /// Ties resolve to the lower index.
    pub fn get_x_index(&self, value: f64) -> usize {
        nearest_index(&self.xrange, value)
    }

    /// Index of the row whose y coordinate is closest to `value`.
    pub fn get_y_index(&self, value: f64) -> usize {
        nearest_index(&self.yrange, value)
    }

    /// Sample nearest to the coordinate `(x, y)`.
    pub fn value_at(&self, x: f64, y: f64) -> f64 {
        self.grid[[self.get_y_index(y), self.get_x_index(x)]]
    }

    // ── Region extraction and geometric transforms ─────────────────────

    /// Sub-dataset covering columns `x0..=x1` and rows `y0..=y1`.
    ///
    /// An inverted window (`x0 > x1` or `y0 > y1`) collapses to the single
    /// column or row at the first bound.
    pub fn region(&self, x0: usize, x1: usize, y0: usize, y1: usize) -> Result<Self, DataError> {
        let (ny, nx) = self.shape();
        if x0 >= nx || x1 >= nx || y0 >= ny || y1 >= ny {
            return Err(DataError::IndexOutOfBounds {
                x0,
                x1,
                y0,
                y1,
                nx,
                ny,
            });
        }
        Ok(self.region_unchecked(x0, x1, y0, y1))
    }

    /// Crop to the coordinate window, each bound resolved to its nearest index.
    pub fn crop(&self, xleft: f64, xright: f64, ybottom: f64, ytop: f64) -> Self {
        let x0 = self.get_x_index(xleft);
        let x1 = self.get_x_index(xright);
        let y0 = self.get_y_index(ybottom);
        let y1 = self.get_y_index(ytop);
        if x0 > x1 || y0 > y1 {
            log::debug!(
                "Crop bounds resolve to inverted indices (x {}..{}, y {}..{})",
                x0,
                x1,
                y0,
                y1
            );
        }
        // nearest-index lookups always land inside the grid
        self.region_unchecked(x0, x1, y0, y1)
    }

    /// Inclusive window; indices must be in bounds. Inverted bounds collapse
    /// to the first one.
    fn region_unchecked(&self, x0: usize, x1: usize, y0: usize, y1: usize) -> Self {
        let x1 = x1.max(x0);
        let y1 = y1.max(y0);
        Self {
            grid: self.grid.slice(s![y0..=y1, x0..=x1]).to_owned(),
            xrange: self.xrange.slice(s![x0..=x1]).to_owned(),
            yrange: self.yrange.slice(s![y0..=y1]).to_owned(),
        }
    }

    /// Rotate by 90° clockwise. The old y axis becomes the x axis and the
    /// old x axis, reversed, becomes the y axis.
    pub fn rotate_cw(&self) -> Self {
        Self {
            grid: self.grid.t().slice(s![..;-1, ..]).to_owned(),
            xrange: self.yrange.to_owned(),
            yrange: self.xrange.slice(s![..;-1]).to_owned(),
        }
    }

    /// Rotate by 90° counter-clockwise; exact inverse of [`Self::rotate_cw`].
    pub fn rotate_ccw(&self) -> Self {
        Self {
            grid: self.grid.t().slice(s![.., ..;-1]).to_owned(),
            xrange: self.yrange.slice(s![..;-1]).to_owned(),
            yrange: self.xrange.to_owned(),
        }
    }

    /// Mirror left/right: columns and xrange reversed.
    pub fn flip_lr(&self) -> Self {
        Self {
            grid: self.grid.slice(s![.., ..;-1]).to_owned(),
            xrange: self.xrange.slice(s![..;-1]).to_owned(),
            yrange: self.yrange.to_owned(),
        }
    }

    /// Mirror up/down: rows and yrange reversed.
    pub fn flip_ud(&self) -> Self {
        Self {
            grid: self.grid.slice(s![..;-1, ..]).to_owned(),
            xrange: self.xrange.to_owned(),
            yrange: self.yrange.slice(s![..;-1]).to_owned(),
        }
    }
}

fn check_shape(grid: &Array2<f64>, xrange: &Array1<f64>, yrange: &Array1<f64>) -> Result<(), DataError> {
    let (ny, nx) = grid.dim();
    if xrange.len() != nx || yrange.len() != ny {
        return Err(DataError::ShapeMismatch {
            nx,
            ny,
            xlen: xrange.len(),
            ylen: yrange.len(),
        });
    }
    if nx == 0 || ny == 0 {
        return Err(DataError::EmptyGrid);
    }
    Ok(())
}

fn index_range(n: usize) -> Array1<f64> {
    Array1::from_iter((0..n).map(|i| i as f64))
}

fn average_step(range: &Array1<f64>) -> f64 {
    let n = range.len();
    if n < 2 {
        return 0.0;
    }
    (range[n - 1] - range[0]) / (n - 1) as f64
}

fn nearest_index(range: &Array1<f64>, value: f64) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, &v) in range.iter().enumerate() {
        let dist = (v - value).abs();
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample() -> GridDataset {
        // 3 rows (y) x 4 columns (x)
        GridDataset::new(
            array![
                [1.0, 2.0, 3.0, 4.0],
                [5.0, 6.0, 7.0, 8.0],
                [9.0, 10.0, 11.0, 12.0]
            ],
            array![0.0, 0.5, 1.0, 1.5],
            array![-1.0, 0.0, 1.0],
        )
        .unwrap()
    }

    #[test]
    fn test_from_array_defaults_to_index_ranges() {
        let d = GridDataset::from_array(Array2::zeros((2, 3)), None).unwrap();
        assert_eq!(d.xrange(), &array![0.0, 1.0, 2.0]);
        assert_eq!(d.yrange(), &array![0.0, 1.0]);
        assert_eq!(d.shape(), (2, 3));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = GridDataset::from_array(Array2::zeros((2, 3)), Some((array![0.0, 1.0], array![0.0, 1.0])));
        assert!(matches!(err, Err(DataError::ShapeMismatch { nx: 3, ny: 2, .. })));

        let mut d = sample();
        assert!(d.set_ranges(array![0.0], array![0.0, 1.0, 2.0]).is_err());
        assert!(d.set_grid(Array2::zeros((4, 3))).is_err());
        // failed assignment leaves the dataset untouched
        assert_eq!(d, sample());
    }

    #[test]
    fn test_empty_grid_rejected() {
        let err = GridDataset::from_array(Array2::zeros((0, 0)), None);
        assert!(matches!(err, Err(DataError::EmptyGrid)));
    }

    #[test]
    fn test_derived_scalars() {
        let d = sample().flip_lr();
        assert!((d.xleft() - 1.5).abs() < 1e-12);
        assert!((d.xright() - 0.0).abs() < 1e-12);
        assert!((d.xmin() - 0.0).abs() < 1e-12);
        assert!((d.xmax() - 1.5).abs() < 1e-12);
        assert!((d.dx() + 0.5).abs() < 1e-12);
        assert!((d.dy() - 1.0).abs() < 1e-12);
        assert!((d.zmin() - 1.0).abs() < 1e-12);
        assert!((d.zmax() - 12.0).abs() < 1e-12);
        assert!((d.ybottom() + 1.0).abs() < 1e-12);
        assert!((d.ytop() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_nearest_index_lookup() {
        let d = sample();
        assert_eq!(d.get_x_index(0.6), 1);
        assert_eq!(d.get_x_index(-10.0), 0);
        assert_eq!(d.get_x_index(99.0), 3);
        // exactly halfway between 0.5 and 1.0 resolves to the lower index
        assert_eq!(d.get_x_index(0.75), 1);
        assert_eq!(d.get_y_index(0.4), 1);
        assert!((d.value_at(1.1, 0.9) - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_region_inclusive() {
        let d = sample();
        let r = d.region(1, 2, 0, 1).unwrap();
        assert_eq!(r.grid(), &array![[2.0, 3.0], [6.0, 7.0]]);
        assert_eq!(r.xrange(), &array![0.5, 1.0]);
        assert_eq!(r.yrange(), &array![-1.0, 0.0]);
        assert!(d.region(0, 4, 0, 1).is_err());
    }

    #[test]
    fn test_crop_matches_region_of_resolved_indices() {
        let d = sample();
        let c = d.crop(0.4, 1.6, 0.2, -0.8);
        let r = d
            .region(d.get_x_index(0.4), d.get_x_index(1.6), d.get_y_index(0.2), d.get_y_index(-0.8))
            .unwrap();
        assert_eq!(c, r);
        // inverted y window collapses to the row at the first bound
        assert_eq!(c.yrange(), &array![0.0]);
        assert_eq!(c.grid(), &array![[6.0, 7.0, 8.0]]);
    }

    #[test]
    fn test_crop_full_range_is_identity() {
        let d = sample();
        let c = d.crop(d.xleft(), d.xright(), d.ybottom(), d.ytop());
        assert_eq!(c, d);

        let flipped = d.flip_lr().flip_ud();
        let c = flipped.crop(flipped.xleft(), flipped.xright(), flipped.ybottom(), flipped.ytop());
        assert_eq!(c, flipped);
    }

    #[test]
    fn test_crop_by_coordinates() {
        let d = sample();
        let c = d.crop(0.4, 1.1, 0.1, 5.0);
        assert_eq!(c.shape(), (2, 2));
        assert_eq!(c.grid(), &array![[6.0, 7.0], [10.0, 11.0]]);
        assert_eq!(c.xrange().len(), c.grid().ncols());
        assert_eq!(c.yrange().len(), c.grid().nrows());
    }

    #[test]
    fn test_crop_inverted_collapses_to_single_column() {
        let d = sample();
        let c = d.crop(1.5, 0.0, -1.0, 1.0);
        assert_eq!(c.shape(), (3, 1));
        assert_eq!(c.xrange(), &array![1.5]);
        assert_eq!(c.grid().column(0).to_vec(), vec![4.0, 8.0, 12.0]);
    }

    #[test]
    fn test_rotate_cw_layout() {
        let d = sample();
        let r = d.rotate_cw();
        assert_eq!(r.shape(), (4, 3));
        assert_eq!(r.xrange(), d.yrange());
        assert_eq!(r.yrange(), &array![1.5, 1.0, 0.5, 0.0]);
        assert_eq!(r.grid().row(0).to_vec(), vec![4.0, 8.0, 12.0]);
        // each sample keeps its coordinates, with the axes swapped
        assert!((r.value_at(0.0, 0.5) - d.value_at(0.5, 0.0)).abs() < 1e-12);
    }

    #[test]
    fn test_rotate_round_trip() {
        let d = sample();
        assert_eq!(d.rotate_cw().rotate_ccw(), d);
        assert_eq!(d.rotate_ccw().rotate_cw(), d);
        let four = d.rotate_cw().rotate_cw().rotate_cw().rotate_cw();
        assert_eq!(four, d);
    }

    #[test]
    fn test_flip_involution() {
        let d = sample();
        assert_eq!(d.flip_lr().flip_lr(), d);
        assert_eq!(d.flip_ud().flip_ud(), d);
        let lr = d.flip_lr();
        assert_eq!(lr.grid().row(0).to_vec(), vec![4.0, 3.0, 2.0, 1.0]);
        assert_eq!(lr.xrange(), &array![1.5, 1.0, 0.5, 0.0]);
        let ud = d.flip_ud();
        assert_eq!(ud.grid().row(0).to_vec(), vec![9.0, 10.0, 11.0, 12.0]);
        assert_eq!(ud.yrange(), &array![1.0, 0.0, -1.0]);
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let d = sample();
        let mut copy = d.deep_copy();
        copy.set_grid(Array2::zeros((3, 4))).unwrap();
        assert_eq!(d, sample());
        assert!(copy.grid().as_ptr() != d.grid().as_ptr());
        assert!(copy.xrange().as_ptr() != d.xrange().as_ptr());
    }

    #[test]
    fn test_from_rows() {
        let d = GridDataset::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(d.grid(), &array![[1.0, 2.0], [3.0, 4.0]]);
        assert!(GridDataset::from_rows(&[vec![1.0, 2.0], vec![3.0]]).is_err());
    }
}
