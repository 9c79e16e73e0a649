//! Neighbourhood filters over a 2D grid.
//!
//! Borders use reflect padding (`d c b a | a b c d | d c b a`), so every
//! output sample sees a full window.

use std::cmp::Ordering;

use ndarray::{Array2, Axis};

/// Gaussian kernels are cut off at this many standard deviations.
const GAUSSIAN_TRUNCATE: f64 = 4.0;

/// Map an out-of-range index back into `0..n` by mirroring at the edges.
fn reflect_index(i: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    let m = i.rem_euclid(period);
    if m < n {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

/// Correlate every lane along `axis` with `weights`, centred on `center`.
fn correlate_axis(input: &Array2<f64>, axis: Axis, weights: &[f64], center: usize) -> Array2<f64> {
    let n = input.len_of(axis);
    let mut out = Array2::zeros(input.raw_dim());
    for (lane_in, mut lane_out) in input.lanes(axis).into_iter().zip(out.lanes_mut(axis)) {
        for i in 0..n {
            let mut acc = 0.0;
            for (k, w) in weights.iter().enumerate() {
                let src = reflect_index(i as isize + k as isize - center as isize, n);
                acc += w * lane_in[src];
            }
            lane_out[i] = acc;
        }
    }
    out
}

/// Normalized kernel of radius `4 * sigma`, capped at `max_radius`.
fn gaussian_kernel(sigma: f64, max_radius: usize) -> Vec<f64> {
    let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5).min(max_radius as f64) as usize;
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|k| {
            let x = k as f64 - radius as f64;
            (-0.5 * (x / sigma).powi(2)).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for w in kernel.iter_mut() {
        *w /= sum;
    }
    kernel
}

/// Gaussian blur with independent standard deviations along rows (`ysigma`)
/// and columns (`xsigma`), in samples. A zero sigma leaves that axis alone.
///
/// The kernel radius never exceeds the lane length, so a sigma much wider
/// than the grid costs no more than one as wide as the grid.
pub fn gaussian_filter(input: &Array2<f64>, ysigma: f64, xsigma: f64) -> Array2<f64> {
    let mut out = input.to_owned();
    for (axis, sigma) in [(Axis(0), ysigma), (Axis(1), xsigma)] {
        if sigma > 0.0 {
            let kernel = gaussian_kernel(sigma, input.len_of(axis));
            let center = kernel.len() / 2;
            out = correlate_axis(&out, axis, &kernel, center);
        }
    }
    out
}

/// Median over a `ysize` x `xsize` rectangular footprint.
///
/// For even sizes the window extends one sample further before the centre
/// than after it; the upper median is taken.
pub fn median_filter(input: &Array2<f64>, ysize: usize, xsize: usize) -> Array2<f64> {
    let (ny, nx) = input.dim();
    let ystart = (ysize / 2) as isize;
    let xstart = (xsize / 2) as isize;
    let mut window = Vec::with_capacity(ysize * xsize);

    Array2::from_shape_fn((ny, nx), |(j, i)| {
        window.clear();
        for dj in 0..ysize as isize {
            let jj = reflect_index(j as isize + dj - ystart, ny);
            for di in 0..xsize as isize {
                let ii = reflect_index(i as isize + di - xstart, nx);
                window.push(input[[jj, ii]]);
            }
        }
        let mid = window.len() / 2;
        let (_, median, _) =
            window.select_nth_unstable_by(mid, |a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        *median
    })
}

/// Mean over a `block` x `block` neighbourhood of every sample.
pub fn local_mean(input: &Array2<f64>, block: usize) -> Array2<f64> {
    let ones = vec![1.0; block];
    let center = block / 2;
    let sums = correlate_axis(input, Axis(0), &ones, center);
    let sums = correlate_axis(&sums, Axis(1), &ones, center);
    let count = (block as f64).powi(2);
    sums.mapv(|s| s / count)
}

/// Binarize against `(1 + offset) * local_mean`: 1 where the sample is
/// above its threshold, 0 elsewhere. Returns `None` when every sample lands
/// on the same side, since a constant result carries no information.
pub fn adaptive_threshold(input: &Array2<f64>, block: usize, offset: f64) -> Option<Array2<f64>> {
    let mean = local_mean(input, block);
    let factor = 1.0 + offset;
    let mut out = Array2::zeros(input.raw_dim());
    let mut above = 0usize;
    ndarray::Zip::from(&mut out)
        .and(input)
        .and(&mean)
        .for_each(|o, &v, &m| {
            if v > factor * m {
                *o = 1.0;
                above += 1;
            }
        });
    if above == 0 || above == input.len() {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-2, 4), 1);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(5, 4), 2);
        assert_eq!(reflect_index(2, 4), 2);
        // windows wider than the lane keep mirroring
        assert_eq!(reflect_index(-5, 4), 3);
        assert_eq!(reflect_index(9, 4), 1);
        assert_eq!(reflect_index(3, 1), 0);
    }

    #[test]
    fn test_gaussian_kernel_normalized_and_symmetric() {
        let k = gaussian_kernel(1.0, 100);
        assert_eq!(k.len(), 9);
        assert!((k.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        for i in 0..k.len() {
            assert!((k[i] - k[k.len() - 1 - i]).abs() < 1e-15);
        }
        assert!(k[4] > k[3]);
    }

    #[test]
    fn test_gaussian_kernel_radius_capped() {
        let k = gaussian_kernel(1e15, 6);
        assert_eq!(k.len(), 13);
        assert!((k.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        // a small sigma is not affected by the cap
        assert_eq!(gaussian_kernel(0.5, 6).len(), 5);
    }

    #[test]
    fn test_gaussian_wide_sigma_stays_finite() {
        let input = Array2::from_shape_fn((4, 4), |(j, i)| (i + 4 * j) as f64);
        let out = gaussian_filter(&input, 1e15, 1e300);
        assert!(out.iter().all(|v| v.is_finite()));
        // nearly flat weights average the whole grid
        let mean = input.mean().unwrap();
        assert!(out.iter().all(|v| (v - mean).abs() < 1.0));
    }

    #[test]
    fn test_gaussian_spreads_impulse_along_one_axis() {
        let mut input = Array2::zeros((5, 7));
        input[[2, 3]] = 1.0;
        let out = gaussian_filter(&input, 0.0, 1.0);
        // untouched along y
        assert!(out.row(0).iter().all(|&v| v == 0.0));
        let total: f64 = out.row(2).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(out[[2, 2]] > 0.0 && out[[2, 2]] < out[[2, 3]]);
    }

    #[test]
    fn test_median_even_window() {
        let input = array![[1.0, 2.0, 3.0, 4.0]];
        let out = median_filter(&input, 1, 2);
        // windows: [1,1], [1,2], [2,3], [3,4] -> upper median
        assert_eq!(out, array![[1.0, 2.0, 3.0, 4.0]]);
    }

    #[test]
    fn test_local_mean_interior() {
        let input = Array2::from_shape_fn((3, 3), |(j, i)| (j * 3 + i) as f64);
        let mean = local_mean(&input, 3);
        assert!((mean[[1, 1]] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_adaptive_threshold_none_when_constant() {
        let input = Array2::from_elem((3, 3), 5.0);
        assert!(adaptive_threshold(&input, 3, 0.0).is_none());
    }
}
