//! Nearest-neighbor interpolation.
//!
//! Each fractional coordinate snaps to the closest tie sample, ties rounding
//! up. Used for fields where blending adjacent samples is wrong, such as
//! azimuth angles near the wrap-around.

use ndarray::Array2;

use super::TieElement;

/// Evaluate the tie grid at every combination of the fractional coordinates
/// `rows` x `cols` (meshgrid broadcasting).
pub fn interp_block<T: TieElement>(tie: &Array2<T>, rows: &[f64], cols: &[f64]) -> Array2<T> {
    let (tie_h, tie_w) = (tie.nrows(), tie.ncols());
    Array2::from_shape_fn((rows.len(), cols.len()), |(r, c)| {
        let i = snap(rows[r], tie_h);
        let j = snap(cols[c], tie_w);
        tie[[i, j]]
    })
}

fn snap(coord: f64, extent: usize) -> usize {
    ((coord + 0.5).floor() as usize).min(extent - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_snap() {
        assert_eq!(snap(0.0, 4), 0);
        assert_eq!(snap(0.49, 4), 0);
        assert_eq!(snap(0.5, 4), 1);
        assert_eq!(snap(3.2, 4), 3);
        assert_eq!(snap(10.0, 4), 3);
    }

    #[test]
    fn test_interp_block_values() {
        let tie = array![[0.0f32, 1.0], [2.0, 3.0]];
        let out = interp_block(&tie, &[0.0, 0.6], &[0.4, 1.0]);
        assert_eq!(out[[0, 0]], 0.0);
        assert_eq!(out[[0, 1]], 1.0);
        assert_eq!(out[[1, 0]], 2.0);
        assert_eq!(out[[1, 1]], 3.0);
    }
}
