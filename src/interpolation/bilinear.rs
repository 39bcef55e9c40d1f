//! Bilinear interpolation.
//!
//! Linear interpolation in two dimensions using the four surrounding tie
//! samples. Weights are computed in f64 so a request landing exactly on a
//! tie sample returns that sample's value unchanged.

use ndarray::Array2;

use super::TieElement;

/// Evaluate the tie grid at every combination of the fractional coordinates
/// `rows` x `cols` (meshgrid broadcasting).
pub fn interp_block<T: TieElement>(tie: &Array2<T>, rows: &[f64], cols: &[f64]) -> Array2<T> {
    let (tie_h, tie_w) = (tie.nrows(), tie.ncols());
    Array2::from_shape_fn((rows.len(), cols.len()), |(r, c)| {
        let (i0, di) = cell(rows[r], tie_h);
        let (j0, dj) = cell(cols[c], tie_w);
        let i1 = (i0 + 1).min(tie_h - 1);
        let j1 = (j0 + 1).min(tie_w - 1);
        let v00 = tie[[i0, j0]].to_f64();
        let v01 = tie[[i0, j1]].to_f64();
        let v10 = tie[[i1, j0]].to_f64();
        let v11 = tie[[i1, j1]].to_f64();
        let top = v00 * (1.0 - dj) + v01 * dj;
        let bottom = v10 * (1.0 - dj) + v11 * dj;
        T::from_f64(top * (1.0 - di) + bottom * di)
    })
}

/// Cell origin and fractional offset for a coordinate, keeping the origin
/// one sample away from the grid edge so the closed upper bound lands on the
/// last sample with weight one.
fn cell(coord: f64, extent: usize) -> (usize, f64) {
    if extent < 2 {
        return (0, 0.0);
    }
    let i0 = (coord.floor() as usize).min(extent - 2);
    (i0, coord - i0 as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_cell_interior() {
        assert_eq!(cell(1.5, 4), (1, 0.5));
        assert_eq!(cell(0.0, 4), (0, 0.0));
    }

    #[test]
    fn test_cell_upper_edge() {
        // the last sample resolves to the previous cell with full weight
        let (i0, di) = cell(3.0, 4);
        assert_eq!(i0, 2);
        assert_eq!(di, 1.0);
    }

    #[test]
    fn test_interp_block_values() {
        let tie = array![[0.0f64, 1.0], [2.0, 3.0]];
        let out = interp_block(&tie, &[0.0, 0.5, 1.0], &[0.5]);
        assert_eq!(out[[0, 0]], 0.5);
        assert_eq!(out[[1, 0]], 1.5);
        assert_eq!(out[[2, 0]], 2.5);
    }

    #[test]
    fn test_degenerate_single_sample() {
        let tie = array![[7.0f32]];
        let out = interp_block(&tie, &[0.0], &[0.0]);
        assert_eq!(out[[0, 0]], 7.0);
    }
}
