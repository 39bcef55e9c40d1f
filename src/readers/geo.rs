//! Lazy geolocation planes from an affine geotransform.
//!
//! Products georeferenced by a six-coefficient geotransform do not store
//! per-pixel coordinates; [`AffineGrid`] exposes the longitude or latitude
//! plane as a lazy 2D array, evaluating the transform only for the requested
//! pixel index ranges.

use crate::array::ArrayLike;
use crate::dtype::{ArrayValue, Dtype};
use crate::error::Result;
use crate::selection::{resolve_key, AxisSel, Sel};
use ndarray::Array2;

/// Which coordinate plane to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoAxis {
    Longitude,
    Latitude,
}

/// A lazy coordinate plane derived from a geotransform.
///
/// The transform uses the GDAL convention
/// `[x0, dx_col, dx_row, y0, dy_col, dy_row]`:
/// `x = x0 + col*dx_col + row*dx_row`, `y = y0 + col*dy_col + row*dy_row`,
/// evaluated at pixel centers via the integer indices.
pub struct AffineGrid {
    transform: [f64; 6],
    axis: GeoAxis,
    shape: Vec<usize>,
}

impl AffineGrid {
    pub fn new(transform: [f64; 6], axis: GeoAxis, shape: (usize, usize)) -> Self {
        Self {
            transform,
            axis,
            shape: vec![shape.0, shape.1],
        }
    }

    fn value(&self, row: usize, col: usize) -> f64 {
        let t = &self.transform;
        let (row, col) = (row as f64, col as f64);
        match self.axis {
            GeoAxis::Longitude => t[0] + col * t[1] + row * t[2],
            GeoAxis::Latitude => t[3] + col * t[4] + row * t[5],
        }
    }
}

impl ArrayLike for AffineGrid {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn dtype(&self) -> Dtype {
        Dtype::F64
    }

    fn read(&self, key: &[Sel]) -> Result<ArrayValue> {
        let resolved = resolve_key(key, &self.shape)?;
        let indices = |axis: AxisSel| -> Vec<usize> {
            match axis {
                AxisSel::At(i) => vec![i],
                AxisSel::Span { count, .. } => (0..count).map(|k| axis.index(k)).collect(),
            }
        };
        let rows = indices(resolved.axes[0]);
        let cols = indices(resolved.axes[1]);
        let block = Array2::from_shape_fn((rows.len(), cols.len()), |(r, c)| {
            self.value(rows[r], cols[c])
        });
        let out_shape = resolved.out_shape();
        Ok(ArrayValue::F64(
            block.into_dyn().into_shape(ndarray::IxDyn(&out_shape))?,
        ))
    }
}
