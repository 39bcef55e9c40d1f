//! Tie-point interpolation.
//!
//! Satellite geometry fields (viewing angles, meteo fields) are often
//! delivered on a coarse, regularly subsampled "tie-point" grid. This module
//! upsamples such grids lazily to full pixel resolution: [`TiePointGrid`]
//! looks like a full-resolution array but evaluates the tie grid at
//! fractional coordinates on every read.

pub mod bilinear;
pub mod nearest;

use ndarray::{Array2, ArrayD, IxDyn};
use num_traits::Float;

use crate::array::ArrayLike;
use crate::dtype::{ArrayValue, Dtype};
use crate::error::{CoriolisError, Result};
use crate::selection::{resolve_key, AxisSel, Sel};

/// Interpolation method for tie-point upsampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpMethod {
    Bilinear,
    Nearest,
}

impl InterpMethod {
    /// Get a method by name
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "nearest" => Ok(InterpMethod::Nearest),
            "bilinear" | "linear" => Ok(InterpMethod::Bilinear),
            _ => Err(CoriolisError::InvalidParameter {
                param: "interpolation".to_string(),
                message: format!("Unknown interpolation method: {}", name),
            }),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            InterpMethod::Bilinear => "bilinear",
            InterpMethod::Nearest => "nearest",
        }
    }
}

/// Element types the tie-point kernels operate on.
pub trait TieElement: Float + Copy + Send + Sync + 'static {
    const DTYPE: Dtype;

    fn from_f64(x: f64) -> Self;

    fn to_f64(self) -> f64;

    fn wrap(arr: ArrayD<Self>) -> ArrayValue;
}

impl TieElement for f32 {
    const DTYPE: Dtype = Dtype::F32;

    fn from_f64(x: f64) -> Self {
        x as f32
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn wrap(arr: ArrayD<Self>) -> ArrayValue {
        ArrayValue::F32(arr)
    }
}

impl TieElement for f64 {
    const DTYPE: Dtype = Dtype::F64;

    fn from_f64(x: f64) -> Self {
        x
    }

    fn to_f64(self) -> f64 {
        self
    }

    fn wrap(arr: ArrayD<Self>) -> ArrayValue {
        ArrayValue::F64(arr)
    }
}

/// A full-resolution lazy view over a subsampled tie-point grid.
///
/// The tie grid must cover the full grid exactly: with subsampling factors
/// `(fy, fx)` and tie shape `(h, w)`, the full shape is
/// `(fy*(h-1)+1, fx*(w-1)+1)`, so the last full-resolution pixel falls on
/// the last tie sample (closed interval, no extrapolation).
pub struct TiePointGrid<T: TieElement> {
    shape: Vec<usize>,
    tie: Array2<T>,
    factors: (usize, usize),
    method: InterpMethod,
}

impl<T: TieElement> TiePointGrid<T> {
    pub fn new(
        shape: (usize, usize),
        tie: Array2<T>,
        factors: (usize, usize),
        method: InterpMethod,
    ) -> Result<Self> {
        let (height, width) = shape;
        let (fy, fx) = factors;
        let (tie_h, tie_w) = (tie.nrows(), tie.ncols());
        if fy == 0 || fx == 0 || tie_h == 0 || tie_w == 0 {
            return Err(CoriolisError::InvalidParameter {
                param: "factors".to_string(),
                message: "subsampling factors and tie-grid extents must be positive".to_string(),
            });
        }
        // the tie grid's first and last samples must coincide with the full
        // grid's first and last pixels
        if height != fy * (tie_h - 1) + 1 || width != fx * (tie_w - 1) + 1 {
            return Err(CoriolisError::Dimension {
                message: format!(
                    "tie grid {}x{} with factors ({}, {}) does not cover a {}x{} grid",
                    tie_h, tie_w, fy, fx, height, width
                ),
            });
        }
        Ok(Self {
            shape: vec![height, width],
            tie,
            factors,
            method,
        })
    }

    /// The underlying tie-point array.
    pub fn tie(&self) -> &Array2<T> {
        &self.tie
    }

    fn fractional(&self, axis: AxisSel, factor: usize) -> Vec<f64> {
        let count = match axis {
            AxisSel::At(_) => 1,
            AxisSel::Span { count, .. } => count,
        };
        (0..count)
            .map(|k| axis.index(k) as f64 / factor as f64)
            .collect()
    }
}

impl<T: TieElement> ArrayLike for TiePointGrid<T> {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn dtype(&self) -> Dtype {
        T::DTYPE
    }

    fn read(&self, key: &[Sel]) -> Result<ArrayValue> {
        let resolved = resolve_key(key, &self.shape)?;
        let rows = self.fractional(resolved.axes[0], self.factors.0);
        let cols = self.fractional(resolved.axes[1], self.factors.1);

        let block = match self.method {
            InterpMethod::Bilinear => bilinear::interp_block(&self.tie, &rows, &cols),
            InterpMethod::Nearest => nearest::interp_block(&self.tie, &rows, &cols),
        };

        // axes keyed by a scalar are dropped, matching meshgrid broadcasting
        let out_shape = resolved.out_shape();
        let dyn_block: ArrayD<T> = block.into_dyn();
        Ok(T::wrap(dyn_block.into_shape(IxDyn(&out_shape))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use ndarray::IxDyn;

    fn tie() -> Array2<f32> {
        // 3x3 tie grid over a 5x5 full grid (factor 2)
        array![[0.0f32, 2.0, 4.0], [4.0, 6.0, 8.0], [8.0, 10.0, 12.0]]
    }

    #[test]
    fn test_method_from_name() {
        assert_eq!(InterpMethod::from_name("bilinear").unwrap(), InterpMethod::Bilinear);
        assert_eq!(InterpMethod::from_name("linear").unwrap(), InterpMethod::Bilinear);
        assert_eq!(InterpMethod::from_name("NEAREST").unwrap(), InterpMethod::Nearest);
        assert!(InterpMethod::from_name("bicubic").is_err());
    }

    #[test]
    fn test_shape_validation() {
        assert!(TiePointGrid::new((5, 5), tie(), (2, 2), InterpMethod::Bilinear).is_ok());
        assert!(TiePointGrid::new((6, 5), tie(), (2, 2), InterpMethod::Bilinear).is_err());
        assert!(TiePointGrid::new((5, 5), tie(), (0, 2), InterpMethod::Bilinear).is_err());
    }

    #[test]
    fn test_exact_at_tie_points() {
        let grid = TiePointGrid::new((5, 5), tie(), (2, 2), InterpMethod::Bilinear).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let v = grid
                    .read(&[Sel::at(2 * i as isize), Sel::at(2 * j as isize)])
                    .unwrap();
                assert_eq!(v.as_f32().unwrap()[IxDyn(&[])], tie()[[i, j]]);
            }
        }
    }

    #[test]
    fn test_midpoint_interpolation() {
        let grid = TiePointGrid::new((5, 5), tie(), (2, 2), InterpMethod::Bilinear).unwrap();
        let v = grid.read(&[Sel::at(1), Sel::at(1)]).unwrap();
        // mean of the four surrounding tie samples 0, 2, 4, 6
        assert_eq!(v.as_f32().unwrap()[IxDyn(&[])], 3.0);
    }

    #[test]
    fn test_block_read() {
        let grid = TiePointGrid::new((5, 5), tie(), (2, 2), InterpMethod::Bilinear).unwrap();
        let block = grid.read(&[Sel::full(), Sel::full()]).unwrap();
        assert_eq!(block.shape(), &[5, 5]);
        let arr = block.as_f32().unwrap();
        assert_eq!(arr[[0, 0]], 0.0);
        assert_eq!(arr[[4, 4]], 12.0);
        assert_eq!(arr[[2, 1]], 5.0);
    }

    #[test]
    fn test_row_slice_with_scalar_column() {
        let grid = TiePointGrid::new((5, 5), tie(), (2, 2), InterpMethod::Bilinear).unwrap();
        let col = grid.read(&[Sel::full(), Sel::at(0)]).unwrap();
        assert_eq!(col.shape(), &[5]);
        assert_eq!(col.as_f32().unwrap()[[2]], 4.0);
    }

    #[test]
    fn test_nearest() {
        let grid = TiePointGrid::new((5, 5), tie(), (2, 2), InterpMethod::Nearest).unwrap();
        let v = grid.read(&[Sel::at(1), Sel::at(0)]).unwrap();
        // 0.5 rounds up to the next tie row
        assert_eq!(v.as_f32().unwrap()[IxDyn(&[])], 4.0);
        let v = grid.read(&[Sel::at(4), Sel::at(4)]).unwrap();
        assert_eq!(v.as_f32().unwrap()[IxDyn(&[])], 12.0);
    }
}
