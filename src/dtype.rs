//! Element types and the concrete array value produced by every adapter.
//!
//! [`Dtype`] names the supported element types; [`ArrayValue`] is the tagged
//! union of `ndarray` arrays over them. Adapters declare a `Dtype` up front
//! and every read must produce exactly that type, so heterogeneous sources
//! can flow through one dispatch path without generics at the seam.

use std::collections::HashMap;
use std::fmt;

use bytemuck::Pod;
use ndarray::{concatenate, ArrayD, ArrayViewD, Axis, IxDyn};
use serde::{Deserialize, Serialize};

use crate::error::{CoriolisError, Result};
use crate::selection::{AxisSel, ResolvedKey};

/// Supported element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dtype {
    #[serde(rename = "uint8")]
    U8,
    #[serde(rename = "int8")]
    I8,
    #[serde(rename = "uint16")]
    U16,
    #[serde(rename = "int16")]
    I16,
    #[serde(rename = "uint32")]
    U32,
    #[serde(rename = "int32")]
    I32,
    #[serde(rename = "uint64")]
    U64,
    #[serde(rename = "int64")]
    I64,
    #[serde(rename = "float32")]
    F32,
    #[serde(rename = "float64")]
    F64,
}

impl Dtype {
    /// Size of one element in bytes.
    pub fn item_size(self) -> usize {
        match self {
            Dtype::U8 | Dtype::I8 => 1,
            Dtype::U16 | Dtype::I16 => 2,
            Dtype::U32 | Dtype::I32 | Dtype::F32 => 4,
            Dtype::U64 | Dtype::I64 | Dtype::F64 => 8,
        }
    }

    /// The conventional name, e.g. `"float32"`.
    pub fn name(self) -> &'static str {
        match self {
            Dtype::U8 => "uint8",
            Dtype::I8 => "int8",
            Dtype::U16 => "uint16",
            Dtype::I16 => "int16",
            Dtype::U32 => "uint32",
            Dtype::I32 => "int32",
            Dtype::U64 => "uint64",
            Dtype::I64 => "int64",
            Dtype::F32 => "float32",
            Dtype::F64 => "float64",
        }
    }

    /// Parse a conventional name.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "uint8" => Ok(Dtype::U8),
            "int8" => Ok(Dtype::I8),
            "uint16" => Ok(Dtype::U16),
            "int16" => Ok(Dtype::I16),
            "uint32" => Ok(Dtype::U32),
            "int32" => Ok(Dtype::I32),
            "uint64" => Ok(Dtype::U64),
            "int64" => Ok(Dtype::I64),
            "float32" => Ok(Dtype::F32),
            "float64" => Ok(Dtype::F64),
            _ => Err(CoriolisError::InvalidParameter {
                param: "dtype".to_string(),
                message: format!("Unknown dtype name: {}", name),
            }),
        }
    }

    /// Whether this is an integer type.
    pub fn is_integer(self) -> bool {
        !matches!(self, Dtype::F32 | Dtype::F64)
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A concrete N-dimensional array of any supported element type.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    U8(ArrayD<u8>),
    I8(ArrayD<i8>),
    U16(ArrayD<u16>),
    I16(ArrayD<i16>),
    U32(ArrayD<u32>),
    I32(ArrayD<i32>),
    U64(ArrayD<u64>),
    I64(ArrayD<i64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

/// Run `$body` with `$arr` bound to the inner array, for any variant.
macro_rules! dispatch {
    ($value:expr, $arr:ident => $body:expr) => {
        match $value {
            ArrayValue::U8($arr) => $body,
            ArrayValue::I8($arr) => $body,
            ArrayValue::U16($arr) => $body,
            ArrayValue::I16($arr) => $body,
            ArrayValue::U32($arr) => $body,
            ArrayValue::I32($arr) => $body,
            ArrayValue::U64($arr) => $body,
            ArrayValue::I64($arr) => $body,
            ArrayValue::F32($arr) => $body,
            ArrayValue::F64($arr) => $body,
        }
    };
}

/// Like `dispatch!`, but rewrap the result in the same variant.
macro_rules! dispatch_map {
    ($value:expr, $arr:ident => $body:expr) => {
        match $value {
            ArrayValue::U8($arr) => ArrayValue::U8($body),
            ArrayValue::I8($arr) => ArrayValue::I8($body),
            ArrayValue::U16($arr) => ArrayValue::U16($body),
            ArrayValue::I16($arr) => ArrayValue::I16($body),
            ArrayValue::U32($arr) => ArrayValue::U32($body),
            ArrayValue::I32($arr) => ArrayValue::I32($body),
            ArrayValue::U64($arr) => ArrayValue::U64($body),
            ArrayValue::I64($arr) => ArrayValue::I64($body),
            ArrayValue::F32($arr) => ArrayValue::F32($body),
            ArrayValue::F64($arr) => ArrayValue::F64($body),
        }
    };
}

/// Like `dispatch_map!`, but `$body` is fallible.
macro_rules! dispatch_try_map {
    ($value:expr, $arr:ident => $body:expr) => {
        match $value {
            ArrayValue::U8($arr) => ArrayValue::U8($body),
            ArrayValue::I8($arr) => ArrayValue::I8($body),
            ArrayValue::U16($arr) => ArrayValue::U16($body),
            ArrayValue::I16($arr) => ArrayValue::I16($body),
            ArrayValue::U32($arr) => ArrayValue::U32($body),
            ArrayValue::I32($arr) => ArrayValue::I32($body),
            ArrayValue::U64($arr) => ArrayValue::U64($body),
            ArrayValue::I64($arr) => ArrayValue::I64($body),
            ArrayValue::F32($arr) => ArrayValue::F32($body),
            ArrayValue::F64($arr) => ArrayValue::F64($body),
        }
    };
}

impl ArrayValue {
    /// Element type of this array.
    pub fn dtype(&self) -> Dtype {
        match self {
            ArrayValue::U8(_) => Dtype::U8,
            ArrayValue::I8(_) => Dtype::I8,
            ArrayValue::U16(_) => Dtype::U16,
            ArrayValue::I16(_) => Dtype::I16,
            ArrayValue::U32(_) => Dtype::U32,
            ArrayValue::I32(_) => Dtype::I32,
            ArrayValue::U64(_) => Dtype::U64,
            ArrayValue::I64(_) => Dtype::I64,
            ArrayValue::F32(_) => Dtype::F32,
            ArrayValue::F64(_) => Dtype::F64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        dispatch!(self, arr => arr.shape())
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        dispatch!(self, arr => arr.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A zero-filled array of the given type and shape.
    pub fn zeros(dtype: Dtype, shape: &[usize]) -> ArrayValue {
        let dim = IxDyn(shape);
        match dtype {
            Dtype::U8 => ArrayValue::U8(ArrayD::zeros(dim)),
            Dtype::I8 => ArrayValue::I8(ArrayD::zeros(dim)),
            Dtype::U16 => ArrayValue::U16(ArrayD::zeros(dim)),
            Dtype::I16 => ArrayValue::I16(ArrayD::zeros(dim)),
            Dtype::U32 => ArrayValue::U32(ArrayD::zeros(dim)),
            Dtype::I32 => ArrayValue::I32(ArrayD::zeros(dim)),
            Dtype::U64 => ArrayValue::U64(ArrayD::zeros(dim)),
            Dtype::I64 => ArrayValue::I64(ArrayD::zeros(dim)),
            Dtype::F32 => ArrayValue::F32(ArrayD::zeros(dim)),
            Dtype::F64 => ArrayValue::F64(ArrayD::zeros(dim)),
        }
    }

    /// Gather the block selected by a resolved key.
    pub fn gather(&self, key: &ResolvedKey) -> Result<ArrayValue> {
        Ok(dispatch_try_map!(self, arr => gather_nd(arr, key)?))
    }

    /// Reshape to `shape` (same element count).
    pub fn reshape(self, shape: &[usize]) -> Result<ArrayValue> {
        Ok(dispatch_try_map!(self, arr => {
            let arr = if arr.is_standard_layout() {
                arr
            } else {
                arr.as_standard_layout().to_owned()
            };
            arr.into_shape(IxDyn(shape))?
        }))
    }

    /// Owned copy of `range` along the leading axis.
    pub fn slice_axis0(&self, range: std::ops::Range<usize>) -> ArrayValue {
        dispatch_map!(self, arr => arr
            .slice_axis(Axis(0), ndarray::Slice::from(range.clone()))
            .to_owned())
    }

    /// Assign `src` into the region described by one range per axis.
    pub fn assign_region(&mut self, ranges: &[std::ops::Range<usize>], src: &ArrayValue) -> Result<()> {
        if self.dtype() != src.dtype() {
            return Err(CoriolisError::TypeMismatch {
                expected: self.dtype(),
                got: src.dtype(),
            });
        }
        if ranges.len() != self.ndim() {
            return Err(CoriolisError::Dimension {
                message: format!(
                    "region has {} ranges but the array has {} dimensions",
                    ranges.len(),
                    self.ndim()
                ),
            });
        }
        match (self, src) {
            (ArrayValue::U8(dst), ArrayValue::U8(s)) => assign_nd(dst, ranges, s),
            (ArrayValue::I8(dst), ArrayValue::I8(s)) => assign_nd(dst, ranges, s),
            (ArrayValue::U16(dst), ArrayValue::U16(s)) => assign_nd(dst, ranges, s),
            (ArrayValue::I16(dst), ArrayValue::I16(s)) => assign_nd(dst, ranges, s),
            (ArrayValue::U32(dst), ArrayValue::U32(s)) => assign_nd(dst, ranges, s),
            (ArrayValue::I32(dst), ArrayValue::I32(s)) => assign_nd(dst, ranges, s),
            (ArrayValue::U64(dst), ArrayValue::U64(s)) => assign_nd(dst, ranges, s),
            (ArrayValue::I64(dst), ArrayValue::I64(s)) => assign_nd(dst, ranges, s),
            (ArrayValue::F32(dst), ArrayValue::F32(s)) => assign_nd(dst, ranges, s),
            (ArrayValue::F64(dst), ArrayValue::F64(s)) => assign_nd(dst, ranges, s),
            _ => unreachable!("dtype equality checked above"),
        }
        Ok(())
    }

    /// Concatenate along the leading axis; all parts must share a dtype.
    pub fn concatenate(parts: &[ArrayValue]) -> Result<ArrayValue> {
        let first = parts.first().ok_or_else(|| CoriolisError::InvalidParameter {
            param: "parts".to_string(),
            message: "cannot concatenate zero arrays".to_string(),
        })?;
        let dtype = first.dtype();
        for part in parts {
            if part.dtype() != dtype {
                return Err(CoriolisError::TypeMismatch {
                    expected: dtype,
                    got: part.dtype(),
                });
            }
        }
        macro_rules! concat_as {
            ($variant:ident, $t:ty) => {{
                let views: Vec<ArrayViewD<$t>> = parts
                    .iter()
                    .map(|p| match p {
                        ArrayValue::$variant(a) => a.view(),
                        _ => unreachable!("dtype equality checked above"),
                    })
                    .collect();
                Ok(ArrayValue::$variant(concatenate(Axis(0), &views)?))
            }};
        }
        match dtype {
            Dtype::U8 => concat_as!(U8, u8),
            Dtype::I8 => concat_as!(I8, i8),
            Dtype::U16 => concat_as!(U16, u16),
            Dtype::I16 => concat_as!(I16, i16),
            Dtype::U32 => concat_as!(U32, u32),
            Dtype::I32 => concat_as!(I32, i32),
            Dtype::U64 => concat_as!(U64, u64),
            Dtype::I64 => concat_as!(I64, i64),
            Dtype::F32 => concat_as!(F32, f32),
            Dtype::F64 => concat_as!(F64, f64),
        }
    }

    /// The raw little-endian bytes in row-major order, with the shape.
    pub fn to_bytes(&self) -> (Vec<u8>, Vec<usize>) {
        let shape = self.shape().to_vec();
        let bytes = dispatch!(self, arr => {
            let arr = arr.as_standard_layout();
            match arr.as_slice() {
                Some(slice) => bytemuck::cast_slice(slice).to_vec(),
                // zero-size arrays may not expose a slice
                None => Vec::new(),
            }
        });
        (bytes, shape)
    }

    /// Rebuild an array from row-major bytes.
    pub fn from_bytes(dtype: Dtype, shape: &[usize], bytes: &[u8]) -> Result<ArrayValue> {
        match dtype {
            Dtype::U8 => from_bytes_as::<u8>(shape, bytes).map(ArrayValue::U8),
            Dtype::I8 => from_bytes_as::<i8>(shape, bytes).map(ArrayValue::I8),
            Dtype::U16 => from_bytes_as::<u16>(shape, bytes).map(ArrayValue::U16),
            Dtype::I16 => from_bytes_as::<i16>(shape, bytes).map(ArrayValue::I16),
            Dtype::U32 => from_bytes_as::<u32>(shape, bytes).map(ArrayValue::U32),
            Dtype::I32 => from_bytes_as::<i32>(shape, bytes).map(ArrayValue::I32),
            Dtype::U64 => from_bytes_as::<u64>(shape, bytes).map(ArrayValue::U64),
            Dtype::I64 => from_bytes_as::<i64>(shape, bytes).map(ArrayValue::I64),
            Dtype::F32 => from_bytes_as::<f32>(shape, bytes).map(ArrayValue::F32),
            Dtype::F64 => from_bytes_as::<f64>(shape, bytes).map(ArrayValue::F64),
        }
    }

    /// Cast every element to f64.
    pub fn to_f64(&self) -> ArrayD<f64> {
        dispatch!(self, arr => arr.mapv(|v| v as f64))
    }

    /// Realize an integer array as signed 64-bit indices.
    pub fn to_indices(&self) -> Result<ArrayD<i64>> {
        if !self.dtype().is_integer() {
            return Err(CoriolisError::TypeMismatch {
                expected: Dtype::I64,
                got: self.dtype(),
            });
        }
        Ok(match self {
            ArrayValue::U8(a) => a.mapv(|v| v as i64),
            ArrayValue::I8(a) => a.mapv(|v| v as i64),
            ArrayValue::U16(a) => a.mapv(|v| v as i64),
            ArrayValue::I16(a) => a.mapv(|v| v as i64),
            ArrayValue::U32(a) => a.mapv(|v| v as i64),
            ArrayValue::I32(a) => a.mapv(|v| v as i64),
            ArrayValue::U64(a) => a.mapv(|v| v as i64),
            ArrayValue::I64(a) => a.clone(),
            ArrayValue::F32(_) | ArrayValue::F64(_) => unreachable!("checked above"),
        })
    }

    pub fn as_u8(&self) -> Option<&ArrayD<u8>> {
        match self {
            ArrayValue::U8(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_i8(&self) -> Option<&ArrayD<i8>> {
        match self {
            ArrayValue::I8(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<&ArrayD<u16>> {
        match self {
            ArrayValue::U16(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<&ArrayD<i16>> {
        match self {
            ArrayValue::I16(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<&ArrayD<u32>> {
        match self {
            ArrayValue::U32(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<&ArrayD<i32>> {
        match self {
            ArrayValue::I32(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<&ArrayD<u64>> {
        match self {
            ArrayValue::U64(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<&ArrayD<i64>> {
        match self {
            ArrayValue::I64(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<&ArrayD<f32>> {
        match self {
            ArrayValue::F32(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&ArrayD<f64>> {
        match self {
            ArrayValue::F64(a) => Some(a),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($t:ty, $variant:ident) => {
        impl From<ArrayD<$t>> for ArrayValue {
            fn from(arr: ArrayD<$t>) -> Self {
                ArrayValue::$variant(arr)
            }
        }
    };
}

impl_from!(u8, U8);
impl_from!(i8, I8);
impl_from!(u16, U16);
impl_from!(i16, I16);
impl_from!(u32, U32);
impl_from!(i32, I32);
impl_from!(u64, U64);
impl_from!(i64, I64);
impl_from!(f32, F32);
impl_from!(f64, F64);

fn from_bytes_as<T: Pod>(shape: &[usize], bytes: &[u8]) -> Result<ArrayD<T>> {
    let item = std::mem::size_of::<T>();
    if item == 0 || bytes.len() % item != 0 {
        return Err(CoriolisError::Coercion {
            message: format!(
                "byte buffer of length {} is not a multiple of the {}-byte element size",
                bytes.len(),
                item
            ),
        });
    }
    let values: Vec<T> = bytes
        .chunks_exact(item)
        .map(bytemuck::pod_read_unaligned)
        .collect();
    Ok(ArrayD::from_shape_vec(IxDyn(shape), values)?)
}

/// Gather the selected block from `a`; axes keyed by `At` are dropped.
fn gather_nd<T: Clone>(a: &ArrayD<T>, key: &ResolvedKey) -> Result<ArrayD<T>> {
    if key.axes.len() != a.ndim() {
        return Err(CoriolisError::Dimension {
            message: format!(
                "selection has {} axes but the array has {} dimensions",
                key.axes.len(),
                a.ndim()
            ),
        });
    }
    let out_shape = key.out_shape();
    // positions of kept axes in the output index
    let kept: Vec<usize> = key
        .axes
        .iter()
        .enumerate()
        .filter_map(|(i, axis)| match axis {
            AxisSel::At(_) => None,
            AxisSel::Span { .. } => Some(i),
        })
        .collect();
    let mut src = vec![0usize; a.ndim()];
    for (i, axis) in key.axes.iter().enumerate() {
        if let AxisSel::At(j) = axis {
            src[i] = *j;
        }
    }
    let out = ArrayD::from_shape_fn(IxDyn(&out_shape), |idx| {
        let mut src = src.clone();
        for (k, &axis_pos) in kept.iter().enumerate() {
            src[axis_pos] = key.axes[axis_pos].index(idx[k]);
        }
        a[IxDyn(&src)].clone()
    });
    Ok(out)
}

fn assign_nd<T: Clone>(dst: &mut ArrayD<T>, ranges: &[std::ops::Range<usize>], src: &ArrayD<T>) {
    let mut view = dst.view_mut();
    for (axis, range) in ranges.iter().enumerate() {
        view.slice_axis_inplace(
            Axis(axis),
            ndarray::Slice::from(range.start as isize..range.end as isize),
        );
    }
    view.assign(src);
}

/// Attribute map attached to arrays and datasets.
pub type Attrs = HashMap<String, crate::dataset::AttributeValue>;
