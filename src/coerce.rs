//! Lossless dtype coercion for stacking heterogeneous arrays.
//!
//! The blockwise dispatcher funnels every kernel output through a single
//! buffer of one common element type. `coerce_dtype` makes that possible
//! without losing information: coercing to a larger type zero-pads each
//! element's trailing bytes, equal sizes are a pure bit reinterpretation,
//! and coercing to a smaller type takes the leading bytes of each element
//! back out. Coercing up and then back down returns the original array
//! bit-exactly.

use crate::dtype::{ArrayValue, Dtype};
use crate::error::{CoriolisError, Result};

/// Reinterpret `a` as `dtype`, keeping its shape.
///
/// Item sizes must divide evenly; anything else fails with a coercion
/// error rather than guessing at a padding scheme.
pub fn coerce_dtype(a: &ArrayValue, dtype: Dtype) -> Result<ArrayValue> {
    let src = a.dtype();
    let src_size = src.item_size();
    let dst_size = dtype.item_size();
    let (bytes, shape) = a.to_bytes();

    if dst_size == src_size {
        return ArrayValue::from_bytes(dtype, &shape, &bytes);
    }

    if dst_size > src_size {
        // pad each element's trailing bytes with zeros
        let n = dst_size / src_size;
        if n * src_size != dst_size {
            return Err(size_mismatch(src, dtype));
        }
        let count = bytes.len() / src_size;
        let mut out = vec![0u8; count * dst_size];
        for i in 0..count {
            out[i * dst_size..i * dst_size + src_size]
                .copy_from_slice(&bytes[i * src_size..(i + 1) * src_size]);
        }
        ArrayValue::from_bytes(dtype, &shape, &out)
    } else {
        // drop the zero padding: keep each element's leading bytes
        let n = src_size / dst_size;
        if n * dst_size != src_size {
            return Err(size_mismatch(src, dtype));
        }
        let count = bytes.len() / src_size;
        let mut out = vec![0u8; count * dst_size];
        for i in 0..count {
            out[i * dst_size..(i + 1) * dst_size]
                .copy_from_slice(&bytes[i * src_size..i * src_size + dst_size]);
        }
        ArrayValue::from_bytes(dtype, &shape, &out)
    }
}

fn size_mismatch(src: Dtype, dst: Dtype) -> CoriolisError {
    CoriolisError::Coercion {
        message: format!(
            "item sizes of {} ({} bytes) and {} ({} bytes) are not integer multiples",
            src,
            src.item_size(),
            dst,
            dst.item_size()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, ArrayD, IxDyn};

    fn roundtrip(a: ArrayValue, via: Dtype) {
        let coerced = coerce_dtype(&a, via).unwrap();
        assert_eq!(coerced.shape(), a.shape());
        assert_eq!(coerced.dtype(), via);
        let back = coerce_dtype(&coerced, a.dtype()).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn test_roundtrip_upcast() {
        let a = ArrayValue::from(
            ArrayD::from_shape_vec(IxDyn(&[3, 4]), (0u8..12).collect()).unwrap(),
        );
        roundtrip(a.clone(), Dtype::U16);
        roundtrip(a.clone(), Dtype::F32);
        roundtrip(a, Dtype::F64);
    }

    #[test]
    fn test_roundtrip_float() {
        let a = ArrayValue::from(array![[1.5f32, -0.25], [3.75, f32::NAN]].into_dyn());
        let coerced = coerce_dtype(&a, Dtype::F64).unwrap();
        let back = coerce_dtype(&coerced, Dtype::F32).unwrap();
        // NaN payloads survive because the coercion is bitwise
        let (orig_bytes, _) = a.to_bytes();
        let (back_bytes, _) = back.to_bytes();
        assert_eq!(orig_bytes, back_bytes);
    }

    #[test]
    fn test_roundtrip_same_size() {
        let a = ArrayValue::from(array![1.0f32, -2.0].into_dyn());
        let view = coerce_dtype(&a, Dtype::U32).unwrap();
        // IEEE 754 bits of 1.0f32
        assert_eq!(view.as_u32().unwrap()[[0]], 0x3f80_0000);
        let back = coerce_dtype(&view, Dtype::F32).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn test_downcast_recovers_padded_values() {
        let a = ArrayValue::from(array![[7u8, 200], [13, 0]].into_dyn());
        let wide = coerce_dtype(&a, Dtype::F64).unwrap();
        assert_eq!(wide.shape(), &[2, 2]);
        let narrow = coerce_dtype(&wide, Dtype::U8).unwrap();
        assert_eq!(narrow, a);
    }

    #[test]
    fn test_roundtrip_signed() {
        let a = ArrayValue::from(array![-5i16, 300, i16::MIN].into_dyn());
        roundtrip(a.clone(), Dtype::I32);
        roundtrip(a, Dtype::F64);
    }

    #[test]
    fn test_identity() {
        let a = ArrayValue::from(array![1u16, 2, 3].into_dyn());
        let same = coerce_dtype(&a, Dtype::U16).unwrap();
        assert_eq!(same, a);
    }
}
