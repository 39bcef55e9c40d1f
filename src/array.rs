//! The lazy array capability contract.
//!
//! Every data source — file windows, tie-point grids, index broadcasts,
//! in-memory arrays — exposes the same small surface: a fixed shape, a fixed
//! element type, and slice-based random access. Chunked execution may call
//! `read` concurrently from worker threads, so implementations must not keep
//! a shared mutable cursor; file-backed adapters re-open their handle on
//! every call.

use std::sync::Arc;

use crate::dtype::{ArrayValue, Dtype};
use crate::error::Result;
use crate::selection::{resolve_key, Sel};

/// A lazy N-dimensional data source.
///
/// `shape` and `dtype` are fixed at construction. `read` takes one [`Sel`]
/// per dimension, honors slice steps exactly (reading the dense bounding box
/// at the backing layer where the backend cannot stride), clamps
/// out-of-range slice bounds, and must return an [`ArrayValue`] whose dtype
/// equals `dtype()`.
pub trait ArrayLike: Send + Sync {
    fn shape(&self) -> &[usize];

    fn dtype(&self) -> Dtype;

    fn ndim(&self) -> usize {
        self.shape().len()
    }

    fn read(&self, key: &[Sel]) -> Result<ArrayValue>;

    /// Read the whole array.
    fn read_full(&self) -> Result<ArrayValue> {
        self.read(&Sel::full_key(self.ndim()))
    }
}

impl<T: ArrayLike + ?Sized> ArrayLike for Arc<T> {
    fn shape(&self) -> &[usize] {
        (**self).shape()
    }

    fn dtype(&self) -> Dtype {
        (**self).dtype()
    }

    fn read(&self, key: &[Sel]) -> Result<ArrayValue> {
        (**self).read(key)
    }
}

/// An already-materialized array behind the [`ArrayLike`] contract.
pub struct ReferenceArray {
    data: ArrayValue,
}

impl ReferenceArray {
    pub fn new(data: ArrayValue) -> Self {
        Self { data }
    }

    pub fn values(&self) -> &ArrayValue {
        &self.data
    }
}

impl ArrayLike for ReferenceArray {
    fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    fn dtype(&self) -> Dtype {
        self.data.dtype()
    }

    fn read(&self, key: &[Sel]) -> Result<ArrayValue> {
        let resolved = resolve_key(key, self.data.shape())?;
        self.data.gather(&resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    fn sample() -> ReferenceArray {
        let data = ArrayD::from_shape_vec(IxDyn(&[4, 5]), (0i32..20).collect()).unwrap();
        ReferenceArray::new(ArrayValue::from(data))
    }

    #[test]
    fn test_identity_passthrough() {
        let a = sample();
        let full = a.read_full().unwrap();
        assert_eq!(full, *a.values());
    }

    #[test]
    fn test_window_read() {
        let a = sample();
        let out = a.read(&[Sel::range(1, 3), Sel::range(2, 4)]).unwrap();
        assert_eq!(out.shape(), &[2, 2]);
        assert_eq!(out.as_i32().unwrap()[[0, 0]], 7);
    }

    #[test]
    fn test_clamped_read() {
        let a = sample();
        // stop way past the extent clamps instead of failing
        let out = a.read(&[Sel::range(2, 100), Sel::full()]).unwrap();
        assert_eq!(out.shape(), &[2, 5]);
    }

    #[test]
    fn test_scalar_read() {
        let a = sample();
        let out = a.read(&[Sel::at(1), Sel::at(-1)]).unwrap();
        assert_eq!(out.ndim(), 0);
        assert_eq!(out.as_i32().unwrap()[IxDyn(&[])], 9);
    }

    #[test]
    fn test_stepped_read() {
        let a = sample();
        let out = a
            .read(&[Sel::stepped(None, None, 2), Sel::stepped(Some(1), None, 2)])
            .unwrap();
        assert_eq!(out.shape(), &[2, 2]);
        assert_eq!(out.as_i32().unwrap()[[1, 1]], 13);
    }
}
