//! Labeled chunked arrays.
//!
//! A [`DataArray`] pairs a lazy [`ArrayLike`] source with ordered dimension
//! names, a chunk partition and attributes. It is the currency of the crate:
//! readers produce them, the blockwise dispatcher consumes and returns them.

use std::fmt;
use std::sync::Arc;

use crate::array::{ArrayLike, ReferenceArray};
use crate::chunks::{Chunk, ChunkGrid};
use crate::dtype::{ArrayValue, Attrs, Dtype};
use crate::error::{CoriolisError, Result};
use crate::selection::Sel;

/// A lazy array with named dimensions and a chunk partition.
#[derive(Clone)]
pub struct DataArray {
    dims: Vec<String>,
    chunks: ChunkGrid,
    data: Arc<dyn ArrayLike>,
    /// Free-form metadata (units, descriptions, flag tables).
    pub attrs: Attrs,
}

impl DataArray {
    /// Wrap a lazy source, naming its dimensions and choosing a chunking.
    pub fn from_array(data: Arc<dyn ArrayLike>, dims: &[&str], spec: &[Chunk]) -> Result<Self> {
        let shape = data.shape().to_vec();
        if dims.len() != shape.len() {
            return Err(CoriolisError::Dimension {
                message: format!(
                    "{} dimension names given for an array with {} dimensions",
                    dims.len(),
                    shape.len()
                ),
            });
        }
        for (i, dim) in dims.iter().enumerate() {
            if dims[..i].contains(dim) {
                return Err(CoriolisError::Dimension {
                    message: format!("duplicate dimension name: {}", dim),
                });
            }
        }
        let chunks = ChunkGrid::regular(&shape, spec)?;
        Ok(Self {
            dims: dims.iter().map(|d| d.to_string()).collect(),
            chunks,
            data,
            attrs: Attrs::new(),
        })
    }

    /// Wrap an already-materialized array.
    pub fn from_values(values: ArrayValue, dims: &[&str], spec: &[Chunk]) -> Result<Self> {
        Self::from_array(Arc::new(ReferenceArray::new(values)), dims, spec)
    }

    pub(crate) fn from_parts(data: Arc<dyn ArrayLike>, dims: Vec<String>, chunks: ChunkGrid) -> Self {
        Self {
            dims,
            chunks,
            data,
            attrs: Attrs::new(),
        }
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    pub fn dtype(&self) -> Dtype {
        self.data.dtype()
    }

    pub fn chunks(&self) -> &ChunkGrid {
        &self.chunks
    }

    /// Position of a dimension name, if present.
    pub fn dim_index(&self, name: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == name)
    }

    /// Read a selection, enforcing the declared element type.
    pub fn read(&self, key: &[Sel]) -> Result<ArrayValue> {
        let out = self.data.read(key)?;
        if out.dtype() != self.dtype() {
            return Err(CoriolisError::TypeMismatch {
                expected: self.dtype(),
                got: out.dtype(),
            });
        }
        Ok(out)
    }

    /// Realize the whole array.
    pub fn compute(&self) -> Result<ArrayValue> {
        self.read(&Sel::full_key(self.ndim()))
    }
}

impl fmt::Debug for DataArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataArray")
            .field("dims", &self.dims)
            .field("shape", &self.data.shape())
            .field("dtype", &self.data.dtype())
            .field("chunks", &self.chunks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    /// An adapter that declares one dtype but returns another.
    struct Lying;

    impl ArrayLike for Lying {
        fn shape(&self) -> &[usize] {
            &[2, 2]
        }

        fn dtype(&self) -> Dtype {
            Dtype::F32
        }

        fn read(&self, _key: &[Sel]) -> Result<ArrayValue> {
            Ok(ArrayValue::zeros(Dtype::F64, &[2, 2]))
        }
    }

    fn sample() -> DataArray {
        let values = ArrayD::from_shape_vec(IxDyn(&[4, 6]), (0u16..24).collect()).unwrap();
        DataArray::from_values(
            ArrayValue::from(values),
            &["rows", "columns"],
            &[Chunk::Size(2), Chunk::Size(3)],
        )
        .unwrap()
    }

    #[test]
    fn test_construction() {
        let a = sample();
        assert_eq!(a.dims(), &["rows".to_string(), "columns".to_string()]);
        assert_eq!(a.shape(), &[4, 6]);
        assert_eq!(a.dtype(), Dtype::U16);
        assert_eq!(a.chunks().nblocks(0), 2);
        assert_eq!(a.dim_index("columns"), Some(1));
    }

    #[test]
    fn test_dims_mismatch() {
        let values = ArrayValue::zeros(Dtype::F32, &[2, 2]);
        assert!(DataArray::from_values(values.clone(), &["x"], &[Chunk::Full]).is_err());
        assert!(
            DataArray::from_values(values, &["x", "x"], &[Chunk::Full, Chunk::Full]).is_err()
        );
    }

    #[test]
    fn test_compute_identity() {
        let a = sample();
        let full = a.compute().unwrap();
        assert_eq!(full.shape(), &[4, 6]);
        assert_eq!(full.as_u16().unwrap()[[3, 5]], 23);
    }

    #[test]
    fn test_dtype_consistency_enforced() {
        let a = DataArray::from_array(Arc::new(Lying), &["y", "x"], &[Chunk::Full, Chunk::Full])
            .unwrap();
        match a.compute() {
            Err(CoriolisError::TypeMismatch { expected, got }) => {
                assert_eq!(expected, Dtype::F32);
                assert_eq!(got, Dtype::F64);
            }
            other => panic!("expected a type mismatch, got {:?}", other.map(|_| ())),
        }
    }
}
