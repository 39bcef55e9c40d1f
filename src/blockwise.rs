//! Chunk-parallel dispatch of pure kernels over labeled arrays.
//!
//! [`Blockwise`] applies a caller-supplied function independently to every
//! spatial chunk of one or more [`DataArray`]s. The kernel may return several
//! outputs with different dimensions and element types; each chunk's outputs
//! are coerced to the largest declared type, flattened over their
//! non-blockwise dimensions and concatenated along a synthetic leading axis,
//! so the whole dispatch fits a single-buffer execution primitive. The
//! synthetic axis is sliced back apart afterwards and every output is
//! restored to its declared dtype and dimensions.
//!
//! Chunks share no mutable state and carry no ordering dependency; they run
//! on the rayon pool and the result is identical however they are scheduled.
//! There is no per-chunk isolation: the first failing chunk aborts the whole
//! dispatch.

use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use crate::array::ReferenceArray;
use crate::chunks::ChunkGrid;
use crate::coerce::coerce_dtype;
use crate::dataarray::DataArray;
use crate::dtype::{ArrayValue, Dtype};
use crate::error::{CoriolisError, Result};
use crate::selection::Sel;

/// Apply a kernel function chunk by chunk.
///
/// The blockwise dimensions must be the last dimensions, in the same order,
/// of every input array and every declared output.
///
/// Example:
/// ```
/// use coriolis::{ArrayValue, Blockwise, Chunk, DataArray, Dtype};
/// use ndarray::ArrayD;
///
/// let values = ArrayD::from_elem(ndarray::IxDyn(&[8, 8]), 1.0f32);
/// let sza = DataArray::from_values(
///     ArrayValue::from(values),
///     &["rows", "columns"],
///     &[Chunk::Size(4), Chunk::Size(4)],
/// )
/// .unwrap();
///
/// let blk = Blockwise::new(
///     |args: &[ArrayValue]| Ok(vec![args[0].clone()]),
///     &["rows", "columns"],
///     &[&["rows", "columns"]],
///     &[Dtype::F32],
/// )
/// .unwrap();
/// let out = blk.call1(&[&sza]).unwrap();
/// assert_eq!(out.compute().unwrap(), sza.compute().unwrap());
/// ```
pub struct Blockwise<F> {
    func: F,
    dims_blockwise: Vec<String>,
    dims_out: Vec<Vec<String>>,
    dtypes: Vec<Dtype>,
    dtype_coerce: Dtype,
}

impl<F> Blockwise<F>
where
    F: Fn(&[ArrayValue]) -> Result<Vec<ArrayValue>> + Sync,
{
    /// Declare a blockwise computation.
    ///
    /// `dims_out` and `dtypes` describe the kernel's return values, one
    /// entry each per output, in order.
    pub fn new(
        func: F,
        dims_blockwise: &[&str],
        dims_out: &[&[&str]],
        dtypes: &[Dtype],
    ) -> Result<Self> {
        if dims_blockwise.is_empty() {
            return Err(CoriolisError::Dimension {
                message: "at least one blockwise dimension is required".to_string(),
            });
        }
        if dims_out.len() != dtypes.len() {
            return Err(CoriolisError::Dimension {
                message: format!(
                    "{} output dimension tuples declared but {} dtypes",
                    dims_out.len(),
                    dtypes.len()
                ),
            });
        }
        let ndimblk = dims_blockwise.len();
        for (i, dims) in dims_out.iter().enumerate() {
            let ok = dims.len() >= ndimblk
                && dims[dims.len() - ndimblk..]
                    .iter()
                    .zip(dims_blockwise)
                    .all(|(a, b)| a == b);
            if !ok {
                return Err(CoriolisError::Dimension {
                    message: format!(
                        "the last dimensions of all output arrays (output #{}/{} has dimensions {:?}) should be the blockwise ones {:?}",
                        i + 1,
                        dims_out.len(),
                        dims,
                        dims_blockwise
                    ),
                });
            }
        }
        // all outputs are stacked through the largest declared dtype
        let dtype_coerce = dtypes
            .iter()
            .copied()
            .max_by_key(|d| d.item_size())
            .ok_or_else(|| CoriolisError::Dimension {
                message: "at least one output must be declared".to_string(),
            })?;
        Ok(Self {
            func,
            dims_blockwise: dims_blockwise.iter().map(|d| d.to_string()).collect(),
            dims_out: dims_out
                .iter()
                .map(|dims| dims.iter().map(|d| d.to_string()).collect())
                .collect(),
            dtypes: dtypes.to_vec(),
            dtype_coerce,
        })
    }

    /// The common dtype every output is coerced to for stacking.
    pub fn dtype_coerce(&self) -> Dtype {
        self.dtype_coerce
    }

    /// Run the kernel over every chunk and return one array per declared
    /// output, in declaration order.
    pub fn call(&self, inputs: &[&DataArray]) -> Result<Vec<DataArray>> {
        let started = Instant::now();
        let ndimblk = self.dims_blockwise.len();

        if inputs.is_empty() {
            return Err(CoriolisError::InvalidParameter {
                param: "inputs".to_string(),
                message: "at least one input array is required".to_string(),
            });
        }

        // collect every dimension's extent, checking consistency by name
        let mut dim_sizes: Vec<(String, usize)> = Vec::new();
        for input in inputs {
            for (dim, &size) in input.dims().iter().zip(input.shape()) {
                if let Some(pos) = dim_sizes.iter().position(|(name, _)| name == dim) {
                    if dim_sizes[pos].1 != size {
                        return Err(CoriolisError::Dimension {
                            message: format!(
                                "dimension {} has size {} in one input and {} in another",
                                dim, size, dim_sizes[pos].1
                            ),
                        });
                    }
                } else {
                    dim_sizes.push((dim.clone(), size));
                }
            }
        }
        let dim_size = |name: &str| -> Result<usize> {
            dim_sizes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, s)| *s)
                .ok_or_else(|| CoriolisError::Dimension {
                    message: format!("output dimension {} does not appear in any input", name),
                })
        };

        // the trailing dimensions of every input must be the blockwise ones,
        // chunked; everything in front must be a single block
        for input in inputs {
            let dims = input.dims();
            let ok = dims.len() >= ndimblk
                && dims[dims.len() - ndimblk..]
                    .iter()
                    .zip(&self.dims_blockwise)
                    .all(|(a, b)| a == b);
            if !ok {
                return Err(CoriolisError::Dimension {
                    message: format!(
                        "expected blockwise dimensions to be {:?}, but found {:?}",
                        self.dims_blockwise, dims
                    ),
                });
            }
            let lead = dims.len() - ndimblk;
            for axis in 0..lead {
                if !input.chunks().is_single_block(axis) {
                    return Err(CoriolisError::Chunking {
                        message: format!(
                            "found a chunked non-blockwise dimension: {}",
                            dims[axis]
                        ),
                    });
                }
            }
            for axis in lead..dims.len() {
                if input.chunks().is_single_block(axis) {
                    return Err(CoriolisError::Chunking {
                        message: format!(
                            "found a non-chunked blockwise dimension: {}",
                            dims[axis]
                        ),
                    });
                }
            }
        }

        // chunk boundaries over the blockwise dimensions are shared state:
        // they must agree across inputs
        let first = inputs[0];
        let first_lead = first.ndim() - ndimblk;
        let blk_grid: Vec<Vec<usize>> = (0..ndimblk)
            .map(|k| first.chunks().sizes(first_lead + k).to_vec())
            .collect();
        for input in &inputs[1..] {
            let lead = input.ndim() - ndimblk;
            for k in 0..ndimblk {
                if input.chunks().sizes(lead + k) != blk_grid[k] {
                    return Err(CoriolisError::Chunking {
                        message: format!(
                            "chunk boundaries over blockwise dimension {} differ between inputs",
                            self.dims_blockwise[k]
                        ),
                    });
                }
            }
        }

        // stacked extent contributed by each output
        let mut sizes_stacked = Vec::with_capacity(self.dims_out.len());
        for dims in &self.dims_out {
            let mut s = 1usize;
            for dim in &dims[..dims.len() - ndimblk] {
                s *= dim_size(dim)?;
            }
            sizes_stacked.push(s);
        }
        let total_stacked: usize = sizes_stacked.iter().sum();

        let blk_shape: Vec<usize> = (0..ndimblk)
            .map(|k| blk_grid[k].iter().sum())
            .collect();
        let chunk_list = cartesian(
            &(0..ndimblk)
                .map(|k| first.chunks().ranges(first_lead + k))
                .collect::<Vec<_>>(),
        );
        debug!(
            chunks = chunk_list.len(),
            outputs = self.dims_out.len(),
            stacked = total_stacked,
            "dispatching blockwise kernel"
        );

        // one kernel invocation per chunk, in parallel
        let blocks: Vec<(Vec<Range<usize>>, ArrayValue)> = chunk_list
            .into_par_iter()
            .map(|chunk| {
                let mut slabs = Vec::with_capacity(inputs.len());
                for input in inputs {
                    let lead = input.ndim() - ndimblk;
                    let mut key = Sel::full_key(lead);
                    key.extend(
                        chunk
                            .iter()
                            .map(|r| Sel::range(r.start as isize, r.end as isize)),
                    );
                    slabs.push(input.read(&key)?);
                }
                let chunk_shape: Vec<usize> = chunk.iter().map(|r| r.len()).collect();
                let stacked = self.run(&slabs, &chunk_shape)?;
                Ok((chunk, stacked))
            })
            .collect::<Result<Vec<_>>>()?;

        // assemble the stacked buffer
        let mut full_shape = vec![total_stacked];
        full_shape.extend_from_slice(&blk_shape);
        let mut stacked = ArrayValue::zeros(self.dtype_coerce, &full_shape);
        for (chunk, block) in blocks {
            let mut region = vec![0..total_stacked];
            region.extend(chunk);
            stacked.assign_region(&region, &block)?;
        }

        // unstack: slice the synthetic axis apart and restore each output
        let mut outputs = Vec::with_capacity(self.dims_out.len());
        let mut pos = 0usize;
        for (i, dims) in self.dims_out.iter().enumerate() {
            let s = sizes_stacked[i];
            let part = stacked.slice_axis0(pos..pos + s);
            let restored = coerce_dtype(&part, self.dtypes[i])?;
            let mut shape = Vec::with_capacity(dims.len());
            for dim in dims {
                shape.push(dim_size(dim)?);
            }
            let values = restored.reshape(&shape)?;

            // outputs keep the input chunking over the blockwise dims and a
            // single block elsewhere
            let lead = dims.len() - ndimblk;
            let mut chunk_sizes: Vec<Vec<usize>> =
                shape[..lead].iter().map(|&len| vec![len]).collect();
            chunk_sizes.extend(blk_grid.iter().cloned());
            let grid = ChunkGrid::from_sizes(chunk_sizes)?;
            outputs.push(DataArray::from_parts(
                Arc::new(ReferenceArray::new(values)),
                dims.clone(),
                grid,
            ));
            pos += s;
        }
        debug!(
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "blockwise dispatch complete"
        );
        Ok(outputs)
    }

    /// Like [`call`](Self::call), for computations declaring one output.
    pub fn call1(&self, inputs: &[&DataArray]) -> Result<DataArray> {
        if self.dims_out.len() != 1 {
            return Err(CoriolisError::Output {
                message: format!(
                    "call1 requires a single declared output, found {}",
                    self.dims_out.len()
                ),
            });
        }
        let mut outputs = self.call(inputs)?;
        Ok(outputs.remove(0))
    }

    /// The per-chunk wrapper around the kernel: validate the outputs, then
    /// coerce and stack them into one buffer of the common dtype.
    fn run(&self, args: &[ArrayValue], chunk_shape: &[usize]) -> Result<ArrayValue> {
        let res = (self.func)(args)?;
        if res.len() != self.dtypes.len() {
            return Err(CoriolisError::Output {
                message: format!("expected {} outputs, received {}", self.dtypes.len(), res.len()),
            });
        }
        let ndimblk = self.dims_blockwise.len();
        let blk_len: usize = chunk_shape.iter().product();
        let mut parts = Vec::with_capacity(res.len());
        for (i, r) in res.iter().enumerate() {
            if r.dtype() != self.dtypes[i] {
                return Err(CoriolisError::Output {
                    message: format!(
                        "output {}/{}: expected dtype {} but received {}",
                        i + 1,
                        res.len(),
                        self.dtypes[i],
                        r.dtype()
                    ),
                });
            }
            let shape = r.shape();
            if shape.len() < ndimblk || shape[shape.len() - ndimblk..] != chunk_shape[..] {
                return Err(CoriolisError::Output {
                    message: format!(
                        "output {}/{}: expected trailing shape {:?}, received {:?}",
                        i + 1,
                        res.len(),
                        chunk_shape,
                        shape
                    ),
                });
            }
            let mut new_shape = vec![r.len() / blk_len];
            new_shape.extend_from_slice(chunk_shape);
            let coerced = coerce_dtype(r, self.dtype_coerce)?;
            parts.push(coerced.reshape(&new_shape)?);
        }
        ArrayValue::concatenate(&parts)
    }
}

/// Cartesian product of per-dimension chunk ranges.
fn cartesian(per_dim: &[Vec<Range<usize>>]) -> Vec<Vec<Range<usize>>> {
    let mut out: Vec<Vec<Range<usize>>> = vec![Vec::new()];
    for ranges in per_dim {
        let mut next = Vec::with_capacity(out.len() * ranges.len());
        for prefix in &out {
            for r in ranges {
                let mut item = prefix.clone();
                item.push(r.clone());
                next.push(item);
            }
        }
        out = next;
    }
    out
}
