//! Integer nearest-neighbor upsampling.
//!
//! Expands an array by per-dimension replication factors, e.g. matching a
//! 500 m band to a 250 m grid by factor 2 on each axis. Output indices map
//! back to the source by floor division; the source is read once per call as
//! the dense bounding box of the mapped window.

use std::sync::Arc;

use ndarray::{ArrayD, IxDyn};

use crate::array::ArrayLike;
use crate::dtype::{ArrayValue, Dtype};
use crate::error::{CoriolisError, Result};
use crate::selection::{resolve_key, AxisSel, Sel};

/// Repeat elements of an array by integer factors along each dimension.
pub struct Repeat {
    inner: Arc<dyn ArrayLike>,
    repeats: Vec<usize>,
    shape: Vec<usize>,
}

/// Per-axis mapping of output positions to slab positions.
enum AxisMap {
    /// Scalar key: single slab position, axis dropped from the output.
    Scalar(usize),
    /// Kept axis: slab position for each output position.
    List(Vec<usize>),
}

impl Repeat {
    pub fn new(inner: Arc<dyn ArrayLike>, repeats: &[usize]) -> Result<Self> {
        if repeats.len() != inner.ndim() {
            return Err(CoriolisError::Dimension {
                message: format!(
                    "{} repeat factors given for an array with {} dimensions",
                    repeats.len(),
                    inner.ndim()
                ),
            });
        }
        if repeats.iter().any(|&r| r == 0) {
            return Err(CoriolisError::InvalidParameter {
                param: "repeats".to_string(),
                message: "repeat factors must be positive".to_string(),
            });
        }
        let shape = inner
            .shape()
            .iter()
            .zip(repeats)
            .map(|(&s, &r)| s * r)
            .collect();
        Ok(Self {
            inner,
            repeats: repeats.to_vec(),
            shape,
        })
    }
}

impl ArrayLike for Repeat {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn dtype(&self) -> Dtype {
        self.inner.dtype()
    }

    fn read(&self, key: &[Sel]) -> Result<ArrayValue> {
        let resolved = resolve_key(key, &self.shape)?;

        // map output indices to source indices, axis by axis
        let mut bounds = Vec::with_capacity(resolved.axes.len());
        let mut maps = Vec::with_capacity(resolved.axes.len());
        for (axis, &r) in resolved.axes.iter().zip(&self.repeats) {
            match *axis {
                AxisSel::At(i) => {
                    let src = i / r;
                    bounds.push(src..src + 1);
                    maps.push(AxisMap::Scalar(src));
                }
                AxisSel::Span { count, .. } => {
                    let src: Vec<usize> = (0..count).map(|k| axis.index(k) / r).collect();
                    let range = match (src.iter().min(), src.iter().max()) {
                        (Some(&lo), Some(&hi)) => lo..hi + 1,
                        _ => 0..0,
                    };
                    bounds.push(range);
                    maps.push(AxisMap::List(src));
                }
            }
        }

        // read the dense bounding window once, then gather in memory
        let inner_key: Vec<Sel> = bounds
            .iter()
            .map(|b| Sel::range(b.start as isize, b.end as isize))
            .collect();
        let slab = self.inner.read(&inner_key)?;

        // translate to slab coordinates
        for (map, b) in maps.iter_mut().zip(&bounds) {
            match map {
                AxisMap::Scalar(i) => *i -= b.start,
                AxisMap::List(indices) => {
                    for i in indices.iter_mut() {
                        *i -= b.start;
                    }
                }
            }
        }
        Ok(gather_mapped(&slab, &maps))
    }
}

/// Gather arbitrary per-axis index lists from a slab; scalar axes drop out.
fn gather_mapped(slab: &ArrayValue, maps: &[AxisMap]) -> ArrayValue {
    fn gather<T: Clone>(a: &ArrayD<T>, maps: &[AxisMap]) -> ArrayD<T> {
        let out_shape: Vec<usize> = maps
            .iter()
            .filter_map(|m| match m {
                AxisMap::Scalar(_) => None,
                AxisMap::List(indices) => Some(indices.len()),
            })
            .collect();
        ArrayD::from_shape_fn(IxDyn(&out_shape), |idx| {
            let mut src = Vec::with_capacity(maps.len());
            let mut k = 0;
            for map in maps {
                match map {
                    AxisMap::Scalar(i) => src.push(*i),
                    AxisMap::List(indices) => {
                        src.push(indices[idx[k]]);
                        k += 1;
                    }
                }
            }
            a[IxDyn(&src)].clone()
        })
    }

    match slab {
        ArrayValue::U8(a) => ArrayValue::U8(gather(a, maps)),
        ArrayValue::I8(a) => ArrayValue::I8(gather(a, maps)),
        ArrayValue::U16(a) => ArrayValue::U16(gather(a, maps)),
        ArrayValue::I16(a) => ArrayValue::I16(gather(a, maps)),
        ArrayValue::U32(a) => ArrayValue::U32(gather(a, maps)),
        ArrayValue::I32(a) => ArrayValue::I32(gather(a, maps)),
        ArrayValue::U64(a) => ArrayValue::U64(gather(a, maps)),
        ArrayValue::I64(a) => ArrayValue::I64(gather(a, maps)),
        ArrayValue::F32(a) => ArrayValue::F32(gather(a, maps)),
        ArrayValue::F64(a) => ArrayValue::F64(gather(a, maps)),
    }
}
