//! Index-broadcast gather.
//!
//! The standard remote-sensing pattern: a per-detector calibration table
//! (e.g. central wavelength per band and detector) must be expanded to the
//! full pixel grid through a per-pixel detector-index map. [`AtIndex`]
//! replaces one named dimension of the lookup array with the dimensions of
//! an integer index array, gathering lazily on every read.

use std::sync::Arc;

use ndarray::{ArrayD, IxDyn};

use crate::array::ArrayLike;
use crate::dtype::{ArrayValue, Dtype};
use crate::error::{CoriolisError, Result};
use crate::selection::{resolve_key, AxisSel, ResolvedKey, Sel};

/// Use an integer index array to gather from a lookup array along one named
/// dimension, broadcasting the remaining dimensions.
pub struct AtIndex {
    lookup: ArrayValue,
    idx: Arc<dyn ArrayLike>,
    /// Position of the indexed dimension within the lookup array.
    axis: usize,
    idx_ndim: usize,
    dims: Vec<String>,
    shape: Vec<usize>,
}

impl AtIndex {
    /// `lookup` with dims `lookup_dims`, indexed along `index_dim` by the
    /// integer array `idx` with dims `idx_dims`.
    pub fn new(
        lookup: ArrayValue,
        lookup_dims: &[&str],
        idx: Arc<dyn ArrayLike>,
        idx_dims: &[&str],
        index_dim: &str,
    ) -> Result<Self> {
        if lookup_dims.len() != lookup.ndim() {
            return Err(CoriolisError::Dimension {
                message: format!(
                    "{} dimension names given for a lookup array with {} dimensions",
                    lookup_dims.len(),
                    lookup.ndim()
                ),
            });
        }
        if idx_dims.len() != idx.ndim() {
            return Err(CoriolisError::Dimension {
                message: format!(
                    "{} dimension names given for an index array with {} dimensions",
                    idx_dims.len(),
                    idx.ndim()
                ),
            });
        }
        if !idx.dtype().is_integer() {
            return Err(CoriolisError::TypeMismatch {
                expected: Dtype::I64,
                got: idx.dtype(),
            });
        }
        let axis = lookup_dims
            .iter()
            .position(|d| *d == index_dim)
            .ok_or_else(|| CoriolisError::Dimension {
                message: format!("indexed dimension {} is not among the lookup dims", index_dim),
            })?;

        // substitute the index array's dims at the indexed position
        let mut dims = Vec::with_capacity(lookup.ndim() + idx.ndim() - 1);
        let mut shape = Vec::with_capacity(dims.capacity());
        for (i, name) in lookup_dims.iter().enumerate() {
            if i == axis {
                dims.extend(idx_dims.iter().map(|d| d.to_string()));
                shape.extend_from_slice(idx.shape());
            } else {
                dims.push(name.to_string());
                shape.push(lookup.shape()[i]);
            }
        }
        let idx_ndim = idx.ndim();
        Ok(Self {
            lookup,
            idx,
            axis,
            idx_ndim,
            dims,
            shape,
        })
    }

    /// The broadcasted dimension names.
    pub fn dims(&self) -> &[String] {
        &self.dims
    }
}

impl ArrayLike for AtIndex {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn dtype(&self) -> Dtype {
        self.lookup.dtype()
    }

    fn read(&self, key: &[Sel]) -> Result<ArrayValue> {
        // resolve against the broadcasted shape first so errors carry the
        // caller's coordinates
        resolve_key(key, &self.shape)?;

        // slice the index array with its own key positions and realize it
        let idx_key = &key[self.axis..self.axis + self.idx_ndim];
        let indices = self.idx.read(idx_key)?.to_indices()?;

        let extent = self.lookup.shape()[self.axis];
        for &v in indices.iter() {
            if v < 0 || v >= extent as i64 {
                return Err(CoriolisError::IndexOutOfBounds {
                    message: format!(
                        "index {} is out of bounds for the indexed dimension of length {}",
                        v, extent
                    ),
                });
            }
        }

        // the remaining key positions apply to the lookup array directly
        let lead = resolve_key(
            &key[..self.axis],
            &self.lookup.shape()[..self.axis],
        )?;
        let trail = resolve_key(
            &key[self.axis + self.idx_ndim..],
            &self.lookup.shape()[self.axis + 1..],
        )?;

        macro_rules! gather_as {
            ($variant:ident) => {{
                match &self.lookup {
                    ArrayValue::$variant(a) => {
                        ArrayValue::$variant(gather_at(a, &lead, &indices, &trail))
                    }
                    _ => unreachable!("dtype dispatch is exhaustive"),
                }
            }};
        }
        Ok(match self.lookup.dtype() {
            Dtype::U8 => gather_as!(U8),
            Dtype::I8 => gather_as!(I8),
            Dtype::U16 => gather_as!(U16),
            Dtype::I16 => gather_as!(I16),
            Dtype::U32 => gather_as!(U32),
            Dtype::I32 => gather_as!(I32),
            Dtype::U64 => gather_as!(U64),
            Dtype::I64 => gather_as!(I64),
            Dtype::F32 => gather_as!(F32),
            Dtype::F64 => gather_as!(F64),
        })
    }
}

/// Gather from `a`, replacing the indexed axis with the realized index block.
fn gather_at<T: Clone>(
    a: &ArrayD<T>,
    lead: &ResolvedKey,
    indices: &ArrayD<i64>,
    trail: &ResolvedKey,
) -> ArrayD<T> {
    let lead_shape = lead.out_shape();
    let idx_shape = indices.shape().to_vec();
    let trail_shape = trail.out_shape();

    let mut out_shape = lead_shape.clone();
    out_shape.extend_from_slice(&idx_shape);
    out_shape.extend_from_slice(&trail_shape);

    let lead_kept: Vec<usize> = kept_axes(lead);
    let trail_kept: Vec<usize> = kept_axes(trail);

    ArrayD::from_shape_fn(IxDyn(&out_shape), |out_idx| {
        let mut src = Vec::with_capacity(a.ndim());
        // leading lookup axes
        let mut kept_pos = 0;
        for sel in lead.axes.iter() {
            match sel {
                AxisSel::At(j) => src.push(*j),
                AxisSel::Span { .. } => {
                    src.push(sel.index(out_idx[lead_kept[kept_pos]]));
                    kept_pos += 1;
                }
            }
        }
        // the indexed axis, realized through the index block
        let mut idx_pos = Vec::with_capacity(idx_shape.len());
        for k in 0..idx_shape.len() {
            idx_pos.push(out_idx[lead_shape.len() + k]);
        }
        src.push(indices[IxDyn(&idx_pos)] as usize);
        // trailing lookup axes
        let mut kept_pos = 0;
        let base = lead_shape.len() + idx_shape.len();
        for sel in trail.axes.iter() {
            match sel {
                AxisSel::At(j) => src.push(*j),
                AxisSel::Span { .. } => {
                    src.push(sel.index(out_idx[base + trail_kept[kept_pos]]));
                    kept_pos += 1;
                }
            }
        }
        a[IxDyn(&src)].clone()
    })
}

/// Output positions (relative to this key's block) of the kept axes.
fn kept_axes(key: &ResolvedKey) -> Vec<usize> {
    let mut out = Vec::new();
    let mut pos = 0;
    for sel in &key.axes {
        if let AxisSel::Span { .. } = sel {
            out.push(pos);
            pos += 1;
        }
    }
    out
}
