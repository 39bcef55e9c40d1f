//! Slice and index resolution with NumPy basic-indexing semantics.
//!
//! Adapters receive one [`Sel`] per dimension. Slices carry optional,
//! possibly negative bounds and a nonzero step; they are resolved against a
//! dimension length exactly like Python's `slice.indices`, clamping
//! out-of-range bounds instead of failing. Integer keys remove their axis
//! from the result and are bounds-checked.

use crate::error::{CoriolisError, Result};

/// A per-axis selection key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sel {
    /// Select a single position (negative counts from the end); the axis is
    /// removed from the result.
    Index(isize),
    /// Select a range of positions; the axis is kept.
    Slice(Slice),
}

impl Sel {
    /// The full extent of an axis.
    pub fn full() -> Self {
        Sel::Slice(Slice::full())
    }

    /// `start..stop` with step 1.
    pub fn range(start: isize, stop: isize) -> Self {
        Sel::Slice(Slice::new(Some(start), Some(stop), 1))
    }

    /// A fully specified slice.
    pub fn stepped(start: Option<isize>, stop: Option<isize>, step: isize) -> Self {
        Sel::Slice(Slice::new(start, stop, step))
    }

    /// A single position.
    pub fn at(index: isize) -> Self {
        Sel::Index(index)
    }

    /// One full-extent selection per dimension.
    pub fn full_key(ndim: usize) -> Vec<Sel> {
        vec![Sel::full(); ndim]
    }
}

/// An unresolved slice: optional signed bounds plus a nonzero step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: isize,
}

impl Slice {
    pub fn new(start: Option<isize>, stop: Option<isize>, step: isize) -> Self {
        Self { start, stop, step }
    }

    pub fn full() -> Self {
        Self {
            start: None,
            stop: None,
            step: 1,
        }
    }

    /// Resolve against an axis of length `len`, following Python's
    /// `slice.indices`: negative bounds wrap once, anything out of range is
    /// clamped, and the resulting index set is `start + k*step` for
    /// `k in 0..count`.
    pub fn resolve(&self, len: usize) -> Result<(isize, usize, isize)> {
        if self.step == 0 {
            return Err(CoriolisError::InvalidParameter {
                param: "step".to_string(),
                message: "slice step cannot be zero".to_string(),
            });
        }
        let len = len as isize;
        let step = self.step;
        let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };

        let mut start = match self.start {
            Some(s) => {
                let mut s = s;
                if s < 0 {
                    s += len;
                }
                s.clamp(lower, upper)
            }
            None => {
                if step > 0 {
                    0
                } else {
                    len - 1
                }
            }
        };
        let stop = match self.stop {
            Some(s) => {
                let mut s = s;
                if s < 0 {
                    s += len;
                }
                s.clamp(lower, upper)
            }
            None => {
                if step > 0 {
                    len
                } else {
                    -1
                }
            }
        };

        let count = if step > 0 {
            if stop > start {
                ((stop - start - 1) / step + 1) as usize
            } else {
                0
            }
        } else if start > stop {
            ((start - stop - 1) / (-step) + 1) as usize
        } else {
            0
        };
        if count == 0 {
            start = 0;
        }
        Ok((start, count, step))
    }
}

/// A selection resolved against a concrete shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    pub axes: Vec<AxisSel>,
}

/// One resolved axis of a [`ResolvedKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSel {
    /// Single position; the axis is dropped from the output.
    At(usize),
    /// `start + k*step` for `k in 0..count`; the axis is kept.
    Span {
        start: isize,
        count: usize,
        step: isize,
    },
}

impl AxisSel {
    /// Source index of output position `k` along this axis.
    pub fn index(&self, k: usize) -> usize {
        match *self {
            AxisSel::At(i) => i,
            AxisSel::Span { start, step, .. } => (start + k as isize * step) as usize,
        }
    }

    /// The dense half-open range covering every selected position.
    pub fn bounding(&self) -> std::ops::Range<usize> {
        match *self {
            AxisSel::At(i) => i..i + 1,
            AxisSel::Span { count: 0, .. } => 0..0,
            AxisSel::Span { start, count, step } => {
                let last = start + (count as isize - 1) * step;
                let lo = start.min(last) as usize;
                let hi = start.max(last) as usize;
                lo..hi + 1
            }
        }
    }
}

impl ResolvedKey {
    /// Shape of the selected block (axes selected by `At` are dropped).
    pub fn out_shape(&self) -> Vec<usize> {
        self.axes
            .iter()
            .filter_map(|axis| match axis {
                AxisSel::At(_) => None,
                AxisSel::Span { count, .. } => Some(*count),
            })
            .collect()
    }

    /// Per-axis dense bounding ranges (one per input axis).
    pub fn bounding(&self) -> Vec<std::ops::Range<usize>> {
        self.axes.iter().map(|axis| axis.bounding()).collect()
    }

    /// Translate every axis into the coordinates of a slab whose origin is
    /// `origins` (used after reading a dense bounding box).
    pub fn rebase(&self, origins: &[usize]) -> ResolvedKey {
        let axes = self
            .axes
            .iter()
            .zip(origins)
            .map(|(axis, &origin)| match *axis {
                AxisSel::At(i) => AxisSel::At(i - origin),
                AxisSel::Span { start, count, step } => AxisSel::Span {
                    start: start - origin as isize,
                    count,
                    step,
                },
            })
            .collect();
        ResolvedKey { axes }
    }
}

/// Resolve a full key (one [`Sel`] per dimension) against a shape.
pub fn resolve_key(key: &[Sel], shape: &[usize]) -> Result<ResolvedKey> {
    if key.len() != shape.len() {
        return Err(CoriolisError::Dimension {
            message: format!(
                "selection has {} entries but the array has {} dimensions",
                key.len(),
                shape.len()
            ),
        });
    }
    let mut axes = Vec::with_capacity(key.len());
    for (sel, &len) in key.iter().zip(shape) {
        match sel {
            Sel::Index(i) => {
                let j = if *i < 0 { i + len as isize } else { *i };
                if j < 0 || j >= len as isize {
                    return Err(CoriolisError::IndexOutOfBounds {
                        message: format!("index {} is out of bounds for axis of length {}", i, len),
                    });
                }
                axes.push(AxisSel::At(j as usize));
            }
            Sel::Slice(s) => {
                let (start, count, step) = s.resolve(len)?;
                axes.push(AxisSel::Span { start, count, step });
            }
        }
    }
    Ok(ResolvedKey { axes })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(key: Sel, len: usize) -> (isize, usize, isize) {
        match resolve_key(&[key], &[len]).unwrap().axes[0] {
            AxisSel::Span { start, count, step } => (start, count, step),
            AxisSel::At(_) => panic!("expected a span"),
        }
    }

    #[test]
    fn test_full_slice() {
        assert_eq!(span(Sel::full(), 10), (0, 10, 1));
    }

    #[test]
    fn test_clamping() {
        // stop beyond the axis length clamps, like NumPy
        assert_eq!(span(Sel::range(2, 100), 10), (2, 8, 1));
        assert_eq!(span(Sel::range(-100, 5), 10), (0, 5, 1));
    }

    #[test]
    fn test_negative_bounds() {
        assert_eq!(span(Sel::range(2, -2), 10), (2, 6, 1));
        assert_eq!(span(Sel::range(-3, 10), 10), (7, 3, 1));
    }

    #[test]
    fn test_stepped() {
        assert_eq!(span(Sel::stepped(Some(2), None, 3), 10), (2, 3, 3));
        assert_eq!(span(Sel::stepped(Some(2), Some(-2), 3), 10), (2, 2, 3));
        assert_eq!(span(Sel::stepped(Some(4), Some(-2), 6), 10), (4, 1, 6));
    }

    #[test]
    fn test_negative_step() {
        assert_eq!(span(Sel::stepped(None, None, -1), 5), (4, 5, -1));
        assert_eq!(span(Sel::stepped(Some(8), Some(2), -2), 10), (8, 3, -2));
    }

    #[test]
    fn test_empty_slice() {
        assert_eq!(span(Sel::range(5, 2), 10).1, 0);
        assert_eq!(span(Sel::range(3, 3), 10).1, 0);
    }

    #[test]
    fn test_index_resolution() {
        let key = resolve_key(&[Sel::at(-1)], &[10]).unwrap();
        assert_eq!(key.axes[0], AxisSel::At(9));
        assert!(resolve_key(&[Sel::at(10)], &[10]).is_err());
        assert!(resolve_key(&[Sel::at(-11)], &[10]).is_err());
    }

    #[test]
    fn test_zero_step_rejected() {
        assert!(resolve_key(&[Sel::stepped(None, None, 0)], &[10]).is_err());
    }

    #[test]
    fn test_key_length_mismatch() {
        assert!(resolve_key(&[Sel::full()], &[10, 10]).is_err());
    }

    #[test]
    fn test_bounding() {
        let key = resolve_key(&[Sel::stepped(Some(8), Some(2), -2)], &[10]).unwrap();
        assert_eq!(key.bounding(), vec![4..9]);
        assert_eq!(key.out_shape(), vec![3]);
    }

    #[test]
    fn test_rebase() {
        let key = resolve_key(&[Sel::range(4, 8)], &[10]).unwrap();
        let rebased = key.rebase(&[4]);
        assert_eq!(
            rebased.axes[0],
            AxisSel::Span {
                start: 0,
                count: 4,
                step: 1
            }
        );
    }
}
