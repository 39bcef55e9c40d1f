//! Chunk partitioning of labeled arrays.
//!
//! Each dimension of a chunked array is split into one or more contiguous
//! index ranges; those ranges are the unit of parallel work. Chunk
//! boundaries over blockwise dimensions are fixed once established and must
//! match across all arrays participating in one dispatch.

use std::ops::Range;

use crate::error::{CoriolisError, Result};

/// Requested chunking for one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk {
    /// The whole dimension as a single block.
    Full,
    /// Blocks of the given size, with a shorter trailing remainder.
    Size(usize),
}

/// The materialized partition: per-dimension block lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkGrid {
    sizes: Vec<Vec<usize>>,
}

impl ChunkGrid {
    /// Build a grid from a per-dimension chunk spec.
    pub fn regular(shape: &[usize], spec: &[Chunk]) -> Result<Self> {
        if shape.len() != spec.len() {
            return Err(CoriolisError::Chunking {
                message: format!(
                    "chunk spec has {} entries but the array has {} dimensions",
                    spec.len(),
                    shape.len()
                ),
            });
        }
        let mut sizes = Vec::with_capacity(shape.len());
        for (&len, chunk) in shape.iter().zip(spec) {
            if len == 0 {
                return Err(CoriolisError::Chunking {
                    message: "cannot chunk a zero-length dimension".to_string(),
                });
            }
            match *chunk {
                Chunk::Full => sizes.push(vec![len]),
                Chunk::Size(0) => {
                    return Err(CoriolisError::Chunking {
                        message: "chunk size cannot be zero".to_string(),
                    });
                }
                Chunk::Size(c) => {
                    let mut blocks = vec![c; len / c];
                    if len % c != 0 {
                        blocks.push(len % c);
                    }
                    sizes.push(blocks);
                }
            }
        }
        Ok(Self { sizes })
    }

    /// Build a grid from explicit per-dimension block lengths.
    pub fn from_sizes(sizes: Vec<Vec<usize>>) -> Result<Self> {
        for blocks in &sizes {
            if blocks.is_empty() || blocks.iter().any(|&b| b == 0) {
                return Err(CoriolisError::Chunking {
                    message: "every dimension needs at least one non-empty block".to_string(),
                });
            }
        }
        Ok(Self { sizes })
    }

    /// One block per dimension.
    pub fn single(shape: &[usize]) -> Self {
        Self {
            sizes: shape.iter().map(|&len| vec![len]).collect(),
        }
    }

    pub fn ndim(&self) -> usize {
        self.sizes.len()
    }

    /// Total extent per dimension.
    pub fn shape(&self) -> Vec<usize> {
        self.sizes.iter().map(|blocks| blocks.iter().sum()).collect()
    }

    /// Block lengths along one dimension.
    pub fn sizes(&self, axis: usize) -> &[usize] {
        &self.sizes[axis]
    }

    pub fn nblocks(&self, axis: usize) -> usize {
        self.sizes[axis].len()
    }

    pub fn is_single_block(&self, axis: usize) -> bool {
        self.nblocks(axis) == 1
    }

    /// The contiguous index ranges along one dimension.
    pub fn ranges(&self, axis: usize) -> Vec<Range<usize>> {
        let mut out = Vec::with_capacity(self.sizes[axis].len());
        let mut start = 0;
        for &len in &self.sizes[axis] {
            out.push(start..start + len);
            start += len;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_grid() {
        let grid = ChunkGrid::regular(&[10, 7], &[Chunk::Size(4), Chunk::Full]).unwrap();
        assert_eq!(grid.sizes(0), &[4, 4, 2]);
        assert_eq!(grid.sizes(1), &[7]);
        assert_eq!(grid.shape(), vec![10, 7]);
        assert_eq!(grid.nblocks(0), 3);
        assert!(grid.is_single_block(1));
    }

    #[test]
    fn test_exact_division() {
        let grid = ChunkGrid::regular(&[8], &[Chunk::Size(4)]).unwrap();
        assert_eq!(grid.sizes(0), &[4, 4]);
    }

    #[test]
    fn test_ranges() {
        let grid = ChunkGrid::regular(&[10], &[Chunk::Size(4)]).unwrap();
        assert_eq!(grid.ranges(0), vec![0..4, 4..8, 8..10]);
    }

    #[test]
    fn test_oversized_chunk_is_single_block() {
        let grid = ChunkGrid::regular(&[3], &[Chunk::Size(100)]).unwrap();
        assert_eq!(grid.sizes(0), &[3]);
    }

    #[test]
    fn test_invalid_specs() {
        assert!(ChunkGrid::regular(&[10], &[Chunk::Size(0)]).is_err());
        assert!(ChunkGrid::regular(&[10, 10], &[Chunk::Full]).is_err());
        assert!(ChunkGrid::from_sizes(vec![vec![]]).is_err());
        assert!(ChunkGrid::from_sizes(vec![vec![3, 0]]).is_err());
    }
}
