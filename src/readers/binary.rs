//! Flat-binary raster windows and radiometric scaling.
//!
//! [`FlatBinaryReader`] reads windows of a headerless (or fixed-offset)
//! row-major binary raster. The file is opened on every call: chunked
//! execution reads concurrently from worker threads, and a shared seek
//! cursor would race. Backends like this cannot stride, so a read fetches
//! the dense bounding box and applies the step in memory.
//!
//! [`ScaledReader`] wraps any adapter with the `slope * x + offset`
//! calibration common to level-1 products, yielding a float dtype.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::array::ArrayLike;
use crate::dtype::{ArrayValue, Dtype};
use crate::error::{CoriolisError, Result};
use crate::selection::{resolve_key, Sel};

/// A lazy window reader over a row-major flat binary file.
pub struct FlatBinaryReader {
    path: PathBuf,
    offset: u64,
    shape: Vec<usize>,
    dtype: Dtype,
}

impl FlatBinaryReader {
    /// `offset` is the number of header bytes to skip.
    pub fn new(path: &Path, shape: &[usize], dtype: Dtype, offset: u64) -> Result<Self> {
        if shape.is_empty() {
            return Err(CoriolisError::Dimension {
                message: "a flat binary raster needs at least one dimension".to_string(),
            });
        }
        let expected = shape.iter().product::<usize>() as u64 * dtype.item_size() as u64;
        let meta = std::fs::metadata(path)?;
        if meta.len() < offset + expected {
            return Err(CoriolisError::DataNotFound {
                message: format!(
                    "{} holds {} bytes but {} are required for shape {:?} of {}",
                    path.display(),
                    meta.len(),
                    offset + expected,
                    shape,
                    dtype
                ),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
            offset,
            shape: shape.to_vec(),
            dtype,
        })
    }

    /// Row-major strides, in elements.
    fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1usize; self.shape.len()];
        for i in (0..self.shape.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.shape[i + 1];
        }
        strides
    }
}

impl ArrayLike for FlatBinaryReader {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn dtype(&self) -> Dtype {
        self.dtype
    }

    fn read(&self, key: &[Sel]) -> Result<ArrayValue> {
        let resolved = resolve_key(key, &self.shape)?;
        let bounds = resolved.bounding();
        let slab_shape: Vec<usize> = bounds.iter().map(|b| b.len()).collect();
        let item = self.dtype.item_size();
        let strides = self.strides();

        // the file handle is opened per call, never shared across reads
        let mut file = File::open(&self.path)?;
        let mut bytes = vec![0u8; slab_shape.iter().product::<usize>() * item];

        // contiguous runs along the last axis, one seek+read per run
        let last = self.shape.len() - 1;
        let run_len = slab_shape[last] * item;
        let lead_shape = &slab_shape[..last];
        let nruns: usize = lead_shape.iter().product();
        let mut pos = vec![0usize; last];
        for run in 0..nruns {
            let mut elem = bounds[last].start;
            for (axis, &p) in pos.iter().enumerate() {
                elem += (bounds[axis].start + p) * strides[axis];
            }
            file.seek(SeekFrom::Start(self.offset + (elem * item) as u64))?;
            file.read_exact(&mut bytes[run * run_len..(run + 1) * run_len])?;
            // odometer over the leading slab axes
            for axis in (0..last).rev() {
                pos[axis] += 1;
                if pos[axis] < lead_shape[axis] {
                    break;
                }
                pos[axis] = 0;
            }
        }

        let slab = ArrayValue::from_bytes(self.dtype, &slab_shape, &bytes)?;
        let origins: Vec<usize> = bounds.iter().map(|b| b.start).collect();
        slab.gather(&resolved.rebase(&origins))
    }
}

/// Lazy `slope * x + offset` radiometric calibration of another adapter.
pub struct ScaledReader {
    inner: Arc<dyn ArrayLike>,
    slope: f64,
    offset: f64,
    dtype: Dtype,
}

impl ScaledReader {
    /// `dtype` selects the float precision of the calibrated values.
    pub fn new(inner: Arc<dyn ArrayLike>, slope: f64, offset: f64, dtype: Dtype) -> Result<Self> {
        if !matches!(dtype, Dtype::F32 | Dtype::F64) {
            return Err(CoriolisError::InvalidParameter {
                param: "dtype".to_string(),
                message: format!("calibrated values must be float32 or float64, got {}", dtype),
            });
        }
        Ok(Self {
            inner,
            slope,
            offset,
            dtype,
        })
    }
}

impl ArrayLike for ScaledReader {
    fn shape(&self) -> &[usize] {
        self.inner.shape()
    }

    fn dtype(&self) -> Dtype {
        self.dtype
    }

    fn read(&self, key: &[Sel]) -> Result<ArrayValue> {
        let raw = self.inner.read(key)?;
        let scaled = raw.to_f64().mapv(|v| self.slope * v + self.offset);
        Ok(match self.dtype {
            Dtype::F32 => ArrayValue::F32(scaled.mapv(|v| v as f32)),
            _ => ArrayValue::F64(scaled),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_raster(dir: &Path, header: &[u8]) -> PathBuf {
        let path = dir.join("band.dat");
        let mut file = File::create(&path).unwrap();
        file.write_all(header).unwrap();
        let values: Vec<i16> = (0..24).collect();
        for v in &values {
            file.write_all(&v.to_le_bytes()).unwrap();
        }
        path
    }

    #[test]
    fn test_window_read() {
        let dir = tempdir().unwrap();
        let path = write_raster(dir.path(), &[]);
        let reader = FlatBinaryReader::new(&path, &[4, 6], Dtype::I16, 0).unwrap();

        let full = reader.read_full().unwrap();
        assert_eq!(full.shape(), &[4, 6]);
        assert_eq!(full.as_i16().unwrap()[[3, 5]], 23);

        let window = reader.read(&[Sel::range(1, 3), Sel::range(2, 5)]).unwrap();
        let arr = window.as_i16().unwrap();
        assert_eq!(arr.shape(), &[2, 3]);
        assert_eq!(arr[[0, 0]], 8);
        assert_eq!(arr[[1, 2]], 16);
    }

    #[test]
    fn test_header_offset() {
        let dir = tempdir().unwrap();
        let path = write_raster(dir.path(), &[0xAB; 10]);
        let reader = FlatBinaryReader::new(&path, &[4, 6], Dtype::I16, 10).unwrap();
        let v = reader.read(&[Sel::at(0), Sel::at(0)]).unwrap();
        assert_eq!(v.as_i16().unwrap()[IxDyn(&[])], 0);
    }

    #[test]
    fn test_step_applied_in_memory() {
        let dir = tempdir().unwrap();
        let path = write_raster(dir.path(), &[]);
        let reader = FlatBinaryReader::new(&path, &[4, 6], Dtype::I16, 0).unwrap();
        let strided = reader
            .read(&[Sel::stepped(None, None, 2), Sel::stepped(Some(1), None, 3)])
            .unwrap();
        let arr = strided.as_i16().unwrap();
        assert_eq!(arr.shape(), &[2, 2]);
        assert_eq!(arr[[0, 0]], 1);
        assert_eq!(arr[[0, 1]], 4);
        assert_eq!(arr[[1, 0]], 13);
    }

    #[test]
    fn test_short_file_rejected() {
        let dir = tempdir().unwrap();
        let path = write_raster(dir.path(), &[]);
        assert!(FlatBinaryReader::new(&path, &[10, 10], Dtype::I16, 0).is_err());
    }

    #[test]
    fn test_scaled_reader() {
        let dir = tempdir().unwrap();
        let path = write_raster(dir.path(), &[]);
        let raw = Arc::new(FlatBinaryReader::new(&path, &[4, 6], Dtype::I16, 0).unwrap());
        let toa = ScaledReader::new(raw, 2.0e-5, -0.1, Dtype::F64).unwrap();
        assert_eq!(toa.dtype(), Dtype::F64);
        let v = toa.read(&[Sel::at(0), Sel::at(2)]).unwrap();
        let got = v.as_f64().unwrap()[IxDyn(&[])];
        assert!((got - (2.0e-5 * 2.0 - 0.1)).abs() < 1e-12);
    }

    #[test]
    fn test_scaled_reader_requires_float() {
        let dir = tempdir().unwrap();
        let path = write_raster(dir.path(), &[]);
        let raw = Arc::new(FlatBinaryReader::new(&path, &[4, 6], Dtype::I16, 0).unwrap());
        assert!(ScaledReader::new(raw, 1.0, 0.0, Dtype::U16).is_err());
    }
}
