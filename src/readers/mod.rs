//! File-backed and derived array adapters.
//!
//! These adapters turn on-disk rasters and geolocation metadata into lazy
//! [`ArrayLike`](crate::ArrayLike) sources. They follow the shared-resource
//! rule of the chunked execution model: no adapter keeps an open handle
//! between calls, because reads may come from any worker thread.

pub mod binary;
pub mod geo;
#[cfg(feature = "netcdf")]
pub mod netcdf;

pub use binary::{FlatBinaryReader, ScaledReader};
pub use geo::{AffineGrid, GeoAxis};
#[cfg(feature = "netcdf")]
pub use netcdf::{open_dataset, NetcdfVariable};
