//! # coriolis
//!
//! Lazy chunked-array readers and blockwise processing for Earth-observation
//! rasters.
//!
//! This library normalizes heterogeneous satellite raster sources into a
//! common labeled-array representation and processes them out-of-core: file
//! windows, tie-point geometry grids, per-detector calibration tables and
//! resolution mismatches all become lazy arrays that read on demand, and a
//! chunk-parallel dispatcher applies pure functions over them without ever
//! materializing a full scene in memory.
//!
//! ## Key Features
//!
//! - **Lazy window reads**: every source implements one small [`ArrayLike`]
//!   contract with NumPy-style slicing, safe under concurrent chunk reads
//! - **Tie-point interpolation**: bilinear or nearest upsampling of coarse
//!   geometry grids to full pixel resolution
//! - **Blockwise dispatch**: multi-input, multi-output, multi-dtype kernels
//!   run chunk-parallel through a single stacked buffer
//!
//! ## Architecture
//!
//! - **Adapter Layer**: [`ArrayLike`] implementations over files, transforms
//!   and in-memory arrays
//! - **Data Layer**: labeled chunked [`DataArray`]s collected in
//!   [`Dataset`]s
//! - **Processing**: the [`Blockwise`] dispatcher with lossless dtype
//!   coercion for heterogeneous outputs

pub mod array;
pub mod at_index;
pub mod blockwise;
pub mod chunks;
pub mod coerce;
pub mod config;
pub mod dataarray;
pub mod dataset;
pub mod dtype;
pub mod error;
pub mod flags;
pub mod interpolation;
pub mod logging;
pub mod readers;
pub mod repeat;
pub mod selection;

pub use array::{ArrayLike, ReferenceArray};
pub use at_index::AtIndex;
pub use blockwise::Blockwise;
pub use chunks::{Chunk, ChunkGrid};
pub use coerce::coerce_dtype;
pub use config::{Args, ChunkConfig, Config};
pub use dataarray::DataArray;
pub use dataset::{AttributeValue, Dataset};
pub use dtype::{ArrayValue, Attrs, Dtype};
pub use error::{CoriolisError, Result};
pub use interpolation::{InterpMethod, TiePointGrid};
pub use logging::{init_tracing, log_error, log_timed_operation};
pub use repeat::Repeat;
pub use selection::{Sel, Slice};
