//! Quantized heightmap tiles from elevation rasters.
//!
//! A source elevation raster is resampled onto a target grid (given by an
//! extent or a cutline polygon), optionally padded with a constant border,
//! and linearly rescaled into a UInt16 GeoTIFF whose values span
//! `[8192, 65533]`.

pub mod cutline;
pub mod error;
pub mod heightmap;
pub mod raster;
pub mod request;

pub use error::{HeightmapError, Result};
pub use heightmap::{generate, PipelineOptions};
pub use request::{HeightmapRequest, Mode};
