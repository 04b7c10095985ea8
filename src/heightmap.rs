//! End-to-end heightmap generation.
//!
//! ```text
//! validate -> open source -> statistics -> warp (extent | cutline)
//!          -> [pad when margin > 0] -> quantize -> write
//! ```
//!
//! Every intermediate resource is owned by exactly one stage at a time and
//! released by scope exit: in-memory datasets on drop, transient files by
//! their [`ScratchFile`](crate::raster::scratch::ScratchFile) guard.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::error::Result;
use crate::raster::output::write_heightmap;
use crate::raster::padding::pad;
use crate::raster::quantize::{output_nodata, quantize, QuantizationParams, DST_MAX, DST_MIN};
use crate::raster::source::open_source;
use crate::raster::statistics;
use crate::raster::warp::{warp_to_cutline, warp_to_extent};
use crate::request::{HeightmapRequest, Mode};

/// Fixed parameters of the output encoding.
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub dst_min: u16,
    pub dst_max: u16,
    /// Decimal places kept from the source statistics.
    pub stats_precision: u32,
    /// Value written into the padding border.
    pub pad_fill: f64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            dst_min: DST_MIN,
            dst_max: DST_MAX,
            stats_precision: 3,
            pad_fill: 0.0,
        }
    }
}

/// Run the whole pipeline for one request and return the written path.
pub fn generate(request: &HeightmapRequest, options: &PipelineOptions) -> Result<PathBuf> {
    info!(
        inputs = request.in_raster.len(),
        mode = request.mode.name(),
        width = request.size.width,
        height = request.size.height,
        margin = request.margin,
        "Generating heightmap"
    );

    let source = open_source(&request.in_raster)?;

    // Taken before padding so the constant border cannot shift the scale.
    let stats = statistics::collect(&source, &request.in_raster.join(","), options.stats_precision)?;
    info!(min = stats.min, max = stats.max, "Source statistics");
    let params = QuantizationParams::new(stats, options.dst_min, options.dst_max);

    let warped = match &request.mode {
        Mode::Extent(extent) => warp_to_extent(&source, extent, request.size)?,
        Mode::Cutline(cutline) => warp_to_cutline(&source, cutline, request.size)?,
    };
    drop(source);

    let grid = if request.margin > 0 {
        pad(&warped, request.margin, options.pad_fill)?
    } else {
        warped
    };

    if grid.nodata.is_none() {
        warn!("Source band has no no-data value");
    }
    let nodata = output_nodata(grid.nodata, &params);
    let samples = quantize(&grid, &params, nodata);

    write_heightmap(&request.out_raster, &grid, samples, nodata)?;
    Ok(request.out_raster.clone())
}
