use gdal::Dataset;
use tracing::debug;

use crate::error::{HeightmapError, Result};

/// Observed value range of the source elevation band.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceStatistics {
    pub min: f64,
    pub max: f64,
}

/// Round `value` to `decimals` decimal places.
pub fn round_to_precision(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Compute the true min/max of band 1 with a full pass over the raster.
///
/// Producers of elevation data routinely ship stale or approximate
/// statistics, so cached metadata is never consulted.
pub fn collect(dataset: &Dataset, path: &str, precision: u32) -> Result<SourceStatistics> {
    let band = dataset
        .rasterband(1)
        .map_err(|e| HeightmapError::raster_open(path, format!("Failed to get band: {}", e)))?;

    let min_max = band.compute_raster_min_max(false).map_err(|e| {
        HeightmapError::raster_open(path, format!("Failed to compute statistics: {}", e))
    })?;

    let stats = SourceStatistics {
        min: round_to_precision(min_max.min, precision),
        max: round_to_precision(min_max.max, precision),
    };
    debug!(
        raw_min = min_max.min,
        raw_max = min_max.max,
        min = stats.min,
        max = stats.max,
        "Computed source statistics"
    );

    Ok(stats)
}
