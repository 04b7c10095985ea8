use std::path::Path;

use gdal::raster::Buffer;
use gdal::DriverManager;
use tracing::info;

use super::grid::RasterGrid;
use super::scratch::ScratchFile;
use crate::error::{HeightmapError, Result};

/// Write quantized samples as a single-band UInt16 GeoTIFF at `target`.
///
/// The file is produced under a temporary sibling name and renamed onto
/// `target` only once GDAL has flushed it, so a failure never leaves a
/// partial raster behind.
pub fn write_heightmap(
    target: &Path,
    grid: &RasterGrid,
    samples: Vec<u16>,
    nodata: Option<u16>,
) -> Result<()> {
    if samples.len() != grid.width * grid.height {
        return Err(HeightmapError::io(format!(
            "{} samples for a {}x{} raster",
            samples.len(),
            grid.width,
            grid.height
        )));
    }

    let scratch = ScratchFile::beside(target, "tif");
    {
        let driver = DriverManager::get_driver_by_name("GTiff")
            .map_err(|e| HeightmapError::io(format!("Failed to get GTiff driver: {}", e)))?;
        let mut dataset = driver
            .create_with_band_type::<u16, _>(scratch.path(), grid.width, grid.height, 1)
            .map_err(|e| HeightmapError::io(format!("Failed to create output: {}", e)))?;

        dataset
            .set_geo_transform(&grid.geo_transform.to_gdal())
            .map_err(|e| HeightmapError::io(format!("Failed to set geotransform: {}", e)))?;
        if !grid.projection.is_empty() {
            dataset
                .set_projection(&grid.projection)
                .map_err(|e| HeightmapError::io(format!("Failed to set projection: {}", e)))?;
        }

        let mut band = dataset
            .rasterband(1)
            .map_err(|e| HeightmapError::io(format!("Failed to get band: {}", e)))?;
        let mut buffer = Buffer::new((grid.width, grid.height), samples);
        band.write((0, 0), (grid.width, grid.height), &mut buffer)
            .map_err(|e| HeightmapError::io(format!("Failed to write samples: {}", e)))?;
        if let Some(nd) = nodata {
            band.set_no_data_value(Some(nd as f64))
                .map_err(|e| HeightmapError::io(format!("Failed to set nodata: {}", e)))?;
        }
        drop(band);

        dataset
            .flush_cache()
            .map_err(|e| HeightmapError::io(format!("Failed to flush output: {}", e)))?;
    }

    scratch.persist(target)?;
    info!(path = %target.display(), width = grid.width, height = grid.height, "Wrote heightmap");
    Ok(())
}
