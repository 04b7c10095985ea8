use gdal::programs::raster::build_vrt;
use gdal::Dataset;
use tracing::{debug, info};

use crate::error::{HeightmapError, Result};

/// Open the elevation source: one raster, or a virtual mosaic of several.
///
/// A mosaic is an in-memory VRT whose lifetime is that of the returned
/// dataset; nothing is written to disk.
pub fn open_source(paths: &[String]) -> Result<Dataset> {
    match paths {
        [] => Err(HeightmapError::invalid("inRaster is empty")),
        [path] => open_one(path),
        _ => {
            let datasets = paths
                .iter()
                .map(|p| open_one(p))
                .collect::<Result<Vec<_>>>()?;

            let mosaic = build_vrt(None, &datasets, None).map_err(|e| {
                HeightmapError::raster_open(paths.join(","), format!("Failed to build VRT: {}", e))
            })?;
            info!(count = paths.len(), "Built virtual mosaic");
            Ok(mosaic)
        }
    }
}

fn open_one(path: &str) -> Result<Dataset> {
    let dataset =
        Dataset::open(path).map_err(|e| HeightmapError::raster_open(path, e.to_string()))?;

    if dataset.raster_count() == 0 {
        return Err(HeightmapError::raster_open(path, "no raster bands"));
    }
    let (width, height) = dataset.raster_size();
    debug!(path, width, height, "Opened raster");

    Ok(dataset)
}
