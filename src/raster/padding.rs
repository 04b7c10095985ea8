use tracing::debug;

use super::grid::RasterGrid;
use super::warp::GridSize;
use crate::error::{HeightmapError, Result};

/// Grow `grid` by `margin` pixels on every side, filling the border with
/// `fill` and shifting the transform origin outward so that every original
/// pixel keeps its world position. No resampling happens here.
///
/// No-data value, projection and source data type are carried unchanged.
pub fn pad(grid: &RasterGrid, margin: usize, fill: f64) -> Result<RasterGrid> {
    let GridSize { width, height } = GridSize {
        width: grid.width,
        height: grid.height,
    }
    .padded(margin)
    .ok_or_else(|| {
        HeightmapError::invalid(format!(
            "margin {} is too large for a {}x{} grid",
            margin, grid.width, grid.height
        ))
    })?;

    let len = width * height;
    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|e| {
        HeightmapError::reprojection(format!(
            "Failed to allocate padded grid {}x{}: {}",
            width, height, e
        ))
    })?;
    data.resize(len, fill);

    for row in 0..grid.height {
        let start = (row + margin) * width + margin;
        data[start..start + grid.width].copy_from_slice(grid.row(row));
    }

    let geo_transform = grid.geo_transform.padded(margin);
    debug!(
        margin,
        width,
        height,
        transform = ?geo_transform.to_gdal(),
        "Padded grid"
    );

    Ok(RasterGrid {
        width,
        height,
        data,
        data_type: grid.data_type,
        nodata: grid.nodata,
        geo_transform,
        projection: grid.projection.clone(),
    })
}
