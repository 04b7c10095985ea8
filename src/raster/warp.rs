//! Resampling of the source raster onto the requested pixel grid.
//!
//! Both modes go through GDAL's image reprojection into an in-memory
//! dataset with bilinear interpolation. Cutline mode first derives the grid
//! extent from the envelope of the OGR geometries and afterwards masks every
//! pixel whose centre GDAL's rasterizer does not burn.

use std::fs;

use gdal::raster::{rasterize, reproject};
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use gdal::vector::{Geometry, LayerAccess};
use gdal::{Dataset, DriverManager};
use tracing::{debug, info, warn};

use super::geotransform::{Extent, GeoTransform};
use super::grid::RasterGrid;
use super::scratch::ScratchFile;
use crate::cutline::CutlinePolygon;
use crate::error::{HeightmapError, Result};

/// Output grid dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridSize {
    pub width: usize,
    pub height: usize,
}

impl GridSize {
    /// Size after adding `margin` pixels on every side. `None` when the
    /// padded grid's `f64` buffer would not be addressable.
    pub fn padded(&self, margin: usize) -> Option<GridSize> {
        let border = margin.checked_mul(2)?;
        let width = self.width.checked_add(border)?;
        let height = self.height.checked_add(border)?;
        let bytes = width
            .checked_mul(height)?
            .checked_mul(std::mem::size_of::<f64>())?;
        if bytes > isize::MAX as usize {
            return None;
        }
        Some(GridSize { width, height })
    }
}

/// Resample band 1 of `source` onto a `size` grid covering exactly `extent`.
pub fn warp_to_extent(source: &Dataset, extent: &Extent, size: GridSize) -> Result<RasterGrid> {
    if size.width == 0 || size.height == 0 {
        return Err(HeightmapError::reprojection(format!(
            "degenerate target grid {}x{}",
            size.width, size.height
        )));
    }

    let band = source
        .rasterband(1)
        .map_err(|e| HeightmapError::reprojection(format!("Failed to get band: {}", e)))?;
    let data_type = band.band_type();
    let nodata = band.no_data_value();
    let projection = source.projection();
    let geo_transform = GeoTransform::for_extent(extent, size.width, size.height)?;

    let mem_driver = DriverManager::get_driver_by_name("MEM")
        .map_err(|e| HeightmapError::reprojection(format!("Failed to get MEM driver: {}", e)))?;

    // Released when it goes out of scope, on every path out of this function.
    let mut output_ds = mem_driver
        .create_with_band_type::<f64, _>("", size.width, size.height, 1)
        .map_err(|e| {
            HeightmapError::reprojection(format!("Failed to create output dataset: {}", e))
        })?;

    output_ds
        .set_geo_transform(&geo_transform.to_gdal())
        .map_err(|e| HeightmapError::reprojection(format!("Failed to set geotransform: {}", e)))?;
    output_ds
        .set_projection(&projection)
        .map_err(|e| HeightmapError::reprojection(format!("Failed to set projection: {}", e)))?;

    if let Some(nd) = nodata {
        let mut output_band = output_ds
            .rasterband(1)
            .map_err(|e| HeightmapError::reprojection(format!("Failed to get output band: {}", e)))?;
        output_band
            .set_no_data_value(Some(nd))
            .map_err(|e| HeightmapError::reprojection(format!("Failed to set nodata: {}", e)))?;
        output_band
            .fill(nd, None)
            .map_err(|e| HeightmapError::reprojection(format!("Failed to fill output: {}", e)))?;
    }

    reproject(source, &output_ds)
        .map_err(|e| HeightmapError::reprojection(format!("Failed to reproject: {}", e)))?;

    let grid = RasterGrid::read_from(&output_ds, data_type)?;
    debug!(
        width = grid.width,
        height = grid.height,
        transform = ?grid.geo_transform.to_gdal(),
        "Resampled onto target grid"
    );
    Ok(grid)
}

/// Resample onto the cutline's bounding box and mask pixels outside it.
pub fn warp_to_cutline(
    source: &Dataset,
    cutline: &CutlinePolygon,
    size: GridSize,
) -> Result<RasterGrid> {
    let geometries = load_cutline(source, cutline)?;
    let extent = cutline_extent(&geometries)?;
    extent.validate().map_err(|_| {
        HeightmapError::reprojection(format!("cutline has a degenerate extent {:?}", extent))
    })?;
    info!(?extent, "Cropping to cutline");

    let mut grid = warp_to_extent(source, &extent, size)?;
    let masked = mask_outside(&mut grid, &geometries)?;
    debug!(masked, "Masked pixels outside cutline");

    Ok(grid)
}

/// Union of the geometries' envelopes.
fn cutline_extent(geometries: &[Geometry]) -> Result<Extent> {
    geometries
        .iter()
        .map(|geom| {
            let env = geom.envelope();
            Extent {
                left: env.MinX,
                bottom: env.MinY,
                right: env.MaxX,
                top: env.MaxY,
            }
        })
        .reduce(|a, b| Extent {
            left: a.left.min(b.left),
            bottom: a.bottom.min(b.bottom),
            right: a.right.max(b.right),
            top: a.top.max(b.top),
        })
        .ok_or_else(|| HeightmapError::reprojection("cutline layer has no geometries"))
}

/// Set every pixel whose centre is outside `geometries` to the grid's
/// no-data value (or `0` when the grid has none). The inside test is GDAL's
/// own rasterizer burning the polygons onto a byte mask aligned with the
/// grid, so holes are honoured. Returns the number of pixels masked.
pub fn mask_outside(grid: &mut RasterGrid, geometries: &[Geometry]) -> Result<usize> {
    let mem_driver = DriverManager::get_driver_by_name("MEM")
        .map_err(|e| HeightmapError::reprojection(format!("Failed to get MEM driver: {}", e)))?;
    let mut mask_ds = mem_driver
        .create_with_band_type::<u8, _>("", grid.width, grid.height, 1)
        .map_err(|e| HeightmapError::reprojection(format!("Failed to create mask: {}", e)))?;
    mask_ds
        .set_geo_transform(&grid.geo_transform.to_gdal())
        .map_err(|e| HeightmapError::reprojection(format!("Failed to set geotransform: {}", e)))?;

    let burn_values = vec![1.0; geometries.len()];
    rasterize(&mut mask_ds, &[1], geometries, &burn_values, None)
        .map_err(|e| HeightmapError::reprojection(format!("Failed to rasterize cutline: {}", e)))?;

    let mask = mask_ds
        .rasterband(1)
        .and_then(|band| {
            band.read_as::<u8>(
                (0, 0),
                (grid.width, grid.height),
                (grid.width, grid.height),
                None,
            )
        })
        .map_err(|e| HeightmapError::reprojection(format!("Failed to read mask: {}", e)))?;

    let fill = grid.nodata.unwrap_or(0.0);
    let mut masked = 0;
    for (value, &inside) in grid.data.iter_mut().zip(mask.data()) {
        if inside == 0 {
            *value = fill;
            masked += 1;
        }
    }
    Ok(masked)
}

/// Read the cutline back through the vector driver from a transient GeoJSON
/// file and reproject its geometries into the raster's CRS when the document
/// names a different one.
fn load_cutline(source: &Dataset, cutline: &CutlinePolygon) -> Result<Vec<Geometry>> {
    let scratch = ScratchFile::in_temp_dir("cutline", "geojson");
    let body = serde_json::to_vec(&cutline.to_geojson())
        .map_err(|e| HeightmapError::io(format!("Failed to serialize cutline: {}", e)))?;
    fs::write(scratch.path(), body)?;

    let vector_ds = Dataset::open(scratch.path())
        .map_err(|e| HeightmapError::reprojection(format!("Failed to open cutline: {}", e)))?;
    let mut layer = vector_ds
        .layer(0)
        .map_err(|e| HeightmapError::reprojection(format!("Failed to get layer: {}", e)))?;

    let transform = match &cutline.crs {
        Some(crs) => cutline_transform(source, layer.spatial_ref(), crs)?,
        None => None,
    };

    let mut geometries = Vec::new();
    for feature in layer.features() {
        if let Some(geom) = feature.geometry() {
            let mut geom = geom.clone();
            if let Some(ref t) = transform {
                geom.transform_inplace(t).map_err(|e| {
                    HeightmapError::reprojection(format!("Failed to transform cutline: {}", e))
                })?;
            }
            geometries.push(geom);
        }
    }
    Ok(geometries)
}

/// Transform from the cutline layer's CRS into the raster's, or `None` when
/// both agree or either is unknown.
fn cutline_transform(
    source: &Dataset,
    layer_srs: Option<SpatialRef>,
    crs: &str,
) -> Result<Option<CoordTransform>> {
    let Some(mut layer_srs) = layer_srs else {
        warn!(crs, "Cutline CRS not understood by the vector driver; assuming raster CRS");
        return Ok(None);
    };

    let projection = source.projection();
    if projection.is_empty() {
        warn!("Source raster has no projection; cutline CRS ignored");
        return Ok(None);
    }
    let mut raster_srs = SpatialRef::from_wkt(&projection)
        .map_err(|e| HeightmapError::reprojection(format!("Failed to parse source SRS: {}", e)))?;

    if raster_srs == layer_srs {
        return Ok(None);
    }

    layer_srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    raster_srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);

    let transform = CoordTransform::new(&layer_srs, &raster_srs)
        .map_err(|e| HeightmapError::reprojection(format!("Failed to create transform: {}", e)))?;
    debug!(crs, "Transforming cutline into raster CRS");
    Ok(Some(transform))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdal::raster::{Buffer, GdalDataType};
    use serde_json::json;

    /// 100x100 north-up source over (0..100, 0..100) whose value is the column index.
    fn ramp_source() -> Dataset {
        ramp_source_at([0.0, 1.0, 0.0, 100.0, 0.0, -1.0])
    }

    /// 100x100 EPSG:32613 ramp placed by `geo_transform`.
    fn ramp_source_at(geo_transform: [f64; 6]) -> Dataset {
        let driver = DriverManager::get_driver_by_name("MEM").unwrap();
        let mut ds = driver
            .create_with_band_type::<f32, _>("", 100, 100, 1)
            .unwrap();
        ds.set_geo_transform(&geo_transform).unwrap();
        let srs = SpatialRef::from_epsg(32613).unwrap();
        ds.set_projection(&srs.to_wkt().unwrap()).unwrap();

        let data: Vec<f32> = (0..100 * 100).map(|i| (i % 100) as f32).collect();
        let mut band = ds.rasterband(1).unwrap();
        let mut buffer = Buffer::new((100, 100), data);
        band.write((0, 0), (100, 100), &mut buffer).unwrap();
        band.set_no_data_value(Some(-9999.0)).unwrap();
        drop(band);
        ds
    }

    fn grid_with(nodata: Option<f64>) -> RasterGrid {
        RasterGrid::new(
            4,
            4,
            vec![1.0; 16],
            GdalDataType::Float32,
            nodata,
            GeoTransform::from_gdal([0.0, 1.0, 0.0, 4.0, 0.0, -1.0]).unwrap(),
            String::new(),
        )
        .unwrap()
    }

    // ==================== Bounds Mode Tests ====================

    #[test]
    fn test_warp_to_extent_grid_and_transform() {
        let source = ramp_source();
        let extent = Extent {
            left: 10.0,
            bottom: 20.0,
            right: 60.0,
            top: 70.0,
        };
        let grid = warp_to_extent(
            &source,
            &extent,
            GridSize {
                width: 25,
                height: 10,
            },
        )
        .unwrap();

        assert_eq!((grid.width, grid.height), (25, 10));
        assert_eq!(grid.data.len(), 250);
        assert_eq!(grid.geo_transform.origin_x, 10.0);
        assert_eq!(grid.geo_transform.origin_y, 70.0);
        assert!((grid.geo_transform.pixel_width - 2.0).abs() < 1e-12);
        assert!((grid.geo_transform.pixel_height + 5.0).abs() < 1e-12);
        assert_eq!(grid.projection, source.projection());
        assert_eq!(grid.nodata, Some(-9999.0));
        assert_eq!(grid.data_type, GdalDataType::Float32);
    }

    #[test]
    fn test_warp_to_extent_interpolates_ramp() {
        let source = ramp_source();
        let extent = Extent {
            left: 10.0,
            bottom: 20.0,
            right: 60.0,
            top: 70.0,
        };
        let grid = warp_to_extent(
            &source,
            &extent,
            GridSize {
                width: 25,
                height: 10,
            },
        )
        .unwrap();
        // Pixel centre x = 10 + 2 * 12.5 = 35, sampled between source columns.
        let value = grid.get(12, 5);
        assert!(
            (value - 34.5).abs() < 1.0,
            "bilinear sample near x=35 should be ~34.5, got {}",
            value
        );
    }

    #[test]
    fn test_warp_to_extent_rejects_empty_grid() {
        let source = ramp_source();
        let extent = Extent {
            left: 0.0,
            bottom: 0.0,
            right: 1.0,
            top: 1.0,
        };
        let result = warp_to_extent(
            &source,
            &extent,
            GridSize {
                width: 0,
                height: 4,
            },
        );
        assert!(matches!(result, Err(HeightmapError::Reprojection(_))));
    }

    // ==================== Cutline Mode Tests ====================

    fn polygon(wkt: &str) -> Vec<Geometry> {
        vec![Geometry::from_wkt(wkt).unwrap()]
    }

    #[test]
    fn test_warp_to_cutline_crops_to_bbox() {
        let source = ramp_source();
        let cutline = CutlinePolygon::from_geojson(&json!({
            "type": "Polygon",
            "coordinates": [[[20.0, 20.0], [80.0, 20.0], [20.0, 80.0], [20.0, 20.0]]]
        }))
        .unwrap();

        let grid = warp_to_cutline(
            &source,
            &cutline,
            GridSize {
                width: 30,
                height: 30,
            },
        )
        .unwrap();

        let bbox = Extent {
            left: 20.0,
            bottom: 20.0,
            right: 80.0,
            top: 80.0,
        };
        assert_eq!(grid.geo_transform.footprint(30, 30), bbox);
        for row in 0..grid.height {
            for col in 0..grid.width {
                let (x, y) = grid.geo_transform.pixel_center(col, row);
                assert!(bbox.contains(x, y), "pixel centre outside cutline bbox");
            }
        }
        // Top-right pixel is outside the triangle.
        assert_eq!(grid.get(29, 0), -9999.0);
        // Bottom-left pixel is inside.
        assert_ne!(grid.get(0, 29), -9999.0);
    }

    #[test]
    fn test_warp_to_cutline_same_named_crs_is_not_transformed() {
        let source = ramp_source();
        let cutline = CutlinePolygon::from_geojson(&json!({
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "EPSG:32613" } },
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[10.0, 10.0], [50.0, 10.0], [50.0, 50.0], [10.0, 50.0], [10.0, 10.0]]]
                }
            }]
        }))
        .unwrap();

        let grid = warp_to_cutline(
            &source,
            &cutline,
            GridSize {
                width: 8,
                height: 8,
            },
        )
        .unwrap();
        let footprint = grid.geo_transform.footprint(8, 8);
        assert!((footprint.left - 10.0).abs() < 1e-6);
        assert!((footprint.top - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_warp_to_cutline_projects_lon_lat_ring_into_utm() {
        // 10 km x 10 km of UTM zone 13N, 100 m pixels, value = column index.
        let source = ramp_source_at([450_000.0, 100.0, 0.0, 4_250_000.0, 0.0, -100.0]);
        let ring = [
            (-105.55, 38.33),
            (-105.50, 38.33),
            (-105.50, 38.37),
            (-105.55, 38.37),
            (-105.55, 38.33),
        ];
        let coordinates: Vec<[f64; 2]> = ring.iter().map(|&(lon, lat)| [lon, lat]).collect();
        let cutline = CutlinePolygon::from_geojson(&json!({
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "EPSG:4326" } },
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": { "type": "Polygon", "coordinates": [coordinates] }
            }]
        }))
        .unwrap();

        let mut wgs84 = SpatialRef::from_epsg(4326).unwrap();
        wgs84.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        let mut utm = SpatialRef::from_epsg(32613).unwrap();
        utm.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        let mut xs: Vec<f64> = ring.iter().map(|p| p.0).collect();
        let mut ys: Vec<f64> = ring.iter().map(|p| p.1).collect();
        CoordTransform::new(&wgs84, &utm)
            .unwrap()
            .transform_coords(&mut xs, &mut ys, &mut [])
            .unwrap();
        let expected = Extent {
            left: xs.iter().copied().fold(f64::INFINITY, f64::min),
            bottom: ys.iter().copied().fold(f64::INFINITY, f64::min),
            right: xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            top: ys.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        };
        // Metres, not degrees.
        assert!((expected.left - 451_928.5).abs() < 1.0, "{:?}", expected);
        assert!((expected.top - 4_247_011.7).abs() < 1.0, "{:?}", expected);

        let grid = warp_to_cutline(
            &source,
            &cutline,
            GridSize {
                width: 20,
                height: 20,
            },
        )
        .unwrap();

        let footprint = grid.geo_transform.footprint(20, 20);
        for (got, want) in [
            (footprint.left, expected.left),
            (footprint.bottom, expected.bottom),
            (footprint.right, expected.right),
            (footprint.top, expected.top),
        ] {
            assert!(
                (got - want).abs() < 1e-6,
                "footprint {:?} differs from projected ring envelope {:?}",
                footprint,
                expected
            );
        }

        // The centre pixel samples the ramp rather than no-data.
        let (x, _) = grid.geo_transform.pixel_center(10, 10);
        let value = grid.get(10, 10);
        let column = (x - 450_000.0) / 100.0 - 0.5;
        assert!(
            (value - column).abs() < 1.0,
            "expected ramp value near {}, got {}",
            column,
            value
        );
    }

    #[test]
    fn test_mask_outside_uses_nodata() {
        let mut grid = grid_with(Some(-1.0));
        let geometries = polygon("POLYGON ((0 0, 2 0, 2 4, 0 4, 0 0))");

        let masked = mask_outside(&mut grid, &geometries).unwrap();
        assert_eq!(masked, 8, "right half should be masked");
        assert_eq!(grid.get(0, 0), 1.0);
        assert_eq!(grid.get(3, 0), -1.0);
    }

    #[test]
    fn test_mask_outside_without_nodata_uses_zero() {
        let mut grid = grid_with(None);
        let geometries = polygon("POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))");

        mask_outside(&mut grid, &geometries).unwrap();
        assert_eq!(grid.get(0, 3), 1.0);
        assert_eq!(grid.get(3, 3), 0.0);
    }

    #[test]
    fn test_mask_outside_honours_holes() {
        let mut grid = grid_with(Some(-1.0));
        let geometries =
            polygon("POLYGON ((0 0, 4 0, 4 4, 0 4, 0 0), (1 1, 3 1, 3 3, 1 3, 1 1))");

        let masked = mask_outside(&mut grid, &geometries).unwrap();
        assert_eq!(masked, 4, "the 2x2 hole should be masked");
        assert_eq!(grid.get(1, 1), -1.0);
        assert_eq!(grid.get(2, 2), -1.0);
        assert_eq!(grid.get(0, 0), 1.0);
    }

    #[test]
    fn test_cutline_extent_unions_envelopes() {
        let geometries = vec![
            Geometry::from_wkt("POLYGON ((0 0, 2 0, 2 1, 0 0))").unwrap(),
            Geometry::from_wkt("POLYGON ((5 -3, 6 -3, 6 4, 5 -3))").unwrap(),
        ];
        let extent = cutline_extent(&geometries).unwrap();
        assert_eq!(
            extent,
            Extent {
                left: 0.0,
                bottom: -3.0,
                right: 6.0,
                top: 4.0
            }
        );
        assert!(matches!(
            cutline_extent(&[]),
            Err(HeightmapError::Reprojection(_))
        ));
    }
}
