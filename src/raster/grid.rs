use gdal::raster::GdalDataType;
use gdal::Dataset;

use super::geotransform::GeoTransform;
use crate::error::{HeightmapError, Result};

/// Single-band grid of samples held in memory between pipeline stages.
///
/// Samples are stored row-major as `f64` whatever the source sample type;
/// `data_type` records what the source band declared.
#[derive(Clone, Debug)]
pub struct RasterGrid {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f64>,
    pub data_type: GdalDataType,
    pub nodata: Option<f64>,
    pub geo_transform: GeoTransform,
    pub projection: String,
}

impl RasterGrid {
    pub fn new(
        width: usize,
        height: usize,
        data: Vec<f64>,
        data_type: GdalDataType,
        nodata: Option<f64>,
        geo_transform: GeoTransform,
        projection: String,
    ) -> Result<Self> {
        if data.len() != width * height {
            return Err(HeightmapError::reprojection(format!(
                "grid of {}x{} holds {} samples",
                width,
                height,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            data_type,
            nodata,
            geo_transform,
            projection,
        })
    }

    /// Read band 1 of `dataset` fully into memory.
    pub fn read_from(dataset: &Dataset, data_type: GdalDataType) -> Result<Self> {
        let (width, height) = dataset.raster_size();
        let band = dataset
            .rasterband(1)
            .map_err(|e| HeightmapError::reprojection(format!("Failed to get band: {}", e)))?;
        let nodata = band.no_data_value();

        let buffer = band
            .read_as::<f64>((0, 0), (width, height), (width, height), None)
            .map_err(|e| HeightmapError::reprojection(format!("Failed to read output: {}", e)))?;

        let gt = dataset.geo_transform().map_err(|e| {
            HeightmapError::reprojection(format!("Failed to get geotransform: {}", e))
        })?;

        Self::new(
            width,
            height,
            buffer.data().to_vec(),
            data_type,
            nodata,
            GeoTransform::from_gdal(gt)?,
            dataset.projection(),
        )
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.width..(row + 1) * self.width]
    }

    /// True for samples that carry no measurement.
    pub fn is_nodata(&self, value: f64) -> bool {
        value.is_nan() || self.nodata.is_some_and(|nd| (value - nd).abs() < 1e-10)
    }
}

#[cfg(test)]
impl RasterGrid {
    pub fn get(&self, col: usize, row: usize) -> f64 {
        self.data[row * self.width + col]
    }
}
