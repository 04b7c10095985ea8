use serde::Deserialize;

use crate::error::{HeightmapError, Result};

/// Rectangular area in projection units.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Extent {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl Extent {
    pub fn validate(&self) -> Result<()> {
        let values = [self.left, self.bottom, self.right, self.top];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(HeightmapError::invalid("extent has non-finite values"));
        }
        if self.right <= self.left {
            return Err(HeightmapError::invalid("extent right must be greater than left"));
        }
        if self.top <= self.bottom {
            return Err(HeightmapError::invalid("extent top must be greater than bottom"));
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }
}

#[cfg(test)]
impl Extent {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right && y >= self.bottom && y <= self.top
    }

    /// True when `other` lies entirely inside this extent.
    pub fn encloses(&self, other: &Extent) -> bool {
        other.left >= self.left
            && other.right <= self.right
            && other.bottom >= self.bottom
            && other.top <= self.top
    }
}

/// Six-parameter affine transform from pixel/line to world coordinates,
/// in GDAL order: `(originX, pixelWidth, rotX, originY, rotY, pixelHeight)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub rot_x: f64,
    pub origin_y: f64,
    pub rot_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(gt: [f64; 6]) -> Result<Self> {
        if gt[1] == 0.0 || gt[5] == 0.0 {
            return Err(HeightmapError::reprojection(format!(
                "degenerate geotransform {:?}: pixel size must be non-zero",
                gt
            )));
        }
        Ok(Self {
            origin_x: gt[0],
            pixel_width: gt[1],
            rot_x: gt[2],
            origin_y: gt[3],
            rot_y: gt[4],
            pixel_height: gt[5],
        })
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.rot_x,
            self.origin_y,
            self.rot_y,
            self.pixel_height,
        ]
    }

    /// North-up transform covering `extent` exactly with a `width` x `height` grid.
    pub fn for_extent(extent: &Extent, width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(HeightmapError::reprojection(format!(
                "degenerate target grid {}x{}",
                width, height
            )));
        }
        Self::from_gdal([
            extent.left,
            extent.width() / width as f64,
            0.0,
            extent.top,
            0.0,
            -extent.height() / height as f64,
        ])
    }

    /// Transform of the same grid grown by `margin` pixels on every side.
    ///
    /// Only the origin moves; pixel size and rotation terms are kept.
    pub fn padded(&self, margin: usize) -> Self {
        let m = margin as f64;
        Self {
            origin_x: self.origin_x - self.pixel_width * m,
            origin_y: self.origin_y - self.pixel_height * m,
            ..*self
        }
    }
}

/// Pixel-to-world helpers for checking grids in tests.
#[cfg(test)]
impl GeoTransform {
    /// World coordinates of a fractional pixel/line position.
    pub fn apply(&self, pixel: f64, line: f64) -> (f64, f64) {
        (
            self.origin_x + pixel * self.pixel_width + line * self.rot_x,
            self.origin_y + pixel * self.rot_y + line * self.pixel_height,
        )
    }

    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Axis-aligned world bounds of a `width` x `height` grid.
    pub fn footprint(&self, width: usize, height: usize) -> Extent {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(width as f64, 0.0),
            self.apply(0.0, height as f64),
            self.apply(width as f64, height as f64),
        ];
        let xs = corners.iter().map(|c| c.0);
        let ys = corners.iter().map(|c| c.1);
        Extent {
            left: xs.clone().fold(f64::INFINITY, f64::min),
            right: xs.fold(f64::NEG_INFINITY, f64::max),
            bottom: ys.clone().fold(f64::INFINITY, f64::min),
            top: ys.fold(f64::NEG_INFINITY, f64::max),
        }
    }
}
