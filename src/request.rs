//! Request document read by the command-line entry point.
//!
//! ```json
//! {
//!   "inRaster": "dem.tif",
//!   "outRaster": "heightmap.tif",
//!   "size": { "width": 256, "height": 256 },
//!   "extent": { "left": 0, "bottom": 0, "right": 1000, "top": 1000 },
//!   "margin": 2
//! }
//! ```
//!
//! `inRaster` may also be an array of paths, mosaicked before resampling.
//! Exactly one of `extent` or `cutline` must be given.

use std::io::Read;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use crate::cutline::CutlinePolygon;
use crate::error::{HeightmapError, Result};
use crate::raster::geotransform::Extent;
use crate::raster::warp::GridSize;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawInRaster {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct RawSize {
    width: i64,
    height: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRequest {
    in_raster: Option<RawInRaster>,
    out_raster: Option<String>,
    size: Option<RawSize>,
    extent: Option<Extent>,
    cutline: Option<Value>,
    margin: Option<i64>,
}

/// How the target extent is chosen.
#[derive(Clone, Debug, PartialEq)]
pub enum Mode {
    Extent(Extent),
    Cutline(CutlinePolygon),
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Extent(_) => "extent",
            Mode::Cutline(_) => "cutline",
        }
    }
}

/// A validated request. Constructing one performs no raster I/O.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightmapRequest {
    pub in_raster: Vec<String>,
    pub out_raster: PathBuf,
    pub size: GridSize,
    pub mode: Mode,
    pub margin: usize,
}

impl HeightmapRequest {
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawRequest = serde_json::from_str(text)?;
        Self::validate(raw)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let raw: RawRequest = serde_json::from_reader(reader)?;
        Self::validate(raw)
    }

    fn validate(raw: RawRequest) -> Result<Self> {
        let in_raster = match raw.in_raster {
            None => return Err(HeightmapError::invalid("inRaster is missing")),
            Some(RawInRaster::One(path)) => vec![path],
            Some(RawInRaster::Many(paths)) => paths,
        };
        if in_raster.is_empty() || in_raster.iter().any(|p| p.trim().is_empty()) {
            return Err(HeightmapError::invalid("inRaster is malformed"));
        }

        let out_raster = raw
            .out_raster
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| HeightmapError::invalid("outRaster is missing"))?;

        let size = raw
            .size
            .ok_or_else(|| HeightmapError::invalid("size is missing"))?;
        if size.width <= 0 || size.height <= 0 {
            return Err(HeightmapError::invalid("size is malformed"));
        }

        let margin = raw.margin.unwrap_or(0);
        if margin < 0 {
            return Err(HeightmapError::invalid("margin must not be negative"));
        }
        let size = GridSize {
            width: usize::try_from(size.width)
                .map_err(|_| HeightmapError::invalid("size is malformed"))?,
            height: usize::try_from(size.height)
                .map_err(|_| HeightmapError::invalid("size is malformed"))?,
        };
        let margin = usize::try_from(margin)
            .ok()
            .filter(|&m| size.padded(m).is_some())
            .ok_or_else(|| HeightmapError::invalid("margin is too large for the requested size"))?;

        let mode = match (raw.extent, raw.cutline) {
            (Some(_), Some(_)) => {
                return Err(HeightmapError::invalid(
                    "extent and cutline are mutually exclusive",
                ))
            }
            (None, None) => return Err(HeightmapError::invalid("extent or cutline is missing")),
            (Some(extent), None) => {
                extent.validate()?;
                Mode::Extent(extent)
            }
            (None, Some(cutline)) => Mode::Cutline(CutlinePolygon::from_geojson(&cutline)?),
        };

        Ok(Self {
            in_raster,
            out_raster: PathBuf::from(out_raster),
            size,
            mode,
            margin,
        })
    }
}
