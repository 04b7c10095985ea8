use tracing::warn;

use super::grid::RasterGrid;
use super::statistics::SourceStatistics;

pub const DST_MIN: u16 = 8192;
pub const DST_MAX: u16 = 65533;

/// Linear remap of `[src_min, src_max]` onto `[dst_min, dst_max]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuantizationParams {
    pub src_min: f64,
    pub src_max: f64,
    pub dst_min: u16,
    pub dst_max: u16,
}

impl QuantizationParams {
    pub fn new(stats: SourceStatistics, dst_min: u16, dst_max: u16) -> Self {
        Self {
            src_min: stats.min,
            src_max: stats.max,
            dst_min,
            dst_max,
        }
    }

    /// Map one sample. Results are clamped to `[dst_min, dst_max]`, so
    /// outliers saturate instead of wrapping; a zero-width source range maps
    /// everything to `dst_min`.
    pub fn apply(&self, value: f64) -> u16 {
        let (lo, hi) = (self.dst_min as f64, self.dst_max as f64);
        let range = self.src_max - self.src_min;
        if range <= 0.0 {
            return self.dst_min;
        }
        let scaled = lo + (value - self.src_min) * (hi - lo) / range;
        scaled.round().clamp(lo, hi) as u16
    }
}

/// Output no-data value for a source no-data value: kept when it is an
/// integer `u16` can hold outside `[dst_min, dst_max]`, otherwise `0`, which
/// lies below the quantized range. A kept value inside the range would be
/// indistinguishable from a valid sample.
pub fn output_nodata(source_nodata: Option<f64>, params: &QuantizationParams) -> Option<u16> {
    let nd = source_nodata?;
    if nd.fract() != 0.0 || !(0.0..=u16::MAX as f64).contains(&nd) {
        warn!(nodata = nd, "No-data value does not fit UInt16; using 0");
        return Some(0);
    }
    let nd = nd as u16;
    if (params.dst_min..=params.dst_max).contains(&nd) {
        warn!(
            nodata = nd,
            dst_min = params.dst_min,
            dst_max = params.dst_max,
            "No-data value falls inside the quantized range; using 0"
        );
        return Some(0);
    }
    Some(nd)
}

/// Quantize every sample of `grid`. No-data samples become `nodata_out`.
pub fn quantize(grid: &RasterGrid, params: &QuantizationParams, nodata_out: Option<u16>) -> Vec<u16> {
    let nodata_out = nodata_out.unwrap_or(0);
    grid.data
        .iter()
        .map(|&v| {
            if grid.is_nodata(v) {
                nodata_out
            } else {
                params.apply(v)
            }
        })
        .collect()
}
