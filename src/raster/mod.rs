pub mod geotransform;
pub mod grid;
pub mod output;
pub mod padding;
pub mod quantize;
pub mod scratch;
pub mod source;
pub mod statistics;
pub mod warp;
