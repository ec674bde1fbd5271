pub mod frame;
pub mod rasterizer;
pub mod snapshot;
pub mod svg;
pub mod text;
pub mod video;
