pub mod color;
pub mod composition;
pub mod def;
pub mod model;
pub mod overlay;
pub mod style;
