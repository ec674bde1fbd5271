pub mod cache;
pub mod fetch;
pub mod fonts;
pub mod media;
pub mod optimize;
