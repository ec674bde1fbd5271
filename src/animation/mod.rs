pub mod ease;
pub mod handle;
pub mod text;
