pub mod clock;
pub mod media;
pub mod sync;
