pub mod client;
pub mod ffmpeg;
pub mod sink;
pub mod still;
