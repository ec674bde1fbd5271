//! Liike renders animated device-mockup scenes to video and still images.
//!
//! The export pipeline is leaf-first:
//!
//! - [`ResourceCache`] materializes images and fonts once per export
//! - [`TimelineSynchronizer`] brings animation handles and video elements to one instant
//! - [`FrameRasterizer`] turns the synchronized scene into an RGBA frame
//! - [`StreamingEncodeClient`] streams frames into an [`EncodeSink`] (normally `ffmpeg`)
//! - [`ExportOrchestrator`] owns the frame loop, cancellation and the output file
#![forbid(unsafe_code)]

pub mod animation;
pub mod assets;
pub mod encode;
pub mod export;
pub mod foundation;
pub mod render;
pub mod scene;
pub mod timeline;

pub use crate::foundation::cancel::CancelToken;
pub use crate::foundation::core::{Affine, BezPath, Canvas, Fps, FrameIndex, Point, Rect, Vec2};
pub use crate::foundation::error::{LiikeError, LiikeResult};
pub use crate::foundation::settings::ExportSettings;

pub use crate::animation::ease::Ease;
pub use crate::animation::handle::AnimationHandle;
pub use crate::assets::cache::{CachedAsset, PrimeReport, ResourceCache};
pub use crate::assets::fetch::{Fetcher, FsFetcher, MemoryFetcher};
pub use crate::assets::fonts::FontRegistry;
pub use crate::encode::client::StreamingEncodeClient;
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{EncodeParams, EncodeSink, InMemorySink, SinkLog};
pub use crate::export::job::{ExportFormat, ExportJob, ExportRequest, QualityPreset};
pub use crate::export::orchestrator::{EncoderFactory, ExportOrchestrator, FfmpegEncoderFactory};
pub use crate::export::progress::{ExportEvent, ExportObserver, ExportProgress, ExportState};
pub use crate::export::reveal::reveal_in_file_manager;
pub use crate::render::frame::FrameBuffer;
pub use crate::render::rasterizer::FrameRasterizer;
pub use crate::scene::composition::{DefaultVideoOpener, Scene, VideoOpener};
pub use crate::scene::model::{NodeId, SceneTree};
pub use crate::timeline::media::{MediaElement, SyncMode, SyntheticVideo};
pub use crate::timeline::sync::TimelineSynchronizer;
