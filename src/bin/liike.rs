use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use liike::assets::optimize::OptimizePolicy;
use liike::encode::still::write_still;
use liike::export::progress::ExportEvent;
use liike::{
    CancelToken, DefaultVideoOpener, ExportFormat, ExportOrchestrator, ExportRequest,
    ExportSettings, FontRegistry, FrameRasterizer, FsFetcher, QualityPreset, ResourceCache, Scene,
    SyncMode, TimelineSynchronizer,
};

#[derive(Parser, Debug)]
#[command(name = "liike", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export a scene as video (requires `ffmpeg`) or as a still image.
    Export(ExportArgs),
    /// Render the scene at one instant to a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input scene JSON.
    scene: PathBuf,

    /// mp4, webm, mov, gif, png or webp.
    #[arg(long, default_value_t = ExportFormat::Mp4)]
    format: ExportFormat,

    #[arg(long, default_value_t = liike::export::job::DEFAULT_FPS)]
    fps: u32,

    /// standard (1x) or high (2x).
    #[arg(long, default_value = "standard")]
    quality: QualityPreset,

    /// Output directory (default: ~/Downloads/Liike).
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Base file name (default: liike_export).
    #[arg(long)]
    name: Option<String>,

    /// Prefer the platform's hardware HEVC encoder.
    #[arg(long)]
    hw: bool,

    /// Settings JSON; `LIIKE_*` environment variables still override it.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Show the finished file in the file manager.
    #[arg(long)]
    reveal: bool,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input scene JSON.
    scene: PathBuf,

    /// Timeline instant in milliseconds.
    #[arg(long, default_value_t = 0)]
    at: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value = "standard")]
    quality: QualityPreset,

    #[arg(long)]
    settings: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Export(args) => cmd_export(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<ExportSettings> {
    let settings = match path {
        Some(p) => ExportSettings::from_path(p)
            .with_context(|| format!("load settings '{}'", p.display()))?,
        None => ExportSettings::from_env().context("read LIIKE_* settings")?,
    };
    Ok(settings)
}

fn load_scene(path: &Path) -> anyhow::Result<Scene> {
    Scene::from_path(path, &DefaultVideoOpener::default())
        .with_context(|| format!("load scene '{}'", path.display()))
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let settings = load_settings(args.settings.as_deref())?;
    let mut scene = load_scene(&args.scene)?;

    let request = ExportRequest {
        format: args.format,
        fps: args.fps,
        quality: args.quality,
        out_dir: args.out_dir,
        base_name: args.name,
        hardware_accel: args.hw,
    };
    let mut orchestrator = ExportOrchestrator::new(settings).with_observer(|ev: ExportEvent| {
        if let ExportEvent::Progress(p) = ev {
            eprint!("\r{:>3}% ({}/{})", (p.ratio * 100.0).round(), p.frame, p.total_frames);
            if p.frame == p.total_frames {
                eprintln!();
            }
        }
    });

    let out = orchestrator.export(&request, &mut scene, &CancelToken::new())?;
    eprintln!("wrote {}", out.display());
    if args.reveal
        && let Err(e) = liike::reveal_in_file_manager(&out)
    {
        tracing::warn!("{e}");
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let settings = load_settings(args.settings.as_deref())?;
    let mut scene = load_scene(&args.scene)?;

    let cache = Arc::new(ResourceCache::new(
        Arc::new(FsFetcher),
        OptimizePolicy::from_settings(&settings),
    ));
    let report = cache.prime(&scene.resource_uris());
    let mut raster = FrameRasterizer::new(cache, FontRegistry::new());
    raster.register_fonts(&report);

    TimelineSynchronizer::new(settings).seek_to(
        &mut scene,
        args.at,
        SyncMode::Scrub,
        &CancelToken::new(),
    )?;
    let (w, h) = scene.canvas.scaled(args.quality.multiplier())?;
    let frame = raster.rasterize(&scene, w, h)?;

    write_still(&frame, ExportFormat::Png, &args.out)
        .with_context(|| format!("write png '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}
