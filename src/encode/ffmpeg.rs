use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::encode::sink::{EncodeParams, EncodeSink, KillSwitch};
use crate::export::job::ExportFormat;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{LiikeError, LiikeResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::frame::FrameBuffer;

/// Environment variable naming an explicit `ffmpeg` binary.
pub const FFMPEG_ENV: &str = "LIIKE_FFMPEG";

const GIF_FPS: u32 = 15;

/// `ffmpeg` to run: `LIIKE_FFMPEG`, then a bundled `ffmpeg-<arch>-<os>` next to the executable,
/// then `ffmpeg` from `PATH`.
pub fn ffmpeg_binary() -> PathBuf {
    if let Some(p) = std::env::var_os(FFMPEG_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(p);
    }
    bundled_binary().unwrap_or_else(|| PathBuf::from("ffmpeg"))
}

fn bundled_binary() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?;
    let name = format!(
        "ffmpeg-{}-{}{}",
        std::env::consts::ARCH,
        std::env::consts::OS,
        std::env::consts::EXE_SUFFIX
    );
    [dir.join(&name), dir.join("bin").join(&name)]
        .into_iter()
        .find(|p| p.is_file())
}

/// Return `true` when [`ffmpeg_binary`] can be invoked.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new(ffmpeg_binary())
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> LiikeResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Host family, which decides the hardware HEVC encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostOs {
    MacOs,
    Windows,
    Other,
}

impl HostOs {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "macos" => Self::MacOs,
            "windows" => Self::Windows,
            _ => Self::Other,
        }
    }
}

/// Output size rounded up to even dimensions (yuv420p needs them).
pub fn even_dimensions(width: u32, height: u32) -> (u32, u32) {
    (width + width % 2, height + height % 2)
}

/// Full `ffmpeg` argument list for a rawvideo-on-stdin session, output path last.
pub fn encoder_args(params: &EncodeParams, os: HostOs, overwrite: bool) -> Vec<String> {
    let mut args: Vec<String> = vec![
        if overwrite { "-y" } else { "-n" }.into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgba".into(),
        "-s".into(),
        format!("{}x{}", params.width, params.height),
        "-r".into(),
        fps_arg(params.fps),
        "-i".into(),
        "pipe:0".into(),
    ];

    let audio = params.audio.as_ref().filter(|_| params.format.supports_audio());
    if let Some(a) = audio {
        args.push("-i".into());
        args.push(a.to_string_lossy().into_owned());
        args.extend(["-map", "0:v:0", "-map", "1:a:0?"].map(String::from));
    }

    let (ew, eh) = even_dimensions(params.width, params.height);
    let scale = format!("scale={ew}:{eh}:flags=bilinear");
    let bt709 = [
        "-color_primaries",
        "bt709",
        "-color_trc",
        "bt709",
        "-colorspace",
        "bt709",
    ];

    match params.format {
        ExportFormat::Webm => {
            args.push("-vf".into());
            args.push(scale);
            args.extend(
                [
                    "-c:v",
                    "libvpx-vp9",
                    "-crf",
                    "28",
                    "-b:v",
                    "0",
                    "-pix_fmt",
                    "yuv420p",
                    "-deadline",
                    "realtime",
                    "-cpu-used",
                    "5",
                ]
                .map(String::from),
            );
            if audio.is_some() {
                args.extend(["-c:a", "libopus", "-shortest"].map(String::from));
            }
        }
        ExportFormat::Gif => {
            args.push("-vf".into());
            args.push(format!(
                "{scale},fps={GIF_FPS},split[s0][s1];[s0]palettegen=max_colors=128:stats_mode=diff[p];[s1][p]paletteuse=dither=bayer:bayer_scale=3"
            ));
            args.extend(["-loop", "0"].map(String::from));
        }
        ExportFormat::Mp4 | ExportFormat::Mov | ExportFormat::Png | ExportFormat::Webp => {
            args.push("-vf".into());
            args.push(scale);
            let codec: &[&str] = match (params.hardware_accel, os) {
                (true, HostOs::MacOs) => &[
                    "-c:v",
                    "hevc_videotoolbox",
                    "-pix_fmt",
                    "yuv420p",
                    "-q:v",
                    "70",
                    "-realtime",
                    "1",
                ],
                (true, HostOs::Windows) => &[
                    "-c:v",
                    "hevc_nvenc",
                    "-pix_fmt",
                    "yuv420p",
                    "-preset",
                    "p4",
                    "-tune",
                    "hq",
                    "-rc",
                    "vbr",
                    "-cq",
                    "24",
                ],
                _ => &[
                    "-c:v",
                    "libx265",
                    "-pix_fmt",
                    "yuv420p",
                    "-preset",
                    "veryfast",
                    "-crf",
                    "24",
                ],
            };
            args.extend(codec.iter().map(|s| s.to_string()));
            args.extend(["-tag:v", "hvc1", "-movflags", "+faststart"].map(String::from));
            args.extend(bt709.map(String::from));
            if audio.is_some() {
                args.extend(["-c:a", "aac", "-shortest"].map(String::from));
            }
        }
    }
    if audio.is_none() {
        args.push("-an".into());
    }
    // The muxer is chosen from the format, so temp file names need no particular extension.
    args.push("-f".into());
    args.push(muxer(params.format).into());
    args.push(params.output.to_string_lossy().into_owned());
    args
}

fn muxer(format: ExportFormat) -> &'static str {
    match format {
        ExportFormat::Webm => "webm",
        ExportFormat::Gif => "gif",
        ExportFormat::Mov => "mov",
        ExportFormat::Mp4 | ExportFormat::Png | ExportFormat::Webp => "mp4",
    }
}

fn fps_arg(fps: Fps) -> String {
    format!("{}/{}", fps.num, fps.den)
}

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    pub ffmpeg: PathBuf,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
    /// Bound on waiting for a killed process to exit.
    pub teardown_timeout: Duration,
}

impl Default for FfmpegSinkOpts {
    fn default() -> Self {
        Self {
            ffmpeg: ffmpeg_binary(),
            overwrite: true,
            teardown_timeout: Duration::from_millis(2000),
        }
    }
}

/// Sink that spawns `ffmpeg` and streams flattened RGBA frames to its stdin.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    child: Arc<Mutex<Option<Child>>>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    scratch: Vec<u8>,
    params: Option<EncodeParams>,
    last_idx: Option<FrameIndex>,
}

impl std::fmt::Debug for FfmpegSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegSink")
            .field("opts", &self.opts)
            .field("params", &self.params)
            .field("last_idx", &self.last_idx)
            .finish_non_exhaustive()
    }
}

impl FfmpegSink {
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: Arc::new(Mutex::new(None)),
            stdin: None,
            stderr_drain: None,
            scratch: Vec::new(),
            params: None,
            last_idx: None,
        }
    }

    fn take_stderr(&mut self) -> String {
        let bytes = self
            .stderr_drain
            .take()
            .and_then(|h| h.join().ok())
            .and_then(Result::ok)
            .unwrap_or_default();
        String::from_utf8_lossy(&bytes).trim().to_string()
    }

    /// Poll the child until it exits or `timeout` elapses (`None` waits indefinitely).
    fn wait_child(&self, timeout: Option<Duration>) -> LiikeResult<Option<std::process::ExitStatus>> {
        let start = Instant::now();
        loop {
            {
                let mut guard = self
                    .child
                    .lock()
                    .map_err(|_| LiikeError::encode("ffmpeg child lock poisoned"))?;
                let Some(child) = guard.as_mut() else {
                    return Ok(None);
                };
                if let Some(status) = child
                    .try_wait()
                    .map_err(|e| LiikeError::encode(format!("failed to poll ffmpeg: {e}")))?
                {
                    guard.take();
                    return Ok(Some(status));
                }
            }
            if timeout.is_some_and(|t| start.elapsed() >= t) {
                return Ok(None);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

impl EncodeSink for FfmpegSink {
    #[tracing::instrument(skip(self, params), fields(format = %params.format, w = params.width, h = params.height))]
    fn begin(&mut self, params: &EncodeParams) -> LiikeResult<()> {
        if params.width == 0 || params.height == 0 {
            return Err(LiikeError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if params.format.is_still() {
            return Err(LiikeError::validation(format!(
                "'{}' is a still format and is not streamed through ffmpeg",
                params.format
            )));
        }
        ensure_parent_dir(&params.output)?;
        if !self.opts.overwrite && params.output.exists() {
            return Err(LiikeError::validation(format!(
                "output file '{}' already exists",
                params.output.display()
            )));
        }

        let args = encoder_args(params, HostOs::current(), self.opts.overwrite);
        tracing::debug!(ffmpeg = %self.opts.ffmpeg.display(), ?args, "starting encoder");
        let mut child = Command::new(&self.opts.ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                LiikeError::encode(format!(
                    "failed to spawn '{}' (is ffmpeg installed?): {e}",
                    self.opts.ffmpeg.display()
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| LiikeError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| LiikeError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        self.scratch = vec![0u8; params.frame_bytes()];
        if let Ok(mut slot) = self.child.lock() {
            *slot = Some(child);
        }
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.params = Some(params.clone());
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameBuffer) -> LiikeResult<()> {
        let params = self
            .params
            .as_ref()
            .ok_or_else(|| LiikeError::encode("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(LiikeError::encode(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        if frame.width != params.width || frame.height != params.height {
            return Err(LiikeError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, params.width, params.height
            )));
        }
        if frame.premultiplied {
            flatten_premul_over_bg(&mut self.scratch, &frame.data, params.background)?;
        } else {
            flatten_straight_over_bg(&mut self.scratch, &frame.data, params.background)?;
        }
        self.last_idx = Some(idx);

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(LiikeError::encode("ffmpeg sink is already finalized"));
        };
        if let Err(e) = stdin.write_all(&self.scratch) {
            let stderr = if self.stdin.take().is_some() {
                let _ = self.wait_child(Some(self.opts.teardown_timeout));
                self.take_stderr()
            } else {
                String::new()
            };
            return Err(LiikeError::encode(format!(
                "failed to write frame {} to ffmpeg: {e}; {stderr}",
                idx.0
            )));
        }
        Ok(())
    }

    fn end(&mut self) -> LiikeResult<()> {
        if self.params.take().is_none() {
            return Err(LiikeError::encode("ffmpeg sink not started"));
        }
        drop(self.stdin.take());
        let status = self
            .wait_child(None)?
            .ok_or_else(|| LiikeError::encode("ffmpeg was killed before finishing"))?;
        let stderr = self.take_stderr();
        if !status.success() {
            return Err(LiikeError::encode(format!(
                "ffmpeg exited with status {status}: {stderr}"
            )));
        }
        Ok(())
    }

    fn abort(&mut self) {
        self.params = None;
        drop(self.stdin.take());
        if let Ok(mut guard) = self.child.lock()
            && let Some(child) = guard.as_mut()
        {
            let _ = child.kill();
        }
        match self.wait_child(Some(self.opts.teardown_timeout)) {
            Ok(Some(_)) | Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "ffmpeg teardown failed"),
        }
        // The drain thread ends once the pipe closes; it is not joined here.
        self.stderr_drain = None;
    }

    fn kill_switch(&self) -> Option<KillSwitch> {
        let child = self.child.clone();
        Some(KillSwitch::new(move || {
            if let Ok(mut guard) = child.lock()
                && let Some(c) = guard.as_mut()
            {
                let _ = c.kill();
            }
        }))
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.params.is_some() {
            self.abort();
        }
    }
}

fn flatten_premul_over_bg(dst: &mut [u8], src_premul: &[u8], bg: [u8; 4]) -> LiikeResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(LiikeError::validation(
            "flatten_premul_over_bg expects equal-length rgba8 buffers",
        ));
    }
    let (bg_r, bg_g, bg_b) = (u16::from(bg[0]), u16::from(bg[1]), u16::from(bg[2]));
    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255 - a;
        d[0] = (u16::from(s[0]) + mul_div255_u16(bg_r, inv)).min(255) as u8;
        d[1] = (u16::from(s[1]) + mul_div255_u16(bg_g, inv)).min(255) as u8;
        d[2] = (u16::from(s[2]) + mul_div255_u16(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }
    Ok(())
}

fn flatten_straight_over_bg(dst: &mut [u8], src: &[u8], bg: [u8; 4]) -> LiikeResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(LiikeError::validation(
            "flatten_straight_over_bg expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        let inv = 255 - a;
        for c in 0..3 {
            d[c] = (mul_div255_u16(u16::from(s[c]), a) + mul_div255_u16(u16::from(bg[c]), inv))
                .min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
