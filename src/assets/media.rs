use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::foundation::error::{LiikeError, LiikeResult};
use crate::timeline::media::{MediaEvent, VideoFrame, VideoSource};

#[derive(Clone, Debug)]
/// Basic metadata about a source video file.
pub struct VideoSourceInfo {
    pub source_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub duration_ms: u64,
    pub has_audio: bool,
}

/// Probe source video metadata through `ffprobe`.
pub fn probe_video(source_path: &Path) -> LiikeResult<VideoSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| LiikeError::io(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(LiikeError::resource(
            source_path.display().to_string(),
            format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            ),
        ));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| LiikeError::serde(format!("ffprobe json parse failed: {e}")))?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| {
            LiikeError::resource(source_path.display().to_string(), "no video stream found")
        })?;
    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(LiikeError::resource(
                source_path.display().to_string(),
                "missing video dimensions from ffprobe",
            ));
        }
    };
    let secs = video
        .duration
        .as_deref()
        .or(parsed.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(VideoSourceInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        duration_ms: (secs * 1000.0).round().max(0.0) as u64,
        has_audio: parsed
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio")),
    })
}

/// Running `ffmpeg` decode producing sequential raw RGBA frames at a fixed rate.
struct FrameStream {
    child: Child,
    stdout: ChildStdout,
    start_ms: u64,
    /// Frames read so far; the last one read is at `start_ms + (read - 1) * step`.
    read: u64,
    eof: bool,
}

impl FrameStream {
    fn spawn(ffmpeg: &Path, info: &VideoSourceInfo, start_ms: u64, fps: u32) -> LiikeResult<Self> {
        let mut child = Command::new(ffmpeg)
            .args(["-v", "error", "-ss", &format!("{:.3}", start_ms as f64 / 1000.0)])
            .arg("-i")
            .arg(&info.source_path)
            .args([
                "-an",
                "-vf",
                &format!("fps={fps}"),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| LiikeError::io(format!("failed to spawn ffmpeg for video decode: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LiikeError::io("failed to open ffmpeg stdout (unexpected)"))?;
        Ok(Self {
            child,
            stdout,
            start_ms,
            read: 0,
            eof: false,
        })
    }

    fn read_frame(&mut self, buf: &mut [u8]) -> bool {
        if self.eof {
            return false;
        }
        match self.stdout.read_exact(buf) {
            Ok(()) => {
                self.read += 1;
                true
            }
            Err(_) => {
                self.eof = true;
                false
            }
        }
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

struct LoadedStream {
    stream: FrameStream,
    frame: Option<Vec<u8>>,
}

/// [`VideoSource`] backed by the system `ffmpeg`.
///
/// Playback keeps one decode process streaming forward; a seek restarts the stream at the
/// target on a helper thread and reports completion once its first frame is decoded.
pub struct FfmpegVideoSource {
    ffmpeg: PathBuf,
    info: Arc<VideoSourceInfo>,
    fps: u32,
    stream: Option<FrameStream>,
    pending: Option<Receiver<LiikeResult<LoadedStream>>>,
    frame: Option<Arc<Vec<u8>>>,
    position_ms: u64,
}

impl FfmpegVideoSource {
    /// Probe `path` and prepare decoding at `fps` frames per second.
    pub fn open(ffmpeg: impl Into<PathBuf>, path: &Path, fps: u32) -> LiikeResult<Self> {
        if fps == 0 {
            return Err(LiikeError::validation("video decode fps must be > 0"));
        }
        let info = probe_video(path)?;
        Ok(Self {
            ffmpeg: ffmpeg.into(),
            info: Arc::new(info),
            fps,
            stream: None,
            pending: None,
            frame: None,
            position_ms: 0,
        })
    }

    pub fn info(&self) -> &VideoSourceInfo {
        &self.info
    }

    fn frame_len(&self) -> usize {
        self.info.width as usize * self.info.height as usize * 4
    }

    fn step_ms(&self) -> f64 {
        1000.0 / f64::from(self.fps)
    }

    fn absorb_pending(&mut self) {
        let Some(rx) = self.pending.as_ref() else {
            return;
        };
        match rx.try_recv() {
            Ok(Ok(loaded)) => {
                self.position_ms = loaded.stream.start_ms;
                self.stream = Some(loaded.stream);
                if let Some(f) = loaded.frame {
                    self.frame = Some(Arc::new(f));
                }
                self.pending = None;
            }
            Ok(Err(e)) => {
                tracing::warn!(source = %self.info.source_path.display(), "video seek failed: {e}");
                self.pending = None;
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => self.pending = None,
        }
    }
}

impl VideoSource for FfmpegVideoSource {
    fn size(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn duration_ms(&self) -> u64 {
        self.info.duration_ms
    }

    fn position_ms(&mut self) -> u64 {
        self.absorb_pending();
        self.position_ms
    }

    fn start_seek(&mut self, target_ms: u64, events: Sender<MediaEvent>) {
        self.stream = None;
        let (tx, rx) = mpsc::channel();
        self.pending = Some(rx);

        let ffmpeg = self.ffmpeg.clone();
        let info = self.info.clone();
        let fps = self.fps;
        let len = self.frame_len();
        std::thread::spawn(move || {
            let loaded = FrameStream::spawn(&ffmpeg, &info, target_ms, fps).map(|mut stream| {
                let mut buf = vec![0u8; len];
                let frame = stream.read_frame(&mut buf).then_some(buf);
                LoadedStream { stream, frame }
            });
            let event = match &loaded {
                Ok(_) => MediaEvent::Seeked { target_ms },
                Err(e) => MediaEvent::Error(e.to_string()),
            };
            // Stream state must land before the completion event is observed.
            if tx.send(loaded).is_ok() {
                let _ = events.send(event);
            }
        });
    }

    fn advance_to(&mut self, target_ms: u64) -> LiikeResult<()> {
        self.absorb_pending();
        if self.pending.is_some() {
            // A seek is still in flight; its frame is the best we have.
            return Ok(());
        }
        if self.stream.is_none() {
            self.stream = Some(FrameStream::spawn(
                &self.ffmpeg,
                &self.info,
                self.position_ms,
                self.fps,
            )?);
        }

        let step = self.step_ms();
        let len = self.frame_len();
        let Some(stream) = self.stream.as_mut() else {
            return Ok(());
        };
        let mut buf = vec![0u8; len];
        loop {
            let next_ms = stream.start_ms as f64 + stream.read as f64 * step;
            if next_ms > target_ms as f64 + 0.5 {
                break;
            }
            if !stream.read_frame(&mut buf) {
                break;
            }
            self.frame = Some(Arc::new(std::mem::replace(&mut buf, vec![0u8; len])));
            self.position_ms = next_ms.round() as u64;
        }
        Ok(())
    }

    fn current_frame(&mut self) -> Option<VideoFrame> {
        self.absorb_pending();
        self.frame.as_ref().map(|rgba| VideoFrame {
            width: self.info.width,
            height: self.info.height,
            rgba: rgba.clone(),
        })
    }
}
