use super::*;

const TH: SeekThresholds = SeekThresholds {
    scrub_ms: 30,
    jump_ms: 200,
    resync_ms: 1500,
};

fn view(position_ms: u64, target_ms: u64) -> ElementView {
    ElementView {
        state: SeekState::Ready,
        position_ms,
        target_ms,
    }
}

#[test]
fn scrub_holds_within_threshold() {
    let a = plan_seek(SyncMode::Scrub, Some(0), 1000, view(980, 1000), TH);
    assert_eq!(a, SeekAction::Hold);
    let a = plan_seek(SyncMode::Scrub, Some(0), 1000, view(960, 1000), TH);
    assert_eq!(a, SeekAction::HardSeek);
}

#[test]
fn continuity_advances_small_steps_even_with_drift() {
    let a = plan_seek(SyncMode::Continuity, Some(1000), 1033, view(900, 1033), TH);
    assert_eq!(a, SeekAction::Advance);
}

#[test]
fn continuity_resyncs_large_drift() {
    let a = plan_seek(SyncMode::Continuity, Some(5000), 5033, view(3000, 5033), TH);
    assert_eq!(a, SeekAction::HardSeek);
}

#[test]
fn continuity_treats_large_step_as_scrub() {
    let a = plan_seek(SyncMode::Continuity, Some(1000), 1500, view(1000, 1500), TH);
    assert_eq!(a, SeekAction::HardSeek);
    // backwards step is a jump too
    let a = plan_seek(SyncMode::Continuity, Some(1000), 900, view(1000, 900), TH);
    assert_eq!(a, SeekAction::HardSeek);
}

#[test]
fn continuity_first_sync_uses_scrub_rule() {
    let a = plan_seek(SyncMode::Continuity, None, 0, view(0, 0), TH);
    assert_eq!(a, SeekAction::Hold);
    let a = plan_seek(SyncMode::Continuity, None, 400, view(0, 400), TH);
    assert_eq!(a, SeekAction::HardSeek);
}

#[test]
fn in_flight_seek_to_same_target_holds() {
    let el = ElementView {
        state: SeekState::Seeking { target_ms: 700 },
        position_ms: 0,
        target_ms: 700,
    };
    assert_eq!(plan_seek(SyncMode::Scrub, None, 700, el, TH), SeekAction::Hold);
}

fn element(src: SyntheticVideo, clip_start_ms: u64) -> MediaElement {
    MediaElement::new(NodeId(1), clip_start_ms, ObjectFit::Cover, Box::new(src))
}

#[test]
fn relative_target_offsets_and_clamps() {
    let el = element(SyntheticVideo::new(4, 4, 2000, 30), 500);
    assert_eq!(el.relative_target(100), 0);
    assert_eq!(el.relative_target(1500), 1000);
    assert_eq!(el.relative_target(9000), 2000);
}

#[test]
fn scrub_sync_seeks_and_waits() {
    let src = SyntheticVideo::new(4, 4, 5000, 30).with_seek_latency(Duration::from_millis(20));
    let seeks = src.seek_counter();
    let mut el = element(src, 0);
    let out = el
        .sync_to(
            2000,
            SyncMode::Scrub,
            TH,
            Duration::from_secs(2),
            Duration::from_millis(300),
        )
        .unwrap();
    assert_eq!(out, SyncOutcome::Seeked);
    assert_eq!(el.state(), SeekState::Ready);
    assert_eq!(seeks.load(Ordering::SeqCst), 1);
    assert!(el.frame().is_some());
}

#[test]
fn stalled_seek_times_out_without_failing() {
    let mut el = element(SyntheticVideo::new(4, 4, 5000, 30).stalled(), 0);
    let started = Instant::now();
    let out = el
        .sync_to(
            2000,
            SyncMode::Scrub,
            TH,
            Duration::from_millis(50),
            Duration::from_millis(50),
        )
        .unwrap();
    assert_eq!(out, SyncOutcome::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(el.state(), SeekState::Ready);
}

#[test]
fn continuity_does_not_reseek_every_frame() {
    let src = SyntheticVideo::new(4, 4, 5000, 30);
    let seeks = src.seek_counter();
    let mut el = element(src, 0);
    for i in 0..30u64 {
        el.sync_to(
            i * 33,
            SyncMode::Continuity,
            TH,
            Duration::from_secs(1),
            Duration::from_millis(300),
        )
        .unwrap();
    }
    assert_eq!(seeks.load(Ordering::SeqCst), 0);
}

#[test]
fn synthetic_frames_depend_only_on_position() {
    let mut a = SyntheticVideo::new(2, 2, 5000, 10);
    let mut b = SyntheticVideo::new(2, 2, 5000, 10);
    let (tx, _rx) = mpsc::channel();
    a.start_seek(1200, tx);
    b.advance_to(600).unwrap();
    b.advance_to(1200).unwrap();
    assert_eq!(a.current_frame(), b.current_frame());
}

#[test]
fn synthetic_uri_parses() {
    let v = SyntheticVideo::from_uri("synthetic://320x240/4000?fps=25").unwrap();
    assert_eq!(v.size(), (320, 240));
    assert_eq!(v.duration_ms(), 4000);
    assert!(SyntheticVideo::from_uri("synthetic://320/4000").is_err());
}

/// Decodes through `inner` for `advances_left` advances, then errors on every advance.
struct DyingDecoder {
    inner: SyntheticVideo,
    advances_left: usize,
}

impl VideoSource for DyingDecoder {
    fn size(&self) -> (u32, u32) {
        self.inner.size()
    }

    fn duration_ms(&self) -> u64 {
        self.inner.duration_ms()
    }

    fn position_ms(&mut self) -> u64 {
        self.inner.position_ms()
    }

    fn start_seek(&mut self, target_ms: u64, events: Sender<MediaEvent>) {
        self.inner.start_seek(target_ms, events);
    }

    fn advance_to(&mut self, target_ms: u64) -> LiikeResult<()> {
        if self.advances_left == 0 {
            // The position still moves, so a fresh read would differ from the last good frame.
            self.inner.advance_to(target_ms)?;
            return Err(LiikeError::resource("test://dying", "decoder died"));
        }
        self.advances_left -= 1;
        self.inner.advance_to(target_ms)
    }

    fn current_frame(&mut self) -> Option<VideoFrame> {
        self.inner.current_frame()
    }
}

#[test]
fn failed_advance_keeps_previous_frame_and_is_not_fatal() {
    let src = DyingDecoder {
        inner: SyntheticVideo::new(2, 2, 5000, 10),
        advances_left: 1,
    };
    let mut el = MediaElement::new(NodeId(1), 0, ObjectFit::Cover, Box::new(src));
    let sync = |el: &mut MediaElement, t: u64, mode: SyncMode| {
        el.sync_to(t, mode, TH, Duration::from_secs(1), Duration::from_millis(300))
    };

    assert_eq!(sync(&mut el, 0, SyncMode::Scrub).unwrap(), SyncOutcome::Held);
    assert_eq!(sync(&mut el, 100, SyncMode::Continuity).unwrap(), SyncOutcome::Advanced);
    let good = el.frame().cloned().unwrap();

    let out = sync(&mut el, 200, SyncMode::Continuity).unwrap();
    assert_eq!(out, SyncOutcome::Stale);
    assert_eq!(el.frame(), Some(&good));
    assert_eq!(el.state(), SeekState::Ready);
    assert_eq!(el.last_synced_ms(), Some(200));

    // Later hard seeks still work.
    assert_eq!(sync(&mut el, 3000, SyncMode::Scrub).unwrap(), SyncOutcome::Seeked);
    assert_ne!(el.frame(), Some(&good));
}
