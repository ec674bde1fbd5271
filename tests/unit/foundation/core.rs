use super::*;

#[test]
fn fps_rejects_zero() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
    assert!(Fps::whole(30).is_ok());
}

#[test]
fn frame_to_ms_rounds_to_nearest() {
    let fps = Fps::whole(30).unwrap();
    assert_eq!(fps.frame_to_ms(FrameIndex(0)), 0);
    assert_eq!(fps.frame_to_ms(FrameIndex(1)), 33);
    assert_eq!(fps.frame_to_ms(FrameIndex(2)), 67);
    assert_eq!(fps.frame_to_ms(FrameIndex(30)), 1000);

    let ntsc = Fps::new(30_000, 1001).unwrap();
    assert_eq!(ntsc.frame_to_ms(FrameIndex(30)), 1001);
}

#[test]
fn frames_for_duration_rounds_up() {
    let fps = Fps::whole(10).unwrap();
    assert_eq!(fps.frames_for_duration(1000), 10);
    assert_eq!(fps.frames_for_duration(1001), 11);
    assert_eq!(fps.frames_for_duration(0), 1);

    let fps = Fps::whole(30).unwrap();
    assert_eq!(fps.frames_for_duration(4000), 120);
}

#[test]
fn canvas_scaled_by_quality() {
    let c = Canvas::new(1080, 1350).unwrap();
    assert_eq!(c.scaled(2).unwrap(), (2160, 2700));
    assert!(Canvas::new(0, 10).is_err());
}

#[test]
fn canvas_scale_overflow_is_a_validation_error() {
    let c = Canvas::new(u32::MAX / 2 + 1, 10).unwrap();
    let err = c.scaled(2).unwrap_err();
    assert_eq!(err.code(), "validation");
    assert!(Canvas::new(10, u32::MAX).unwrap().scaled(2).is_err());
}

#[test]
fn premul_from_straight() {
    assert_eq!(
        Rgba8Premul::from_straight_rgba(255, 128, 0, 128),
        Rgba8Premul {
            r: 128,
            g: 64,
            b: 0,
            a: 128
        }
    );
    assert_eq!(Rgba8Premul::transparent().to_array(), [0, 0, 0, 0]);
}
