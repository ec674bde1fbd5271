use super::*;

fn scratch(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("liike-still-{name}-{}", std::process::id()))
}

fn half_red() -> FrameBuffer {
    FrameBuffer::from_premul(2, 1, vec![128, 0, 0, 128, 0, 0, 255, 255]).unwrap()
}

#[test]
fn png_is_written_with_straight_alpha() {
    let dir = scratch("png");
    let path = dir.join("nested").join("shot.png");
    write_still(&half_red(), ExportFormat::Png, &path).unwrap();

    let img = image::open(&path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (2, 1));
    assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 128]);
    assert_eq!(img.get_pixel(1, 0).0, [0, 0, 255, 255]);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn webp_is_lossless() {
    let dir = scratch("webp");
    let path = dir.join("shot.webp");
    write_still(&half_red(), ExportFormat::Webp, &path).unwrap();

    let img = image::open(&path).unwrap().to_rgba8();
    assert_eq!(img.get_pixel(1, 0).0, [0, 0, 255, 255]);
    assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 128]);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn video_formats_are_rejected() {
    let dir = scratch("reject");
    let err = write_still(&half_red(), ExportFormat::Mp4, &dir.join("x.mp4")).unwrap_err();
    assert_eq!(err.code(), "validation");
    let _ = std::fs::remove_dir_all(dir);
}
