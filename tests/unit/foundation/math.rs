use super::*;

#[test]
fn mul_div255_rounds() {
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(128, 255), 128);
    assert_eq!(mul_div255_u16(0, 200), 0);
    assert_eq!(mul_div255_u8(255, 128), 128);
}

#[test]
fn unpremultiply_restores_straight_channels() {
    let mut px = vec![100u8, 50, 25, 128, 7, 7, 7, 0, 9, 8, 7, 255];
    unpremultiply_rgba8_in_place(&mut px);
    assert_eq!(px, vec![199, 100, 50, 128, 7, 7, 7, 0, 9, 8, 7, 255]);
}

#[test]
fn over_opaque_source_replaces_destination() {
    let mut dst = vec![10u8, 20, 30, 255];
    premul_over_in_place_opacity(&mut dst, &[200, 100, 0, 255], 1.0).unwrap();
    assert_eq!(dst, vec![200, 100, 0, 255]);
}

#[test]
fn over_zero_opacity_is_noop() {
    let mut dst = vec![10u8, 20, 30, 255];
    premul_over_in_place_opacity(&mut dst, &[200, 100, 0, 255], 0.0).unwrap();
    assert_eq!(dst, vec![10, 20, 30, 255]);
}

#[test]
fn blur_radius_0_is_identity() {
    let src = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
    let out = blur_rgba8_premul(&src, 1, 2, 0, 1.0).unwrap();
    assert_eq!(out, src);
}

#[test]
fn blur_constant_image_is_identity() {
    let (w, h) = (4u32, 3u32);
    let px = [10u8, 20u8, 30u8, 40u8];
    let src = px.repeat((w * h) as usize);
    let out = blur_rgba8_premul(&src, w, h, 3, 2.0).unwrap();
    assert_eq!(out, src);
}

#[test]
fn blur_spreads_energy_from_single_pixel() {
    let (w, h) = (5u32, 5u32);
    let mut src = vec![0u8; (w * h * 4) as usize];
    let center = ((2 * w + 2) * 4) as usize;
    src[center..center + 4].copy_from_slice(&[255, 255, 255, 255]);

    let out = blur_rgba8_premul(&src, w, h, 2, 1.2).unwrap();

    let nonzero = out.chunks_exact(4).filter(|px| px[3] != 0).count();
    assert!(nonzero > 1);

    let sum_a: u32 = out.chunks_exact(4).map(|px| u32::from(px[3])).sum();
    assert!((sum_a as i32 - 255).abs() <= 4);
}
