use super::*;

#[test]
fn rejects_oversized_and_empty_surfaces() {
    assert!(Surface::new(70_000, 10).is_err());
    assert!(Surface::new(0, 10).is_err());
    assert!(Surface::new(16, 8).is_ok());
}

#[test]
fn fill_rect_paints_only_inside() {
    let mut s = Surface::new(8, 8).unwrap();
    s.begin_frame();
    s.fill_rect(Rect::new(0.0, 0.0, 4.0, 8.0), Rgba8::rgb(255, 0, 0));
    let f = s.snapshot();
    assert_eq!(f.data.len(), 8 * 8 * 4);
    assert_eq!(f.pixel(1, 1), [255, 0, 0, 255]);
    assert_eq!(f.pixel(6, 1)[3], 0);
}

#[test]
fn frames_do_not_accumulate() {
    let mut s = Surface::new(4, 4).unwrap();
    s.begin_frame();
    s.fill_rect(s.bounds(), Rgba8::rgb(0, 0, 255));
    let _ = s.snapshot();
    s.begin_frame();
    let f = s.snapshot();
    assert!(f.data.iter().all(|&b| b == 0));
}

#[test]
fn opacity_layer_scales_alpha() {
    let mut s = Surface::new(4, 4).unwrap();
    s.begin_frame();
    s.push_opacity(0.5);
    s.fill_rect(s.bounds(), Rgba8::rgb(255, 255, 255));
    s.pop_layer();
    let a = s.snapshot().pixel(2, 2)[3];
    assert!((120..=135).contains(&a), "alpha {a}");
}

#[test]
fn image_fill_stretches_into_destination() {
    let mut s = Surface::new(8, 8).unwrap();
    let img = SurfaceImage::from_straight_rgba8(&[0, 255, 0, 255], 1, 1).unwrap();
    s.begin_frame();
    s.fill_image(&img, s.bounds());
    let f = s.snapshot();
    assert_eq!(f.pixel(0, 0), [0, 255, 0, 255]);
    assert_eq!(f.pixel(7, 7), [0, 255, 0, 255]);
}

#[test]
fn premultiply_zeroes_transparent_pixels() {
    let mut px = [200, 100, 50, 0, 255, 255, 255, 128];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(px, [0, 0, 0, 0, 128, 128, 128, 128]);
}
