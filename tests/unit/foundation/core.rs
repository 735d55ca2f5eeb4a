use super::*;

#[test]
fn fps_ceil_counts_partial_frames() {
    let fps = Fps::new(60, 1).unwrap();
    assert_eq!(fps.secs_to_frames_ceil(3.0), 180);
    assert_eq!(fps.secs_to_frames_ceil(3.001), 181);
    assert_eq!(fps.secs_to_frames_ceil(0.0), 0);
    assert_eq!(fps.secs_to_frames_ceil(f64::NAN), 0);
}

#[test]
fn fps_rejects_zero() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
}

#[test]
fn hex_colors_parse_and_roundtrip_through_serde() {
    let c = Rgba8::parse_hex("#FF8000").unwrap();
    assert_eq!(c, Rgba8::rgb(255, 128, 0));
    let c = Rgba8::parse_hex("00000080").unwrap();
    assert_eq!(c.a, 128);
    assert!(Rgba8::parse_hex("#abc").is_err());

    let json = serde_json::to_string(&Rgba8::rgb(1, 2, 3)).unwrap();
    assert_eq!(json, "\"#010203\"");
    let back: Rgba8 = serde_json::from_str(&json).unwrap();
    assert_eq!(back, Rgba8::rgb(1, 2, 3));
}

#[test]
fn premul_scales_channels_by_alpha() {
    let c = Rgba8 {
        r: 255,
        g: 255,
        b: 255,
        a: 128,
    };
    assert_eq!(c.to_premul(), [128, 128, 128, 128]);
    assert_eq!(Rgba8::rgb(10, 20, 30).with_opacity(0.0).a, 0);
}
