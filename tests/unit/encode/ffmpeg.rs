use super::*;
use crate::encode::sink::AudioInputConfig;

fn cfg(encoder: EncoderSettings, audio: bool) -> SinkConfig {
    SinkConfig {
        width: 640,
        height: 360,
        fps: Fps::new(30000, 1001).unwrap(),
        encoder,
        audio: audio.then(|| AudioInputConfig {
            path: PathBuf::from("/tmp/track.f32le"),
            sample_rate: 48_000,
            channels: 2,
        }),
    }
}

fn strings(args: Vec<OsString>) -> Vec<String> {
    args.into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

fn has_pair(args: &[String], k: &str, v: &str) -> bool {
    args.windows(2).any(|w| w[0] == k && w[1] == v)
}

#[test]
fn file_target_with_audio() {
    let args = strings(encode_args(
        &cfg(EncoderSettings::default(), true),
        &OutputTarget::File(PathBuf::from("out/video.mp4")),
        true,
    ));
    assert_eq!(args[0], "-y");
    assert!(has_pair(&args, "-s", "640x360"));
    assert!(has_pair(&args, "-r", "30000/1001"));
    assert!(has_pair(&args, "-i", "/tmp/track.f32le"));
    assert!(has_pair(&args, "-c:v", "libx264"));
    assert!(has_pair(&args, "-c:a", "aac"));
    assert!(has_pair(&args, "-b:v", "8000k"));
    assert!(has_pair(&args, "-b:a", "192k"));
    assert!(args.contains(&"-shortest".to_owned()));
    assert!(!args.contains(&"-maxrate".to_owned()));
    assert_eq!(args.last().map(String::as_str), Some("out/video.mp4"));
}

#[test]
fn memory_target_is_fragmented_mp4_on_stdout() {
    let args = strings(encode_args(
        &cfg(EncoderSettings::default(), false),
        &OutputTarget::Memory,
        false,
    ));
    assert_eq!(args[0], "-n");
    assert!(args.contains(&"-an".to_owned()));
    assert!(has_pair(&args, "-movflags", "frag_keyframe+empty_moov"));
    assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
}

#[test]
fn constant_bitrate_vp9_opus() {
    let enc = EncoderSettings {
        video_codec: VideoCodec::Vp9,
        video_bitrate_kbps: 4000,
        bitrate_mode: BitrateMode::Constant,
        audio_codec: AudioCodec::Opus,
        audio_bitrate_kbps: 128,
    };
    let args = strings(encode_args(
        &cfg(enc, true),
        &OutputTarget::Memory,
        true,
    ));
    assert!(has_pair(&args, "-c:v", "libvpx-vp9"));
    assert!(has_pair(&args, "-minrate", "4000k"));
    assert!(has_pair(&args, "-maxrate", "4000k"));
    assert!(has_pair(&args, "-bufsize", "8000k"));
    assert!(has_pair(&args, "-c:a", "libopus"));
    assert!(has_pair(&args, "-b:a", "128k"));
}

#[test]
fn odd_size_is_rejected_before_spawning() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(OutputTarget::Memory));
    let mut c = cfg(EncoderSettings::default(), false);
    c.width = 641;
    assert!(matches!(sink.begin(c), Err(LyrisyncError::Validation(_))));
}

#[test]
fn push_before_begin_is_an_error() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(OutputTarget::Memory));
    let frame = FrameRGBA {
        width: 2,
        height: 2,
        data: vec![0; 16],
    };
    assert!(sink.push_frame(FrameIndex(0), &frame).is_err());
}

#[test]
fn flatten_premul_alpha_0_returns_bg() {
    let src = vec![0u8, 0, 0, 0];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, vec![10, 20, 30, 255]);
}

#[test]
fn flatten_premul_half_alpha_blends() {
    let src = vec![100u8, 0, 0, 128];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [0, 0, 200, 255]).unwrap();
    assert_eq!(dst, vec![100, 0, 100, 255]);
}
