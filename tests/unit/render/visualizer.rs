use super::*;
use crate::audio::analyser::AnalysisKind;

fn params() -> VisualizerParams {
    VisualizerParams {
        color: Rgba8::rgb(255, 255, 255),
        sensitivity: 1.0,
        bar_count: 16,
    }
}

fn painted_pixels(surface: &mut Surface) -> usize {
    surface
        .snapshot()
        .data
        .chunks_exact(4)
        .filter(|px| px[3] > 0)
        .count()
}

#[test]
fn trigger_finds_rising_crossing() {
    let samples = [140, 120, 110, 127, 130, 150, 128, 100, 128, 128];
    assert_eq!(find_trigger(&samples), 4);
    assert_eq!(find_trigger(&[128; 16]), 0);
}

#[test]
fn bar_levels_average_the_lower_spectrum() {
    let mut spectrum = vec![0u8; 100];
    spectrum[..35].fill(255);
    let levels = bar_levels(&spectrum, 2, 1.0);
    assert_eq!(levels.len(), 2);
    assert!((levels[0] - 1.0).abs() < 1e-6);
    assert_eq!(levels[1], 0.0);

    let loud = bar_levels(&[128; 64], 4, 4.0);
    assert!(loud.iter().all(|&l| l == 1.0));
    assert!(bar_levels(&[], 4, 1.0).iter().all(|&l| l == 0.0));
}

#[test]
fn bass_energy_reads_lowest_bins() {
    let mut spectrum = vec![0u8; 1024];
    assert_eq!(bass_energy(&spectrum), 0.0);
    spectrum[..62].fill(255);
    assert!(bass_energy(&spectrum) > 0.9);
}

#[test]
fn catmull_rom_passes_through_points() {
    let pts = [
        Point::new(0.0, 0.0),
        Point::new(10.0, 0.0),
        Point::new(10.0, 10.0),
        Point::new(0.0, 10.0),
    ];
    let path = closed_catmull_rom(&pts);
    let ends: Vec<Point> = path
        .elements()
        .iter()
        .filter_map(|el| match el {
            kurbo::PathEl::CurveTo(_, _, p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(ends, [pts[1], pts[2], pts[3], pts[0]]);
    assert!(closed_catmull_rom(&pts[..2]).elements().is_empty());
}

#[test]
fn every_style_paints_deterministically() {
    let spectrum = AnalysisFrame {
        kind: AnalysisKind::Frequency,
        data: (0..1024).map(|i| (255 - i / 4) as u8).collect(),
    };
    let wave = AnalysisFrame {
        kind: AnalysisKind::TimeDomain,
        data: (0..2048)
            .map(|i| (128.0 + 100.0 * (i as f64 / 64.0 * TAU).sin()) as u8)
            .collect(),
    };
    for (style, frame) in [
        (VisualizerStyle::Wave, &wave),
        (VisualizerStyle::Bars, &spectrum),
        (VisualizerStyle::RadialRing, &spectrum),
        (VisualizerStyle::CircularWave, &spectrum),
    ] {
        let mut s = Surface::new(64, 48).unwrap();
        s.begin_frame();
        draw_visualizer(&mut s, style, frame, &params());
        let a = s.snapshot();
        s.begin_frame();
        draw_visualizer(&mut s, style, frame, &params());
        let b = s.snapshot();
        assert_eq!(a, b, "{style:?} is not deterministic");
        assert!(a.data.chunks_exact(4).any(|px| px[3] > 0), "{style:?} drew nothing");
    }

    let mut s = Surface::new(64, 48).unwrap();
    s.begin_frame();
    draw_visualizer(&mut s, VisualizerStyle::None, &spectrum, &params());
    assert_eq!(painted_pixels(&mut s), 0);
}
