use super::*;
use crate::config::DetectionMethod;
use crate::testing::{horizontal_fringes, init_tracing, vertical_fringes, wrapped_difference};
use crate::window::WindowKind;

/// DoG settings tuned for a 256×256 frame with a sharp carrier.
fn scenario_parameters() -> Parameters {
    Parameters {
        window: true,
        window_kind: WindowKind::Hann,
        transform_size: 0,
        method: DetectionMethod::Dog,
        min_sigma: 1.0,
        max_sigma: 3.0,
        target_blob_count: 3,
        auto_detect: true,
        threshold: 0.9,
        steps_per_decade: 20,
        ..Default::default()
    }
}

#[test]
fn test_dog_scenario_finds_dc_and_sidebands() {
    init_tracing();
    let frame = vertical_fringes(256, 256, 32.25, 0.1, 7);
    let analyzer = Analyzer::new(scenario_parameters()).unwrap();
    let analysis = analyzer.analyze(&frame);

    let diagnostics = &analysis.diagnostics;
    assert_eq!(diagnostics.spectrum_size, (256, 256));
    assert_eq!(diagnostics.blob_count, 3);
    assert!(diagnostics.detector_error.is_none());

    let mut positions: Vec<(f64, f64)> = diagnostics.blobs.iter().map(|b| (b.x, b.y)).collect();
    positions.sort_by(|a, b| a.0.total_cmp(&b.0));
    assert_eq!(positions, vec![(96.0, 128.0), (128.0, 128.0), (160.0, 128.0)]);

    let selected = diagnostics.selected_blob.unwrap();
    assert_eq!((selected.x, selected.y), (96.0, 128.0));

    let Outcome::Found(result) = &analysis.outcome else {
        panic!("expected a phase result");
    };
    assert_eq!(result.main_blob, selected);
    assert_eq!(result.phase.dimensions(), (256, 256));
    assert_eq!(result.phase[(127, 127)], 0.0);
    assert!(result.phase.iter().all(|p| (-1.0..=1.0).contains(p)));

    // residual carrier of -0.25 cycles per frame: phase falls along x
    let gradient = wrapped_difference(result.phase[(158, 128)], result.phase[(98, 128)]);
    assert!(gradient < 0.0, "gradient {gradient}");
    assert!(gradient > -0.2, "gradient {gradient}");
}

#[test]
fn test_pick_opposite_selects_other_sideband() {
    let frame = vertical_fringes(256, 256, 32.25, 0.1, 7);
    let analyzer = Analyzer::new(Parameters {
        pick_opposite: true,
        ..scenario_parameters()
    })
    .unwrap();
    let analysis = analyzer.analyze(&frame);
    let selected = analysis.diagnostics.selected_blob.unwrap();
    assert_eq!((selected.x, selected.y), (160.0, 128.0));
}

#[test]
fn test_horizontal_fringes_select_vertical_axis() {
    let frame = horizontal_fringes(256, 256, 32.25, 0.1, 11);
    let analysis = Analyzer::new(scenario_parameters()).unwrap().analyze(&frame);
    assert_eq!(analysis.diagnostics.blob_count, 3);
    let selected = analysis.diagnostics.selected_blob.unwrap();
    assert_eq!((selected.x, selected.y), (128.0, 96.0));
}

#[test]
fn test_all_zero_frame_is_not_found() {
    init_tracing();
    let frame = Buffer2::new_default(64, 48);
    let analysis = Analyzer::new(Parameters::default()).unwrap().analyze(&frame);

    assert!(!analysis.outcome.is_found());
    assert_eq!(analysis.diagnostics.blob_count, 0);
    assert_eq!(analysis.diagnostics.selected_blob, None);
    assert_eq!(analysis.diagnostics.log_power_replaced, 64 * 48);

    let Outcome::NotFound { amplitude, phase } = &analysis.outcome else {
        panic!("expected NotFound");
    };
    assert_eq!(amplitude.dimensions(), (64, 48));
    assert_eq!(phase.dimensions(), (64, 48));
    assert!(amplitude.iter().chain(phase.iter()).all(|&v| v == 0.0));
    assert!(analysis.log_power.iter().all(|&v| v == 0.0));
}

#[test]
fn test_empty_frame_records_detector_error() {
    let frame: Buffer2<f64> = Buffer2::new(0, 0, Vec::new());
    let analysis = Analyzer::new(Parameters::default()).unwrap().analyze(&frame);
    assert!(!analysis.outcome.is_found());
    assert_eq!(analysis.diagnostics.blob_count, 0);
    assert!(analysis
        .diagnostics
        .detector_error
        .as_deref()
        .is_some_and(|e| e.contains("empty")));
}

#[test]
fn test_fixed_blob_skips_detection() {
    let frame = vertical_fringes(64, 64, 8.0, 0.0, 0);
    let blob = Blob::new(24.0, 32.0, 2.0);
    let analyzer = Analyzer::new(Parameters {
        auto_detect: false,
        fixed_blob: Some(blob),
        transform_size: 0,
        window: false,
        ..Default::default()
    })
    .unwrap();
    let analysis = analyzer.analyze(&frame);

    assert_eq!(analysis.diagnostics.threshold_used, None);
    assert_eq!(analysis.diagnostics.detection_attempts, 0);
    assert_eq!(analysis.diagnostics.selected_blob, Some(blob));
    let Outcome::Found(result) = analysis.outcome else {
        panic!("expected a phase result");
    };
    // an exact carrier without windowing leaves a flat field
    for (a, p) in result.amplitude.iter().zip(result.phase.iter()) {
        assert!((a - 1.0).abs() < 1e-9);
        assert!(p.abs() < 1e-9);
    }
}

#[test]
fn test_transform_size_crops_spectrum() {
    let frame = vertical_fringes(96, 80, 10.0, 0.0, 0);
    let analyzer = Analyzer::new(Parameters {
        transform_size: 48,
        ..Default::default()
    })
    .unwrap();
    let analysis = analyzer.analyze(&frame);
    assert_eq!(analysis.diagnostics.spectrum_size, (48, 48));
    assert_eq!(analysis.log_power.dimensions(), (48, 48));
    assert_eq!(analysis.outcome.phase().dimensions(), (48, 48));
}

#[test]
fn test_homogenize_path_runs() {
    let frame = vertical_fringes(64, 64, 8.0, 0.05, 3);
    let analyzer = Analyzer::new(Parameters {
        homogenize: true,
        homogenize_blur: 1.0,
        transform_size: 0,
        ..Default::default()
    })
    .unwrap();
    let analysis = analyzer.analyze(&frame);
    assert_eq!(analysis.diagnostics.homogenize_replaced, 0);
    assert_eq!(analysis.outcome.amplitude().dimensions(), (64, 64));
}

#[test]
fn test_invalid_parameters_rejected_at_construction() {
    let err = Analyzer::new(Parameters {
        overlap: 2.0,
        ..Default::default()
    })
    .unwrap_err();
    assert!(matches!(err, ConfigError::OutOfRange { name: "overlap", .. }));
}

#[test]
fn test_stages_run_from_idle_to_done() {
    let analyzer = Analyzer::new(scenario_parameters()).unwrap();

    let found = analyzer.analyze(&vertical_fringes(256, 256, 32.25, 0.1, 7));
    assert_eq!(
        found.diagnostics.stages,
        vec![
            Stage::Idle,
            Stage::Transforming,
            Stage::Detecting,
            Stage::Found,
            Stage::Done
        ]
    );

    let missing = analyzer.analyze(&Buffer2::new_default(64, 48));
    assert_eq!(
        missing.diagnostics.stages,
        vec![
            Stage::Idle,
            Stage::Transforming,
            Stage::Detecting,
            Stage::NotFound,
            Stage::Done
        ]
    );
}

#[test]
fn test_stage_names() {
    assert_eq!(Stage::NotFound.to_string(), "NotFound");
    assert_eq!(Stage::Transforming.to_string(), "Transforming");
}
