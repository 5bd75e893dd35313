use super::*;
use crate::mask::mask_and_shift;
use crate::spectrum::forward;

#[test]
fn test_reference_pixel_saturates() {
    assert_eq!(reference_pixel(256, 200), (127, 99));
    assert_eq!(reference_pixel(1, 3), (0, 0));
}

#[test]
fn test_phase_shift_center_zeroes_reference_and_stays_in_range() {
    let mut phase = Buffer2::from_fn(8, 6, |x, y| ((x * 7 + y * 3) % 20) as f64 / 10.0 - 1.0);
    phase_shift_center(&mut phase);
    assert_eq!(phase[(3, 2)], 0.0);
    assert!(phase.iter().all(|&p| (-1.0..1.0).contains(&p)));
}

#[test]
fn test_phase_shift_center_uses_euclidean_modulo() {
    // reference 0.9, sample -0.9: difference -1.8 wraps to +0.2
    let mut phase = Buffer2::new(2, 2, vec![0.9, -0.9, 0.0, 0.0]);
    phase_shift_center(&mut phase);
    assert_eq!(phase[(0, 0)], 0.0);
    assert!((phase[(1, 0)] - 0.2).abs() < 1e-12);
    assert!((phase[(0, 1)] + 0.9).abs() < 1e-12);
}

#[test]
fn test_extract_phase_of_tilted_plane_wave() {
    // a pure plane wave: the sideband holds the full field
    let (w, h) = (32, 32);
    let image = Buffer2::from_fn(w, h, |x, _| (2.0 * PI * 4.0 * x as f64 / w as f64).cos());
    let spectrum = forward(&image, 0);
    // DC at 16, the negative-frequency sideband at 12
    let blob = Blob::new(12.0, 16.0, 1.0);
    assert!(spectrum[(12, 16)].norm() > 100.0);

    let shifted = mask_and_shift(&spectrum, &blob);
    let result = extract_phase(&shifted, blob, None, true);
    assert_eq!(result.main_blob, blob);
    assert_eq!(result.phase[(15, 15)], 0.0);

    // carrier removed: flat amplitude, flat phase
    for (a, p) in result.amplitude.iter().zip(result.phase.iter()) {
        assert!((a - 0.5).abs() < 1e-9);
        assert!(p.abs() < 1e-9);
    }
}

#[test]
fn test_extract_phase_without_reference_keeps_raw_phase() {
    let mut spectrum = Buffer2::new_default(8, 8);
    spectrum[(4, 4)] = Complex64::from_polar(64.0, 0.5 * PI);
    let result = extract_phase(&spectrum, Blob::new(4.0, 4.0, 1.0), None, false);
    for p in result.phase.iter() {
        assert!((p - 0.5).abs() < 1e-12);
    }
    let result = extract_phase(&spectrum, Blob::new(4.0, 4.0, 1.0), None, true);
    assert!(result.phase.iter().all(|p| p.abs() < 1e-12));
}

#[test]
fn test_extract_phase_with_inverse_window() {
    let mut spectrum = Buffer2::new_default(8, 8);
    spectrum[(3, 4)] = Complex64::new(64.0, 0.0);
    let blob = Blob::new(3.0, 4.0, 1.0);
    let plain = extract_phase(&spectrum, blob, None, false);
    let windowed = extract_phase(&spectrum, blob, Some(WindowKind::Hann), false);

    let hann = WindowKind::Hann.coefficients(8);
    assert!((plain.amplitude[(0, 0)] - 1.0).abs() < 1e-12);
    assert!((windowed.amplitude[(0, 0)] - hann[3] * hann[4]).abs() < 1e-12);
    assert!(windowed.amplitude[(0, 0)] < 1.0);
}

#[test]
fn test_phase_to_rgb_channels() {
    let amplitude = Buffer2::new(2, 1, vec![2.0, 1.0]);
    let phase = Buffer2::new(2, 1, vec![0.5, 0.0]);
    let rgb = phase_to_rgb(&amplitude, &phase);
    // full brightness, phase π/2: red channel at its maximum
    assert!((rgb[(0, 0)][0] - 1.0).abs() < 1e-12);
    // half brightness, phase 0: red at mid level
    assert!((rgb[(1, 0)][0] - 0.25).abs() < 1e-12);
    assert!(rgb.iter().flatten().all(|&c| (0.0..=1.0).contains(&c)));
}

#[test]
fn test_phase_to_rgb_zero_amplitude_is_black() {
    let amplitude = Buffer2::new_default(3, 3);
    let phase = Buffer2::new_filled(3, 3, 0.3);
    let rgb = phase_to_rgb(&amplitude, &phase);
    assert!(rgb.iter().all(|c| *c == [0.0; 3]));
}
