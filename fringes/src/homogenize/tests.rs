use super::*;

#[test]
fn test_fft_blur_keeps_constant() {
    let image = Buffer2::new_filled(16, 12, 5.0);
    let blurred = fft_blur(&image, 3.0);
    for v in blurred.iter() {
        assert!((v - 5.0).abs() < 1e-10);
    }
}

#[test]
fn test_fft_blur_preserves_mass_and_spreads_impulse() {
    let mut image = Buffer2::new_default(32, 32);
    image[(16, 16)] = 1.0;
    let blurred = fft_blur(&image, 2.0);
    let total: f64 = blurred.iter().sum();
    assert!((total - 1.0).abs() < 1e-10);
    assert!(blurred[(16, 16)] < 1.0);
    assert!(blurred[(16, 16)] > blurred[(18, 16)]);
    // periodic Gaussian of sigma 2: peak ≈ 1 / (2π σ²)
    assert!((blurred[(16, 16)] - 1.0 / (8.0 * PI)).abs() < 1e-3);
}

#[test]
fn test_homogenize_flattens_smooth_illumination() {
    // fringes on a slow illumination ramp
    let image = Buffer2::from_fn(64, 64, |x, _| {
        let envelope = 2.0 + (2.0 * PI * x as f64 / 64.0).cos();
        envelope * (2.0 + (2.0 * PI * x as f64 / 4.0).cos())
    });
    let (flat, replaced) = homogenize(&image, 4.0, 0.0);
    assert_eq!(replaced, 0);
    let mean: f64 = flat.iter().sum::<f64>() / flat.len() as f64;
    assert!((mean - 1.0).abs() < 0.05);
}

#[test]
fn test_homogenize_zero_image_replaced() {
    let image = Buffer2::new_default(8, 8);
    let (flat, replaced) = homogenize(&image, 2.0, 0.0);
    assert_eq!(replaced, 64);
    assert!(flat.iter().all(|&v| v == 0.0));
}

#[test]
fn test_homogenize_blur_smooths_result() {
    let image = Buffer2::from_fn(32, 32, |x, y| 1.0 + ((x + y) % 2) as f64);
    let (sharp, _) = homogenize(&image, 4.0, 0.0);
    let (smooth, _) = homogenize(&image, 4.0, 1.5);
    let spread = |b: &Buffer2<f64>| {
        let max = b.iter().cloned().fold(f64::MIN, f64::max);
        let min = b.iter().cloned().fold(f64::MAX, f64::min);
        max - min
    };
    assert!(spread(&smooth) < spread(&sharp));
}
