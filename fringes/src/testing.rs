//! Testing utilities for fringes.

#![allow(dead_code)]

use std::f64::consts::PI;

use common::Buffer2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Vertical fringes `2 + 2cos(2π·cycles·x/width)` plus uniform noise in
/// `±noise`.
pub fn vertical_fringes(width: usize, height: usize, cycles: f64, noise: f64, seed: u64) -> Buffer2<f64> {
    fringes(width, height, noise, seed, |x, _| {
        2.0 * PI * cycles * x as f64 / width as f64
    })
}

/// Horizontal fringes: the carrier runs along `y`.
pub fn horizontal_fringes(
    width: usize,
    height: usize,
    cycles: f64,
    noise: f64,
    seed: u64,
) -> Buffer2<f64> {
    fringes(width, height, noise, seed, |_, y| {
        2.0 * PI * cycles * y as f64 / height as f64
    })
}

fn fringes<F>(width: usize, height: usize, noise: f64, seed: u64, carrier: F) -> Buffer2<f64>
where
    F: Fn(usize, usize) -> f64,
{
    let mut rng = StdRng::seed_from_u64(seed);
    Buffer2::from_fn(width, height, |x, y| {
        let value = 2.0 + 2.0 * carrier(x, y).cos();
        if noise > 0.0 {
            value + rng.random_range(-noise..noise)
        } else {
            value
        }
    })
}

/// Wrapped difference `a - b` in units of π, within [-1, 1).
pub fn wrapped_difference(a: f64, b: f64) -> f64 {
    (a - b + 1.0).rem_euclid(2.0) - 1.0
}
