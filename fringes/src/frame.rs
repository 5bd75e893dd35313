//! Conversions from raw camera buffers to grayscale frames.

use common::Buffer2;

use crate::error::FrameError;

/// Builds a grayscale frame from row-major interleaved samples. Colour frames
/// are reduced by summing their channels.
pub fn frame_from_interleaved<T>(
    width: usize,
    height: usize,
    channels: usize,
    samples: &[T],
) -> Result<Buffer2<f64>, FrameError>
where
    T: Copy + Into<f64>,
{
    if channels == 0 {
        return Err(FrameError::NoChannels);
    }
    let expected = width * height * channels;
    if samples.len() != expected {
        return Err(FrameError::Length {
            width,
            height,
            channels,
            expected,
            actual: samples.len(),
        });
    }

    let pixels = samples
        .chunks_exact(channels)
        .map(|pixel| pixel.iter().map(|&v| Into::<f64>::into(v)).sum::<f64>())
        .collect();
    Ok(Buffer2::new(width, height, pixels))
}

/// Cuts out the region given as fractions of the frame size, `0 <= left <
/// right <= 1` and likewise for `top`/`bottom`. Edges are truncated to whole
/// pixels.
pub fn clip_fraction(
    frame: &Buffer2<f64>,
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
) -> Result<Buffer2<f64>, FrameError> {
    let valid = |low: f64, high: f64| {
        (0.0..=1.0).contains(&low) && (0.0..=1.0).contains(&high) && low < high
    };
    if !valid(left, right) || !valid(top, bottom) {
        return Err(FrameError::ClipRegion {
            left,
            top,
            right,
            bottom,
        });
    }

    let (width, height) = frame.dimensions();
    let x0 = (left * width as f64) as usize;
    let x1 = (right * width as f64) as usize;
    let y0 = (top * height as f64) as usize;
    let y1 = (bottom * height as f64) as usize;
    Ok(frame.sub_buffer(x0, y0, x1 - x0, y1 - y0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grayscale_passthrough() {
        let frame = frame_from_interleaved(3, 2, 1, &[0u8, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(frame.dimensions(), (3, 2));
        assert_eq!(frame[(2, 1)], 5.0);
    }

    #[test]
    fn test_channels_are_summed() {
        let rgb: Vec<u16> = vec![1, 2, 3, 10, 20, 30];
        let frame = frame_from_interleaved(2, 1, 3, &rgb).unwrap();
        assert_eq!(frame.pixels(), &[6.0, 60.0]);
    }

    #[test]
    fn test_sum_does_not_overflow_u8() {
        let frame = frame_from_interleaved(1, 1, 3, &[255u8, 255, 255]).unwrap();
        assert_eq!(frame[(0, 0)], 765.0);
    }

    #[test]
    fn test_length_mismatch() {
        let err = frame_from_interleaved(2, 2, 3, &[0u8; 11]).unwrap_err();
        assert_eq!(
            err,
            FrameError::Length {
                width: 2,
                height: 2,
                channels: 3,
                expected: 12,
                actual: 11,
            }
        );
        assert_eq!(
            frame_from_interleaved::<u8>(1, 1, 0, &[]).unwrap_err(),
            FrameError::NoChannels
        );
    }

    #[test]
    fn test_clip_fraction() {
        let frame = Buffer2::from_fn(10, 4, |x, y| (x + 10 * y) as f64);
        let clipped = clip_fraction(&frame, 0.2, 0.25, 0.75, 1.0).unwrap();
        assert_eq!(clipped.dimensions(), (5, 3));
        assert_eq!(clipped[(0, 0)], 12.0);

        let whole = clip_fraction(&frame, 0.0, 0.0, 1.0, 1.0).unwrap();
        assert_eq!(whole, frame);
    }

    #[test]
    fn test_clip_fraction_rejects_bad_region() {
        let frame = Buffer2::new_filled(4, 4, 0.0);
        assert!(clip_fraction(&frame, 0.5, 0.0, 0.5, 1.0).is_err());
        assert!(clip_fraction(&frame, 0.0, -0.1, 1.0, 1.0).is_err());
        assert!(clip_fraction(&frame, 0.0, 0.0, 1.2, 1.0).is_err());
    }
}
