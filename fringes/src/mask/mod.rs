//! Circular masking of a sideband and shifting it to the spectrum center.

use common::Buffer2;
use rayon::prelude::*;

use crate::blob::Blob;
use crate::spectrum::roll;

/// Copy of `data` with every sample farther than `1.2 · radius` from the blob
/// center set to zero.
pub fn apply_mask<T>(data: &Buffer2<T>, blob: &Blob) -> Buffer2<T>
where
    T: Copy + Default + Send + Sync,
{
    let mut out = data.clone();
    let width = data.width().max(1);
    out.pixels_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, v) in row.iter_mut().enumerate() {
                if !blob.mask_contains(x as f64, y as f64) {
                    *v = T::default();
                }
            }
        });
    out
}

/// Offsets that move the blob center to `(⌊w/2⌋, ⌊h/2⌋)`.
pub fn center_offset<T>(data: &Buffer2<T>, blob: &Blob) -> (isize, isize) {
    let dx = (data.width() / 2) as isize - blob.x.round() as isize;
    let dy = (data.height() / 2) as isize - blob.y.round() as isize;
    (dx, dy)
}

/// Toroidal shift placing the blob at the center.
pub fn roll_to_center<T>(data: &Buffer2<T>, blob: &Blob) -> Buffer2<T>
where
    T: Copy + Send + Sync,
{
    let (dx, dy) = center_offset(data, blob);
    roll(data, dx, dy)
}

/// [`apply_mask`] followed by [`roll_to_center`].
pub fn mask_and_shift<T>(data: &Buffer2<T>, blob: &Blob) -> Buffer2<T>
where
    T: Copy + Default + Send + Sync,
{
    roll_to_center(&apply_mask(data, blob), blob)
}

/// Non-wrapping shift placing the blob at the center. Samples pushed past an
/// edge are dropped and vacated samples are zero.
pub fn shift_to_center<T>(data: &Buffer2<T>, blob: &Blob) -> Buffer2<T>
where
    T: Copy + Default,
{
    let (width, height) = data.dimensions();
    let (dx, dy) = center_offset(data, blob);
    Buffer2::from_fn(width, height, |x, y| {
        let sx = x as isize - dx;
        let sy = y as isize - dy;
        if sx >= 0 && sy >= 0 && (sx as usize) < width && (sy as usize) < height {
            data[(sx as usize, sy as usize)]
        } else {
            T::default()
        }
    })
}
