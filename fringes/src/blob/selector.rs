//! Sideband selection.

use super::Blob;

/// Picks the outermost blob along the axis the blobs are spread on.
///
/// The spread per axis is the sum of absolute differences between each
/// coordinate and its cyclic predecessor. If the rows spread more than the
/// columns the blob with the smallest `y` wins, otherwise the one with the
/// smallest `x`. `pick_opposite` takes the largest instead. Ties resolve to the
/// earliest blob.
///
/// Assumes the set is dominated by DC plus two sidebands; with extra clutter
/// the spread measure can pick the wrong axis.
pub fn pick_blob(blobs: &[Blob], pick_opposite: bool) -> Option<Blob> {
    let (first, rest) = blobs.split_first()?;
    let spread = |coord: fn(&Blob) -> f64| -> f64 {
        let n = blobs.len();
        (0..n)
            .map(|i| (coord(&blobs[i]) - coord(&blobs[(i + n - 1) % n])).abs())
            .sum()
    };
    let vertical = spread(|b| b.y) > spread(|b| b.x);
    let key = |b: &Blob| if vertical { b.y } else { b.x };

    let mut best = *first;
    for blob in rest {
        let better = if pick_opposite {
            key(blob) > key(&best)
        } else {
            key(blob) < key(&best)
        };
        if better {
            best = *blob;
        }
    }
    Some(best)
}
