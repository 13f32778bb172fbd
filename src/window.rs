//! Smoothing window selection.
//!
//! A window is centered on its index with `window / 2` neighbors on each side.
//! Near either end of the sequence it shrinks symmetrically around the index
//! instead of sliding inwards, so the first and last points are never pulled
//! towards their neighbors. Windows never wrap around.

use std::ops::Range;

/// Index range `[lo, hi)` of the neighbors averaged for the element at `index`
/// in a sequence of `len` elements.
///
/// The result always lies within `0..len`, contains `index` and holds at most
/// `window` elements (a `window` of 0 behaves like 1). Returns an empty range
/// only when `index` is out of bounds.
///
/// # Example
///
/// ```rust
/// use photo_sequencer::window::select;
///
/// assert_eq!(select(10, 5, 5), 3..8);
/// assert_eq!(select(10, 0, 5), 0..1);
/// assert_eq!(select(10, 1, 5), 0..3);
/// assert_eq!(select(10, 9, 5), 9..10);
/// ```
pub fn select(len: usize, index: usize, window: usize) -> Range<usize> {
    if index >= len {
        return len..len;
    }

    let len_i = len as isize;
    let i = index as isize;
    // Every window of 2 * len + 1 or more takes the start branch below
    let cap = len.saturating_mul(2).saturating_add(1);
    let window = isize::try_from(window.clamp(1, cap)).unwrap_or(isize::MAX);
    let half = window / 2;
    let start = i - half;

    let (lo, hi) = if start < 0 {
        (0, 2 * i + 1)
    } else if i + half >= len_i {
        (2 * i - len_i + 1, start + window)
    } else {
        (start, start + window)
    };

    // Oversized windows can push the symmetric bounds past either end
    let lo = lo.clamp(0, i) as usize;
    let hi = hi.clamp(i + 1, len_i) as usize;
    lo..hi
}
