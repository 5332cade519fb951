use std::ops::Range;

use crate::error::{Error, Result};

/// Split `len` elements into `count` contiguous ranges whose lengths differ by
/// at most one; the first `len % count` ranges take the extra element.
pub fn partition(len: usize, count: usize) -> Vec<Range<usize>> {
    if count == 0 {
        return Vec::new();
    }
    let base = len / count;
    let extra = len % count;

    let mut ranges = Vec::with_capacity(count);
    let mut start = 0;
    for i in 0..count {
        let size = base + usize::from(i < extra);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

/// Mean of each near-equal slice of `curve`. Always returns exactly `count` bins.
pub fn downsample(curve: &[f32], count: usize) -> Result<Vec<f32>> {
    if count == 0 || count > curve.len() {
        return Err(Error::InvalidBinCount {
            requested: count,
            len: curve.len(),
        });
    }

    Ok(partition(curve.len(), count)
        .into_iter()
        .map(|range| mean(&curve[range]))
        .collect())
}

/// Arithmetic mean accumulated in f64; 0.0 for an empty slice.
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    (sum / values.len() as f64) as f32
}
