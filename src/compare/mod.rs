//! The Windowed Comparator and SSIM Comparator (§4.3, §4.4): both reduce a
//! per-frame metric sequence down to a worst-window verdict instead of a
//! single overall average, so a short run of tampered frames cannot be
//! diluted by the rest of the video.

pub mod frame_stats;
pub mod hamming;
pub mod ssim;

use crate::util::format_time;

/// A single flagged window, ranked by how anomalous it is relative to its
/// peers.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WorstWindow {
    pub start_frame: usize,
    pub end_frame: usize,
    pub start_time: String,
    pub end_time: String,
    pub aggregate: f64,
    pub worst_frame: usize,
    pub worst_frame_time: String,
    pub worst_frame_value: f64,
}

/// The result of a single-metric windowed comparison (Hamming distance or
/// SSIM).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WindowVerdict {
    pub frame_count: usize,
    pub window_count: usize,
    pub worst_window_metric: f64,
    pub overall_metric: f64,
    pub is_valid: bool,
    pub threshold: f64,
    pub worst_windows: Vec<WorstWindow>,
}

/// Partitions `[0, n)` into non-overlapping `(start, end)` ranges of
/// `window_size` frames; the last window may be short.
pub(crate) fn windows(n: usize, window_size: usize) -> Vec<(usize, usize)> {
    if n == 0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut start = 0;
    while start < n {
        let end = (start + window_size).min(n);
        out.push((start, end));
        start = end;
    }
    out
}

pub(crate) fn window_times(start: usize, end: usize, fps: f64) -> (String, String) {
    (
        format_time(start as f64 / fps),
        format_time((end.saturating_sub(1)) as f64 / fps),
    )
}

/// Pearson correlation coefficient between two equal-length slices.
/// Undefined (zero-variance) inputs are treated as correlation 1.0 if the
/// slices are identical, else 0.0, per §4.3.
pub(crate) fn pearson_correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..a.len() {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    if var_a == 0.0 || var_b == 0.0 {
        return if a == b { 1.0 } else { 0.0 };
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

/// Mean absolute difference between two equal-length slices.
pub(crate) fn mean_absolute_difference(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum::<f64>() / n
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn windows_partitions_evenly() {
        assert_eq!(windows(120, 60), vec![(0, 60), (60, 120)]);
    }

    #[test]
    fn windows_leaves_short_tail() {
        assert_eq!(windows(130, 60), vec![(0, 60), (60, 120), (120, 130)]);
    }

    #[test]
    fn windows_of_empty_sequence_is_empty() {
        assert_eq!(windows(0, 60), Vec::<(usize, usize)>::new());
    }

    #[test]
    fn pearson_of_identical_constant_arrays_is_one() {
        let a = vec![5.0; 10];
        assert_eq!(pearson_correlation(&a, &a), 1.0);
    }

    #[test]
    fn pearson_of_differing_constant_arrays_is_zero() {
        let a = vec![5.0; 10];
        let b = vec![6.0; 10];
        assert_eq!(pearson_correlation(&a, &b), 0.0);
    }

    #[test]
    fn pearson_of_perfectly_correlated_arrays_is_one() {
        let a = vec![1.0, 2.0, 3.0, 4.0];
        let b = vec![2.0, 4.0, 6.0, 8.0];
        assert!((pearson_correlation(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn mad_of_identical_arrays_is_zero() {
        let a = vec![1.0, 2.0, 3.0];
        assert_eq!(mean_absolute_difference(&a, &a), 0.0);
    }
}
