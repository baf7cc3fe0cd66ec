//! Hamming-distance windowed comparison of dHash/pHash sequences (§4.3).

use super::{window_times, windows, WindowVerdict, WorstWindow};
use crate::{Error, Result};

/// Configuration for [`compare`]. Mirrors the teacher's builder-style
/// comparator configs: construct with [`Default`], tune with `with_*`.
#[derive(Debug, Clone)]
pub struct HammingComparatorConfig {
    pub window_size: usize,
    pub threshold_bits: f64,
}

impl Default for HammingComparatorConfig {
    fn default() -> Self {
        Self {
            window_size: crate::DEFAULT_WINDOW_SIZE,
            threshold_bits: crate::DEFAULT_HAMMING_THRESHOLD_BITS,
        }
    }
}

impl HammingComparatorConfig {
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_threshold_bits(mut self, threshold_bits: f64) -> Self {
        self.threshold_bits = threshold_bits;
        self
    }
}

/// Compares two per-frame 64-bit hash sequences (dHash or pHash) and
/// returns a worst-window verdict. Lower Hamming distance is better.
pub fn compare(
    a: &[u64],
    b: &[u64],
    fps: f64,
    config: &HammingComparatorConfig,
) -> Result<WindowVerdict> {
    if a.len() != b.len() {
        return Err(Error::FingerprintMismatch(format!(
            "hash sequence length mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let distances: Vec<f64> = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x ^ y).count_ones() as f64)
        .collect();

    let ranges = windows(distances.len(), config.window_size);

    let mut window_means = Vec::with_capacity(ranges.len());
    let mut worst_windows: Vec<WorstWindow> = Vec::with_capacity(ranges.len());

    for &(start, end) in &ranges {
        let slice = &distances[start..end];
        let mean = slice.iter().sum::<f64>() / slice.len() as f64;

        // Strict `>` keeps the first occurrence on a tie, matching the
        // SSIM/stats comparators and numpy's `argmax`.
        let mut max_offset = 0;
        let mut max_value = f64::MIN;
        for (i, &value) in slice.iter().enumerate() {
            if value > max_value {
                max_value = value;
                max_offset = i;
            }
        }
        let worst_frame = start + max_offset;
        let (start_time, end_time) = window_times(start, end, fps);

        window_means.push(mean);
        worst_windows.push(WorstWindow {
            start_frame: start,
            end_frame: end,
            start_time,
            end_time,
            aggregate: mean,
            worst_frame,
            worst_frame_time: crate::util::format_time(worst_frame as f64 / fps),
            worst_frame_value: max_value,
        });
    }

    let worst_window_metric = window_means.iter().cloned().fold(f64::MIN, f64::max);
    let overall_metric = if distances.is_empty() {
        0.0
    } else {
        distances.iter().sum::<f64>() / distances.len() as f64
    };

    worst_windows.sort_by(|x, y| y.aggregate.partial_cmp(&x.aggregate).unwrap());
    worst_windows.truncate(3);

    Ok(WindowVerdict {
        frame_count: distances.len(),
        window_count: ranges.len(),
        worst_window_metric,
        overall_metric,
        is_valid: worst_window_metric < config.threshold_bits,
        threshold: config.threshold_bits,
        worst_windows,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identical_sequences_are_valid() {
        let a = vec![0xABCDu64; 120];
        let verdict = compare(&a, &a, 30.0, &HammingComparatorConfig::default()).unwrap();
        assert_eq!(verdict.worst_window_metric, 0.0);
        assert!(verdict.is_valid);
        assert_eq!(verdict.window_count, 2);
    }

    #[test]
    fn single_flipped_frame_fails_its_window() {
        let mut a = vec![0u64; 60];
        let mut b = a.clone();
        b[10] = u64::MAX; // 64 bits flipped, well above the default threshold
        let verdict = compare(&a, &b, 30.0, &HammingComparatorConfig::default()).unwrap();
        a.clear();
        assert!(!verdict.is_valid);
        assert_eq!(verdict.worst_windows[0].worst_frame, 10);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let a = vec![0u64; 10];
        let b = vec![0u64; 11];
        assert!(compare(&a, &b, 30.0, &HammingComparatorConfig::default()).is_err());
    }

    #[test]
    fn tied_worst_frame_picks_the_first_one() {
        let a = vec![0u64; 60];
        let mut b = a.clone();
        b[5] = u64::MAX;
        b[40] = u64::MAX;
        let verdict = compare(&a, &b, 30.0, &HammingComparatorConfig::default()).unwrap();
        assert_eq!(verdict.worst_windows[0].worst_frame, 5);
    }
}
