//! Windowed SSIM comparison (§4.4). Structurally identical to the
//! Hamming-distance comparator; kept separate because its per-frame score
//! comes from the Media Adapter, not the Fingerprint Engine.

use super::{window_times, WindowVerdict, WorstWindow};
use crate::DEFAULT_WINDOW_SIZE;

/// Configuration for [`compare`].
#[derive(Debug, Clone)]
pub struct SsimComparatorConfig {
    pub window_size: usize,
    pub threshold: f64,
}

impl Default for SsimComparatorConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            threshold: crate::DEFAULT_SSIM_THRESHOLD_VERIFY,
        }
    }
}

impl SsimComparatorConfig {
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Reduces a per-frame SSIM sequence to a worst-window verdict. Higher
/// SSIM is better.
pub fn compare(scores: &[f64], fps: f64, config: &SsimComparatorConfig) -> WindowVerdict {
    let n = scores.len();
    if n == 0 {
        return WindowVerdict {
            frame_count: 0,
            window_count: 0,
            worst_window_metric: 0.0,
            overall_metric: 0.0,
            is_valid: false,
            threshold: config.threshold,
            worst_windows: Vec::new(),
        };
    }

    let ranges: Vec<(usize, usize)> = if n <= config.window_size {
        vec![(0, n)]
    } else {
        super::windows(n, config.window_size)
    };

    let mut window_means = Vec::with_capacity(ranges.len());
    let mut worst_windows: Vec<WorstWindow> = Vec::with_capacity(ranges.len());

    for &(start, end) in &ranges {
        let slice = &scores[start..end];
        let mean = slice.iter().sum::<f64>() / slice.len() as f64;
        let (min_offset, &min_value) = slice
            .iter()
            .enumerate()
            .min_by(|(ia, va), (ib, vb)| va.partial_cmp(vb).unwrap().then(ia.cmp(ib)))
            .unwrap();
        let worst_frame = start + min_offset;
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
            worst_frame_value: min_value,
        });
    }

    let worst_window_metric = window_means.iter().cloned().fold(f64::MAX, f64::min);
    let overall_metric = scores.iter().sum::<f64>() / n as f64;

    worst_windows.sort_by(|x, y| x.aggregate.partial_cmp(&y.aggregate).unwrap());
    worst_windows.truncate(3);

    WindowVerdict {
        frame_count: n,
        window_count: ranges.len(),
        worst_window_metric,
        overall_metric,
        is_valid: worst_window_metric >= config.threshold,
        threshold: config.threshold,
        worst_windows,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn short_sequence_collapses_to_one_window() {
        let scores = vec![0.99; 30];
        let verdict = compare(&scores, 30.0, &SsimComparatorConfig::default());
        assert_eq!(verdict.window_count, 1);
        assert_eq!(verdict.worst_window_metric, 0.99);
    }

    #[test]
    fn localized_dip_fails_the_window_it_falls_in() {
        let mut scores = vec![0.99; 120];
        scores[65] = 0.5;
        let verdict = compare(&scores, 30.0, &SsimComparatorConfig::default());
        assert!(!verdict.is_valid);
        assert_eq!(verdict.worst_windows[0].worst_frame, 65);
    }

    #[test]
    fn empty_sequence_is_invalid() {
        let verdict = compare(&[], 30.0, &SsimComparatorConfig::default());
        assert!(!verdict.is_valid);
        assert_eq!(verdict.window_count, 0);
    }
}
