//! Pearson correlation / mean-absolute-difference windowed comparison of
//! per-frame YUV channel statistics (§4.3).

use super::{mean_absolute_difference, pearson_correlation, window_times, windows, WorstWindow};
use crate::fingerprint::FrameStats;
use crate::{Error, Result};

/// Configuration for [`compare`].
#[derive(Debug, Clone)]
pub struct StatsComparatorConfig {
    pub window_size: usize,
    pub correlation_threshold: f64,
    pub mad_threshold: f64,
}

impl Default for StatsComparatorConfig {
    fn default() -> Self {
        Self {
            window_size: crate::DEFAULT_WINDOW_SIZE,
            correlation_threshold: 0.90,
            mad_threshold: 0.8,
        }
    }
}

impl StatsComparatorConfig {
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_correlation_threshold(mut self, threshold: f64) -> Self {
        self.correlation_threshold = threshold;
        self
    }

    pub fn with_mad_threshold(mut self, threshold: f64) -> Self {
        self.mad_threshold = threshold;
        self
    }
}

/// Result of a [`compare`] run. Distinct from [`super::WindowVerdict`]
/// because the underlying metric is a pair, not a single scalar.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StatsVerdict {
    pub frame_count: usize,
    pub window_count: usize,
    pub worst_correlation: f64,
    pub worst_mad: f64,
    pub overall_correlation: f64,
    pub overall_mad: f64,
    pub is_valid: bool,
    pub correlation_threshold: f64,
    pub mad_threshold: f64,
    pub worst_windows: Vec<WorstWindow>,
}

fn channels(records: &[FrameStats]) -> [Vec<f64>; 6] {
    [
        records.iter().map(|r| r.y_mean).collect(),
        records.iter().map(|r| r.y_std).collect(),
        records.iter().map(|r| r.u_mean).collect(),
        records.iter().map(|r| r.u_std).collect(),
        records.iter().map(|r| r.v_mean).collect(),
        records.iter().map(|r| r.v_std).collect(),
    ]
}

/// Compares two per-frame statistics sequences and returns a worst-window
/// verdict over Pearson correlation and mean-absolute-difference.
pub fn compare(
    a: &[FrameStats],
    b: &[FrameStats],
    fps: f64,
    config: &StatsComparatorConfig,
) -> Result<StatsVerdict> {
    if a.len() != b.len() {
        return Err(Error::FingerprintMismatch(format!(
            "frame statistics sequence length mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let channels_a = channels(a);
    let channels_b = channels(b);
    let ranges = windows(a.len(), config.window_size);

    let mut window_correlations = Vec::with_capacity(ranges.len());
    let mut window_mads = Vec::with_capacity(ranges.len());
    let mut worst_windows: Vec<WorstWindow> = Vec::with_capacity(ranges.len());

    for &(start, end) in &ranges {
        let mut correlations = [0.0; 6];
        let mut mads = [0.0; 6];
        for c in 0..6 {
            correlations[c] = pearson_correlation(&channels_a[c][start..end], &channels_b[c][start..end]);
            mads[c] = mean_absolute_difference(&channels_a[c][start..end], &channels_b[c][start..end]);
        }
        let mean_correlation = correlations.iter().sum::<f64>() / 6.0;
        let mean_mad = mads.iter().sum::<f64>() / 6.0;

        let mut worst_offset = 0;
        let mut worst_value = f64::MIN;
        for i in start..end {
            let mut diff_sum = 0.0;
            for c in 0..6 {
                diff_sum += (channels_a[c][i] - channels_b[c][i]).abs();
            }
            let per_frame_mean = diff_sum / 6.0;
            if per_frame_mean > worst_value {
                worst_value = per_frame_mean;
                worst_offset = i;
            }
        }
        let (start_time, end_time) = window_times(start, end, fps);

        window_correlations.push(mean_correlation);
        window_mads.push(mean_mad);
        worst_windows.push(WorstWindow {
            start_frame: start,
            end_frame: end,
            start_time,
            end_time,
            aggregate: mean_correlation,
            worst_frame: worst_offset,
            worst_frame_time: crate::util::format_time(worst_offset as f64 / fps),
            worst_frame_value: worst_value,
        });
    }

    let worst_correlation = window_correlations.iter().cloned().fold(f64::MAX, f64::min);
    let worst_mad = window_mads.iter().cloned().fold(f64::MIN, f64::max);
    let overall_correlation = if window_correlations.is_empty() {
        1.0
    } else {
        window_correlations.iter().sum::<f64>() / window_correlations.len() as f64
    };
    let overall_mad = if window_mads.is_empty() {
        0.0
    } else {
        window_mads.iter().sum::<f64>() / window_mads.len() as f64
    };

    worst_windows.sort_by(|x, y| x.aggregate.partial_cmp(&y.aggregate).unwrap());
    worst_windows.truncate(3);

    Ok(StatsVerdict {
        frame_count: a.len(),
        window_count: ranges.len(),
        worst_correlation,
        worst_mad,
        overall_correlation,
        overall_mad,
        is_valid: worst_correlation >= config.correlation_threshold && worst_mad < config.mad_threshold,
        correlation_threshold: config.correlation_threshold,
        mad_threshold: config.mad_threshold,
        worst_windows,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(v: f64) -> FrameStats {
        FrameStats {
            y_mean: v,
            y_std: v,
            u_mean: v,
            u_std: v,
            v_mean: v,
            v_std: v,
        }
    }

    #[test]
    fn identical_sequences_are_valid() {
        let records: Vec<FrameStats> = (0..120).map(|i| record(i as f64)).collect();
        let verdict = compare(&records, &records, 30.0, &StatsComparatorConfig::default()).unwrap();
        assert_eq!(verdict.worst_correlation, 1.0);
        assert_eq!(verdict.worst_mad, 0.0);
        assert!(verdict.is_valid);
    }

    #[test]
    fn constant_sequences_correlate_perfectly_when_equal() {
        let records: Vec<FrameStats> = (0..60).map(|_| record(10.0)).collect();
        let verdict = compare(&records, &records, 30.0, &StatsComparatorConfig::default()).unwrap();
        assert_eq!(verdict.worst_correlation, 1.0);
    }
}
