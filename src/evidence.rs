//! The Evidence Extractor (§4.7): turns ranked worst windows from one or
//! more comparators into a minimal set of reviewable audit clips.

use std::path::{Path, PathBuf};

use crate::media::MediaAdapter;
use crate::Result;

/// A single flagged window, tagged with which comparator produced it so
/// the merged clip can report every contributing cause.
#[derive(Debug, Clone, PartialEq)]
pub struct FlaggedWindow {
    pub comparator: String,
    pub start_frame: usize,
    pub end_frame: usize,
    pub metric: f64,
}

/// A merged interval of flagged windows, padded with lead-in context.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditClip {
    pub start_time_s: f64,
    pub end_time_s: f64,
    pub contributing_windows: Vec<FlaggedWindow>,
}

impl AuditClip {
    pub fn duration_s(&self) -> f64 {
        self.end_time_s - self.start_time_s
    }
}

/// A rendered clip pair produced by [`EvidenceExtractor::render`].
#[derive(Debug, Clone)]
pub struct RenderedClip {
    pub raw_path: PathBuf,
    pub side_by_side_path: PathBuf,
}

/// Configuration for [`EvidenceExtractor`].
#[derive(Debug, Clone)]
pub struct EvidenceExtractorConfig {
    pub lead_in_seconds: f64,
    pub merge_gap_seconds: f64,
}

impl Default for EvidenceExtractorConfig {
    fn default() -> Self {
        Self {
            lead_in_seconds: crate::DEFAULT_LEAD_IN_SECONDS,
            merge_gap_seconds: crate::DEFAULT_MERGE_GAP_SECONDS,
        }
    }
}

impl EvidenceExtractorConfig {
    pub fn with_lead_in_seconds(mut self, seconds: f64) -> Self {
        self.lead_in_seconds = seconds;
        self
    }

    pub fn with_merge_gap_seconds(mut self, seconds: f64) -> Self {
        self.merge_gap_seconds = seconds;
        self
    }
}

pub struct EvidenceExtractor {
    config: EvidenceExtractorConfig,
    adapter: MediaAdapter,
}

impl EvidenceExtractor {
    pub fn new(config: EvidenceExtractorConfig) -> Self {
        Self {
            config,
            adapter: MediaAdapter,
        }
    }

    /// Converts flagged windows into merged audit clip intervals.
    ///
    /// 1. Each window becomes `[max(0, start/fps - lead_in), end/fps]`.
    /// 2. Intervals are sorted by start (so the result is order-invariant
    ///    in the input).
    /// 3. Greedily merged: a clip starting at or before
    ///    `current.end + merge_gap` extends the current clip.
    pub fn merge_windows(&self, windows: &[FlaggedWindow], fps: f64) -> Vec<AuditClip> {
        if windows.is_empty() {
            return Vec::new();
        }

        let mut intervals: Vec<AuditClip> = windows
            .iter()
            .map(|w| AuditClip {
                start_time_s: (w.start_frame as f64 / fps - self.config.lead_in_seconds).max(0.0),
                end_time_s: w.end_frame as f64 / fps,
                contributing_windows: vec![w.clone()],
            })
            .collect();
        intervals.sort_by(|a, b| a.start_time_s.partial_cmp(&b.start_time_s).unwrap());

        let mut merged: Vec<AuditClip> = Vec::new();
        for clip in intervals {
            match merged.last_mut() {
                Some(current) if clip.start_time_s <= current.end_time_s + self.config.merge_gap_seconds => {
                    current.end_time_s = current.end_time_s.max(clip.end_time_s);
                    current.contributing_windows.extend(clip.contributing_windows);
                }
                _ => merged.push(clip),
            }
        }
        merged
    }

    /// Extracts a raw clip from `candidate` and a side-by-side comparison
    /// clip against `reference_digest` for every merged audit clip.
    pub fn render(
        &self,
        candidate: &Path,
        reference_digest: &Path,
        clips: &[AuditClip],
        out_dir: &Path,
    ) -> Result<Vec<RenderedClip>> {
        std::fs::create_dir_all(out_dir)?;
        let mut rendered = Vec::with_capacity(clips.len());
        for (i, clip) in clips.iter().enumerate() {
            let raw_path = out_dir.join(format!("clip_{i:03}_raw.mp4"));
            self.adapter
                .extract_clip(candidate, &raw_path, clip.start_time_s, clip.duration_s())?;

            let side_by_side_path = out_dir.join(format!("clip_{i:03}_side_by_side.mp4"));
            self.adapter.side_by_side_clip(
                candidate,
                reference_digest,
                &side_by_side_path,
                clip.start_time_s,
                clip.duration_s(),
                "candidate",
                "reference",
            )?;

            rendered.push(RenderedClip {
                raw_path,
                side_by_side_path,
            });
        }
        Ok(rendered)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn window(start: usize, end: usize) -> FlaggedWindow {
        FlaggedWindow {
            comparator: "dhash".to_string(),
            start_frame: start,
            end_frame: end,
            metric: 10.0,
        }
    }

    #[test]
    fn close_windows_merge_into_one_clip() {
        let extractor = EvidenceExtractor::new(EvidenceExtractorConfig::default());
        // 3s apart at fps=30: frames 1350..1410 (45.0s) and frames 1500..1560 (50.0s).
        let windows = vec![window(1350, 1410), window(1500, 1560)];
        let clips = extractor.merge_windows(&windows, 30.0);
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].contributing_windows.len(), 2);
    }

    #[test]
    fn distant_windows_stay_separate() {
        let extractor = EvidenceExtractor::new(EvidenceExtractorConfig::default());
        // 10s apart.
        let windows = vec![window(1350, 1410), window(1710, 1770)];
        let clips = extractor.merge_windows(&windows, 30.0);
        assert_eq!(clips.len(), 2);
    }

    #[test]
    fn merge_gap_is_inclusive_at_the_boundary() {
        let extractor = EvidenceExtractor::new(EvidenceExtractorConfig::default());
        // end_time_s of window 1 is 1410/30 = 47.0s; window 2 starts at
        // 1350 frames later but its padded start lands exactly at 47.0 + 5.0 = 52.0s.
        let fps = 30.0;
        let window_a = window(1350, 1410); // end = 47.0s
        let second_start_frame = ((47.0 + 5.0 + 1.5) * fps) as usize;
        let window_b = window(second_start_frame, second_start_frame + 60);
        let clips = extractor.merge_windows(&[window_a, window_b], fps);
        assert_eq!(clips.len(), 1);
    }

    #[test]
    fn merge_is_order_invariant() {
        let extractor = EvidenceExtractor::new(EvidenceExtractorConfig::default());
        let windows = vec![window(1350, 1410), window(1500, 1560), window(3000, 3060)];
        let mut reversed = windows.clone();
        reversed.reverse();

        let forward = extractor.merge_windows(&windows, 30.0);
        let backward = extractor.merge_windows(&reversed, 30.0);

        let forward_intervals: Vec<(f64, f64)> =
            forward.iter().map(|c| (c.start_time_s, c.end_time_s)).collect();
        let backward_intervals: Vec<(f64, f64)> =
            backward.iter().map(|c| (c.start_time_s, c.end_time_s)).collect();
        assert_eq!(forward_intervals, backward_intervals);
    }

    #[test]
    fn clip_start_never_goes_negative() {
        let extractor = EvidenceExtractor::new(EvidenceExtractorConfig::default());
        let clips = extractor.merge_windows(&[window(0, 10)], 30.0);
        assert_eq!(clips[0].start_time_s, 0.0);
    }
}
