//! The Fingerprint Engine (§4.2): per-frame dHash, pHash, and YUV channel
//! statistics, computed from a single decode pass over a video.

pub mod dhash;
pub mod phash;
pub mod stats;

use std::path::Path;

use rayon::prelude::*;

use crate::media::{DecodedFrame, MediaAdapter};
use crate::{Error, Result};
pub use stats::FrameStats;

/// The three per-frame fingerprint sequences for a video, always the same
/// length (enforced at compute time).
#[derive(Debug, Clone, Default)]
pub struct FrameFingerprints {
    pub dhash: Vec<u64>,
    pub phash: Vec<u64>,
    pub stats: Vec<FrameStats>,
}

impl FrameFingerprints {
    pub fn frame_count(&self) -> usize {
        self.dhash.len()
    }
}

/// Decodes `path` once and computes dHash, pHash, and frame statistics for
/// every frame. Fails with [`Error::InternalInvariant`] if the three
/// sequences ever disagree on length, which should only happen if a
/// per-frame computation silently drops a frame.
pub fn compute_all(adapter: &MediaAdapter, path: &Path) -> Result<FrameFingerprints> {
    let span = tracing::span!(tracing::Level::DEBUG, "fingerprint::compute_all", path = %path.display());
    let _enter = span.enter();

    let mut dhash = Vec::new();
    let mut phash = Vec::new();
    let mut stats = Vec::new();

    for frame in adapter.decode_frames(path)? {
        let frame = frame?;
        let (d, p, s) = fingerprint_frame(&frame)?;
        dhash.push(d);
        phash.push(p);
        stats.push(s);
    }

    if dhash.len() != phash.len() || phash.len() != stats.len() {
        return Err(Error::InternalInvariant {
            dhash: dhash.len(),
            phash: phash.len(),
            stats: stats.len(),
        });
    }

    tracing::debug!(frame_count = dhash.len(), "fingerprint computation complete");
    Ok(FrameFingerprints { dhash, phash, stats })
}

/// Same as [`compute_all`], but fans the per-frame work for dHash, pHash,
/// and stats out across a thread pool (decoding itself stays single-pass
/// and sequential, since it is the actual I/O bottleneck).
pub fn compute_all_parallel(adapter: &MediaAdapter, path: &Path) -> Result<FrameFingerprints> {
    let frames: Vec<DecodedFrame> = adapter
        .decode_frames(path)?
        .collect::<Result<Vec<_>>>()?;

    let results: Result<Vec<(u64, u64, FrameStats)>> =
        frames.par_iter().map(fingerprint_frame).collect();
    let results = results?;

    let mut dhash = Vec::with_capacity(results.len());
    let mut phash = Vec::with_capacity(results.len());
    let mut stats = Vec::with_capacity(results.len());
    for (d, p, s) in results {
        dhash.push(d);
        phash.push(p);
        stats.push(s);
    }
    Ok(FrameFingerprints { dhash, phash, stats })
}

fn fingerprint_frame(frame: &DecodedFrame) -> Result<(u64, u64, FrameStats)> {
    let d = dhash::compute(frame)?;
    let p = phash::compute(frame)?;
    let s = stats::compute(frame);
    Ok((d, p, s))
}

/// Extracts a standalone luminance (grayscale) plane from a packed BGR24
/// frame, using the same coefficients as [`stats::compute`]'s Y channel.
pub(crate) fn luma_plane(frame: &DecodedFrame) -> Vec<u8> {
    frame
        .data
        .chunks_exact(3)
        .map(|px| {
            let (b, g, r) = (px[0] as f32, px[1] as f32, px[2] as f32);
            (0.299 * r + 0.587 * g + 0.114 * b).round().clamp(0.0, 255.0) as u8
        })
        .collect()
}

/// Resamples a grayscale plane to `dst_width` x `dst_height` using
/// `ffmpeg-next`'s software scaler with a Lanczos-quality filter.
pub(crate) fn resize_gray(
    src: &[u8],
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
) -> Result<Vec<u8>> {
    let mut src_frame = ffmpeg_next::frame::Video::new(
        ffmpeg_next::format::Pixel::GRAY8,
        src_width,
        src_height,
    );
    let stride = src_frame.stride(0);
    {
        let dst = src_frame.data_mut(0);
        for row in 0..src_height as usize {
            let row_bytes = src_width as usize;
            dst[row * stride..row * stride + row_bytes]
                .copy_from_slice(&src[row * row_bytes..row * row_bytes + row_bytes]);
        }
    }

    let mut scaler = ffmpeg_next::software::scaling::context::Context::get(
        ffmpeg_next::format::Pixel::GRAY8,
        src_width,
        src_height,
        ffmpeg_next::format::Pixel::GRAY8,
        dst_width,
        dst_height,
        ffmpeg_next::software::scaling::flag::Flags::LANCZOS,
    )?;

    let mut dst_frame = ffmpeg_next::frame::Video::new(
        ffmpeg_next::format::Pixel::GRAY8,
        dst_width,
        dst_height,
    );
    scaler.run(&src_frame, &mut dst_frame)?;

    let dst_stride = dst_frame.stride(0);
    let dst_data = dst_frame.data(0);
    let mut out = Vec::with_capacity((dst_width * dst_height) as usize);
    for row in 0..dst_height as usize {
        out.extend_from_slice(&dst_data[row * dst_stride..row * dst_stride + dst_width as usize]);
    }
    Ok(out)
}

/// Writes a fingerprint sequence as a headerless array of little-endian
/// `u64` records.
pub fn write_bin(path: &Path, values: &[u64]) -> Result<()> {
    let mut buf = Vec::with_capacity(values.len() * 8);
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    std::fs::write(path, buf)?;
    Ok(())
}

/// Reads a fingerprint sequence written by [`write_bin`].
pub fn read_bin(path: &Path) -> Result<Vec<u64>> {
    let bytes = std::fs::read(path).map_err(|_| Error::InputNotFound(path.to_owned()))?;
    if bytes.len() % 8 != 0 {
        return Err(Error::PackageMalformed(format!(
            "fingerprint file {} is not a multiple of 8 bytes",
            path.display()
        )));
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
        .collect())
}

/// Writes a frame-statistics sequence as JSON.
pub fn write_stats_json(path: &Path, values: &[FrameStats]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer(file, values)?;
    Ok(())
}

/// Reads a frame-statistics sequence written by [`write_stats_json`].
pub fn read_stats_json(path: &Path) -> Result<Vec<FrameStats>> {
    let file = std::fs::File::open(path).map_err(|_| Error::InputNotFound(path.to_owned()))?;
    Ok(serde_json::from_reader(file)?)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bin_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dhash.bin");
        let values = vec![0u64, 1, u64::MAX, 0xDEAD_BEEF];
        write_bin(&path, &values).unwrap();
        let read_back = read_bin(&path).unwrap();
        assert_eq!(values, read_back);
    }

    #[test]
    fn stats_json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame_stats.json");
        let values = vec![FrameStats {
            y_mean: 1.0,
            y_std: 2.0,
            u_mean: 3.0,
            u_std: 4.0,
            v_mean: 5.0,
            v_std: 6.0,
        }];
        write_stats_json(&path, &values).unwrap();
        let read_back = read_stats_json(&path).unwrap();
        assert_eq!(values, read_back);
    }
}
