//! Per-frame YUV channel statistics (§4.2).

use crate::media::DecodedFrame;

/// Mean and standard deviation of each YUV channel for a single frame,
/// using OpenCV's `COLOR_BGR2YUV` coefficients (`U`/`V` scaled by 0.436
/// and 0.615 respectively, not the JPEG/JFIF YCbCr matrix).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameStats {
    pub y_mean: f64,
    pub y_std: f64,
    pub u_mean: f64,
    pub u_std: f64,
    pub v_mean: f64,
    pub v_std: f64,
}

/// Computes [`FrameStats`] for a single decoded (packed BGR24) frame.
pub fn compute(frame: &DecodedFrame) -> FrameStats {
    let pixel_count = (frame.width * frame.height) as usize;
    let mut y = Vec::with_capacity(pixel_count);
    let mut u = Vec::with_capacity(pixel_count);
    let mut v = Vec::with_capacity(pixel_count);

    for px in frame.data.chunks_exact(3) {
        let (b, g, r) = (px[0] as f64, px[1] as f64, px[2] as f64);
        y.push(0.299 * r + 0.587 * g + 0.114 * b);
        u.push(-0.147_13 * r - 0.288_86 * g + 0.436 * b + 128.0);
        v.push(0.615 * r - 0.514_99 * g - 0.100_01 * b + 128.0);
    }

    let (y_mean, y_std) = mean_std(&y);
    let (u_mean, u_std) = mean_std(&u);
    let (v_mean, v_std) = mean_std(&v);

    FrameStats {
        y_mean: round2(y_mean),
        y_std: round2(y_std),
        u_mean: round2(u_mean),
        u_std: round2(u_std),
        v_mean: round2(v_mean),
        v_std: round2(v_std),
    }
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::media::DecodedFrame;

    #[test]
    fn uniform_gray_frame_has_zero_std() {
        let frame = DecodedFrame {
            index: 0,
            width: 2,
            height: 2,
            data: vec![128; 2 * 2 * 3],
        };
        let stats = compute(&frame);
        assert_eq!(stats.y_std, 0.0);
        assert_eq!(stats.u_std, 0.0);
        assert_eq!(stats.v_std, 0.0);
        assert_eq!(stats.y_mean, 128.0);
    }

    #[test]
    fn black_frame_centers_chroma_at_128() {
        let frame = DecodedFrame {
            index: 0,
            width: 1,
            height: 1,
            data: vec![0, 0, 0],
        };
        let stats = compute(&frame);
        assert_eq!(stats.y_mean, 0.0);
        assert_eq!(stats.u_mean, 128.0);
        assert_eq!(stats.v_mean, 128.0);
    }
}
