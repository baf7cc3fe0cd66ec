//! 64-bit perceptual hash via 2D DCT-II (§4.2).

use rustdct::DctPlanner;

use crate::media::DecodedFrame;
use crate::Result;

const DCT_SIZE: usize = 32;
const LOW_FREQ: usize = 8;

/// Computes the pHash of a single decoded frame.
///
/// The frame is converted to luminance, resampled to a `DCT_SIZE` square
/// tile, transformed with a separable 2D DCT-II (row pass, then column
/// pass), orthonormalized to match `cv2.dct`'s scaling (DC coefficient
/// scaled by `sqrt(1/N)`, AC by `sqrt(2/N)`, per axis), and the top-left
/// `LOW_FREQ` x `LOW_FREQ` low-frequency block is thresholded against its
/// own median: bit *i* (row-major, index 0 least-significant) is set when
/// the coefficient exceeds the median.
pub fn compute(frame: &DecodedFrame) -> Result<u64> {
    let luma = super::luma_plane(frame);
    let tile = super::resize_gray(
        &luma,
        frame.width,
        frame.height,
        DCT_SIZE as u32,
        DCT_SIZE as u32,
    )?;

    let mut matrix: Vec<f32> = tile.iter().map(|&p| p as f32).collect();

    let mut planner = DctPlanner::new();
    let dct = planner.plan_dct2(DCT_SIZE);

    // Row pass.
    for row in matrix.chunks_mut(DCT_SIZE) {
        dct.process_dct2(row);
    }
    // Column pass (transpose, transform, transpose back).
    let mut columns = vec![0f32; DCT_SIZE * DCT_SIZE];
    for col in 0..DCT_SIZE {
        for row in 0..DCT_SIZE {
            columns[col * DCT_SIZE + row] = matrix[row * DCT_SIZE + col];
        }
    }
    for col in columns.chunks_mut(DCT_SIZE) {
        dct.process_dct2(col);
    }
    for col in 0..DCT_SIZE {
        for row in 0..DCT_SIZE {
            matrix[row * DCT_SIZE + col] = columns[col * DCT_SIZE + row];
        }
    }

    // `rustdct`'s `process_dct2` is the unnormalized DCT-II; `cv2.dct`
    // is orthonormal. Apply the per-axis scale factor to each
    // low-frequency coefficient before thresholding so the hash bits
    // match what an OpenCV-based implementation would produce.
    let alphas: Vec<f32> = (0..LOW_FREQ).map(|k| dct_alpha(k, DCT_SIZE)).collect();
    let mut low_freq = Vec::with_capacity(LOW_FREQ * LOW_FREQ);
    for row in 0..LOW_FREQ {
        for col in 0..LOW_FREQ {
            low_freq.push(matrix[row * DCT_SIZE + col] * alphas[row] * alphas[col]);
        }
    }

    let median = median_of(&low_freq);

    let mut hash: u64 = 0;
    for (i, &coeff) in low_freq.iter().enumerate() {
        if coeff > median {
            hash |= 1 << i;
        }
    }
    Ok(hash)
}

/// Orthonormal DCT-II scale factor for coefficient `k` of an `n`-point
/// transform: `sqrt(1/n)` for the DC term, `sqrt(2/n)` otherwise.
fn dct_alpha(k: usize, n: usize) -> f32 {
    if k == 0 {
        (1.0 / n as f32).sqrt()
    } else {
        (2.0 / n as f32).sqrt()
    }
}

fn median_of(values: &[f32]) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn median_of_odd_length() {
        assert_eq!(median_of(&[1.0, 3.0, 2.0]), 2.0);
    }

    #[test]
    fn median_of_even_length() {
        assert_eq!(median_of(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }

    #[test]
    fn dc_alpha_is_half_of_ac_alpha_relative_scale() {
        let dc = dct_alpha(0, 32);
        let ac = dct_alpha(1, 32);
        assert!((dc - (1.0f32 / 32.0).sqrt()).abs() < 1e-6);
        assert!((ac - (2.0f32 / 32.0).sqrt()).abs() < 1e-6);
    }
}
