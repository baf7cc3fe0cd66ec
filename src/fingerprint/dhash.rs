//! 64-bit difference hash (§4.2).

use crate::media::DecodedFrame;
use crate::Result;

/// `hash_size + 1` by `hash_size` luma tile width/height.
const HASH_SIZE: u32 = 8;
const TILE_WIDTH: u32 = HASH_SIZE + 1;
const TILE_HEIGHT: u32 = HASH_SIZE;

/// Computes the dHash of a single decoded frame.
///
/// The frame is converted to luminance, resampled to a 9x8 tile with a
/// Lanczos-quality filter, and thresholded: bit *i* (row-major, index 0
/// least-significant) is set when `tile[row, col+1] > tile[row, col]`.
pub fn compute(frame: &DecodedFrame) -> Result<u64> {
    let luma = super::luma_plane(frame);
    let tile = super::resize_gray(&luma, frame.width, frame.height, TILE_WIDTH, TILE_HEIGHT)?;

    let mut hash: u64 = 0;
    for row in 0..TILE_HEIGHT {
        for col in 0..HASH_SIZE {
            let left = tile[(row * TILE_WIDTH + col) as usize];
            let right = tile[(row * TILE_WIDTH + col + 1) as usize];
            let bit_index = row * HASH_SIZE + col;
            if right > left {
                hash |= 1 << bit_index;
            }
        }
    }
    Ok(hash)
}

/// Hamming distance between two dHash/pHash values.
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identical_tiles_hash_to_zero_distance() {
        assert_eq!(hamming_distance(0xFF00FF00, 0xFF00FF00), 0);
    }

    #[test]
    fn full_bit_flip_is_max_distance() {
        assert_eq!(hamming_distance(0, u64::MAX), 64);
    }
}
