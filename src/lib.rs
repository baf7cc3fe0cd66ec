//! reeltrust: tamper-evident perceptual verification packages for source
//! video.
//!
//! A [`sign::Signer`] takes a source video and produces a package directory
//! containing a reference digest, per-frame fingerprints, an audio
//! fingerprint, metadata, and a signed manifest. A [`verify::Verifier`]
//! takes a candidate video plus that package and reports whether the
//! candidate is a faithful (re-encoded, not tampered) copy of the original,
//! using windowed perceptual comparisons rather than a simple byte or
//! whole-file hash match. An [`evidence::EvidenceExtractor`] turns a failed
//! verification's flagged windows into reviewable audit clips.
//!
//! ```no_run
//! use reeltrust::sign::{Signer, SignerConfig};
//!
//! let signer = Signer::new(SignerConfig::default());
//! let package = signer.sign("source.mp4", "package/")?;
//! println!("package id: {}", package.package_id);
//! # Ok::<(), reeltrust::Error>(())
//! ```

pub mod compare;
pub mod error;
pub mod evidence;
pub mod fingerprint;
pub mod media;
pub mod package;
pub mod sign;
pub mod util;
pub mod verify;

pub use error::{Error, Result};

/// Target width, in pixels, of the reference digest (§6).
pub const DEFAULT_DIGEST_WIDTH: u32 = 240;
/// Constant rate factor used when recompressing the reference digest.
pub const DEFAULT_DIGEST_CRF: u32 = 23;
/// x264 preset used when recompressing the reference digest.
pub const DEFAULT_DIGEST_PRESET: &str = "slow";
/// Frames per non-overlapping comparison window.
pub const DEFAULT_WINDOW_SIZE: usize = 60;
/// Fallback frame rate used only when a probe cannot determine the real
/// rate. Comparators must prefer the true fps from [`media::MediaAdapter::probe`].
pub const DEFAULT_FPS: f64 = 30.0;
/// Worst-window mean Hamming distance (bits) below which a dHash/pHash
/// comparison is considered valid.
pub const DEFAULT_HAMMING_THRESHOLD_BITS: f64 = 5.0;
/// Worst-window mean SSIM at or above which a comparison is considered
/// valid when verifying.
pub const DEFAULT_SSIM_THRESHOLD_VERIFY: f64 = 0.92;
/// Stricter SSIM threshold retained for historical/administrative use
/// where a digest hash match is also expected.
pub const DEFAULT_SSIM_THRESHOLD_HISTORICAL: f64 = 0.99;
/// Lead-in context, in seconds, prepended to each audit clip.
pub const DEFAULT_LEAD_IN_SECONDS: f64 = 1.5;
/// Maximum gap, in seconds, between flagged windows that still merges
/// them into a single audit clip.
pub const DEFAULT_MERGE_GAP_SECONDS: f64 = 5.0;
