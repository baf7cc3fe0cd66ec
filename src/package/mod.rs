//! On-disk package structure (§6): the manifest/signature pair plus the
//! artifacts they describe.

pub mod audio;
pub mod manifest;
pub mod metadata;
pub mod signature;

pub use manifest::Manifest;
pub use signature::Signature;

/// Canonical in-package relative paths, referenced by both the Signer and
/// the Verifier so the two sides can never disagree on layout.
pub const DIGEST_VIDEO: &str = "digest_video.mp4";
pub const AUDIO_FINGERPRINT: &str = "audio_fingerprint.json";
pub const METADATA: &str = "metadata.json";
pub const MANIFEST: &str = "manifest.json";
pub const SIGNATURE: &str = "signature.json";
pub const DHASH_BIN: &str = "fingerprints/dhash.bin";
pub const PHASH_BIN: &str = "fingerprints/phash.bin";
pub const FRAME_STATS_JSON: &str = "fingerprints/frame_stats.json";
