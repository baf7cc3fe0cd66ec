use std::path::PathBuf;

/// Crate-wide error type, grouped by the failure categories in the design
/// (input resolution, package structure, external media tooling, and the
/// sign-time fingerprint invariant).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A candidate video, package directory, or required file inside a
    /// package could not be found.
    #[error("not found: {0:?}")]
    InputNotFound(PathBuf),
    /// Required package files are present but the manifest or signature
    /// are not internally consistent.
    #[error("malformed package: {0}")]
    PackageMalformed(String),
    /// The external `ffmpeg`/`ffprobe` toolkit failed to decode, encode,
    /// compare, or extract a clip.
    #[error("media adapter failure: {0}")]
    MediaFailure(String),
    /// Two fingerprint sequences differ in length or are not a multiple
    /// of the expected record size. Recorded as a comparator-local error;
    /// never aborts a verify.
    #[error("fingerprint mismatch: {0}")]
    FingerprintMismatch(String),
    /// The three per-frame fingerprint sequences disagree on frame count
    /// at sign time. Fatal.
    #[error("internal invariant violated: dhash={dhash} phash={phash} stats={stats}")]
    InternalInvariant {
        dhash: usize,
        phash: usize,
        stats: usize,
    },
    /// Wraps [`ffmpeg_next::Error`].
    #[error("ffmpeg error: {0}")]
    Ffmpeg(#[from] ffmpeg_next::Error),
    /// Wraps [`std::io::Error`].
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Wraps [`serde_json::Error`].
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
