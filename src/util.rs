use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::Result;

/// Formats a duration given in seconds as `MM:SS`, or `HH:MM:SS` once the
/// hour mark is reached.
pub fn format_time(total_seconds: f64) -> String {
    let total_seconds = total_seconds.max(0.0).round() as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Computes the SHA-256 hash of a file, streamed in 4 KiB chunks so the
/// whole file is never buffered in memory.
pub fn hash_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mut f =
        std::fs::File::open(path).map_err(|_| crate::Error::InputNotFound(path.to_owned()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Computes the SHA-256 hash of an in-memory byte slice.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Serializes a [`serde_json::Value`] into the canonical form required for
/// manifest hashing: keys sorted lexicographically at every level, `,` and
/// `:` separators, no whitespace. `serde_json::Value`'s map is a
/// `BTreeMap` by default (the `preserve_order` feature is not enabled),
/// so simply serializing it already emits sorted keys; we only need to
/// force compact separators.
pub fn canonicalize(value: &serde_json::Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::CompactFormatter;
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    serde::Serialize::serialize(value, &mut ser)?;
    Ok(buf)
}

/// Hashes the canonical form of `value`.
pub fn hash_canonical(value: &serde_json::Value) -> Result<String> {
    Ok(hash_bytes(&canonicalize(value)?))
}

/// Cheap header-only check that `path` looks like a video file, using
/// file "magic bytes" rather than a full FFmpeg decode. Intended as a
/// fast pre-flight in the CLI before handing a path to the Media Adapter;
/// it is not a substitute for FFmpeg's own decode failures.
pub fn looks_like_video(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    let mut buf = [0u8; 8192];
    let Ok(mut f) = std::fs::File::open(path) else {
        return false;
    };
    let Ok(n) = f.read(&mut buf) else {
        return false;
    };
    infer::is_video(&buf[..n])
}

/// Returns the FFmpeg version string this binary was linked against.
pub fn ffmpeg_version_string() -> String {
    let version = ffmpeg_next::util::version();
    format!(
        "{}.{}.{}",
        (version >> 16) & 0xff,
        (version >> 8) & 0xff,
        version & 0xff
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn format_time_under_an_hour() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(45.0), "00:45");
        assert_eq!(format_time(125.0), "02:05");
    }

    #[test]
    fn format_time_over_an_hour() {
        assert_eq!(format_time(3661.0), "01:01:01");
    }

    #[test]
    fn format_time_clamps_negative() {
        assert_eq!(format_time(-5.0), "00:00");
    }

    #[test]
    fn canonicalize_sorts_keys_and_strips_whitespace() {
        let value = serde_json::json!({"b": 1, "a": {"d": 2, "c": 3}});
        let canonical = canonicalize(&value).unwrap();
        assert_eq!(
            String::from_utf8(canonical).unwrap(),
            r#"{"a":{"c":3,"d":2},"b":1}"#
        );
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let value = serde_json::json!({"z": [3, 1, 2], "a": "x"});
        let once = canonicalize(&value).unwrap();
        let reparsed: serde_json::Value = serde_json::from_slice(&once).unwrap();
        let twice = canonicalize(&reparsed).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn looks_like_video_rejects_non_video_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_a_video.txt");
        std::fs::write(&path, b"just some text").unwrap();
        assert!(!looks_like_video(&path));
    }

    #[test]
    fn looks_like_video_rejects_missing_files() {
        assert!(!looks_like_video("/nonexistent/path.mp4"));
    }
}
