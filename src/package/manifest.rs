//! The package manifest (§4.5 step 6, §6): a content-addressed index of
//! every other artifact in the package.

use std::collections::BTreeMap;

/// A single hashed artifact entry.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FileEntry {
    pub sha256: String,
    pub size_bytes: u64,
}

/// A fingerprint artifact entry: byte size plus how long it took to
/// compute, kept separate from [`FileEntry`] because it is descriptive
/// rather than load-bearing for the hash chain (the hash itself still
/// lives in [`Manifest::files`]).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FingerprintEntry {
    pub size_bytes: u64,
    pub compute_time_ms: u64,
}

/// Reference-digest properties recorded at sign time so the Verifier can
/// prefer them over recomputing a probe where possible.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DigestProperties {
    pub frame_count: u64,
    pub fps: f64,
    pub duration_seconds: f64,
}

/// The top-level manifest document. Canonicalized (sorted keys, no
/// whitespace) before hashing; see [`crate::util::canonicalize`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Manifest {
    /// First 16 hex characters of `original_video_sha256`.
    pub package_id: String,
    pub original_video_sha256: String,
    /// Logical artifact name (in-package relative path) to hash entry.
    /// Covers every artifact except `signature.json` itself.
    pub files: BTreeMap<String, FileEntry>,
    pub fingerprints: BTreeMap<String, FingerprintEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest_properties: Option<DigestProperties>,
}

impl Manifest {
    pub fn package_id_from_hash(original_video_sha256: &str) -> String {
        original_video_sha256.chars().take(16).collect()
    }

    /// Serializes to a [`serde_json::Value`] suitable for
    /// [`crate::util::canonicalize`].
    pub fn to_value(&self) -> crate::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn package_id_is_first_sixteen_hex_chars() {
        let hash = "abcdef0123456789abcdef0123456789abcdef0123456789abcdef01234567";
        assert_eq!(Manifest::package_id_from_hash(hash), "abcdef0123456789");
    }

    #[test]
    fn canonical_form_sorts_file_entries_by_name() {
        let mut files = BTreeMap::new();
        files.insert(
            "z.bin".to_string(),
            FileEntry {
                sha256: "z".to_string(),
                size_bytes: 1,
            },
        );
        files.insert(
            "a.bin".to_string(),
            FileEntry {
                sha256: "a".to_string(),
                size_bytes: 2,
            },
        );
        let manifest = Manifest {
            package_id: "deadbeefdeadbeef".to_string(),
            original_video_sha256: "deadbeef".repeat(8),
            files,
            fingerprints: BTreeMap::new(),
            digest_properties: None,
        };
        let value = manifest.to_value().unwrap();
        let canonical = crate::util::canonicalize(&value).unwrap();
        let text = String::from_utf8(canonical).unwrap();
        assert!(text.find("\"a.bin\"").unwrap() < text.find("\"z.bin\"").unwrap());
    }
}
