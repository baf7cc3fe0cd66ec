//! The Package Builder/Signer (§4.5): produces a content-addressed package
//! directory from a source video, ending in a signed manifest.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::fingerprint::{self, FrameFingerprints};
use crate::media::{MediaAdapter, Probe, RecompressParams};
use crate::package::manifest::{DigestProperties, FileEntry, FingerprintEntry};
use crate::package::metadata::{self, MetadataOptions};
use crate::package::{self, audio, Manifest, Signature};
use crate::util::{hash_canonical, hash_file};
use crate::Result;

/// Configuration for [`Signer`].
#[derive(Debug, Clone, Default)]
pub struct SignerConfig {
    pub recompress: RecompressParams,
    pub metadata_options: MetadataOptions,
    pub parallel_fingerprints: bool,
}

impl SignerConfig {
    pub fn with_recompress(mut self, recompress: RecompressParams) -> Self {
        self.recompress = recompress;
        self
    }

    pub fn with_metadata_options(mut self, options: MetadataOptions) -> Self {
        self.metadata_options = options;
        self
    }

    pub fn with_parallel_fingerprints(mut self, parallel: bool) -> Self {
        self.parallel_fingerprints = parallel;
        self
    }
}

/// The outcome of a successful [`Signer::sign`] call.
#[derive(Debug, Clone)]
pub struct SignedPackage {
    pub package_id: String,
    pub package_dir: PathBuf,
    pub manifest: Manifest,
    pub signature: Signature,
}

/// Orchestrates the ordered steps in §4.5. Each step produces a
/// content-addressed artifact on disk before the next step runs.
pub struct Signer {
    config: SignerConfig,
    adapter: MediaAdapter,
}

impl Signer {
    pub fn new(config: SignerConfig) -> Self {
        Self {
            config,
            adapter: MediaAdapter,
        }
    }

    /// Signs `source`, writing the package into `package_dir` (created if
    /// needed). On any error the partial package directory is left in
    /// place for operator inspection, per §7.
    pub fn sign(&self, source: impl AsRef<Path>, package_dir: impl AsRef<Path>) -> Result<SignedPackage> {
        let source = source.as_ref();
        let package_dir = package_dir.as_ref();
        let span = tracing::span!(tracing::Level::INFO, "sign", source = %source.display());
        let _enter = span.enter();

        std::fs::create_dir_all(package_dir)?;
        std::fs::create_dir_all(package_dir.join("fingerprints"))?;

        // Step 1: hash the source.
        tracing::debug!("hashing source video");
        let original_video_sha256 = hash_file(source)?;
        let package_id = Manifest::package_id_from_hash(&original_video_sha256);

        // Step 2: recompress to the reference digest; hash it.
        let digest_path = package_dir.join(package::DIGEST_VIDEO);
        tracing::debug!(width = self.config.recompress.width, "recompressing reference digest");
        self.adapter.recompress(source, &digest_path, &self.config.recompress)?;
        let digest_entry = self.hash_artifact(&digest_path)?;
        let digest_probe: Probe = self.adapter.probe(&digest_path)?;

        // Step 3: extract and fingerprint audio.
        let scratch = tempfile::tempdir()?;
        tracing::debug!("extracting and fingerprinting audio");
        let audio_fingerprint = audio::compute(&self.adapter, source, scratch.path())?;
        let audio_path = package_dir.join(package::AUDIO_FINGERPRINT);
        write_json(&audio_path, &audio_fingerprint)?;
        let audio_entry = self.hash_artifact(&audio_path)?;

        // Step 4: build and write metadata.
        tracing::debug!("building metadata blob");
        let metadata_blob = metadata::build(&self.adapter, source, self.config.metadata_options.clone())?;
        let metadata_path = package_dir.join(package::METADATA);
        write_json(&metadata_path, &metadata_blob)?;
        let metadata_entry = self.hash_artifact(&metadata_path)?;

        // Step 5: compute fingerprints over the original source.
        tracing::debug!("computing dHash/pHash/frame-statistics over the original source");
        let compute_start = Instant::now();
        let fingerprints: FrameFingerprints = if self.config.parallel_fingerprints {
            fingerprint::compute_all_parallel(&self.adapter, source)?
        } else {
            fingerprint::compute_all(&self.adapter, source)?
        };
        let compute_time_ms = compute_start.elapsed().as_millis() as u64;

        let dhash_path = package_dir.join(package::DHASH_BIN);
        fingerprint::write_bin(&dhash_path, &fingerprints.dhash)?;
        let phash_path = package_dir.join(package::PHASH_BIN);
        fingerprint::write_bin(&phash_path, &fingerprints.phash)?;
        let stats_path = package_dir.join(package::FRAME_STATS_JSON);
        fingerprint::write_stats_json(&stats_path, &fingerprints.stats)?;

        let dhash_entry = self.hash_artifact(&dhash_path)?;
        let phash_entry = self.hash_artifact(&phash_path)?;
        let stats_entry = self.hash_artifact(&stats_path)?;

        // Step 6: assemble and hash the manifest, then emit the signature.
        let mut files = BTreeMap::new();
        files.insert(package::DIGEST_VIDEO.to_string(), digest_entry);
        files.insert(package::AUDIO_FINGERPRINT.to_string(), audio_entry);
        files.insert(package::METADATA.to_string(), metadata_entry);
        files.insert(package::DHASH_BIN.to_string(), dhash_entry.clone());
        files.insert(package::PHASH_BIN.to_string(), phash_entry.clone());
        files.insert(package::FRAME_STATS_JSON.to_string(), stats_entry.clone());

        let mut fingerprints_submanifest = BTreeMap::new();
        fingerprints_submanifest.insert(
            package::DHASH_BIN.to_string(),
            FingerprintEntry {
                size_bytes: dhash_entry.size_bytes,
                compute_time_ms,
            },
        );
        fingerprints_submanifest.insert(
            package::PHASH_BIN.to_string(),
            FingerprintEntry {
                size_bytes: phash_entry.size_bytes,
                compute_time_ms,
            },
        );
        fingerprints_submanifest.insert(
            package::FRAME_STATS_JSON.to_string(),
            FingerprintEntry {
                size_bytes: stats_entry.size_bytes,
                compute_time_ms,
            },
        );

        let manifest = Manifest {
            package_id: package_id.clone(),
            original_video_sha256,
            files,
            fingerprints: fingerprints_submanifest,
            digest_properties: Some(DigestProperties {
                frame_count: digest_probe.frame_count,
                fps: digest_probe.fps,
                duration_seconds: digest_probe.duration_seconds,
            }),
        };

        let manifest_value = manifest.to_value()?;
        let manifest_hash = hash_canonical(&manifest_value)?;
        let manifest_path = package_dir.join(package::MANIFEST);
        std::fs::write(&manifest_path, crate::util::canonicalize(&manifest_value)?)?;

        let signature = Signature::new(manifest_hash);
        let signature_path = package_dir.join(package::SIGNATURE);
        write_json(&signature_path, &signature)?;

        tracing::info!(package_id = %package_id, "sign complete");
        Ok(SignedPackage {
            package_id,
            package_dir: package_dir.to_path_buf(),
            manifest,
            signature,
        })
    }

    fn hash_artifact(&self, path: &Path) -> Result<FileEntry> {
        let size_bytes = std::fs::metadata(path)?.len();
        Ok(FileEntry {
            sha256: hash_file(path)?,
            size_bytes,
        })
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}
