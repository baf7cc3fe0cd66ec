//! The Package Verifier (§4.6): checks a candidate video against a
//! previously signed package without trusting anything beyond the
//! package's own signed manifest.

use std::path::{Path, PathBuf};

use crate::compare::frame_stats::{self, StatsComparatorConfig, StatsVerdict};
use crate::compare::hamming::{self, HammingComparatorConfig};
use crate::compare::ssim::{self, SsimComparatorConfig};
use crate::compare::WindowVerdict;
use crate::evidence::{AuditClip, EvidenceExtractor, EvidenceExtractorConfig, FlaggedWindow, RenderedClip};
use crate::fingerprint;
use crate::media::{MediaAdapter, RecompressParams};
use crate::package::{self, Manifest, Signature};
use crate::util::hash_file;
use crate::Result;

/// Resolves the open design question in §9: whether fingerprint verdicts
/// should gate the overall result alongside SSIM. Defaults to
/// `SsimOnly`, preserving the §4.6 step 8 formula exactly; callers who
/// want fingerprints to veto as well can opt into the stricter policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum VerificationPolicy {
    SsimOnly,
    SsimAndAnyFingerprint,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        VerificationPolicy::SsimOnly
    }
}

/// Configuration for [`Verifier`].
#[derive(Debug, Clone, Default)]
pub struct VerifierConfig {
    pub recompress: RecompressParams,
    pub hamming: HammingComparatorConfig,
    pub stats: StatsComparatorConfig,
    pub ssim: SsimComparatorConfig,
    pub policy: VerificationPolicy,
    pub evidence: EvidenceExtractorConfig,
    /// When set, audit clips are rendered to this directory; otherwise
    /// only the merged clip intervals are reported.
    pub evidence_dir: Option<PathBuf>,
}

impl VerifierConfig {
    pub fn with_recompress(mut self, recompress: RecompressParams) -> Self {
        self.recompress = recompress;
        self
    }

    pub fn with_policy(mut self, policy: VerificationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_evidence(mut self, evidence: EvidenceExtractorConfig) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_evidence_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.evidence_dir = Some(dir.into());
        self
    }
}

/// Structured outcome of [`Verifier::verify`]. Every boolean check is
/// reported individually; fingerprint and SSIM comparisons never abort
/// the run, they only flip `is_valid` and populate their verdict field.
#[derive(Debug, Clone, Default)]
pub struct VerificationResult {
    pub is_valid: bool,
    pub package_structure: bool,
    pub manifest_integrity: bool,
    pub frame_count_match: bool,
    pub digest_hash_match: bool,
    pub ssim: Option<WindowVerdict>,
    pub dhash: Option<WindowVerdict>,
    pub phash: Option<WindowVerdict>,
    pub stats: Option<StatsVerdict>,
    pub policy: VerificationPolicy,
    pub audit_clips: Vec<AuditClip>,
    pub rendered_clips: Vec<RenderedClip>,
    pub errors: Vec<String>,
}

pub struct Verifier {
    config: VerifierConfig,
    adapter: MediaAdapter,
}

impl Verifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self {
            config,
            adapter: MediaAdapter,
        }
    }

    pub fn verify(&self, candidate: impl AsRef<Path>, package_dir: impl AsRef<Path>) -> Result<VerificationResult> {
        let candidate = candidate.as_ref();
        let package_dir = package_dir.as_ref();
        let span = tracing::span!(tracing::Level::INFO, "verify", candidate = %candidate.display());
        let _enter = span.enter();

        let mut result = VerificationResult {
            policy: self.config.policy,
            ..Default::default()
        };

        // Step 1: structure check.
        let manifest_path = package_dir.join(package::MANIFEST);
        let signature_path = package_dir.join(package::SIGNATURE);
        let digest_path = package_dir.join(package::DIGEST_VIDEO);
        if !manifest_path.exists() || !signature_path.exists() || !digest_path.exists() {
            result.errors.push("package is missing manifest.json, signature.json, or digest_video.mp4".to_string());
            return Ok(result);
        }
        result.package_structure = true;

        let manifest_bytes = std::fs::read(&manifest_path)?;
        let manifest_value: serde_json::Value = serde_json::from_slice(&manifest_bytes)?;
        let manifest: Manifest = serde_json::from_value(manifest_value.clone())?;
        let signature: Signature = serde_json::from_slice(&std::fs::read(&signature_path)?)?;

        // Step 2: manifest integrity, including the must-fix re-hash of
        // every artifact named in the manifest (§9). `algorithm` is the
        // discriminant for future asymmetric signing; an unrecognized
        // value must fail the check rather than be silently treated as
        // a content hash.
        if signature.algorithm != package::signature::ALGORITHM_SHA256 {
            result.errors.push(format!("unsupported signature algorithm: {}", signature.algorithm));
            result.manifest_integrity = false;
            return Ok(result);
        }
        let recomputed_manifest_hash = crate::util::hash_canonical(&manifest_value)?;
        let mut manifest_integrity = recomputed_manifest_hash == signature.manifest_hash;
        for (name, entry) in &manifest.files {
            let artifact_path = package_dir.join(name);
            match hash_file(&artifact_path) {
                Ok(hash) if hash == entry.sha256 => {}
                Ok(_) => {
                    manifest_integrity = false;
                    result.errors.push(format!("artifact {name} no longer matches its manifest hash"));
                }
                Err(e) => {
                    manifest_integrity = false;
                    result.errors.push(format!("failed to re-hash artifact {name}: {e}"));
                }
            }
        }
        result.manifest_integrity = manifest_integrity;

        // Step 3: recompute the reference digest from the candidate.
        let scratch = tempfile::tempdir()?;
        let scratch_digest = scratch.path().join("digest_video.mp4");
        self.adapter.recompress(candidate, &scratch_digest, &self.config.recompress)?;
        let scratch_probe = self.adapter.probe(&scratch_digest)?;

        // Step 4: primary content check.
        let stored_digest_hash = manifest
            .files
            .get(package::DIGEST_VIDEO)
            .map(|e| e.sha256.clone())
            .unwrap_or_default();
        let recomputed_digest_hash = hash_file(&scratch_digest)?;
        let digest_hash_match = recomputed_digest_hash == stored_digest_hash;
        result.digest_hash_match = digest_hash_match;

        let ssim_ok = if digest_hash_match {
            true
        } else {
            match self.adapter.ssim(&scratch_digest, &digest_path) {
                Ok(scores) => {
                    let verdict = ssim::compare(&scores, scratch_probe.fps, &self.config.ssim);
                    let ok = verdict.is_valid;
                    result.ssim = Some(verdict);
                    ok
                }
                Err(e) => {
                    result.errors.push(format!("ssim comparison failed: {e}"));
                    false
                }
            }
        };

        // Step 5: perceptual fingerprint cross-check.
        match fingerprint::compute_all(&self.adapter, candidate) {
            Ok(candidate_fp) => {
                let candidate_probe = self.adapter.probe(candidate)?;
                match fingerprint::read_bin(&package_dir.join(package::DHASH_BIN)) {
                    Ok(stored_dhash) => match hamming::compare(
                        &stored_dhash,
                        &candidate_fp.dhash,
                        candidate_probe.fps,
                        &self.config.hamming,
                    ) {
                        Ok(verdict) => result.dhash = Some(verdict),
                        Err(e) => result.errors.push(format!("dhash comparison failed: {e}")),
                    },
                    Err(e) => result.errors.push(format!("failed to read stored dhash: {e}")),
                }
                match fingerprint::read_bin(&package_dir.join(package::PHASH_BIN)) {
                    Ok(stored_phash) => match hamming::compare(
                        &stored_phash,
                        &candidate_fp.phash,
                        candidate_probe.fps,
                        &self.config.hamming,
                    ) {
                        Ok(verdict) => result.phash = Some(verdict),
                        Err(e) => result.errors.push(format!("phash comparison failed: {e}")),
                    },
                    Err(e) => result.errors.push(format!("failed to read stored phash: {e}")),
                }
                match fingerprint::read_stats_json(&package_dir.join(package::FRAME_STATS_JSON)) {
                    Ok(stored_stats) => match frame_stats::compare(
                        &stored_stats,
                        &candidate_fp.stats,
                        candidate_probe.fps,
                        &self.config.stats,
                    ) {
                        Ok(verdict) => result.stats = Some(verdict),
                        Err(e) => result.errors.push(format!("frame statistics comparison failed: {e}")),
                    },
                    Err(e) => result.errors.push(format!("failed to read stored frame statistics: {e}")),
                }
            }
            Err(e) => {
                result.errors.push(format!("failed to fingerprint candidate: {e}"));
            }
        }

        // Step 6: frame-count check, preferring the manifest's precomputed
        // digest properties.
        let stored_frame_count = match manifest.digest_properties {
            Some(props) => props.frame_count,
            None => self.adapter.probe(&digest_path)?.frame_count,
        };
        result.frame_count_match = scratch_probe.frame_count == stored_frame_count;

        // Step 7: evidence.
        let mut flagged = Vec::new();
        collect_flagged(&mut flagged, "ssim", result.ssim.as_ref());
        collect_flagged(&mut flagged, "dhash", result.dhash.as_ref());
        collect_flagged(&mut flagged, "phash", result.phash.as_ref());
        if let Some(stats) = &result.stats {
            if !stats.is_valid {
                for w in &stats.worst_windows {
                    flagged.push(FlaggedWindow {
                        comparator: "stats".to_string(),
                        start_frame: w.start_frame,
                        end_frame: w.end_frame,
                        metric: w.aggregate,
                    });
                }
            }
        }

        if !flagged.is_empty() {
            let extractor = EvidenceExtractor::new(self.config.evidence.clone());
            let clips = extractor.merge_windows(&flagged, scratch_probe.fps);
            if let Some(evidence_dir) = &self.config.evidence_dir {
                match extractor.render(candidate, &digest_path, &clips, evidence_dir) {
                    Ok(rendered) => result.rendered_clips = rendered,
                    Err(e) => result.errors.push(format!("failed to render audit clips: {e}")),
                }
            }
            result.audit_clips = clips;
        }

        // Step 8: overall verdict.
        let base_is_valid =
            result.package_structure && result.manifest_integrity && result.frame_count_match && (digest_hash_match || ssim_ok);

        result.is_valid = match self.config.policy {
            VerificationPolicy::SsimOnly => base_is_valid,
            VerificationPolicy::SsimAndAnyFingerprint => {
                let any_fingerprint_valid = result.dhash.as_ref().map(|v| v.is_valid).unwrap_or(false)
                    || result.phash.as_ref().map(|v| v.is_valid).unwrap_or(false)
                    || result.stats.as_ref().map(|v| v.is_valid).unwrap_or(false);
                base_is_valid && any_fingerprint_valid
            }
        };

        tracing::info!(is_valid = result.is_valid, "verify complete");
        Ok(result)
    }
}

fn collect_flagged(out: &mut Vec<FlaggedWindow>, name: &str, verdict: Option<&WindowVerdict>) {
    if let Some(verdict) = verdict {
        if !verdict.is_valid {
            for w in &verdict.worst_windows {
                out.push(FlaggedWindow {
                    comparator: name.to_string(),
                    start_frame: w.start_frame,
                    end_frame: w.end_frame,
                    metric: w.aggregate,
                });
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_policy_is_ssim_only() {
        assert_eq!(VerificationPolicy::default(), VerificationPolicy::SsimOnly);
    }

    #[test]
    fn missing_package_files_fail_structure_check() {
        let verifier = Verifier::new(VerifierConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let result = verifier.verify(dir.path().join("missing.mp4"), dir.path());
        // Structure check runs before any file I/O on the candidate, so
        // this never reaches the media adapter.
        let result = result.unwrap();
        assert!(!result.package_structure);
        assert!(!result.is_valid);
    }

    #[test]
    fn unknown_signature_algorithm_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(package::DIGEST_VIDEO), b"not a real video").unwrap();
        std::fs::write(
            dir.path().join(package::MANIFEST),
            serde_json::to_vec(&serde_json::json!({
                "package_id": "deadbeefdeadbeef",
                "original_video_sha256": "deadbeef".repeat(8),
                "files": {},
                "fingerprints": {},
            }))
            .unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join(package::SIGNATURE),
            serde_json::to_vec(&serde_json::json!({
                "version": 1,
                "algorithm": "ECDSA-P256",
                "manifest_hash": "deadbeef",
            }))
            .unwrap(),
        )
        .unwrap();

        let verifier = Verifier::new(VerifierConfig::default());
        let result = verifier
            .verify(dir.path().join("candidate.mp4"), dir.path())
            .unwrap();

        assert!(result.package_structure);
        assert!(!result.manifest_integrity);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("unsupported signature algorithm")));
    }
}
