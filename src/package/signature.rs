//! The package signature (§6): `{version, algorithm, manifest_hash, note}`.
//! `algorithm` discriminates the hash scheme so a future signature kind
//! (e.g. an ECDSA-P256 signature over the manifest hash) can be added
//! without breaking older packages.

/// Current signature format version.
pub const SIGNATURE_VERSION: u32 = 1;
/// The only algorithm this crate currently emits or accepts.
pub const ALGORITHM_SHA256: &str = "SHA-256";

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Signature {
    pub version: u32,
    pub algorithm: String,
    pub manifest_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Signature {
    pub fn new(manifest_hash: String) -> Self {
        Self {
            version: SIGNATURE_VERSION,
            algorithm: ALGORITHM_SHA256.to_string(),
            manifest_hash,
            note: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn new_signature_uses_sha256_algorithm() {
        let sig = Signature::new("abc".to_string());
        assert_eq!(sig.algorithm, ALGORITHM_SHA256);
        assert_eq!(sig.version, SIGNATURE_VERSION);
    }
}
