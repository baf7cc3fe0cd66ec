//! The metadata blob (§4.5 step 4): source file facts plus optional
//! identity/location/free-form fields, mirrored from
//! `original_source/metadata.py`'s `create_metadata`.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::media::{ContainerInfo, MediaAdapter};
use crate::Result;

/// Current metadata schema version.
pub const METADATA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceFileInfo {
    pub name: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VideoInfo {
    pub duration_seconds: f64,
    pub format_name: String,
    pub stream_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GpsCoords {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MetadataBlob {
    pub version: u32,
    pub timestamp: DateTime<Utc>,
    pub source_file: SourceFileInfo,
    pub video_info: VideoInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps: Option<GpsCoords>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<serde_json::Value>,
}

/// Optional fields a caller may attach to a [`MetadataBlob`] at sign time.
#[derive(Debug, Clone, Default)]
pub struct MetadataOptions {
    pub user_identity: Option<String>,
    pub gps: Option<GpsCoords>,
    pub additional_info: Option<serde_json::Value>,
}

/// Builds a [`MetadataBlob`] for `source`, probing its container via the
/// Media Adapter and reading file timestamps from the filesystem.
pub fn build(adapter: &MediaAdapter, source: &Path, options: MetadataOptions) -> Result<MetadataBlob> {
    let fs_metadata = std::fs::metadata(source)?;
    let ContainerInfo {
        format_name,
        stream_count,
        duration_seconds,
        creation_time,
    } = adapter.container_info(source)?;

    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(MetadataBlob {
        version: METADATA_VERSION,
        timestamp: Utc::now(),
        source_file: SourceFileInfo {
            name,
            size_bytes: fs_metadata.len(),
            created_at: fs_metadata
                .created()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now()),
            modified_at: fs_metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now()),
        },
        video_info: VideoInfo {
            duration_seconds,
            format_name,
            stream_count,
            creation_time,
        },
        user_identity: options.user_identity,
        gps: options.gps,
        additional_info: options.additional_info,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn metadata_options_default_to_none() {
        let options = MetadataOptions::default();
        assert!(options.user_identity.is_none());
        assert!(options.gps.is_none());
        assert!(options.additional_info.is_none());
    }

    #[test]
    fn metadata_blob_serializes_without_optional_fields() {
        let blob = MetadataBlob {
            version: METADATA_VERSION,
            timestamp: Utc::now(),
            source_file: SourceFileInfo {
                name: "source.mp4".to_string(),
                size_bytes: 100,
                created_at: Utc::now(),
                modified_at: Utc::now(),
            },
            video_info: VideoInfo {
                duration_seconds: 10.0,
                format_name: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
                stream_count: 2,
                creation_time: None,
            },
            user_identity: None,
            gps: None,
            additional_info: None,
        };
        let value = serde_json::to_value(&blob).unwrap();
        assert!(value.get("user_identity").is_none());
        assert!(value.get("gps").is_none());
    }
}
