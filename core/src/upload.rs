//! Cyclone track archive uploads.

use crate::gateway::BridgeApi;
use crate::prelude::{EngineError, EngineResult};
use crate::telemetry::LogManager;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::fs;
use std::path::Path;

/// Only zipped shapefile archives are accepted.
pub fn validate_archive_name(filename: &str) -> EngineResult<()> {
    let lower = filename.trim().to_ascii_lowercase();
    if lower.len() > ".zip".len() && lower.ends_with(".zip") {
        Ok(())
    } else {
        Err(EngineError::InvalidInput(format!(
            "{:?} is not a .zip archive",
            filename
        )))
    }
}

/// Sends an archive to the bridge and returns the path it was stored under.
/// The name is checked before anything is encoded or sent.
pub async fn upload_cyclone_track<B: BridgeApi + ?Sized>(
    bridge: &B,
    filename: &str,
    contents: &[u8],
) -> EngineResult<String> {
    validate_archive_name(filename)?;
    let encoded = STANDARD.encode(contents);
    let path = bridge
        .upload_cyclone_track(&encoded, filename)
        .await
        .map_err(|err| EngineError::Transport(err.to_string()))?;
    LogManager::new("upload").record(&format!(
        "uploaded {} ({} bytes) to {}",
        filename,
        contents.len(),
        path
    ));
    Ok(path)
}

/// Reads `path` from disk and uploads it under its file name.
pub async fn upload_track_file<B: BridgeApi + ?Sized>(bridge: &B, path: &Path) -> EngineResult<String> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| EngineError::InvalidInput(format!("no file name in {}", path.display())))?;
    validate_archive_name(filename)?;
    let contents = fs::read(path)
        .map_err(|err| EngineError::InvalidInput(format!("reading {}: {}", path.display(), err)))?;
    upload_cyclone_track(bridge, filename, &contents).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::FakeBridge;
    use std::io::Write;

    #[tokio::test]
    async fn non_zip_is_rejected_before_any_call() {
        let bridge = FakeBridge::new();
        let err = upload_cyclone_track(&bridge, "track.csv", b"lat,lon").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        assert_eq!(bridge.total_calls(), 0);
    }

    #[tokio::test]
    async fn zip_is_encoded_and_forwarded() {
        let bridge = FakeBridge::new();
        let path = upload_cyclone_track(&bridge, "Track.ZIP", b"PK\x03\x04").await.unwrap();
        assert_eq!(path, "/tmp/uploads/Track.ZIP");
        let uploads = bridge.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].file_data, "UEsDBA==");
    }

    #[tokio::test]
    async fn files_are_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("cyclone.zip");
        fs::File::create(&archive).unwrap().write_all(b"zip").unwrap();
        let bridge = FakeBridge::new();
        upload_track_file(&bridge, &archive).await.unwrap();
        assert_eq!(bridge.call_count("upload_cyclone_track"), 1);

        let missing = dir.path().join("missing.shp");
        assert!(upload_track_file(&bridge, &missing).await.is_err());
        assert_eq!(bridge.call_count("upload_cyclone_track"), 1);
    }
}
