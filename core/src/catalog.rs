//! Adding and removing nowcast storms stored by the bridge.

use crate::gateway::BridgeApi;
use crate::prelude::{EngineError, EngineResult};
use crate::telemetry::LogManager;
use crate::wire::CreateTyphoonRequest;
use std::path::Path;

fn has_extension(path: &str, extension: &str) -> bool {
    Path::new(path.trim())
        .extension()
        .and_then(|found| found.to_str())
        .map_or(false, |found| found.eq_ignore_ascii_case(extension))
}

/// Checks a storm creation request before it is sent: a name, a `.csv`
/// table and a `.shp` track.
pub fn create_request(name: &str, csv_path: &str, shapefile_path: &str) -> EngineResult<CreateTyphoonRequest> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EngineError::InvalidInput("a storm needs a name".into()));
    }
    if !has_extension(csv_path, "csv") {
        return Err(EngineError::InvalidInput(format!(
            "{:?} is not a .csv table",
            csv_path
        )));
    }
    if !has_extension(shapefile_path, "shp") {
        return Err(EngineError::InvalidInput(format!(
            "{:?} is not a .shp track",
            shapefile_path
        )));
    }
    Ok(CreateTyphoonRequest {
        name: name.to_string(),
        csv_path: csv_path.trim().to_string(),
        shapefile_path: shapefile_path.trim().to_string(),
    })
}

/// Asks the bridge to build a storm from the request's files and returns its
/// uuid. Not retried: a repeated call could store the storm twice.
pub async fn create_storm<B: BridgeApi + ?Sized>(
    bridge: &B,
    request: &CreateTyphoonRequest,
) -> EngineResult<String> {
    let uuid = bridge
        .create_typhoon_from_files(request)
        .await
        .map_err(|err| EngineError::Transport(err.to_string()))?
        .ok_or_else(|| {
            EngineError::InvalidInput(format!(
                "the bridge could not build {} from {} and {}",
                request.name, request.csv_path, request.shapefile_path
            ))
        })?;
    LogManager::new("catalog").record(&format!("created storm {} as {}", request.name, uuid));
    Ok(uuid)
}

/// Removes a stored storm. An id the bridge does not know is an error.
pub async fn delete_storm<B: BridgeApi + ?Sized>(bridge: &B, id: &str) -> EngineResult<()> {
    let removed = bridge
        .delete_typhoon(id)
        .await
        .map_err(|err| EngineError::Transport(err.to_string()))?;
    if !removed {
        return Err(EngineError::UnknownStorm(id.to_string()));
    }
    LogManager::new("catalog").record(&format!("deleted storm {}", id));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake;

    #[test]
    fn requests_need_name_and_matching_files() {
        let request = create_request(" WIPHA ", "daily.csv", "/data/track.SHP").unwrap();
        assert_eq!(request.name, "WIPHA");
        assert_eq!(request.shapefile_path, "/data/track.SHP");

        assert!(create_request("", "daily.csv", "track.shp").is_err());
        assert!(create_request("WIPHA", "daily.xlsx", "track.shp").is_err());
        assert!(create_request("WIPHA", "daily.csv", "track.zip").is_err());
        assert!(create_request("WIPHA", "daily.csv", ".shp").is_err());
    }

    #[tokio::test]
    async fn created_storms_report_their_uuid() {
        let bridge = fake::nowcast_bridge();
        let request = create_request("WIPHA", "daily.csv", "track.shp").unwrap();
        assert_eq!(create_storm(&bridge, &request).await.unwrap(), "u-new-1");
        assert_eq!(bridge.created(), vec![request]);
        assert_eq!(bridge.call_count("create_typhoon_from_files"), 1);
    }

    #[tokio::test]
    async fn deleting_unknown_storm_fails() {
        let bridge = fake::nowcast_bridge();
        delete_storm(&bridge, "u-1").await.unwrap();
        let err = delete_storm(&bridge, "u-1").await.unwrap_err();
        assert_eq!(err, EngineError::UnknownStorm("u-1".into()));
        assert!(delete_storm(&bridge, "u-9").await.is_err());
    }

    #[tokio::test]
    async fn unreachable_bridge_is_a_transport_error() {
        let bridge = fake::nowcast_bridge();
        bridge.set_down(true);
        let err = delete_storm(&bridge, "u-1").await.unwrap_err();
        assert!(matches!(err, EngineError::Transport(_)));
    }
}
