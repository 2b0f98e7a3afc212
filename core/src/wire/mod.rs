//! Payload shapes exchanged with the bridge.
//!
//! The bridge is loosely typed: numeric fields may arrive as numbers or as
//! display strings (`"12.5 knots"`, `"+15.2%"`), and the dashboard payload
//! lists storms either as a keyed map (historical) or as a list (nowcast).
//! These types accept all of those shapes; `convert` turns them into the
//! engine's model.

pub mod convert;
pub mod routes;

use crate::math::stats::StatsHelper;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A number that may be encoded as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    pub fn value(&self) -> Option<f64> {
        match self {
            NumberOrText::Number(value) if value.is_finite() => Some(*value),
            NumberOrText::Number(_) => None,
            NumberOrText::Text(text) => StatsHelper::parse_metric(text),
        }
    }

    pub fn value_or_zero(&self) -> f64 {
        self.value().unwrap_or(0.0)
    }
}

impl Default for NumberOrText {
    fn default() -> Self {
        NumberOrText::Number(0.0)
    }
}

impl From<f64> for NumberOrText {
    fn from(value: f64) -> Self {
        NumberOrText::Number(value)
    }
}

/// Storm listing inside a dashboard payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TyphoonEntries {
    Keyed(Map<String, Value>),
    Listed(Vec<TyphoonSummary>),
}

impl Default for TyphoonEntries {
    fn default() -> Self {
        TyphoonEntries::Keyed(Map::new())
    }
}

impl TyphoonEntries {
    pub fn len(&self) -> usize {
        match self {
            TyphoonEntries::Keyed(map) => map.len(),
            TyphoonEntries::Listed(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Response of `get_dashboard_data` / `get_dashboard_data_by_year`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardResponse {
    #[serde(default)]
    pub typhoons: TyphoonEntries,
    #[serde(default)]
    pub fishing_grounds: Vec<FishingGroundWire>,
    #[serde(default)]
    pub fishing_grounds_geojson: Option<FeatureCollection>,
    #[serde(default)]
    pub latest_year: Option<i32>,
    #[serde(default)]
    pub default_typhoon: Option<TyphoonDetail>,
    #[serde(default)]
    pub default_dates: Vec<String>,
}

/// Nowcast storm list entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TyphoonSummary {
    pub uuid: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub date_range: Option<String>,
    #[serde(default)]
    pub track_points_count: Option<usize>,
}

/// Per-ground statistics inside a historical dashboard entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroundStat {
    #[serde(default)]
    pub baseline: NumberOrText,
    #[serde(default)]
    pub difference: NumberOrText,
    #[serde(default)]
    pub distance: NumberOrText,
}

/// Historical dashboard entry, keyed by storm identifier in the payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "type")]
    pub category: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub dates: Option<String>,
    #[serde(default)]
    pub avg_speed: NumberOrText,
    #[serde(default)]
    pub max_speed: NumberOrText,
    #[serde(default)]
    pub max_wind: NumberOrText,
    #[serde(default)]
    pub closest_ground: Option<String>,
    #[serde(default)]
    pub min_distance: Option<NumberOrText>,
    #[serde(default)]
    pub boat_data: Map<String, Value>,
    #[serde(default)]
    pub average_boats: Option<NumberOrText>,
    #[serde(default, rename = "track_points")]
    pub track_points: Vec<TrackPointWire>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPointWire {
    pub lat: f64,
    pub lng: f64,
    pub datetime: String,
    #[serde(default)]
    pub wind_speed: NumberOrText,
    #[serde(default)]
    pub cyclone_speed: NumberOrText,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoatCountsWire {
    #[serde(default)]
    pub baseline: Vec<NumberOrText>,
    #[serde(default)]
    pub predicted: Vec<NumberOrText>,
}

/// Nowcast per-date metrics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMetricsWire {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub avg_storm_speed: NumberOrText,
    #[serde(default)]
    pub max_storm_speed: NumberOrText,
    #[serde(default)]
    pub max_wind_speed: NumberOrText,
    #[serde(default)]
    pub distances: Vec<NumberOrText>,
    #[serde(default)]
    pub boat_counts: BoatCountsWire,
    #[serde(default)]
    pub activity_difference: Vec<NumberOrText>,
}

/// Response of `get_typhoon_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TyphoonDetail {
    pub uuid: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub track_points: Vec<TrackPointWire>,
    #[serde(default)]
    pub daily_data: Map<String, Value>,
    #[serde(default)]
    pub dashboard_data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FishingGroundWire {
    #[serde(default)]
    pub id: Option<Value>,
    pub name: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

/// Minimal GeoJSON geometry: the type tag plus raw coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: Value,
}

impl Geometry {
    pub fn point(lon: f64, lat: f64) -> Self {
        Self {
            kind: "Point".into(),
            coordinates: serde_json::json!([lon, lat]),
        }
    }

    /// `[lon, lat]` of a Point geometry.
    pub fn as_point(&self) -> Option<[f64; 2]> {
        if self.kind != "Point" {
            return None;
        }
        serde_json::from_value(self.coordinates.clone()).ok()
    }

    /// Exterior ring of a Polygon, or of the first part of a MultiPolygon.
    pub fn exterior_ring(&self) -> Option<Vec<[f64; 2]>> {
        match self.kind.as_str() {
            "Polygon" => {
                let rings: Vec<Vec<[f64; 2]>> =
                    serde_json::from_value(self.coordinates.clone()).ok()?;
                rings.into_iter().next()
            }
            "MultiPolygon" => {
                let parts: Vec<Vec<Vec<[f64; 2]>>> =
                    serde_json::from_value(self.coordinates.clone()).ok()?;
                parts.into_iter().next()?.into_iter().next()
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

fn feature_type() -> String {
    "Feature".into()
}

fn collection_type() -> String {
    "FeatureCollection".into()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "collection_type")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: collection_type(),
            features,
        }
    }
}

/// Lifecycle state reported by an analysis job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[default]
    Idle,
    Started,
    Running,
    Completed,
    Error,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Error | JobState::Cancelled)
    }
}

/// Response of the `get_*_analysis_status` calls.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisStatus {
    pub status: JobState,
    pub current_phase: u32,
    pub total_phases: u32,
    pub phase_name: String,
    pub message: String,
    pub progress_percent: u32,
    pub error_message: Option<String>,
}

/// Response of the `run_*` and `cancel_*` calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl RunResponse {
    pub fn started(message: impl Into<String>) -> Self {
        Self {
            status: "started".into(),
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            message: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == "error"
    }
}

/// Body of `run_historical_analysis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRunRequest {
    pub country: String,
    pub year: i32,
    #[serde(default)]
    pub overwrite: bool,
}

/// Body of `run_nowcast_analysis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowcastRunRequest {
    pub country: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub local_zip_path: Option<String>,
    #[serde(default)]
    pub days: Option<u32>,
}

/// Body of `upload_cyclone_track`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub file_data: String,
    pub filename: String,
}

/// Response of `upload_cyclone_track` and `save_track`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResponse {
    pub path: Option<String>,
}

/// Body of `create_typhoon_from_files`: a regression CSV with one row per
/// day and a point shapefile with the track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTyphoonRequest {
    pub name: String,
    pub csv_path: String,
    pub shapefile_path: String,
}

/// Response of `create_typhoon_from_files`; no uuid when the files could not
/// be turned into a storm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTyphoonResponse {
    pub uuid: Option<String>,
}

/// Response of `delete_typhoon`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteTyphoonResponse {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn number_or_text_accepts_both_encodings() {
        let values: Vec<NumberOrText> =
            serde_json::from_value(json!([12.5, "12.5 knots", "+15.2%", "n/a"])).unwrap();
        assert_eq!(values[0].value(), Some(12.5));
        assert_eq!(values[1].value(), Some(12.5));
        assert_eq!(values[2].value(), Some(15.2));
        assert_eq!(values[3].value_or_zero(), 0.0);
    }

    #[test]
    fn typhoon_entries_distinguish_map_and_list() {
        let keyed: DashboardResponse =
            serde_json::from_value(json!({"typhoons": {"KONG-REY": {"name": "KONG-REY"}}}))
                .unwrap();
        assert!(matches!(keyed.typhoons, TyphoonEntries::Keyed(_)));

        let listed: DashboardResponse = serde_json::from_value(json!({
            "typhoons": [{"uuid": "u1", "name": "CO-MAY", "type": "TY"}],
            "fishing_grounds": []
        }))
        .unwrap();
        assert!(matches!(listed.typhoons, TyphoonEntries::Listed(ref list) if list.len() == 1));
    }

    #[test]
    fn geometry_extracts_exterior_ring() {
        let geometry: Geometry = serde_json::from_value(json!({
            "type": "Polygon",
            "coordinates": [[[120.0, 14.0], [121.0, 14.0], [121.0, 15.0], [120.0, 14.0]],
                            [[120.2, 14.2], [120.3, 14.2], [120.2, 14.3]]]
        }))
        .unwrap();
        assert_eq!(geometry.exterior_ring().unwrap().len(), 4);
        assert!(geometry.as_point().is_none());
    }

    #[test]
    fn analysis_status_tolerates_partial_payloads() {
        let status: AnalysisStatus =
            serde_json::from_value(json!({"status": "running", "progress_percent": 40})).unwrap();
        assert_eq!(status.status, JobState::Running);
        assert!(!status.status.is_terminal());
        assert_eq!(status.total_phases, 0);
    }
}
