//! HTTP paths of the bridge calls, shared by the bridge host and its clients.

pub const DASHBOARD_DATA: &str = "dashboard_data";
pub const AVAILABLE_YEARS: &str = "available_years";
pub const TYPHOON: &str = "typhoon";
pub const TYPHOON_DATES: &str = "dates";
pub const BOAT_DETECTIONS: &str = "boat_detections";
pub const HISTORICAL: &str = "historical";
pub const NOWCAST: &str = "nowcast";
pub const RUN: &str = "run";
pub const STATUS: &str = "status";
pub const CANCEL: &str = "cancel";
pub const UPLOAD_TRACK: &str = "upload_cyclone_track";
pub const SAVE_TRACK: &str = "save_track";
pub const CREATE_TYPHOON: &str = "create_typhoon";

/// Query parameter carrying the boat detection cap.
pub const MAX_COUNT_PARAM: &str = "max";

pub fn dashboard_data(base: &str, year: Option<i32>) -> String {
    match year {
        Some(year) => format!("{}/{}/{}", base, DASHBOARD_DATA, year),
        None => format!("{}/{}", base, DASHBOARD_DATA),
    }
}

pub fn available_years(base: &str) -> String {
    format!("{}/{}", base, AVAILABLE_YEARS)
}

pub fn typhoon(base: &str, id: &str) -> String {
    format!("{}/{}/{}", base, TYPHOON, id)
}

pub fn typhoon_dates(base: &str, id: &str) -> String {
    format!("{}/{}/{}/{}", base, TYPHOON, id, TYPHOON_DATES)
}

pub fn boat_detections(base: &str, year: i32, max_count: usize) -> String {
    format!(
        "{}/{}/{}?{}={}",
        base, BOAT_DETECTIONS, year, MAX_COUNT_PARAM, max_count
    )
}

pub fn analysis(base: &str, kind: &str, action: &str) -> String {
    format!("{}/{}/{}", base, kind, action)
}

pub fn upload_track(base: &str) -> String {
    format!("{}/{}", base, UPLOAD_TRACK)
}

pub fn save_track(base: &str) -> String {
    format!("{}/{}", base, SAVE_TRACK)
}

/// Nowcast storms are created by POST here and deleted by DELETE on
/// [`typhoon`].
pub fn create_typhoon(base: &str) -> String {
    format!("{}/{}/{}", base, NOWCAST, CREATE_TYPHOON)
}
