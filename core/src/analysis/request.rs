use crate::prelude::{EngineError, EngineResult};
use crate::wire::{HistoricalRunRequest, NowcastRunRequest};
use serde::{Deserialize, Serialize};

/// Supported countries as (display name, ISO code).
pub const COUNTRIES: [(&str, &str); 7] = [
    ("Philippines", "phl"),
    ("Vietnam", "vnm"),
    ("Thailand", "tha"),
    ("Fiji", "fji"),
    ("Vanuatu", "vut"),
    ("Bangladesh", "bgd"),
    ("Indonesia", "idn"),
];

/// Look-back window of the live track feed when none is given.
pub const DEFAULT_NOWCAST_DAYS: u32 = 7;
pub const MAX_NOWCAST_DAYS: u32 = 90;

/// Resolves a display name or code, case-insensitively.
pub fn country_code(country: &str) -> EngineResult<&'static str> {
    let wanted = country.trim();
    COUNTRIES
        .iter()
        .find(|(name, code)| name.eq_ignore_ascii_case(wanted) || code.eq_ignore_ascii_case(wanted))
        .map(|(_, code)| *code)
        .ok_or_else(|| EngineError::InvalidInput(format!("unsupported country {:?}", country)))
}

/// Where a nowcast run gets its cyclone tracks from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSource {
    /// Recent tracks from the public feed, limited to a day window.
    Live,
    /// A zipped track archive uploaded by the user.
    Upload,
    /// A track drawn on the map and saved through the bridge.
    Drawn,
}

pub fn historical_request(
    country: &str,
    year: i32,
    overwrite: bool,
) -> EngineResult<HistoricalRunRequest> {
    if !(1900..=9999).contains(&year) {
        return Err(EngineError::InvalidInput(format!("invalid year {}", year)));
    }
    Ok(HistoricalRunRequest {
        country: country_code(country)?.to_string(),
        year,
        overwrite,
    })
}

/// Builds a nowcast run request. The day window only applies to the live
/// feed; uploaded and drawn tracks need the path returned by the bridge.
pub fn nowcast_request(
    country: &str,
    source: TrackSource,
    track_path: Option<&str>,
    days: Option<u32>,
) -> EngineResult<NowcastRunRequest> {
    let country = country_code(country)?.to_string();
    match source {
        TrackSource::Live => {
            let days = days.unwrap_or(DEFAULT_NOWCAST_DAYS);
            if !(1..=MAX_NOWCAST_DAYS).contains(&days) {
                return Err(EngineError::InvalidInput(format!(
                    "days must be between 1 and {}, got {}",
                    MAX_NOWCAST_DAYS, days
                )));
            }
            Ok(NowcastRunRequest {
                country,
                year: None,
                local_zip_path: None,
                days: Some(days),
            })
        }
        TrackSource::Upload | TrackSource::Drawn => {
            let path = track_path
                .map(str::trim)
                .filter(|path| !path.is_empty())
                .ok_or_else(|| {
                    EngineError::InvalidInput("a track file must be uploaded first".into())
                })?;
            Ok(NowcastRunRequest {
                country,
                year: None,
                local_zip_path: Some(path.to_string()),
                days: None,
            })
        }
    }
}
