use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Single satellite-derived vessel sighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoatDetectionPoint {
    pub lat: f64,
    pub lon: f64,
    pub date: Option<NaiveDate>,
}

impl BoatDetectionPoint {
    pub fn new(lat: f64, lon: f64, date: Option<NaiveDate>) -> Self {
        Self { lat, lon, date }
    }
}
