//! Hand-drawn cyclone tracks.
//!
//! Times are naive wall-clock values: no zone is attached or converted, the
//! text is forwarded exactly as the analyst typed it.

use crate::gateway::BridgeApi;
use crate::prelude::{EngineError, EngineResult};
use crate::wire::convert::parse_timestamp;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftPoint {
    /// `[lon, lat]`
    pub coordinates: [f64; 2],
    pub date_time: String,
    pub cyclone_spd: f64,
    pub wind_spd: f64,
}

impl DraftPoint {
    fn timestamp(&self) -> Option<NaiveDateTime> {
        if self.date_time.contains(':') {
            parse_timestamp(&self.date_time)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackDraft {
    pub points: Vec<DraftPoint>,
}

impl TrackDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Appends a fix. Rejects out-of-range coordinates, unreadable times and
    /// times earlier than the previous fix.
    pub fn push(
        &mut self,
        lat: f64,
        lon: f64,
        date_time: &str,
        cyclone_spd: f64,
        wind_spd: f64,
    ) -> EngineResult<()> {
        let point = DraftPoint {
            coordinates: [lon, lat],
            date_time: date_time.trim().to_string(),
            cyclone_spd,
            wind_spd,
        };
        Self::check_point(&point)?;
        if let Some(previous) = self.points.last().and_then(DraftPoint::timestamp) {
            if point.timestamp() < Some(previous) {
                return Err(EngineError::InvalidInput(format!(
                    "{} is earlier than the previous point",
                    point.date_time
                )));
            }
        }
        self.points.push(point);
        Ok(())
    }

    pub fn undo(&mut self) -> Option<DraftPoint> {
        self.points.pop()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    fn check_point(point: &DraftPoint) -> EngineResult<()> {
        let [lon, lat] = point.coordinates;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(EngineError::InvalidInput(format!(
                "coordinates ({}, {}) out of range",
                lat, lon
            )));
        }
        if point.timestamp().is_none() {
            return Err(EngineError::InvalidInput(format!(
                "unreadable time {:?}, expected YYYY-MM-DD HH:MM",
                point.date_time
            )));
        }
        if point.cyclone_spd < 0.0 || point.wind_spd < 0.0 {
            return Err(EngineError::InvalidInput("speeds must not be negative".into()));
        }
        Ok(())
    }

    /// Checks the whole draft, including drafts deserialized from elsewhere.
    pub fn validate(&self) -> EngineResult<()> {
        if self.points.is_empty() {
            return Err(EngineError::InvalidInput("the track has no points".into()));
        }
        let mut previous = None;
        for point in &self.points {
            Self::check_point(point)?;
            let current = point.timestamp();
            if current < previous {
                return Err(EngineError::InvalidInput(
                    "track points are not in chronological order".into(),
                ));
            }
            previous = current;
        }
        Ok(())
    }

    pub fn to_json(&self) -> EngineResult<String> {
        self.validate()?;
        serde_json::to_string(self).map_err(|err| EngineError::Decode(err.to_string()))
    }

    /// Stores the draft through the bridge and returns the saved file path.
    pub async fn save<B: BridgeApi + ?Sized>(&self, bridge: &B) -> EngineResult<String> {
        let json = self.to_json()?;
        bridge
            .save_track(&json)
            .await
            .map_err(|err| EngineError::Transport(err.to_string()))?
            .ok_or_else(|| EngineError::Transport("the bridge did not store the track".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::FakeBridge;
    use serde_json::json;

    fn draft() -> TrackDraft {
        let mut draft = TrackDraft::new();
        draft.push(14.6, 120.9, "2025-07-23T06:00", 12.0, 65.0).unwrap();
        draft.push(15.1, 120.2, "2025-07-23 12:00:00", 14.0, 70.0).unwrap();
        draft
    }

    #[test]
    fn json_uses_lon_lat_order() {
        let value: serde_json::Value = serde_json::from_str(&draft().to_json().unwrap()).unwrap();
        assert_eq!(
            value["points"][0],
            json!({"coordinates": [120.9, 14.6], "date_time": "2025-07-23T06:00", "cyclone_spd": 12.0, "wind_spd": 65.0})
        );
    }

    #[test]
    fn points_must_move_forward_in_time() {
        let mut draft = draft();
        let err = draft.push(15.5, 119.8, "2025-07-22 00:00", 10.0, 60.0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        assert_eq!(draft.len(), 2);
        assert!(draft.push(15.5, 119.8, "tomorrow", 10.0, 60.0).is_err());
        assert!(draft.push(95.0, 119.8, "2025-07-24 00:00", 10.0, 60.0).is_err());
    }

    #[test]
    fn shuffled_drafts_fail_validation() {
        let mut shuffled = draft();
        shuffled.points.reverse();
        assert!(shuffled.validate().is_err());
        assert!(TrackDraft::new().to_json().is_err());
    }

    #[tokio::test]
    async fn save_forwards_json() {
        let bridge = FakeBridge::new();
        let path = draft().save(&bridge).await.unwrap();
        assert_eq!(path, "/tmp/tracks/drawn_track.json");
        assert_eq!(bridge.saved().len(), 1);

        let empty = TrackDraft::new().save(&bridge).await;
        assert!(empty.is_err());
        assert_eq!(bridge.call_count("save_track"), 1);
    }
}
