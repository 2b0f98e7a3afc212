use crate::prelude::{StormId, ViewSynchronizer};
use crate::views::RenderContext;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackMarker {
    pub lat: f64,
    pub lon: f64,
    pub popup: String,
}

/// Track of the selected storm: a `[lat, lon]` polyline plus one marker per fix.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TrackView {
    pub storm: Option<StormId>,
    pub polyline: Vec<[f64; 2]>,
    pub markers: Vec<TrackMarker>,
}

#[derive(Debug, Default)]
pub struct TrackSynchronizer;

impl ViewSynchronizer for TrackSynchronizer {
    type Output = TrackView;

    fn name(&self) -> &'static str {
        "track"
    }

    fn render(&mut self, context: &RenderContext<'_>) -> Self::Output {
        let Some(storm) = context.selected_storm() else {
            return TrackView::default();
        };
        let markers = storm
            .track
            .iter()
            .map(|point| TrackMarker {
                lat: point.lat,
                lon: point.lon,
                popup: format!(
                    "{}\nWind speed: {:.1} kt\nStorm speed: {:.1} kt",
                    point.timestamp.format("%Y-%m-%d %H:%M"),
                    point.wind_speed,
                    point.translation_speed
                ),
            })
            .collect();
        TrackView {
            storm: Some(storm.id.clone()),
            polyline: storm.track.iter().map(|p| [p.lat, p.lon]).collect(),
            markers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derived::DerivedMetrics;
    use crate::views::testing::historical_snapshot;

    #[test]
    fn markers_carry_chronological_popups() {
        let snapshot = historical_snapshot("KONG-REY");
        let derived = DerivedMetrics::default();
        let view = TrackSynchronizer.render(&RenderContext::new(&snapshot, &derived));
        assert_eq!(view.polyline.len(), 3);
        assert_eq!(view.polyline[0], [18.0, 126.0]);
        assert_eq!(
            view.markers[0].popup,
            "2023-10-28 12:00\nWind speed: 80.0 kt\nStorm speed: 10.0 kt"
        );
    }

    #[test]
    fn storm_without_track_renders_empty_polyline() {
        let snapshot = historical_snapshot("TRAMI");
        let derived = DerivedMetrics::default();
        let view = TrackSynchronizer.render(&RenderContext::new(&snapshot, &derived));
        assert_eq!(view.storm.as_deref(), Some("TRAMI"));
        assert!(view.polyline.is_empty());
    }
}
