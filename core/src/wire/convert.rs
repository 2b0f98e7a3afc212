use crate::model::storm::{difference_percent, observed_from_difference, round_one};
use crate::model::{
    BoatDetectionPoint, DashboardBundle, FishingGround, GroundGeometry, PeriodMetrics,
    StormRecord, TrackPoint,
};
use crate::wire::{
    DailyMetricsWire, DashboardResponse, FeatureCollection, FishingGroundWire, GroundStat,
    HistoricalEntry, NumberOrText, TrackPointWire, TyphoonDetail, TyphoonEntries,
};
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, warn};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parses a naive wall-clock timestamp as written by the bridge.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(trimmed).map(|ts| ts.date()))
}

fn values(series: &[NumberOrText]) -> Vec<f64> {
    series.iter().map(NumberOrText::value_or_zero).collect()
}

pub fn track_from_wire(points: &[TrackPointWire]) -> Vec<TrackPoint> {
    points
        .iter()
        .filter_map(|point| match parse_timestamp(&point.datetime) {
            Some(timestamp) => Some(TrackPoint {
                lat: point.lat,
                lon: point.lng,
                timestamp,
                wind_speed: point.wind_speed.value_or_zero(),
                translation_speed: point.cyclone_speed.value_or_zero(),
            }),
            None => {
                warn!("skipping track point with unreadable time {:?}", point.datetime);
                None
            }
        })
        .collect()
}

/// `ground3` → 3; keys without a numeric suffix sort last in their original order.
fn ground_key_index(key: &str) -> Option<usize> {
    let digits: String = key
        .chars()
        .rev()
        .take_while(|ch| ch.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}

fn historical_metrics(entry: &HistoricalEntry) -> PeriodMetrics {
    let mut grounds: Vec<((usize, usize), GroundStat)> = Vec::new();
    for (position, (key, value)) in entry.boat_data.iter().enumerate() {
        match serde_json::from_value::<GroundStat>(value.clone()) {
            Ok(stat) => {
                let order = (ground_key_index(key).unwrap_or(usize::MAX), position);
                grounds.push((order, stat));
            }
            Err(err) => warn!("ignoring ground {}: {}", key, err),
        }
    }
    grounds.sort_by_key(|(order, _)| *order);

    let baseline: Vec<f64> = grounds.iter().map(|(_, g)| g.baseline.value_or_zero()).collect();
    let differences: Vec<f64> = grounds.iter().map(|(_, g)| g.difference.value_or_zero()).collect();
    let distances: Vec<f64> = grounds.iter().map(|(_, g)| g.distance.value_or_zero()).collect();
    let observed: Vec<f64> = baseline
        .iter()
        .zip(&differences)
        .map(|(base, diff)| observed_from_difference(*base, *diff))
        .collect();

    let mut metrics = PeriodMetrics {
        avg_speed: entry.avg_speed.value_or_zero(),
        max_speed: entry.max_speed.value_or_zero(),
        max_wind: entry.max_wind.value_or_zero(),
        baseline,
        observed,
        distances,
        differences,
        average_boats: 0.0,
    };
    metrics.average_boats = entry
        .average_boats
        .as_ref()
        .and_then(NumberOrText::value)
        .unwrap_or_else(|| round_one(metrics.mean_observed()));
    metrics
}

/// Converts one keyed historical entry. The map key is the storm identifier.
pub fn storm_from_historical(key: &str, value: &Value) -> Option<StormRecord> {
    let entry: HistoricalEntry = match serde_json::from_value(value.clone()) {
        Ok(entry) => entry,
        Err(err) => {
            warn!("skipping storm {}: {}", key, err);
            return None;
        }
    };

    let mut storm = StormRecord::new(key, entry.name.clone().unwrap_or_else(|| key.to_string()));
    storm.category = entry.category.clone().unwrap_or_default();
    storm.summary = historical_metrics(&entry);
    storm.track = track_from_wire(&entry.track_points);
    storm.date_range = entry.dates.clone();
    storm.year = entry.year;
    Some(storm)
}

pub fn daily_metrics(wire: &DailyMetricsWire) -> PeriodMetrics {
    let baseline = values(&wire.boat_counts.baseline);
    let observed = values(&wire.boat_counts.predicted);
    let differences = wire
        .activity_difference
        .iter()
        .enumerate()
        .map(|(idx, diff)| match diff.value() {
            Some(value) => value,
            None => {
                // difference_percent yields 0 for an empty baseline ("+∞%")
                let recomputed = difference_percent(
                    baseline.get(idx).copied().unwrap_or(0.0),
                    observed.get(idx).copied().unwrap_or(0.0),
                );
                debug!("difference {:?} is not numeric, using {:.1}", diff, recomputed);
                recomputed
            }
        })
        .collect();

    let mut metrics = PeriodMetrics {
        avg_speed: wire.avg_storm_speed.value_or_zero(),
        max_speed: wire.max_storm_speed.value_or_zero(),
        max_wind: wire.max_wind_speed.value_or_zero(),
        baseline,
        observed,
        distances: values(&wire.distances),
        differences,
        average_boats: 0.0,
    };
    metrics.average_boats = round_one(metrics.mean_observed());
    metrics
}

fn daily_from_map(daily: &Map<String, Value>) -> BTreeMap<NaiveDate, PeriodMetrics> {
    let mut out = BTreeMap::new();
    for (key, value) in daily {
        let Some(date) = parse_date(key) else {
            warn!("skipping daily entry with unreadable date {:?}", key);
            continue;
        };
        match serde_json::from_value::<DailyMetricsWire>(value.clone()) {
            Ok(wire) => {
                out.insert(date, daily_metrics(&wire));
            }
            Err(err) => warn!("skipping daily entry {}: {}", key, err),
        }
    }
    out
}

/// Converts a full storm detail (nowcast shape, or a historical record that
/// carries its `dashboard_data`).
pub fn storm_from_detail(detail: &TyphoonDetail) -> StormRecord {
    let mut storm = match &detail.dashboard_data {
        Some(dashboard) if detail.daily_data.is_empty() => {
            storm_from_historical(&detail.uuid, dashboard)
                .unwrap_or_else(|| StormRecord::new(detail.uuid.clone(), detail.name.clone()))
        }
        _ => StormRecord::new(detail.uuid.clone(), detail.name.clone()),
    };
    storm.id = detail.uuid.clone();
    storm.name = detail.name.clone();
    if !detail.kind.is_empty() {
        storm.category = detail.kind.clone();
    }
    if !detail.track_points.is_empty() {
        storm.track = track_from_wire(&detail.track_points);
    }

    let daily = daily_from_map(&detail.daily_data);
    if !daily.is_empty() {
        storm.summary = PeriodMetrics::aggregate(daily.values());
        let first = daily.keys().next().copied();
        let last = daily.keys().next_back().copied();
        storm.date_range = match (first, last) {
            (Some(first), Some(last)) if first == last => Some(first.format("%Y-%m-%d").to_string()),
            (Some(first), Some(last)) => Some(format!(
                "{} to {}",
                first.format("%Y-%m-%d"),
                last.format("%Y-%m-%d")
            )),
            _ => None,
        };
        storm.year = first.map(|date| chrono::Datelike::year(&date));
        storm.daily = daily;
    }
    storm.sort_track();
    storm
}

fn contour_label(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Fishing grounds from a FeatureCollection of Polygon features tagged with `contour_id`.
pub fn grounds_from_geojson(collection: &FeatureCollection) -> Vec<FishingGround> {
    collection
        .features
        .iter()
        .filter_map(|feature| {
            let geometry = feature.geometry.as_ref()?;
            let ring = geometry.exterior_ring()?;
            let label = feature
                .properties
                .get("contour_id")
                .map(contour_label)
                .unwrap_or_else(|| "?".into());
            Some(FishingGround {
                index: 0,
                name: format!("Ground {}", label),
                geometry: GroundGeometry::Polygon { ring },
                description: Some(format!("Fishing ground {}", label)),
            })
        })
        .collect()
}

pub fn ground_from_wire(wire: &FishingGroundWire) -> FishingGround {
    let polygon = wire
        .geometry
        .as_ref()
        .and_then(|geometry| geometry.exterior_ring())
        .map(|ring| GroundGeometry::Polygon { ring });
    let geometry = match (polygon, wire.lat, wire.lng) {
        (Some(polygon), _, _) => polygon,
        (None, Some(lat), Some(lon)) => GroundGeometry::Point { lat, lon },
        _ => GroundGeometry::None,
    };
    FishingGround {
        index: 0,
        name: wire.name.clone(),
        geometry,
        description: wire.description.clone(),
    }
}

/// Ground list of a dashboard payload; polygon GeoJSON wins over the plain list.
pub fn grounds_from_response(response: &DashboardResponse) -> Vec<FishingGround> {
    if let Some(collection) = &response.fishing_grounds_geojson {
        let grounds = grounds_from_geojson(collection);
        if !grounds.is_empty() {
            return grounds;
        }
    }
    response.fishing_grounds.iter().map(ground_from_wire).collect()
}

/// Bundle from a historical payload. Listed (summary-only) entries have no
/// metrics and are only usable after their details are fetched.
pub fn bundle_from_historical(response: &DashboardResponse) -> DashboardBundle {
    let storms = match &response.typhoons {
        TyphoonEntries::Keyed(map) => map
            .iter()
            .filter_map(|(key, value)| storm_from_historical(key, value))
            .collect(),
        TyphoonEntries::Listed(list) => list
            .iter()
            .map(|summary| {
                let mut storm = StormRecord::new(summary.uuid.clone(), summary.name.clone());
                storm.category = summary.kind.clone();
                storm.date_range = summary.date_range.clone();
                storm
            })
            .collect(),
    };
    DashboardBundle::new(storms, grounds_from_response(response), response.latest_year)
}

/// Boat detections from a point FeatureCollection, truncated to `max_count`.
pub fn detections_from_geojson(
    collection: &FeatureCollection,
    max_count: usize,
) -> Vec<BoatDetectionPoint> {
    collection
        .features
        .iter()
        .filter_map(|feature| {
            let [lon, lat] = feature.geometry.as_ref()?.as_point()?;
            let date = feature
                .properties
                .get("date")
                .and_then(Value::as_str)
                .and_then(parse_date);
            Some(BoatDetectionPoint::new(lat, lon, date))
        })
        .take(max_count)
        .collect()
}
