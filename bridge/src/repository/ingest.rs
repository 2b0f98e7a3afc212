//! Nowcast storm records built from the regression pipeline's daily table
//! and the storm's point shapefile.

use anyhow::{bail, Context};
use serde::Deserialize;
use serde_json::{json, Value};
use shapefile::dbase::{FieldValue, Record};
use shapefile::Point;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Grounds the regression table has columns for.
const GROUNDS: usize = 4;

#[derive(Debug, Deserialize)]
struct DailyRow {
    date_only: String,
    stm_spd_mean: f64,
    stm_spd_max: f64,
    #[serde(rename = "USA_WIND")]
    usa_wind: f64,
    distance_0: f64,
    distance_1: f64,
    distance_2: f64,
    distance_3: f64,
    base_0: f64,
    base_1: f64,
    base_2: f64,
    base_3: f64,
    predict_g0: f64,
    predict_g1: f64,
    predict_g2: f64,
    predict_g3: f64,
}

/// `"+12.50%"`, `"-40.00%"`; a zero baseline gives `"+0%"` or `"+∞%"`.
pub fn activity_difference(baseline: f64, predicted: f64) -> String {
    if baseline == 0.0 {
        return if predicted == 0.0 { "+0%" } else { "+∞%" }.to_string();
    }
    let percent = (predicted - baseline) / baseline * 100.0;
    let sign = if percent >= 0.0 { "+" } else { "" };
    format!("{}{:.2}%", sign, percent)
}

impl DailyRow {
    fn into_record(self) -> Value {
        let baseline: [f64; GROUNDS] = [self.base_0, self.base_1, self.base_2, self.base_3];
        let predicted: [f64; GROUNDS] = [
            self.predict_g0,
            self.predict_g1,
            self.predict_g2,
            self.predict_g3,
        ];
        let differences: Vec<String> = baseline
            .iter()
            .zip(&predicted)
            .map(|(base, predicted)| activity_difference(*base, *predicted))
            .collect();
        json!({
            "date": self.date_only,
            "avgStormSpeed": format!("{:.1} knots", self.stm_spd_mean),
            "maxStormSpeed": format!("{} knots", self.stm_spd_max),
            "maxWindSpeed": format!("{} knots", self.usa_wind),
            "distances": [self.distance_0, self.distance_1, self.distance_2, self.distance_3],
            "boatCounts": {"baseline": baseline, "predicted": predicted},
            "activityDifference": differences,
        })
    }
}

/// One daily record per table row, in file order. Any unreadable row fails
/// the whole table.
pub fn parse_daily<R: Read>(source: R) -> anyhow::Result<Vec<Value>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(source);
    let mut daily = Vec::new();
    for (line, row) in reader.deserialize::<DailyRow>().enumerate() {
        let row = row.with_context(|| format!("daily row {}", line + 1))?;
        daily.push(row.into_record());
    }
    Ok(daily)
}

pub fn read_daily(path: &Path) -> anyhow::Result<Vec<Value>> {
    let file = fs::File::open(path)
        .with_context(|| format!("reading daily table {}", path.display()))?;
    parse_daily(file).with_context(|| format!("parsing {}", path.display()))
}

/// One track position with the attributes the dashboard shows.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackFix {
    pub lat: f64,
    pub lng: f64,
    pub datetime: String,
    pub wind_speed: i64,
    pub cyclone_speed: i64,
}

impl TrackFix {
    /// Builds a fix from a point and its attribute lookup. `None` when a
    /// time part or speed is missing or the time is out of range.
    pub fn from_fields<F>(x: f64, y: f64, field: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<f64>,
    {
        let part = |name: &str| field(name).filter(|value| value.is_finite()).map(|value| value as i64);
        let (year, month, day) = (part("year")?, part("month")?, part("day")?);
        let (hour, minute) = (part("hour")?, part("minute")?);
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) || !(0..24).contains(&hour) || !(0..60).contains(&minute) {
            return None;
        }
        Some(Self {
            lat: y,
            lng: x,
            datetime: format!("{:04}-{:02}-{:02} {:02}:{:02}", year, month, day, hour, minute),
            wind_speed: part("USA_WIND")?,
            cyclone_speed: part("STORM_SPD")?,
        })
    }

    fn to_json(&self) -> Value {
        json!({
            "lat": self.lat,
            "lng": self.lng,
            "datetime": self.datetime,
            "windSpeed": self.wind_speed,
            "cycloneSpeed": self.cyclone_speed,
        })
    }
}

fn number(record: &Record, name: &str) -> Option<f64> {
    match record.get(name)? {
        FieldValue::Numeric(value) => *value,
        FieldValue::Float(value) => value.map(f64::from),
        FieldValue::Double(value) => Some(*value),
        FieldValue::Integer(value) => Some(f64::from(*value)),
        FieldValue::Character(text) => text.as_deref().and_then(|text| text.trim().parse().ok()),
        _ => None,
    }
}

/// Track fixes of a point shapefile, oldest first. Points with unusable
/// attributes are skipped.
pub fn read_track(path: &Path) -> anyhow::Result<Vec<TrackFix>> {
    let shapes = shapefile::read_as::<_, Point, Record>(path)
        .with_context(|| format!("reading track shapefile {}", path.display()))?;
    let total = shapes.len();
    let mut fixes: Vec<TrackFix> = shapes
        .into_iter()
        .filter_map(|(point, record)| TrackFix::from_fields(point.x, point.y, |name| number(&record, name)))
        .collect();
    if fixes.len() < total {
        log::debug!("skipped {} track points without time or speed", total - fixes.len());
    }
    fixes.sort_by(|a, b| a.datetime.cmp(&b.datetime));
    Ok(fixes)
}

/// The stored form of a nowcast storm: daily records keyed by date, type
/// `TY`.
pub fn storm_record(uuid: &str, name: &str, daily: Vec<Value>, track: &[TrackFix]) -> anyhow::Result<Value> {
    if daily.is_empty() || track.is_empty() {
        bail!("{} needs at least one daily row and one track point", name);
    }
    let daily_data: serde_json::Map<String, Value> = daily
        .into_iter()
        .filter_map(|day| {
            let date = day.get("date").and_then(Value::as_str)?.to_string();
            Some((date, day))
        })
        .collect();
    Ok(json!({
        "uuid": uuid,
        "name": name,
        "type": "TY",
        "track_points": track.iter().map(TrackFix::to_json).collect::<Vec<_>>(),
        "daily_data": daily_data,
    }))
}

/// Reads both files and assembles a record under a fresh uuid.
pub fn storm_from_files(name: &str, csv_path: &Path, shapefile_path: &Path) -> anyhow::Result<(String, Value)> {
    let daily = read_daily(csv_path)?;
    let track = read_track(shapefile_path)?;
    let uuid = uuid::Uuid::new_v4().to_string();
    let record = storm_record(&uuid, name, daily, &track)?;
    Ok((uuid, record))
}
