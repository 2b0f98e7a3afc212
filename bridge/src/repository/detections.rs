use anyhow::{bail, Context};
use cyclonecore::wire::{Feature, FeatureCollection, Geometry};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

const LON_COLUMN: &str = "Lon_DNB";
const LAT_COLUMN: &str = "Lat_DNB";
const DATE_COLUMN: &str = "date_only";

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub lon: f64,
    pub lat: f64,
    pub date: Option<String>,
}

/// Yearly VIIRS boat detection tables, one CSV per year.
#[derive(Debug, Clone)]
pub struct DetectionArchive {
    dir: PathBuf,
    seed: u64,
}

impl DetectionArchive {
    pub fn new(dir: impl Into<PathBuf>, seed: u64) -> Self {
        Self {
            dir: dir.into(),
            seed,
        }
    }

    pub fn path(&self, year: i32) -> PathBuf {
        self.dir.join(format!("boat_detections_{}.csv", year))
    }

    /// Detections of `year` down-sampled to `max_count`, or `None` when the
    /// year has no table.
    pub fn load(&self, year: i32, max_count: usize) -> anyhow::Result<Option<FeatureCollection>> {
        let path = self.path(year);
        if !path.exists() {
            log::warn!("boat detections not found: {}", path.display());
            return Ok(None);
        }
        let rows = read_detections(&path)?;
        let total = rows.len();
        let rows = sample(rows, max_count, self.seed);
        log::info!("serving {} of {} boat detections for {}", rows.len(), total, year);
        Ok(Some(to_collection(&rows)))
    }
}

#[derive(Debug, Deserialize)]
struct DetectionRow {
    #[serde(rename = "Lon_DNB")]
    lon: f64,
    #[serde(rename = "Lat_DNB")]
    lat: f64,
    #[serde(rename = "date_only", default)]
    date: Option<String>,
}

pub fn read_detections(path: &Path) -> anyhow::Result<Vec<Detection>> {
    let file = fs::File::open(path)
        .with_context(|| format!("reading boat detections {}", path.display()))?;
    parse_detections(file).with_context(|| format!("parsing {}", path.display()))
}

/// Reads the lon/lat/date columns by header name; rows with unreadable
/// coordinates are skipped.
pub fn parse_detections<R: Read>(source: R) -> anyhow::Result<Vec<Detection>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(source);
    let headers = reader.headers().context("reading header row")?;
    if headers.is_empty() {
        return Ok(Vec::new());
    }
    if !headers.iter().any(|column| column == LON_COLUMN)
        || !headers.iter().any(|column| column == LAT_COLUMN)
    {
        bail!("missing {} or {} column", LON_COLUMN, LAT_COLUMN);
    }

    let mut skipped = 0usize;
    let mut detections = Vec::new();
    for row in reader.deserialize::<DetectionRow>() {
        match row {
            Ok(row) if row.lon.is_finite() && row.lat.is_finite() => detections.push(Detection {
                lon: row.lon,
                lat: row.lat,
                date: row.date.filter(|date| !date.is_empty()),
            }),
            Ok(_) | Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        log::debug!("skipped {} malformed detection rows", skipped);
    }
    Ok(detections)
}

/// Seeded sample without replacement, keeping file order.
pub fn sample(rows: Vec<Detection>, max_count: usize, seed: u64) -> Vec<Detection> {
    if rows.len() <= max_count {
        return rows;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = index::sample(&mut rng, rows.len(), max_count).into_vec();
    picked.sort_unstable();
    let mut keep = vec![false; rows.len()];
    for at in picked {
        keep[at] = true;
    }
    rows.into_iter()
        .zip(keep)
        .filter_map(|(row, kept)| kept.then_some(row))
        .collect()
}

pub fn to_collection(rows: &[Detection]) -> FeatureCollection {
    let features = rows
        .iter()
        .map(|row| {
            let mut properties = Map::new();
            properties.insert(
                "date".into(),
                row.date.clone().map(Value::String).unwrap_or(Value::Null),
            );
            Feature {
                kind: "Feature".into(),
                geometry: Some(Geometry::point(row.lon, row.lat)),
                properties,
            }
        })
        .collect();
    FeatureCollection::new(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn table(rows: usize) -> String {
        let mut text = String::from("id,Lat_DNB,Lon_DNB,date_only\n");
        for i in 0..rows {
            text.push_str(&format!("{},{},{},2023-10-{:02}\n", i, 10.0 + i as f64, 120.0, 1 + i % 28));
        }
        text
    }

    #[test]
    fn columns_are_found_by_name() {
        let rows = parse_detections(
            "Lon_DNB,Lat_DNB,date_only\n121.5,14.2,\nbad,14.0,2023-01-01\n".as_bytes(),
        )
        .unwrap();
        assert_eq!(rows, vec![Detection { lon: 121.5, lat: 14.2, date: None }]);
        assert!(parse_detections("lat,lon\n1,2\n".as_bytes()).is_err());
        assert!(parse_detections("".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn quoted_headers_and_fields_are_read() {
        let text = "\"port\",\"Lat_DNB\",\"Lon_DNB\",\"date_only\"\n\
                    \"port, north\",14.2,121.5,2023-10-01\n\
                    south,13.0,122.0,\"2023-10-02\"\n";
        let rows = parse_detections(text.as_bytes()).unwrap();
        assert_eq!(
            rows,
            vec![
                Detection { lon: 121.5, lat: 14.2, date: Some("2023-10-01".into()) },
                Detection { lon: 122.0, lat: 13.0, date: Some("2023-10-02".into()) },
            ]
        );
    }

    #[test]
    fn sampling_is_seeded_and_ordered() {
        let rows = parse_detections(table(50).as_bytes()).unwrap();
        let first = sample(rows.clone(), 10, 42);
        let second = sample(rows.clone(), 10, 42);
        assert_eq!(first.len(), 10);
        assert_eq!(first, second);
        assert!(first.windows(2).all(|pair| pair[0].lat < pair[1].lat));
        assert_eq!(sample(rows, 100, 42).len(), 50);
    }

    #[test]
    fn archive_serves_point_features() {
        let dir = tempfile::tempdir().unwrap();
        let archive = DetectionArchive::new(dir.path(), 42);
        assert!(archive.load(2023, 5).unwrap().is_none());

        let mut file = fs::File::create(archive.path(2023)).unwrap();
        file.write_all(table(8).as_bytes()).unwrap();
        let collection = archive.load(2023, 5).unwrap().unwrap();
        assert_eq!(collection.features.len(), 5);
        let geometry = collection.features[0].geometry.as_ref().unwrap();
        assert_eq!(geometry.as_point().map(|[lon, _]| lon), Some(120.0));
    }
}
