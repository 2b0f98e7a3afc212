use super::{detail_from_record, sorted_keys, text_field, TinyDb, TyphoonRepository};
use cyclonecore::wire::{
    DashboardResponse, FeatureCollection, FishingGroundWire, TyphoonDetail, TyphoonEntries,
};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Ground centroids used when no per-year polygons were produced.
const FIXED_GROUNDS: [(f64, f64); 5] = [
    (14.5, 120.5),
    (13.5, 121.5),
    (12.5, 122.5),
    (11.5, 123.5),
    (10.5, 124.5),
];

pub fn fixed_grounds() -> Vec<FishingGroundWire> {
    FIXED_GROUNDS
        .iter()
        .enumerate()
        .map(|(index, (lat, lng))| FishingGroundWire {
            id: None,
            name: format!("Ground {}", index),
            lat: Some(*lat),
            lng: Some(*lng),
            description: None,
            geometry: None,
        })
        .collect()
}

pub fn grounds_file(dir: &Path, year: i32) -> PathBuf {
    dir.join(format!("fishing_grounds_{}.geojson", year))
}

pub struct HistoricalRepository {
    db: TinyDb,
    grounds_dir: Option<PathBuf>,
}

impl HistoricalRepository {
    pub fn new(db: TinyDb) -> Self {
        Self {
            db,
            grounds_dir: None,
        }
    }

    pub fn with_grounds_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.grounds_dir = Some(dir.into());
        self
    }

    fn record_year(record: &Value) -> Option<i32> {
        record
            .get("dashboard_data")?
            .get("year")?
            .as_i64()
            .and_then(|year| i32::try_from(year).ok())
    }

    /// The dashboard entry of a record, with its name and track filled in
    /// from the record when the entry lacks them.
    fn entry(record: &Value) -> Value {
        let mut entry = record
            .get("dashboard_data")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_else(Map::new);
        if !entry.contains_key("name") {
            if let Some(name) = record.get("name") {
                entry.insert("name".into(), name.clone());
            }
        }
        if !entry.contains_key("track_points") {
            if let Some(points) = record.get("track_points") {
                entry.insert("track_points".into(), points.clone());
            }
        }
        Value::Object(entry)
    }

    fn year_grounds(&self, year: i32) -> Option<FeatureCollection> {
        let path = grounds_file(self.grounds_dir.as_deref()?, year);
        let contents = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(collection) => {
                log::info!("loaded fishing grounds for {} from {}", year, path.display());
                Some(collection)
            }
            Err(err) => {
                log::error!("fishing grounds {} unreadable: {}", path.display(), err);
                None
            }
        }
    }
}

/// `"KONG-REY"` -> `"kongrey"`
pub fn normalized_key(name: &str) -> String {
    name.to_lowercase().replace('-', "")
}

impl TyphoonRepository for HistoricalRepository {
    fn dashboard(&self) -> DashboardResponse {
        let mut typhoons = Map::new();
        for record in self.db.records() {
            if let Some(name) = text_field(record, "name") {
                typhoons.insert(name, Self::entry(record));
            }
        }
        DashboardResponse {
            typhoons: TyphoonEntries::Keyed(typhoons),
            fishing_grounds: fixed_grounds(),
            latest_year: self.available_years().last().copied(),
            ..DashboardResponse::default()
        }
    }

    fn dashboard_by_year(&self, year: i32) -> DashboardResponse {
        let typhoons: Map<String, Value> = self
            .db
            .records()
            .iter()
            .filter(|record| Self::record_year(record) == Some(year))
            .filter_map(|record| {
                let name = text_field(record, "name")?;
                Some((normalized_key(&name), Self::entry(record)))
            })
            .collect();
        log::info!("{} typhoons for year {}", typhoons.len(), year);
        DashboardResponse {
            typhoons: TyphoonEntries::Keyed(typhoons),
            fishing_grounds: fixed_grounds(),
            fishing_grounds_geojson: self.year_grounds(year),
            latest_year: Some(year),
            ..DashboardResponse::default()
        }
    }

    fn available_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.db.records().iter().filter_map(Self::record_year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    fn typhoon(&self, id: &str) -> Option<TyphoonDetail> {
        self.db
            .find_by("uuid", id)
            .or_else(|| self.db.find_by("name", id))
            .and_then(detail_from_record)
    }

    fn typhoon_dates(&self, id: &str) -> Vec<String> {
        self.db
            .find_by("uuid", id)
            .or_else(|| self.db.find_by("name", id))
            .map(|record| sorted_keys(record, "daily_data"))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn repository() -> HistoricalRepository {
        let db = TinyDb::parse(
            r#"{"typhoons": {
                "1": {"name": "KONG-REY", "dashboard_data": {"year": 2024, "avgSpeed": "12.4"},
                      "track_points": [{"lat": 18.0, "lng": 126.0, "datetime": "2024-10-28 12:00"}]},
                "2": {"name": "TRAMI", "dashboard_data": {"name": "TRAMI", "year": 2024}},
                "3": {"name": "SAOLA", "dashboard_data": {"year": 2023}},
                "4": {"name": "NO-YEAR", "dashboard_data": {}}
            }}"#,
        )
        .unwrap();
        HistoricalRepository::new(db)
    }

    #[test]
    fn dashboard_keys_storms_by_name() {
        let response = repository().dashboard();
        let TyphoonEntries::Keyed(map) = &response.typhoons else {
            panic!("historical dashboards are keyed");
        };
        assert_eq!(map.len(), 4);
        assert_eq!(map["KONG-REY"]["name"], "KONG-REY");
        assert_eq!(map["KONG-REY"]["track_points"][0]["lat"], 18.0);
        assert_eq!(response.fishing_grounds.len(), 5);
        assert_eq!(response.fishing_grounds[4].lat, Some(10.5));
        assert_eq!(response.latest_year, Some(2024));
    }

    #[test]
    fn year_filter_uses_dashboard_year() {
        let repo = repository();
        let response = repo.dashboard_by_year(2024);
        let TyphoonEntries::Keyed(map) = &response.typhoons else {
            panic!("historical dashboards are keyed");
        };
        let keys: Vec<_> = map.keys().cloned().collect();
        assert!(keys.contains(&"kongrey".to_string()));
        assert!(keys.contains(&"trami".to_string()));
        assert_eq!(keys.len(), 2);
        assert!(response.fishing_grounds_geojson.is_none());
        assert_eq!(repo.available_years(), vec![2023, 2024]);
    }

    #[test]
    fn year_grounds_are_read_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = fs::File::create(grounds_file(dir.path(), 2024)).unwrap();
        file.write_all(
            br#"{"type": "FeatureCollection", "features": [{"type": "Feature",
                "geometry": {"type": "Polygon", "coordinates": [[[120, 14], [121, 14], [121, 15], [120, 14]]]},
                "properties": {"contour_id": 2}}]}"#,
        )
        .unwrap();
        let repo = repository().with_grounds_dir(dir.path());
        let collection = repo.dashboard_by_year(2024).fishing_grounds_geojson.unwrap();
        assert_eq!(collection.features.len(), 1);
        assert!(repo.dashboard_by_year(2023).fishing_grounds_geojson.is_none());
    }

    #[test]
    fn details_fall_back_to_name_lookup() {
        let detail = repository().typhoon("TRAMI").unwrap();
        assert_eq!(detail.uuid, "TRAMI");
        assert!(repository().typhoon("unknown").is_none());
        assert!(repository().typhoon_dates("TRAMI").is_empty());
    }
}
