use super::{detail_from_record, sorted_keys, text_field, TinyDb, TyphoonRepository};
use anyhow::Context;
use cyclonecore::wire::{
    DashboardResponse, FeatureCollection, FishingGroundWire, TyphoonDetail, TyphoonEntries,
    TyphoonSummary,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

/// Nowcast storms, editable at runtime. Edits are written back to `path`
/// when one is set.
pub struct NowcastRepository {
    db: RwLock<TinyDb>,
    path: Option<PathBuf>,
    grounds: Vec<FishingGroundWire>,
}

/// `"No data"`, a single date, or `"first to last"`.
pub fn date_range(dates: &[String]) -> String {
    match dates {
        [] => "No data".to_string(),
        [only] => only.clone(),
        [first, .., last] => format!("{} to {}", first, last),
    }
}

fn label(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Polygon features become grounds centred on the mean of their exterior ring.
pub fn grounds_from_collection(collection: &FeatureCollection) -> Vec<FishingGroundWire> {
    collection
        .features
        .iter()
        .filter_map(|feature| {
            let geometry = feature.geometry.as_ref()?;
            let ring = geometry.exterior_ring()?;
            if ring.is_empty() {
                return None;
            }
            let count = ring.len() as f64;
            let lng = ring.iter().map(|[lon, _]| lon).sum::<f64>() / count;
            let lat = ring.iter().map(|[_, lat]| lat).sum::<f64>() / count;
            let id = feature.properties.get("contour_id").cloned();
            let tag = id.as_ref().map(label).unwrap_or_else(|| "?".into());
            Some(FishingGroundWire {
                id,
                name: format!("Ground {}", tag),
                lat: Some(lat),
                lng: Some(lng),
                description: Some(format!("Fishing ground {}", tag)),
                geometry: Some(geometry.clone()),
            })
        })
        .collect()
}

fn summaries(db: &TinyDb) -> Vec<TyphoonSummary> {
    db.records()
        .iter()
        .filter_map(|record| {
            let uuid = text_field(record, "uuid")?;
            Some(TyphoonSummary {
                uuid,
                name: text_field(record, "name").unwrap_or_default(),
                kind: text_field(record, "type").unwrap_or_default(),
                date_range: Some(date_range(&sorted_keys(record, "daily_data"))),
                track_points_count: Some(
                    record
                        .get("track_points")
                        .and_then(Value::as_array)
                        .map_or(0, Vec::len),
                ),
            })
        })
        .collect()
}

fn dates_of(db: &TinyDb, id: &str) -> Vec<String> {
    db.find_by("uuid", id)
        .map(|record| sorted_keys(record, "daily_data"))
        .unwrap_or_default()
}

impl NowcastRepository {
    pub fn new(db: TinyDb) -> Self {
        Self {
            db: RwLock::new(db),
            path: None,
            grounds: Vec::new(),
        }
    }

    /// Persist edits to `path`.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_grounds(mut self, grounds: Vec<FishingGroundWire>) -> Self {
        self.grounds = grounds;
        self
    }

    pub fn load_grounds<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<FishingGroundWire>> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading fishing grounds {}", path_ref.display()))?;
        let collection: FeatureCollection = serde_json::from_str(&contents)
            .with_context(|| format!("parsing fishing grounds {}", path_ref.display()))?;
        let grounds = grounds_from_collection(&collection);
        log::info!("{} nowcast fishing grounds from {}", grounds.len(), path_ref.display());
        Ok(grounds)
    }

    fn read(&self) -> RwLockReadGuard<'_, TinyDb> {
        self.db.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, db: &TinyDb) -> anyhow::Result<()> {
        match &self.path {
            Some(path) => db.save(path),
            None => Ok(()),
        }
    }

    /// Stores a new storm record; returns its document id.
    pub fn insert(&self, record: Value) -> anyhow::Result<String> {
        let mut db = self.db.write().unwrap_or_else(PoisonError::into_inner);
        let id = db.insert(record);
        self.persist(&db)?;
        Ok(id)
    }

    /// Removes the storm with `uuid`; `false` when there is none.
    pub fn delete(&self, uuid: &str) -> anyhow::Result<bool> {
        let mut db = self.db.write().unwrap_or_else(PoisonError::into_inner);
        if db.remove_by("uuid", uuid) == 0 {
            return Ok(false);
        }
        self.persist(&db)?;
        Ok(true)
    }

    pub fn typhoon_list(&self) -> Vec<TyphoonSummary> {
        summaries(&self.read())
    }

    fn listing(&self, typhoons: Vec<TyphoonSummary>) -> DashboardResponse {
        let db = self.read();
        let default_typhoon = typhoons
            .first()
            .and_then(|first| db.find_by("uuid", &first.uuid))
            .and_then(detail_from_record);
        let default_dates = typhoons
            .first()
            .map(|first| dates_of(&db, &first.uuid))
            .unwrap_or_default();
        DashboardResponse {
            typhoons: TyphoonEntries::Listed(typhoons),
            fishing_grounds: self.grounds.clone(),
            default_typhoon,
            default_dates,
            ..DashboardResponse::default()
        }
    }
}

impl TyphoonRepository for NowcastRepository {
    fn dashboard(&self) -> DashboardResponse {
        self.listing(self.typhoon_list())
    }

    /// Storms with at least one daily entry in `year`.
    fn dashboard_by_year(&self, year: i32) -> DashboardResponse {
        let prefix = format!("{}-", year);
        let typhoons = self
            .typhoon_list()
            .into_iter()
            .filter(|summary| {
                self.typhoon_dates(&summary.uuid)
                    .iter()
                    .any(|date| date.starts_with(&prefix))
            })
            .collect();
        let mut response = self.listing(typhoons);
        response.latest_year = Some(year);
        response
    }

    fn available_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self
            .read()
            .records()
            .iter()
            .flat_map(|record| sorted_keys(record, "daily_data"))
            .filter_map(|date| date.get(..4).and_then(|year| year.parse().ok()))
            .collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    fn typhoon(&self, id: &str) -> Option<TyphoonDetail> {
        self.read().find_by("uuid", id).and_then(detail_from_record)
    }

    fn typhoon_dates(&self, id: &str) -> Vec<String> {
        dates_of(&self.read(), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository() -> NowcastRepository {
        let db = TinyDb::parse(
            r#"{"typhoons": {
                "1": {"uuid": "u-1", "name": "CO-MAY", "type": "TY",
                      "track_points": [{"lat": 18.0, "lng": 126.0, "datetime": "2025-07-23 00:00"}],
                      "daily_data": {"2025-07-24": {}, "2025-07-23": {}}},
                "2": {"uuid": "u-2", "name": "WIPHA", "type": "TS", "track_points": [],
                      "daily_data": {"2024-12-30": {}}},
                "3": {"uuid": "u-3", "name": "EMPTY", "daily_data": {}}
            }}"#,
        )
        .unwrap();
        NowcastRepository::new(db)
    }

    #[test]
    fn list_summarizes_date_ranges() {
        let list = repository().typhoon_list();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].date_range.as_deref(), Some("2025-07-23 to 2025-07-24"));
        assert_eq!(list[0].track_points_count, Some(1));
        assert_eq!(list[1].date_range.as_deref(), Some("2024-12-30"));
        assert_eq!(list[2].date_range.as_deref(), Some("No data"));
    }

    #[test]
    fn dashboard_carries_first_storm_as_default() {
        let response = repository().dashboard();
        assert_eq!(response.default_typhoon.unwrap().uuid, "u-1");
        assert_eq!(response.default_dates, vec!["2025-07-23", "2025-07-24"]);
        assert!(matches!(response.typhoons, TyphoonEntries::Listed(ref list) if list.len() == 3));
    }

    #[test]
    fn years_come_from_daily_dates() {
        let repo = repository();
        assert_eq!(repo.available_years(), vec![2024, 2025]);
        let older = repo.dashboard_by_year(2024);
        assert!(matches!(older.typhoons, TyphoonEntries::Listed(ref list) if list.len() == 1));
        assert_eq!(older.default_typhoon.unwrap().name, "WIPHA");
    }

    #[test]
    fn edits_are_saved_and_shift_the_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nowcast.json");
        let repo = repository().with_path(&path);

        assert!(repo.delete("u-1").unwrap());
        assert!(!repo.delete("u-1").unwrap());
        assert_eq!(repo.dashboard().default_typhoon.unwrap().uuid, "u-2");

        let id = repo
            .insert(serde_json::json!({"uuid": "u-4", "name": "NEW", "daily_data": {"2025-08-01": {}}}))
            .unwrap();
        assert_eq!(id, "4");
        assert_eq!(repo.typhoon_dates("u-4"), vec!["2025-08-01"]);

        let saved = NowcastRepository::new(TinyDb::load(&path).unwrap());
        let uuids: Vec<_> = saved.typhoon_list().into_iter().map(|s| s.uuid).collect();
        assert_eq!(uuids, vec!["u-2", "u-3", "u-4"]);
    }

    #[test]
    fn ground_centroids_average_the_ring() {
        let collection: FeatureCollection = serde_json::from_str(
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"contour_id": 3},
                 "geometry": {"type": "Polygon", "coordinates": [[[120, 14], [122, 14], [122, 16], [120, 16]]]}},
                {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [1, 2]}}
            ]}"#,
        )
        .unwrap();
        let grounds = grounds_from_collection(&collection);
        assert_eq!(grounds.len(), 1);
        assert_eq!(grounds[0].name, "Ground 3");
        assert_eq!(grounds[0].lat, Some(15.0));
        assert_eq!(grounds[0].lng, Some(121.0));
    }
}
