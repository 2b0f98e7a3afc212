//! Access to the TinyDB-style JSON databases the analysis pipeline writes
//! (`{"typhoons": {"1": {...}, "2": {...}}}`).

pub mod detections;
pub mod historical;
pub mod ingest;
pub mod nowcast;

pub use detections::DetectionArchive;
pub use historical::HistoricalRepository;
pub use nowcast::NowcastRepository;

use anyhow::Context;
use cyclonecore::wire::{DashboardResponse, TyphoonDetail};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Data calls served for one dashboard mode.
pub trait TyphoonRepository: Send + Sync {
    fn dashboard(&self) -> DashboardResponse;
    fn dashboard_by_year(&self, year: i32) -> DashboardResponse;
    fn available_years(&self) -> Vec<i32>;
    fn typhoon(&self, id: &str) -> Option<TyphoonDetail>;
    fn typhoon_dates(&self, id: &str) -> Vec<String>;
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    typhoons: BTreeMap<String, Value>,
}

/// Records of the `typhoons` table in document-id order.
#[derive(Debug, Clone, Default)]
pub struct TinyDb {
    ids: Vec<String>,
    records: Vec<Value>,
}

impl TinyDb {
    /// A missing file is an empty table, as TinyDB creates it lazily.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        if !path_ref.exists() {
            log::warn!("database {} not found, serving no typhoons", path_ref.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading database {}", path_ref.display()))?;
        Self::parse(&contents).with_context(|| format!("parsing database {}", path_ref.display()))
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let document: Document = serde_json::from_str(contents)?;
        let mut entries: Vec<(String, Value)> = document.typhoons.into_iter().collect();
        entries.sort_by_key(|(id, _)| id.parse::<u64>().unwrap_or(u64::MAX));
        let (ids, records) = entries.into_iter().unzip();
        Ok(Self { ids, records })
    }

    pub fn records(&self) -> &[Value] {
        &self.records
    }

    pub fn find_by(&self, field: &str, value: &str) -> Option<&Value> {
        self.records
            .iter()
            .find(|record| record.get(field).and_then(Value::as_str) == Some(value))
    }

    /// Appends a record under the next numeric document id.
    pub fn insert(&mut self, record: Value) -> String {
        let next = self
            .ids
            .iter()
            .filter_map(|id| id.parse::<u64>().ok())
            .max()
            .map_or(1, |last| last + 1);
        let id = next.to_string();
        self.ids.push(id.clone());
        self.records.push(record);
        id
    }

    /// Drops every record whose `field` equals `value`; returns how many.
    pub fn remove_by(&mut self, field: &str, value: &str) -> usize {
        let before = self.records.len();
        let (ids, records) = self
            .ids
            .drain(..)
            .zip(self.records.drain(..))
            .filter(|(_, record)| record.get(field).and_then(Value::as_str) != Some(value))
            .unzip();
        self.ids = ids;
        self.records = records;
        before - self.records.len()
    }

    pub fn to_json(&self) -> Value {
        let typhoons: serde_json::Map<String, Value> = self
            .ids
            .iter()
            .cloned()
            .zip(self.records.iter().cloned())
            .collect();
        serde_json::json!({ "typhoons": typhoons })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let contents = serde_json::to_string(&self.to_json())?;
        fs::write(path_ref, contents)
            .with_context(|| format!("writing database {}", path_ref.display()))
    }
}

/// Object keys of `record[field]`, sorted.
fn sorted_keys(record: &Value, field: &str) -> Vec<String> {
    let mut keys: Vec<String> = record
        .get(field)
        .and_then(Value::as_object)
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default();
    keys.sort();
    keys
}

fn text_field(record: &Value, field: &str) -> Option<String> {
    record.get(field).and_then(Value::as_str).map(str::to_string)
}

/// Detail payload of a stored record; records without a uuid use their name.
fn detail_from_record(record: &Value) -> Option<TyphoonDetail> {
    let name = text_field(record, "name")?;
    Some(TyphoonDetail {
        uuid: text_field(record, "uuid").unwrap_or_else(|| name.clone()),
        kind: text_field(record, "type").unwrap_or_default(),
        track_points: record
            .get("track_points")
            .cloned()
            .and_then(|points| serde_json::from_value(points).ok())
            .unwrap_or_default(),
        daily_data: record
            .get("daily_data")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
        dashboard_data: record.get("dashboard_data").cloned(),
        name,
    })
}
