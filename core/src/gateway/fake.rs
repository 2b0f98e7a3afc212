//! In-process bridge used by the engine tests.

use crate::gateway::{BridgeApi, TransportError, TransportResult};
use crate::wire::{
    AnalysisStatus, CreateTyphoonRequest, DashboardResponse, Feature, FeatureCollection,
    Geometry, HistoricalRunRequest, JobState, NowcastRunRequest, RunResponse, TyphoonDetail,
    TyphoonEntries, UploadRequest,
};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub(crate) struct FakeBridge {
    latest: DashboardResponse,
    by_year: HashMap<i32, DashboardResponse>,
    years: Vec<i32>,
    details: HashMap<String, TyphoonDetail>,
    dates: HashMap<String, Vec<String>>,
    detections: HashMap<i32, FeatureCollection>,
    delays: HashMap<i32, Duration>,
    statuses: Mutex<VecDeque<AnalysisStatus>>,
    transient_failures: AtomicUsize,
    down: AtomicBool,
    calls: Mutex<Vec<String>>,
    runs: Mutex<Vec<String>>,
    uploads: Mutex<Vec<UploadRequest>>,
    saved: Mutex<Vec<String>>,
    created: Mutex<Vec<CreateTyphoonRequest>>,
    deleted: Mutex<HashSet<String>>,
}

impl FakeBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latest(mut self, response: DashboardResponse) -> Self {
        self.latest = response;
        self
    }

    pub fn with_year(mut self, year: i32, response: DashboardResponse) -> Self {
        self.by_year.insert(year, response);
        if !self.years.contains(&year) {
            self.years.push(year);
        }
        self
    }

    pub fn with_years(mut self, years: Vec<i32>) -> Self {
        self.years = years;
        self
    }

    pub fn with_detail(mut self, detail: TyphoonDetail, dates: &[&str]) -> Self {
        self.dates.insert(
            detail.uuid.clone(),
            dates.iter().map(|date| date.to_string()).collect(),
        );
        self.details.insert(detail.uuid.clone(), detail);
        self
    }

    pub fn with_detections(mut self, year: i32, collection: FeatureCollection) -> Self {
        self.detections.insert(year, collection);
        self
    }

    /// Delays dashboard responses for `year`.
    pub fn with_delay(mut self, year: i32, delay: Duration) -> Self {
        self.delays.insert(year, delay);
        self
    }

    /// Status sequence returned by the analysis status calls; the last entry repeats.
    pub fn with_statuses(self, statuses: Vec<AnalysisStatus>) -> Self {
        if let Ok(mut queue) = self.statuses.lock() {
            *queue = statuses.into();
        }
        self
    }

    pub fn fail_next(&self, count: usize) {
        self.transient_failures.store(count, Ordering::SeqCst);
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.iter().filter(|call| call.as_str() == name).count())
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }

    pub fn runs(&self) -> Vec<String> {
        self.runs.lock().map(|runs| runs.clone()).unwrap_or_default()
    }

    pub fn uploads(&self) -> Vec<UploadRequest> {
        self.uploads.lock().map(|u| u.clone()).unwrap_or_default()
    }

    pub fn saved(&self) -> Vec<String> {
        self.saved.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn created(&self) -> Vec<CreateTyphoonRequest> {
        self.created.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn is_deleted(&self, id: &str) -> bool {
        self.deleted
            .lock()
            .map(|deleted| deleted.contains(id))
            .unwrap_or(false)
    }

    fn enter(&self, name: &str) -> TransportResult<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(name.to_string());
        }
        if self.down.load(Ordering::SeqCst) {
            return Err(TransportError::NotReady);
        }
        let pending = self.transient_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.transient_failures.store(pending - 1, Ordering::SeqCst);
            return Err(TransportError::Failed("flaky link".into()));
        }
        Ok(())
    }

    fn next_status(&self) -> AnalysisStatus {
        let Ok(mut queue) = self.statuses.lock() else {
            return AnalysisStatus::default();
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap_or_default()
        } else {
            queue.front().cloned().unwrap_or_default()
        }
    }

    fn cancel(&self, kind: &str) -> RunResponse {
        if let Ok(mut runs) = self.runs.lock() {
            runs.push(format!("cancel:{}", kind));
        }
        if let Ok(mut queue) = self.statuses.lock() {
            *queue = vec![status(JobState::Cancelled, 0, "")].into();
        }
        RunResponse {
            status: "cancelled".into(),
            message: None,
        }
    }
}

#[async_trait]
impl BridgeApi for FakeBridge {
    async fn get_dashboard_data(&self) -> TransportResult<DashboardResponse> {
        self.enter("get_dashboard_data")?;
        let mut response = self.latest.clone();
        if let TyphoonEntries::Listed(list) = &mut response.typhoons {
            list.retain(|summary| !self.is_deleted(&summary.uuid));
        }
        if let Some(detail) = &response.default_typhoon {
            if self.is_deleted(&detail.uuid) {
                response.default_typhoon = None;
            }
        }
        Ok(response)
    }

    async fn get_dashboard_data_by_year(&self, year: i32) -> TransportResult<DashboardResponse> {
        self.enter("get_dashboard_data_by_year")?;
        if let Some(delay) = self.delays.get(&year) {
            tokio::time::sleep(*delay).await;
        }
        Ok(self.by_year.get(&year).cloned().unwrap_or_default())
    }

    async fn get_available_years(&self) -> TransportResult<Vec<i32>> {
        self.enter("get_available_years")?;
        Ok(self.years.clone())
    }

    async fn get_typhoon_data(&self, id: &str) -> TransportResult<Option<TyphoonDetail>> {
        self.enter("get_typhoon_data")?;
        if self.is_deleted(id) {
            return Ok(None);
        }
        Ok(self.details.get(id).cloned())
    }

    async fn get_typhoon_dates(&self, id: &str) -> TransportResult<Vec<String>> {
        self.enter("get_typhoon_dates")?;
        Ok(self.dates.get(id).cloned().unwrap_or_default())
    }

    async fn get_boat_detections_geojson(
        &self,
        year: i32,
        _max_count: usize,
    ) -> TransportResult<Option<FeatureCollection>> {
        self.enter("get_boat_detections_geojson")?;
        Ok(self.detections.get(&year).cloned())
    }

    async fn run_historical_analysis(
        &self,
        request: &HistoricalRunRequest,
    ) -> TransportResult<RunResponse> {
        self.enter("run_historical_analysis")?;
        if let Ok(mut runs) = self.runs.lock() {
            runs.push(format!("historical:{}:{}", request.country, request.year));
        }
        Ok(RunResponse::started("historical analysis started"))
    }

    async fn get_historical_analysis_status(&self) -> TransportResult<AnalysisStatus> {
        self.enter("get_historical_analysis_status")?;
        Ok(self.next_status())
    }

    async fn cancel_historical_analysis(&self) -> TransportResult<RunResponse> {
        self.enter("cancel_historical_analysis")?;
        Ok(self.cancel("historical"))
    }

    async fn run_nowcast_analysis(
        &self,
        request: &NowcastRunRequest,
    ) -> TransportResult<RunResponse> {
        self.enter("run_nowcast_analysis")?;
        if let Ok(mut runs) = self.runs.lock() {
            runs.push(format!("nowcast:{}:{:?}", request.country, request.days));
        }
        Ok(RunResponse::started("nowcast analysis started"))
    }

    async fn get_nowcast_analysis_status(&self) -> TransportResult<AnalysisStatus> {
        self.enter("get_nowcast_analysis_status")?;
        Ok(self.next_status())
    }

    async fn cancel_nowcast_analysis(&self) -> TransportResult<RunResponse> {
        self.enter("cancel_nowcast_analysis")?;
        Ok(self.cancel("nowcast"))
    }

    async fn upload_cyclone_track(
        &self,
        file_data: &str,
        filename: &str,
    ) -> TransportResult<String> {
        self.enter("upload_cyclone_track")?;
        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.push(UploadRequest {
                file_data: file_data.to_string(),
                filename: filename.to_string(),
            });
        }
        Ok(format!("/tmp/uploads/{}", filename))
    }

    async fn save_track(&self, track_json: &str) -> TransportResult<Option<String>> {
        self.enter("save_track")?;
        if let Ok(mut saved) = self.saved.lock() {
            saved.push(track_json.to_string());
        }
        Ok(Some("/tmp/tracks/drawn_track.json".into()))
    }

    async fn create_typhoon_from_files(
        &self,
        request: &CreateTyphoonRequest,
    ) -> TransportResult<Option<String>> {
        self.enter("create_typhoon_from_files")?;
        let Ok(mut created) = self.created.lock() else {
            return Ok(None);
        };
        created.push(request.clone());
        Ok(Some(format!("u-new-{}", created.len())))
    }

    async fn delete_typhoon(&self, id: &str) -> TransportResult<bool> {
        self.enter("delete_typhoon")?;
        if !self.details.contains_key(id) {
            return Ok(false);
        }
        Ok(self
            .deleted
            .lock()
            .map(|mut deleted| deleted.insert(id.to_string()))
            .unwrap_or(false))
    }
}

pub(crate) fn status(state: JobState, phase: u32, message: &str) -> AnalysisStatus {
    AnalysisStatus {
        status: state,
        current_phase: phase,
        total_phases: 5,
        phase_name: format!("Phase {}", phase),
        message: message.to_string(),
        progress_percent: phase * 20,
        error_message: None,
    }
}

/// Three storms over five grounds.
///
/// KONG-REY is fastest, CO-MAY has the fewest boats, TRAMI passes closest.
pub(crate) fn historical_payload(year: i32) -> DashboardResponse {
    serde_json::from_value(json!({
        "typhoons": {
            "KONG-REY": {
                "name": "KONG-REY",
                "type": "TY",
                "year": year,
                "dates": format!("{}-10-28 to {}-10-31", year, year),
                "avgSpeed": "12.4",
                "maxSpeed": "26.0",
                "maxWind": 62.0,
                "boatData": {
                    "ground0": {"baseline": 10, "difference": -50, "distance": "9.5"},
                    "ground1": {"baseline": 20, "difference": 10, "distance": "10.2"},
                    "ground2": {"baseline": 30, "difference": -5, "distance": "3.1"},
                    "ground3": {"baseline": 0, "difference": 0, "distance": "40"},
                    "ground4": {"baseline": 5, "difference": 200, "distance": "55"}
                },
                "averageBoats": 120.5,
                "track_points": [
                    {"lat": 18.0, "lng": 126.0, "datetime": format!("{}-10-28 12:00", year), "windSpeed": 80, "cycloneSpeed": 10},
                    {"lat": 19.0, "lng": 125.0, "datetime": format!("{}-10-29 00:00", year), "windSpeed": 90, "cycloneSpeed": 12},
                    {"lat": 20.5, "lng": 123.5, "datetime": format!("{}-10-29 12:00", year), "windSpeed": 95, "cycloneSpeed": 26}
                ]
            },
            "CO-MAY": {
                "name": "CO-MAY",
                "type": "STS",
                "year": year,
                "avgSpeed": 9.0,
                "maxSpeed": 14.0,
                "maxWind": 55.0,
                "boatData": {
                    "ground0": {"baseline": 40, "difference": -20, "distance": 15},
                    "ground1": {"baseline": 12, "difference": -10, "distance": 22},
                    "ground2": {"baseline": 8, "difference": 5, "distance": 18},
                    "ground3": {"baseline": 20, "difference": 0, "distance": 30},
                    "ground4": {"baseline": 6, "difference": -100, "distance": 60}
                },
                "averageBoats": 80.0
            },
            "TRAMI": {
                "name": "TRAMI",
                "type": "TS",
                "year": year,
                "avgSpeed": 11.0,
                "maxSpeed": 18.0,
                "maxWind": 48.0,
                "boatData": {
                    "ground0": {"baseline": 5, "difference": 0, "distance": 2.5},
                    "ground1": {"baseline": 5, "difference": 0, "distance": 40},
                    "ground2": {"baseline": 5, "difference": 0, "distance": 50},
                    "ground3": {"baseline": 5, "difference": 0, "distance": 70},
                    "ground4": {"baseline": 5, "difference": 0, "distance": 90}
                },
                "averageBoats": 150.0
            }
        },
        "fishing_grounds": [
            {"name": "Ground 0", "lat": 14.5, "lng": 120.5},
            {"name": "Ground 1", "lat": 13.0, "lng": 123.0},
            {"name": "Ground 2", "lat": 11.2, "lng": 124.4},
            {"name": "Ground 3", "lat": 9.8, "lng": 118.7},
            {"name": "Ground 4", "lat": 7.1, "lng": 125.6}
        ],
        "latest_year": year
    }))
    .unwrap_or_default()
}

fn nowcast_detail(uuid: &str, name: &str, days: &[(&str, f64)]) -> TyphoonDetail {
    let mut daily = serde_json::Map::new();
    let mut track = Vec::new();
    for (idx, (date, speed)) in days.iter().enumerate() {
        daily.insert(
            date.to_string(),
            json!({
                "date": date,
                "avgStormSpeed": format!("{:.1} knots", speed),
                "maxStormSpeed": format!("{:.1} knots", speed + 2.0),
                "maxWindSpeed": "70 knots",
                "distances": [120.0 - idx as f64 * 10.0, 80.0],
                "boatCounts": {"baseline": [10, 0], "predicted": [5, 4]},
                "activityDifference": ["-50.0%", "+∞%"]
            }),
        );
        track.push(json!({
            "lat": 14.0 + idx as f64,
            "lng": 121.0 - idx as f64,
            "datetime": format!("{} 06:00", date),
            "windSpeed": 65,
            "cycloneSpeed": speed
        }));
    }
    serde_json::from_value(json!({
        "uuid": uuid,
        "name": name,
        "type": "TY",
        "track_points": track,
        "daily_data": daily
    }))
    .unwrap_or_else(|_| TyphoonDetail {
        uuid: uuid.into(),
        name: name.into(),
        kind: String::new(),
        track_points: Vec::new(),
        daily_data: serde_json::Map::new(),
        dashboard_data: None,
    })
}

/// Two active storms: u-1 on 23-24 July, u-2 on 25 July only.
pub(crate) fn nowcast_bridge() -> FakeBridge {
    let latest: DashboardResponse = serde_json::from_value(json!({
        "typhoons": [
            {"uuid": "u-1", "name": "CO-MAY", "type": "TY", "track_points_count": 2},
            {"uuid": "u-2", "name": "WIPHA", "type": "TS", "track_points_count": 1}
        ],
        "fishing_grounds_geojson": {
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"contour_id": 3},
                 "geometry": {"type": "Polygon", "coordinates": [[[120.0, 14.0], [121.0, 14.0], [121.0, 15.0], [120.0, 14.0]]]}},
                {"type": "Feature", "properties": {"contour_id": 5},
                 "geometry": {"type": "Polygon", "coordinates": [[[122.0, 12.0], [123.0, 12.0], [123.0, 13.0], [122.0, 12.0]]]}}
            ]
        }
    }))
    .unwrap_or_default();

    FakeBridge::new()
        .with_latest(latest)
        .with_years(vec![2025])
        .with_detail(
            nowcast_detail("u-1", "CO-MAY", &[("2025-07-23", 15.5), ("2025-07-24", 13.0)]),
            &["2025-07-24", "2025-07-23"],
        )
        .with_detail(
            nowcast_detail("u-2", "WIPHA", &[("2025-07-25", 18.0)]),
            &["2025-07-25"],
        )
}

pub(crate) fn detection_collection(count: usize) -> FeatureCollection {
    let features = (0..count)
        .map(|idx| Feature {
            kind: "Feature".into(),
            geometry: Some(Geometry::point(120.0 + idx as f64 * 0.1, 12.0)),
            properties: [("date".to_string(), json!("2023-08-01"))]
                .into_iter()
                .collect(),
        })
        .collect();
    FeatureCollection::new(features)
}
