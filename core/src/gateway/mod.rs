//! Remote data gateway: typed, retrying access to the bridge.

pub mod remote;
pub mod retry;

pub use remote::RemoteDataGateway;
pub use retry::Retrier;

use crate::wire::{
    AnalysisStatus, CreateTyphoonRequest, DashboardResponse, FeatureCollection,
    HistoricalRunRequest, NowcastRunRequest, RunResponse, TyphoonDetail,
};
use async_trait::async_trait;

/// Failure of a single bridge call.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The host has not attached the bridge yet.
    #[error("bridge not ready")]
    NotReady,
    /// Transient failure; the call may succeed if repeated.
    #[error("bridge call failed: {0}")]
    Failed(String),
    /// The bridge answered with something unusable; repeating will not help.
    #[error("bridge rejected call: {0}")]
    Rejected(String),
}

impl TransportError {
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::NotReady | TransportError::Failed(_))
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

/// The asynchronous call surface exposed by the host application.
#[async_trait]
pub trait BridgeApi: Send + Sync {
    async fn get_dashboard_data(&self) -> TransportResult<DashboardResponse>;
    async fn get_dashboard_data_by_year(&self, year: i32) -> TransportResult<DashboardResponse>;
    async fn get_available_years(&self) -> TransportResult<Vec<i32>>;
    async fn get_typhoon_data(&self, id: &str) -> TransportResult<Option<TyphoonDetail>>;
    async fn get_typhoon_dates(&self, id: &str) -> TransportResult<Vec<String>>;
    async fn get_boat_detections_geojson(
        &self,
        year: i32,
        max_count: usize,
    ) -> TransportResult<Option<FeatureCollection>>;

    async fn run_historical_analysis(
        &self,
        request: &HistoricalRunRequest,
    ) -> TransportResult<RunResponse>;
    async fn get_historical_analysis_status(&self) -> TransportResult<AnalysisStatus>;
    async fn cancel_historical_analysis(&self) -> TransportResult<RunResponse>;

    async fn run_nowcast_analysis(&self, request: &NowcastRunRequest)
        -> TransportResult<RunResponse>;
    async fn get_nowcast_analysis_status(&self) -> TransportResult<AnalysisStatus>;
    async fn cancel_nowcast_analysis(&self) -> TransportResult<RunResponse>;

    async fn upload_cyclone_track(&self, file_data: &str, filename: &str)
        -> TransportResult<String>;
    async fn save_track(&self, track_json: &str) -> TransportResult<Option<String>>;

    /// Nowcast only. Returns the new storm's uuid, or `None` when the bridge
    /// could not read the files.
    async fn create_typhoon_from_files(
        &self,
        request: &CreateTyphoonRequest,
    ) -> TransportResult<Option<String>>;
    /// Nowcast only. Returns whether a stored storm was removed.
    async fn delete_typhoon(&self, id: &str) -> TransportResult<bool>;
}

#[async_trait]
impl<B: BridgeApi + ?Sized> BridgeApi for std::sync::Arc<B> {
    async fn get_dashboard_data(&self) -> TransportResult<DashboardResponse> {
        (**self).get_dashboard_data().await
    }
    async fn get_dashboard_data_by_year(&self, year: i32) -> TransportResult<DashboardResponse> {
        (**self).get_dashboard_data_by_year(year).await
    }
    async fn get_available_years(&self) -> TransportResult<Vec<i32>> {
        (**self).get_available_years().await
    }
    async fn get_typhoon_data(&self, id: &str) -> TransportResult<Option<TyphoonDetail>> {
        (**self).get_typhoon_data(id).await
    }
    async fn get_typhoon_dates(&self, id: &str) -> TransportResult<Vec<String>> {
        (**self).get_typhoon_dates(id).await
    }
    async fn get_boat_detections_geojson(
        &self,
        year: i32,
        max_count: usize,
    ) -> TransportResult<Option<FeatureCollection>> {
        (**self).get_boat_detections_geojson(year, max_count).await
    }
    async fn run_historical_analysis(
        &self,
        request: &HistoricalRunRequest,
    ) -> TransportResult<RunResponse> {
        (**self).run_historical_analysis(request).await
    }
    async fn get_historical_analysis_status(&self) -> TransportResult<AnalysisStatus> {
        (**self).get_historical_analysis_status().await
    }
    async fn cancel_historical_analysis(&self) -> TransportResult<RunResponse> {
        (**self).cancel_historical_analysis().await
    }
    async fn run_nowcast_analysis(
        &self,
        request: &NowcastRunRequest,
    ) -> TransportResult<RunResponse> {
        (**self).run_nowcast_analysis(request).await
    }
    async fn get_nowcast_analysis_status(&self) -> TransportResult<AnalysisStatus> {
        (**self).get_nowcast_analysis_status().await
    }
    async fn cancel_nowcast_analysis(&self) -> TransportResult<RunResponse> {
        (**self).cancel_nowcast_analysis().await
    }
    async fn upload_cyclone_track(
        &self,
        file_data: &str,
        filename: &str,
    ) -> TransportResult<String> {
        (**self).upload_cyclone_track(file_data, filename).await
    }
    async fn save_track(&self, track_json: &str) -> TransportResult<Option<String>> {
        (**self).save_track(track_json).await
    }
    async fn create_typhoon_from_files(
        &self,
        request: &CreateTyphoonRequest,
    ) -> TransportResult<Option<String>> {
        (**self).create_typhoon_from_files(request).await
    }
    async fn delete_typhoon(&self, id: &str) -> TransportResult<bool> {
        (**self).delete_typhoon(id).await
    }
}

#[cfg(test)]
pub(crate) mod fake;
