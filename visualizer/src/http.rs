use async_trait::async_trait;
use cyclonecore::gateway::{BridgeApi, TransportError, TransportResult};
use cyclonecore::prelude::Mode;
use cyclonecore::wire::{
    routes, AnalysisStatus, CreateTyphoonRequest, CreateTyphoonResponse, DashboardResponse,
    DeleteTyphoonResponse, FeatureCollection, HistoricalRunRequest, NowcastRunRequest,
    PathResponse, RunResponse, TyphoonDetail, UploadRequest,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// [`BridgeApi`] over the bridge host's HTTP routes. Data calls go to the
/// routes of the mode the bridge was created for.
#[derive(Debug, Clone)]
pub struct HttpBridge {
    client: Client,
    base: String,
    data_base: String,
}

fn mode_segment(mode: Mode) -> &'static str {
    match mode {
        Mode::Historical => routes::HISTORICAL,
        Mode::Nowcast => routes::NOWCAST,
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_connect() || err.is_timeout() {
        TransportError::NotReady
    } else if err.is_decode() {
        TransportError::Rejected(err.to_string())
    } else {
        TransportError::Failed(err.to_string())
    }
}

impl HttpBridge {
    pub fn new(base_url: &str, mode: Mode) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            data_base: format!("{}/{}", base, mode_segment(mode)),
            base,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> TransportResult<T> {
        let response = request.send().await.map_err(classify)?;
        let status = response.status();
        if status.is_server_error() {
            return Err(TransportError::Failed(format!("bridge answered {}", status)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected(format!("{}: {}", status, body)));
        }
        response.json::<T>().await.map_err(classify)
    }

    async fn get<T: DeserializeOwned>(&self, url: String) -> TransportResult<T> {
        self.send(self.client.get(url)).await
    }

    async fn post<T: DeserializeOwned, P: serde::Serialize + ?Sized>(
        &self,
        url: String,
        payload: &P,
    ) -> TransportResult<T> {
        self.send(self.client.post(url).json(payload)).await
    }
}

#[async_trait]
impl BridgeApi for HttpBridge {
    async fn get_dashboard_data(&self) -> TransportResult<DashboardResponse> {
        self.get(routes::dashboard_data(&self.data_base, None)).await
    }

    async fn get_dashboard_data_by_year(&self, year: i32) -> TransportResult<DashboardResponse> {
        self.get(routes::dashboard_data(&self.data_base, Some(year)))
            .await
    }

    async fn get_available_years(&self) -> TransportResult<Vec<i32>> {
        self.get(routes::available_years(&self.data_base)).await
    }

    async fn get_typhoon_data(&self, id: &str) -> TransportResult<Option<TyphoonDetail>> {
        self.get(routes::typhoon(&self.data_base, id)).await
    }

    async fn get_typhoon_dates(&self, id: &str) -> TransportResult<Vec<String>> {
        self.get(routes::typhoon_dates(&self.data_base, id)).await
    }

    async fn get_boat_detections_geojson(
        &self,
        year: i32,
        max_count: usize,
    ) -> TransportResult<Option<FeatureCollection>> {
        self.get(routes::boat_detections(&self.data_base, year, max_count))
            .await
    }

    async fn run_historical_analysis(
        &self,
        request: &HistoricalRunRequest,
    ) -> TransportResult<RunResponse> {
        self.post(routes::analysis(&self.base, routes::HISTORICAL, routes::RUN), request)
            .await
    }

    async fn get_historical_analysis_status(&self) -> TransportResult<AnalysisStatus> {
        self.get(routes::analysis(&self.base, routes::HISTORICAL, routes::STATUS))
            .await
    }

    async fn cancel_historical_analysis(&self) -> TransportResult<RunResponse> {
        self.send(
            self.client
                .post(routes::analysis(&self.base, routes::HISTORICAL, routes::CANCEL)),
        )
        .await
    }

    async fn run_nowcast_analysis(
        &self,
        request: &NowcastRunRequest,
    ) -> TransportResult<RunResponse> {
        self.post(routes::analysis(&self.base, routes::NOWCAST, routes::RUN), request)
            .await
    }

    async fn get_nowcast_analysis_status(&self) -> TransportResult<AnalysisStatus> {
        self.get(routes::analysis(&self.base, routes::NOWCAST, routes::STATUS))
            .await
    }

    async fn cancel_nowcast_analysis(&self) -> TransportResult<RunResponse> {
        self.send(
            self.client
                .post(routes::analysis(&self.base, routes::NOWCAST, routes::CANCEL)),
        )
        .await
    }

    async fn upload_cyclone_track(
        &self,
        file_data: &str,
        filename: &str,
    ) -> TransportResult<String> {
        let upload = UploadRequest {
            file_data: file_data.to_string(),
            filename: filename.to_string(),
        };
        let stored: PathResponse = self.post(routes::upload_track(&self.base), &upload).await?;
        stored
            .path
            .ok_or_else(|| TransportError::Rejected("the bridge did not store the upload".into()))
    }

    async fn save_track(&self, track_json: &str) -> TransportResult<Option<String>> {
        let request = self
            .client
            .post(routes::save_track(&self.base))
            .header(CONTENT_TYPE, "application/json")
            .body(track_json.to_string());
        let saved: PathResponse = self.send(request).await?;
        Ok(saved.path)
    }

    async fn create_typhoon_from_files(
        &self,
        request: &CreateTyphoonRequest,
    ) -> TransportResult<Option<String>> {
        let created: CreateTyphoonResponse =
            self.post(routes::create_typhoon(&self.base), request).await?;
        Ok(created.uuid)
    }

    async fn delete_typhoon(&self, id: &str) -> TransportResult<bool> {
        let url = routes::typhoon(&format!("{}/{}", self.base, routes::NOWCAST), id);
        let deleted: DeleteTyphoonResponse = self.send(self.client.delete(url)).await?;
        Ok(deleted.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answers a single request with `status` and `body`, returning the base URL.
    async fn one_shot(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buffer = [0u8; 4096];
            let _ = socket.read(&mut buffer).await;
            let reply = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn years_decode_from_json() {
        let base = one_shot("200 OK", "[2022, 2023]").await;
        let bridge = HttpBridge::new(&base, Mode::Historical);
        assert_eq!(bridge.get_available_years().await.unwrap(), vec![2022, 2023]);
    }

    #[tokio::test]
    async fn closed_port_is_not_ready() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let bridge = HttpBridge::new(&format!("http://{}", addr), Mode::Nowcast);
        let err = bridge.get_dashboard_data().await.unwrap_err();
        assert_eq!(err, TransportError::NotReady);
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn missing_route_is_rejected() {
        let base = one_shot("404 Not Found", "").await;
        let bridge = HttpBridge::new(&base, Mode::Historical);
        let err = bridge.get_typhoon_dates("x").await.unwrap_err();
        assert!(matches!(err, TransportError::Rejected(_)));
    }

    #[tokio::test]
    async fn server_errors_are_retryable() {
        let base = one_shot("500 Internal Server Error", "{}").await;
        let bridge = HttpBridge::new(&base, Mode::Historical);
        assert!(bridge.get_available_years().await.unwrap_err().is_transient());
    }

    #[tokio::test]
    async fn unsaved_track_is_none() {
        let base = one_shot("200 OK", "{\"path\": null}").await;
        let bridge = HttpBridge::new(&base, Mode::Nowcast);
        assert_eq!(bridge.save_track("{\"points\": []}").await.unwrap(), None);
    }

    #[tokio::test]
    async fn deletion_reads_the_success_flag() {
        let base = one_shot("200 OK", "{\"success\": false}").await;
        let bridge = HttpBridge::new(&base, Mode::Historical);
        assert!(!bridge.delete_typhoon("u-9").await.unwrap());
    }

    #[tokio::test]
    async fn unreadable_storm_files_create_nothing() {
        let base = one_shot("200 OK", "{\"uuid\": null}").await;
        let bridge = HttpBridge::new(&base, Mode::Nowcast);
        let request = CreateTyphoonRequest {
            name: "WIPHA".into(),
            csv_path: "daily.csv".into(),
            shapefile_path: "track.shp".into(),
        };
        assert_eq!(bridge.create_typhoon_from_files(&request).await.unwrap(), None);
    }

    #[test]
    fn data_routes_are_prefixed_by_mode() {
        let bridge = HttpBridge::new("http://127.0.0.1:9000/", Mode::Nowcast);
        assert_eq!(bridge.data_base, "http://127.0.0.1:9000/nowcast");
        assert_eq!(bridge.base, "http://127.0.0.1:9000");
    }
}
