use crate::config::RetryPolicy;
use crate::gateway::{BridgeApi, Retrier};
use crate::model::{BoatDetectionPoint, DashboardBundle, StormRecord};
use crate::prelude::{Mode, Scope};
use crate::telemetry::{LogManager, MetricsRecorder};
use crate::wire::convert::{
    bundle_from_historical, detections_from_geojson, grounds_from_response, parse_date,
    storm_from_detail,
};
use crate::wire::{DashboardResponse, TyphoonEntries};
use std::sync::Arc;

/// Typed fetches over a [`BridgeApi`]. Never touches the context store; every
/// failure path yields an empty value.
pub struct RemoteDataGateway<B: BridgeApi> {
    bridge: B,
    retrier: Retrier,
    recorder: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl<B: BridgeApi> RemoteDataGateway<B> {
    pub fn new(bridge: B, policy: RetryPolicy, recorder: Arc<MetricsRecorder>) -> Self {
        Self {
            bridge,
            retrier: Retrier::new(policy, recorder.clone()),
            recorder,
            logger: LogManager::new("gateway"),
        }
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn retrier(&self) -> &Retrier {
        &self.retrier
    }

    pub fn recorder(&self) -> &Arc<MetricsRecorder> {
        &self.recorder
    }

    /// Loads every storm of a scope plus the fishing grounds.
    ///
    /// Historical payloads carry the full storm records. Nowcast payloads only
    /// list storms, so each listed storm's detail is fetched and joined in.
    pub async fn fetch_dashboard_bundle(
        &self,
        mode: Mode,
        scope: Option<&Scope>,
    ) -> DashboardBundle {
        let response = match (mode, scope) {
            (Mode::Historical, Some(scope)) => {
                let year = scope.year();
                self.retrier
                    .run("dashboard_data_by_year", || {
                        self.bridge.get_dashboard_data_by_year(year)
                    })
                    .await
            }
            _ => {
                self.retrier
                    .run("dashboard_data", || self.bridge.get_dashboard_data())
                    .await
            }
        };
        let Some(response) = response else {
            self.logger
                .warn(&format!("{} dashboard unavailable, using empty dataset", mode));
            return DashboardBundle::empty();
        };

        let bundle = match &response.typhoons {
            TyphoonEntries::Keyed(_) => bundle_from_historical(&response),
            TyphoonEntries::Listed(_) => self.assemble_listed(&response).await,
        };
        self.logger.record(&format!(
            "{} bundle loaded: {} storms, {} grounds",
            mode,
            bundle.storms.len(),
            bundle.ground_count()
        ));
        bundle
    }

    async fn assemble_listed(&self, response: &DashboardResponse) -> DashboardBundle {
        let TyphoonEntries::Listed(list) = &response.typhoons else {
            return bundle_from_historical(response);
        };
        let mut storms = Vec::with_capacity(list.len());
        for summary in list {
            let preloaded = response
                .default_typhoon
                .as_ref()
                .filter(|detail| detail.uuid == summary.uuid)
                .map(storm_from_detail);
            let storm = match preloaded {
                Some(storm) => Some(storm),
                None => self.fetch_storm_detail(&summary.uuid).await,
            };
            match storm {
                Some(mut storm) => {
                    if storm.category.is_empty() {
                        storm.category = summary.kind.clone();
                    }
                    if storm.date_range.is_none() {
                        storm.date_range = summary.date_range.clone();
                    }
                    storms.push(storm);
                }
                None => self
                    .logger
                    .warn(&format!("dropping storm {} without detail", summary.uuid)),
            }
        }
        DashboardBundle::new(storms, grounds_from_response(response), response.latest_year)
    }

    pub async fn fetch_storm_detail(&self, id: &str) -> Option<StormRecord> {
        let detail = self
            .retrier
            .run("typhoon_data", || self.bridge.get_typhoon_data(id))
            .await
            .flatten()?;
        Some(storm_from_detail(&detail))
    }

    /// Historical: the years with data, newest first. Nowcast: the dates of
    /// `storm`, oldest first.
    pub async fn fetch_available_scopes(&self, mode: Mode, storm: Option<&str>) -> Vec<Scope> {
        match mode {
            Mode::Historical => {
                let mut years = self
                    .retrier
                    .run("available_years", || self.bridge.get_available_years())
                    .await
                    .unwrap_or_default();
                years.sort_unstable_by(|a, b| b.cmp(a));
                years.dedup();
                years.into_iter().map(Scope::Year).collect()
            }
            Mode::Nowcast => {
                let Some(id) = storm else {
                    return Vec::new();
                };
                let mut dates: Vec<_> = self
                    .retrier
                    .run("typhoon_dates", || self.bridge.get_typhoon_dates(id))
                    .await
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|text| parse_date(text))
                    .collect();
                dates.sort_unstable();
                dates.dedup();
                dates.into_iter().map(Scope::Date).collect()
            }
        }
    }

    pub async fn fetch_boat_detections(
        &self,
        year: i32,
        max_count: usize,
    ) -> Vec<BoatDetectionPoint> {
        self.retrier
            .run("boat_detections", || {
                self.bridge.get_boat_detections_geojson(year, max_count)
            })
            .await
            .flatten()
            .map(|collection| detections_from_geojson(&collection, max_count))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::{self, FakeBridge};
    use chrono::NaiveDate;
    use std::time::Duration;
    use tokio::time::Instant;

    fn gateway(bridge: FakeBridge) -> RemoteDataGateway<Arc<FakeBridge>> {
        RemoteDataGateway::new(
            Arc::new(bridge),
            RetryPolicy::default(),
            Arc::new(MetricsRecorder::new()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn historical_bundle_is_fetched_by_year() {
        let gw = gateway(FakeBridge::new().with_year(2023, fake::historical_payload(2023)));
        let bundle = gw
            .fetch_dashboard_bundle(Mode::Historical, Some(&Scope::Year(2023)))
            .await;
        assert_eq!(bundle.storms.len(), 3);
        assert_eq!(bundle.ground_count(), 5);
        assert_eq!(gw.bridge().call_count("get_dashboard_data_by_year"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_dashboard_yields_empty_bundle() {
        let bridge = FakeBridge::new().with_year(2023, fake::historical_payload(2023));
        bridge.set_down(true);
        let gw = gateway(bridge);
        let started = Instant::now();

        let bundle = gw
            .fetch_dashboard_bundle(Mode::Historical, Some(&Scope::Year(2023)))
            .await;

        assert!(bundle.is_empty());
        assert_eq!(gw.bridge().call_count("get_dashboard_data_by_year"), 5);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
        assert_eq!(gw.recorder().snapshot().exhausted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn nowcast_bundle_joins_storm_details() {
        let gw = gateway(fake::nowcast_bridge());
        let bundle = gw.fetch_dashboard_bundle(Mode::Nowcast, None).await;

        assert_eq!(bundle.storms.len(), 2);
        assert_eq!(gw.bridge().call_count("get_typhoon_data"), 2);
        let first = &bundle.storms[0];
        assert_eq!(first.id, "u-1");
        assert_eq!(first.dates().len(), 2);
        assert_eq!(bundle.fishing_grounds[0].name, "Ground 3");
        assert_eq!(first.summary.ground_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn years_are_newest_first_and_dates_oldest_first() {
        let gw = gateway(fake::nowcast_bridge().with_years(vec![2021, 2024, 2023, 2024]));
        assert_eq!(
            gw.fetch_available_scopes(Mode::Historical, None).await,
            vec![Scope::Year(2024), Scope::Year(2023), Scope::Year(2021)]
        );
        let dates = gw.fetch_available_scopes(Mode::Nowcast, Some("u-1")).await;
        assert_eq!(
            dates.first(),
            Some(&Scope::Date(NaiveDate::from_ymd_opt(2025, 7, 23).unwrap()))
        );
        assert!(gw.fetch_available_scopes(Mode::Nowcast, None).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn detections_survive_one_transient_failure() {
        let bridge = FakeBridge::new().with_detections(2023, fake::detection_collection(12));
        bridge.fail_next(1);
        let gw = gateway(bridge);

        let points = gw.fetch_boat_detections(2023, 5).await;
        assert_eq!(points.len(), 5);
        assert_eq!(gw.bridge().call_count("get_boat_detections_geojson"), 2);
    }
}
