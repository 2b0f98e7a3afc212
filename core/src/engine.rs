//! The dashboard engine: owns the store, the selectors and every view
//! synchronizer, and turns the current context into one frame.

use crate::config::{EngineConfig, YearSource};
use crate::context::{CommitStatus, ContextStore, LoadOutcome};
use crate::derived::DerivedMetrics;
use crate::gateway::{BridgeApi, RemoteDataGateway};
use crate::prelude::{EngineResult, Mode, Scope, ViewSynchronizer};
use crate::selector::{LoadRequest, SelectorController, SelectorView};
use crate::telemetry::{LogManager, MetricsRecorder, SyncMetrics};
use crate::views::{
    DualAxisChart, DualAxisChartView, MapLayerSynchronizer, MapView, RankedChart,
    RankedChartView, RenderContext, SummaryCards, SummaryCardsSynchronizer, TableSynchronizer,
    TablesView, TrackSynchronizer, TrackView,
};
use serde::Serialize;
use std::sync::Arc;

/// Everything the front-end draws for one context, as plain data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardFrame {
    pub mode: Mode,
    pub generation: u64,
    pub notice: Option<String>,
    pub selectors: SelectorView,
    pub cards: SummaryCards,
    pub dual_axis: DualAxisChartView,
    pub ranked: RankedChartView,
    pub tables: TablesView,
    pub map: MapView,
    pub track: TrackView,
}

pub struct DashboardEngine<B: BridgeApi> {
    config: EngineConfig,
    gateway: Arc<RemoteDataGateway<B>>,
    store: ContextStore,
    selector: SelectorController,
    dual_axis: DualAxisChart,
    ranked: RankedChart,
    tables: TableSynchronizer,
    map: MapLayerSynchronizer,
    track: TrackSynchronizer,
    cards: SummaryCardsSynchronizer,
    recorder: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl<B: BridgeApi> DashboardEngine<B> {
    pub fn new(bridge: B, config: EngineConfig) -> Self {
        let recorder = Arc::new(MetricsRecorder::new());
        let gateway = RemoteDataGateway::new(bridge, config.retry, recorder.clone());
        Self {
            store: ContextStore::new(config.mode, recorder.clone()),
            selector: SelectorController::new(config.mode, config.years, config.max_boat_detections),
            gateway: Arc::new(gateway),
            dual_axis: DualAxisChart,
            ranked: RankedChart,
            tables: TableSynchronizer,
            map: MapLayerSynchronizer,
            track: TrackSynchronizer,
            cards: SummaryCardsSynchronizer,
            recorder,
            config,
            logger: LogManager::new("engine"),
        }
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared handle for running loads off the engine, e.g. in a UI task.
    pub fn gateway(&self) -> Arc<RemoteDataGateway<B>> {
        self.gateway.clone()
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    pub fn selector(&self) -> &SelectorController {
        &self.selector
    }

    pub fn metrics(&self) -> SyncMetrics {
        self.recorder.snapshot()
    }

    /// Switches the dashboard to another mode and forgets the loaded dataset.
    pub fn switch_mode(&mut self, mode: Mode) {
        self.config.mode = mode;
        self.store.reset(mode);
        self.selector = SelectorController::new(mode, self.config.years, self.config.max_boat_detections);
        self.logger.record(&format!("switched to {} mode", mode));
    }

    /// Whether the year options must be fetched before the first load.
    pub fn needs_scopes(&self) -> bool {
        self.config.mode == Mode::Historical && self.config.years == YearSource::Backend
    }

    /// Installs fetched scopes, if any, and tickets the first load.
    pub fn begin(&mut self, scopes: Option<&[Scope]>) -> LoadRequest {
        if let Some(scopes) = scopes {
            self.selector.set_available_scopes(scopes);
        }
        self.selector.initial_load(&mut self.store)
    }

    /// Enumerates the scopes (when the backend provides them) and tickets the first load.
    pub async fn prepare(&mut self) -> LoadRequest {
        if self.needs_scopes() {
            let scopes = self
                .gateway
                .fetch_available_scopes(Mode::Historical, None)
                .await;
            return self.begin(Some(&scopes));
        }
        self.begin(None)
    }

    /// Tickets a fresh load of the selected scope, e.g. after storms were
    /// added to or removed from the bridge.
    pub fn reload(&mut self) -> LoadRequest {
        match self.store.current().selection.scope {
            Some(scope) => match self.selector.select_scope(&mut self.store, scope) {
                Ok(request) => request,
                Err(_) => self.selector.initial_load(&mut self.store),
            },
            None => self.selector.initial_load(&mut self.store),
        }
    }

    /// Prepares, fetches and commits the first load.
    pub async fn initialize(&mut self) -> CommitStatus {
        let request = self.prepare().await;
        self.load(request).await
    }

    pub fn commit(&mut self, outcome: LoadOutcome) -> CommitStatus {
        let status = self.store.commit(outcome);
        if status == CommitStatus::Committed {
            self.selector.apply_defaults(&mut self.store);
        }
        status
    }

    /// Runs a load to completion and commits it.
    pub async fn load(&mut self, request: LoadRequest) -> CommitStatus {
        let outcome = request.execute(self.gateway.as_ref()).await;
        self.commit(outcome)
    }

    pub fn select_storm(&mut self, id: &str) -> EngineResult<()> {
        self.selector.select_storm(&mut self.store, id)
    }

    pub fn select_scope(&mut self, scope: Scope) -> EngineResult<LoadRequest> {
        self.selector.select_scope(&mut self.store, scope)
    }

    pub fn select_country(&mut self, country: &str) -> EngineResult<()> {
        self.selector.select_country(&mut self.store, country)
    }

    /// Shows or hides the boat detections already loaded; never fetches.
    pub fn toggle_boats(&mut self) -> bool {
        let visible = !self.store.current().boats_visible;
        self.store.set_boats_visible(visible);
        visible
    }

    pub fn render(&mut self) -> DashboardFrame {
        let snapshot = self.store.current();
        let derived = DerivedMetrics::compute(&snapshot.dataset, &snapshot.selection);
        let context =
            RenderContext::new(&snapshot, &derived).with_axis_cap(self.config.ranked_axis_cap);

        let notice = if snapshot.loading.is_some() {
            Some("Loading...".to_string())
        } else if snapshot.dataset.is_empty() {
            Some("No cyclone data available for this selection.".to_string())
        } else {
            None
        };

        DashboardFrame {
            mode: snapshot.mode,
            generation: snapshot.generation,
            notice,
            selectors: self.selector.view(&snapshot),
            cards: self.cards.render(&context),
            dual_axis: self.dual_axis.render(&context),
            ranked: self.ranked.render(&context),
            tables: self.tables.render(&context),
            map: self.map.render(&context),
            track: self.track.render(&context),
        }
    }
}
