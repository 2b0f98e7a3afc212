//! Year, storm, date and country selectors kept consistent with the store.

use crate::analysis::request::country_code;
use crate::config::YearSource;
use crate::context::{ContextSnapshot, ContextStore, LoadOutcome, LoadTicket};
use crate::gateway::{BridgeApi, RemoteDataGateway};
use crate::prelude::{EngineError, EngineResult, Mode, Scope, StormId};
use crate::telemetry::LogManager;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StormOption {
    pub id: StormId,
    pub label: String,
}

/// Options and current values of every selector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectorView {
    pub years: Vec<i32>,
    pub storms: Vec<StormOption>,
    pub dates: Vec<NaiveDate>,
    pub selected_storm: Option<StormId>,
    pub selected_scope: Option<Scope>,
    pub country: Option<String>,
    pub loading: bool,
}

/// A scope load that has been ticketed by the store but not fetched yet.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub mode: Mode,
    pub max_detections: usize,
}

impl LoadRequest {
    /// Fetches the bundle and boat detections for the ticketed scope. The
    /// outcome still has to be committed to the store.
    pub async fn execute<B: BridgeApi>(self, gateway: &RemoteDataGateway<B>) -> LoadOutcome {
        let bundle = gateway
            .fetch_dashboard_bundle(self.mode, self.ticket.scope.as_ref())
            .await;
        let year = self
            .ticket
            .scope
            .map(|scope| scope.year())
            .or(bundle.latest_year)
            .or_else(|| bundle.storms.iter().find_map(|storm| storm.year));
        let detections = match year {
            Some(year) if !bundle.is_empty() => {
                gateway.fetch_boat_detections(year, self.max_detections).await
            }
            _ => Vec::new(),
        };
        LoadOutcome {
            ticket: self.ticket,
            bundle,
            detections,
        }
    }
}

pub struct SelectorController {
    mode: Mode,
    year_source: YearSource,
    backend_years: Vec<i32>,
    current_year: i32,
    max_detections: usize,
    logger: LogManager,
}

impl SelectorController {
    pub fn new(mode: Mode, year_source: YearSource, max_detections: usize) -> Self {
        Self {
            mode,
            year_source,
            backend_years: Vec::new(),
            current_year: chrono::Local::now().year(),
            max_detections,
            logger: LogManager::new("selector"),
        }
    }

    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Records the scopes reported by the backend; only years are kept.
    pub fn set_available_scopes(&mut self, scopes: &[Scope]) {
        self.backend_years = scopes
            .iter()
            .filter_map(|scope| match scope {
                Scope::Year(year) => Some(*year),
                Scope::Date(_) => None,
            })
            .collect();
        self.backend_years.sort_unstable_by(|a, b| b.cmp(a));
        self.backend_years.dedup();
    }

    /// Year options, newest first.
    pub fn year_options(&self) -> Vec<i32> {
        match self.year_source {
            YearSource::Backend => self.backend_years.clone(),
            YearSource::Enumerated { start_year } => {
                (start_year..=self.current_year).rev().collect()
            }
        }
    }

    pub fn default_year(&self) -> Option<i32> {
        self.year_options().first().copied()
    }

    pub fn storm_options(snapshot: &ContextSnapshot) -> Vec<StormOption> {
        snapshot
            .dataset
            .storms
            .iter()
            .map(|storm| StormOption {
                id: storm.id.clone(),
                label: storm.name.clone(),
            })
            .collect()
    }

    /// Dates of the selected storm, oldest first.
    pub fn date_options(snapshot: &ContextSnapshot) -> Vec<NaiveDate> {
        snapshot
            .selection
            .storm
            .as_deref()
            .and_then(|id| snapshot.dataset.storm(id))
            .map(|storm| storm.dates())
            .unwrap_or_default()
    }

    pub fn view(&self, snapshot: &ContextSnapshot) -> SelectorView {
        SelectorView {
            years: match self.mode {
                Mode::Historical => self.year_options(),
                Mode::Nowcast => Vec::new(),
            },
            storms: Self::storm_options(snapshot),
            dates: match self.mode {
                Mode::Historical => Vec::new(),
                Mode::Nowcast => Self::date_options(snapshot),
            },
            selected_storm: snapshot.selection.storm.clone(),
            selected_scope: snapshot.selection.scope,
            country: snapshot.selection.country.clone(),
            loading: snapshot.loading.is_some(),
        }
    }

    /// First load of the dashboard: the default year in historical mode, the
    /// full active-storm list in nowcast mode.
    pub fn initial_load(&self, store: &mut ContextStore) -> LoadRequest {
        let scope = match self.mode {
            Mode::Historical => self.default_year().map(Scope::Year),
            Mode::Nowcast => None,
        };
        self.ticket(store, scope)
    }

    /// Fills in a nowcast date after a load that had none, or that the
    /// selected storm has no data for. Returns whether the selection changed.
    pub fn apply_defaults(&self, store: &mut ContextStore) -> bool {
        if self.mode != Mode::Nowcast {
            return false;
        }
        let snapshot = store.current();
        let dates = Self::date_options(&snapshot);
        match (snapshot.selection.scope, dates.first()) {
            (Some(Scope::Date(date)), _) if dates.contains(&date) => false,
            (_, Some(first)) => store.set_selected_scope(Scope::Date(*first)).is_ok(),
            (_, None) => false,
        }
    }

    /// Changes the selected storm; never reloads. In nowcast mode a selected
    /// date the new storm has no data for falls back to the storm's first
    /// date, which is already in the dataset.
    pub fn select_storm(&self, store: &mut ContextStore, id: &str) -> EngineResult<()> {
        store.set_selected_entity(id)?;
        if self.mode != Mode::Nowcast {
            return Ok(());
        }
        let snapshot = store.current();
        let dates = Self::date_options(&snapshot);
        let Some(first) = dates.first().copied() else {
            return Ok(());
        };
        match snapshot.selection.scope {
            Some(Scope::Date(date)) if dates.contains(&date) => Ok(()),
            Some(_) => {
                self.logger.record(&format!(
                    "storm {} has no data for the selected date, showing {}",
                    id, first
                ));
                store.set_selected_scope(Scope::Date(first))
            }
            None => store.set_selected_scope(Scope::Date(first)),
        }
    }

    /// Changes the scope; always results in a load.
    pub fn select_scope(&self, store: &mut ContextStore, scope: Scope) -> EngineResult<LoadRequest> {
        match (self.mode, scope) {
            (Mode::Historical, Scope::Year(_)) | (Mode::Nowcast, Scope::Date(_)) => {
                Ok(self.ticket(store, Some(scope)))
            }
            _ => Err(EngineError::InvalidInput(format!(
                "scope {} does not apply to {} mode",
                scope, self.mode
            ))),
        }
    }

    /// Accepts a country display name ("Philippines") or code ("phl").
    pub fn select_country(&self, store: &mut ContextStore, country: &str) -> EngineResult<()> {
        let code = country_code(country)?;
        store.set_country(code)
    }

    fn ticket(&self, store: &mut ContextStore, scope: Option<Scope>) -> LoadRequest {
        LoadRequest {
            ticket: store.begin_load(scope),
            mode: self.mode,
            max_detections: self.max_detections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::context::CommitStatus;
    use crate::gateway::fake;
    use crate::telemetry::MetricsRecorder;
    use std::sync::Arc;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, day).unwrap()
    }

    #[test]
    fn enumerated_years_are_descending() {
        let selector = SelectorController::new(
            Mode::Historical,
            YearSource::Enumerated { start_year: 2012 },
            5000,
        )
        .with_current_year(2015);
        assert_eq!(selector.year_options(), vec![2015, 2014, 2013, 2012]);
        assert_eq!(selector.default_year(), Some(2015));
    }

    #[test]
    fn backend_years_are_sorted_and_deduplicated() {
        let mut selector = SelectorController::new(Mode::Historical, YearSource::Backend, 5000);
        selector.set_available_scopes(&[Scope::Year(2021), Scope::Year(2024), Scope::Year(2021)]);
        assert_eq!(selector.year_options(), vec![2024, 2021]);
    }

    #[test]
    fn historical_storm_selection_never_loads() {
        let selector = SelectorController::new(Mode::Historical, YearSource::Backend, 5000);
        let mut store = ContextStore::new(Mode::Historical, Arc::new(MetricsRecorder::new()));
        store.set_dataset(crate::wire::convert::bundle_from_historical(
            &fake::historical_payload(2023),
        ));
        selector.select_storm(&mut store, "TRAMI").unwrap();
        assert!(selector.select_storm(&mut store, "nope").is_err());
        assert_eq!(store.current().selection.storm.as_deref(), Some("TRAMI"));
    }

    #[test]
    fn mismatched_scope_kind_is_rejected() {
        let selector = SelectorController::new(Mode::Historical, YearSource::Backend, 5000);
        let mut store = ContextStore::new(Mode::Historical, Arc::new(MetricsRecorder::new()));
        assert!(selector.select_scope(&mut store, Scope::Date(date(23))).is_err());
        assert!(selector.select_country(&mut store, "Atlantis").is_err());
        selector.select_country(&mut store, "Philippines").unwrap();
        assert_eq!(store.current().selection.country.as_deref(), Some("phl"));
    }

    #[tokio::test(start_paused = true)]
    async fn nowcast_storm_without_selected_date_falls_back_locally() {
        let bridge = Arc::new(fake::nowcast_bridge());
        let gateway = RemoteDataGateway::new(
            bridge.clone(),
            RetryPolicy::default(),
            Arc::new(MetricsRecorder::new()),
        );
        let selector = SelectorController::new(Mode::Nowcast, YearSource::Backend, 100);
        let mut store = ContextStore::new(Mode::Nowcast, Arc::new(MetricsRecorder::new()));

        let outcome = selector.initial_load(&mut store).execute(&gateway).await;
        assert_eq!(store.commit(outcome), CommitStatus::Committed);
        assert!(selector.apply_defaults(&mut store));
        assert_eq!(store.current().selection.scope, Some(Scope::Date(date(23))));
        assert_eq!(
            SelectorController::date_options(&store.current()),
            vec![date(23), date(24)]
        );

        let calls = bridge.total_calls();
        let generation = store.current().generation;
        selector.select_storm(&mut store, "u-2").unwrap();
        let snapshot = store.current();
        assert_eq!(snapshot.selection.storm.as_deref(), Some("u-2"));
        assert_eq!(snapshot.selection.scope, Some(Scope::Date(date(25))));
        assert_eq!(snapshot.loading, None);
        assert_eq!(snapshot.generation, generation);
        assert_eq!(bridge.total_calls(), calls);
    }
}
