//! Single source of truth for the dashboard: the loaded dataset and what the
//! user has selected in it.

use crate::model::{BoatDetectionPoint, DashboardBundle};
use crate::prelude::{EngineError, EngineResult, Mode, Scope, StormId};
use crate::telemetry::{LogManager, MetricsRecorder};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub storm: Option<StormId>,
    pub scope: Option<Scope>,
    pub country: Option<String>,
}

/// Immutable view of the store handed to renders. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    pub mode: Mode,
    pub dataset: Arc<DashboardBundle>,
    pub detections: Arc<Vec<BoatDetectionPoint>>,
    pub selection: Selection,
    pub boats_visible: bool,
    /// Bumped on every dataset replacement.
    pub generation: u64,
    /// Scope of the load in flight, if any.
    pub loading: Option<Scope>,
}

/// Issued when a scope load starts; only the most recent ticket of the store
/// that issued it may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    /// Identifies the issuing store; unique within the process.
    pub owner: u64,
    pub id: u64,
    pub scope: Option<Scope>,
}

/// Result of a completed scope load, waiting to be committed.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub ticket: LoadTicket,
    pub bundle: DashboardBundle,
    pub detections: Vec<BoatDetectionPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    Committed,
    Stale,
}

pub struct ContextStore {
    owner: u64,
    mode: Mode,
    dataset: Arc<DashboardBundle>,
    detections: Arc<Vec<BoatDetectionPoint>>,
    selection: Selection,
    boats_visible: bool,
    generation: u64,
    latest_ticket: u64,
    loading: Option<Scope>,
    recorder: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl ContextStore {
    pub fn new(mode: Mode, recorder: Arc<MetricsRecorder>) -> Self {
        Self {
            owner: NEXT_OWNER.fetch_add(1, Ordering::Relaxed),
            mode,
            dataset: Arc::new(DashboardBundle::empty()),
            detections: Arc::new(Vec::new()),
            selection: Selection::default(),
            boats_visible: false,
            generation: 0,
            latest_ticket: 0,
            loading: None,
            recorder,
            logger: LogManager::new("store"),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Replaces the dataset. The selected storm survives if the new dataset
    /// still contains it, otherwise the first storm is selected.
    pub fn set_dataset(&mut self, bundle: DashboardBundle) {
        let keep = self
            .selection
            .storm
            .as_deref()
            .map(|id| bundle.contains(id))
            .unwrap_or(false);
        if !keep {
            self.selection.storm = bundle.first_storm_id().map(str::to_string);
        }
        self.dataset = Arc::new(bundle);
        self.generation += 1;
        self.logger.record(&format!(
            "dataset generation {} with {} storms, selected {:?}",
            self.generation,
            self.dataset.storms.len(),
            self.selection.storm
        ));
    }

    pub fn set_selected_entity(&mut self, id: &str) -> EngineResult<()> {
        if !self.dataset.contains(id) {
            self.logger.warn(&format!("ignoring unknown storm {}", id));
            return Err(EngineError::UnknownStorm(id.to_string()));
        }
        self.selection.storm = Some(id.to_string());
        Ok(())
    }

    pub fn set_selected_scope(&mut self, scope: Scope) -> EngineResult<()> {
        match (self.mode, scope) {
            (Mode::Historical, Scope::Year(_)) | (Mode::Nowcast, Scope::Date(_)) => {
                self.selection.scope = Some(scope);
                Ok(())
            }
            _ => Err(EngineError::InvalidInput(format!(
                "scope {} does not apply to {} mode",
                scope, self.mode
            ))),
        }
    }

    pub fn set_country(&mut self, code: &str) -> EngineResult<()> {
        let code = code.trim().to_ascii_lowercase();
        if code.is_empty() {
            return Err(EngineError::InvalidInput("empty country code".into()));
        }
        self.selection.country = Some(code);
        Ok(())
    }

    pub fn set_boats_visible(&mut self, visible: bool) {
        self.boats_visible = visible;
    }

    pub fn current(&self) -> ContextSnapshot {
        ContextSnapshot {
            mode: self.mode,
            dataset: self.dataset.clone(),
            detections: self.detections.clone(),
            selection: self.selection.clone(),
            boats_visible: self.boats_visible,
            generation: self.generation,
            loading: self.loading,
        }
    }

    pub fn begin_load(&mut self, scope: Option<Scope>) -> LoadTicket {
        self.latest_ticket += 1;
        self.loading = scope;
        LoadTicket {
            owner: self.owner,
            id: self.latest_ticket,
            scope,
        }
    }

    /// Applies a finished load unless a newer one has been started since or
    /// the ticket came from another store.
    pub fn commit(&mut self, outcome: LoadOutcome) -> CommitStatus {
        if outcome.ticket.owner != self.owner {
            self.recorder.record_discarded();
            self.logger.record(&format!(
                "discarding load {} issued by store {}",
                outcome.ticket.id, outcome.ticket.owner
            ));
            return CommitStatus::Stale;
        }
        if outcome.ticket.id != self.latest_ticket {
            self.recorder.record_discarded();
            self.logger.record(&format!(
                "discarding stale load {} (latest {})",
                outcome.ticket.id, self.latest_ticket
            ));
            return CommitStatus::Stale;
        }
        self.loading = None;
        self.set_dataset(outcome.bundle);
        self.detections = Arc::new(outcome.detections);
        if let Some(scope) = outcome.ticket.scope {
            if let Err(err) = self.set_selected_scope(scope) {
                self.logger.warn(&err.to_string());
            }
        }
        self.recorder.record_committed();
        CommitStatus::Committed
    }

    /// Drops the dataset and selection, e.g. when the dashboard switches mode.
    pub fn reset(&mut self, mode: Mode) {
        self.mode = mode;
        self.selection.storm = None;
        self.selection.scope = None;
        self.detections = Arc::new(Vec::new());
        self.loading = None;
        self.latest_ticket += 1;
        self.set_dataset(DashboardBundle::empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StormRecord;

    fn bundle(ids: &[&str]) -> DashboardBundle {
        DashboardBundle::new(
            ids.iter().map(|id| StormRecord::new(*id, *id)).collect(),
            Vec::new(),
            None,
        )
    }

    fn store() -> ContextStore {
        ContextStore::new(Mode::Historical, Arc::new(MetricsRecorder::new()))
    }

    #[test]
    fn selection_survives_reload_when_storm_remains() {
        let mut store = store();
        store.set_dataset(bundle(&["a", "b"]));
        store.set_selected_entity("b").unwrap();
        store.set_dataset(bundle(&["c", "b"]));
        assert_eq!(store.current().selection.storm.as_deref(), Some("b"));

        store.set_dataset(bundle(&["c", "d"]));
        assert_eq!(store.current().selection.storm.as_deref(), Some("c"));

        store.set_dataset(DashboardBundle::empty());
        assert_eq!(store.current().selection.storm, None);
        assert_eq!(store.current().generation, 4);
    }

    #[test]
    fn unknown_storm_is_rejected() {
        let mut store = store();
        store.set_dataset(bundle(&["a"]));
        let err = store.set_selected_entity("zzz").unwrap_err();
        assert_eq!(err, EngineError::UnknownStorm("zzz".into()));
        assert_eq!(store.current().selection.storm.as_deref(), Some("a"));
    }

    #[test]
    fn only_latest_ticket_commits() {
        let recorder = Arc::new(MetricsRecorder::new());
        let mut store = ContextStore::new(Mode::Historical, recorder.clone());
        let first = store.begin_load(Some(Scope::Year(2022)));
        let second = store.begin_load(Some(Scope::Year(2023)));

        let stale = store.commit(LoadOutcome {
            ticket: first,
            bundle: bundle(&["old"]),
            detections: Vec::new(),
        });
        assert_eq!(stale, CommitStatus::Stale);
        assert!(store.current().dataset.is_empty());
        assert_eq!(store.current().loading, Some(Scope::Year(2023)));

        let fresh = store.commit(LoadOutcome {
            ticket: second,
            bundle: bundle(&["new"]),
            detections: Vec::new(),
        });
        assert_eq!(fresh, CommitStatus::Committed);
        let snapshot = store.current();
        assert_eq!(snapshot.selection.scope, Some(Scope::Year(2023)));
        assert_eq!(snapshot.selection.storm.as_deref(), Some("new"));
        assert_eq!(snapshot.loading, None);
        assert_eq!(recorder.snapshot().loads_discarded, 1);
        assert_eq!(recorder.snapshot().loads_committed, 1);
    }

    #[test]
    fn tickets_from_another_store_never_commit() {
        let mut previous = store();
        let mut current = ContextStore::new(Mode::Nowcast, Arc::new(MetricsRecorder::new()));
        let abandoned = previous.begin_load(Some(Scope::Year(2023)));
        let ticket = current.begin_load(None);
        assert_eq!(abandoned.id, ticket.id);

        let status = current.commit(LoadOutcome {
            ticket,
            bundle: bundle(&["u-1"]),
            detections: Vec::new(),
        });
        assert_eq!(status, CommitStatus::Committed);

        let status = current.commit(LoadOutcome {
            ticket: abandoned,
            bundle: bundle(&["KONG-REY", "TRAMI"]),
            detections: Vec::new(),
        });
        assert_eq!(status, CommitStatus::Stale);
        let snapshot = current.current();
        assert_eq!(snapshot.dataset.storms.len(), 1);
        assert_eq!(snapshot.selection.storm.as_deref(), Some("u-1"));
    }

    #[test]
    fn scope_kind_must_match_mode() {
        let mut store = store();
        let date = chrono::NaiveDate::from_ymd_opt(2025, 7, 23).unwrap();
        assert!(store.set_selected_scope(Scope::Date(date)).is_err());
        assert!(store.set_selected_scope(Scope::Year(2023)).is_ok());
        assert!(store.set_country("  PHL ").is_ok());
        assert_eq!(store.current().selection.country.as_deref(), Some("phl"));
    }
}
