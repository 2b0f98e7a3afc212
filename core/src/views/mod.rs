//! View synchronizers: deterministic projections of a context snapshot into
//! declarative, serializable view descriptions.

pub mod cards;
pub mod chart;
pub mod map;
pub mod table;
pub mod track;

pub use cards::{StormCard, SummaryCards, SummaryCardsSynchronizer};
pub use chart::{
    AxisBounds, BarTone, DualAxisChart, DualAxisChartView, RankedBar, RankedChart,
    RankedChartView,
};
pub use map::{GroundLayer, LayerOp, LayerShape, MapLayerRegistry, MapLayerSynchronizer, MapView};
pub use table::{TableCell, TableRow, TableSynchronizer, TableView, TablesView};
pub use track::{TrackMarker, TrackSynchronizer, TrackView};

use crate::context::ContextSnapshot;
use crate::derived::DerivedMetrics;
use crate::model::{DashboardBundle, PeriodMetrics, StormRecord};
use crate::prelude::Scope;

/// Everything a synchronizer may read during one render.
pub struct RenderContext<'a> {
    pub snapshot: &'a ContextSnapshot,
    pub derived: &'a DerivedMetrics,
    pub ranked_axis_cap: f64,
}

impl<'a> RenderContext<'a> {
    pub fn new(snapshot: &'a ContextSnapshot, derived: &'a DerivedMetrics) -> Self {
        Self {
            snapshot,
            derived,
            ranked_axis_cap: 1000.0,
        }
    }

    pub fn with_axis_cap(mut self, cap: f64) -> Self {
        self.ranked_axis_cap = cap;
        self
    }

    pub fn dataset(&self) -> &DashboardBundle {
        &self.snapshot.dataset
    }

    pub fn scope(&self) -> Option<&Scope> {
        self.snapshot.selection.scope.as_ref()
    }

    pub fn selected_storm(&self) -> Option<&StormRecord> {
        self.snapshot
            .selection
            .storm
            .as_deref()
            .and_then(|id| self.dataset().storm(id))
    }

    /// Metrics of the selected storm under the current scope.
    pub fn selected_metrics(&self) -> Option<&PeriodMetrics> {
        let scope = self.scope();
        self.selected_storm().map(|storm| storm.metrics_for(scope))
    }

    pub fn is_selected(&self, storm: &StormRecord) -> bool {
        self.snapshot.selection.storm.as_deref() == Some(storm.id.as_str())
    }

    pub fn ground_labels(&self) -> Vec<String> {
        self.dataset()
            .fishing_grounds
            .iter()
            .map(|ground| ground.name.clone())
            .collect()
    }
}
