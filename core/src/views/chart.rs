use crate::math::stats::StatsHelper;
use crate::prelude::{StormId, ViewSynchronizer};
use crate::views::RenderContext;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisBounds {
    pub min: f64,
    pub max: f64,
}

impl AxisBounds {
    /// Symmetric bounds `±ceil(peak * 1.2)` over the magnitudes of `values`.
    pub fn symmetric<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let bound = StatsHelper::padded_bound(values.into_iter().map(f64::abs));
        Self {
            min: -bound,
            max: bound,
        }
    }
}

/// Bar color of the difference series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BarTone {
    Green,
    Red,
}

impl BarTone {
    pub fn for_value(value: f64) -> Self {
        if value >= 0.0 {
            BarTone::Green
        } else {
            BarTone::Red
        }
    }
}

/// Baseline boats (right axis) against percentage change (left axis), one
/// category per fishing ground.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DualAxisChartView {
    pub title: String,
    pub labels: Vec<String>,
    pub baseline: Vec<f64>,
    pub differences: Vec<f64>,
    pub tones: Vec<BarTone>,
    pub baseline_axis: AxisBounds,
    pub difference_axis: AxisBounds,
}

impl DualAxisChartView {
    pub fn build(
        title: impl Into<String>,
        labels: Vec<String>,
        baseline: Vec<f64>,
        differences: Vec<f64>,
    ) -> Self {
        let baseline_axis = AxisBounds::symmetric(baseline.iter().copied());
        let difference_axis = AxisBounds::symmetric(differences.iter().copied());
        let tones = differences.iter().map(|d| BarTone::for_value(*d)).collect();
        Self {
            title: title.into(),
            labels,
            baseline,
            differences,
            tones,
            baseline_axis,
            difference_axis,
        }
    }
}

#[derive(Debug, Default)]
pub struct DualAxisChart;

impl ViewSynchronizer for DualAxisChart {
    type Output = DualAxisChartView;

    fn name(&self) -> &'static str {
        "dual_axis_chart"
    }

    fn render(&mut self, context: &RenderContext<'_>) -> Self::Output {
        let Some(storm) = context.selected_storm() else {
            return DualAxisChartView::build("No storm selected", Vec::new(), Vec::new(), Vec::new());
        };
        let metrics = storm.metrics_for(context.scope());
        let title = match context.scope() {
            Some(scope) => format!("Fishing activity change: {} ({})", storm.name, scope),
            None => format!("Fishing activity change: {}", storm.name),
        };
        DualAxisChartView::build(
            title,
            context.ground_labels(),
            metrics.baseline.clone(),
            metrics.differences.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedBar {
    pub storm: StormId,
    pub label: String,
    pub value: f64,
    pub selected: bool,
}

/// Horizontal bars of average boat counts, one per storm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedChartView {
    pub bars: Vec<RankedBar>,
    pub axis_max: f64,
}

#[derive(Debug, Default)]
pub struct RankedChart;

impl ViewSynchronizer for RankedChart {
    type Output = RankedChartView;

    fn name(&self) -> &'static str {
        "ranked_chart"
    }

    fn render(&mut self, context: &RenderContext<'_>) -> Self::Output {
        let scope = context.scope();
        let bars: Vec<RankedBar> = context
            .dataset()
            .scoped(scope)
            .map(|(storm, metrics)| RankedBar {
                storm: storm.id.clone(),
                label: storm.name.clone(),
                value: metrics.average_boats,
                selected: context.is_selected(storm),
            })
            .collect();
        let cap = context.ranked_axis_cap.max(1.0);
        let axis_max = StatsHelper::padded_bound(bars.iter().map(|bar| bar.value)).min(cap);
        RankedChartView { bars, axis_max }
    }
}
