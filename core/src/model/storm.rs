use crate::math::stats::StatsHelper;
use crate::prelude::{Scope, StormId};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One storm-position sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    pub timestamp: NaiveDateTime,
    pub wind_speed: f64,
    pub translation_speed: f64,
}

/// Aggregated statistics for a storm within one scope.
///
/// `baseline`, `observed`, `distances` and `differences` are index-aligned to
/// the dataset's ordered ground list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PeriodMetrics {
    pub avg_speed: f64,
    pub max_speed: f64,
    pub max_wind: f64,
    pub baseline: Vec<f64>,
    pub observed: Vec<f64>,
    pub distances: Vec<f64>,
    pub differences: Vec<f64>,
    pub average_boats: f64,
}

impl PeriodMetrics {
    /// Widest per-ground array carried by this snapshot.
    pub fn ground_count(&self) -> usize {
        self.baseline
            .len()
            .max(self.observed.len())
            .max(self.distances.len())
            .max(self.differences.len())
    }

    /// Pads or truncates every per-ground array to `grounds` entries, filling
    /// gaps with zero and replacing non-finite values.
    ///
    /// A distance no snapshot reported therefore reads as 0 km and ranks as
    /// the closest ground. Zero is the documented default for missing data.
    pub fn align_to(&mut self, grounds: usize) {
        for series in [
            &mut self.baseline,
            &mut self.observed,
            &mut self.distances,
            &mut self.differences,
        ] {
            series.resize(grounds, 0.0);
            for value in series.iter_mut() {
                if !value.is_finite() {
                    *value = 0.0;
                }
            }
        }
        for scalar in [&mut self.avg_speed, &mut self.max_speed, &mut self.max_wind] {
            if !scalar.is_finite() {
                *scalar = 0.0;
            }
        }
        if !self.average_boats.is_finite() {
            self.average_boats = 0.0;
        }
    }

    /// Smallest distance from the track to any ground.
    pub fn min_distance(&self) -> Option<f64> {
        StatsHelper::min(&self.distances)
    }

    /// Mean observed boat count across grounds.
    pub fn mean_observed(&self) -> f64 {
        StatsHelper::mean(&self.observed)
    }

    /// Aggregates per-date snapshots into one summary for the whole storm.
    pub fn aggregate<'a, I>(snapshots: I) -> PeriodMetrics
    where
        I: IntoIterator<Item = &'a PeriodMetrics>,
    {
        let snapshots: Vec<&PeriodMetrics> = snapshots.into_iter().collect();
        if snapshots.is_empty() {
            return PeriodMetrics::default();
        }

        let grounds = snapshots.iter().map(|m| m.ground_count()).max().unwrap_or(0);
        let count = snapshots.len() as f64;

        let avg_speed = snapshots.iter().map(|m| m.avg_speed).sum::<f64>() / count;
        let max_speed = snapshots.iter().map(|m| m.max_speed).fold(0.0, f64::max);
        let max_wind = snapshots.iter().map(|m| m.max_wind).fold(0.0, f64::max);

        let mut baseline = vec![0.0; grounds];
        let mut observed = vec![0.0; grounds];
        let mut distances = vec![f64::INFINITY; grounds];
        for snapshot in &snapshots {
            for idx in 0..grounds {
                baseline[idx] += snapshot.baseline.get(idx).copied().unwrap_or(0.0) / count;
                observed[idx] += snapshot.observed.get(idx).copied().unwrap_or(0.0) / count;
                if let Some(distance) = snapshot.distances.get(idx) {
                    distances[idx] = distances[idx].min(*distance);
                }
            }
        }

        let differences = baseline
            .iter()
            .zip(&observed)
            .map(|(base, obs)| difference_percent(*base, *obs))
            .collect();

        let mut summary = PeriodMetrics {
            avg_speed,
            max_speed,
            max_wind,
            baseline,
            observed,
            distances,
            differences,
            average_boats: 0.0,
        };
        summary.average_boats = round_one(summary.mean_observed());
        summary.align_to(grounds);
        summary
    }
}

/// Percentage change from `baseline` to `observed`; zero when there is no baseline.
pub fn difference_percent(baseline: f64, observed: f64) -> f64 {
    if baseline == 0.0 {
        0.0
    } else {
        (observed - baseline) / baseline * 100.0
    }
}

/// Boat count implied by a baseline and a percentage difference.
pub fn observed_from_difference(baseline: f64, difference: f64) -> f64 {
    if difference == -100.0 {
        0.0
    } else {
        baseline * (1.0 + difference / 100.0)
    }
}

pub(crate) fn round_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// One cyclone event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StormRecord {
    pub id: StormId,
    pub name: String,
    pub category: String,
    pub summary: PeriodMetrics,
    #[serde(default)]
    pub daily: BTreeMap<NaiveDate, PeriodMetrics>,
    #[serde(default)]
    pub track: Vec<TrackPoint>,
    pub date_range: Option<String>,
    pub year: Option<i32>,
}

impl StormRecord {
    pub fn new(id: impl Into<StormId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: String::new(),
            summary: PeriodMetrics::default(),
            daily: BTreeMap::new(),
            track: Vec::new(),
            date_range: None,
            year: None,
        }
    }

    /// Metrics for the given scope: the per-date snapshot when one exists,
    /// otherwise the storm summary.
    pub fn metrics_for(&self, scope: Option<&Scope>) -> &PeriodMetrics {
        scope
            .and_then(Scope::date)
            .and_then(|date| self.daily.get(&date))
            .unwrap_or(&self.summary)
    }

    /// Metrics that belong to `scope`: the snapshot of a selected date, the
    /// summary otherwise. `None` when the storm has no snapshot for the date.
    pub fn scoped_metrics(&self, scope: Option<&Scope>) -> Option<&PeriodMetrics> {
        match scope.and_then(Scope::date) {
            Some(date) => self.daily.get(&date),
            None => Some(&self.summary),
        }
    }

    /// Dates with per-date metrics, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.daily.keys().copied().collect()
    }

    pub fn has_date(&self, date: NaiveDate) -> bool {
        self.daily.contains_key(&date)
    }

    /// Sorts the track chronologically; stable for equal timestamps.
    pub fn sort_track(&mut self) {
        self.track.sort_by_key(|point| point.timestamp);
    }

    pub fn align_to(&mut self, grounds: usize) {
        self.summary.align_to(grounds);
        for metrics in self.daily.values_mut() {
            metrics.align_to(grounds);
        }
    }
}
