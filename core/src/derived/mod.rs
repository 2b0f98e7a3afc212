//! Rankings and per-storm fields derived from the dataset. Pure functions,
//! recomputed for every render.

use crate::context::Selection;
use crate::math::stats::StatsHelper;
use crate::model::{DashboardBundle, PeriodMetrics, StormRecord};
use crate::prelude::{Scope, StormId};
use serde::Serialize;

/// A storm singled out by one of the rankings, with the value that ranked it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedStorm {
    pub storm: StormId,
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosestGround {
    pub index: usize,
    pub name: String,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DerivedMetrics {
    pub most_disruptive: Option<RankedStorm>,
    pub closest: Option<RankedStorm>,
    pub fastest: Option<RankedStorm>,
    pub closest_ground: Option<ClosestGround>,
}

impl DerivedMetrics {
    pub fn compute(dataset: &DashboardBundle, selection: &Selection) -> Self {
        let closest_ground = selection
            .storm
            .as_deref()
            .and_then(|id| dataset.storm(id))
            .and_then(|storm| closest_ground(dataset, storm, selection.scope.as_ref()));
        let scope = selection.scope.as_ref();
        Self {
            most_disruptive: most_disruptive(dataset, scope),
            closest: closest_storm(dataset, scope),
            fastest: fastest(dataset, scope),
            closest_ground,
        }
    }
}

fn ranked(storm: &StormRecord, value: f64) -> RankedStorm {
    RankedStorm {
        storm: storm.id.clone(),
        name: storm.name.clone(),
        value,
    }
}

/// First-wins pick over the storms that have data under `scope`, reading
/// the same per-scope metrics the charts and tables show.
fn rank_by<V, B>(
    dataset: &DashboardBundle,
    scope: Option<&Scope>,
    value: V,
    better: B,
) -> Option<RankedStorm>
where
    V: Fn(&PeriodMetrics) -> f64,
    B: Fn(f64, f64) -> bool,
{
    let candidates: Vec<(&StormRecord, f64)> = dataset
        .scoped(scope)
        .map(|(storm, metrics)| (storm, value(metrics)))
        .collect();
    let idx = StatsHelper::arg_by(candidates.iter().map(|(_, value)| *value), better)?;
    let (storm, value) = candidates[idx];
    Some(ranked(storm, value))
}

/// Storm with the lowest average boat count.
pub fn most_disruptive(dataset: &DashboardBundle, scope: Option<&Scope>) -> Option<RankedStorm> {
    rank_by(dataset, scope, |m| m.average_boats, |candidate, best| candidate < best)
}

/// Storm that passed nearest to any ground. Storms without distances are skipped.
pub fn closest_storm(dataset: &DashboardBundle, scope: Option<&Scope>) -> Option<RankedStorm> {
    rank_by(
        dataset,
        scope,
        |m| m.min_distance().unwrap_or(f64::NAN),
        |candidate, best| candidate < best,
    )
}

/// Storm with the highest maximum translation speed.
pub fn fastest(dataset: &DashboardBundle, scope: Option<&Scope>) -> Option<RankedStorm> {
    rank_by(dataset, scope, |m| m.max_speed, |candidate, best| candidate > best)
}

/// Ground nearest to `storm` under the given scope.
pub fn closest_ground(
    dataset: &DashboardBundle,
    storm: &StormRecord,
    scope: Option<&Scope>,
) -> Option<ClosestGround> {
    let distances = &storm.metrics_for(scope).distances;
    let index = StatsHelper::argmin(distances)?;
    Some(ClosestGround {
        index,
        name: dataset.ground_name(index),
        distance: distances[index],
    })
}

/// Index of the smallest numeric cell; unreadable cells are ignored.
pub fn closest_ground_in_text<S: AsRef<str>>(cells: &[S]) -> Option<usize> {
    StatsHelper::arg_by(
        cells
            .iter()
            .map(|cell| StatsHelper::parse_metric(cell.as_ref()).unwrap_or(f64::NAN)),
        |candidate, best| candidate < best,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn storm(id: &str, boats: f64, distances: Vec<f64>, max_speed: f64) -> StormRecord {
        let mut storm = StormRecord::new(id, id.to_uppercase());
        storm.summary = PeriodMetrics {
            max_speed,
            distances,
            average_boats: boats,
            ..PeriodMetrics::default()
        };
        storm
    }

    fn dataset() -> DashboardBundle {
        DashboardBundle::new(
            vec![
                storm("a", 120.0, vec![9.5, 10.2, 3.1], 26.0),
                storm("b", 80.0, vec![15.0, 22.0, 18.0], 14.0),
                storm("c", 80.0, vec![2.5, 40.0, 50.0], 26.0),
            ],
            Vec::new(),
            None,
        )
    }

    #[test]
    fn rankings_prefer_first_on_ties() {
        let data = dataset();
        assert_eq!(most_disruptive(&data, None).unwrap().storm, "b");
        assert_eq!(fastest(&data, None).unwrap().storm, "a");
        let closest = closest_storm(&data, None).unwrap();
        assert_eq!(closest.storm, "c");
        assert_eq!(closest.value, 2.5);
    }

    #[test]
    fn empty_dataset_has_no_rankings() {
        let metrics = DerivedMetrics::compute(&DashboardBundle::empty(), &Selection::default());
        assert_eq!(metrics, DerivedMetrics::default());
    }

    #[test]
    fn closest_ground_follows_selection() {
        let data = dataset();
        let selection = Selection {
            storm: Some("a".into()),
            ..Selection::default()
        };
        let metrics = DerivedMetrics::compute(&data, &selection);
        let ground = metrics.closest_ground.unwrap();
        assert_eq!(ground.index, 2);
        assert_eq!(ground.name, "Ground 2");
        assert_eq!(ground.distance, 3.1);
    }

    #[test]
    fn rankings_read_the_selected_date() {
        let day = NaiveDate::from_ymd_opt(2025, 7, 23).unwrap();
        let mut data = dataset();
        let snapshot = |boats: f64, distance: f64, max_speed: f64| PeriodMetrics {
            max_speed,
            distances: vec![distance, 60.0, 70.0],
            average_boats: boats,
            ..PeriodMetrics::default()
        };
        data.storms[0].daily.insert(day, snapshot(40.0, 30.0, 8.0));
        data.storms[1].daily.insert(day, snapshot(55.0, 12.0, 19.0));

        let scope = Scope::Date(day);
        let disruptive = most_disruptive(&data, Some(&scope)).unwrap();
        assert_eq!((disruptive.storm.as_str(), disruptive.value), ("a", 40.0));
        assert_eq!(closest_storm(&data, Some(&scope)).unwrap().storm, "b");
        assert_eq!(fastest(&data, Some(&scope)).unwrap().storm, "b");

        let other = Scope::Date(NaiveDate::from_ymd_opt(2025, 7, 30).unwrap());
        assert_eq!(most_disruptive(&data, Some(&other)), None);
    }

    #[test]
    fn unreported_distance_reads_as_closest() {
        let data = DashboardBundle::new(
            vec![
                storm("a", 10.0, vec![f64::NAN, 120.0], 20.0),
                storm("b", 10.0, vec![45.0, 80.0], 20.0),
            ],
            Vec::new(),
            None,
        );
        assert_eq!(data.storms[0].summary.distances, vec![0.0, 120.0]);
        let closest = closest_storm(&data, None).unwrap();
        assert_eq!((closest.storm.as_str(), closest.value), ("a", 0.0));
        let ground = closest_ground(&data, &data.storms[0], None).unwrap();
        assert_eq!((ground.index, ground.distance), (0, 0.0));
    }

    #[test]
    fn text_distances_are_compared_numerically() {
        assert_eq!(closest_ground_in_text(&["9.5", "10.2", "3.1"]), Some(2));
        assert_eq!(closest_ground_in_text(&["100", "20", "n/a"]), Some(1));
        assert_eq!(closest_ground_in_text::<&str>(&[]), None);
    }
}
