use crate::model::{FishingGround, PeriodMetrics, StormRecord};
use crate::prelude::Scope;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Everything the dashboard needs for one scope. Storms keep the order the
/// bridge returned them in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardBundle {
    pub storms: Vec<StormRecord>,
    pub fishing_grounds: Vec<FishingGround>,
    pub latest_year: Option<i32>,
}

impl DashboardBundle {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a bundle and enforces the dataset invariants: unique storm ids,
    /// chronological tracks, and per-ground arrays aligned to the ground list.
    pub fn new(
        storms: Vec<StormRecord>,
        fishing_grounds: Vec<FishingGround>,
        latest_year: Option<i32>,
    ) -> Self {
        let mut bundle = Self {
            storms,
            fishing_grounds,
            latest_year,
        };
        bundle.normalize();
        bundle
    }

    pub fn is_empty(&self) -> bool {
        self.storms.is_empty()
    }

    pub fn storm(&self, id: &str) -> Option<&StormRecord> {
        self.storms.iter().find(|storm| storm.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.storm(id).is_some()
    }

    pub fn first_storm_id(&self) -> Option<&str> {
        self.storms.first().map(|storm| storm.id.as_str())
    }

    /// Storms that have data under `scope`, in dataset order, each with its
    /// metrics for that scope.
    pub fn scoped<'a>(
        &'a self,
        scope: Option<&'a Scope>,
    ) -> impl Iterator<Item = (&'a StormRecord, &'a PeriodMetrics)> + 'a {
        self.storms
            .iter()
            .filter_map(move |storm| storm.scoped_metrics(scope).map(|metrics| (storm, metrics)))
    }

    pub fn ground_count(&self) -> usize {
        self.fishing_grounds.len()
    }

    pub fn ground_name(&self, index: usize) -> String {
        self.fishing_grounds
            .get(index)
            .map(|ground| ground.name.clone())
            .unwrap_or_else(|| format!("Ground {}", index))
    }

    fn normalize(&mut self) {
        let mut seen = HashSet::new();
        self.storms.retain(|storm| {
            let fresh = seen.insert(storm.id.clone());
            if !fresh {
                warn!("dropping duplicate storm id {}", storm.id);
            }
            fresh
        });

        if self.fishing_grounds.is_empty() {
            let widest = self
                .storms
                .iter()
                .flat_map(|storm| {
                    std::iter::once(&storm.summary)
                        .chain(storm.daily.values())
                        .map(|metrics| metrics.ground_count())
                })
                .max()
                .unwrap_or(0);
            self.fishing_grounds = (0..widest).map(FishingGround::synthesized).collect();
        }
        for (index, ground) in self.fishing_grounds.iter_mut().enumerate() {
            ground.index = index;
        }

        let grounds = self.fishing_grounds.len();
        for storm in &mut self.storms {
            storm.align_to(grounds);
            storm.sort_track();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let bundle = DashboardBundle::new(
            vec![
                StormRecord::new("a", "First"),
                StormRecord::new("b", "Second"),
                StormRecord::new("a", "Shadow"),
            ],
            Vec::new(),
            None,
        );
        assert_eq!(bundle.storms.len(), 2);
        assert_eq!(bundle.storm("a").unwrap().name, "First");
    }

    #[test]
    fn grounds_are_synthesized_from_widest_series() {
        let mut storm = StormRecord::new("a", "Only");
        storm.summary = PeriodMetrics {
            distances: vec![5.0, 6.0, 7.0],
            baseline: vec![1.0],
            ..Default::default()
        };
        let bundle = DashboardBundle::new(vec![storm], Vec::new(), Some(2023));
        assert_eq!(bundle.ground_count(), 3);
        assert_eq!(bundle.ground_name(2), "Ground 2");
        assert_eq!(bundle.storms[0].summary.baseline, vec![1.0, 0.0, 0.0]);
    }
}
