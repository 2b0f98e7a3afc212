use crate::derived::RankedStorm;
use crate::prelude::ViewSynchronizer;
use crate::views::RenderContext;
use serde::Serialize;

/// Headline card of the selected storm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StormCard {
    pub name: String,
    pub category: String,
    pub date_range: String,
    pub avg_speed: String,
    pub max_speed: String,
    pub max_wind: String,
    pub closest_ground: String,
    pub min_distance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryCards {
    pub storm: Option<StormCard>,
    pub most_disruptive: Option<RankedStorm>,
    pub closest: Option<RankedStorm>,
    pub fastest: Option<RankedStorm>,
}

#[derive(Debug, Default)]
pub struct SummaryCardsSynchronizer;

impl ViewSynchronizer for SummaryCardsSynchronizer {
    type Output = SummaryCards;

    fn name(&self) -> &'static str {
        "summary_cards"
    }

    fn render(&mut self, context: &RenderContext<'_>) -> Self::Output {
        let storm = context.selected_storm().map(|storm| {
            let metrics = storm.metrics_for(context.scope());
            let closest = context.derived.closest_ground.as_ref();
            StormCard {
                name: storm.name.clone(),
                category: storm.category.clone(),
                date_range: storm.date_range.clone().unwrap_or_else(|| "-".into()),
                avg_speed: format!("{:.1} kt", metrics.avg_speed),
                max_speed: format!("{:.1} kt", metrics.max_speed),
                max_wind: format!("{:.1} kt", metrics.max_wind),
                closest_ground: closest
                    .map(|ground| ground.name.clone())
                    .unwrap_or_else(|| "-".into()),
                min_distance: closest
                    .map(|ground| format!("{:.1} km", ground.distance))
                    .unwrap_or_else(|| "-".into()),
            }
        });
        SummaryCards {
            storm,
            most_disruptive: context.derived.most_disruptive.clone(),
            closest: context.derived.closest.clone(),
            fastest: context.derived.fastest.clone(),
        }
    }
}
