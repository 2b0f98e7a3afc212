use crate::derived::closest_ground_in_text;
use crate::math::stats::StatsHelper;
use crate::prelude::{StormId, ViewSynchronizer};
use crate::views::RenderContext;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableCell {
    pub text: String,
    pub highlighted: bool,
}

impl TableCell {
    fn plain(text: String) -> Self {
        Self {
            text,
            highlighted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub storm: StormId,
    pub cells: Vec<TableCell>,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TableView {
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl TableView {
    /// Marks the highest numeric cell of every data column (the name column is skipped).
    fn highlight_column_maxima(&mut self) {
        let columns = self.headers.len();
        for column in 1..columns {
            let parsed = self.rows.iter().map(|row| {
                row.cells
                    .get(column)
                    .and_then(|cell| StatsHelper::parse_metric(&cell.text))
                    .unwrap_or(f64::NAN)
            });
            if let Some(best) = StatsHelper::arg_by(parsed, |candidate, best| candidate > best) {
                if let Some(cell) = self.rows[best].cells.get_mut(column) {
                    cell.highlighted = true;
                }
            }
        }
    }

    /// Marks the smallest distance cell of every row.
    fn highlight_row_minima(&mut self) {
        for row in &mut self.rows {
            let texts: Vec<&str> = row.cells.iter().skip(1).map(|c| c.text.as_str()).collect();
            if let Some(idx) = closest_ground_in_text(texts.as_slice()) {
                row.cells[idx + 1].highlighted = true;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablesView {
    pub speed: TableView,
    pub distance: TableView,
}

/// Speed and distance tables. Highlights are applied by re-reading the
/// rendered cell text, so they always agree with what is displayed.
#[derive(Debug, Default)]
pub struct TableSynchronizer;

impl TableSynchronizer {
    fn speed_table(context: &RenderContext<'_>) -> TableView {
        let scope = context.scope();
        let rows = context
            .dataset()
            .scoped(scope)
            .map(|(storm, metrics)| {
                TableRow {
                    storm: storm.id.clone(),
                    cells: vec![
                        TableCell::plain(storm.name.clone()),
                        TableCell::plain(format!("{:.1}", metrics.avg_speed)),
                        TableCell::plain(format!("{:.1}", metrics.max_speed)),
                    ],
                    selected: context.is_selected(storm),
                }
            })
            .collect();
        let mut table = TableView {
            headers: vec![
                "Typhoon".into(),
                "Avg speed (kt)".into(),
                "Max speed (kt)".into(),
            ],
            rows,
        };
        table.highlight_column_maxima();
        table
    }

    fn distance_table(context: &RenderContext<'_>) -> TableView {
        let scope = context.scope();
        let mut headers = vec!["Typhoon".to_string()];
        headers.extend(context.ground_labels());
        let rows = context
            .dataset()
            .scoped(scope)
            .map(|(storm, metrics)| {
                let mut cells = vec![TableCell::plain(storm.name.clone())];
                cells.extend(
                    metrics
                        .distances
                        .iter()
                        .map(|distance| TableCell::plain(format!("{:.0}", distance))),
                );
                TableRow {
                    storm: storm.id.clone(),
                    cells,
                    selected: context.is_selected(storm),
                }
            })
            .collect();
        let mut table = TableView { headers, rows };
        table.highlight_row_minima();
        table
    }
}

impl ViewSynchronizer for TableSynchronizer {
    type Output = TablesView;

    fn name(&self) -> &'static str {
        "tables"
    }

    fn render(&mut self, context: &RenderContext<'_>) -> Self::Output {
        TablesView {
            speed: Self::speed_table(context),
            distance: Self::distance_table(context),
        }
    }
}
