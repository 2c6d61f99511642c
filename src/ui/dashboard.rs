// Dashboard screen: rows of sparkline widgets

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
};
use std::collections::HashMap;

use crate::config::{Config, RowConfig, Widget, WidgetId};
use crate::ui::chart::SparklineGroup;

pub struct Dashboard;

impl Dashboard {
    /// Draw every configured row. Rows stack vertically, each as tall
    /// as its tallest widget box; widgets split the row on a 12-column
    /// grid by their span.
    pub fn render(
        frame: &mut Frame,
        config: &Config,
        charts: &HashMap<WidgetId, SparklineGroup>,
    ) {
        let area = frame.area();

        let constraints: Vec<Constraint> = config
            .rows
            .iter()
            .map(|row| Constraint::Length(Self::row_height(row)))
            .chain(std::iter::once(Constraint::Min(0)))
            .collect();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        for (row, chunk) in config.rows.iter().zip(chunks.iter()) {
            Self::render_row(frame, *chunk, row, charts);
        }
    }

    fn render_row(
        frame: &mut Frame,
        area: ratatui::layout::Rect,
        row: &RowConfig,
        charts: &HashMap<WidgetId, SparklineGroup>,
    ) {
        let constraints: Vec<Constraint> = row
            .widgets
            .iter()
            .map(|w| Constraint::Ratio(w.span as u32, 12))
            .collect();
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(area);

        for (widget, column) in row.widgets.iter().zip(columns.iter()) {
            if let Some(chart) = charts.get(&widget.id) {
                chart.render(frame, *column, &widget.title);
            }
        }
    }

    fn row_height(row: &RowConfig) -> u16 {
        row.widgets.iter().map(Widget::box_height).max().unwrap_or(0)
    }
}
