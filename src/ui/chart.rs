// Sparkline chart state and rendering

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph, Sparkline},
};

use crate::config::{Widget, WidgetColor};
use crate::dataset::Dataset;

pub fn terminal_color(color: WidgetColor) -> Color {
    match color {
        WidgetColor::Black => Color::Black,
        WidgetColor::Red => Color::Red,
        WidgetColor::Green => Color::Green,
        WidgetColor::Yellow => Color::Yellow,
        WidgetColor::Blue => Color::Blue,
        WidgetColor::Magenta => Color::Magenta,
        WidgetColor::Cyan => Color::Cyan,
        WidgetColor::White => Color::White,
    }
}

/// One visual line: a title row followed by `height` rows of sparkline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartLine {
    pub title: String,
    pub data: Vec<u64>,
    pub color: WidgetColor,
    pub height: u16,
}

/// Retained visual state for one widget, reconciled against the
/// widget's current dataset list and drawn only by the UI loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparklineGroup {
    lines: Vec<ChartLine>,
}

impl SparklineGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile against the current dataset list: drop extra lines if
    /// the list shrank, append lines with the widget's color and height
    /// if it grew, then overwrite every line's title and data from the
    /// dataset at the same index. Idempotent: reconciling twice with
    /// the same datasets changes nothing.
    pub fn reconcile(&mut self, widget: &Widget, datasets: &[Dataset]) {
        self.lines.truncate(datasets.len());

        let height = widget.height.clamp(1, u16::MAX as i64) as u16;
        while self.lines.len() < datasets.len() {
            self.lines.push(ChartLine {
                title: String::new(),
                data: Vec::new(),
                color: widget.color,
                height,
            });
        }

        for (line, dataset) in self.lines.iter_mut().zip(datasets) {
            line.title = dataset.title.clone();
            // Negative samples clamp to zero at draw resolution only;
            // the stored datasets keep their signs.
            line.data = dataset.values.iter().map(|&v| v.max(0) as u64).collect();
        }
    }

    pub fn lines(&self) -> &[ChartLine] {
        &self.lines
    }

    /// Draw the group as a bordered block titled with the widget title,
    /// stacking each line's title row and sparkline rows until the area
    /// runs out.
    pub fn render(&self, frame: &mut Frame, area: Rect, title: &str) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title.to_string());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut y = inner.y;
        for line in &self.lines {
            if y >= inner.bottom() {
                break;
            }

            let style = Style::default().fg(terminal_color(line.color));
            let title_area = Rect::new(inner.x, y, inner.width, 1);
            frame.render_widget(
                Paragraph::new(line.title.trim_end().to_string()).style(style),
                title_area,
            );
            y += 1;

            let rows = line.height.min(inner.bottom().saturating_sub(y));
            if rows == 0 {
                break;
            }
            let chart_area = Rect::new(inner.x, y, inner.width, rows);
            frame.render_widget(
                Sparkline::default()
                    .data(line.data.iter().copied())
                    .style(style),
                chart_area,
            );
            y += rows;
        }
    }
}
