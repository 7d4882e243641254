//! Purchase details table widget.
//!
//! Renders a `DetailTable` with box-drawing borders, auto-sized columns,
//! right-aligned currency cells and vertical scrolling.

use crate::analytics::{ColumnKind, DetailTable};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// Maximum width for any column.
const MAX_COLUMN_WIDTH: usize = 32;

/// Minimum width for any column.
const MIN_COLUMN_WIDTH: usize = 4;

/// Border, header and separator lines above the rows, plus the bottom border
/// and footer below.
const CHROME_LINES: usize = 5;

fn width_of(s: &str) -> usize {
    s.chars().count()
}

/// Widget for rendering the detailed purchase information.
pub struct DetailTableView<'a> {
    table: &'a DetailTable,
    scroll: usize,
}

impl<'a> DetailTableView<'a> {
    pub fn new(table: &'a DetailTable, scroll: usize) -> Self {
        Self { table, scroll }
    }

    /// Calculates the optimal width for each column.
    fn calculate_column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self
            .table
            .columns
            .iter()
            .map(|col| width_of(&col.title).max(MIN_COLUMN_WIDTH))
            .collect();

        for row in &self.table.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(width_of(cell));
            }
        }

        widths.iter().map(|&w| w.min(MAX_COLUMN_WIDTH)).collect()
    }

    /// Truncates a string to fit within the given width, adding ellipsis if needed.
    fn truncate(s: &str, max_width: usize) -> String {
        if width_of(s) <= max_width {
            s.to_string()
        } else if max_width <= 3 {
            s.chars().take(max_width).collect()
        } else {
            let head: String = s.chars().take(max_width - 3).collect();
            format!("{head}...")
        }
    }

    /// Shrinks columns proportionally until the table fits `available_width`.
    fn fit_widths(widths: &[usize], available_width: usize) -> Vec<usize> {
        let total: usize = widths.iter().sum::<usize>() + widths.len() * 3 + 1;
        if total <= available_width || available_width == 0 {
            return widths.to_vec();
        }
        let scale = available_width as f64 / total as f64;
        widths
            .iter()
            .map(|&w| ((w as f64 * scale) as usize).max(MIN_COLUMN_WIDTH))
            .collect()
    }

    /// Renders the table to lines, showing at most `max_rows` data rows.
    pub fn render_to_lines(&self, available_width: usize, max_rows: usize) -> Vec<Line<'a>> {
        if self.table.columns.is_empty() {
            return vec![Line::from(Span::styled(
                "(no purchases)",
                Style::default().fg(Color::DarkGray),
            ))];
        }

        let widths = Self::fit_widths(&self.calculate_column_widths(), available_width);
        let total_rows = self.table.rows.len();
        let first = self.scroll.min(total_rows.saturating_sub(1));
        let last = (first + max_rows).min(total_rows);

        let mut lines = vec![
            Self::render_border(&widths, '┌', '┬', '┐'),
            self.render_header_row(&widths),
            Self::render_border(&widths, '├', '┼', '┤'),
        ];
        for row in &self.table.rows[first..last] {
            lines.push(self.render_data_row(row, &widths));
        }
        lines.push(Self::render_border(&widths, '└', '┴', '┘'));

        let footer = if last - first < total_rows {
            format!(
                "Rows {}-{} of {} (↑/↓ to scroll)",
                first + 1,
                last,
                total_rows
            )
        } else {
            format!(
                "{} row{}",
                total_rows,
                if total_rows == 1 { "" } else { "s" }
            )
        };
        lines.push(Line::from(Span::styled(
            footer,
            Style::default().fg(Color::DarkGray),
        )));

        lines
    }

    fn render_border(widths: &[usize], left: char, mid: char, right: char) -> Line<'a> {
        let inner: Vec<String> = widths.iter().map(|&w| "─".repeat(w + 2)).collect();
        let border = format!("{left}{}{right}", inner.join(&mid.to_string()));
        Line::from(Span::styled(border, Style::default().fg(Color::DarkGray)))
    }

    fn render_header_row(&self, widths: &[usize]) -> Line<'a> {
        let mut spans = vec![Span::styled("│", Style::default().fg(Color::DarkGray))];

        for (col, &width) in self.table.columns.iter().zip(widths) {
            let name = Self::truncate(&col.title, width);
            spans.push(Span::styled(
                format!(" {name:width$} "),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
        }

        Line::from(spans)
    }

    fn render_data_row(&self, row: &[String], widths: &[usize]) -> Line<'a> {
        let mut spans = vec![Span::styled("│", Style::default().fg(Color::DarkGray))];

        for ((col, &width), cell) in self.table.columns.iter().zip(widths).zip(row) {
            let text = Self::truncate(cell, width);
            let (padded, style) = match col.kind {
                ColumnKind::Currency => (
                    format!(" {text:>width$} "),
                    Style::default().fg(Color::Green),
                ),
                ColumnKind::Date => (format!(" {text:width$} "), Style::default().fg(Color::Yellow)),
                ColumnKind::Text if cell.is_empty() => (
                    format!(" {:width$} ", "-"),
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                ),
                ColumnKind::Text => (format!(" {text:width$} "), Style::default()),
            };
            spans.push(Span::styled(padded, style));
            spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
        }

        Line::from(spans)
    }
}

impl Widget for DetailTableView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let max_rows = (area.height as usize).saturating_sub(CHROME_LINES).max(1);
        let lines = self.render_to_lines(area.width as usize, max_rows);

        for (i, line) in lines.iter().enumerate().take(area.height as usize) {
            buf.set_line(area.x, area.y + i as u16, line, area.width);
        }
    }
}
