//! Chart widgets for the dashboard views.

use crate::analytics::{
    format_coefficient, format_currency, CityStat, CorrelationMatrix, DailyTotal, MATRIX_LABELS,
};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Bar, BarChart, BarGroup, Block, Chart, Dataset, GraphType, Paragraph, Widget},
};

/// Gap between bars, in cells.
const BAR_GAP: u16 = 1;

/// Widest a bar is drawn, in cells.
const MAX_BAR_WIDTH: u16 = 12;

pub const CORRELATION_METRIC: &str = "Correlation between Number of Users and Total Purchases";

/// Upper axis bound leaving headroom above the largest value.
fn axis_max(max: f64) -> f64 {
    if max <= 0.0 {
        1.0
    } else {
        (max * 1.1).ceil()
    }
}

fn axis_labels(max: f64) -> Vec<Span<'static>> {
    vec![
        Span::raw("0"),
        Span::raw(format!("{:.0}", max / 2.0)),
        Span::raw(format!("{max:.0}")),
    ]
}

/// Bar width that fits `count` bars into `area`.
fn bar_width(area: Rect, count: usize) -> u16 {
    if count == 0 {
        return 1;
    }
    let inner = area.width.saturating_sub(2);
    ((inner + BAR_GAP) / count as u16)
        .saturating_sub(BAR_GAP)
        .clamp(1, MAX_BAR_WIDTH)
}

/// Scatter of users (x) against purchases (y), one point per city.
pub struct CityScatter<'a> {
    cities: &'a [CityStat],
}

impl<'a> CityScatter<'a> {
    pub fn new(cities: &'a [CityStat]) -> Self {
        Self { cities }
    }
}

impl Widget for CityScatter<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let points: Vec<(f64, f64)> = self
            .cities
            .iter()
            .map(|c| (c.number_of_users as f64, c.number_of_purchases as f64))
            .collect();
        let x_max = axis_max(points.iter().map(|p| p.0).fold(0.0, f64::max));
        let y_max = axis_max(points.iter().map(|p| p.1).fold(0.0, f64::max));

        let dataset = Dataset::default()
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Cyan))
            .data(&points);

        Chart::new(vec![dataset])
            .block(Block::bordered().title(" Users vs Purchases by City "))
            .x_axis(
                Axis::default()
                    .title("Number of Users")
                    .style(Style::default().fg(Color::Gray))
                    .bounds([0.0, x_max])
                    .labels(axis_labels(x_max)),
            )
            .y_axis(
                Axis::default()
                    .title("Number of Purchases")
                    .style(Style::default().fg(Color::Gray))
                    .bounds([0.0, y_max])
                    .labels(axis_labels(y_max)),
            )
            .render(area, buf);
    }
}

/// Bar chart of the top cities by number of users.
pub struct TopCitiesChart<'a> {
    cities: &'a [CityStat],
    top_n: u32,
}

impl<'a> TopCitiesChart<'a> {
    pub fn new(cities: &'a [CityStat], top_n: u32) -> Self {
        Self { cities, top_n }
    }

    pub fn title(&self) -> String {
        format!(" Top {} Cities by Number of Users ", self.top_n)
    }
}

impl Widget for TopCitiesChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bars: Vec<Bar> = self
            .cities
            .iter()
            .map(|c| {
                Bar::default()
                    .value(c.number_of_users)
                    .label(Line::from(c.city.clone()))
                    .text_value(c.number_of_users.to_string())
            })
            .collect();

        BarChart::default()
            .block(Block::bordered().title(self.title()))
            .data(BarGroup::default().bars(&bars))
            .bar_width(bar_width(area, bars.len()))
            .bar_gap(BAR_GAP)
            .bar_style(Style::default().fg(Color::Cyan))
            .value_style(
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .render(area, buf);
    }
}

/// Bar chart of one user's purchase amount per day.
pub struct DailyAmountChart<'a> {
    user_name: &'a str,
    totals: &'a [DailyTotal],
}

impl<'a> DailyAmountChart<'a> {
    pub fn new(user_name: &'a str, totals: &'a [DailyTotal]) -> Self {
        Self { user_name, totals }
    }
}

impl Widget for DailyAmountChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Bars take integer heights, so amounts are charted in cents.
        let bars: Vec<Bar> = self
            .totals
            .iter()
            .map(|t| {
                Bar::default()
                    .value((t.amount.max(0.0) * 100.0).round() as u64)
                    .label(Line::from(t.date.format("%m-%d").to_string()))
                    .text_value(format_currency(t.amount))
            })
            .collect();

        BarChart::default()
            .block(Block::bordered().title(format!(" Daily Purchase Amounts for {} ", self.user_name)))
            .data(BarGroup::default().bars(&bars))
            .bar_width(bar_width(area, bars.len()))
            .bar_gap(BAR_GAP)
            .bar_style(Style::default().fg(Color::Green))
            .value_style(
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
            .render(area, buf);
    }
}

/// The 2x2 correlation matrix and the headline coefficient.
pub struct CorrelationGrid<'a> {
    matrix: &'a CorrelationMatrix,
}

impl<'a> CorrelationGrid<'a> {
    pub fn new(matrix: &'a CorrelationMatrix) -> Self {
        Self { matrix }
    }

    fn cell_style(value: Option<f64>) -> Style {
        match value {
            Some(v) if v >= 0.7 => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            Some(v) if v <= -0.7 => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            Some(_) => Style::default().fg(Color::Yellow),
            None => Style::default().fg(Color::DarkGray),
        }
    }

    pub fn lines(&self) -> Vec<Line<'static>> {
        let label_width = MATRIX_LABELS.iter().map(|l| l.len()).max().unwrap_or(0);
        let cell_width = label_width;

        let mut header = vec![Span::raw(" ".repeat(label_width + 2))];
        for label in MATRIX_LABELS {
            header.push(Span::styled(
                format!("{label:>cell_width$}  "),
                Style::default().fg(Color::Cyan),
            ));
        }

        let mut lines = vec![Line::from(header)];
        for (row_label, row) in MATRIX_LABELS.iter().zip(self.matrix.values) {
            let mut spans = vec![Span::styled(
                format!("{row_label:<label_width$}  "),
                Style::default().fg(Color::Cyan),
            )];
            for value in row {
                spans.push(Span::styled(
                    format!("{:>cell_width$}  ", format_coefficient(value)),
                    Self::cell_style(value),
                ));
            }
            lines.push(Line::from(spans));
        }

        lines.push(Line::default());
        lines.push(Line::from(vec![
            Span::styled(
                format!("{CORRELATION_METRIC}: "),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format_coefficient(self.matrix.coefficient()),
                Self::cell_style(self.matrix.coefficient()),
            ),
        ]));
        lines
    }
}

impl Widget for CorrelationGrid<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.lines())
            .block(Block::bordered().title(" Correlation Matrix "))
            .render(area, buf);
    }
}
