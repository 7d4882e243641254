//! UI rendering for the TUI.
//!
//! Defines the layout and renders all UI components.

use super::app::{App, Focus, InputState, Panel, Tab};
use super::widgets::{
    charts::{CityScatter, CorrelationGrid, DailyAmountChart, TopCitiesChart},
    header::Header,
    input::{Button, TextField},
    table::DetailTableView,
};
use crate::analytics::{format_currency, GeneralStats, UserPurchases};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph, Tabs, Wrap},
    Frame,
};

pub const EMPTY_RANGE_MESSAGE: &str = "No data available for the selected date range.";
pub const UNKNOWN_USER_MESSAGE: &str = "No purchase data found for this user ID.";

/// Renders the entire UI.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Length(1), // Tabs
            Constraint::Min(3),    // Body
            Constraint::Length(1), // Help
        ])
        .split(area);

    render_header(frame, main_layout[0], app);
    render_tabs(frame, main_layout[1], app);
    match app.tab {
        Tab::General => render_general(frame, main_layout[2], app),
        Tab::Events => render_events(frame, main_layout[2], app),
    }
    render_help(frame, main_layout[3], app);
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let widget = Header::new(
        app.connection_info.as_deref(),
        app.spinner.as_ref(),
        app.is_connected,
    );
    frame.render_widget(widget, area);
}

fn render_tabs(frame: &mut Frame, area: Rect, app: &App) {
    let titles = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, tab)| format!(" F{} {} ", i + 1, tab.title()));
    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        );
    frame.render_widget(tabs, area);
}

/// Renders a text field and places the terminal cursor in it when focused.
fn render_field(
    frame: &mut Frame,
    area: Rect,
    label: &str,
    input: &InputState,
    focused: bool,
    placeholder: Option<&str>,
) {
    let mut field = TextField::new(label, &input.text, input.cursor, focused);
    if let Some(placeholder) = placeholder {
        field = field.placeholder(placeholder);
    }
    if focused {
        frame.set_cursor_position(field.cursor_position(area));
    }
    frame.render_widget(field, area);
}

fn render_error_line(frame: &mut Frame, area: Rect, error: Option<&str>) {
    if let Some(error) = error {
        let line = Line::from(Span::styled(
            format!(" {error}"),
            Style::default().fg(Color::Red),
        ));
        frame.render_widget(Paragraph::new(line), area);
    }
}

fn render_message(frame: &mut Frame, area: Rect, text: String, style: Style) {
    let paragraph = Paragraph::new(Line::from(Span::styled(text, style)))
        .block(Block::bordered())
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

/// Renders the idle, loading and failed states shared by both tabs.
/// Returns the loaded data when there is some to draw.
fn render_panel_state<'a, T>(
    frame: &mut Frame,
    area: Rect,
    panel: &'a Panel<T>,
    idle_hint: &str,
) -> Option<&'a T> {
    match panel {
        Panel::Idle => {
            render_message(
                frame,
                area,
                idle_hint.to_string(),
                Style::default().fg(Color::DarkGray),
            );
            None
        }
        Panel::Loading => {
            render_message(
                frame,
                area,
                "Loading…".to_string(),
                Style::default().fg(Color::Yellow),
            );
            None
        }
        Panel::Failed(message) => {
            render_message(
                frame,
                area,
                format!("Error executing query: {message}"),
                Style::default().fg(Color::Red),
            );
            None
        }
        Panel::Loaded(data) => Some(data),
    }
}

fn render_general(frame: &mut Frame, area: Rect, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Controls
            Constraint::Length(1), // Validation error
            Constraint::Min(3),    // Content
        ])
        .split(area);

    let controls = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(16),
            Constraint::Length(16),
            Constraint::Length(9),
            Constraint::Min(0),
        ])
        .split(layout[0]);

    render_field(
        frame,
        controls[0],
        "Start Date",
        &app.start_date,
        app.focus == Focus::StartDate,
        Some("YYYY-MM-DD"),
    );
    render_field(
        frame,
        controls[1],
        "End Date",
        &app.end_date,
        app.focus == Focus::EndDate,
        Some("YYYY-MM-DD"),
    );
    frame.render_widget(Button::new("Run", app.focus == Focus::Run), controls[2]);

    render_error_line(frame, layout[1], app.general_error.as_deref());

    let hint = "Pick a date range and press Enter to load statistics.";
    if let Some(stats) = render_panel_state(frame, layout[2], &app.general, hint) {
        if stats.is_empty() {
            render_message(
                frame,
                layout[2],
                EMPTY_RANGE_MESSAGE.to_string(),
                Style::default().fg(Color::DarkGray),
            );
        } else {
            render_statistics(frame, layout[2], stats, app.top_cities);
        }
    }
}

fn render_statistics(frame: &mut Frame, area: Rect, stats: &GeneralStats, top_n: u32) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Min(7)])
        .split(area);

    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);
    frame.render_widget(CityScatter::new(&stats.cities), charts[0]);
    frame.render_widget(TopCitiesChart::new(&stats.cities, top_n), charts[1]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(34)])
        .split(rows[1]);
    frame.render_widget(CorrelationGrid::new(&stats.matrix), bottom[0]);

    let label = Style::default().fg(Color::Cyan);
    let totals = vec![
        Line::from(vec![
            Span::styled("Range:     ", label),
            Span::raw(stats.range.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Users:     ", label),
            Span::raw(stats.totals.number_of_users.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Purchases: ", label),
            Span::raw(stats.totals.number_of_purchases.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Cities:    ", label),
            Span::raw(stats.cities.len().to_string()),
        ]),
    ];
    frame.render_widget(
        Paragraph::new(totals).block(Block::bordered().title(" Totals ")),
        bottom[1],
    );
}

fn render_events(frame: &mut Frame, area: Rect, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // User ID input
            Constraint::Length(1), // Validation error
            Constraint::Min(3),    // Content
        ])
        .split(area);

    let controls = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(40), Constraint::Min(0)])
        .split(layout[0]);

    render_field(
        frame,
        controls[0],
        "Enter User ID",
        &app.user_id,
        app.focus == Focus::UserId,
        Some("player uuid"),
    );

    render_error_line(frame, layout[1], app.events_error.as_deref());

    let hint = "Enter a User ID and press Enter to look up purchases.";
    if let Some(purchases) = render_panel_state(frame, layout[2], &app.events, hint) {
        if purchases.is_empty() {
            render_message(
                frame,
                layout[2],
                UNKNOWN_USER_MESSAGE.to_string(),
                Style::default().fg(Color::DarkGray),
            );
        } else {
            render_purchases(frame, layout[2], purchases, app);
        }
    }
}

fn render_purchases(frame: &mut Frame, area: Rect, purchases: &UserPurchases, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),      // Title
            Constraint::Percentage(40), // Daily amounts
            Constraint::Length(1),      // Details title
            Constraint::Min(5),         // Details table
        ])
        .split(area);

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let title = Line::from(vec![
        Span::styled(
            format!(" Purchase Data for User: {}", purchases.user_name()),
            bold,
        ),
        Span::styled(
            format!("  (total {})", format_currency(purchases.total_amount())),
            Style::default().fg(Color::Green),
        ),
    ]);
    frame.render_widget(Paragraph::new(title), layout[0]);

    let totals = purchases.daily_totals();
    frame.render_widget(
        DailyAmountChart::new(purchases.user_name(), &totals),
        layout[1],
    );

    let details_style = if app.focus == Focus::Details {
        bold.fg(Color::Cyan)
    } else {
        bold
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            " Detailed Purchase Information",
            details_style,
        ))),
        layout[2],
    );
    frame.render_widget(
        DetailTableView::new(&purchases.details, app.details_scroll),
        layout[3],
    );
}

fn render_help(frame: &mut Frame, area: Rect, app: &App) {
    let help = match app.focus {
        Focus::Details => "↑/↓ PgUp/PgDn Home/End scroll · Tab next · F1/F2 tabs · Ctrl+Q quit",
        Focus::Run => "Enter run · Tab next · F1/F2 tabs · Ctrl+Q quit",
        _ => "Enter run · Esc clear · Tab next · F1/F2 tabs · Ctrl+Q quit",
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            format!(" {help}"),
            Style::default().fg(Color::DarkGray),
        ))),
        area,
    );
}
