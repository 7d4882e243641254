//! Header widget for the TUI.
//!
//! Displays the dashboard title, the loading spinner and the warehouse
//! connection info.

use super::spinner::Spinner;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Span,
    widgets::Widget,
};

pub const TITLE: &str = "Match Masters Analysis";

/// Header bar widget.
pub struct Header<'a> {
    connection_info: Option<&'a str>,
    spinner: Option<&'a Spinner>,
    is_connected: bool,
}

impl<'a> Header<'a> {
    pub fn new(
        connection_info: Option<&'a str>,
        spinner: Option<&'a Spinner>,
        is_connected: bool,
    ) -> Self {
        Self {
            connection_info,
            spinner,
            is_connected,
        }
    }
}

impl Widget for Header<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }

        let style = Style::default()
            .bg(Color::Blue)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);

        for x in area.left()..area.right() {
            buf[(x, area.y)].set_style(style);
        }

        let left_span = Span::styled(format!(" {TITLE}"), style);
        buf.set_span(area.x, area.y, &left_span, area.width);

        if let Some(spinner) = self.spinner {
            let spinner_text = spinner.display();
            let spinner_style = style.fg(Color::Yellow);
            let spinner_width = spinner_text.chars().count() as u16;
            let spinner_x = area.x + (area.width.saturating_sub(spinner_width)) / 2;
            buf.set_string(spinner_x, area.y, &spinner_text, spinner_style);
        }

        // Connection status dot and info, right aligned
        let (status_dot, status_color, info) = match self.connection_info {
            Some(info) if self.is_connected => ("●", Color::Green, info),
            Some(info) => ("○", Color::Gray, info),
            None => ("○", Color::Gray, "in-memory sample"),
        };
        let db_text = format!(" [warehouse: {info}] ");
        let right_width = db_text.chars().count() as u16 + 2;
        if right_width < area.width {
            let right_x = area.right().saturating_sub(right_width);
            buf.set_string(right_x, area.y, " ", style);
            buf.set_string(right_x + 1, area.y, status_dot, style.fg(status_color));
            buf.set_string(right_x + 2, area.y, &db_text, style);
        }
    }
}
