//! Text field and button widgets.
//!
//! Single-line bordered inputs used for the date range and the User ID.

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

/// Calculates the scroll offset needed to keep the cursor visible.
///
/// Returns the number of characters to skip from the start of the text.
pub fn calculate_scroll_offset(cursor: usize, available_width: usize) -> usize {
    cursor.saturating_sub(available_width)
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

/// A bordered single-line text input.
pub struct TextField<'a> {
    label: &'a str,
    text: &'a str,
    cursor: usize,
    focused: bool,
    placeholder: Option<&'a str>,
}

impl<'a> TextField<'a> {
    pub fn new(label: &'a str, text: &'a str, cursor: usize, focused: bool) -> Self {
        Self {
            label,
            text,
            cursor,
            focused,
            placeholder: None,
        }
    }

    /// Hint shown dimmed while the field is empty.
    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    /// Screen position of the cursor when rendered into `area`.
    pub fn cursor_position(&self, area: Rect) -> (u16, u16) {
        let available = Self::available_width(area);
        let offset = calculate_scroll_offset(self.cursor, available);
        let x = area.x + 1 + (self.cursor - offset) as u16;
        (x.min(area.right().saturating_sub(2)), area.y + 1)
    }

    fn available_width(area: Rect) -> usize {
        // Borders (2) plus one cell for the cursor
        area.width.saturating_sub(3) as usize
    }
}

impl Widget for TextField<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(self.focused))
            .title(format!(" {} ", self.label));

        let line = match self.placeholder {
            Some(placeholder) if self.text.is_empty() => Line::from(Span::styled(
                placeholder,
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )),
            _ => {
                let offset =
                    calculate_scroll_offset(self.cursor, Self::available_width(area));
                let visible: String = self.text.chars().skip(offset).collect();
                Line::from(Span::raw(visible))
            }
        };

        Paragraph::new(line).block(block).render(area, buf);
    }
}

/// A bordered push button.
pub struct Button<'a> {
    label: &'a str,
    focused: bool,
}

impl<'a> Button<'a> {
    pub fn new(label: &'a str, focused: bool) -> Self {
        Self { label, focused }
    }
}

impl Widget for Button<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let text_style = if self.focused {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(self.focused));

        Paragraph::new(Line::from(Span::styled(format!(" {} ", self.label), text_style)))
            .alignment(Alignment::Center)
            .block(block)
            .render(area, buf);
    }
}
