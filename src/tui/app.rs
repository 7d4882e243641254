//! Application state for the TUI.
//!
//! Holds the tab/focus state, the text inputs and the last result of each
//! view. Key handling is pure: it updates state and returns the query to run,
//! the runner performs it and feeds the result back through `apply_*`.

use super::events::Event;
use super::widgets::spinner::Spinner;
use crate::analytics::{DateRange, GeneralStats, UserId, UserPurchases};
use crate::error::Result;
use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Lines moved by PageUp/PageDown in the details table.
const PAGE_SIZE: usize = 10;

const GENERAL_SPINNER: &str = "Loading statistics";
const EVENTS_SPINNER: &str = "Looking up purchases";

/// The two dashboard views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    General,
    Events,
}

impl Tab {
    pub const ALL: [Tab; 2] = [Tab::General, Tab::Events];

    pub fn title(self) -> &'static str {
        match self {
            Self::General => "General Statistics",
            Self::Events => "Events",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::General => 0,
            Self::Events => 1,
        }
    }
}

/// Which control currently has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    StartDate,
    EndDate,
    Run,
    UserId,
    Details,
}

impl Focus {
    /// Cycles to the next control on the same tab.
    pub fn next(self) -> Self {
        match self {
            Self::StartDate => Self::EndDate,
            Self::EndDate => Self::Run,
            Self::Run => Self::StartDate,
            Self::UserId => Self::Details,
            Self::Details => Self::UserId,
        }
    }

    /// Cycles to the previous control on the same tab.
    pub fn prev(self) -> Self {
        match self {
            Self::StartDate => Self::Run,
            Self::EndDate => Self::StartDate,
            Self::Run => Self::EndDate,
            Self::UserId => Self::Details,
            Self::Details => Self::UserId,
        }
    }

    pub fn is_text_input(self) -> bool {
        matches!(self, Self::StartDate | Self::EndDate | Self::UserId)
    }
}

/// Input state for text editing.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    /// Current input text.
    pub text: String,
    /// Cursor position in characters.
    pub cursor: usize,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an input holding `text` with the cursor at the end.
    pub fn with_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    fn byte_index(&self, cursor: usize) -> usize {
        self.text
            .char_indices()
            .nth(cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Inserts a character at the cursor position.
    pub fn insert(&mut self, c: char) {
        let index = self.byte_index(self.cursor);
        self.text.insert(index, c);
        self.cursor += 1;
    }

    /// Deletes the character before the cursor (backspace).
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let index = self.byte_index(self.cursor);
            self.text.remove(index);
        }
    }

    /// Deletes the character at the cursor (delete key).
    pub fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let index = self.byte_index(self.cursor);
            self.text.remove(index);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.char_len() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_len();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Applies an editing key. Returns false for keys it does not handle.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c) => self.insert(c),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.move_home(),
            KeyCode::End => self.move_end(),
            KeyCode::Esc => self.clear(),
            _ => return false,
        }
        true
    }
}

/// Lifecycle of one view's data.
#[derive(Debug, Clone)]
pub enum Panel<T> {
    /// Nothing requested yet.
    Idle,
    /// A query is running.
    Loading,
    Loaded(T),
    /// The query failed; holds the error message.
    Failed(String),
}

impl<T> Panel<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::Loaded(data),
            Err(e) => Self::Failed(e.message().to_string()),
        }
    }
}

/// A query the runner should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    RunGeneral(DateRange),
    LookupUser(UserId),
}

/// Result of a performed action, fed back into the app.
#[derive(Debug)]
pub enum Outcome {
    General(Result<GeneralStats>),
    UserPurchases(Result<UserPurchases>),
}

/// Main application state.
pub struct App {
    /// Whether the application is still running.
    pub running: bool,
    pub tab: Tab,
    pub focus: Focus,
    pub start_date: InputState,
    pub end_date: InputState,
    pub user_id: InputState,
    pub general: Panel<GeneralStats>,
    pub events: Panel<UserPurchases>,
    /// Validation error shown under the date inputs.
    pub general_error: Option<String>,
    /// Validation error shown under the User ID input.
    pub events_error: Option<String>,
    /// First visible row of the details table.
    pub details_scroll: usize,
    /// Number of cities in the top cities chart.
    pub top_cities: u32,
    /// Warehouse connection info for display.
    pub connection_info: Option<String>,
    pub is_connected: bool,
    /// Active loading indicator.
    pub spinner: Option<Spinner>,
}

impl App {
    /// Creates the app with the given default date range.
    pub fn new(range: DateRange, top_cities: u32, connection_info: Option<String>) -> Self {
        Self {
            running: true,
            tab: Tab::default(),
            focus: Focus::default(),
            start_date: InputState::with_text(format_date(range.start())),
            end_date: InputState::with_text(format_date(range.end())),
            user_id: InputState::new(),
            general: Panel::Idle,
            events: Panel::Idle,
            general_error: None,
            events_error: None,
            details_scroll: 0,
            top_cities,
            is_connected: connection_info.is_some(),
            connection_info,
            spinner: None,
        }
    }

    /// Switches tabs and moves focus to the tab's first control.
    pub fn select_tab(&mut self, tab: Tab) {
        self.tab = tab;
        self.focus = match tab {
            Tab::General => Focus::StartDate,
            Tab::Events => Focus::UserId,
        };
    }

    /// The text input that currently has focus, if any.
    pub fn focused_input(&mut self) -> Option<&mut InputState> {
        match self.focus {
            Focus::StartDate => Some(&mut self.start_date),
            Focus::EndDate => Some(&mut self.end_date),
            Focus::UserId => Some(&mut self.user_id),
            Focus::Run | Focus::Details => None,
        }
    }

    /// Types text into the focused input.
    pub fn type_text(&mut self, text: &str) {
        if let Some(input) = self.focused_input() {
            for c in text.chars() {
                input.insert(c);
            }
        }
    }

    /// Handles an event and returns the query to run, if any.
    pub fn handle_event(&mut self, event: Event) -> Option<Action> {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Resize(_, _) | Event::Tick => None,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
                self.running = false;
            }
            return None;
        }

        match key.code {
            KeyCode::F(1) => {
                self.select_tab(Tab::General);
                None
            }
            KeyCode::F(2) => {
                self.select_tab(Tab::Events);
                None
            }
            KeyCode::Tab => {
                self.focus = self.focus.next();
                None
            }
            KeyCode::BackTab => {
                self.focus = self.focus.prev();
                None
            }
            KeyCode::Enter => self.submit(),
            _ if self.focus == Focus::Details => {
                self.scroll_details(key.code);
                None
            }
            _ => {
                if let Some(input) = self.focused_input() {
                    input.handle_key(key);
                }
                None
            }
        }
    }

    /// Validates the current tab's inputs and returns the query to run.
    /// Ignored while that tab's previous query is still running.
    pub fn submit(&mut self) -> Option<Action> {
        let busy = match self.tab {
            Tab::General => self.general.is_loading(),
            Tab::Events => self.events.is_loading(),
        };
        if busy {
            return None;
        }
        match self.tab {
            Tab::General => match DateRange::parse(&self.start_date.text, &self.end_date.text) {
                Ok(range) => {
                    self.general_error = None;
                    self.general = Panel::Loading;
                    self.spinner = Some(Spinner::new(GENERAL_SPINNER));
                    Some(Action::RunGeneral(range))
                }
                Err(e) => {
                    self.general_error = Some(e.message().to_string());
                    None
                }
            },
            Tab::Events => match UserId::parse(&self.user_id.text) {
                Ok(user_id) => {
                    self.events_error = None;
                    self.events = Panel::Loading;
                    self.spinner = Some(Spinner::new(EVENTS_SPINNER));
                    Some(Action::LookupUser(user_id))
                }
                Err(e) => {
                    self.events_error = Some(e.message().to_string());
                    None
                }
            },
        }
    }

    fn scroll_details(&mut self, code: KeyCode) {
        let max = self
            .events
            .loaded()
            .map(|p| p.details.rows.len().saturating_sub(1))
            .unwrap_or(0);
        self.details_scroll = match code {
            KeyCode::Up => self.details_scroll.saturating_sub(1),
            KeyCode::Down => self.details_scroll.saturating_add(1),
            KeyCode::PageUp => self.details_scroll.saturating_sub(PAGE_SIZE),
            KeyCode::PageDown => self.details_scroll.saturating_add(PAGE_SIZE),
            KeyCode::Home => 0,
            KeyCode::End => max,
            _ => self.details_scroll,
        }
        .min(max);
    }

    /// Queries issued at launch: the general statistics for the default range,
    /// then a lookup of `user_id` when one was given on the command line.
    pub fn startup_actions(&mut self, user_id: Option<&str>) -> Vec<Action> {
        let mut actions: Vec<Action> = self.submit().into_iter().collect();
        if let Some(user_id) = user_id {
            self.select_tab(Tab::Events);
            self.user_id = InputState::with_text(user_id);
            actions.extend(self.submit());
        }
        actions
    }

    /// Applies the outcome of an action performed by the runner.
    pub fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::General(result) => self.apply_general(result),
            Outcome::UserPurchases(result) => self.apply_user_purchases(result),
        }
    }

    pub fn apply_general(&mut self, result: Result<GeneralStats>) {
        self.general = Panel::from_result(result);
        self.settle_spinner();
    }

    pub fn apply_user_purchases(&mut self, result: Result<UserPurchases>) {
        self.details_scroll = 0;
        self.events = Panel::from_result(result);
        self.settle_spinner();
    }

    /// Keeps the spinner up while the other view's query is still running.
    fn settle_spinner(&mut self) {
        self.spinner = if self.general.is_loading() {
            Some(Spinner::new(GENERAL_SPINNER))
        } else if self.events.is_loading() {
            Some(Spinner::new(EVENTS_SPINNER))
        } else {
            None
        };
    }

    /// Short status of a panel for headless state snapshots.
    pub fn panel_status<T>(panel: &Panel<T>, is_empty: impl Fn(&T) -> bool) -> &'static str {
        match panel {
            Panel::Idle => "idle",
            Panel::Loading => "loading",
            Panel::Loaded(data) if is_empty(data) => "empty",
            Panel::Loaded(_) => "loaded",
            Panel::Failed(_) => "failed",
        }
    }

    pub fn general_status(&self) -> &'static str {
        Self::panel_status(&self.general, GeneralStats::is_empty)
    }

    pub fn events_status(&self) -> &'static str {
        Self::panel_status(&self.events, UserPurchases::is_empty)
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
