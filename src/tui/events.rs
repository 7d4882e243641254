//! Event handling for the TUI.
//!
//! Processes keyboard and terminal events using crossterm.

use crate::error::{DashError, Result};
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

/// Application events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A key was pressed.
    Key(KeyEvent),
    /// The terminal was resized.
    Resize(u16, u16),
    /// No input within the tick rate; used to animate the spinner.
    Tick,
}

impl Event {
    fn from_crossterm(event: CrosstermEvent) -> Self {
        match event {
            CrosstermEvent::Key(key) if key.kind != KeyEventKind::Release => Self::Key(key),
            CrosstermEvent::Resize(width, height) => Self::Resize(width, height),
            _ => Self::Tick,
        }
    }
}

/// Handles terminal events.
#[derive(Debug, Clone, Copy)]
pub struct EventHandler {
    /// Timeout for polling events.
    tick_rate: Duration,
}

impl EventHandler {
    /// Creates a new event handler with default tick rate.
    pub fn new() -> Self {
        Self {
            tick_rate: Duration::from_millis(100),
        }
    }

    /// Creates a new event handler with a custom tick rate.
    pub fn with_tick_rate(tick_rate: Duration) -> Self {
        Self { tick_rate }
    }

    /// Polls for the next event, blocking for at most the tick rate.
    pub fn next(&self) -> Result<Event> {
        if event::poll(self.tick_rate)
            .map_err(|e| DashError::internal(format!("Failed to poll events: {e}")))?
        {
            let event = event::read()
                .map_err(|e| DashError::internal(format!("Failed to read event: {e}")))?;
            Ok(Event::from_crossterm(event))
        } else {
            Ok(Event::Tick)
        }
    }

    /// Reads events on the blocking pool and forwards them over a channel.
    ///
    /// The reader stops at the first tick after the receiver is dropped.
    pub fn spawn(self) -> mpsc::Receiver<Result<Event>> {
        let (tx, rx) = mpsc::channel(32);
        tokio::task::spawn_blocking(move || loop {
            let event = self.next();
            let failed = event.is_err();
            if tx.blocking_send(event).is_err() || failed {
                break;
            }
        });
        rx
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers};

    #[test]
    fn test_event_handler_creation() {
        let handler = EventHandler::new();
        assert_eq!(handler.tick_rate, Duration::from_millis(100));
    }

    #[test]
    fn test_event_handler_custom_tick_rate() {
        let handler = EventHandler::with_tick_rate(Duration::from_millis(50));
        assert_eq!(handler.tick_rate, Duration::from_millis(50));
    }

    #[test]
    fn test_key_release_is_ignored() {
        let release = KeyEvent {
            code: KeyCode::Enter,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(Event::from_crossterm(CrosstermEvent::Key(release)), Event::Tick);

        let press = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(
            Event::from_crossterm(CrosstermEvent::Key(press)),
            Event::Key(press)
        );
    }

    #[test]
    fn test_resize_passes_through() {
        assert_eq!(
            Event::from_crossterm(CrosstermEvent::Resize(100, 30)),
            Event::Resize(100, 30)
        );
    }
}
