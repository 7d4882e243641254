//! Terminal User Interface for the dashboard.
//!
//! Provides the main TUI application loop using ratatui and crossterm.

pub mod app;
mod events;
pub mod headless;
mod ui;
pub mod widgets;

pub use app::{Action, App, Outcome};
pub use events::{Event, EventHandler};

use crate::analytics::Dashboard;
use crate::error::{DashError, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::panic;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Runs an action against the dashboard and returns its outcome.
pub async fn perform(dashboard: &Dashboard, action: Action) -> Outcome {
    debug!("Performing {action:?}");
    match action {
        Action::RunGeneral(range) => Outcome::General(dashboard.general_statistics(&range).await),
        Action::LookupUser(user_id) => {
            Outcome::UserPurchases(dashboard.user_purchases(&user_id).await)
        }
    }
}

/// The main TUI application runner.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    event_handler: EventHandler,
}

impl Tui {
    /// Creates a new TUI instance, initializing the terminal.
    pub fn new() -> Result<Self> {
        let terminal = Self::setup_terminal()?;
        Ok(Self {
            terminal,
            event_handler: EventHandler::new(),
        })
    }

    /// Sets up the terminal for TUI rendering.
    fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()
            .map_err(|e| DashError::internal(format!("Failed to enable raw mode: {e}")))?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)
            .map_err(|e| DashError::internal(format!("Failed to enter alternate screen: {e}")))?;

        let backend = CrosstermBackend::new(stdout);
        Terminal::new(backend)
            .map_err(|e| DashError::internal(format!("Failed to create terminal: {e}")))
    }

    /// Restores the terminal to its original state.
    fn restore_terminal(&mut self) -> Result<()> {
        disable_raw_mode()
            .map_err(|e| DashError::internal(format!("Failed to disable raw mode: {e}")))?;

        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)
            .map_err(|e| DashError::internal(format!("Failed to leave alternate screen: {e}")))?;

        self.terminal
            .show_cursor()
            .map_err(|e| DashError::internal(format!("Failed to show cursor: {e}")))?;

        Ok(())
    }

    /// Runs the event loop until the user quits.
    ///
    /// Queries run on background tasks and their outcomes come back over a
    /// channel, so input and the spinner stay live while a query runs.
    pub async fn run(
        &mut self,
        dashboard: Arc<Dashboard>,
        mut app: App,
        startup: Vec<Action>,
    ) -> Result<()> {
        let original_hook = panic::take_hook();
        panic::set_hook(Box::new(move |panic_info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            original_hook(panic_info);
        }));

        let (tx, mut rx) = mpsc::channel::<Outcome>(8);
        for action in startup {
            spawn_action(Arc::clone(&dashboard), action, tx.clone());
        }

        let mut events = self.event_handler.spawn();
        let result = self
            .run_event_loop(&mut app, &dashboard, &mut events, &tx, &mut rx)
            .await;

        if let Err(e) = dashboard.close().await {
            warn!("Error closing warehouse connection: {}", e);
        }

        let _ = panic::take_hook();
        result
    }

    async fn run_event_loop(
        &mut self,
        app: &mut App,
        dashboard: &Arc<Dashboard>,
        events: &mut mpsc::Receiver<Result<Event>>,
        tx: &mpsc::Sender<Outcome>,
        rx: &mut mpsc::Receiver<Outcome>,
    ) -> Result<()> {
        loop {
            self.terminal
                .draw(|frame| ui::render(frame, app))
                .map_err(|e| DashError::internal(format!("Failed to draw: {e}")))?;

            if !app.running {
                return Ok(());
            }

            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        return Err(DashError::internal("Terminal event reader stopped"));
                    };
                    if let Some(action) = app.handle_event(event?) {
                        spawn_action(Arc::clone(dashboard), action, tx.clone());
                    }
                }
                Some(outcome) = rx.recv() => {
                    app.apply(outcome);
                }
            }
        }
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = self.restore_terminal();
    }
}

fn spawn_action(dashboard: Arc<Dashboard>, action: Action, tx: mpsc::Sender<Outcome>) {
    tokio::spawn(async move {
        let outcome = perform(&dashboard, action).await;
        if tx.send(outcome).await.is_err() {
            debug!("Dropping query outcome after shutdown");
        }
    });
}

/// Runs the interactive dashboard.
pub async fn run(dashboard: Dashboard, mut app: App, user_id: Option<&str>) -> Result<()> {
    let startup = app.startup_actions(user_id);
    let mut tui = Tui::new()?;
    tui.run(Arc::new(dashboard), app, startup).await
}
