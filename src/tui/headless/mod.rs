//! Headless mode for scripted testing and automation.
//!
//! Drives the dashboard UI on an in-memory terminal, executing a script of
//! key presses and assertions and capturing the rendered screens.

mod events;
mod output;

pub use events::{parse_script, parse_size, parse_step, Assertion, Step};
pub use output::{HeadlessOutput, OutputFormat, ScreenRenderer};

use super::{app::App, perform, ui, Event};
use crate::analytics::Dashboard;
use crate::cli::Cli;
use crate::error::{DashError, Result};
use ratatui::{backend::TestBackend, layout::Rect, Terminal};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Configuration for a headless run.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    pub width: u16,
    pub height: u16,
    pub output_format: OutputFormat,
    /// Stop at the first failed assertion.
    pub fail_fast: bool,
    /// Where to write the output; stdout when unset.
    pub output_file: Option<PathBuf>,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            width: 120,
            height: 40,
            output_format: OutputFormat::Text,
            fail_fast: false,
            output_file: None,
        }
    }
}

impl HeadlessConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let (width, height) = parse_size(&cli.size)?;
        Ok(Self {
            width,
            height,
            output_format: cli.output,
            fail_fast: cli.fail_fast,
            output_file: cli.output_file.clone(),
        })
    }
}

/// Snapshot of the app state, used by `assert:state:` and the JSON output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadlessState {
    pub tab: String,
    pub focus: String,
    pub start_date: String,
    pub end_date: String,
    pub user_id: String,
    /// Status of the General Statistics view (idle, loading, empty, loaded, failed).
    pub general: String,
    /// Status of the Events view.
    pub events: String,
    /// Cities in the loaded statistics.
    pub city_count: usize,
    /// Purchase rows in the loaded lookup.
    pub purchase_rows: usize,
    /// Validation error on the current tab.
    pub input_error: Option<String>,
    pub running: bool,
}

impl HeadlessState {
    pub fn from_app(app: &App) -> Self {
        let input_error = match app.tab {
            super::app::Tab::General => app.general_error.clone(),
            super::app::Tab::Events => app.events_error.clone(),
        };
        Self {
            tab: format!("{:?}", app.tab),
            focus: format!("{:?}", app.focus),
            start_date: app.start_date.text.clone(),
            end_date: app.end_date.text.clone(),
            user_id: app.user_id.text.clone(),
            general: app.general_status().to_string(),
            events: app.events_status().to_string(),
            city_count: app.general.loaded().map_or(0, |g| g.cities.len()),
            purchase_rows: app.events.loaded().map_or(0, |p| p.rows.len()),
            input_error,
            running: app.running,
        }
    }

    /// A field rendered as text; `null` reads as `none`.
    pub fn field(&self, name: &str) -> Option<String> {
        let value = serde_json::to_value(self).ok()?;
        match value.get(name)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => Some("none".to_string()),
            other => Some(other.to_string()),
        }
    }
}

/// A screen captured after a step.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame number; 0 is the initial screen.
    pub number: usize,
    /// Step that produced the frame.
    pub event: Option<String>,
    /// Name given by a `snapshot:` step.
    pub snapshot: Option<String>,
    pub screen: String,
}

/// Result of a headless run.
#[derive(Debug)]
pub struct HeadlessResult {
    pub screen: String,
    pub screen_lines: Vec<String>,
    pub events_executed: usize,
    pub duration: Duration,
    pub assertions_passed: usize,
    /// The failed assertion steps, as written in the script.
    pub failures: Vec<String>,
    pub state: HeadlessState,
    pub frames: Vec<Frame>,
}

impl HeadlessResult {
    pub fn exit_code(&self) -> i32 {
        if self.failures.is_empty() {
            0
        } else {
            1
        }
    }
}

/// Runs the UI against a test backend.
pub struct HeadlessRunner {
    config: HeadlessConfig,
    terminal: Terminal<TestBackend>,
    app: App,
    dashboard: Dashboard,
    steps: Vec<Step>,
    frames: Vec<Frame>,
    assertions_passed: usize,
    failures: Vec<String>,
}

impl HeadlessRunner {
    pub fn new(config: HeadlessConfig, dashboard: Dashboard, app: App) -> Result<Self> {
        let backend = TestBackend::new(config.width, config.height);
        let terminal = Terminal::new(backend)
            .map_err(|e| DashError::internal(format!("Failed to create test terminal: {e}")))?;

        Ok(Self {
            config,
            terminal,
            app,
            dashboard,
            steps: Vec::new(),
            frames: Vec::new(),
            assertions_passed: 0,
            failures: Vec::new(),
        })
    }

    /// Loads steps from script text.
    pub fn load_script(&mut self, script: &str) -> Result<()> {
        self.steps = parse_script(script)?;
        Ok(())
    }

    /// Loads steps from a file, or from stdin when `path` is `-`.
    pub fn load_script_file(&mut self, path: &str) -> Result<()> {
        let content = if path == "-" {
            std::io::read_to_string(std::io::stdin())
                .map_err(|e| DashError::internal(format!("Failed to read stdin: {e}")))?
        } else {
            std::fs::read_to_string(path).map_err(|e| {
                DashError::config(format!("Failed to read script file '{path}': {e}"))
            })?
        };
        self.load_script(&content)
    }

    /// Performs the startup queries, then executes every step.
    pub async fn run(mut self, user_id: Option<&str>) -> Result<HeadlessResult> {
        let start = Instant::now();

        for action in self.app.startup_actions(user_id) {
            let outcome = perform(&self.dashboard, action).await;
            self.app.apply(outcome);
        }
        self.capture_frame(None, None)?;

        let steps = std::mem::take(&mut self.steps);
        let mut events_executed = 0;

        for step in steps {
            let label = step.to_string();
            debug!("Headless step: {label}");

            match &step {
                Step::Key(key) => {
                    if let Some(action) = self.app.handle_event(Event::Key(*key)) {
                        let outcome = perform(&self.dashboard, action).await;
                        self.app.apply(outcome);
                    }
                }
                Step::Type(text) => self.app.type_text(text),
                Step::Wait(duration) => tokio::time::sleep(*duration).await,
                Step::Resize(width, height) => {
                    self.terminal
                        .resize(Rect::new(0, 0, *width, *height))
                        .map_err(|e| DashError::internal(format!("Resize failed: {e}")))?;
                    self.app.handle_event(Event::Resize(*width, *height));
                }
                Step::Snapshot(name) => {
                    self.capture_frame(Some(label.clone()), Some(name.clone()))?;
                }
                Step::Assert(assertion) => {
                    let screen = self.draw()?;
                    let state = HeadlessState::from_app(&self.app);
                    if assertion.check(&screen, &state) {
                        self.assertions_passed += 1;
                    } else {
                        warn!("Assertion failed: {label}");
                        self.failures.push(label.clone());
                    }
                }
            }
            events_executed += 1;

            if self.config.output_format == OutputFormat::Frames
                && !matches!(step, Step::Snapshot(_))
            {
                self.capture_frame(Some(label), None)?;
            }

            if !self.app.running || (self.config.fail_fast && !self.failures.is_empty()) {
                break;
            }
        }

        let screen = self.draw()?;
        if let Err(e) = self.dashboard.close().await {
            warn!("Error closing warehouse connection: {}", e);
        }

        Ok(HeadlessResult {
            screen_lines: screen.lines().map(String::from).collect(),
            screen,
            events_executed,
            duration: start.elapsed(),
            assertions_passed: self.assertions_passed,
            failures: self.failures,
            state: HeadlessState::from_app(&self.app),
            frames: self.frames,
        })
    }

    /// Renders the UI and returns the screen text.
    fn draw(&mut self) -> Result<String> {
        let app = &self.app;
        self.terminal
            .draw(|frame| ui::render(frame, app))
            .map_err(|e| DashError::internal(format!("Failed to render: {e}")))?;
        Ok(ScreenRenderer::render(self.terminal.backend().buffer()))
    }

    fn capture_frame(&mut self, event: Option<String>, snapshot: Option<String>) -> Result<()> {
        let screen = self.draw()?;
        self.frames.push(Frame {
            number: self.frames.len(),
            event,
            snapshot,
            screen,
        });
        Ok(())
    }
}

/// Runs headless mode from CLI arguments and returns the exit code.
pub async fn run_headless(cli: &Cli, dashboard: Dashboard, app: App) -> Result<i32> {
    cli.validate_headless()?;

    let config = HeadlessConfig::from_cli(cli)?;
    let mut runner = HeadlessRunner::new(config.clone(), dashboard, app)?;

    if let Some(ref events) = cli.events {
        runner.load_script(events)?;
    } else if let Some(ref path) = cli.script {
        runner.load_script_file(path)?;
    }

    let result = runner.run(cli.user_id.as_deref()).await?;
    info!(
        "Headless run finished: {} steps, {} assertions passed, {} failed",
        result.events_executed,
        result.assertions_passed,
        result.failures.len()
    );

    let output = HeadlessOutput::new(config.output_format).format(&result);
    match config.output_file {
        Some(ref path) => std::fs::write(path, &output).map_err(|e| {
            DashError::internal(format!("Failed to write {}: {e}", path.display()))
        })?,
        None => print!("{output}"),
    }

    Ok(result.exit_code())
}
