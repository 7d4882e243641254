//! Output formatting for headless mode.

use super::{HeadlessResult, HeadlessState};
use clap::ValueEnum;
use ratatui::buffer::Buffer;
use serde::Serialize;
use std::collections::BTreeMap;

/// Output format for headless mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Final screen followed by a one-line summary.
    #[default]
    Text,
    /// Screen, state snapshot and assertion counts as JSON.
    Json,
    /// Every captured frame in order.
    Frames,
}

/// Renders a ratatui buffer to plain text.
pub struct ScreenRenderer;

impl ScreenRenderer {
    /// Joins the buffer's cells into lines, trimming trailing spaces and
    /// trailing blank lines.
    pub fn render(buffer: &Buffer) -> String {
        let area = buffer.area;
        let mut lines: Vec<String> = (area.top()..area.bottom())
            .map(|y| {
                let line: String = (area.left()..area.right())
                    .map(|x| buffer.cell((x, y)).map(|c| c.symbol()).unwrap_or(" "))
                    .collect();
                line.trim_end().to_string()
            })
            .collect();

        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }

        let mut screen = lines.join("\n");
        screen.push('\n');
        screen
    }
}

#[derive(Debug, Serialize)]
struct JsonOutput<'a> {
    screen: &'a str,
    screen_lines: &'a [String],
    events_executed: usize,
    duration_ms: u64,
    assertions: AssertionSummary,
    state: &'a HeadlessState,
    snapshots: BTreeMap<&'a str, &'a str>,
}

#[derive(Debug, Serialize)]
struct AssertionSummary {
    passed: usize,
    failed: usize,
    failures: Vec<String>,
}

/// Formats headless execution results.
pub struct HeadlessOutput {
    format: OutputFormat,
}

impl HeadlessOutput {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, result: &HeadlessResult) -> String {
        match self.format {
            OutputFormat::Text => Self::format_text(result),
            OutputFormat::Json => Self::format_json(result),
            OutputFormat::Frames => Self::format_frames(result),
        }
    }

    fn assertion_line(result: &HeadlessResult) -> Option<String> {
        if result.assertions_passed == 0 && result.failures.is_empty() {
            return None;
        }
        let mut line = format!(
            "Assertions: {} passed, {} failed",
            result.assertions_passed,
            result.failures.len()
        );
        for failure in &result.failures {
            line.push_str(&format!("\n  FAILED {failure}"));
        }
        Some(line)
    }

    fn format_text(result: &HeadlessResult) -> String {
        let mut out = format!(
            "{}\nEvents: {} executed in {}ms\n",
            result.screen,
            result.events_executed,
            result.duration.as_millis()
        );
        if let Some(line) = Self::assertion_line(result) {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    fn format_json(result: &HeadlessResult) -> String {
        let output = JsonOutput {
            screen: &result.screen,
            screen_lines: &result.screen_lines,
            events_executed: result.events_executed,
            duration_ms: result.duration.as_millis() as u64,
            assertions: AssertionSummary {
                passed: result.assertions_passed,
                failed: result.failures.len(),
                failures: result.failures.clone(),
            },
            state: &result.state,
            snapshots: result
                .frames
                .iter()
                .filter_map(|f| f.snapshot.as_deref().map(|name| (name, f.screen.as_str())))
                .collect(),
        };

        serde_json::to_string_pretty(&output)
            .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize: {e}\"}}"))
    }

    fn format_frames(result: &HeadlessResult) -> String {
        let mut out = String::new();
        for frame in &result.frames {
            let label = frame.event.as_deref().unwrap_or("initial");
            out.push_str(&format!(
                "=== FRAME {} ({label}) ===\n{}\n",
                frame.number, frame.screen
            ));
        }
        out.push_str(&format!(
            "Total: {} frames, {} events executed in {}ms\n",
            result.frames.len(),
            result.events_executed,
            result.duration.as_millis()
        ));
        if let Some(line) = Self::assertion_line(result) {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}
