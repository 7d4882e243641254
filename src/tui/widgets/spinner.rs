//! Loading indicator shown in the header while a query runs.

use std::time::Instant;

/// Braille spinner frames.
const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Animation speed in milliseconds per frame.
const FRAME_DURATION_MS: u128 = 100;

#[derive(Debug, Clone)]
pub struct Spinner {
    start_time: Instant,
    label: String,
}

impl Spinner {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            start_time: Instant::now(),
            label: label.into(),
        }
    }

    /// Returns the current frame of the animation.
    pub fn frame(&self) -> &'static str {
        let elapsed_ms = self.start_time.elapsed().as_millis();
        let frame_index = (elapsed_ms / FRAME_DURATION_MS) as usize;
        FRAMES[frame_index % FRAMES.len()]
    }

    pub fn display(&self) -> String {
        format!("{} {}…", self.frame(), self.label)
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_frame_is_braille() {
        let spinner = Spinner::new("Loading statistics");
        assert!(FRAMES.contains(&spinner.frame()));
        assert_eq!(spinner.label(), "Loading statistics");
    }

    #[test]
    fn test_spinner_display() {
        let spinner = Spinner::new("Looking up purchases");
        let display = spinner.display();
        assert!(display.ends_with("Looking up purchases…"));
    }
}
