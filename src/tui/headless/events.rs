//! Script DSL for headless mode.
//!
//! A script is a list of steps separated by commas or newlines:
//! `key:f2`, `type:u-1001`, `key:enter`, `assert:contains:DragonSlayer`.
//! Lines starting with `#` are comments.

use super::HeadlessState;
use crate::error::{DashError, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use regex::Regex;
use std::fmt;
use std::time::Duration;

/// Named keys accepted by `key:`.
const NAMED_KEYS: &[(&str, KeyCode)] = &[
    ("enter", KeyCode::Enter),
    ("return", KeyCode::Enter),
    ("esc", KeyCode::Esc),
    ("escape", KeyCode::Esc),
    ("tab", KeyCode::Tab),
    ("backtab", KeyCode::BackTab),
    ("backspace", KeyCode::Backspace),
    ("bs", KeyCode::Backspace),
    ("delete", KeyCode::Delete),
    ("del", KeyCode::Delete),
    ("up", KeyCode::Up),
    ("down", KeyCode::Down),
    ("left", KeyCode::Left),
    ("right", KeyCode::Right),
    ("home", KeyCode::Home),
    ("end", KeyCode::End),
    ("pageup", KeyCode::PageUp),
    ("pgup", KeyCode::PageUp),
    ("pagedown", KeyCode::PageDown),
    ("pgdn", KeyCode::PageDown),
    ("space", KeyCode::Char(' ')),
];

/// A check against the rendered screen or the state snapshot.
#[derive(Debug, Clone)]
pub enum Assertion {
    /// Screen contains text, ignoring case.
    Contains(String),
    /// Screen contains text exactly.
    ContainsExact(String),
    /// Screen does not contain text, ignoring case.
    NotContains(String),
    /// Screen matches a regular expression.
    Matches(Regex),
    /// A state field compared against a value with `=`, `>=`, `<=`, `>` or `<`.
    State {
        field: String,
        op: &'static str,
        value: String,
    },
}

impl Assertion {
    pub fn check(&self, screen: &str, state: &HeadlessState) -> bool {
        match self {
            Self::Contains(text) => screen.to_lowercase().contains(&text.to_lowercase()),
            Self::ContainsExact(text) => screen.contains(text.as_str()),
            Self::NotContains(text) => !screen.to_lowercase().contains(&text.to_lowercase()),
            Self::Matches(re) => re.is_match(screen),
            Self::State { field, op, value } => state
                .field(field)
                .is_some_and(|actual| compare(&actual, op, value)),
        }
    }
}

/// Numeric comparison when both sides parse as numbers, otherwise string
/// equality for `=` and false for ordering operators.
fn compare(actual: &str, op: &str, expected: &str) -> bool {
    if let (Ok(a), Ok(e)) = (actual.parse::<f64>(), expected.parse::<f64>()) {
        return match op {
            ">=" => a >= e,
            "<=" => a <= e,
            ">" => a > e,
            "<" => a < e,
            _ => a == e,
        };
    }
    op == "=" && actual == expected
}

/// One executable step of a script.
#[derive(Debug, Clone)]
pub enum Step {
    Key(KeyEvent),
    /// Types text into the focused input.
    Type(String),
    Wait(Duration),
    Resize(u16, u16),
    /// Captures a named frame.
    Snapshot(String),
    Assert(Assertion),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => {
                write!(f, "key:")?;
                for (modifier, name) in [
                    (KeyModifiers::CONTROL, "ctrl+"),
                    (KeyModifiers::ALT, "alt+"),
                    (KeyModifiers::SHIFT, "shift+"),
                ] {
                    if key.modifiers.contains(modifier) {
                        write!(f, "{name}")?;
                    }
                }
                write!(f, "{}", key_name(key.code))
            }
            Self::Type(text) => write!(f, "type:{text}"),
            Self::Wait(d) => write!(f, "wait:{}ms", d.as_millis()),
            Self::Resize(w, h) => write!(f, "resize:{w}x{h}"),
            Self::Snapshot(name) => write!(f, "snapshot:{name}"),
            Self::Assert(assertion) => match assertion {
                Assertion::Contains(t) => write!(f, "assert:contains:{t}"),
                Assertion::ContainsExact(t) => write!(f, "assert:contains-exact:{t}"),
                Assertion::NotContains(t) => write!(f, "assert:not-contains:{t}"),
                Assertion::Matches(re) => write!(f, "assert:matches:{}", re.as_str()),
                Assertion::State { field, op, value } => {
                    write!(f, "assert:state:{field}{op}{value}")
                }
            },
        }
    }
}

fn key_name(code: KeyCode) -> String {
    match code {
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::F(n) => format!("f{n}"),
        other => NAMED_KEYS
            .iter()
            .find(|(_, c)| *c == other)
            .map(|(name, _)| name.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    }
}

/// Parses a whole script into steps.
pub fn parse_script(input: &str) -> Result<Vec<Step>> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split(','))
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_step)
        .collect()
}

/// Parses a single `kind:value` step.
pub fn parse_step(input: &str) -> Result<Step> {
    let (kind, value) = input.trim().split_once(':').ok_or_else(|| {
        DashError::config(format!(
            "Invalid step '{input}'. Expected kind:value, e.g. key:enter"
        ))
    })?;

    match kind.trim().to_lowercase().as_str() {
        "key" => parse_key(value.trim()).map(Step::Key),
        // Text is kept verbatim so leading spaces can be typed.
        "type" => Ok(Step::Type(value.to_string())),
        "wait" => parse_duration(value.trim()).map(Step::Wait),
        "resize" => {
            let (width, height) = parse_size(value.trim())?;
            Ok(Step::Resize(width, height))
        }
        "snapshot" => Ok(Step::Snapshot(value.trim().to_string())),
        "assert" => parse_assertion(value.trim()).map(Step::Assert),
        other => Err(DashError::config(format!(
            "Unknown step '{other}'. Valid steps: key, type, wait, resize, snapshot, assert"
        ))),
    }
}

/// Parses `enter`, `ctrl+c`, `shift+tab`, `f2` or a single character.
fn parse_key(value: &str) -> Result<KeyEvent> {
    let mut parts: Vec<&str> = value.split('+').collect();
    let key = parts.pop().unwrap_or_default();

    let mut modifiers = KeyModifiers::NONE;
    for part in parts {
        modifiers |= match part.to_lowercase().as_str() {
            "ctrl" | "control" => KeyModifiers::CONTROL,
            "alt" => KeyModifiers::ALT,
            "shift" => KeyModifiers::SHIFT,
            _ => {
                return Err(DashError::config(format!(
                    "Unknown modifier '{part}'. Valid modifiers: ctrl, alt, shift"
                )))
            }
        };
    }

    let lower = key.to_lowercase();
    let function_key = lower
        .strip_prefix('f')
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|n| (1..=12).contains(n));

    let mut code = if let Some(n) = function_key {
        KeyCode::F(n)
    } else if let Some((_, code)) = NAMED_KEYS.iter().find(|(name, _)| *name == lower) {
        *code
    } else {
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => KeyCode::Char(c),
            _ => {
                return Err(DashError::config(format!(
                    "Unknown key '{key}'. Use a single character or a named key such as enter, tab, f2"
                )))
            }
        }
    };

    // Terminals report shift+tab as BackTab.
    if code == KeyCode::Tab && modifiers.contains(KeyModifiers::SHIFT) {
        code = KeyCode::BackTab;
    }

    Ok(KeyEvent::new(code, modifiers))
}

/// Parses `100ms`, `2s` or a bare number of milliseconds.
fn parse_duration(value: &str) -> Result<Duration> {
    let invalid = || DashError::config(format!("Invalid duration '{value}'"));
    let lower = value.to_lowercase();
    if let Some(ms) = lower.strip_suffix("ms") {
        ms.trim().parse().map(Duration::from_millis).map_err(|_| invalid())
    } else if let Some(secs) = lower.strip_suffix('s') {
        secs.trim().parse().map(Duration::from_secs).map_err(|_| invalid())
    } else {
        lower.parse().map(Duration::from_millis).map_err(|_| invalid())
    }
}

/// Parses a `WIDTHxHEIGHT` screen size.
pub fn parse_size(value: &str) -> Result<(u16, u16)> {
    let (width, height) = value.split_once('x').ok_or_else(|| {
        DashError::config(format!(
            "Invalid size '{value}'. Expected WIDTHxHEIGHT, e.g. 120x40"
        ))
    })?;
    let width = width
        .trim()
        .parse::<u16>()
        .map_err(|_| DashError::config(format!("Invalid width '{width}'")))?;
    let height = height
        .trim()
        .parse::<u16>()
        .map_err(|_| DashError::config(format!("Invalid height '{height}'")))?;
    if width == 0 || height == 0 {
        return Err(DashError::config(format!(
            "Invalid size '{value}'. Width and height must be positive"
        )));
    }
    Ok((width, height))
}

fn parse_assertion(value: &str) -> Result<Assertion> {
    let (kind, rest) = value.split_once(':').ok_or_else(|| {
        DashError::config(format!(
            "Invalid assertion '{value}'. Expected assert:kind:value"
        ))
    })?;
    let rest = rest.trim();

    match kind.trim().to_lowercase().as_str() {
        "contains" => Ok(Assertion::Contains(rest.to_string())),
        "contains-exact" => Ok(Assertion::ContainsExact(rest.to_string())),
        "not-contains" => Ok(Assertion::NotContains(rest.to_string())),
        "matches" => Regex::new(rest)
            .map(Assertion::Matches)
            .map_err(|e| DashError::config(format!("Invalid pattern '{rest}': {e}"))),
        "state" => parse_state_assertion(rest),
        other => Err(DashError::config(format!(
            "Unknown assertion '{other}'. Valid assertions: contains, contains-exact, not-contains, matches, state"
        ))),
    }
}

/// Parses `focus=UserId` or `city_count>=3`.
fn parse_state_assertion(value: &str) -> Result<Assertion> {
    // Two-character operators first so `>=` is not read as `>`.
    for op in [">=", "<=", ">", "<", "="] {
        if let Some((field, expected)) = value.split_once(op) {
            return Ok(Assertion::State {
                field: field.trim().to_string(),
                op,
                value: expected.trim().to_string(),
            });
        }
    }
    Err(DashError::config(format!(
        "Invalid state assertion '{value}'. Expected field=value or field>=value"
    )))
}
