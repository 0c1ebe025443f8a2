//! Stage durations
//!
//! The visual stages are timed by CSS custom properties (`--t-flash`, ...).
//! They are read at call time, never cached, so a restyled page is picked
//! up by the next run.

use std::collections::HashMap;

/// Something that can hand back the raw text of a named duration parameter
pub trait DurationSource {
    fn raw(&self, name: &str) -> Option<String>;
}

/// Names of the six stage parameters
pub mod names {
    pub const FLASH: &str = "--t-flash";
    pub const SHAKE: &str = "--t-shake";
    pub const GLITCH: &str = "--t-glitch";
    pub const ZOOM: &str = "--t-zoom";
    pub const HOLD: &str = "--t-hold";
    pub const BLOOD: &str = "--t-blood";

    pub const ALL: [&str; 6] = [FLASH, SHAKE, GLITCH, ZOOM, HOLD, BLOOD];
}

/// Read a named duration in milliseconds (0 if absent or unparseable)
pub fn read_duration_ms(source: &dyn DurationSource, name: &str) -> f64 {
    source
        .raw(name)
        .map(|raw| parse_duration_ms(&raw))
        .unwrap_or(0.0)
}

/// Parse a CSS time value: `"80ms"`, `"0.4s"`, or a bare number (ms).
///
/// Like `parseFloat`, only the leading number matters. Garbage, negative
/// and non-finite values all read as 0.
pub fn parse_duration_ms(raw: &str) -> f64 {
    let v = raw.trim();
    let ms = if let Some(num) = v.strip_suffix("ms") {
        leading_number(num)
    } else if let Some(num) = v.strip_suffix('s') {
        leading_number(num).map(|secs| secs * 1000.0)
    } else {
        leading_number(v)
    };
    match ms {
        Some(ms) if ms.is_finite() && ms > 0.0 => ms,
        _ => 0.0,
    }
}

/// Longest `[+-]digits[.digits][e[+-]digits]` prefix, parsed
fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let mut seen_dot = false;
    let mut seen_digit = false;
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return None;
    }
    // exponent only counts with at least one digit after it
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let digits = bytes[exp_end..].iter().take_while(|b| b.is_ascii_digit()).count();
        if digits > 0 {
            end = exp_end + digits;
        }
    }
    s[..end].parse().ok()
}

/// Durations of the six stages (ms), snapshotted for one run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageDurations {
    pub flash: f64,
    pub shake: f64,
    pub glitch: f64,
    pub zoom: f64,
    pub hold: f64,
    pub blood: f64,
}

impl StageDurations {
    /// Read all six stages from the source right now
    pub fn read(source: &dyn DurationSource) -> Self {
        Self {
            flash: read_duration_ms(source, names::FLASH),
            shake: read_duration_ms(source, names::SHAKE),
            glitch: read_duration_ms(source, names::GLITCH),
            zoom: read_duration_ms(source, names::ZOOM),
            hold: read_duration_ms(source, names::HOLD),
            blood: read_duration_ms(source, names::BLOOD),
        }
    }

    /// When the zoomed-in monster hold ends and the blood starts
    pub fn hold_end(&self) -> f64 {
        self.zoom + self.hold
    }
}

/// In-memory style parameters (native preview and tests)
#[derive(Debug, Clone, Default)]
pub struct StyleMap {
    values: HashMap<String, String>,
}

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }

    /// The stock page timings
    pub fn page_defaults() -> Self {
        Self::new()
            .with(names::FLASH, "80ms")
            .with(names::SHAKE, "400ms")
            .with(names::GLITCH, "600ms")
            .with(names::ZOOM, "500ms")
            .with(names::HOLD, "300ms")
            .with(names::BLOOD, "250ms")
    }
}

impl DurationSource for StyleMap {
    fn raw(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}
