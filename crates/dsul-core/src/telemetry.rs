//! Hardware telemetry
//!
//! Parses the status string the light returns for an information request,
//! e.g. `v001.002.003ll016lb000:150cc255000000cb100cm002cd1#`.
//!
//! Each field is extracted independently; a field whose pattern is absent
//! from the string is `None`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Responses longer than this are treated as telemetry rather than a status word
pub const TELEMETRY_MIN_LEN: usize = 4;

struct Patterns {
    version: Regex,
    led_count: Regex,
    brightness_bounds: Regex,
    current_color: Regex,
    current_brightness: Regex,
    current_mode: Regex,
    current_dim: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        version: Regex::new(r"v(\d{3})\.(\d{3})\.(\d{3})").unwrap(),
        led_count: Regex::new(r"ll(\d{3})").unwrap(),
        brightness_bounds: Regex::new(r"lb(\d{3}):(\d{3})").unwrap(),
        current_color: Regex::new(r"cc(\d{3})(\d{3})(\d{3})").unwrap(),
        current_brightness: Regex::new(r"cb(\d{3})").unwrap(),
        current_mode: Regex::new(r"cm(\d{3})").unwrap(),
        current_dim: Regex::new(r"cd(\d)").unwrap(),
    })
}

/// Capture group `n` of the first match as a number
fn capture_num<T: std::str::FromStr>(re: &Regex, info: &str, n: usize) -> Option<T> {
    re.captures(info)
        .and_then(|caps| caps.get(n))
        .and_then(|m| m.as_str().parse().ok())
}

/// Three numeric capture groups joined with `sep`, leading zeros removed
fn capture_triple(re: &Regex, info: &str, sep: &str) -> Option<String> {
    let caps = re.captures(info)?;
    let parts = (1..=3)
        .map(|i| caps.get(i).and_then(|m| m.as_str().parse::<u16>().ok()))
        .collect::<Option<Vec<u16>>>()?;
    Some(
        parts
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(sep),
    )
}

/// Snapshot of the device state parsed from its status string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareTelemetry {
    /// Firmware version as `major.minor.patch`
    pub version: Option<String>,
    /// Number of LEDs on the device
    pub led_count: Option<u16>,
    /// Brightness bounds reported by the firmware, `(min, max)`
    pub brightness_bounds: Option<(u16, u16)>,
    /// Current color as `r:g:b`
    pub current_color: Option<String>,
    /// Current brightness
    pub current_brightness: Option<u16>,
    /// Current display mode ordinal
    pub current_mode: Option<u16>,
    /// Current dim flag (0 or 1)
    pub current_dim: Option<u8>,
}

impl HardwareTelemetry {
    /// Parse a raw status string; never fails, absent fields stay `None`
    pub fn parse(info: &str) -> Self {
        let p = patterns();

        let brightness_bounds = p.brightness_bounds.captures(info).and_then(|caps| {
            let min = caps.get(1)?.as_str().parse().ok()?;
            let max = caps.get(2)?.as_str().parse().ok()?;
            Some((min, max))
        });

        Self {
            version: capture_triple(&p.version, info, "."),
            led_count: capture_num(&p.led_count, info, 1),
            brightness_bounds,
            current_color: capture_triple(&p.current_color, info, ":"),
            current_brightness: capture_num(&p.current_brightness, info, 1),
            current_mode: capture_num(&p.current_mode, info, 1),
            current_dim: capture_num(&p.current_dim, info, 1),
        }
    }

    /// Check if a response value looks like a telemetry string
    pub fn looks_like_telemetry(value: &str) -> bool {
        value.len() > TELEMETRY_MIN_LEN
    }

    /// Check if no field was present in the parsed string
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Brightness bounds, refreshed from telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareBounds {
    /// Lowest accepted brightness
    pub brightness_min: u16,
    /// Highest accepted brightness
    pub brightness_max: u16,
}

impl HardwareBounds {
    /// Create bounds from explicit values
    pub fn new(brightness_min: u16, brightness_max: u16) -> Self {
        Self {
            brightness_min,
            brightness_max,
        }
    }

    /// Apply reported bounds; a max of zero is ignored
    ///
    /// Returns true if anything changed.
    pub fn apply(&mut self, telemetry: &HardwareTelemetry) -> bool {
        let Some((min, max)) = telemetry.brightness_bounds else {
            return false;
        };

        let before = *self;
        self.brightness_min = min;
        if max > 0 {
            self.brightness_max = max;
        }
        if *self != before {
            tracing::info!(
                min = self.brightness_min,
                max = self.brightness_max,
                "brightness bounds updated from hardware"
            );
        }
        *self != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FULL: &str = "v001.002.003ll016lb000:150cc255000000cb100cm002cd1#";

    #[test]
    fn test_parse_full_status() {
        let t = HardwareTelemetry::parse(FULL);
        assert_eq!(t.version.as_deref(), Some("1.2.3"));
        assert_eq!(t.led_count, Some(16));
        assert_eq!(t.brightness_bounds, Some((0, 150)));
        assert_eq!(t.current_color.as_deref(), Some("255:0:0"));
        assert_eq!(t.current_brightness, Some(100));
        assert_eq!(t.current_mode, Some(2));
        assert_eq!(t.current_dim, Some(1));
    }

    #[test]
    fn test_fields_are_independent() {
        let t = HardwareTelemetry::parse("cm004xxcb050");
        assert_eq!(t.current_mode, Some(4));
        assert_eq!(t.current_brightness, Some(50));
        assert_eq!(t.version, None);
        assert_eq!(t.brightness_bounds, None);
        assert_eq!(t.current_color, None);
    }

    #[test]
    fn test_empty_and_garbage() {
        assert!(HardwareTelemetry::parse("").is_empty());
        assert!(HardwareTelemetry::parse("+!#").is_empty());
        // Two-digit color groups do not match the canonical pattern
        assert_eq!(HardwareTelemetry::parse("cc255000").current_color, None);
    }

    #[test]
    fn test_looks_like_telemetry() {
        assert!(!HardwareTelemetry::looks_like_telemetry("ok"));
        assert!(!HardwareTelemetry::looks_like_telemetry("nok"));
        assert!(HardwareTelemetry::looks_like_telemetry(FULL));
    }

    #[test]
    fn test_bounds_apply() {
        let mut bounds = HardwareBounds::new(0, 150);
        let t = HardwareTelemetry::parse("lb010:200");
        assert!(bounds.apply(&t));
        assert_eq!(bounds, HardwareBounds::new(10, 200));

        // Unchanged values report no change
        assert!(!bounds.apply(&t));
    }

    #[test]
    fn test_bounds_ignore_zero_max_and_absence() {
        let mut bounds = HardwareBounds::new(5, 150);
        assert!(bounds.apply(&HardwareTelemetry::parse("lb000:000")));
        assert_eq!(bounds, HardwareBounds::new(0, 150));

        assert!(!bounds.apply(&HardwareTelemetry::parse("v001.000.000")));
        assert_eq!(bounds, HardwareBounds::new(0, 150));
    }
}
