//! `dsulc --list` report

use std::fmt::Write;

use dsul_core::config::Config;
use dsul_core::telemetry::{HardwareBounds, HardwareTelemetry};

fn show<T: std::fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Render configured modes, colors, brightness bounds and hardware values
///
/// The hardware section is only present when the device reported a version.
pub fn render_information(
    config: &Config,
    bounds: HardwareBounds,
    telemetry: Option<&HardwareTelemetry>,
) -> String {
    let mut out = String::new();

    out.push_str("[modes]\n");
    for mode in &config.modes {
        let _ = writeln!(out, "- {}", mode.name);
    }

    out.push_str("\n[colors]\n");
    for color in &config.colors {
        let _ = writeln!(out, "- {}", color.name);
    }

    out.push_str("\n[brightness]\n");
    let _ = writeln!(out, "- min = {}", bounds.brightness_min);
    let _ = writeln!(out, "- max = {}", bounds.brightness_max);

    if let Some(hw) = telemetry.filter(|t| t.version.is_some()) {
        let mode = hw.current_mode.map(|ordinal| {
            config
                .modes
                .iter()
                .find(|m| m.value == ordinal)
                .map_or_else(|| ordinal.to_string(), |m| m.name.clone())
        });

        out.push_str("\n[hardware values]\n");
        let _ = writeln!(out, "- version = {}", show(&hw.version));
        let _ = writeln!(out, "- leds = {}", show(&hw.led_count));
        let _ = writeln!(out, "- color = {}", show(&hw.current_color));
        let _ = writeln!(out, "- mode = {}", show(&mode));
        let _ = writeln!(out, "- brightness = {}", show(&hw.current_brightness));
        let _ = writeln!(out, "- dim = {}", show(&hw.current_dim));
    }

    out
}
