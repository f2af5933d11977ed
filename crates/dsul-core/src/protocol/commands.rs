//! Protocol commands
//!
//! Defines the frames supported by the DSUL firmware and the validating
//! builders that turn user-facing values into frames.
//!
//! Each `get_*_string` builder returns `(frame, ok)`. When `ok` is false the
//! value is outside its declared bound and the frame must not be sent.

use crate::config::ColorEntry;

/// Frames understood by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Liveness check (`-?#`)
    Ping,

    /// Ask for the device status string (`-!#`)
    RequestInformation,

    /// Acknowledge (`+!#`)
    Acknowledge,

    /// Set LED color (`+lRRRGGGBBB#`)
    SetColor { red: u8, green: u8, blue: u8 },

    /// Set LED brightness (`+bBBB#`)
    SetBrightness(u16),

    /// Set display mode (`+mMMM#`)
    SetMode(u16),

    /// Enable or disable dimming (`+dD#`)
    SetDim(bool),
}

impl DeviceCommand {
    /// Render the ASCII frame sent to the device
    pub fn to_frame(&self) -> String {
        match self {
            DeviceCommand::Ping => "-?#".to_string(),
            DeviceCommand::RequestInformation => "-!#".to_string(),
            DeviceCommand::Acknowledge => "+!#".to_string(),
            DeviceCommand::SetColor { red, green, blue } => {
                format!("+l{:03}{:03}{:03}#", red, green, blue)
            }
            DeviceCommand::SetBrightness(value) => format!("+b{:03}#", value),
            DeviceCommand::SetMode(value) => format!("+m{:03}#", value),
            DeviceCommand::SetDim(dim) => format!("+d{}#", u8::from(*dim)),
        }
    }

    /// Check if this command expects the device to answer
    pub fn expects_response(&self) -> bool {
        !matches!(self, DeviceCommand::Acknowledge)
    }
}

/// Parse an `r:g:b` triple where every channel is 0-255
fn parse_rgb(value: &str) -> Option<(u8, u8, u8)> {
    let mut parts = value.split(':').map(|p| p.trim().parse::<u8>());
    let rgb = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(Ok(r)), Some(Ok(g)), Some(Ok(b)), None) => (r, g, b),
        _ => return None,
    };
    Some(rgb)
}

/// Build a set-color frame
///
/// `value` is either `R:G:B` or the name of a configured color. Unknown
/// names and channels outside 0-255 fail validation.
pub fn get_color_string(value: &str, colors: &[ColorEntry]) -> (String, bool) {
    let resolved = if value.contains(':') {
        Some(value)
    } else {
        colors
            .iter()
            .find(|c| c.name == value)
            .map(|c| c.value.as_str())
    };

    match resolved.and_then(parse_rgb) {
        Some((red, green, blue)) => (
            DeviceCommand::SetColor { red, green, blue }.to_frame(),
            true,
        ),
        None => (String::new(), false),
    }
}

/// Build a set-brightness frame, bounded by `min..=max`
pub fn get_brightness_string(value: &str, min: u16, max: u16) -> (String, bool) {
    match value.trim().parse::<u16>() {
        Ok(v) if (min..=max).contains(&v) => (DeviceCommand::SetBrightness(v).to_frame(), true),
        _ => (String::new(), false),
    }
}

/// Build a set-mode frame, bounded by `1..=mode_count`
pub fn get_mode_string(value: &str, mode_count: usize) -> (String, bool) {
    match value.trim().parse::<u16>() {
        Ok(v) if v >= 1 && usize::from(v) <= mode_count => {
            (DeviceCommand::SetMode(v).to_frame(), true)
        }
        _ => (String::new(), false),
    }
}

/// Build a set-dim frame; only `0` and `1` are accepted
pub fn get_dim_string(value: &str) -> (String, bool) {
    match value.trim() {
        "0" => (DeviceCommand::SetDim(false).to_frame(), true),
        "1" => (DeviceCommand::SetDim(true).to_frame(), true),
        _ => (String::new(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fixed_frames() {
        assert_eq!(DeviceCommand::Ping.to_frame(), "-?#");
        assert_eq!(DeviceCommand::RequestInformation.to_frame(), "-!#");
        assert_eq!(DeviceCommand::Acknowledge.to_frame(), "+!#");
        assert!(!DeviceCommand::Acknowledge.expects_response());
        assert!(DeviceCommand::Ping.expects_response());
    }

    #[test]
    fn test_color_string() {
        let colors = Config::default().colors;
        assert_eq!(
            get_color_string("255:000:000", &colors),
            ("+l255000000#".to_string(), true)
        );
        assert_eq!(
            get_color_string("1:22:3", &colors),
            ("+l001022003#".to_string(), true)
        );
        assert!(!get_color_string("256:0:0", &colors).1);
        assert!(!get_color_string("-1:0:0", &colors).1);
        assert!(!get_color_string("1:2", &colors).1);
        assert!(!get_color_string("1:2:3:4", &colors).1);
        assert!(!get_color_string("a:b:c", &colors).1);
    }

    #[test]
    fn test_color_name_resolution() {
        let colors = Config::default().colors;
        assert_eq!(
            get_color_string("orange", &colors),
            ("+l255020000#".to_string(), true)
        );
        assert!(!get_color_string("chartreuse", &colors).1);
    }

    #[test]
    fn test_brightness_string() {
        assert_eq!(
            get_brightness_string("100", 0, 150),
            ("+b100#".to_string(), true)
        );
        assert_eq!(get_brightness_string("0", 0, 150), ("+b000#".to_string(), true));
        assert!(!get_brightness_string("200", 0, 150).1);
        assert!(!get_brightness_string("5", 10, 150).1);
        assert!(!get_brightness_string("bright", 0, 150).1);
    }

    #[test]
    fn test_mode_string() {
        assert_eq!(get_mode_string("4", 4), ("+m004#".to_string(), true));
        assert_eq!(get_mode_string("1", 4), ("+m001#".to_string(), true));
        assert!(!get_mode_string("5", 4).1);
        assert!(!get_mode_string("0", 4).1);
        assert!(!get_mode_string("", 4).1);
    }

    #[test]
    fn test_dim_string() {
        assert_eq!(get_dim_string("1"), ("+d1#".to_string(), true));
        assert_eq!(get_dim_string("0"), ("+d0#".to_string(), true));
        assert!(!get_dim_string("2").1);
        assert!(!get_dim_string("yes").1);
    }
}
