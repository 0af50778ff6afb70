use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::FxError;

/// Colour themes available for the star surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Red,
    Blue,
    Green,
}

impl Theme {
    pub fn name(self) -> &'static str {
        match self {
            Theme::Red => "red",
            Theme::Blue => "blue",
            Theme::Green => "green",
        }
    }

    /// Four colour steps, darkest first.
    pub fn palette(self) -> &'static Palette {
        match self {
            Theme::Red => &RED,
            Theme::Blue => &BLUE,
            Theme::Green => &GREEN,
        }
    }
}

impl FromStr for Theme {
    type Err = FxError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(Theme::Red),
            "blue" => Ok(Theme::Blue),
            "green" => Ok(Theme::Green),
            _ => Err(FxError::UnknownPalette(value.to_string())),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Palette {
    pub steps: [&'static str; 4],
}

static RED: Palette = Palette {
    steps: ["#440000", "#ff6600", "#ffd236", "#ffe68f"],
};

static BLUE: Palette = Palette {
    steps: ["#001159", "#0072ff", "#00c7ff", "#90f6ff"],
};

static GREEN: Palette = Palette {
    steps: ["#00361f", "#47ca00", "#78ff00", "#c7ff67"],
};

impl Palette {
    pub fn colors(&self) -> [Vec3; 4] {
        self.steps.map(|hex| parse_hex_color(hex).unwrap_or(Vec3::ONE))
    }
}

/// Parses `#rrggbb` (leading `#` optional) into linear `[0, 1]` components.
pub fn parse_hex_color(value: &str) -> Option<Vec3> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16)
            .ok()
            .map(|v| v as f32 / 255.0)
    };
    Some(Vec3::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_hex_color("#ff0000"), Some(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(
            parse_hex_color("1a0107"),
            Some(Vec3::new(26.0 / 255.0, 1.0 / 255.0, 7.0 / 255.0))
        );
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn themes_resolve_by_name() {
        assert_eq!("Blue".parse::<Theme>().unwrap(), Theme::Blue);
        assert!(matches!(
            "purple".parse::<Theme>(),
            Err(FxError::UnknownPalette(name)) if name == "purple"
        ));
    }

    #[test]
    fn red_palette_runs_dark_to_light() {
        let colors = Theme::Red.palette().colors();
        assert_eq!(colors[0], Vec3::new(68.0 / 255.0, 0.0, 0.0));
        assert_eq!(colors[1], Vec3::new(1.0, 102.0 / 255.0, 0.0));
        let luminance = |c: Vec3| c.x + c.y + c.z;
        assert!(colors.windows(2).all(|w| luminance(w[0]) < luminance(w[1])));
    }
}
