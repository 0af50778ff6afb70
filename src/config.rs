use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::camera::CameraSettings;
use crate::interaction::{Interaction, ZoomMode, DEFAULT_WHEEL};
use crate::palette::{parse_hex_color, Theme};
use crate::planet::PlanetSettings;
use crate::star::StarSettings;

/// Canvas the web entry point mounts into when nothing else is configured.
pub const DEFAULT_CANVAS: &str = "header.header canvas";

/// Largest face texture a configuration may ask for.
pub const MAX_RESOLUTION: u32 = 4096;

/// Largest per-face subdivision a configuration may ask for.
pub const MAX_SEGMENTS: u32 = 512;

/// Which effect to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Star,
    Planet,
}

impl Mode {
    pub fn name(self) -> &'static str {
        match self {
            Mode::Star => "star",
            Mode::Planet => "planet",
        }
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "star" => Ok(Mode::Star),
            "planet" => Ok(Mode::Planet),
            other => Err(anyhow!("unknown mode `{other}`, expected star or planet")),
        }
    }
}

/// Everything needed to set up one effect.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub mode: Mode,
    pub canvas: String,
    pub star: StarSettings,
    pub camera: CameraSettings,
    pub wheel: f32,
    pub zoom: ZoomMode,
    pub planet: PlanetSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            canvas: DEFAULT_CANVAS.to_string(),
            star: StarSettings::default(),
            camera: CameraSettings::default(),
            wheel: DEFAULT_WHEEL,
            zoom: ZoomMode::default(),
            planet: PlanetSettings::default(),
        }
    }
}

impl Config {
    /// Parses a `<celestial>` document. Missing elements keep their defaults.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid configuration XML")?;
        let root = document.root_element();
        if !root.has_tag_name("celestial") {
            bail!(
                "expected a <celestial> root element, found <{}>",
                root.tag_name().name()
            );
        }

        let mut config = Config::default();
        if let Some(mode) = optional_text(&root, "mode") {
            config.mode = mode.parse()?;
        }
        if let Some(canvas) = optional_text(&root, "canvas") {
            config.canvas = canvas;
        }

        if let Some(star) = child(&root, "star") {
            let settings = &mut config.star;
            if let Some(palette) = optional_text(&star, "palette") {
                settings.theme = palette.parse::<Theme>()?;
            }
            settings.time_multiplier = parse_f32(
                optional_text(&star, "time-multiplier"),
                settings.time_multiplier,
            )
            .context("<time-multiplier>")?;
            settings.displacement =
                parse_f32(optional_text(&star, "displacement"), settings.displacement)
                    .context("<displacement>")?;
            if let Some(color) = optional_text(&star, "clear-color") {
                settings.clear_color = parse_hex_color(&color)
                    .ok_or_else(|| anyhow!("invalid <clear-color> `{color}`"))?;
            }
        }

        if let Some(camera) = child(&root, "camera") {
            let settings = &mut config.camera;
            settings.fov = parse_f32(optional_text(&camera, "fov"), settings.fov).context("<fov>")?;
            settings.near =
                parse_f32(optional_text(&camera, "near"), settings.near).context("<near>")?;
            settings.far = parse_f32(optional_text(&camera, "far"), settings.far).context("<far>")?;
            settings.distance = parse_f32(optional_text(&camera, "distance"), settings.distance)
                .context("<distance>")?;
            settings.easing =
                parse_f32(optional_text(&camera, "easing"), settings.easing).context("<easing>")?;
            config.wheel =
                parse_f32(optional_text(&camera, "wheel"), config.wheel).context("<wheel>")?;
            if let Some(zoom) = optional_text(&camera, "zoom") {
                config.zoom = match zoom.as_str() {
                    "fixed" => ZoomMode::Fixed,
                    "enabled" => ZoomMode::enabled(),
                    other => bail!("unknown zoom mode `{other}`, expected fixed or enabled"),
                };
            }
        }

        if let Some(planet) = child(&root, "planet") {
            let settings = &mut config.planet;
            settings.resolution = parse_u32(optional_text(&planet, "resolution"), settings.resolution)
                .context("<resolution>")?;
            settings.segments = parse_u32(optional_text(&planet, "segments"), settings.segments)
                .context("<segments>")?;
            settings.radius =
                parse_f32(optional_text(&planet, "radius"), settings.radius).context("<radius>")?;
            settings.bump_intensity = parse_f32(
                optional_text(&planet, "bump-intensity"),
                settings.bump_intensity,
            )
            .context("<bump-intensity>")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would produce an empty bake or a degenerate camera.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_RESOLUTION).contains(&self.planet.resolution) {
            bail!(
                "planet resolution must be in 1..={MAX_RESOLUTION}, got {}",
                self.planet.resolution
            );
        }
        if !(1..=MAX_SEGMENTS).contains(&self.planet.segments) {
            bail!(
                "planet segments must be in 1..={MAX_SEGMENTS}, got {}",
                self.planet.segments
            );
        }
        if !(self.camera.easing > 0.0 && self.camera.easing <= 1.0) {
            bail!("camera easing must be in (0, 1], got {}", self.camera.easing);
        }
        if !(self.camera.near > 0.0 && self.camera.far > self.camera.near) {
            bail!(
                "camera clip range {}..{} is empty",
                self.camera.near,
                self.camera.far
            );
        }
        Ok(())
    }

    pub fn interaction(&self) -> Interaction {
        Interaction::new(self.wheel, self.zoom)
    }
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(tag))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float `{value}`: {err}")),
        None => Ok(default),
    }
}

fn parse_u32(value: Option<String>, default: u32) -> Result<u32> {
    match value {
        Some(value) => value
            .parse::<u32>()
            .map_err(|err| anyhow!("failed to parse integer `{value}`: {err}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    const SAMPLE: &str = r#"
    <celestial>
        <mode>planet</mode>
        <canvas>#hero canvas</canvas>
        <star>
            <palette>green</palette>
            <displacement>0.05</displacement>
            <clear-color>#000000</clear-color>
        </star>
        <camera>
            <fov>60</fov>
            <wheel>800</wheel>
            <zoom>enabled</zoom>
        </camera>
        <planet>
            <resolution>256</resolution>
            <bump-intensity>3.5</bump-intensity>
        </planet>
    </celestial>
    "#;

    #[test]
    fn parse_config_overrides_defaults() {
        let config = Config::from_xml(SAMPLE).unwrap();
        assert_eq!(config.mode, Mode::Planet);
        assert_eq!(config.canvas, "#hero canvas");
        assert_eq!(config.star.theme, Theme::Green);
        assert_eq!(config.star.displacement, 0.05);
        assert_eq!(config.star.clear_color, Vec3::ZERO);
        assert_eq!(config.star.time_multiplier, 0.0005);
        assert_eq!(config.camera.fov, 60.0);
        assert_eq!(config.camera.distance, 10.0);
        assert_eq!(config.wheel, 800.0);
        assert_eq!(config.zoom, ZoomMode::enabled());
        assert_eq!(config.planet.resolution, 256);
        assert_eq!(config.planet.segments, 64);
        assert_eq!(config.planet.bump_intensity, 3.5);
    }

    #[test]
    fn empty_document_matches_defaults() {
        let config = Config::from_xml("<celestial/>").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.zoom, ZoomMode::Fixed);
        assert_eq!(config.canvas, DEFAULT_CANVAS);
    }

    #[test]
    fn rejects_unknown_values() {
        assert!(Config::from_xml("<celestial><mode>moon</mode></celestial>").is_err());
        assert!(Config::from_xml(
            "<celestial><star><palette>purple</palette></star></celestial>"
        )
        .is_err());
        assert!(Config::from_xml(
            "<celestial><camera><zoom>sometimes</zoom></camera></celestial>"
        )
        .is_err());
        assert!(Config::from_xml("<scene/>").is_err());
    }

    #[test]
    fn rejects_degenerate_settings() {
        let err = Config::from_xml(
            "<celestial><planet><resolution>0</resolution></planet></celestial>",
        )
        .unwrap_err();
        assert!(err.to_string().contains("resolution"));
        assert!(Config::from_xml(
            "<celestial><camera><easing>0</easing></camera></celestial>"
        )
        .is_err());
        assert!(Config::from_xml(
            "<celestial><camera><fov>wide</fov></camera></celestial>"
        )
        .is_err());
    }

    #[test]
    fn rejects_oversized_planets() {
        let err = Config::from_xml(
            "<celestial><planet><resolution>200000</resolution></planet></celestial>",
        )
        .unwrap_err();
        assert!(err.to_string().contains("resolution"));
        let err = Config::from_xml(
            "<celestial><planet><segments>100000</segments></planet></celestial>",
        )
        .unwrap_err();
        assert!(err.to_string().contains("segments"));

        let largest = format!(
            "<celestial><planet><resolution>{MAX_RESOLUTION}</resolution>\
             <segments>{MAX_SEGMENTS}</segments></planet></celestial>"
        );
        let config = Config::from_xml(&largest).unwrap();
        assert_eq!(config.planet.resolution, MAX_RESOLUTION);
        assert_eq!(config.planet.segments, MAX_SEGMENTS);
    }

    #[test]
    fn interaction_starts_at_configured_wheel() {
        let config = Config::from_xml(SAMPLE).unwrap();
        assert_eq!(config.interaction().mouse().wheel, 800.0);
    }
}
