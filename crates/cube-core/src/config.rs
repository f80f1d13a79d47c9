//! Widget configuration.
//!
//! Defaults come from `constants.rs`. The web front-end can override a few of
//! them through `data-*` attributes on the canvas.

use std::str::FromStr;

use crate::constants::*;
use crate::error::{Result, WidgetError};
use crate::scene::{Color, Dimensions};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corners {
    Square,
    Round,
}

/// Visual options for the presentation toggle button.
#[derive(Clone, Debug, PartialEq)]
pub struct ToggleStyle {
    pub color: String,
    pub background: bool,
    pub corners: Corners,
}

impl Default for ToggleStyle {
    fn default() -> Self {
        Self {
            color: "white".to_string(),
            background: false,
            corners: Corners::Square,
        }
    }
}

impl ToggleStyle {
    /// Inline CSS for the toggle element.
    pub fn css(&self) -> String {
        let background = if self.background {
            format!("background: {}; ", self.color)
        } else {
            "background: none; ".to_string()
        };
        let radius = match self.corners {
            Corners::Square => "0",
            Corners::Round => "999px",
        };
        format!(
            "color: {c}; {bg}border: 2px solid {c}; border-radius: {r}; \
             font: 600 13px system-ui, sans-serif; letter-spacing: 0.08em; \
             padding: 8px 14px; margin-top: 8px; cursor: pointer;",
            c = self.color,
            bg = background,
            r = radius,
        )
    }
}

/// Text shown on the toggle button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleLabel {
    Checking,
    EnterVr,
    ExitVr,
    NotAvailable,
}

impl ToggleLabel {
    /// `available` is `None` while the display query is still pending.
    pub fn for_state(available: Option<bool>, presenting: bool) -> Self {
        match (available, presenting) {
            (_, true) => ToggleLabel::ExitVr,
            (None, false) => ToggleLabel::Checking,
            (Some(true), false) => ToggleLabel::EnterVr,
            (Some(false), false) => ToggleLabel::NotAvailable,
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            ToggleLabel::Checking => "CHECKING VR…",
            ToggleLabel::EnterVr => "ENTER VR",
            ToggleLabel::ExitVr => "EXIT VR",
            ToggleLabel::NotAvailable => "VR NOT FOUND",
        }
    }

    pub fn enabled(&self) -> bool {
        matches!(self, ToggleLabel::EnterVr | ToggleLabel::ExitVr)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WidgetConfig {
    pub dimensions: Dimensions,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub standing_height: f32,
    pub cube_size: f32,
    pub cube_color: Color,
    pub cube_distance: f32,
    pub rotation_step: f32,
    pub skybox_size: f32,
    pub skybox_color: Color,
    pub background: Color,
    pub texture_path: String,
    pub texture_timeout_ms: u32,
    pub antialias: bool,
    pub toggle: ToggleStyle,
    pub log_level: log::Level,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        let [r, g, b] = CUBE_COLOR_RGB;
        let [br, bg, bb] = BACKGROUND_RGB;
        Self {
            dimensions: Dimensions::default(),
            fov_degrees: FIELD_OF_VIEW_DEG,
            near: NEAR_PLANE,
            far: FAR_PLANE,
            standing_height: DEFAULT_STANDING_HEIGHT,
            cube_size: CUBE_SIZE,
            cube_color: Color::from_rgb(r, g, b),
            cube_distance: CUBE_DISTANCE,
            rotation_step: ROTATION_STEP_RAD,
            skybox_size: SKYBOX_SIZE,
            skybox_color: Color::from_hex(SKYBOX_COLOR_HEX),
            background: Color::from_rgb(br, bg, bb),
            texture_path: TEXTURE_PATH.to_string(),
            texture_timeout_ms: TEXTURE_LOAD_TIMEOUT_MS,
            antialias: ANTIALIAS,
            toggle: ToggleStyle::default(),
            log_level: log::Level::Info,
        }
    }
}

impl WidgetConfig {
    /// Apply `data-*` attribute overrides. `lookup` returns the attribute value
    /// for a name such as `data-texture`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(path) = lookup("data-texture") {
            let path = path.trim();
            if path.is_empty() {
                return Err(WidgetError::InvalidConfig {
                    key: "data-texture",
                    value: path.to_string(),
                });
            }
            self.texture_path = path.to_string();
        }
        if let Some(v) = lookup("data-width") {
            self.dimensions.width = parse_positive("data-width", &v)?;
        }
        if let Some(v) = lookup("data-height") {
            self.dimensions.height = parse_positive("data-height", &v)?;
        }
        if let Some(v) = lookup("data-texture-timeout") {
            self.texture_timeout_ms = parse_positive("data-texture-timeout", &v)?;
        }
        if let Some(v) = lookup("data-log-level") {
            self.log_level =
                log::Level::from_str(v.trim()).map_err(|_| WidgetError::InvalidConfig {
                    key: "data-log-level",
                    value: v.clone(),
                })?;
        }
        Ok(self)
    }
}

fn parse_positive(key: &'static str, value: &str) -> Result<u32> {
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(WidgetError::InvalidConfig {
            key,
            value: value.to_string(),
        }),
    }
}
