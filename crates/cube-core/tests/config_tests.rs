// Host-side tests for widget configuration defaults, overrides and the
// toggle control's presentation.

use cube_core::constants::*;
use cube_core::{Corners, Dimensions, ToggleLabel, ToggleStyle, WidgetConfig, WidgetError};
use std::collections::HashMap;

fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn defaults_match_fixed_parameters() {
    let c = WidgetConfig::default();
    assert_eq!(c.dimensions, Dimensions::new(350, 400));
    assert_eq!(c.fov_degrees, 75.0);
    assert_eq!(c.near, 0.1);
    assert_eq!(c.far, 1000.0);
    assert_eq!(c.cube_size, 0.25);
    assert_eq!(c.skybox_size, 5.0);
    assert_eq!(c.rotation_step, 0.03);
    assert_eq!(c.texture_path, "assets/textures/box.png");
    assert!(!c.antialias);
}

#[test]
#[allow(clippy::assertions_on_constants)]
fn constants_are_within_reasonable_bounds() {
    assert!(NEAR_PLANE > 0.0 && NEAR_PLANE < FAR_PLANE);
    assert!(FIELD_OF_VIEW_DEG > 0.0 && FIELD_OF_VIEW_DEG < 180.0);
    // the viewer must stand inside the skybox
    assert!(DEFAULT_STANDING_HEIGHT < SKYBOX_SIZE * 0.5);
    assert!(CUBE_DISTANCE < SKYBOX_SIZE * 0.5);
    assert!(ROTATION_STEP_RAD > 0.0);
    assert!(TEXTURE_LOAD_TIMEOUT_MS > 0);
}

#[test]
fn overrides_replace_selected_fields() {
    let a = attrs(&[
        ("data-texture", " textures/grid.png "),
        ("data-width", "640"),
        ("data-height", "480"),
        ("data-texture-timeout", "2500"),
        ("data-log-level", "debug"),
    ]);
    let c = WidgetConfig::default()
        .with_overrides(|k| a.get(k).cloned())
        .unwrap();
    assert_eq!(c.texture_path, "textures/grid.png");
    assert_eq!(c.dimensions, Dimensions::new(640, 480));
    assert_eq!(c.texture_timeout_ms, 2500);
    assert_eq!(c.log_level, log::Level::Debug);
    // untouched
    assert_eq!(c.cube_size, 0.25);
}

#[test]
fn no_overrides_keeps_defaults() {
    let c = WidgetConfig::default().with_overrides(|_| None).unwrap();
    assert_eq!(c, WidgetConfig::default());
}

#[test]
fn invalid_overrides_are_reported() {
    let a = attrs(&[("data-width", "0")]);
    let err = WidgetConfig::default()
        .with_overrides(|k| a.get(k).cloned())
        .unwrap_err();
    assert_eq!(
        err,
        WidgetError::InvalidConfig {
            key: "data-width",
            value: "0".into()
        }
    );

    let a = attrs(&[("data-log-level", "loud")]);
    assert!(WidgetConfig::default()
        .with_overrides(|k| a.get(k).cloned())
        .is_err());

    let a = attrs(&[("data-texture", "   ")]);
    assert!(WidgetConfig::default()
        .with_overrides(|k| a.get(k).cloned())
        .is_err());
}

#[test]
fn toggle_style_is_white_unfilled_and_square() {
    let style = ToggleStyle::default();
    assert_eq!(style.corners, Corners::Square);
    let css = style.css();
    assert!(css.contains("color: white;"));
    assert!(css.contains("background: none;"));
    assert!(css.contains("border-radius: 0;"));
}

#[test]
fn toggle_label_tracks_availability_and_presenting() {
    assert_eq!(ToggleLabel::for_state(None, false), ToggleLabel::Checking);
    assert_eq!(ToggleLabel::for_state(Some(true), false), ToggleLabel::EnterVr);
    assert_eq!(ToggleLabel::for_state(Some(false), false), ToggleLabel::NotAvailable);
    assert_eq!(ToggleLabel::for_state(Some(true), true), ToggleLabel::ExitVr);
    assert!(ToggleLabel::EnterVr.enabled());
    assert!(!ToggleLabel::NotAvailable.enabled());
    assert_eq!(ToggleLabel::ExitVr.text(), "EXIT VR");
}
