// Host-side tests for the widget lifecycle and frame loop, driven through
// recording backends.

mod common;

use common::{texture, Call, Harness};
use cube_core::{
    ClockSource, Color, Dimensions, LoopState, MeshKind, Side, WidgetConfig, WidgetError,
};
use glam::{Mat4, Quat, Vec3};
use std::f32::consts::TAU;

#[test]
fn construction_adds_exactly_one_cube() {
    let h = Harness::new();
    let scene = h.widget.scene();
    assert_eq!(scene.count(MeshKind::Cube), 1);
    assert_eq!(scene.count(MeshKind::Skybox), 0);

    let cube = scene.cube().unwrap();
    assert_eq!(cube.material.color, Color::from_rgb(255, 96, 70));
    assert_eq!(cube.geometry.edge_length(), 0.25);
    assert_eq!(cube.position, Vec3::new(0.0, 1.6, -0.8));
    assert_eq!(h.widget.camera().position, Vec3::new(0.0, 1.6, 0.0));
}

#[test]
fn construction_sizes_renderer_then_uploads_cube() {
    let h = Harness::new();
    assert_eq!(
        h.calls(),
        vec![
            Call::RendererSetSize(Dimensions::new(350, 400)),
            Call::CreateMesh(MeshKind::Cube),
        ]
    );
}

#[test]
fn texture_success_adds_back_faced_skybox() {
    let mut h = Harness::new();
    let bridge = h.bridge();
    h.widget.on_texture_settled(Ok(texture()), bridge).unwrap();

    let scene = h.widget.scene();
    assert_eq!(scene.count(MeshKind::Skybox), 1);
    let skybox = scene.skybox().unwrap();
    assert_eq!(skybox.geometry.edge_length(), 5.0);
    assert_eq!(skybox.material.side, Side::Back);
    assert_eq!(skybox.material.color, Color::from_hex(0xb5e8fc));
    assert_eq!(skybox.material.uv_scale(), [5.0, 5.0]);
    assert!(h.widget.diagnostic().is_none());
}

#[test]
fn assembly_attaches_toggle_before_querying_display() {
    let mut h = Harness::new();
    h.clear_log();
    let bridge = h.bridge();
    h.widget.on_texture_settled(Ok(texture()), bridge).unwrap();
    assert_eq!(
        h.calls(),
        vec![
            Call::CreateMesh(MeshKind::Skybox),
            Call::BridgeSetSize(Dimensions::new(350, 400)),
            Call::AttachToggle,
            Call::QueryDisplay,
        ]
    );
}

#[test]
fn second_assembly_is_rejected() {
    let mut h = Harness::new();
    let bridge = h.bridge();
    h.widget.on_texture_settled(Ok(texture()), bridge).unwrap();
    let again = h.bridge();
    let err = h.widget.on_texture_settled(Ok(texture()), again).unwrap_err();
    assert_eq!(err, WidgetError::AlreadyAssembled);
    assert_eq!(h.widget.scene().count(MeshKind::Skybox), 1);
}

#[test]
fn each_frame_adds_fixed_rotation_regardless_of_presenting() {
    let mut h = Harness::started(Ok(()));
    let step = 0.03_f32;

    h.widget.frame();
    let a = h.widget.scene().cube().unwrap().rotation_y();
    assert!((a - step).abs() < 1e-6);

    h.set_presenting(true);
    h.widget.frame();
    let b = h.widget.scene().cube().unwrap().rotation_y();
    assert!(((b - a).rem_euclid(TAU) - step).abs() < 1e-6);

    h.set_presenting(false);
    for _ in 0..300 {
        h.widget.frame();
    }
    let expected = (step * 302.0).rem_euclid(TAU);
    let got = h.widget.scene().cube().unwrap().rotation_y();
    assert!((got - expected).abs() < 1e-3);
    assert!((0.0..TAU).contains(&got));
}

#[test]
fn flat_frame_renders_once() {
    let mut h = Harness::started(Ok(()));
    h.widget.frame();
    assert_eq!(
        h.calls(),
        vec![Call::Render, Call::RequestFrame(ClockSource::Page)]
    );
}

#[test]
fn presenting_frame_tracks_then_renders_twice() {
    let mut h = Harness::started(Ok(()));
    h.set_presenting(true);
    h.widget.frame();
    assert_eq!(
        h.calls(),
        vec![
            Call::UpdateTracking,
            Call::Render,
            Call::RenderStereo,
            Call::RequestFrame(ClockSource::Display),
        ]
    );
    assert_eq!(h.widget.camera().position, Vec3::new(0.1, 1.7, 0.2));

    let stats = h.widget.stats();
    assert_eq!(stats.frames, 1);
    assert_eq!(stats.normal_passes, 1);
    assert_eq!(stats.stereo_passes, 1);
}

#[test]
fn resize_recomputes_camera_projection() {
    let mut h = Harness::started(Ok(()));
    let before = h.widget.camera().projection_revision();
    h.widget.on_resize();

    let camera = h.widget.camera();
    assert_eq!(camera.aspect, 350.0 / 400.0);
    assert_eq!(camera.projection_revision(), before + 1);
    let expected = Mat4::perspective_rh(75f32.to_radians(), 350.0 / 400.0, 0.1, 1000.0);
    assert!(camera.projection_matrix().abs_diff_eq(expected, 1e-6));
}

#[test]
fn resize_touches_stereo_wrapper_but_not_renderer() {
    let mut h = Harness::started(Ok(()));
    h.widget.on_resize();
    assert_eq!(
        h.calls(),
        vec![Call::BridgeSetSize(Dimensions::new(350, 400))]
    );
}

#[test]
fn display_failure_falls_back_to_page_clock_once() {
    let mut h = Harness::new();
    let bridge = h.bridge();
    h.widget.on_texture_settled(Ok(texture()), bridge).unwrap();
    h.clear_log();

    h.widget
        .on_display_settled(Err(WidgetError::DisplayUnavailable("no xr".into())));
    assert_eq!(h.calls(), vec![Call::RequestFrame(ClockSource::Page)]);
    assert_eq!(h.widget.frame_loop().state(), LoopState::Running);
    assert!(!h.widget.frame_loop().display_available());

    // a late second answer must not start a second chain
    h.widget.on_display_settled(Ok(()));
    assert_eq!(h.count(&Call::RequestFrame(ClockSource::Page)), 1);
    assert_eq!(h.widget.frame_loop().requests(), 1);
}

#[test]
fn unavailable_display_keeps_page_clock_even_if_presenting() {
    let mut h = Harness::started(Err(WidgetError::DisplayUnavailable("none".into())));
    h.set_presenting(true);
    assert_eq!(h.widget.frame(), Some(ClockSource::Page));
}

#[test]
fn clock_follows_presentation_each_iteration() {
    let mut h = Harness::started(Ok(()));
    assert_eq!(h.widget.frame(), Some(ClockSource::Page));
    h.set_presenting(true);
    assert_eq!(h.widget.frame(), Some(ClockSource::Display));
    h.set_presenting(false);
    assert_eq!(h.widget.frame(), Some(ClockSource::Page));
    assert_eq!(h.widget.frame_loop().last_clock(), Some(ClockSource::Page));
}

#[test]
fn unsettled_texture_leaves_everything_idle() {
    let mut h = Harness::new();
    h.clear_log();

    assert_eq!(h.widget.frame(), None);
    h.widget.on_display_settled(Ok(()));
    assert_eq!(h.widget.frame(), None);

    assert_eq!(h.widget.scene().count(MeshKind::Skybox), 0);
    assert!(h.widget.bridge().is_none());
    assert_eq!(h.widget.frame_loop().state(), LoopState::Idle);
    assert_eq!(h.widget.scene().cube().unwrap().rotation_y(), 0.0);
    assert!(h.calls().is_empty());
}

#[test]
fn texture_failure_uses_fallback_scene_and_still_starts() {
    let mut h = Harness::new();
    let bridge = h.bridge();
    let failure = WidgetError::TextureTimeout {
        path: "assets/textures/box.png".into(),
        timeout_ms: 10_000,
    };
    h.widget
        .on_texture_settled(Err(failure.clone()), bridge)
        .unwrap();

    assert_eq!(h.widget.scene().count(MeshKind::Skybox), 0);
    assert_eq!(h.widget.diagnostic(), Some(&failure));
    assert_eq!(h.count(&Call::AttachToggle), 1);

    h.widget.on_display_settled(Ok(()));
    assert_eq!(h.widget.frame_loop().state(), LoopState::Running);
    h.widget.frame();
    assert!(h.widget.scene().cube().unwrap().rotation_y() > 0.0);
}

#[test]
fn render_errors_are_counted_and_loop_continues() {
    let mut h = Harness::started(Ok(()));
    h.widget.renderer_mut().fail_render = true;
    assert_eq!(h.widget.frame(), Some(ClockSource::Page));
    assert_eq!(h.widget.frame(), Some(ClockSource::Page));
    assert_eq!(h.widget.stats().render_errors, 2);
    assert_eq!(h.widget.stats().frames, 2);
}

#[test]
fn stop_cancels_and_detaches_then_ignores_frames() {
    let mut h = Harness::started(Ok(()));
    h.widget.frame();
    h.clear_log();

    h.widget.stop();
    assert_eq!(h.calls(), vec![Call::CancelFrame, Call::Detach]);
    assert_eq!(h.widget.frame_loop().state(), LoopState::Stopped);

    let angle = h.widget.scene().cube().unwrap().rotation_y();
    assert_eq!(h.widget.frame(), None);
    assert_eq!(h.widget.scene().cube().unwrap().rotation_y(), angle);

    h.widget.stop();
    assert_eq!(h.count(&Call::Detach), 1);
}

#[test]
fn leaving_presentation_restores_standing_pose() {
    let mut h = Harness::started(Ok(()));
    h.set_presenting(true);
    h.widget.frame();
    assert_ne!(h.widget.camera().orientation, Quat::IDENTITY);

    h.set_presenting(false);
    h.widget.on_presentation_change(false);
    let camera = h.widget.camera();
    assert_eq!(camera.position, Vec3::new(0.0, 1.6, 0.0));
    assert_eq!(camera.orientation, Quat::IDENTITY);
}

#[test]
fn custom_dimensions_flow_to_camera_and_renderer() {
    let config = WidgetConfig {
        dimensions: Dimensions::new(800, 400),
        ..WidgetConfig::default()
    };
    let h = Harness::with_config(config);
    assert_eq!(h.widget.camera().aspect, 2.0);
    assert_eq!(
        h.calls()[0],
        Call::RendererSetSize(Dimensions::new(800, 400))
    );
}

#[test]
fn texture_settling_after_stop_assembles_nothing() {
    let mut h = Harness::new();
    h.widget.stop();
    h.clear_log();

    let bridge = h.bridge();
    h.widget.on_texture_settled(Ok(texture()), bridge).unwrap();
    assert!(h.calls().is_empty());
    assert!(h.widget.bridge().is_none());
    assert_eq!(h.widget.scene().count(MeshKind::Skybox), 0);
}

#[test]
fn skybox_upload_failure_falls_back_and_still_starts() {
    let mut h = Harness::new();
    h.widget.renderer_mut().fail_upload = Some(MeshKind::Skybox);
    h.clear_log();

    let bridge = h.bridge();
    h.widget.on_texture_settled(Ok(texture()), bridge).unwrap();
    assert_eq!(h.widget.scene().count(MeshKind::Skybox), 0);
    assert_eq!(
        h.widget.diagnostic(),
        Some(&WidgetError::Render("out of memory".into()))
    );
    assert!(h.widget.bridge().is_some());
    assert_eq!(
        h.calls(),
        vec![
            Call::CreateMesh(MeshKind::Skybox),
            Call::BridgeSetSize(Dimensions::new(350, 400)),
            Call::AttachToggle,
            Call::QueryDisplay,
        ]
    );

    h.widget.on_display_settled(Ok(()));
    assert_eq!(h.widget.frame_loop().state(), LoopState::Running);
    assert_eq!(h.widget.frame(), Some(ClockSource::Page));
    assert!(h.widget.scene().cube().unwrap().rotation_y() > 0.0);
}

#[test]
fn stereo_errors_are_counted_and_loop_continues() {
    let mut h = Harness::started(Ok(()));
    h.set_presenting(true);
    h.widget.bridge_mut().unwrap().fail_stereo = true;

    assert_eq!(h.widget.frame(), Some(ClockSource::Display));
    assert_eq!(h.widget.frame(), Some(ClockSource::Display));
    let stats = h.widget.stats();
    assert_eq!(stats.frames, 2);
    assert_eq!(stats.normal_passes, 2);
    assert_eq!(stats.stereo_passes, 0);
    assert_eq!(stats.render_errors, 2);
}

#[test]
fn stereo_pass_without_a_target_is_not_counted() {
    let mut h = Harness::started(Ok(()));
    h.set_presenting(true);
    h.widget.bridge_mut().unwrap().stereo_target = false;

    h.widget.frame();
    let stats = h.widget.stats();
    assert_eq!(h.count(&Call::RenderStereo), 1);
    assert_eq!(stats.stereo_passes, 0);
    assert_eq!(stats.render_errors, 0);
}

#[test]
fn display_settling_after_stop_starts_nothing() {
    let mut h = Harness::new();
    let bridge = h.bridge();
    h.widget.on_texture_settled(Ok(texture()), bridge).unwrap();
    h.widget.stop();
    h.clear_log();

    h.widget.on_display_settled(Ok(()));
    assert_eq!(h.widget.frame_loop().state(), LoopState::Stopped);
    assert_eq!(h.count(&Call::RequestFrame(ClockSource::Page)), 0);
    assert_eq!(h.widget.frame_loop().requests(), 0);
}
