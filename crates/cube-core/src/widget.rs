use std::rc::Rc;

use glam::{Quat, Vec3};

use crate::backend::{PresentationBridge, RenderBackend};
use crate::config::WidgetConfig;
use crate::constants::FRAME_LOG_INTERVAL;
use crate::error::{Result, WidgetError};
use crate::frame_loop::{ClockSource, FrameLoop, FrameStats, LoopState};
use crate::geometry::BoxGeometry;
use crate::scene::{Camera, Material, MeshKind, Scene, Side, TextureMap, Wrapping};
use crate::texture::{TextureData, TextureLoad};

/// The spinning cube view: owns the scene, the camera, the flat renderer and,
/// once the texture has settled, the presentation bridge.
pub struct Widget<R: RenderBackend, P: PresentationBridge> {
    config: WidgetConfig,
    scene: Scene,
    camera: Camera,
    renderer: R,
    bridge: Option<P>,
    frame_loop: FrameLoop,
    diagnostic: Option<WidgetError>,
}

impl<R: RenderBackend, P: PresentationBridge> Widget<R, P> {
    /// Size the renderer, place the camera at standing height and add the cube.
    pub fn new(config: WidgetConfig, mut renderer: R) -> Result<Self> {
        let dims = config.dimensions;
        renderer.set_size(dims);

        let mut camera = Camera::new(config.fov_degrees, dims.aspect(), config.near, config.far);
        camera.position = standing_position(&config);

        let mut scene = Scene::new(config.background);
        let cube_id = scene.add(
            MeshKind::Cube,
            BoxGeometry::new(config.cube_size),
            Material::basic(config.cube_color),
            Vec3::new(0.0, config.standing_height, -config.cube_distance),
        )?;
        if let Some(cube) = scene.get(cube_id) {
            renderer.create_mesh(cube)?;
        }
        log::info!(
            "[widget] created {}x{} cube={} at y={:.2}",
            dims.width,
            dims.height,
            config.cube_size,
            config.standing_height
        );

        Ok(Self {
            config,
            scene,
            camera,
            renderer,
            bridge: None,
            frame_loop: FrameLoop::new(),
            diagnostic: None,
        })
    }

    /// Second phase, once the skybox texture load has settled either way.
    ///
    /// On success the skybox is added; on failure the flat background stays and
    /// the error is kept as a diagnostic. The bridge is attached in both cases
    /// and its display query is started.
    pub fn on_texture_settled(&mut self, texture: TextureLoad, mut bridge: P) -> Result<()> {
        if self.bridge.is_some() {
            return Err(WidgetError::AlreadyAssembled);
        }
        if self.frame_loop.state() == LoopState::Stopped {
            log::debug!("[widget] texture settled after stop; not assembling");
            return Ok(());
        }
        let skybox = texture.and_then(|texture| self.add_skybox(texture));
        if let Err(e) = skybox {
            log::error!("[widget] skybox unavailable, using flat background: {}", e);
            self.diagnostic = Some(e);
        }

        bridge.set_size(self.config.dimensions);
        if let Err(e) = bridge.attach_toggle() {
            log::warn!("[widget] toggle control not attached: {}", e);
        }
        bridge.query_display();
        self.bridge = Some(bridge);
        Ok(())
    }

    fn add_skybox(&mut self, texture: TextureData) -> Result<()> {
        let size = self.config.skybox_size;
        let material = Material::basic(self.config.skybox_color)
            .with_map(TextureMap {
                texture: Rc::new(texture),
                repeat: [size, size],
                wrap: Wrapping::Repeat,
            })
            .with_side(Side::Back);
        let id = self.scene.add(
            MeshKind::Skybox,
            BoxGeometry::new(size),
            material,
            Vec3::ZERO,
        )?;
        let uploaded = match self.scene.get(id) {
            Some(skybox) => self.renderer.create_mesh(skybox),
            None => Ok(()),
        };
        if uploaded.is_err() {
            self.scene.remove(id);
        }
        uploaded?;
        log::info!("[widget] skybox added");
        Ok(())
    }

    /// Display query result. Starts the frame loop exactly once.
    pub fn on_display_settled(&mut self, result: Result<()>) {
        if self.frame_loop.state() == LoopState::Stopped {
            log::debug!("[widget] display settled after stop; not starting");
            return;
        }
        let Some(bridge) = self.bridge.as_mut() else {
            log::warn!("[widget] display settled before the scene was assembled");
            return;
        };
        let available = match result {
            Ok(()) => true,
            Err(e) => {
                log::info!("[widget] {}; using the page clock", e);
                false
            }
        };
        match self.frame_loop.start(available, bridge.is_presenting()) {
            Some(clock) => {
                log::info!("[widget] frame loop started on {:?} clock", clock);
                bridge.request_frame(clock);
            }
            None => log::warn!(
                "[widget] display settled again while {:?}; ignored",
                self.frame_loop.state()
            ),
        }
    }

    /// One frame: rotate, render (twice while presenting), reschedule.
    /// Returns the clock the next frame was requested from.
    pub fn frame(&mut self) -> Option<ClockSource> {
        if !self.frame_loop.is_running() {
            return None;
        }
        let bridge = self.bridge.as_mut()?;

        if let Some(cube) = self.scene.cube_mut() {
            cube.rotate_y(self.config.rotation_step);
        }

        let stats = &mut self.frame_loop.stats;
        stats.frames += 1;
        if bridge.is_presenting() {
            bridge.update_tracking(&mut self.camera);
            stats.normal_passes += 1;
            if let Err(e) = self.renderer.render(&self.scene, &self.camera) {
                stats.render_errors += 1;
                log::error!("render error: {}", e);
            }
            match bridge.render_stereo(&self.scene, &self.camera) {
                Ok(true) => stats.stereo_passes += 1,
                Ok(false) => {}
                Err(e) => {
                    stats.render_errors += 1;
                    log::error!("stereo render error: {}", e);
                }
            }
        } else {
            stats.normal_passes += 1;
            if let Err(e) = self.renderer.render(&self.scene, &self.camera) {
                stats.render_errors += 1;
                log::error!("render error: {}", e);
            }
        }
        if stats.frames % FRAME_LOG_INTERVAL == 0 {
            log::debug!("[frame] {:?}", stats);
        }

        let clock = self.frame_loop.next_clock(bridge.is_presenting());
        bridge.request_frame(clock);
        Some(clock)
    }

    /// Re-apply the fixed size to the stereo wrapper and the camera.
    /// The flat renderer's drawing buffer is left as sized at construction.
    pub fn on_resize(&mut self) {
        let dims = self.config.dimensions;
        if let Some(bridge) = self.bridge.as_mut() {
            bridge.set_size(dims);
        }
        self.camera.aspect = dims.aspect();
        self.camera.update_projection_matrix();
    }

    pub fn on_presentation_change(&mut self, presenting: bool) {
        log::info!("[widget] presenting={}", presenting);
        self.on_resize();
        if !presenting {
            self.camera
                .set_pose(standing_position(&self.config), Quat::IDENTITY);
        }
    }

    /// Stop the loop, cancel the pending frame and detach the bridge.
    pub fn stop(&mut self) {
        if self.frame_loop.state() == LoopState::Stopped {
            return;
        }
        self.frame_loop.stop();
        if let Some(bridge) = self.bridge.as_mut() {
            bridge.cancel_frame();
            bridge.detach();
        }
        log::info!("[widget] stopped after {} frames", self.frame_loop.stats.frames);
    }

    pub fn is_presenting(&self) -> bool {
        self.bridge.as_ref().is_some_and(|b| b.is_presenting())
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn bridge(&self) -> Option<&P> {
        self.bridge.as_ref()
    }

    pub fn bridge_mut(&mut self) -> Option<&mut P> {
        self.bridge.as_mut()
    }

    pub fn frame_loop(&self) -> &FrameLoop {
        &self.frame_loop
    }

    pub fn stats(&self) -> FrameStats {
        self.frame_loop.stats
    }

    /// Error that forced the fallback scene, if any.
    pub fn diagnostic(&self) -> Option<&WidgetError> {
        self.diagnostic.as_ref()
    }
}

fn standing_position(config: &WidgetConfig) -> Vec3 {
    Vec3::new(0.0, config.standing_height, 0.0)
}
