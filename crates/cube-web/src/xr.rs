use std::cell::RefCell;
use std::rc::Weak;

use glam::{Mat4, Quat, Vec3};
use smallvec::SmallVec;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys as web;

use cube_core::{
    Camera, ClockSource, Dimensions, PresentationBridge, Scene, ToggleLabel, ToggleStyle,
    WidgetConfig, WidgetError,
};

use crate::dom::{self, dom_err, js_err, EventListener, PRESENT_CHANGE_EVENT};
use crate::frame::FrameScheduler;
use crate::WebWidget;

mod stereo;

use stereo::{EyeView, StereoRenderer};

struct ActiveSession {
    session: web::XrSession,
    layer: web::XrWebGlLayer,
    space: web::XrReferenceSpace,
    _on_end: EventListener,
}

/// WebXR side of the widget: the toggle button, the immersive session and
/// the per-eye renderer.
pub struct XrBridge {
    widget: Weak<RefCell<WebWidget>>,
    root: web::Element,
    style: ToggleStyle,
    depth_range: (f32, f32),
    antialias: bool,
    dims: Dimensions,
    scheduler: FrameScheduler,
    available: Option<bool>,
    entering: bool,
    detached: bool,
    session: Option<ActiveSession>,
    stereo: Option<StereoRenderer>,
    toggle: Option<web::HtmlButtonElement>,
    click: Option<EventListener>,
    frame: Option<web::XrFrame>,
}

impl XrBridge {
    pub fn new(widget: Weak<RefCell<WebWidget>>, root: web::Element, config: &WidgetConfig) -> Self {
        Self {
            scheduler: FrameScheduler::new(widget.clone()),
            widget,
            root,
            style: config.toggle.clone(),
            depth_range: (config.near, config.far),
            antialias: config.antialias,
            dims: config.dimensions,
            available: None,
            entering: false,
            detached: false,
            session: None,
            stereo: None,
            toggle: None,
            click: None,
            frame: None,
        }
    }

    /// Called as a frame callback starts; `frame` is set on the display clock.
    pub fn begin_frame(&mut self, frame: Option<web::XrFrame>) {
        self.scheduler.fired();
        self.frame = frame;
    }

    pub fn end_frame(&mut self) {
        self.frame = None;
    }

    fn refresh_label(&self) {
        if let Some(toggle) = &self.toggle {
            let label = ToggleLabel::for_state(self.available, self.session.is_some());
            toggle.set_text_content(Some(label.text()));
            toggle.set_disabled(!label.enabled());
        }
    }

    fn set_available(&mut self, available: bool) {
        self.available = Some(available);
        self.refresh_label();
    }

    fn ensure_stereo(&mut self) -> anyhow::Result<&StereoRenderer> {
        if self.stereo.is_none() {
            let stereo = StereoRenderer::new(self.antialias)?;
            stereo.set_size(self.dims);
            self.stereo = Some(stereo);
        }
        self.stereo
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("stereo renderer missing"))
    }

    fn install(
        &mut self,
        session: web::XrSession,
        layer: web::XrWebGlLayer,
        space: web::XrReferenceSpace,
    ) {
        let weak = self.widget.clone();
        let on_end = EventListener::new(session.as_ref(), "end", move |_| on_session_end(&weak));
        // window callbacks may be paused while the headset is presenting
        if self.scheduler.page_pending() {
            self.scheduler.cancel(None);
            self.scheduler.request_display(&session);
        }
        self.session = Some(ActiveSession {
            session,
            layer,
            space,
            _on_end: on_end,
        });
        self.refresh_label();
        log::info!("[xr] session started");
    }

    fn end_session(&self) {
        if let Some(active) = &self.session {
            let _ = active.session.end();
        }
    }

    fn session_ended(&mut self) {
        let Some(active) = self.session.take() else {
            return;
        };
        self.frame = None;
        // a display request dies with its session
        if self.scheduler.display_pending() && !self.detached {
            self.scheduler.request_page();
        }
        self.refresh_label();
        log::info!("[xr] session ended");
        drop(active);
    }
}

impl PresentationBridge for XrBridge {
    fn attach_toggle(&mut self) -> cube_core::Result<()> {
        let document =
            dom::window_document().ok_or_else(|| WidgetError::Dom("no document".into()))?;
        let button: web::HtmlButtonElement = document
            .create_element("button")
            .map_err(dom_err)?
            .dyn_into()
            .map_err(|_| WidgetError::Dom("created element is not a button".into()))?;
        button
            .set_attribute("style", &self.style.css())
            .map_err(dom_err)?;
        button.set_class_name("cube-vr-toggle");
        self.root.append_child(&button).map_err(dom_err)?;

        let weak = self.widget.clone();
        self.click = Some(EventListener::new(button.as_ref(), "click", move |_| {
            on_toggle(&weak)
        }));
        self.toggle = Some(button);
        self.refresh_label();
        Ok(())
    }

    fn query_display(&mut self) {
        let weak = self.widget.clone();
        spawn_local(async move {
            let result = probe_immersive_support().await;
            crate::with_widget(&weak, |w| {
                if let Some(bridge) = w.bridge_mut() {
                    bridge.set_available(result.is_ok());
                }
                w.on_display_settled(result);
            });
        });
    }

    fn is_presenting(&self) -> bool {
        self.session.is_some()
    }

    fn request_frame(&mut self, clock: ClockSource) {
        match (clock, &self.session) {
            (ClockSource::Display, Some(active)) => self.scheduler.request_display(&active.session),
            _ => self.scheduler.request_page(),
        }
    }

    fn cancel_frame(&mut self) {
        self.scheduler
            .cancel(self.session.as_ref().map(|active| &active.session));
    }

    fn set_size(&mut self, dimensions: Dimensions) {
        self.dims = dimensions;
        if let Some(stereo) = &self.stereo {
            stereo.set_size(dimensions);
        }
    }

    fn update_tracking(&mut self, camera: &mut Camera) {
        let (Some(frame), Some(active)) = (&self.frame, &self.session) else {
            return;
        };
        if let Some(pose) = frame.get_viewer_pose(&active.space) {
            let transform = pose.transform();
            camera.set_pose(
                point_to_vec3(&transform.position()),
                point_to_quat(&transform.orientation()),
            );
        }
    }

    fn render_stereo(&mut self, scene: &Scene, _camera: &Camera) -> cube_core::Result<bool> {
        // page-clock frames while presenting carry no viewer pose
        let (Some(frame), Some(active)) = (&self.frame, &self.session) else {
            return Ok(false);
        };
        let Some(pose) = frame.get_viewer_pose(&active.space) else {
            return Ok(false);
        };
        let stereo = self
            .stereo
            .as_mut()
            .ok_or_else(|| WidgetError::Render("stereo renderer missing".into()))?;

        let mut eyes: SmallVec<[EyeView; 2]> = SmallVec::new();
        for value in pose.views().iter() {
            let view: web::XrView = value
                .dyn_into()
                .map_err(|_| WidgetError::Render("viewer pose holds a non-view".into()))?;
            let Some(viewport) = active.layer.get_viewport(&view) else {
                continue;
            };
            let (Some(projection), Some(eye_view)) = (
                mat4(&view.projection_matrix()),
                mat4(&view.transform().inverse().matrix()),
            ) else {
                continue;
            };
            eyes.push(EyeView {
                viewport: [viewport.x(), viewport.y(), viewport.width(), viewport.height()],
                projection,
                view: eye_view,
            });
        }
        stereo.render(scene, active.layer.framebuffer().as_ref(), &eyes)?;
        Ok(true)
    }

    fn detach(&mut self) {
        self.detached = true;
        self.click = None;
        if let Some(toggle) = self.toggle.take() {
            toggle.remove();
        }
        if let Some(active) = self.session.take() {
            let _ = active.session.end();
        }
        self.frame = None;
        log::debug!("[xr] detached");
    }
}

fn xr_system() -> Option<web::XrSystem> {
    let navigator = web::window()?.navigator();
    let xr = js_sys::Reflect::get(&navigator, &JsValue::from_str("xr")).ok()?;
    if xr.is_undefined() || xr.is_null() {
        return None;
    }
    xr.dyn_into().ok()
}

async fn probe_immersive_support() -> cube_core::Result<()> {
    let xr = xr_system()
        .ok_or_else(|| WidgetError::DisplayUnavailable("WebXR is not supported".into()))?;
    let supported = JsFuture::from(xr.is_session_supported(web::XrSessionMode::ImmersiveVr))
        .await
        .map_err(|e| WidgetError::DisplayUnavailable(format!("{:?}", e)))?;
    if supported.as_bool().unwrap_or(false) {
        Ok(())
    } else {
        Err(WidgetError::DisplayUnavailable(
            "immersive-vr sessions are not supported".into(),
        ))
    }
}

fn on_toggle(weak: &Weak<RefCell<WebWidget>>) {
    let mut entering = false;
    crate::with_widget(weak, |w| {
        if let Some(bridge) = w.bridge() {
            if bridge.is_presenting() {
                bridge.end_session();
            } else {
                entering = bridge.available == Some(true) && !bridge.entering;
            }
        }
    });
    if entering {
        let weak = weak.clone();
        spawn_local(async move {
            if let Err(e) = enter_session(weak).await {
                log::error!("[xr] could not enter immersive mode: {:#}", e);
            }
        });
    }
}

async fn enter_session(weak: Weak<RefCell<WebWidget>>) -> anyhow::Result<()> {
    let xr = xr_system().ok_or_else(|| anyhow::anyhow!("WebXR is not supported"))?;
    let (gl, depth_range) = {
        let widget = weak
            .upgrade()
            .ok_or_else(|| anyhow::anyhow!("widget dropped"))?;
        let mut w = widget
            .try_borrow_mut()
            .map_err(|_| anyhow::anyhow!("widget busy"))?;
        let bridge = w
            .bridge_mut()
            .ok_or_else(|| anyhow::anyhow!("widget not assembled"))?;
        let gl = bridge.ensure_stereo()?.context().clone();
        bridge.entering = true;
        (gl, bridge.depth_range)
    };

    let started = start_session(&xr, &gl, depth_range).await;

    let widget = weak
        .upgrade()
        .ok_or_else(|| anyhow::anyhow!("widget dropped"))?;
    {
        let mut w = widget
            .try_borrow_mut()
            .map_err(|_| anyhow::anyhow!("widget busy"))?;
        let bridge = w
            .bridge_mut()
            .ok_or_else(|| anyhow::anyhow!("widget not assembled"))?;
        bridge.entering = false;
        let (session, layer, space) = started?;
        if bridge.detached {
            let _ = session.end();
            return Ok(());
        }
        bridge.install(session, layer, space);
    }
    dom::dispatch_window_event(PRESENT_CHANGE_EVENT);
    Ok(())
}

async fn start_session(
    xr: &web::XrSystem,
    gl: &web::WebGl2RenderingContext,
    depth_range: (f32, f32),
) -> anyhow::Result<(web::XrSession, web::XrWebGlLayer, web::XrReferenceSpace)> {
    let init = web::XrSessionInit::new();
    let features = js_sys::Array::of1(&JsValue::from_str("local-floor"));
    js_sys::Reflect::set(&init, &JsValue::from_str("optionalFeatures"), &features)
        .map_err(js_err)?;
    let session: web::XrSession = JsFuture::from(
        xr.request_session_with_options(web::XrSessionMode::ImmersiveVr, &init),
    )
    .await
    .map_err(js_err)?
    .dyn_into()
    .map_err(js_err)?;

    match configure_session(&session, gl, depth_range).await {
        Ok((layer, space)) => Ok((session, layer, space)),
        Err(e) => {
            let _ = session.end();
            Err(e)
        }
    }
}

async fn configure_session(
    session: &web::XrSession,
    gl: &web::WebGl2RenderingContext,
    (near, far): (f32, f32),
) -> anyhow::Result<(web::XrWebGlLayer, web::XrReferenceSpace)> {
    let layer =
        web::XrWebGlLayer::new_with_web_gl2_rendering_context(session, gl).map_err(js_err)?;
    let state = web::XrRenderStateInit::new();
    state.set_base_layer(Some(&layer));
    state.set_depth_near(near as f64);
    state.set_depth_far(far as f64);
    session.update_render_state_with_state(&state);

    let space = match JsFuture::from(
        session.request_reference_space(web::XrReferenceSpaceType::LocalFloor),
    )
    .await
    {
        Ok(space) => space,
        Err(e) => {
            log::warn!("[xr] local-floor unavailable ({:?}); using local", e);
            JsFuture::from(session.request_reference_space(web::XrReferenceSpaceType::Local))
                .await
                .map_err(js_err)?
        }
    };
    let space: web::XrReferenceSpace = space.dyn_into().map_err(js_err)?;
    Ok((layer, space))
}

fn on_session_end(weak: &Weak<RefCell<WebWidget>>) {
    let mut ended = false;
    crate::with_widget(weak, |w| {
        if let Some(bridge) = w.bridge_mut() {
            ended = bridge.is_presenting();
            bridge.session_ended();
        }
    });
    if ended {
        dom::dispatch_window_event(PRESENT_CHANGE_EVENT);
    }
}

fn point_to_vec3(p: &web::DomPointReadOnly) -> Vec3 {
    Vec3::new(p.x() as f32, p.y() as f32, p.z() as f32)
}

fn point_to_quat(p: &web::DomPointReadOnly) -> Quat {
    Quat::from_xyzw(p.x() as f32, p.y() as f32, p.z() as f32, p.w() as f32).normalize()
}

fn mat4(values: &[f32]) -> Option<Mat4> {
    (values.len() >= 16).then(|| Mat4::from_cols_slice(values))
}
