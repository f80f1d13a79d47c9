#![cfg(target_arch = "wasm32")]
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys as web;

use cube_core::{Widget, WidgetConfig};

mod dom;
mod frame;
mod render;
mod texture;
mod xr;

pub(crate) type WebWidget = Widget<render::GpuRenderer, xr::XrBridge>;
type SharedWidget = Rc<RefCell<WebWidget>>;

const AUTO_MOUNT_CANVAS_ID: &str = "cube-canvas";

thread_local! {
    static AUTO_MOUNTED: RefCell<Option<WidgetHandle>> = const { RefCell::new(None) };
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("cube-web starting");

    let Some(document) = dom::window_document() else {
        return Ok(());
    };
    let Some(element) = document.get_element_by_id(AUTO_MOUNT_CANVAS_ID) else {
        log::debug!("no #{} on the page; waiting for mount()", AUTO_MOUNT_CANVAS_ID);
        return Ok(());
    };
    let canvas: web::HtmlCanvasElement = element.dyn_into().map_err(JsValue::from)?;
    let root = canvas
        .parent_element()
        .ok_or_else(|| JsValue::from_str("#cube-canvas has no parent element"))?;
    spawn_local(async move {
        match mount_widget(canvas, root).await {
            Ok(handle) => AUTO_MOUNTED.with(|slot| *slot.borrow_mut() = Some(handle)),
            Err(e) => log::error!("mount error: {:?}", e),
        }
    });
    Ok(())
}

/// Mount a widget on `canvas`; the toggle button is appended to `root`.
#[wasm_bindgen]
pub async fn mount(
    canvas: web::HtmlCanvasElement,
    root: web::Element,
) -> Result<WidgetHandle, JsValue> {
    mount_widget(canvas, root)
        .await
        .map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}

async fn mount_widget(
    canvas: web::HtmlCanvasElement,
    root: web::Element,
) -> anyhow::Result<WidgetHandle> {
    let config = WidgetConfig::default().with_overrides(|key| canvas.get_attribute(key))?;
    log::set_max_level(config.log_level.to_level_filter());

    let renderer =
        render::GpuRenderer::new(&canvas, config.dimensions, dom::device_pixel_ratio()).await?;
    let texture_path = config.texture_path.clone();
    let timeout_ms = config.texture_timeout_ms;
    let widget: SharedWidget = Rc::new(RefCell::new(Widget::new(config, renderer)?));
    let listeners = install_listeners(&widget);

    let weak = Rc::downgrade(&widget);
    spawn_local(async move {
        let texture = texture::load_texture(&texture_path, timeout_ms).await;
        let Some(widget) = weak.upgrade() else {
            return;
        };
        let bridge = {
            let w = widget.borrow();
            xr::XrBridge::new(Rc::downgrade(&widget), root, w.config())
        };
        let assembled = widget.borrow_mut().on_texture_settled(texture, bridge);
        if let Err(e) = assembled {
            log::error!("scene assembly failed: {}", e);
        }
    });

    Ok(WidgetHandle { widget, listeners })
}

fn install_listeners(widget: &SharedWidget) -> Vec<dom::EventListener> {
    let mut listeners = Vec::new();

    let weak = Rc::downgrade(widget);
    if let Some(l) = dom::EventListener::on_window("resize", move |_| {
        with_widget(&weak, |w| w.on_resize());
    }) {
        listeners.push(l);
    }

    let weak = Rc::downgrade(widget);
    if let Some(l) = dom::EventListener::on_window(dom::PRESENT_CHANGE_EVENT, move |_| {
        with_widget(&weak, |w| {
            let presenting = w.is_presenting();
            w.on_presentation_change(presenting);
        });
    }) {
        listeners.push(l);
    }
    listeners
}

/// Run `f` against the widget if it is still alive and not already borrowed.
pub(crate) fn with_widget(widget: &Weak<RefCell<WebWidget>>, f: impl FnOnce(&mut WebWidget)) {
    let Some(widget) = widget.upgrade() else {
        return;
    };
    match widget.try_borrow_mut() {
        Ok(mut w) => f(&mut w),
        Err(_) => log::warn!("widget busy; callback skipped"),
    };
}

/// JS-facing handle to a mounted widget.
#[wasm_bindgen]
pub struct WidgetHandle {
    widget: SharedWidget,
    listeners: Vec<dom::EventListener>,
}

#[wasm_bindgen]
impl WidgetHandle {
    /// Stop the loop, end any session and remove the toggle and listeners.
    pub fn destroy(&mut self) {
        self.listeners.clear();
        match self.widget.try_borrow_mut() {
            Ok(mut w) => w.stop(),
            Err(_) => log::warn!("destroy while the widget is busy"),
        }
    }

    #[wasm_bindgen(js_name = isPresenting)]
    pub fn is_presenting(&self) -> bool {
        self.widget
            .try_borrow()
            .map(|w| w.is_presenting())
            .unwrap_or(false)
    }

    /// Frames rendered so far.
    pub fn frames(&self) -> f64 {
        self.widget
            .try_borrow()
            .map(|w| w.stats().frames as f64)
            .unwrap_or(0.0)
    }

    /// Why the skybox is missing, if its texture failed to load.
    pub fn diagnostic(&self) -> Option<String> {
        self.widget
            .try_borrow()
            .ok()
            .and_then(|w| w.diagnostic().map(|e| e.to_string()))
    }
}

impl Drop for WidgetHandle {
    fn drop(&mut self) {
        self.destroy();
    }
}
