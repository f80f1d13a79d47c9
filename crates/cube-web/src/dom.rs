use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

use cube_core::Dimensions;

/// Fired on `window` when immersive presentation starts or stops.
pub const PRESENT_CHANGE_EVENT: &str = "cubepresentchange";

#[inline]
pub fn window_document() -> Option<web::Document> {
    web::window().and_then(|w| w.document())
}

/// Registered DOM listener; removed from its target when dropped.
pub struct EventListener {
    target: web::EventTarget,
    event: &'static str,
    closure: Closure<dyn FnMut(web::Event)>,
}

impl EventListener {
    pub fn new(
        target: &web::EventTarget,
        event: &'static str,
        mut handler: impl FnMut(web::Event) + 'static,
    ) -> Self {
        let closure =
            Closure::wrap(Box::new(move |ev: web::Event| handler(ev)) as Box<dyn FnMut(web::Event)>);
        if let Err(e) =
            target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        {
            log::warn!("add {} listener failed: {:?}", event, e);
        }
        Self {
            target: target.clone(),
            event,
            closure,
        }
    }

    pub fn on_window(event: &'static str, handler: impl FnMut(web::Event) + 'static) -> Option<Self> {
        let window = web::window()?;
        Some(Self::new(window.as_ref(), event, handler))
    }
}

impl Drop for EventListener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.closure.as_ref().unchecked_ref());
    }
}

pub fn dispatch_window_event(name: &str) {
    if let Some(window) = web::window() {
        match web::Event::new(name) {
            Ok(ev) => {
                let _ = window.dispatch_event(&ev);
            }
            Err(e) => log::warn!("event {} not dispatched: {:?}", name, e),
        }
    }
}

/// Size the canvas backing store for the device pixel ratio and pin its CSS size.
pub fn size_canvas(canvas: &web::HtmlCanvasElement, dims: Dimensions, pixel_ratio: f64) -> (u32, u32) {
    let (w_px, h_px) = dims.scaled(pixel_ratio);
    canvas.set_width(w_px);
    canvas.set_height(h_px);
    let style = canvas.style();
    let _ = style.set_property("width", &format!("{}px", dims.width));
    let _ = style.set_property("height", &format!("{}px", dims.height));
    (w_px, h_px)
}

pub fn device_pixel_ratio() -> f64 {
    web::window().map(|w| w.device_pixel_ratio()).unwrap_or(1.0)
}

pub fn js_err(e: wasm_bindgen::JsValue) -> anyhow::Error {
    anyhow::anyhow!("{:?}", e)
}

pub fn dom_err(e: wasm_bindgen::JsValue) -> cube_core::WidgetError {
    cube_core::WidgetError::Dom(format!("{:?}", e))
}
