use std::cell::RefCell;
use std::rc::Weak;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

use crate::WebWidget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingFrame {
    Page(i32),
    Display(u32),
}

/// Owns the two frame callbacks and the handle of whichever one is pending.
/// At most one request is outstanding at a time.
pub struct FrameScheduler {
    page_tick: Closure<dyn FnMut(f64)>,
    display_tick: Closure<dyn FnMut(f64, web::XrFrame)>,
    pending: Option<PendingFrame>,
}

impl FrameScheduler {
    pub fn new(widget: Weak<RefCell<WebWidget>>) -> Self {
        let page_widget = widget.clone();
        let page_tick = Closure::wrap(Box::new(move |_ts: f64| {
            run_frame(&page_widget, None);
        }) as Box<dyn FnMut(f64)>);
        let display_tick = Closure::wrap(Box::new(move |_ts: f64, frame: web::XrFrame| {
            run_frame(&widget, Some(frame));
        }) as Box<dyn FnMut(f64, web::XrFrame)>);
        Self {
            page_tick,
            display_tick,
            pending: None,
        }
    }

    pub fn request_page(&mut self) {
        let Some(w) = web::window() else {
            return;
        };
        match w.request_animation_frame(self.page_tick.as_ref().unchecked_ref()) {
            Ok(id) => self.pending = Some(PendingFrame::Page(id)),
            Err(e) => log::error!("requestAnimationFrame failed: {:?}", e),
        }
    }

    pub fn request_display(&mut self, session: &web::XrSession) {
        let id = session.request_animation_frame(self.display_tick.as_ref().unchecked_ref());
        self.pending = Some(PendingFrame::Display(id));
    }

    /// Cancel the pending request. A display request can only be cancelled
    /// while its session is still around.
    pub fn cancel(&mut self, session: Option<&web::XrSession>) {
        match self.pending.take() {
            Some(PendingFrame::Page(id)) => {
                if let Some(w) = web::window() {
                    let _ = w.cancel_animation_frame(id);
                }
            }
            Some(PendingFrame::Display(id)) => {
                if let Some(session) = session {
                    session.cancel_animation_frame(id);
                }
            }
            None => {}
        }
    }

    /// The pending callback is running; forget its handle.
    pub fn fired(&mut self) {
        self.pending = None;
    }

    pub fn page_pending(&self) -> bool {
        matches!(self.pending, Some(PendingFrame::Page(_)))
    }

    pub fn display_pending(&self) -> bool {
        matches!(self.pending, Some(PendingFrame::Display(_)))
    }
}

fn run_frame(widget: &Weak<RefCell<WebWidget>>, xr_frame: Option<web::XrFrame>) {
    crate::with_widget(widget, |w| {
        if let Some(bridge) = w.bridge_mut() {
            bridge.begin_frame(xr_frame);
        }
        w.frame();
        if let Some(bridge) = w.bridge_mut() {
            bridge.end_frame();
        }
    });
}
