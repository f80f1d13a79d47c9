use instant::Instant;
use js_sys::{Function, Promise};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

use cube_core::{TextureData, TextureLoad, WidgetError};

const TIMEOUT_MARKER: &str = "timeout";

/// Load and decode an image into RGBA8, failing after `timeout_ms`.
pub async fn load_texture(path: &str, timeout_ms: u32) -> TextureLoad {
    let started = Instant::now();
    let fail = |reason: String| WidgetError::TextureLoad {
        path: path.to_string(),
        reason,
    };

    let window = web::window().ok_or_else(|| fail("no window".into()))?;
    let img = web::HtmlImageElement::new().map_err(|e| fail(format!("{:?}", e)))?;

    let loaded = Promise::new(&mut |resolve: Function, reject: Function| {
        img.set_onload(Some(&resolve));
        img.set_onerror(Some(&reject));
        let on_timeout = Closure::once_into_js(move || {
            let _ = reject.call1(&JsValue::NULL, &JsValue::from_str(TIMEOUT_MARKER));
        });
        let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            on_timeout.unchecked_ref(),
            timeout_ms as i32,
        );
    });
    img.set_src(path);

    let outcome = JsFuture::from(loaded).await;
    img.set_onload(None);
    img.set_onerror(None);
    if let Err(e) = outcome {
        if e.as_string().as_deref() == Some(TIMEOUT_MARKER) {
            return Err(WidgetError::TextureTimeout {
                path: path.to_string(),
                timeout_ms,
            });
        }
        return Err(fail("image failed to load".into()));
    }

    let texture = decode_rgba(&img).map_err(|e| fail(format!("{:#}", e)))?;
    log::info!(
        "[texture] {} {}x{} in {:.0} ms",
        path,
        texture.width(),
        texture.height(),
        started.elapsed().as_secs_f64() * 1000.0
    );
    Ok(texture)
}

/// Draw the image into a scratch 2D canvas and read the pixels back.
fn decode_rgba(img: &web::HtmlImageElement) -> anyhow::Result<TextureData> {
    let width = img.natural_width();
    let height = img.natural_height();
    let document = crate::dom::window_document().ok_or_else(|| anyhow::anyhow!("no document"))?;
    let canvas: web::HtmlCanvasElement = document
        .create_element("canvas")
        .map_err(crate::dom::js_err)?
        .dyn_into()
        .map_err(|e| anyhow::anyhow!("{:?}", e))?;
    canvas.set_width(width);
    canvas.set_height(height);
    let ctx: web::CanvasRenderingContext2d = canvas
        .get_context("2d")
        .map_err(crate::dom::js_err)?
        .ok_or_else(|| anyhow::anyhow!("2d context unavailable"))?
        .dyn_into()
        .map_err(|e| anyhow::anyhow!("{:?}", e))?;
    ctx.draw_image_with_html_image_element(img, 0.0, 0.0)
        .map_err(crate::dom::js_err)?;
    let data = ctx
        .get_image_data(0.0, 0.0, width as f64, height as f64)
        .map_err(crate::dom::js_err)?;
    Ok(TextureData::new(width, height, data.data().0)?)
}
