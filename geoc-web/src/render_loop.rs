use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::host::Host;

type FrameClosure = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

fn request_animation_frame(f: &Closure<dyn FnMut()>) -> Result<i32, JsValue> {
    web_sys::window()
        .ok_or("No window")?
        .request_animation_frame(f.as_ref().unchecked_ref())
}

fn set_timeout(f: &Closure<dyn FnMut()>, ms: u32) -> Result<i32, JsValue> {
    web_sys::window()
        .ok_or("No window")?
        .set_timeout_with_callback_and_timeout_and_arguments_0(f.as_ref().unchecked_ref(), ms as i32)
}

/// Start the frame loop. It re-arms itself on every display refresh, or
/// after `render.throttle_ms` when throttled, for the lifetime of the page.
pub fn start(host: Rc<Host>) -> Result<(), JsValue> {
    let frame: FrameClosure = Rc::new(RefCell::new(None));
    let rearm: FrameClosure = Rc::new(RefCell::new(None));

    {
        let frame = frame.clone();
        *rearm.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            if let Some(f) = frame.borrow().as_ref() {
                if let Err(e) = request_animation_frame(f) {
                    log::error!("requestAnimationFrame failed: {e:?}");
                }
            }
        }) as Box<dyn FnMut()>));
    }

    {
        let this = frame.clone();
        let rearm = rearm.clone();
        *frame.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            let armed = match host.render_frame() {
                Some(delay) => rearm.borrow().as_ref().map(|r| set_timeout(r, delay)),
                None => this.borrow().as_ref().map(request_animation_frame),
            };
            if let Some(Err(e)) = armed {
                log::error!("could not schedule next frame: {e:?}");
            }
        }) as Box<dyn FnMut()>));
    }

    let first = frame.borrow();
    request_animation_frame(first.as_ref().ok_or("frame closure missing")?)?;
    Ok(())
}
