use std::collections::HashMap;

use geoc_shared::handle::Handle;
use geoc_shared::scheduler::RunId;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

fn window() -> Result<web_sys::Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("No window"))
}

/// A browser interval that is cleared when dropped.
pub struct Interval {
    id: i32,
    _closure: Closure<dyn FnMut()>,
}

impl Interval {
    pub fn new(ms: u32, f: impl FnMut() + 'static) -> Result<Self, JsValue> {
        let closure = Closure::wrap(Box::new(f) as Box<dyn FnMut()>);
        let id = window()?.set_interval_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            ms as i32,
        )?;
        Ok(Self { id, _closure: closure })
    }
}

impl Drop for Interval {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            window.clear_interval_with_handle(self.id);
        }
    }
}

/// A one-shot browser timeout that is cancelled when dropped.
pub struct Timeout {
    id: i32,
    _closure: Closure<dyn FnMut()>,
}

impl Timeout {
    pub fn new(ms: u32, f: impl FnMut() + 'static) -> Result<Self, JsValue> {
        let closure = Closure::wrap(Box::new(f) as Box<dyn FnMut()>);
        let id = window()?.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            ms as i32,
        )?;
        Ok(Self { id, _closure: closure })
    }
}

impl Drop for Timeout {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            window.clear_timeout_with_handle(self.id);
        }
    }
}

/// Browser timers owned by the host. Removing an entry stops its timer.
#[derive(Default)]
pub struct Timers {
    pub runs: HashMap<RunId, Interval>,
    pub idle: Option<Interval>,
    /// Guest intervals plus the optional expiry timeout of each.
    pub guest: HashMap<Handle, (Interval, Option<Timeout>)>,
}

impl Timers {
    pub fn stop_runs(&mut self, ids: &[RunId]) {
        for id in ids {
            self.runs.remove(id);
        }
    }

    pub fn clear(&mut self) {
        self.runs.clear();
        self.idle = None;
        self.guest.clear();
    }
}
