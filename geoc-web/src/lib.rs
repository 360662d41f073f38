//! geoc browser host
//!
//! Instantiates the geometry engine guest module, gives it WebGL through the
//! `env` import object, and drives its animated transforms and render loop
//! from browser timers.

#[cfg(target_arch = "wasm32")]
mod app;
#[cfg(target_arch = "wasm32")]
mod env;
#[cfg(target_arch = "wasm32")]
mod guest;
#[cfg(target_arch = "wasm32")]
mod host;
mod input;
#[cfg(target_arch = "wasm32")]
mod render_loop;
#[cfg(target_arch = "wasm32")]
mod timers;
#[cfg(target_arch = "wasm32")]
mod webgl;

#[cfg(target_arch = "wasm32")]
pub use app::GeocApp;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Called when the WASM module loads.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"logger already initialised".into());
    }
    log::info!("geoc host initialized");
}

/// Launch the host on `canvas_id` with the guest module bytes and an optional
/// TOML host configuration.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub async fn launch(
    canvas_id: String,
    guest_bytes: Vec<u8>,
    config_toml: Option<String>,
) -> Result<GeocApp, JsValue> {
    GeocApp::launch(&canvas_id, &guest_bytes, config_toml).await
}
