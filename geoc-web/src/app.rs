use std::rc::Rc;

use geoc_shared::config::HostConfig;
use geoc_shared::controller::Outcome;
use geoc_shared::error::GeocError;
use geoc_shared::scene::{Guest, ShapeKind};
use geoc_shared::selection::SelectionSet;
use js_sys::{Reflect, WebAssembly};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlCanvasElement;

use crate::env;
use crate::guest::WasmGuest;
use crate::host::Host;
use crate::input;

fn js_err(e: GeocError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn outcome_name(outcome: Outcome) -> String {
    match outcome {
        Outcome::Scheduled(id) => format!("scheduled {id}"),
        Outcome::IdleStarted => "idle-started".into(),
        Outcome::IdleStopped => "idle-stopped".into(),
        Outcome::Applied => "applied".into(),
        Outcome::Ignored => "ignored".into(),
    }
}

/// Handle held by the page's UI script.
#[wasm_bindgen]
pub struct GeocApp {
    host: Rc<Host>,
}

impl GeocApp {
    /// Find the canvas, instantiate the guest against the `env` imports and
    /// run its `_start`.
    pub async fn launch(
        canvas_id: &str,
        guest_bytes: &[u8],
        config_toml: Option<String>,
    ) -> Result<GeocApp, JsValue> {
        let config = match config_toml {
            Some(source) => HostConfig::from_toml_str(&source).map_err(js_err)?,
            None => HostConfig::default(),
        };

        let window = web_sys::window().ok_or("No window")?;
        let document = window.document().ok_or("No document")?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or("Canvas not found")?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| "Element is not a canvas")?;

        let host = Host::new(config, canvas).map_err(js_err)?;
        let imports = env::imports(&host)?;
        let instantiated = JsFuture::from(WebAssembly::instantiate_buffer(guest_bytes, &imports)).await?;
        let instance: WebAssembly::Instance =
            Reflect::get(&instantiated, &JsValue::from_str("instance"))?.dyn_into()?;
        let mut guest = WasmGuest::from_instance(&instance).map_err(js_err)?;
        host.attach_guest(guest.clone());
        input::attach(&host)?;

        log::info!("guest instantiated, calling _start");
        guest.call_export("_start", &[]).map_err(js_err)?;
        Ok(GeocApp { host })
    }
}

#[wasm_bindgen]
impl GeocApp {
    // ── transforms ──

    /// Rotate the selection by per-axis angles in radians. Blank fields are
    /// zero; an empty selection toggles idle rotation instead.
    pub fn rotate(&self, x: &str, y: &str, z: &str) -> Result<String, JsValue> {
        let outcome = self
            .host
            .with_scene(|c, g| c.rotate(g, [x, y, z]))
            .map_err(js_err)?;
        self.host.handle_outcome(outcome).map(outcome_name).map_err(js_err)
    }

    pub fn scale(&self, factor: &str) -> Result<String, JsValue> {
        let outcome = self.host.with_scene(|c, g| c.scale(g, factor)).map_err(js_err)?;
        self.host.handle_outcome(outcome).map(outcome_name).map_err(js_err)
    }

    pub fn translate(&self, x: &str, y: &str, z: &str) -> Result<String, JsValue> {
        let outcome = self
            .host
            .with_scene(|c, g| c.translate(g, [x, y, z]))
            .map_err(js_err)?;
        self.host.handle_outcome(outcome).map(outcome_name).map_err(js_err)
    }

    /// Mirror the selection. `flags` is a bitmask: x = 1, y = 2, z = 4.
    pub fn reflect(&self, flags: u32) -> Result<String, JsValue> {
        let outcome = self.host.with_scene(|c, g| c.reflect(g, flags)).map_err(js_err)?;
        self.host.handle_outcome(outcome).map(outcome_name).map_err(js_err)
    }

    // ── scene contents ──

    pub fn insert_vector(&self, x: &str, y: &str, z: &str) -> Result<(), JsValue> {
        self.host
            .with_scene(|c, g| c.insert_vector(g, [x, y, z]))
            .map_err(js_err)
    }

    pub fn insert_camera(&self, x: &str, y: &str, z: &str) -> Result<(), JsValue> {
        self.host
            .with_scene(|c, g| c.insert_camera(g, [x, y, z]))
            .map_err(js_err)
    }

    /// `name` is one of `cube`, `pyramid`, `sphere`, `cone`.
    pub fn insert_shape(&self, name: &str) -> Result<(), JsValue> {
        let kind = ShapeKind::from_name(name)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown shape {name:?}")))?;
        self.host
            .with_scene(|c, g| c.insert_shape(g, kind))
            .map_err(js_err)
    }

    pub fn clear(&self) -> Result<(), JsValue> {
        self.host.clear_scene().map_err(js_err)
    }

    pub fn select(&self, vectors: Vec<u32>, shapes: Vec<u32>, cameras: Vec<u32>) -> Result<(), JsValue> {
        let selection = SelectionSet::new(vectors, shapes, cameras);
        self.host.with_scene(|c, g| c.select(g, selection)).map_err(js_err)
    }

    // ── view ──

    pub fn set_resolution(&self, resolution: f32) -> Result<(), JsValue> {
        self.host
            .with_scene(|c, g| c.set_resolution(g, resolution))
            .map_err(js_err)
    }

    pub fn set_perspective(&self, fov: f32, near: f32, far: f32) -> Result<(), JsValue> {
        self.host
            .resources()
            .set_perspective(fov, near, far)
            .map_err(js_err)
    }

    pub fn is_idle_rotating(&self) -> bool {
        self.host
            .controller()
            .map(|c| c.is_idle_rotating())
            .unwrap_or(false)
    }

    // ── shadow rows for the page's tables ──

    pub fn vector_rows(&self) -> Vec<String> {
        self.host
            .controller()
            .map(|c| c.shadow().vector_rows())
            .unwrap_or_default()
    }

    pub fn shape_rows(&self) -> Vec<String> {
        self.host
            .controller()
            .map(|c| c.shadow().shape_rows())
            .unwrap_or_default()
    }

    pub fn camera_rows(&self) -> Vec<String> {
        self.host
            .controller()
            .map(|c| c.shadow().camera_rows())
            .unwrap_or_default()
    }
}
