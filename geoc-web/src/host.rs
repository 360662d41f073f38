//! The host context shared by the import object, timers and the public API.
//!
//! Each piece of state sits in its own `RefCell`. A guest call can re-enter
//! the host through imports, so no borrow of a cell that an import touches is
//! held across a guest call: the guest handle is cloned out, and scene
//! registration is copied before firing guest intervals.

use std::cell::{RefCell, RefMut};
use std::rc::{Rc, Weak};

use geoc_shared::config::HostConfig;
use geoc_shared::controller::{Outcome, SceneController};
use geoc_shared::error::{GeocError, Result};
use geoc_shared::handle::Handle;
use geoc_shared::interval::{GuestInterval, IntervalTable};
use geoc_shared::render::{FrameSurface, RenderLoop};
use geoc_shared::resources::GlResources;
use geoc_shared::scheduler::RunId;
use web_sys::HtmlCanvasElement;

use crate::guest::{WasmGuest, WasmMemory};
use crate::timers::{Interval, Timeout, Timers};
use crate::webgl::WebGl;

pub struct Host {
    this: Weak<Host>,
    config: HostConfig,
    canvas: HtmlCanvasElement,
    resources: RefCell<GlResources<WebGl>>,
    controller: RefCell<SceneController>,
    intervals: RefCell<IntervalTable>,
    timers: RefCell<Timers>,
    guest: RefCell<Option<WasmGuest>>,
    render: RefCell<Option<RenderLoop>>,
}

/// Canvas plus resource tables, borrowed per call by the frame loop.
struct HostSurface<'a> {
    canvas: &'a HtmlCanvasElement,
    resources: &'a RefCell<GlResources<WebGl>>,
}

impl FrameSurface for HostSurface<'_> {
    fn resize(&mut self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        self.resources.borrow_mut().resize(width, height);
    }

    fn viewport(&mut self, width: u32, height: u32) {
        self.resources.borrow().viewport(width, height);
    }
}

fn report<T>(what: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            log::error!("{what}: {e}");
            None
        }
    }
}

impl Host {
    pub fn new(config: HostConfig, canvas: HtmlCanvasElement) -> Result<Rc<Host>> {
        let gl = WebGl::from_canvas(&canvas)?;
        let mut perspective = config.perspective;
        if canvas.height() > 0 {
            perspective.aspect_ratio = canvas.width() as f32 / canvas.height() as f32;
        }
        let controller = SceneController::new(&config);
        Ok(Rc::new_cyclic(|this| Host {
            this: this.clone(),
            resources: RefCell::new(GlResources::new(gl, perspective)),
            controller: RefCell::new(controller),
            intervals: RefCell::new(IntervalTable::new()),
            timers: RefCell::new(Timers::default()),
            guest: RefCell::new(None),
            render: RefCell::new(None),
            config,
            canvas,
        }))
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    pub fn attach_guest(&self, guest: WasmGuest) {
        *self.guest.borrow_mut() = Some(guest);
    }

    pub fn guest(&self) -> Result<WasmGuest> {
        self.guest
            .borrow()
            .clone()
            .ok_or_else(|| GeocError::Environment("guest module is not instantiated".into()))
    }

    pub fn memory(&self) -> Result<WasmMemory> {
        let mut guest = self.guest()?;
        Ok(geoc_shared::scene::Guest::memory(&mut guest).clone())
    }

    pub fn resources(&self) -> RefMut<'_, GlResources<WebGl>> {
        self.resources.borrow_mut()
    }

    pub fn controller(&self) -> Result<RefMut<'_, SceneController>> {
        self.controller
            .try_borrow_mut()
            .map_err(|_| GeocError::Environment("scene is busy in another guest call".into()))
    }

    /// Run `f` against the controller with a fresh guest handle.
    pub fn with_scene<T>(&self, f: impl FnOnce(&mut SceneController, &mut WasmGuest) -> Result<T>) -> Result<T> {
        let mut guest = self.guest()?;
        let mut controller = self.controller()?;
        f(&mut controller, &mut guest)
    }

    // ── pointer input ──

    pub fn set_angles(&self, pitch: f32, yaw: f32) {
        report("setAngles", self.with_scene(|c, g| c.set_angles(g, pitch, yaw)));
    }

    pub fn set_zoom(&self, delta: f32) {
        report("setZoom", self.with_scene(|c, g| c.set_zoom(g, delta)));
    }

    // ── animated transforms ──

    /// Start the timers an outcome asks for. If a timer cannot be armed the
    /// outcome is reverted in the controller before the error is returned.
    pub fn handle_outcome(&self, outcome: Outcome) -> Result<Outcome> {
        if let Err(e) = self.arm(outcome) {
            if let Ok(mut controller) = self.controller() {
                controller.revert(outcome);
            }
            return Err(GeocError::Environment(crate::guest::describe(&e)));
        }
        Ok(outcome)
    }

    fn arm(&self, outcome: Outcome) -> std::result::Result<(), wasm_bindgen::JsValue> {
        match outcome {
            Outcome::Scheduled(id) => {
                let weak = self.this.clone();
                let interval = Interval::new(self.config.animation.tick_interval_ms, move || {
                    if let Some(host) = weak.upgrade() {
                        host.tick_run(id);
                    }
                })?;
                self.timers.borrow_mut().runs.insert(id, interval);
            }
            Outcome::IdleStarted => {
                let weak = self.this.clone();
                let interval = Interval::new(self.config.idle.interval_ms, move || {
                    if let Some(host) = weak.upgrade() {
                        host.idle_tick();
                    }
                })?;
                self.timers.borrow_mut().idle = Some(interval);
            }
            Outcome::IdleStopped => self.timers.borrow_mut().idle = None,
            Outcome::Applied | Outcome::Ignored => {}
        }
        Ok(())
    }

    fn scene_busy(&self) -> bool {
        self.controller.try_borrow_mut().is_err()
    }

    fn tick_run(&self, id: RunId) {
        // A guest call is in flight; the next tick picks this one up.
        if self.scene_busy() {
            return;
        }
        match self.with_scene(|c, g| c.tick(g, id)) {
            Ok(false) => return,
            Ok(true) => log::debug!("{id} finished"),
            Err(e) => {
                log::error!("transform tick: {e}");
                if let Ok(mut controller) = self.controller() {
                    controller.cancel(id);
                }
            }
        }
        self.timers.borrow_mut().runs.remove(&id);
    }

    fn idle_tick(&self) {
        if self.scene_busy() {
            return;
        }
        if report("idle rotation", self.with_scene(|c, g| c.idle_tick(g))).is_none() {
            if let Ok(mut controller) = self.controller() {
                controller.stop_idle();
            }
            self.timers.borrow_mut().idle = None;
        }
    }

    pub fn clear_scene(&self) -> Result<()> {
        let cancelled = self.with_scene(|c, g| c.clear(g))?;
        self.timers.borrow_mut().stop_runs(&cancelled);
        Ok(())
    }

    // ── render loop ──

    /// `run(scenePtr, drawFnPtr)`: (re)target the frame loop and start it on
    /// first use.
    pub fn start_render(&self, entity: u32, draw_fn: u32) -> Result<()> {
        let first = {
            let mut render = self
                .render
                .try_borrow_mut()
                .map_err(|_| GeocError::Environment("run() called from inside a frame".into()))?;
            let first = render.is_none();
            *render = Some(RenderLoop::new(entity, draw_fn, &self.config.render));
            first
        };
        if first {
            let host = self
                .this
                .upgrade()
                .ok_or_else(|| GeocError::Environment("host dropped".into()))?;
            crate::render_loop::start(host).map_err(|e| GeocError::Environment(crate::guest::describe(&e)))?;
        }
        log::info!("render loop targeting scene {entity:#x}");
        Ok(())
    }

    /// Draw one frame. Returns the throttle delay before the next one.
    pub fn render_frame(&self) -> Option<u32> {
        let mut guest = report("frame", self.guest())?;
        let size = (
            self.canvas.client_width().max(0) as u32,
            self.canvas.client_height().max(0) as u32,
        );
        let mut render = self.render.borrow_mut();
        let render = render.as_mut()?;
        let mut surface = HostSurface {
            canvas: &self.canvas,
            resources: &self.resources,
        };
        render.frame(size, &mut surface, &mut guest);
        render.next_delay_ms()
    }

    // ── guest intervals ──

    pub fn set_guest_interval(&self, interval: GuestInterval) -> Result<Handle> {
        let handle = self.intervals.borrow_mut().register(interval)?;
        let to_env = |e: wasm_bindgen::JsValue| GeocError::Environment(crate::guest::describe(&e));

        let weak = self.this.clone();
        let repeat = Interval::new(interval.delay_ms, move || {
            if let Some(host) = weak.upgrade() {
                host.fire_guest_interval(handle);
            }
        })
        .map_err(to_env)?;

        let expiry = if interval.expires() {
            let weak = self.this.clone();
            Some(
                Timeout::new(interval.timeout_ms, move || {
                    if let Some(host) = weak.upgrade() {
                        host.expire_guest_interval(handle);
                    }
                })
                .map_err(to_env)?,
            )
        } else {
            None
        };
        self.timers.borrow_mut().guest.insert(handle, (repeat, expiry));
        Ok(handle)
    }

    pub fn clear_guest_interval(&self, handle: Handle) {
        self.intervals.borrow_mut().clear(handle);
        self.timers.borrow_mut().guest.remove(&handle);
    }

    fn scene_snapshot(&self) -> Result<geoc_shared::scene::SceneRef> {
        Ok(self.controller()?.scene().clone())
    }

    fn fire_guest_interval(&self, handle: Handle) {
        let Some(record) = self.intervals.borrow().get(handle) else {
            return;
        };
        let result = self
            .scene_snapshot()
            .and_then(|scene| record.fire(&scene, &mut self.guest()?));
        report("interval apply", result);
    }

    fn expire_guest_interval(&self, handle: Handle) {
        let Some(record) = self.intervals.borrow_mut().expire(handle) else {
            return;
        };
        self.timers.borrow_mut().guest.remove(&handle);
        let result = self
            .scene_snapshot()
            .and_then(|scene| record.free_args(&scene, &mut self.guest()?));
        report("interval free", result);
    }

    /// `deinit`: stop every timer and release GL objects.
    pub fn shutdown(&self) {
        self.timers.borrow_mut().clear();
        self.intervals.borrow_mut().drain();
        self.resources.borrow_mut().deinit();
    }
}
