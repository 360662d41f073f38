use std::f32::consts::TAU;

use glam::Vec3;

use crate::config::HostConfig;
use crate::error::{GeocError, Result};
use crate::scene::{EngineCall, Guest, ReflectAxes, SceneRef, ShapeKind};
use crate::scheduler::{AnimationPlan, RunId, TransformScheduler};
use crate::selection::SelectionSet;
use crate::shadow::ShadowCopy;

/// Result of a UI-level transform request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// An animated run started; the caller drives it every tick interval.
    Scheduled(RunId),
    IdleStarted,
    IdleStopped,
    /// Applied in a single guest call.
    Applied,
    Ignored,
}

/// Parse one text field. Blank means "not given"; anything else must be a
/// finite number.
pub fn parse_component(text: &str) -> Result<Option<f32>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(GeocError::InvalidInput(text.to_string())),
    }
}

fn parse_vec3(fields: [&str; 3]) -> Result<[Option<f32>; 3]> {
    Ok([
        parse_component(fields[0])?,
        parse_component(fields[1])?,
        parse_component(fields[2])?,
    ])
}

fn or_zero(parsed: [Option<f32>; 3]) -> Vec3 {
    Vec3::new(
        parsed[0].unwrap_or(0.0),
        parsed[1].unwrap_or(0.0),
        parsed[2].unwrap_or(0.0),
    )
}

/// Owns the guest-facing scene state and routes every operation through it.
pub struct SceneController {
    scene: SceneRef,
    shadow: ShadowCopy,
    selection: SelectionSet,
    scheduler: TransformScheduler,
    idle_yaw: Option<f32>,
    idle_step: f32,
}

impl SceneController {
    pub fn new(config: &HostConfig) -> Self {
        Self {
            scene: SceneRef::new(),
            shadow: ShadowCopy::new(),
            selection: SelectionSet::default(),
            scheduler: TransformScheduler::new(&config.animation),
            idle_yaw: None,
            idle_step: config.idle.yaw_step,
        }
    }

    pub fn scene(&self) -> &SceneRef {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneRef {
        &mut self.scene
    }

    pub fn shadow(&self) -> &ShadowCopy {
        &self.shadow
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn scheduler(&self) -> &TransformScheduler {
        &self.scheduler
    }

    pub fn is_idle_rotating(&self) -> bool {
        self.idle_yaw.is_some()
    }

    // ── direct operations ──

    pub fn set_angles<G: Guest>(&self, guest: &mut G, pitch: f32, yaw: f32) -> Result<()> {
        self.scene.invoke(guest, &EngineCall::SetAngles { pitch, yaw })?;
        Ok(())
    }

    pub fn get_pitch<G: Guest>(&self, guest: &mut G) -> Result<f32> {
        Ok(self.scene.invoke(guest, &EngineCall::GetPitch)? as f32)
    }

    pub fn set_zoom<G: Guest>(&self, guest: &mut G, delta: f32) -> Result<()> {
        self.scene.invoke(guest, &EngineCall::SetZoom(delta))?;
        Ok(())
    }

    pub fn set_resolution<G: Guest>(&self, guest: &mut G, resolution: f32) -> Result<()> {
        self.scene.invoke(guest, &EngineCall::SetResolution(resolution))?;
        Ok(())
    }

    /// Insert one vector; blank fields are zero. All-blank input inserts the
    /// zero vector, not a batch of random vectors.
    pub fn insert_vector<G: Guest>(&mut self, guest: &mut G, fields: [&str; 3]) -> Result<()> {
        let v = or_zero(parse_vec3(fields)?);
        self.scene.invoke(guest, &EngineCall::InsertVector(v))?;
        self.shadow.insert_vector(v);
        Ok(())
    }

    pub fn insert_camera<G: Guest>(&mut self, guest: &mut G, fields: [&str; 3]) -> Result<()> {
        let at = or_zero(parse_vec3(fields)?);
        self.scene.invoke(guest, &EngineCall::InsertCamera(at))?;
        self.shadow.insert_camera();
        Ok(())
    }

    pub fn insert_shape<G: Guest>(&mut self, guest: &mut G, kind: ShapeKind) -> Result<()> {
        self.scene.invoke(guest, &EngineCall::InsertShape(kind))?;
        self.shadow.insert_shape(kind);
        Ok(())
    }

    /// Replace the selection and point the view at the last selected camera.
    pub fn select<G: Guest>(&mut self, guest: &mut G, selection: SelectionSet) -> Result<()> {
        self.selection = selection;
        self.scene
            .invoke(guest, &EngineCall::SetCamera(self.selection.last_camera()))?;
        Ok(())
    }

    /// Empty the scene. Returns the runs that were cancelled so their timers
    /// can be dropped. A failing guest clear leaves runs and shadow intact.
    pub fn clear<G: Guest>(&mut self, guest: &mut G) -> Result<Vec<RunId>> {
        self.scene.invoke(guest, &EngineCall::Clear)?;
        let cancelled = self.scheduler.cancel_all();
        self.shadow.clear();
        self.select(guest, SelectionSet::default())?;
        Ok(cancelled)
    }

    // ── transforms ──

    /// Rotate the selection by per-axis angles in radians. Blank fields or an
    /// empty selection toggle the idle rotation instead.
    pub fn rotate<G: Guest>(&mut self, guest: &mut G, fields: [&str; 3]) -> Result<Outcome> {
        let parsed = parse_vec3(fields)?;
        if self.selection.is_empty() || parsed.iter().all(Option::is_none) {
            return Ok(self.toggle_idle());
        }
        match AnimationPlan::rotate(or_zero(parsed), self.scheduler.frame_count()) {
            Ok(plan) => self.start(guest, plan),
            Err(GeocError::EmptyTransform) => Ok(Outcome::Ignored),
            Err(e) => Err(e),
        }
    }

    pub fn scale<G: Guest>(&mut self, guest: &mut G, field: &str) -> Result<Outcome> {
        let Some(factor) = parse_component(field)? else {
            return Ok(Outcome::Ignored);
        };
        if self.selection.is_empty() {
            return Ok(Outcome::Ignored);
        }
        match AnimationPlan::scale(factor, self.scheduler.frame_count()) {
            Ok(plan) => self.start(guest, plan),
            Err(GeocError::EmptyTransform) => Ok(Outcome::Ignored),
            Err(e) => Err(e),
        }
    }

    pub fn translate<G: Guest>(&mut self, guest: &mut G, fields: [&str; 3]) -> Result<Outcome> {
        let delta = or_zero(parse_vec3(fields)?);
        if self.selection.is_empty() {
            return Ok(Outcome::Ignored);
        }
        match AnimationPlan::translate(delta, self.scheduler.frame_count()) {
            Ok(plan) => self.start(guest, plan),
            Err(GeocError::EmptyTransform) => Ok(Outcome::Ignored),
            Err(e) => Err(e),
        }
    }

    /// Negate the selected axes in one guest call.
    pub fn reflect<G: Guest>(&mut self, guest: &mut G, flags: u32) -> Result<Outcome> {
        let axes = ReflectAxes::from_bits_truncate(flags);
        if self.selection.is_empty() || axes.is_empty() {
            return Ok(Outcome::Ignored);
        }
        let (lease, span) = self.scheduler.stage(guest.memory(), &self.selection)?;
        let result = self.scene.invoke(guest, &EngineCall::Reflect { span, axes });
        self.scheduler.release(lease);
        result?;
        self.shadow.reflect(&self.selection.vectors, axes);
        Ok(Outcome::Applied)
    }

    fn start<G: Guest>(&mut self, guest: &mut G, plan: AnimationPlan) -> Result<Outcome> {
        self.scene.entity()?;
        let id = self.scheduler.schedule(guest.memory(), &self.selection, plan)?;
        Ok(Outcome::Scheduled(id))
    }

    /// Drive one tick of a run. Returns true once the run has finished; a
    /// failing guest call retires the run and reports the error.
    pub fn tick<G: Guest>(&mut self, guest: &mut G, id: RunId) -> Result<bool> {
        let tick = self.scheduler.advance(id)?;
        if let Err(e) = self.scene.invoke(guest, &tick.call) {
            self.scheduler.retire(id);
            return Err(e);
        }
        tick.step.mirror(&mut self.shadow, self.scheduler.vector_targets(id));
        if tick.finished {
            self.scheduler.retire(id);
        }
        Ok(tick.finished)
    }

    /// Drop a run whose timer was stopped by the host.
    pub fn cancel(&mut self, id: RunId) -> bool {
        self.scheduler.retire(id).is_some()
    }

    /// Undo an outcome the host could not arm a timer for: a scheduled run is
    /// retired with its scratch lease, and a started idle rotation is stopped.
    pub fn revert(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Scheduled(id) => {
                self.cancel(id);
            }
            Outcome::IdleStarted => {
                self.stop_idle();
            }
            Outcome::IdleStopped | Outcome::Applied | Outcome::Ignored => {}
        }
    }

    // ── idle rotation ──

    fn toggle_idle(&mut self) -> Outcome {
        if self.idle_yaw.take().is_some() {
            log::debug!("idle rotation stopped");
            Outcome::IdleStopped
        } else if self.selection.vectors.is_empty() {
            self.idle_yaw = Some(0.0);
            log::debug!("idle rotation started");
            Outcome::IdleStarted
        } else {
            Outcome::Ignored
        }
    }

    pub fn stop_idle(&mut self) -> bool {
        self.idle_yaw.take().is_some()
    }

    /// Keep the current pitch and advance the yaw by one step.
    pub fn idle_tick<G: Guest>(&mut self, guest: &mut G) -> Result<()> {
        let Some(yaw) = self.idle_yaw else {
            return Ok(());
        };
        let pitch = self.get_pitch(guest)?;
        let yaw = (yaw + self.idle_step) % TAU;
        self.idle_yaw = Some(yaw);
        self.set_angles(guest, pitch, yaw)
    }
}
