//! Time-sliced transforms.
//!
//! A transform on the current selection is split into equal ticks. The
//! selection's index array is written once into a scratch lease that belongs
//! to the run, then each tick replays the per-tick increment into the guest
//! through the same span. Runs never share a lease, so overlapping animations
//! cannot overwrite each other's indices.

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec3;

use crate::config::AnimationConfig;
use crate::error::{GeocError, Result};
use crate::math::{geometric_step, linear_step, Axis};
use crate::memory::{write_indices, LinearMemory, ScratchArena, ScratchLease};
use crate::scene::{EngineCall, IndexSpan};
use crate::selection::SelectionSet;
use crate::shadow::ShadowCopy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run#{}", self.0)
    }
}

/// The increment applied by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformStep {
    Rotate(Axis, f32),
    Scale(f32),
    Translate(Vec3),
}

impl TransformStep {
    pub fn call(&self, span: IndexSpan) -> EngineCall {
        match *self {
            TransformStep::Rotate(axis, angle) => EngineCall::Rotate {
                span,
                angles: axis.unit_scaled(angle),
            },
            TransformStep::Scale(factor) => EngineCall::Scale { span, factor },
            TransformStep::Translate(delta) => EngineCall::Translate { span, delta },
        }
    }

    /// Apply the same increment to the display copy.
    pub fn mirror(&self, shadow: &mut ShadowCopy, vectors: &[u32]) {
        match *self {
            TransformStep::Rotate(axis, angle) => shadow.rotate(vectors, axis, angle),
            TransformStep::Scale(factor) => shadow.scale(vectors, factor),
            TransformStep::Translate(delta) => shadow.translate(vectors, delta),
        }
    }
}

/// A transform broken into phases of identical ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationPlan {
    phases: Vec<(TransformStep, u32)>,
}

impl AnimationPlan {
    /// Rotation by `angles` radians: x, then y, then z, each over `frames`
    /// ticks. Zero components get no ticks.
    pub fn rotate(angles: Vec3, frames: u32) -> Result<Self> {
        let frames = frames.max(1);
        let phases: Vec<_> = Axis::ALL
            .into_iter()
            .filter_map(|axis| {
                let total = axis.component(angles);
                (total != 0.0).then(|| (TransformStep::Rotate(axis, total / frames as f32), frames))
            })
            .collect();
        if phases.is_empty() {
            return Err(GeocError::EmptyTransform);
        }
        Ok(Self { phases })
    }

    /// Uniform scale whose ticks compound to `factor`.
    pub fn scale(factor: f32, frames: u32) -> Result<Self> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(GeocError::InvalidInput(factor.to_string()));
        }
        if factor == 1.0 {
            return Err(GeocError::EmptyTransform);
        }
        let frames = frames.max(1);
        Ok(Self {
            phases: vec![(TransformStep::Scale(geometric_step(factor, frames)), frames)],
        })
    }

    pub fn translate(delta: Vec3, frames: u32) -> Result<Self> {
        if delta == Vec3::ZERO {
            return Err(GeocError::EmptyTransform);
        }
        let frames = frames.max(1);
        Ok(Self {
            phases: vec![(TransformStep::Translate(linear_step(delta, frames)), frames)],
        })
    }

    pub fn total_ticks(&self) -> u32 {
        self.phases.iter().map(|(_, ticks)| ticks).sum()
    }

    fn step_at(&self, tick: u32) -> Option<TransformStep> {
        let mut remaining = tick;
        for (step, ticks) in &self.phases {
            if remaining < *ticks {
                return Some(*step);
            }
            remaining -= ticks;
        }
        None
    }
}

/// One in-flight animated transform.
#[derive(Debug)]
pub struct AnimationRun {
    pub id: RunId,
    pub plan: AnimationPlan,
    pub elapsed: u32,
    pub lease: ScratchLease,
    pub span: IndexSpan,
    /// Vector indices targeted when the run started.
    pub vectors: Vec<u32>,
}

/// What the caller must do for one tick of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub run: RunId,
    pub step: TransformStep,
    pub call: EngineCall,
    pub finished: bool,
}

pub struct TransformScheduler {
    runs: BTreeMap<RunId, AnimationRun>,
    arena: ScratchArena,
    next_id: u64,
    frame_count: u32,
    tick_interval_ms: u32,
}

impl TransformScheduler {
    pub fn new(config: &AnimationConfig) -> Self {
        Self {
            runs: BTreeMap::new(),
            arena: ScratchArena::new(config.scratch_limit_bytes as usize),
            next_id: 0,
            frame_count: config.frame_count.max(1),
            tick_interval_ms: config.tick_interval_ms,
        }
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn tick_interval_ms(&self) -> u32 {
        self.tick_interval_ms
    }

    /// Lease scratch space and write the selection's combined index array
    /// into it.
    pub fn stage<M: LinearMemory + ?Sized>(
        &mut self,
        memory: &mut M,
        selection: &SelectionSet,
    ) -> Result<(ScratchLease, IndexSpan)> {
        let indices = selection.combined();
        let lease = self.arena.lease(memory.byte_len(), indices.len())?;
        if let Err(e) = write_indices(memory, lease.offset, &indices) {
            self.arena.release(lease);
            return Err(e);
        }
        let span = IndexSpan {
            ptr: lease.offset,
            len: indices.len() as u32,
            counts: selection.packed_counts(),
        };
        Ok((lease, span))
    }

    pub fn release(&mut self, lease: ScratchLease) {
        self.arena.release(lease);
    }

    /// Start a run over a non-empty selection.
    pub fn schedule<M: LinearMemory + ?Sized>(
        &mut self,
        memory: &mut M,
        selection: &SelectionSet,
        plan: AnimationPlan,
    ) -> Result<RunId> {
        let (lease, span) = self.stage(memory, selection)?;
        let id = RunId(self.next_id);
        self.next_id += 1;
        log::debug!("{id}: {} ticks over {} indices at {:#x}", plan.total_ticks(), span.len, span.ptr);
        self.runs.insert(
            id,
            AnimationRun {
                id,
                plan,
                elapsed: 0,
                lease,
                span,
                vectors: selection.vectors.clone(),
            },
        );
        Ok(id)
    }

    /// Consume the next tick of a run. The run stays registered until
    /// [`retire`](Self::retire) is called, even after its last tick.
    pub fn advance(&mut self, id: RunId) -> Result<Tick> {
        let run = self.runs.get_mut(&id).ok_or(GeocError::UnknownRun(id.0))?;
        let step = run.plan.step_at(run.elapsed).ok_or(GeocError::UnknownRun(id.0))?;
        run.elapsed += 1;
        Ok(Tick {
            run: id,
            step,
            call: step.call(run.span),
            finished: run.elapsed >= run.plan.total_ticks(),
        })
    }

    pub fn retire(&mut self, id: RunId) -> Option<AnimationRun> {
        let run = self.runs.remove(&id)?;
        self.arena.release(run.lease);
        log::debug!("{id}: retired after {} ticks", run.elapsed);
        Some(run)
    }

    /// Drop every run and return their ids so the caller can stop their timers.
    pub fn cancel_all(&mut self) -> Vec<RunId> {
        let ids: Vec<RunId> = self.runs.keys().copied().collect();
        for id in &ids {
            self.retire(*id);
        }
        ids
    }

    pub fn run(&self, id: RunId) -> Option<&AnimationRun> {
        self.runs.get(&id)
    }

    pub fn vector_targets(&self, id: RunId) -> &[u32] {
        self.runs.get(&id).map_or(&[][..], |run| run.vectors.as_slice())
    }

    pub fn active(&self) -> usize {
        self.runs.len()
    }

    /// Scratch bytes held by live runs.
    pub fn leased_bytes(&self) -> usize {
        self.arena.leased_bytes()
    }
}
