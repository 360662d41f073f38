use crate::error::Result;
use crate::handle::{Handle, ResourceTable};
use crate::scene::{EngineCall, Guest, SceneRef};

/// A repeating guest callback registered through `setInterval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuestInterval {
    pub fn_ptr: u32,
    pub args_ptr: u32,
    pub args_len: u32,
    pub delay_ms: u32,
    /// Lifetime in ms; 0 repeats until cleared.
    pub timeout_ms: u32,
}

impl GuestInterval {
    pub fn expires(&self) -> bool {
        self.timeout_ms > 0
    }

    /// One firing: `apply(entity, fn_ptr, args_ptr, args_len)`.
    pub fn fire<G: Guest + ?Sized>(&self, scene: &SceneRef, guest: &mut G) -> Result<()> {
        scene.apply(guest, self.fn_ptr, self.args_ptr, self.args_len)
    }

    /// Hand the argument buffer back to the guest allocator.
    pub fn free_args<G: Guest + ?Sized>(&self, scene: &SceneRef, guest: &mut G) -> Result<()> {
        scene.invoke(
            guest,
            &EngineCall::FreeArgs {
                ptr: self.args_ptr,
                len: self.args_len,
            },
        )?;
        Ok(())
    }
}

/// Live guest intervals keyed by the handle returned to the guest.
///
/// Records are copied out before any guest call so the table is never
/// borrowed while the guest runs.
#[derive(Default)]
pub struct IntervalTable {
    table: ResourceTable<GuestInterval>,
}

impl IntervalTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, interval: GuestInterval) -> Result<Handle> {
        let handle = self.table.create(interval)?;
        log::debug!(
            "interval {handle}: fn {:#x} every {} ms, timeout {} ms",
            interval.fn_ptr,
            interval.delay_ms,
            interval.timeout_ms
        );
        Ok(handle)
    }

    pub fn get(&self, handle: Handle) -> Option<GuestInterval> {
        self.table.get(handle).copied()
    }

    /// `clearInterval`: forget the interval without freeing its arguments.
    pub fn clear(&mut self, handle: Handle) -> Option<GuestInterval> {
        let removed = self.table.destroy(handle);
        if removed.is_none() {
            log::warn!("clearInterval: no interval with handle {handle}");
        }
        removed
    }

    /// Timeout reached: remove the record and return it so the caller can
    /// free its arguments. `None` if it was cleared first.
    pub fn expire(&mut self, handle: Handle) -> Option<GuestInterval> {
        self.table.destroy(handle)
    }

    /// Remove everything, e.g. on teardown.
    pub fn drain(&mut self) -> Vec<Handle> {
        self.table.drain().into_iter().map(|(h, _)| h).collect()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
