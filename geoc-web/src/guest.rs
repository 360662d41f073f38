use geoc_shared::error::{GeocError, Result};
use geoc_shared::memory::{check_range, LinearMemory};
use geoc_shared::scene::Guest;
use js_sys::{Array, Function, Object, Reflect, Uint8Array, WebAssembly};
use wasm_bindgen::{JsCast, JsValue};

/// Best-effort text for a thrown JS value.
pub fn describe(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    format!("{value:?}")
}

/// The guest's exported memory. A fresh `Uint8Array` view is built for every
/// access because `memory.grow` detaches the previous buffer.
#[derive(Clone)]
pub struct WasmMemory {
    memory: WebAssembly::Memory,
}

impl WasmMemory {
    pub fn new(memory: WebAssembly::Memory) -> Self {
        Self { memory }
    }

    fn view(&self) -> Uint8Array {
        Uint8Array::new(&self.memory.buffer())
    }
}

impl LinearMemory for WasmMemory {
    fn byte_len(&self) -> usize {
        self.view().length() as usize
    }

    fn read(&self, ptr: u32, len: u32) -> Result<Vec<u8>> {
        let view = self.view();
        let range = check_range(ptr, len, view.length() as usize)?;
        Ok(view.subarray(range.start as u32, range.end as u32).to_vec())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<()> {
        let view = self.view();
        let range = check_range(offset, bytes.len() as u32, view.length() as usize)?;
        view.subarray(range.start as u32, range.end as u32).copy_from(bytes);
        Ok(())
    }
}

/// An instantiated guest. Cloning shares the same JS instance.
#[derive(Clone)]
pub struct WasmGuest {
    exports: Object,
    memory: WasmMemory,
}

impl WasmGuest {
    pub fn from_instance(instance: &WebAssembly::Instance) -> Result<Self> {
        let exports = instance.exports();
        let memory = Reflect::get(&exports, &JsValue::from_str("memory"))
            .ok()
            .and_then(|m| m.dyn_into::<WebAssembly::Memory>().ok())
            .ok_or_else(|| GeocError::Environment("guest does not export `memory`".into()))?;
        Ok(Self {
            exports,
            memory: WasmMemory::new(memory),
        })
    }

    fn export(&self, name: &str) -> Option<Function> {
        Reflect::get(&self.exports, &JsValue::from_str(name))
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok())
    }

    pub fn has_export(&self, name: &str) -> bool {
        self.export(name).is_some()
    }
}

impl Guest for WasmGuest {
    type Memory = WasmMemory;

    fn memory(&mut self) -> &mut WasmMemory {
        &mut self.memory
    }

    fn call_export(&mut self, name: &str, args: &[f64]) -> Result<f64> {
        let function = self.export(name).ok_or_else(|| GeocError::GuestTrap {
            export: name.to_string(),
            message: "no such export".into(),
        })?;
        let js_args: Array = args.iter().map(|a| JsValue::from_f64(*a)).collect();
        let ret = function
            .apply(&JsValue::NULL, &js_args)
            .map_err(|e| GeocError::GuestTrap {
                export: name.to_string(),
                message: describe(&e),
            })?;
        Ok(ret.as_f64().unwrap_or(0.0))
    }
}
