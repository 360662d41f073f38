//! The `env` import object handed to the guest at instantiation.
//!
//! Every import is a Rust closure leaked for the page's lifetime. Pointer and
//! length pairs are resolved against a fresh view of guest memory on each
//! call. Failures that leave the guest without a resource it asked for are
//! thrown back into the guest; frame-time lookups of stale handles are
//! logged and skipped by the resource layer.

use std::rc::Rc;

use geoc_shared::error::{GeocError, Result};
use geoc_shared::handle::Handle;
use geoc_shared::interval::GuestInterval;
use geoc_shared::memory::{read_bytes, read_f32s, read_u32s, read_utf8};
use js_sys::{Array, Function, Object, Reflect};
use wasm_bindgen::closure::WasmClosure;
use wasm_bindgen::prelude::*;

use crate::host::Host;

/// Throw into the guest on error. Callers bind results to a local first so no
/// `RefCell` guard is alive when the exception skips this frame.
fn fatal<T>(what: &str, result: Result<T>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => wasm_bindgen::throw_str(&format!("{what}: {e}")),
    }
}

fn text(host: &Host, ptr: u32, len: u32) -> Result<String> {
    read_utf8(&host.memory()?, ptr, len)
}

fn install<T: ?Sized + WasmClosure>(env: &Object, name: &str, closure: Closure<T>) -> std::result::Result<(), JsValue> {
    Reflect::set(env, &JsValue::from_str(name), closure.as_ref())?;
    closure.forget();
    Ok(())
}

macro_rules! import {
    ($env:expr, $host:expr, $name:literal, |$h:ident $(, $arg:ident : $ty:ty)*| -> $ret:ty $body:block) => {{
        let $h = Rc::clone($host);
        let closure = Closure::wrap(Box::new(move |$($arg: $ty),*| -> $ret $body) as Box<dyn FnMut($($ty),*) -> $ret>);
        install($env, $name, closure)?;
    }};
}

/// `setSceneCallBack` takes nine arguments, more than a typed closure
/// accepts, so it is routed through a JS adapter that packs them.
fn install_scene_callback(env: &Object, host: &Rc<Host>) -> std::result::Result<(), JsValue> {
    let h = Rc::clone(host);
    let packed = Closure::wrap(Box::new(move |args: Array| {
        let values: Vec<u32> = args.iter().map(|v| v.as_f64().unwrap_or(0.0) as u32).collect();
        let result = match <[u32; 9]>::try_from(values) {
            Ok([entity, fn_ptrs @ ..]) => h
                .controller()
                .map(|mut c| c.scene_mut().register_positional(entity, fn_ptrs)),
            Err(values) => Err(GeocError::Environment(format!(
                "setSceneCallBack expects 9 arguments, got {}",
                values.len()
            ))),
        };
        fatal("setSceneCallBack", result);
    }) as Box<dyn FnMut(Array)>);

    let adapter = Function::new_with_args(
        "f",
        "return function () { return f(Array.prototype.slice.call(arguments)); };",
    );
    let shim = adapter.call1(&JsValue::NULL, packed.as_ref())?;
    Reflect::set(env, &JsValue::from_str("setSceneCallBack"), &shim)?;
    packed.forget();
    Ok(())
}

/// Build `{ env: { ... } }` for `WebAssembly.instantiate`.
pub fn imports(host: &Rc<Host>) -> std::result::Result<Object, JsValue> {
    let env = Object::new();

    // ── lifecycle & scene registration ──

    import!(&env, host, "init", |_h| -> () {
        log::debug!("guest init");
    });
    import!(&env, host, "deinit", |h| -> () {
        h.shutdown();
    });
    import!(&env, host, "run", |h, scene_ptr: u32, draw_fn_ptr: u32| -> () {
        let result = h.start_render(scene_ptr, draw_fn_ptr);
        fatal("run", result)
    });
    import!(&env, host, "setStatePtr", |h, ptr: u32| -> () {
        let result = h.controller().map(|mut c| c.scene_mut().set_entity(ptr));
        fatal("setStatePtr", result)
    });
    import!(&env, host, "setFnPtr", |h, name_ptr: u32, name_len: u32, fn_ptr: u32| -> () {
        let result = text(&h, name_ptr, name_len).and_then(|name| {
            h.controller()?.scene_mut().register(&name, fn_ptr);
            Ok(())
        });
        fatal("setFnPtr", result)
    });
    install_scene_callback(&env, host)?;

    // ── console & clock ──

    for name in ["_log", "print"] {
        let h = Rc::clone(host);
        let closure = Closure::wrap(Box::new(move |ptr: u32, len: u32| match text(&h, ptr, len) {
            Ok(line) => log::info!("{line}"),
            Err(e) => log::warn!("unreadable guest log line: {e}"),
        }) as Box<dyn FnMut(u32, u32)>);
        install(&env, name, closure)?;
    }
    import!(&env, host, "time", |_h| -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map_or(0.0, |p| p.now())
    });

    // ── shaders & programs ──

    import!(&env, host, "initShader", |h, ty: u32, src_ptr: u32, src_len: u32| -> u32 {
        let result = text(&h, src_ptr, src_len).and_then(|src| h.resources().init_shader(ty, &src));
        fatal("initShader", result).raw()
    });
    import!(&env, host, "deinitShader", |h, handle: u32| -> () {
        h.resources().deinit_shader(Handle(handle));
    });
    import!(&env, host, "initProgram", |h, vs: u32, fs: u32| -> u32 {
        let result = h.resources().init_program(Handle(vs), Handle(fs));
        fatal("initProgram", result).raw()
    });
    import!(&env, host, "useProgram", |h, handle: u32| -> () {
        h.resources().use_program(Handle(handle));
    });
    import!(&env, host, "deinitProgram", |h, handle: u32| -> () {
        h.resources().deinit_program(Handle(handle));
    });
    import!(&env, host, "uniformMatrix4fv", |h, name_ptr: u32, name_len: u32, transpose: u32, value_ptr: u32| -> () {
        let result = h.memory().and_then(|m| {
            let name = read_utf8(&m, name_ptr, name_len)?;
            let values = read_f32s(&m, value_ptr, 16)?;
            let mut matrix = [0.0f32; 16];
            matrix.copy_from_slice(&values);
            h.resources().uniform_matrix4fv(&name, transpose != 0, &matrix);
            Ok(())
        });
        fatal("uniformMatrix4fv", result)
    });

    // ── vertex buffers ──

    import!(&env, host, "initVertexBuffer", |h, data_ptr: u32, data_len: u32, usage: u32| -> u32 {
        let result = h
            .memory()
            .and_then(|m| read_bytes(&m, data_ptr, data_len))
            .and_then(|data| h.resources().init_vertex_buffer(&data, usage));
        fatal("initVertexBuffer", result).raw()
    });
    import!(&env, host, "deinitVertexBuffer", |h, handle: u32| -> () {
        h.resources().deinit_vertex_buffer(Handle(handle));
    });
    import!(&env, host, "bindVertexBuffer", |h, handle: u32| -> () {
        h.resources().bind_vertex_buffer(Handle(handle));
    });
    import!(&env, host, "bufferData", |h, handle: u32, data_ptr: u32, data_len: u32, usage: u32| -> () {
        let result = h
            .memory()
            .and_then(|m| read_bytes(&m, data_ptr, data_len))
            .and_then(|data| h.resources().buffer_data(Handle(handle), &data, usage));
        fatal("bufferData", result)
    });
    import!(&env, host, "bufferSubData", |h, handle: u32, idxs_ptr: u32, idxs_len: u32, data_ptr: u32, data_len: u32| -> () {
        let result = h.memory().and_then(|m| {
            let indices = read_u32s(&m, idxs_ptr, idxs_len)?;
            let data = read_f32s(&m, data_ptr, data_len / 4)?;
            h.resources().buffer_sub_data(Handle(handle), &indices, &data);
            Ok(())
        });
        fatal("bufferSubData", result)
    });

    // ── drawing ──

    import!(&env, host, "vertexAttribPointer", |h, program: u32, name_ptr: u32, name_len: u32, size: i32, ty: u32, normalized: u32, stride: i32, offset: i32| -> () {
        let result = text(&h, name_ptr, name_len).and_then(|name| {
            h.resources()
                .vertex_attrib_pointer(Handle(program), &name, size, ty, normalized != 0, stride, offset)
        });
        fatal("vertexAttribPointer", result)
    });
    import!(&env, host, "drawArrays", |h, mode: u32, first: i32, count: i32| -> () {
        let result = h.resources().draw_arrays(mode, first, count);
        fatal("drawArrays", result)
    });
    import!(&env, host, "clear", |h, r: f32, g: f32, b: f32, a: f32| -> () {
        h.resources().clear(r, g, b, a);
    });

    // ── guest intervals ──

    import!(&env, host, "setInterval", |h, fn_ptr: u32, args_ptr: u32, args_len: u32, delay_ms: u32, timeout_ms: u32| -> u32 {
        let result = h.set_guest_interval(GuestInterval {
            fn_ptr,
            args_ptr,
            args_len,
            delay_ms,
            timeout_ms,
        });
        fatal("setInterval", result).raw()
    });
    import!(&env, host, "clearInterval", |h, handle: u32| -> () {
        h.clear_guest_interval(Handle(handle));
    });

    let imports = Object::new();
    Reflect::set(&imports, &JsValue::from_str("env"), &env)?;
    Ok(imports)
}
