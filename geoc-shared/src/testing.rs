//! Test doubles for the graphics context and the guest module.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::{GeocError, Result};
use crate::gl::{ActiveInfo, AttribType, BufferUsage, DrawMode, GraphicsContext, ShaderKind};
use crate::memory::VecMemory;
use crate::scene::Guest;

#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    CreateShader(ShaderKind),
    DeleteShader(u32),
    LinkProgram(u32),
    UseProgram(u32),
    DeleteProgram(u32),
    UniformMatrix4 { name: String, value: [f32; 16] },
    BindBuffer(u32),
    BufferData { len: usize, usage: BufferUsage },
    BufferSubData { offset: i32, len: usize },
    DeleteBuffer(u32),
    EnableAttrib(u32),
    AttribPointer { index: u32, size: i32, stride: i32, offset: i32 },
    DrawArrays(DrawMode, i32, i32),
    Viewport(i32, i32),
    Clear,
    Finish,
}

#[derive(Default)]
struct MockGlState {
    calls: Vec<GlCall>,
    /// Shader sources indexed by shader id.
    sources: Vec<String>,
    programs: HashMap<u32, (u32, u32)>,
    next_object: u32,
}

/// Records every call. Reflection reads `attribute` and `uniform`
/// declarations from the compiled sources; a `#error msg` line fails
/// compilation with `msg` in the info log.
#[derive(Default)]
pub struct MockGl {
    state: RefCell<MockGlState>,
}

impl MockGl {
    pub fn calls(&self) -> Vec<GlCall> {
        self.state.borrow().calls.clone()
    }

    pub fn sources(&self) -> Vec<String> {
        self.state.borrow().sources.clone()
    }

    fn record(&self, call: GlCall) {
        self.state.borrow_mut().calls.push(call);
    }

    fn next_object(&self) -> u32 {
        let mut state = self.state.borrow_mut();
        state.next_object += 1;
        state.next_object
    }

    fn declarations(source: &str, keyword: &str) -> Vec<ActiveInfo> {
        source
            .lines()
            .filter_map(|line| {
                let mut tokens = line.split_whitespace();
                if tokens.next()? != keyword {
                    return None;
                }
                let ty = tokens.next()?;
                let name = tokens.next()?.trim_end_matches(';');
                let gl_type = match ty {
                    "float" => 0x1406,
                    "vec2" => 0x8B50,
                    "vec3" => 0x8B51,
                    "vec4" => 0x8B52,
                    "mat4" => 0x8B5C,
                    _ => 0,
                };
                Some(ActiveInfo {
                    name: name.to_string(),
                    size: 1,
                    gl_type,
                })
            })
            .collect()
    }

    fn program_sources(&self, program: u32) -> Vec<String> {
        let state = self.state.borrow();
        state
            .programs
            .get(&program)
            .map(|(vs, fs)| {
                [vs, fs]
                    .iter()
                    .filter_map(|id| state.sources.get(**id as usize).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl GraphicsContext for MockGl {
    type Shader = u32;
    type Program = u32;
    type Buffer = u32;

    fn create_shader(&self, kind: ShaderKind) -> Option<u32> {
        self.record(GlCall::CreateShader(kind));
        let mut state = self.state.borrow_mut();
        state.sources.push(String::new());
        Some(state.sources.len() as u32 - 1)
    }

    fn compile_shader(&self, shader: &u32, source: &str) -> std::result::Result<(), String> {
        if let Some(slot) = self.state.borrow_mut().sources.get_mut(*shader as usize) {
            *slot = source.to_string();
        }
        match source.lines().find_map(|line| line.strip_prefix("#error ")) {
            Some(msg) => Err(format!("0:1: {msg}")),
            None => Ok(()),
        }
    }

    fn delete_shader(&self, shader: &u32) {
        self.record(GlCall::DeleteShader(*shader));
    }

    fn create_program(&self) -> Option<u32> {
        Some(self.next_object())
    }

    fn link_program(&self, program: &u32, vertex: &u32, fragment: &u32) -> std::result::Result<(), String> {
        self.record(GlCall::LinkProgram(*program));
        self.state.borrow_mut().programs.insert(*program, (*vertex, *fragment));
        Ok(())
    }

    fn active_attributes(&self, program: &u32) -> Vec<ActiveInfo> {
        self.program_sources(*program)
            .first()
            .map(|vs| Self::declarations(vs, "attribute"))
            .unwrap_or_default()
    }

    fn active_uniforms(&self, program: &u32) -> Vec<ActiveInfo> {
        let mut uniforms: Vec<ActiveInfo> = Vec::new();
        for source in self.program_sources(*program) {
            for info in Self::declarations(&source, "uniform") {
                if !uniforms.iter().any(|u| u.name == info.name) {
                    uniforms.push(info);
                }
            }
        }
        uniforms
    }

    fn use_program(&self, program: &u32) {
        self.record(GlCall::UseProgram(*program));
    }

    fn delete_program(&self, program: &u32) {
        self.record(GlCall::DeleteProgram(*program));
    }

    fn uniform_matrix4(&self, _program: &u32, name: &str, _transpose: bool, value: &[f32; 16]) {
        self.record(GlCall::UniformMatrix4 {
            name: name.to_string(),
            value: *value,
        });
    }

    fn create_buffer(&self) -> Option<u32> {
        Some(self.next_object())
    }

    fn bind_array_buffer(&self, buffer: &u32) {
        self.record(GlCall::BindBuffer(*buffer));
    }

    fn buffer_data(&self, data: &[u8], usage: BufferUsage) {
        self.record(GlCall::BufferData { len: data.len(), usage });
    }

    fn buffer_sub_data(&self, byte_offset: i32, data: &[u8]) {
        self.record(GlCall::BufferSubData {
            offset: byte_offset,
            len: data.len(),
        });
    }

    fn delete_buffer(&self, buffer: &u32) {
        self.record(GlCall::DeleteBuffer(*buffer));
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(GlCall::EnableAttrib(index));
    }

    fn vertex_attrib_pointer(&self, index: u32, size: i32, _ty: AttribType, _normalized: bool, stride: i32, offset: i32) {
        self.record(GlCall::AttribPointer {
            index,
            size,
            stride,
            offset,
        });
    }

    fn draw_arrays(&self, mode: DrawMode, first: i32, count: i32) {
        self.record(GlCall::DrawArrays(mode, first, count));
    }

    fn viewport(&self, width: i32, height: i32) {
        self.record(GlCall::Viewport(width, height));
    }

    fn clear(&self, _r: f32, _g: f32, _b: f32, _a: f32) {
        self.record(GlCall::Clear);
    }

    fn finish(&self) {
        self.record(GlCall::Finish);
    }
}

/// Guest stand-in: records export calls, returns canned values and can be
/// told to trap on the next call to a given export.
pub struct MockGuest {
    memory: VecMemory,
    calls: Vec<(String, Vec<f64>)>,
    returns: HashMap<String, f64>,
    fail_next: Option<String>,
}

impl MockGuest {
    pub fn new(memory_size: usize) -> Self {
        Self {
            memory: VecMemory::new(memory_size),
            calls: Vec::new(),
            returns: HashMap::new(),
            fail_next: None,
        }
    }

    pub fn calls(&self) -> &[(String, Vec<f64>)] {
        &self.calls
    }

    /// Argument lists of every call to `export`, in order.
    pub fn calls_to(&self, export: &str) -> Vec<Vec<f64>> {
        self.calls
            .iter()
            .filter(|(name, _)| name == export)
            .map(|(_, args)| args.clone())
            .collect()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn set_return(&mut self, export: &str, value: f64) {
        self.returns.insert(export.to_string(), value);
    }

    pub fn fail_next(&mut self, export: &str) {
        self.fail_next = Some(export.to_string());
    }

    pub fn memory_ref(&self) -> &VecMemory {
        &self.memory
    }
}

impl Guest for MockGuest {
    type Memory = VecMemory;

    fn memory(&mut self) -> &mut VecMemory {
        &mut self.memory
    }

    fn call_export(&mut self, name: &str, args: &[f64]) -> Result<f64> {
        if self.fail_next.as_deref() == Some(name) {
            self.fail_next = None;
            return Err(GeocError::GuestTrap {
                export: name.to_string(),
                message: "unreachable executed".to_string(),
            });
        }
        self.calls.push((name.to_string(), args.to_vec()));
        Ok(self.returns.get(name).copied().unwrap_or(0.0))
    }
}
