//! The slice of the WebGL API the host layer needs, as a trait so the resource
//! tables can be driven by the browser context or by a test double.

use crate::error::{GeocError, Result};

/// Prepended to every shader source the guest hands over.
pub const SHADER_PRELUDE: &str = "precision mediump float;\n";

/// Uniform that receives the perspective projection.
pub const PROJECTION_UNIFORM: &str = "projection_matrix";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

impl TryFrom<u32> for ShaderKind {
    type Error = GeocError;

    fn try_from(code: u32) -> Result<Self> {
        match code {
            0 => Ok(Self::Vertex),
            1 => Ok(Self::Fragment),
            other => Err(GeocError::InvalidShaderType(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Static,
    Dynamic,
    Stream,
}

impl TryFrom<u32> for BufferUsage {
    type Error = GeocError;

    fn try_from(code: u32) -> Result<Self> {
        match code {
            0 => Ok(Self::Static),
            1 => Ok(Self::Dynamic),
            2 => Ok(Self::Stream),
            other => Err(GeocError::UnknownBufferUsage(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttribType {
    Float,
}

impl TryFrom<u32> for AttribType {
    type Error = GeocError;

    fn try_from(code: u32) -> Result<Self> {
        match code {
            0 => Ok(Self::Float),
            other => Err(GeocError::UnknownAttribType(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl TryFrom<u32> for DrawMode {
    type Error = GeocError;

    fn try_from(code: u32) -> Result<Self> {
        Ok(match code {
            0 => Self::Points,
            1 => Self::Lines,
            2 => Self::LineLoop,
            3 => Self::LineStrip,
            4 => Self::Triangles,
            5 => Self::TriangleStrip,
            6 => Self::TriangleFan,
            other => return Err(GeocError::UnsupportedDrawMode(other)),
        })
    }
}

/// Reflection record for one active attribute or uniform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveInfo {
    pub name: String,
    pub size: i32,
    pub gl_type: u32,
}

/// Graphics context operations used by [`crate::resources::GlResources`].
///
/// Creation methods return `None` when the context refuses to allocate;
/// compile and link return the native info log on failure.
pub trait GraphicsContext {
    type Shader;
    type Program;
    type Buffer;

    fn create_shader(&self, kind: ShaderKind) -> Option<Self::Shader>;
    fn compile_shader(&self, shader: &Self::Shader, source: &str) -> std::result::Result<(), String>;
    fn delete_shader(&self, shader: &Self::Shader);

    fn create_program(&self) -> Option<Self::Program>;
    fn link_program(
        &self,
        program: &Self::Program,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
    ) -> std::result::Result<(), String>;
    fn active_attributes(&self, program: &Self::Program) -> Vec<ActiveInfo>;
    fn active_uniforms(&self, program: &Self::Program) -> Vec<ActiveInfo>;
    fn use_program(&self, program: &Self::Program);
    fn delete_program(&self, program: &Self::Program);
    fn uniform_matrix4(&self, program: &Self::Program, name: &str, transpose: bool, value: &[f32; 16]);

    fn create_buffer(&self) -> Option<Self::Buffer>;
    fn bind_array_buffer(&self, buffer: &Self::Buffer);
    fn buffer_data(&self, data: &[u8], usage: BufferUsage);
    fn buffer_sub_data(&self, byte_offset: i32, data: &[u8]);
    fn delete_buffer(&self, buffer: &Self::Buffer);

    fn enable_vertex_attrib_array(&self, index: u32);
    fn vertex_attrib_pointer(&self, index: u32, size: i32, ty: AttribType, normalized: bool, stride: i32, offset: i32);
    fn draw_arrays(&self, mode: DrawMode, first: i32, count: i32);

    fn viewport(&self, width: i32, height: i32);
    fn clear(&self, r: f32, g: f32, b: f32, a: f32);
    fn finish(&self);
}
