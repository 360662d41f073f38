use geoc_shared::error::{GeocError, Result};
use geoc_shared::gl::{ActiveInfo, AttribType, BufferUsage, DrawMode, GraphicsContext, ShaderKind};
use wasm_bindgen::JsCast;
use web_sys::{
    HtmlCanvasElement, WebGlBuffer, WebGlProgram, WebGlRenderingContext as Gl, WebGlShader,
};

/// [`GraphicsContext`] over a WebGL 1 context.
pub struct WebGl {
    gl: Gl,
}

impl WebGl {
    pub fn from_canvas(canvas: &HtmlCanvasElement) -> Result<Self> {
        let gl = canvas
            .get_context("webgl")
            .ok()
            .flatten()
            .and_then(|ctx| ctx.dyn_into::<Gl>().ok())
            .ok_or(GeocError::NoGraphicsContext)?;
        Ok(Self { gl })
    }

    fn active(&self, program: &WebGlProgram, pname: u32, uniforms: bool) -> Vec<ActiveInfo> {
        let count = self
            .gl
            .get_program_parameter(program, pname)
            .as_f64()
            .unwrap_or(0.0) as u32;
        (0..count)
            .filter_map(|i| {
                if uniforms {
                    self.gl.get_active_uniform(program, i)
                } else {
                    self.gl.get_active_attrib(program, i)
                }
            })
            .map(|info| ActiveInfo {
                name: info.name(),
                size: info.size(),
                gl_type: info.type_(),
            })
            .collect()
    }
}

fn usage_code(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::Static => Gl::STATIC_DRAW,
        BufferUsage::Dynamic => Gl::DYNAMIC_DRAW,
        BufferUsage::Stream => Gl::STREAM_DRAW,
    }
}

fn mode_code(mode: DrawMode) -> u32 {
    match mode {
        DrawMode::Points => Gl::POINTS,
        DrawMode::Lines => Gl::LINES,
        DrawMode::LineLoop => Gl::LINE_LOOP,
        DrawMode::LineStrip => Gl::LINE_STRIP,
        DrawMode::Triangles => Gl::TRIANGLES,
        DrawMode::TriangleStrip => Gl::TRIANGLE_STRIP,
        DrawMode::TriangleFan => Gl::TRIANGLE_FAN,
    }
}

impl GraphicsContext for WebGl {
    type Shader = WebGlShader;
    type Program = WebGlProgram;
    type Buffer = WebGlBuffer;

    fn create_shader(&self, kind: ShaderKind) -> Option<WebGlShader> {
        let ty = match kind {
            ShaderKind::Vertex => Gl::VERTEX_SHADER,
            ShaderKind::Fragment => Gl::FRAGMENT_SHADER,
        };
        self.gl.create_shader(ty)
    }

    fn compile_shader(&self, shader: &WebGlShader, source: &str) -> std::result::Result<(), String> {
        self.gl.shader_source(shader, source);
        self.gl.compile_shader(shader);
        if self
            .gl
            .get_shader_parameter(shader, Gl::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false)
        {
            Ok(())
        } else {
            Err(self
                .gl
                .get_shader_info_log(shader)
                .unwrap_or_else(|| String::from("Unknown error creating shader")))
        }
    }

    fn delete_shader(&self, shader: &WebGlShader) {
        self.gl.delete_shader(Some(shader));
    }

    fn create_program(&self) -> Option<WebGlProgram> {
        self.gl.create_program()
    }

    fn link_program(
        &self,
        program: &WebGlProgram,
        vertex: &WebGlShader,
        fragment: &WebGlShader,
    ) -> std::result::Result<(), String> {
        self.gl.attach_shader(program, vertex);
        self.gl.attach_shader(program, fragment);
        self.gl.link_program(program);
        if self
            .gl
            .get_program_parameter(program, Gl::LINK_STATUS)
            .as_bool()
            .unwrap_or(false)
        {
            Ok(())
        } else {
            Err(self
                .gl
                .get_program_info_log(program)
                .unwrap_or_else(|| String::from("Unknown error creating program object")))
        }
    }

    fn active_attributes(&self, program: &WebGlProgram) -> Vec<ActiveInfo> {
        self.active(program, Gl::ACTIVE_ATTRIBUTES, false)
    }

    fn active_uniforms(&self, program: &WebGlProgram) -> Vec<ActiveInfo> {
        self.active(program, Gl::ACTIVE_UNIFORMS, true)
    }

    fn use_program(&self, program: &WebGlProgram) {
        self.gl.use_program(Some(program));
    }

    fn delete_program(&self, program: &WebGlProgram) {
        self.gl.delete_program(Some(program));
    }

    fn uniform_matrix4(&self, program: &WebGlProgram, name: &str, transpose: bool, value: &[f32; 16]) {
        let location = self.gl.get_uniform_location(program, name);
        self.gl
            .uniform_matrix4fv_with_f32_array(location.as_ref(), transpose, value);
    }

    fn create_buffer(&self) -> Option<WebGlBuffer> {
        self.gl.create_buffer()
    }

    fn bind_array_buffer(&self, buffer: &WebGlBuffer) {
        self.gl.bind_buffer(Gl::ARRAY_BUFFER, Some(buffer));
    }

    fn buffer_data(&self, data: &[u8], usage: BufferUsage) {
        self.gl
            .buffer_data_with_u8_array(Gl::ARRAY_BUFFER, data, usage_code(usage));
    }

    fn buffer_sub_data(&self, byte_offset: i32, data: &[u8]) {
        self.gl
            .buffer_sub_data_with_i32_and_u8_array(Gl::ARRAY_BUFFER, byte_offset, data);
    }

    fn delete_buffer(&self, buffer: &WebGlBuffer) {
        self.gl.delete_buffer(Some(buffer));
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.gl.enable_vertex_attrib_array(index);
    }

    fn vertex_attrib_pointer(&self, index: u32, size: i32, ty: AttribType, normalized: bool, stride: i32, offset: i32) {
        let ty = match ty {
            AttribType::Float => Gl::FLOAT,
        };
        self.gl
            .vertex_attrib_pointer_with_i32(index, size, ty, normalized, stride, offset);
    }

    fn draw_arrays(&self, mode: DrawMode, first: i32, count: i32) {
        self.gl.draw_arrays(mode_code(mode), first, count);
    }

    fn viewport(&self, width: i32, height: i32) {
        self.gl.viewport(0, 0, width, height);
    }

    fn clear(&self, r: f32, g: f32, b: f32, a: f32) {
        self.gl.clear_color(r, g, b, a);
        self.gl.clear(Gl::COLOR_BUFFER_BIT | Gl::DEPTH_BUFFER_BIT);
    }

    fn finish(&self) {
        self.gl.finish();
    }
}
