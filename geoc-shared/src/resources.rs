use std::collections::HashMap;

use crate::config::Perspective;
use crate::error::{GeocError, Result};
use crate::gl::{
    ActiveInfo, AttribType, BufferUsage, DrawMode, GraphicsContext, ShaderKind, PROJECTION_UNIFORM, SHADER_PRELUDE,
};
use crate::handle::{Handle, ResourceTable};

/// Floats per vertex in buffers updated through `bufferSubData`.
pub const FLOATS_PER_VERTEX: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub index: u32,
    pub info: ActiveInfo,
}

/// A linked program plus the reflection data gathered at link time.
pub struct ProgramDescriptor<P> {
    pub program: P,
    pub attributes: HashMap<String, Attribute>,
    pub uniforms: HashMap<String, ActiveInfo>,
}

/// Shader, program and buffer tables for one graphics context.
///
/// Frame-time operations against an unknown handle are logged and skipped so
/// a single stale handle cannot stall the render loop; creating a resource
/// from a missing dependency is an error.
pub struct GlResources<G: GraphicsContext> {
    gl: G,
    shaders: ResourceTable<G::Shader>,
    programs: ResourceTable<ProgramDescriptor<G::Program>>,
    buffers: ResourceTable<G::Buffer>,
    perspective: Perspective,
}

impl<G: GraphicsContext> GlResources<G> {
    pub fn new(gl: G, perspective: Perspective) -> Self {
        Self {
            gl,
            shaders: ResourceTable::new(),
            programs: ResourceTable::new(),
            buffers: ResourceTable::new(),
            perspective,
        }
    }

    pub fn context(&self) -> &G {
        &self.gl
    }

    pub fn perspective(&self) -> Perspective {
        self.perspective
    }

    // ── shaders ──

    pub fn init_shader(&mut self, type_code: u32, source: &str) -> Result<Handle> {
        let kind = ShaderKind::try_from(type_code)?;
        let shader = self.gl.create_shader(kind).ok_or(GeocError::ResourceCreation("shader"))?;
        let full_source = format!("{SHADER_PRELUDE}{source}");
        if let Err(info_log) = self.gl.compile_shader(&shader, &full_source) {
            self.gl.delete_shader(&shader);
            return Err(GeocError::ShaderCompile(info_log));
        }
        let handle = self.shaders.create(shader)?;
        log::debug!("compiled {kind:?} shader as handle {handle}");
        Ok(handle)
    }

    pub fn shader(&self, handle: Handle) -> Option<&G::Shader> {
        self.shaders.get(handle)
    }

    pub fn deinit_shader(&mut self, handle: Handle) {
        match self.shaders.destroy(handle) {
            Some(shader) => self.gl.delete_shader(&shader),
            None => log::warn!("deinitShader: no shader with handle {handle}"),
        }
    }

    // ── programs ──

    pub fn init_program(&mut self, vertex: Handle, fragment: Handle) -> Result<Handle> {
        let vs = self.shaders.get(vertex).ok_or(GeocError::MissingDependency {
            kind: "shader",
            handle: vertex.raw(),
        })?;
        let fs = self.shaders.get(fragment).ok_or(GeocError::MissingDependency {
            kind: "shader",
            handle: fragment.raw(),
        })?;

        let program = self.gl.create_program().ok_or(GeocError::ResourceCreation("program"))?;
        if let Err(info_log) = self.gl.link_program(&program, vs, fs) {
            self.gl.delete_program(&program);
            return Err(GeocError::ProgramLink(info_log));
        }

        let attributes = self
            .gl
            .active_attributes(&program)
            .into_iter()
            .enumerate()
            .map(|(index, info)| {
                (
                    info.name.clone(),
                    Attribute {
                        index: index as u32,
                        info,
                    },
                )
            })
            .collect();
        let uniforms: HashMap<String, ActiveInfo> = self
            .gl
            .active_uniforms(&program)
            .into_iter()
            .map(|info| (info.name.clone(), info))
            .collect();

        self.gl.use_program(&program);
        if uniforms.contains_key(PROJECTION_UNIFORM) {
            self.gl
                .uniform_matrix4(&program, PROJECTION_UNIFORM, false, &self.perspective.matrix());
        }

        let handle = self.programs.create(ProgramDescriptor {
            program,
            attributes,
            uniforms,
        })?;
        log::debug!("linked program {handle} from shaders {vertex} and {fragment}");
        Ok(handle)
    }

    pub fn program(&self, handle: Handle) -> Option<&ProgramDescriptor<G::Program>> {
        self.programs.get(handle)
    }

    pub fn use_program(&self, handle: Handle) {
        match self.programs.get(handle) {
            Some(descriptor) => self.gl.use_program(&descriptor.program),
            None => log::warn!("useProgram: no program with handle {handle}"),
        }
    }

    pub fn deinit_program(&mut self, handle: Handle) {
        if let Some(descriptor) = self.programs.destroy(handle) {
            self.gl.delete_program(&descriptor.program);
        }
    }

    /// Upload a matrix uniform to every live program.
    pub fn uniform_matrix4fv(&self, name: &str, transpose: bool, value: &[f32; 16]) {
        for (_, descriptor) in self.programs.iter() {
            self.gl.use_program(&descriptor.program);
            self.gl.uniform_matrix4(&descriptor.program, name, transpose, value);
        }
    }

    // ── buffers ──

    pub fn init_vertex_buffer(&mut self, data: &[u8], usage_code: u32) -> Result<Handle> {
        let usage = BufferUsage::try_from(usage_code)?;
        let buffer = self.gl.create_buffer().ok_or(GeocError::ResourceCreation("buffer"))?;
        self.gl.bind_array_buffer(&buffer);
        self.gl.buffer_data(data, usage);
        self.buffers.create(buffer)
    }

    pub fn buffer(&self, handle: Handle) -> Option<&G::Buffer> {
        self.buffers.get(handle)
    }

    pub fn deinit_vertex_buffer(&mut self, handle: Handle) {
        match self.buffers.destroy(handle) {
            Some(buffer) => self.gl.delete_buffer(&buffer),
            None => log::warn!("deinitVertexBuffer: no buffer with handle {handle}"),
        }
    }

    pub fn bind_vertex_buffer(&self, handle: Handle) -> bool {
        match self.buffers.get(handle) {
            Some(buffer) => {
                self.gl.bind_array_buffer(buffer);
                true
            }
            None => {
                log::warn!("bindVertexBuffer: no buffer with handle {handle}");
                false
            }
        }
    }

    /// Replace a buffer's whole contents.
    pub fn buffer_data(&self, handle: Handle, data: &[u8], usage_code: u32) -> Result<()> {
        let usage = BufferUsage::try_from(usage_code)?;
        if self.bind_vertex_buffer(handle) {
            self.gl.buffer_data(data, usage);
        }
        Ok(())
    }

    /// Overwrite individual vertices: `data` holds [`FLOATS_PER_VERTEX`]
    /// floats for each entry of `vertex_indices`, in the same order.
    pub fn buffer_sub_data(&self, handle: Handle, vertex_indices: &[u32], data: &[f32]) {
        if !self.bind_vertex_buffer(handle) {
            return;
        }
        for (i, vertex) in data.chunks_exact(FLOATS_PER_VERTEX).enumerate() {
            let Some(&index) = vertex_indices.get(i) else { break };
            let byte_offset = index as usize * FLOATS_PER_VERTEX * 4;
            self.gl
                .buffer_sub_data(byte_offset as i32, bytemuck::cast_slice(vertex));
        }
    }

    // ── drawing ──

    pub fn vertex_attrib_pointer(
        &self,
        program: Handle,
        name: &str,
        size: i32,
        type_code: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) -> Result<()> {
        let Some(descriptor) = self.programs.get(program) else {
            log::warn!("vertexAttribPointer: no program with handle {program}");
            return Ok(());
        };
        let Some(attribute) = descriptor.attributes.get(name) else {
            log::warn!("vertexAttribPointer: program {program} has no attribute {name:?}");
            return Ok(());
        };
        let ty = AttribType::try_from(type_code)?;
        self.gl.enable_vertex_attrib_array(attribute.index);
        self.gl
            .vertex_attrib_pointer(attribute.index, size, ty, normalized, stride, offset);
        Ok(())
    }

    pub fn draw_arrays(&self, mode_code: u32, first: i32, count: i32) -> Result<()> {
        let mode = DrawMode::try_from(mode_code)?;
        self.gl.draw_arrays(mode, first, count);
        Ok(())
    }

    pub fn clear(&self, r: f32, g: f32, b: f32, a: f32) {
        self.gl.clear(r, g, b, a);
    }

    // ── surface ──

    /// Apply a new surface size: viewport plus projection for every program.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.gl.viewport(width as i32, height as i32);
        if height > 0 {
            self.perspective.aspect_ratio = width as f32 / height as f32;
        }
        self.upload_projection();
    }

    pub fn viewport(&self, width: u32, height: u32) {
        self.gl.viewport(width as i32, height as i32);
    }

    /// Change field of view and clip planes, keeping the current aspect ratio.
    pub fn set_perspective(&mut self, fov: f32, near: f32, far: f32) -> Result<()> {
        let next = Perspective {
            fov,
            near,
            far,
            aspect_ratio: self.perspective.aspect_ratio,
        };
        next.validate()?;
        self.perspective = next;
        self.upload_projection();
        Ok(())
    }

    fn upload_projection(&self) {
        let matrix = self.perspective.matrix();
        for (_, descriptor) in self.programs.iter() {
            if descriptor.uniforms.contains_key(PROJECTION_UNIFORM) {
                self.gl.use_program(&descriptor.program);
                self.gl
                    .uniform_matrix4(&descriptor.program, PROJECTION_UNIFORM, false, &matrix);
            }
        }
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        (self.shaders.len(), self.programs.len(), self.buffers.len())
    }

    /// Release every resource and flush the context.
    pub fn deinit(&mut self) {
        for (_, buffer) in self.buffers.drain() {
            self.gl.delete_buffer(&buffer);
        }
        for (_, descriptor) in self.programs.drain() {
            self.gl.delete_program(&descriptor.program);
        }
        for (_, shader) in self.shaders.drain() {
            self.gl.delete_shader(&shader);
        }
        self.gl.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{GlCall, MockGl};

    const VERTEX_SRC: &str = "attribute vec3 coords;\nattribute vec3 color;\nuniform mat4 projection_matrix;\nuniform mat4 view_matrix;\nvoid main() {}\n";
    const FRAGMENT_SRC: &str = "void main() { gl_FragColor = vec4(1.0); }\n";

    fn resources() -> GlResources<MockGl> {
        GlResources::new(MockGl::default(), Perspective::default())
    }

    fn linked(res: &mut GlResources<MockGl>) -> Handle {
        let vs = res.init_shader(0, VERTEX_SRC).unwrap();
        let fs = res.init_shader(1, FRAGMENT_SRC).unwrap();
        res.init_program(vs, fs).unwrap()
    }

    #[test]
    fn test_shader_program_lifecycle() {
        let mut res = resources();
        let vs = res.init_shader(0, VERTEX_SRC).unwrap();
        let fs = res.init_shader(1, FRAGMENT_SRC).unwrap();
        assert_eq!((vs, fs), (Handle(0), Handle(1)));
        assert!(res.shader(vs).is_some());

        let program = res.init_program(vs, fs).unwrap();
        assert_eq!(program, Handle(0));
        let descriptor = res.program(program).unwrap();
        assert_eq!(descriptor.attributes.len(), 2);
        assert_eq!(descriptor.attributes["coords"].index, 0);
        assert_eq!(descriptor.attributes["color"].index, 1);
        assert!(descriptor.uniforms.contains_key("projection_matrix"));
        assert!(descriptor.uniforms.contains_key("view_matrix"));

        res.deinit_program(program);
        assert!(res.program(program).is_none());
    }

    #[test]
    fn test_shader_source_gets_prelude() {
        let mut res = resources();
        res.init_shader(1, FRAGMENT_SRC).unwrap();
        let sources = res.context().sources();
        assert!(sources[0].starts_with("precision mediump float;\n"));
        assert!(sources[0].ends_with(FRAGMENT_SRC));
    }

    #[test]
    fn test_compile_failure_carries_info_log() {
        let mut res = resources();
        let err = res.init_shader(0, "#error broken").unwrap_err();
        assert_eq!(err, GeocError::ShaderCompile("0:1: broken".into()));
        assert_eq!(res.counts().0, 0);
    }

    #[test]
    fn test_invalid_shader_type() {
        let mut res = resources();
        assert_eq!(res.init_shader(7, VERTEX_SRC), Err(GeocError::InvalidShaderType(7)));
    }

    #[test]
    fn test_program_with_missing_shader_fails_loudly() {
        let mut res = resources();
        let vs = res.init_shader(0, VERTEX_SRC).unwrap();
        let err = res.init_program(vs, Handle(9)).unwrap_err();
        assert_eq!(err, GeocError::MissingDependency { kind: "shader", handle: 9 });
    }

    #[test]
    fn test_link_uploads_projection() {
        let mut res = resources();
        linked(&mut res);
        let expected = Perspective::default().matrix();
        assert!(res.context().calls().contains(&GlCall::UniformMatrix4 {
            name: "projection_matrix".into(),
            value: expected,
        }));
    }

    #[test]
    fn test_stale_handles_are_skipped_per_frame() {
        let mut res = resources();
        let program = linked(&mut res);
        res.deinit_program(program);
        let before = res.context().calls().len();

        res.use_program(program);
        assert!(!res.bind_vertex_buffer(Handle(3)));
        res.vertex_attrib_pointer(program, "coords", 3, 0, false, 24, 0).unwrap();
        assert_eq!(res.context().calls().len(), before);
    }

    #[test]
    fn test_vertex_attrib_pointer_resolves_attribute() {
        let mut res = resources();
        let program = linked(&mut res);
        res.vertex_attrib_pointer(program, "color", 3, 0, false, 24, 12).unwrap();
        let calls = res.context().calls();
        assert!(calls.contains(&GlCall::EnableAttrib(1)));
        assert!(calls.contains(&GlCall::AttribPointer { index: 1, size: 3, stride: 24, offset: 12 }));

        assert_eq!(
            res.vertex_attrib_pointer(program, "color", 3, 5, false, 24, 12),
            Err(GeocError::UnknownAttribType(5))
        );
    }

    #[test]
    fn test_buffer_lifecycle_and_draw() {
        let mut res = resources();
        let data = [0u8; 48];
        let buffer = res.init_vertex_buffer(&data, 0).unwrap();
        assert!(res.buffer(buffer).is_some());
        assert!(res.bind_vertex_buffer(buffer));
        res.draw_arrays(1, 0, 2).unwrap();
        assert!(res.context().calls().contains(&GlCall::DrawArrays(DrawMode::Lines, 0, 2)));
        assert_eq!(res.draw_arrays(9, 0, 2), Err(GeocError::UnsupportedDrawMode(9)));

        res.deinit_vertex_buffer(buffer);
        assert!(res.buffer(buffer).is_none());
        assert!(!res.bind_vertex_buffer(buffer));
    }

    #[test]
    fn test_buffer_sub_data_offsets_by_vertex_index() {
        let mut res = resources();
        let buffer = res.init_vertex_buffer(&[0u8; 240], 1).unwrap();
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        res.buffer_sub_data(buffer, &[2, 7], &data);
        let offsets: Vec<i32> = res
            .context()
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                GlCall::BufferSubData { offset, len } => {
                    assert_eq!(len, 24);
                    Some(offset)
                }
                _ => None,
            })
            .collect();
        assert_eq!(offsets, vec![48, 168]);
    }

    #[test]
    fn test_resize_updates_aspect_and_programs() {
        let mut res = resources();
        linked(&mut res);
        res.resize(800, 400);
        assert_eq!(res.perspective().aspect_ratio, 2.0);
        let mut expected = Perspective::default();
        expected.aspect_ratio = 2.0;
        assert!(res.context().calls().contains(&GlCall::Viewport(800, 400)));
        assert!(res.context().calls().contains(&GlCall::UniformMatrix4 {
            name: "projection_matrix".into(),
            value: expected.matrix(),
        }));
    }

    #[test]
    fn test_set_perspective_validates() {
        let mut res = resources();
        assert!(res.set_perspective(1.0, 5.0, 1.0).is_err());
        res.set_perspective(0.9, 0.5, 50.0).unwrap();
        assert_eq!(res.perspective().far, 50.0);
    }

    #[test]
    fn test_deinit_releases_everything() {
        let mut res = resources();
        linked(&mut res);
        res.init_vertex_buffer(&[0u8; 4], 0).unwrap();
        res.deinit();
        assert_eq!(res.counts(), (0, 0, 0));
        let calls = res.context().calls();
        assert_eq!(calls.last(), Some(&GlCall::Finish));
        assert_eq!(calls.iter().filter(|c| matches!(c, GlCall::DeleteShader(_))).count(), 2);
    }
}
