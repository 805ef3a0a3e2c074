use std::collections::HashMap;

/// WebGL context generation behind the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum GlVersion {
    WebGl1,
    WebGl2,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveUniform {
    pub name: String,
    pub size: u32,
}

/// The WebGL(2) rendering context surface the adapter drives.
///
/// Object types are associated so the browser implementation can hold real
/// `WebGl*` objects while tests record calls. Creation returns `None` when
/// the context refuses (context lost, resource exhaustion).
pub trait GlContext {
    type Buffer;
    type Shader;
    type Program;
    type Texture;
    type Framebuffer;
    type Renderbuffer;
    type VertexArray;
    type UniformLocation: Clone;

    fn version(&self) -> GlVersion;
    fn drawing_buffer_width(&self) -> i32;
    fn drawing_buffer_height(&self) -> i32;
    fn get_error(&mut self) -> u32;
    fn is_extension_supported(&self, name: &str) -> bool;

    fn create_buffer(&mut self) -> Option<Self::Buffer>;
    fn delete_buffer(&mut self, buffer: &Self::Buffer);
    fn bind_buffer(&mut self, target: u32, buffer: Option<&Self::Buffer>);
    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32);
    fn buffer_data_size(&mut self, target: u32, size: i64, usage: u32);
    fn buffer_sub_data(&mut self, target: u32, offset: i64, data: &[u8]);

    fn create_texture(&mut self) -> Option<Self::Texture>;
    fn delete_texture(&mut self, texture: &Self::Texture);
    fn bind_texture(&mut self, target: u32, texture: Option<&Self::Texture>);

    fn create_framebuffer(&mut self) -> Option<Self::Framebuffer>;
    fn delete_framebuffer(&mut self, framebuffer: &Self::Framebuffer);
    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<&Self::Framebuffer>);

    fn create_renderbuffer(&mut self) -> Option<Self::Renderbuffer>;
    fn delete_renderbuffer(&mut self, renderbuffer: &Self::Renderbuffer);

    fn create_vertex_array(&mut self) -> Option<Self::VertexArray>;
    fn delete_vertex_array(&mut self, vao: &Self::VertexArray);
    fn bind_vertex_array(&mut self, vao: Option<&Self::VertexArray>);

    fn create_shader(&mut self, shader_type: u32) -> Option<Self::Shader>;
    fn delete_shader(&mut self, shader: &Self::Shader);
    fn shader_source(&mut self, shader: &Self::Shader, source: &str);
    fn compile_shader(&mut self, shader: &Self::Shader);
    fn get_shader_info_log(&self, shader: &Self::Shader) -> Option<String>;
    fn get_shader_source(&self, shader: &Self::Shader) -> Option<String>;
    fn get_shader_parameter(&self, shader: &Self::Shader, pname: u32) -> i32;

    fn create_program(&mut self) -> Option<Self::Program>;
    fn delete_program(&mut self, program: &Self::Program);
    fn attach_shader(&mut self, program: &Self::Program, shader: &Self::Shader);
    fn link_program(&mut self, program: &Self::Program);
    fn use_program(&mut self, program: Option<&Self::Program>);
    fn get_program_info_log(&self, program: &Self::Program) -> Option<String>;
    fn get_program_parameter(&self, program: &Self::Program, pname: u32) -> i32;
    fn active_uniform_count(&self, program: &Self::Program) -> u32;
    fn get_active_uniform(&self, program: &Self::Program, index: u32) -> Option<ActiveUniform>;
    fn get_uniform_location(
        &self,
        program: &Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation>;
    fn get_attrib_location(&self, program: &Self::Program, name: &str) -> i32;

    fn uniform1i(&mut self, location: &Self::UniformLocation, x: i32);
    fn uniform4fv(&mut self, location: &Self::UniformLocation, values: &[f32]);
    fn uniform_matrix4fv(&mut self, location: &Self::UniformLocation, values: &[f32]);

    fn clear(&mut self, mask: u32);
    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32);
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn enable(&mut self, cap: u32);
    fn disable(&mut self, cap: u32);
    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32);
    fn draw_elements(&mut self, mode: u32, count: i32, element_type: u32, offset: i64);
}

/// Call-recording context for native tests. Object types are the recorder's
/// own integer ids; uniform names resolve through a fixed map configured by
/// the test.
#[derive(Debug, Default)]
pub struct RecordingGl {
    pub version: Option<GlVersion>,
    pub calls: Vec<String>,
    pub fail_next_create: bool,
    pub shader_logs: HashMap<u64, String>,
    pub shader_sources: HashMap<u64, String>,
    pub program_uniforms: HashMap<u64, Vec<ActiveUniform>>,
    pub program_logs: HashMap<u64, String>,
    pub pending_error: u32,
    next_object: u64,
}

impl RecordingGl {
    pub fn webgl2() -> Self {
        Self {
            version: Some(GlVersion::WebGl2),
            ..Self::default()
        }
    }

    pub fn webgl1() -> Self {
        Self {
            version: Some(GlVersion::WebGl1),
            ..Self::default()
        }
    }

    fn create_object(&mut self, kind: &str) -> Option<u64> {
        if self.fail_next_create {
            self.fail_next_create = false;
            return None;
        }
        self.next_object += 1;
        self.calls.push(format!("create_{kind}({})", self.next_object));
        Some(self.next_object)
    }

    fn log(&mut self, call: String) {
        self.calls.push(call);
    }
}

impl GlContext for RecordingGl {
    type Buffer = u64;
    type Shader = u64;
    type Program = u64;
    type Texture = u64;
    type Framebuffer = u64;
    type Renderbuffer = u64;
    type VertexArray = u64;
    type UniformLocation = (u64, String);

    fn version(&self) -> GlVersion {
        self.version.unwrap_or(GlVersion::WebGl1)
    }

    fn drawing_buffer_width(&self) -> i32 {
        640
    }

    fn drawing_buffer_height(&self) -> i32 {
        480
    }

    fn get_error(&mut self) -> u32 {
        std::mem::take(&mut self.pending_error)
    }

    fn is_extension_supported(&self, name: &str) -> bool {
        name == "OES_texture_float"
    }

    fn create_buffer(&mut self) -> Option<u64> {
        self.create_object("buffer")
    }

    fn delete_buffer(&mut self, buffer: &u64) {
        self.log(format!("delete_buffer({buffer})"));
    }

    fn bind_buffer(&mut self, target: u32, buffer: Option<&u64>) {
        self.log(format!("bind_buffer({target}, {buffer:?})"));
    }

    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32) {
        self.log(format!("buffer_data({target}, {} bytes, {usage})", data.len()));
    }

    fn buffer_data_size(&mut self, target: u32, size: i64, usage: u32) {
        self.log(format!("buffer_data_size({target}, {size}, {usage})"));
    }

    fn buffer_sub_data(&mut self, target: u32, offset: i64, data: &[u8]) {
        self.log(format!(
            "buffer_sub_data({target}, {offset}, {} bytes)",
            data.len()
        ));
    }

    fn create_texture(&mut self) -> Option<u64> {
        self.create_object("texture")
    }

    fn delete_texture(&mut self, texture: &u64) {
        self.log(format!("delete_texture({texture})"));
    }

    fn bind_texture(&mut self, target: u32, texture: Option<&u64>) {
        self.log(format!("bind_texture({target}, {texture:?})"));
    }

    fn create_framebuffer(&mut self) -> Option<u64> {
        self.create_object("framebuffer")
    }

    fn delete_framebuffer(&mut self, framebuffer: &u64) {
        self.log(format!("delete_framebuffer({framebuffer})"));
    }

    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<&u64>) {
        self.log(format!("bind_framebuffer({target}, {framebuffer:?})"));
    }

    fn create_renderbuffer(&mut self) -> Option<u64> {
        self.create_object("renderbuffer")
    }

    fn delete_renderbuffer(&mut self, renderbuffer: &u64) {
        self.log(format!("delete_renderbuffer({renderbuffer})"));
    }

    fn create_vertex_array(&mut self) -> Option<u64> {
        self.create_object("vertex_array")
    }

    fn delete_vertex_array(&mut self, vao: &u64) {
        self.log(format!("delete_vertex_array({vao})"));
    }

    fn bind_vertex_array(&mut self, vao: Option<&u64>) {
        self.log(format!("bind_vertex_array({vao:?})"));
    }

    fn create_shader(&mut self, shader_type: u32) -> Option<u64> {
        let id = self.create_object("shader")?;
        self.log(format!("shader_type({id}, {shader_type})"));
        Some(id)
    }

    fn delete_shader(&mut self, shader: &u64) {
        self.log(format!("delete_shader({shader})"));
    }

    fn shader_source(&mut self, shader: &u64, source: &str) {
        self.shader_sources.insert(*shader, source.to_owned());
        self.log(format!("shader_source({shader}, {} chars)", source.len()));
    }

    fn compile_shader(&mut self, shader: &u64) {
        self.log(format!("compile_shader({shader})"));
    }

    fn get_shader_info_log(&self, shader: &u64) -> Option<String> {
        self.shader_logs.get(shader).cloned()
    }

    fn get_shader_source(&self, shader: &u64) -> Option<String> {
        self.shader_sources.get(shader).cloned()
    }

    fn get_shader_parameter(&self, _shader: &u64, _pname: u32) -> i32 {
        1
    }

    fn create_program(&mut self) -> Option<u64> {
        self.create_object("program")
    }

    fn delete_program(&mut self, program: &u64) {
        self.log(format!("delete_program({program})"));
    }

    fn attach_shader(&mut self, program: &u64, shader: &u64) {
        self.log(format!("attach_shader({program}, {shader})"));
    }

    fn link_program(&mut self, program: &u64) {
        self.log(format!("link_program({program})"));
    }

    fn use_program(&mut self, program: Option<&u64>) {
        self.log(format!("use_program({program:?})"));
    }

    fn get_program_info_log(&self, program: &u64) -> Option<String> {
        self.program_logs.get(program).cloned()
    }

    fn get_program_parameter(&self, _program: &u64, _pname: u32) -> i32 {
        1
    }

    fn active_uniform_count(&self, program: &u64) -> u32 {
        self.program_uniforms
            .get(program)
            .map_or(0, |u| u.len() as u32)
    }

    fn get_active_uniform(&self, program: &u64, index: u32) -> Option<ActiveUniform> {
        self.program_uniforms
            .get(program)?
            .get(index as usize)
            .cloned()
    }

    fn get_uniform_location(&self, program: &u64, name: &str) -> Option<(u64, String)> {
        let uniforms = self.program_uniforms.get(program)?;
        let found = uniforms.iter().any(|u| {
            let base = u.name.split('[').next().unwrap_or(u.name.as_str());
            base == name || u.name == name
        });
        found.then(|| (*program, name.to_owned()))
    }

    fn get_attrib_location(&self, _program: &u64, name: &str) -> i32 {
        if name.starts_with("a_") {
            0
        } else {
            -1
        }
    }

    fn uniform1i(&mut self, location: &(u64, String), x: i32) {
        self.log(format!("uniform1i({}, {x})", location.1));
    }

    fn uniform4fv(&mut self, location: &(u64, String), values: &[f32]) {
        self.log(format!("uniform4fv({}, {values:?})", location.1));
    }

    fn uniform_matrix4fv(&mut self, location: &(u64, String), values: &[f32]) {
        self.log(format!("uniform_matrix4fv({}, {} values)", location.1, values.len()));
    }

    fn clear(&mut self, mask: u32) {
        self.log(format!("clear({mask:#x})"));
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.log(format!("clear_color({r}, {g}, {b}, {a})"));
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.log(format!("viewport({x}, {y}, {width}, {height})"));
    }

    fn enable(&mut self, cap: u32) {
        self.log(format!("enable({cap:#x})"));
    }

    fn disable(&mut self, cap: u32) {
        self.log(format!("disable({cap:#x})"));
    }

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        self.log(format!("draw_arrays({mode:#x}, {first}, {count})"));
    }

    fn draw_elements(&mut self, mode: u32, count: i32, element_type: u32, offset: i64) {
        self.log(format!(
            "draw_elements({mode:#x}, {count}, {element_type:#x}, {offset})"
        ));
    }
}
