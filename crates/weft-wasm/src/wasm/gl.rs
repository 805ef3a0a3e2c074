//! [`GlContext`] over the canvas's real rendering context.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    HtmlCanvasElement, WebGl2RenderingContext as Gl, WebGlBuffer, WebGlFramebuffer, WebGlProgram,
    WebGlRenderbuffer, WebGlShader, WebGlTexture, WebGlUniformLocation, WebGlVertexArrayObject,
};

use weft_webgl::{ActiveUniform, ContextAttributes, GlContext, GlVersion};

pub struct CanvasGl {
    gl: Gl,
    version: GlVersion,
}

impl CanvasGl {
    /// Creates a context on `canvas` from the guest's attribute bitmask.
    pub fn from_canvas(canvas: &HtmlCanvasElement, attributes: ContextAttributes) -> Option<Self> {
        let options = js_sys::Object::new();
        let set = |key: &str, value: bool| {
            let _ = js_sys::Reflect::set(&options, &JsValue::from_str(key), &JsValue::from(value));
        };
        set("alpha", !attributes.contains(ContextAttributes::DISABLE_ALPHA));
        set(
            "antialias",
            !attributes.contains(ContextAttributes::DISABLE_ANTIALIAS),
        );
        set("depth", !attributes.contains(ContextAttributes::DISABLE_DEPTH));
        set(
            "failIfMajorPerformanceCaveat",
            attributes.contains(ContextAttributes::FAIL_IF_MAJOR_PERFORMANCE_CAVEAT),
        );
        set(
            "premultipliedAlpha",
            !attributes.contains(ContextAttributes::DISABLE_PREMULTIPLIED_ALPHA),
        );
        set(
            "preserveDrawingBuffer",
            attributes.contains(ContextAttributes::PRESERVE_DRAWING_BUFFER),
        );
        set("stencil", attributes.contains(ContextAttributes::STENCIL));
        set(
            "desynchronized",
            attributes.contains(ContextAttributes::DESYNCHRONIZED),
        );

        let gl = canvas
            .get_context_with_context_options("webgl2", &options)
            .ok()??
            .dyn_into::<Gl>()
            .ok()?;
        Some(Self {
            gl,
            version: GlVersion::WebGl2,
        })
    }
}

impl GlContext for CanvasGl {
    type Buffer = WebGlBuffer;
    type Shader = WebGlShader;
    type Program = WebGlProgram;
    type Texture = WebGlTexture;
    type Framebuffer = WebGlFramebuffer;
    type Renderbuffer = WebGlRenderbuffer;
    type VertexArray = WebGlVertexArrayObject;
    type UniformLocation = WebGlUniformLocation;

    fn version(&self) -> GlVersion {
        self.version
    }

    fn drawing_buffer_width(&self) -> i32 {
        self.gl.drawing_buffer_width()
    }

    fn drawing_buffer_height(&self) -> i32 {
        self.gl.drawing_buffer_height()
    }

    fn get_error(&mut self) -> u32 {
        self.gl.get_error()
    }

    fn is_extension_supported(&self, name: &str) -> bool {
        self.gl
            .get_supported_extensions()
            .map(|list| list.iter().any(|e| e.as_string().as_deref() == Some(name)))
            .unwrap_or(false)
    }

    fn create_buffer(&mut self) -> Option<WebGlBuffer> {
        self.gl.create_buffer()
    }

    fn delete_buffer(&mut self, buffer: &WebGlBuffer) {
        self.gl.delete_buffer(Some(buffer));
    }

    fn bind_buffer(&mut self, target: u32, buffer: Option<&WebGlBuffer>) {
        self.gl.bind_buffer(target, buffer);
    }

    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32) {
        self.gl.buffer_data_with_u8_array(target, data, usage);
    }

    fn buffer_data_size(&mut self, target: u32, size: i64, usage: u32) {
        self.gl.buffer_data_with_i32(target, size as i32, usage);
    }

    fn buffer_sub_data(&mut self, target: u32, offset: i64, data: &[u8]) {
        self.gl
            .buffer_sub_data_with_i32_and_u8_array(target, offset as i32, data);
    }

    fn create_texture(&mut self) -> Option<WebGlTexture> {
        self.gl.create_texture()
    }

    fn delete_texture(&mut self, texture: &WebGlTexture) {
        self.gl.delete_texture(Some(texture));
    }

    fn bind_texture(&mut self, target: u32, texture: Option<&WebGlTexture>) {
        self.gl.bind_texture(target, texture);
    }

    fn create_framebuffer(&mut self) -> Option<WebGlFramebuffer> {
        self.gl.create_framebuffer()
    }

    fn delete_framebuffer(&mut self, framebuffer: &WebGlFramebuffer) {
        self.gl.delete_framebuffer(Some(framebuffer));
    }

    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<&WebGlFramebuffer>) {
        self.gl.bind_framebuffer(target, framebuffer);
    }

    fn create_renderbuffer(&mut self) -> Option<WebGlRenderbuffer> {
        self.gl.create_renderbuffer()
    }

    fn delete_renderbuffer(&mut self, renderbuffer: &WebGlRenderbuffer) {
        self.gl.delete_renderbuffer(Some(renderbuffer));
    }

    fn create_vertex_array(&mut self) -> Option<WebGlVertexArrayObject> {
        self.gl.create_vertex_array()
    }

    fn delete_vertex_array(&mut self, vao: &WebGlVertexArrayObject) {
        self.gl.delete_vertex_array(Some(vao));
    }

    fn bind_vertex_array(&mut self, vao: Option<&WebGlVertexArrayObject>) {
        self.gl.bind_vertex_array(vao);
    }

    fn create_shader(&mut self, shader_type: u32) -> Option<WebGlShader> {
        self.gl.create_shader(shader_type)
    }

    fn delete_shader(&mut self, shader: &WebGlShader) {
        self.gl.delete_shader(Some(shader));
    }

    fn shader_source(&mut self, shader: &WebGlShader, source: &str) {
        self.gl.shader_source(shader, source);
    }

    fn compile_shader(&mut self, shader: &WebGlShader) {
        self.gl.compile_shader(shader);
    }

    fn get_shader_info_log(&self, shader: &WebGlShader) -> Option<String> {
        self.gl.get_shader_info_log(shader)
    }

    fn get_shader_source(&self, shader: &WebGlShader) -> Option<String> {
        self.gl.get_shader_source(shader)
    }

    fn get_shader_parameter(&self, shader: &WebGlShader, pname: u32) -> i32 {
        let value = self.gl.get_shader_parameter(shader, pname);
        value
            .as_f64()
            .map(|v| v as i32)
            .or_else(|| value.as_bool().map(i32::from))
            .unwrap_or(0)
    }

    fn create_program(&mut self) -> Option<WebGlProgram> {
        self.gl.create_program()
    }

    fn delete_program(&mut self, program: &WebGlProgram) {
        self.gl.delete_program(Some(program));
    }

    fn attach_shader(&mut self, program: &WebGlProgram, shader: &WebGlShader) {
        self.gl.attach_shader(program, shader);
    }

    fn link_program(&mut self, program: &WebGlProgram) {
        self.gl.link_program(program);
    }

    fn use_program(&mut self, program: Option<&WebGlProgram>) {
        self.gl.use_program(program);
    }

    fn get_program_info_log(&self, program: &WebGlProgram) -> Option<String> {
        self.gl.get_program_info_log(program)
    }

    fn get_program_parameter(&self, program: &WebGlProgram, pname: u32) -> i32 {
        let value = self.gl.get_program_parameter(program, pname);
        value
            .as_f64()
            .map(|v| v as i32)
            .or_else(|| value.as_bool().map(i32::from))
            .unwrap_or(0)
    }

    fn active_uniform_count(&self, program: &WebGlProgram) -> u32 {
        self.gl
            .get_program_parameter(program, Gl::ACTIVE_UNIFORMS)
            .as_f64()
            .unwrap_or(0.0) as u32
    }

    fn get_active_uniform(&self, program: &WebGlProgram, index: u32) -> Option<ActiveUniform> {
        let info = self.gl.get_active_uniform(program, index)?;
        Some(ActiveUniform {
            name: info.name(),
            size: info.size() as u32,
        })
    }

    fn get_uniform_location(
        &self,
        program: &WebGlProgram,
        name: &str,
    ) -> Option<WebGlUniformLocation> {
        self.gl.get_uniform_location(program, name)
    }

    fn get_attrib_location(&self, program: &WebGlProgram, name: &str) -> i32 {
        self.gl.get_attrib_location(program, name)
    }

    fn uniform1i(&mut self, location: &WebGlUniformLocation, x: i32) {
        self.gl.uniform1i(Some(location), x);
    }

    fn uniform4fv(&mut self, location: &WebGlUniformLocation, values: &[f32]) {
        self.gl.uniform4fv_with_f32_array(Some(location), values);
    }

    fn uniform_matrix4fv(&mut self, location: &WebGlUniformLocation, values: &[f32]) {
        self.gl
            .uniform_matrix4fv_with_f32_array(Some(location), false, values);
    }

    fn clear(&mut self, mask: u32) {
        self.gl.clear(mask);
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.gl.clear_color(r, g, b, a);
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.gl.viewport(x, y, width, height);
    }

    fn enable(&mut self, cap: u32) {
        self.gl.enable(cap);
    }

    fn disable(&mut self, cap: u32) {
        self.gl.disable(cap);
    }

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        self.gl.draw_arrays(mode, first, count);
    }

    fn draw_elements(&mut self, mode: u32, count: i32, element_type: u32, offset: i64) {
        self.gl
            .draw_elements_with_i32(mode, count, element_type, offset as i32);
    }
}
