use std::collections::HashMap;

use weft_abi::DecodeError;
use weft_mem::{MemView, MemoryError, WasmMemory};

use crate::context::{GlContext, GlVersion};
use crate::{GL_INFO_LOG_LENGTH, GL_INVALID_OPERATION, GL_INVALID_VALUE, GL_SHADER_SOURCE_LENGTH};

bitflags::bitflags! {
    /// Context-creation attribute mask. Most flags are inverted: a set bit
    /// disables a default-on attribute.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ContextAttributes: u32 {
        const DISABLE_ALPHA                    = 1 << 0;
        const DISABLE_ANTIALIAS                = 1 << 1;
        const DISABLE_DEPTH                    = 1 << 2;
        const FAIL_IF_MAJOR_PERFORMANCE_CAVEAT = 1 << 3;
        const DISABLE_PREMULTIPLIED_ALPHA      = 1 << 4;
        const PRESERVE_DRAWING_BUFFER          = 1 << 5;
        const STENCIL                          = 1 << 6;
        const DESYNCHRONIZED                   = 1 << 7;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GlError {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("WebGL2 procedure called in a canvas without a WebGL2 context")]
    NotWebGl2,
}

#[derive(Debug, Default)]
struct ProgramInfo {
    /// Uniform base name -> (array size, first location id).
    uniforms: HashMap<String, (u32, u32)>,
    max_uniform_length: usize,
}

/// Adapter for the `webgl`/`webgl2` import namespaces over a [`GlContext`].
pub struct WebGl<C: GlContext> {
    ctx: C,
    /// Shared id counter: every category draws from it, ids are never
    /// reused.
    counter: u32,
    last_error: u32,
    buffers: HashMap<u32, C::Buffer>,
    shaders: HashMap<u32, C::Shader>,
    programs: HashMap<u32, C::Program>,
    textures: HashMap<u32, C::Texture>,
    framebuffers: HashMap<u32, C::Framebuffer>,
    renderbuffers: HashMap<u32, C::Renderbuffer>,
    vertex_arrays: HashMap<u32, C::VertexArray>,
    uniforms: HashMap<u32, C::UniformLocation>,
    program_infos: HashMap<u32, ProgramInfo>,
}

impl<C: GlContext> WebGl<C> {
    pub fn new(ctx: C) -> Self {
        Self {
            ctx,
            counter: 0,
            last_error: 0,
            buffers: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            renderbuffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            uniforms: HashMap::new(),
            program_infos: HashMap::new(),
        }
    }

    pub fn ctx(&self) -> &C {
        &self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut C {
        &mut self.ctx
    }

    fn new_id(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }

    /// First recorded error wins until `GetError` clears it.
    fn record_error(&mut self, code: u32) {
        if self.last_error == 0 {
            self.last_error = code;
        }
    }

    fn assert_webgl2(&self) -> Result<(), GlError> {
        if self.ctx.version() < GlVersion::WebGl2 {
            return Err(GlError::NotWebGl2);
        }
        Ok(())
    }

    pub fn get_error(&mut self) -> u32 {
        let err = std::mem::take(&mut self.last_error);
        if err != 0 {
            return err;
        }
        self.ctx.get_error()
    }

    pub fn drawing_buffer_width(&self) -> i32 {
        self.ctx.drawing_buffer_width()
    }

    pub fn drawing_buffer_height(&self) -> i32 {
        self.ctx.drawing_buffer_height()
    }

    pub fn is_extension_supported<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        name_ptr: u64,
        name_len: u64,
    ) -> Result<bool, GlError> {
        let name = view.load_string(name_ptr, name_len as usize)?;
        Ok(self.ctx.is_extension_supported(&name))
    }

    pub fn get_webgl_version<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        major_ptr: u64,
        minor_ptr: u64,
    ) -> Result<(), GlError> {
        let major = match self.ctx.version() {
            GlVersion::WebGl1 => 1,
            GlVersion::WebGl2 => 2,
        };
        view.store_i32(major_ptr, major)?;
        view.store_i32(minor_ptr, 0)?;
        Ok(())
    }

    /* ----------------------------- objects ----------------------------- */

    /// Handle 0 plus a recorded error when the context refuses the object.
    pub fn create_buffer(&mut self) -> u32 {
        match self.ctx.create_buffer() {
            Some(buffer) => {
                let id = self.new_id();
                self.buffers.insert(id, buffer);
                id
            }
            None => {
                self.record_error(GL_INVALID_OPERATION);
                0
            }
        }
    }

    pub fn delete_buffer(&mut self, id: u32) {
        if id == 0 {
            return;
        }
        if let Some(buffer) = self.buffers.remove(&id) {
            self.ctx.delete_buffer(&buffer);
        }
    }

    pub fn bind_buffer(&mut self, target: u32, id: u32) {
        if id == 0 {
            self.ctx.bind_buffer(target, None);
        } else {
            self.ctx.bind_buffer(target, self.buffers.get(&id));
        }
    }

    /// Null data pointer allocates `size` bytes without an upload.
    pub fn buffer_data<M: WasmMemory + ?Sized>(
        &mut self,
        view: &MemView<'_, M>,
        target: u32,
        size: i64,
        data_ptr: u64,
        usage: u32,
    ) -> Result<(), GlError> {
        if data_ptr == 0 {
            self.ctx.buffer_data_size(target, size, usage);
        } else {
            let data = view.load_bytes(data_ptr, size as usize)?;
            self.ctx.buffer_data(target, &data, usage);
        }
        Ok(())
    }

    pub fn buffer_sub_data<M: WasmMemory + ?Sized>(
        &mut self,
        view: &MemView<'_, M>,
        target: u32,
        offset: i64,
        size: i64,
        data_ptr: u64,
    ) -> Result<(), GlError> {
        if data_ptr != 0 {
            let data = view.load_bytes(data_ptr, size as usize)?;
            self.ctx.buffer_sub_data(target, offset, &data);
        }
        Ok(())
    }

    pub fn create_texture(&mut self) -> u32 {
        match self.ctx.create_texture() {
            Some(texture) => {
                let id = self.new_id();
                self.textures.insert(id, texture);
                id
            }
            None => {
                self.record_error(GL_INVALID_OPERATION);
                0
            }
        }
    }

    pub fn delete_texture(&mut self, id: u32) {
        if id == 0 {
            return;
        }
        if let Some(texture) = self.textures.remove(&id) {
            self.ctx.delete_texture(&texture);
        }
    }

    pub fn bind_texture(&mut self, target: u32, id: u32) {
        if id == 0 {
            self.ctx.bind_texture(target, None);
        } else {
            self.ctx.bind_texture(target, self.textures.get(&id));
        }
    }

    pub fn create_framebuffer(&mut self) -> u32 {
        match self.ctx.create_framebuffer() {
            Some(framebuffer) => {
                let id = self.new_id();
                self.framebuffers.insert(id, framebuffer);
                id
            }
            None => {
                self.record_error(GL_INVALID_OPERATION);
                0
            }
        }
    }

    pub fn delete_framebuffer(&mut self, id: u32) {
        if id == 0 {
            return;
        }
        if let Some(framebuffer) = self.framebuffers.remove(&id) {
            self.ctx.delete_framebuffer(&framebuffer);
        }
    }

    pub fn bind_framebuffer(&mut self, target: u32, id: u32) {
        if id == 0 {
            self.ctx.bind_framebuffer(target, None);
        } else {
            self.ctx.bind_framebuffer(target, self.framebuffers.get(&id));
        }
    }

    pub fn create_renderbuffer(&mut self) -> u32 {
        match self.ctx.create_renderbuffer() {
            Some(renderbuffer) => {
                let id = self.new_id();
                self.renderbuffers.insert(id, renderbuffer);
                id
            }
            None => {
                self.record_error(GL_INVALID_OPERATION);
                0
            }
        }
    }

    pub fn delete_renderbuffer(&mut self, id: u32) {
        if id == 0 {
            return;
        }
        if let Some(renderbuffer) = self.renderbuffers.remove(&id) {
            self.ctx.delete_renderbuffer(&renderbuffer);
        }
    }

    pub fn create_vertex_array(&mut self) -> Result<u32, GlError> {
        self.assert_webgl2()?;
        Ok(match self.ctx.create_vertex_array() {
            Some(vao) => {
                let id = self.new_id();
                self.vertex_arrays.insert(id, vao);
                id
            }
            None => {
                self.record_error(GL_INVALID_OPERATION);
                0
            }
        })
    }

    pub fn delete_vertex_array(&mut self, id: u32) -> Result<(), GlError> {
        self.assert_webgl2()?;
        if id == 0 {
            return Ok(());
        }
        if let Some(vao) = self.vertex_arrays.remove(&id) {
            self.ctx.delete_vertex_array(&vao);
        }
        Ok(())
    }

    pub fn bind_vertex_array(&mut self, id: u32) -> Result<(), GlError> {
        self.assert_webgl2()?;
        if id == 0 {
            self.ctx.bind_vertex_array(None);
        } else {
            self.ctx.bind_vertex_array(self.vertex_arrays.get(&id));
        }
        Ok(())
    }

    /* ----------------------------- shaders ----------------------------- */

    pub fn create_shader(&mut self, shader_type: u32) -> u32 {
        match self.ctx.create_shader(shader_type) {
            Some(shader) => {
                let id = self.new_id();
                self.shaders.insert(id, shader);
                id
            }
            None => {
                self.record_error(GL_INVALID_OPERATION);
                0
            }
        }
    }

    pub fn delete_shader(&mut self, id: u32) {
        if id == 0 {
            return;
        }
        if let Some(shader) = self.shaders.remove(&id) {
            self.ctx.delete_shader(&shader);
        }
    }

    /// Concatenates an array of `(ptr, len)` string headers into one source
    /// string. The header stride is two pointer-width words.
    pub fn shader_source_from_strings<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        strings_ptr: u64,
        strings_len: u64,
    ) -> Result<String, GlError> {
        let stride = view.ptr_width().size() * 2;
        let mut source = String::new();
        for i in 0..strings_len {
            let base = strings_ptr + i * stride;
            let ptr = view.load_ptr(base)?;
            let len = view.load_ptr(base + view.ptr_width().size())?;
            source.push_str(&view.load_string(ptr, len as usize)?);
        }
        Ok(source)
    }

    pub fn shader_source<M: WasmMemory + ?Sized>(
        &mut self,
        view: &MemView<'_, M>,
        shader: u32,
        strings_ptr: u64,
        strings_len: u64,
    ) -> Result<(), GlError> {
        let source = self.shader_source_from_strings(view, strings_ptr, strings_len)?;
        if let Some(shader) = self.shaders.get(&shader) {
            self.ctx.shader_source(shader, &source);
        }
        Ok(())
    }

    pub fn compile_shader(&mut self, shader: u32) {
        if let Some(shader) = self.shaders.get(&shader) {
            self.ctx.compile_shader(shader);
        }
    }

    pub fn attach_shader(&mut self, program: u32, shader: u32) {
        if let (Some(program), Some(shader)) =
            (self.programs.get(&program), self.shaders.get(&shader))
        {
            self.ctx.attach_shader(program, shader);
        }
    }

    pub fn create_program(&mut self) -> u32 {
        match self.ctx.create_program() {
            Some(program) => {
                let id = self.new_id();
                self.programs.insert(id, program);
                id
            }
            None => {
                self.record_error(GL_INVALID_OPERATION);
                0
            }
        }
    }

    pub fn delete_program(&mut self, id: u32) {
        if id == 0 {
            return;
        }
        if let Some(program) = self.programs.remove(&id) {
            self.ctx.delete_program(&program);
        }
        self.program_infos.remove(&id);
    }

    pub fn link_program(&mut self, program: u32) {
        if let Some(p) = self.programs.get(&program) {
            self.ctx.link_program(p);
        }
        self.populate_uniform_table(program);
    }

    pub fn use_program(&mut self, program: u32) {
        if program == 0 {
            self.ctx.use_program(None);
        } else {
            self.ctx.use_program(self.programs.get(&program));
        }
    }

    /// Builds the per-program uniform location table: one id per array
    /// element, consecutive from the base name's id.
    fn populate_uniform_table(&mut self, program: u32) {
        let Some(p) = self.programs.get(&program) else {
            return;
        };

        let mut info = ProgramInfo::default();
        let count = self.ctx.active_uniform_count(p);
        let mut allocated = Vec::new();
        for i in 0..count {
            let Some(uniform) = self.ctx.get_active_uniform(p, i) else {
                continue;
            };
            info.max_uniform_length = info.max_uniform_length.max(uniform.name.len() + 1);

            let mut name = uniform.name.clone();
            if name.ends_with(']') {
                if let Some(bracket) = name.rfind('[') {
                    name.truncate(bracket);
                }
            }

            if let Some(location) = self.ctx.get_uniform_location(p, &name) {
                self.counter += 1;
                let base_id = self.counter;
                allocated.push((base_id, location));
                info.uniforms.insert(name.clone(), (uniform.size, base_id));

                for j in 1..uniform.size {
                    let indexed = format!("{name}[{j}]");
                    self.counter += 1;
                    if let Some(location) = self.ctx.get_uniform_location(p, &indexed) {
                        allocated.push((self.counter, location));
                    }
                }
            }
        }
        for (id, location) in allocated {
            self.uniforms.insert(id, location);
        }
        self.program_infos.insert(program, info);
    }

    /// Resolves a uniform name (optionally with an `[index]` suffix) to its
    /// location id, or -1.
    pub fn get_uniform_location<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        program: u32,
        name_ptr: u64,
        name_len: u64,
    ) -> Result<i32, GlError> {
        let mut name = view.load_string(name_ptr, name_len as usize)?;

        let mut array_offset: u32 = 0;
        if name.ends_with(']') {
            if let Some(bracket) = name.rfind('[') {
                let index = &name[bracket + 1..name.len() - 1];
                if !index.is_empty() {
                    match index.parse::<i64>() {
                        Ok(parsed) if parsed >= 0 => array_offset = parsed as u32,
                        _ => return Ok(-1),
                    }
                }
                name.truncate(bracket);
            }
        }

        let Some(info) = self.program_infos.get(&program) else {
            return Ok(-1);
        };
        match info.uniforms.get(&name) {
            Some(&(size, base_id)) if array_offset < size => {
                Ok((base_id + array_offset) as i32)
            }
            _ => Ok(-1),
        }
    }

    pub fn get_attrib_location<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        program: u32,
        name_ptr: u64,
        name_len: u64,
    ) -> Result<i32, GlError> {
        let name = view.load_string(name_ptr, name_len as usize)?;
        match self.programs.get(&program) {
            Some(program) => Ok(self.ctx.get_attrib_location(program, &name)),
            None => Ok(-1),
        }
    }

    /* ------------------------ probe-then-fill ------------------------- */

    /// `GetShaderiv`: the log/source length pnames are answered host-side
    /// (the probe half of probe-then-fill); everything else passes through.
    pub fn get_shader_iv<M: WasmMemory + ?Sized>(
        &mut self,
        view: &MemView<'_, M>,
        shader: u32,
        pname: u32,
        p_ptr: u64,
    ) -> Result<(), GlError> {
        if p_ptr == 0 {
            self.record_error(GL_INVALID_VALUE);
            return Ok(());
        }
        let Some(s) = self.shaders.get(&shader) else {
            return Ok(());
        };
        match pname {
            GL_INFO_LOG_LENGTH => {
                let log = self
                    .ctx
                    .get_shader_info_log(s)
                    .unwrap_or_else(|| "(unknown error)".to_owned());
                view.store_int(p_ptr, log.len() as i64 + 1)?;
            }
            GL_SHADER_SOURCE_LENGTH => {
                let len = match self.ctx.get_shader_source(s) {
                    Some(source) if !source.is_empty() => source.len() as i64 + 1,
                    _ => 0,
                };
                view.store_int(p_ptr, len)?;
            }
            _ => {
                let param = self.ctx.get_shader_parameter(s, pname);
                view.store_i32(p_ptr, param)?;
            }
        }
        Ok(())
    }

    /// The fill half: copies the log into the caller's buffer, capped at
    /// `buf_len`, and reports the written length through `length_ptr`.
    pub fn get_shader_info_log<M: WasmMemory + ?Sized>(
        &mut self,
        view: &MemView<'_, M>,
        shader: u32,
        buf_ptr: u64,
        buf_len: u64,
        length_ptr: u64,
    ) -> Result<(), GlError> {
        let log = self
            .shaders
            .get(&shader)
            .and_then(|s| self.ctx.get_shader_info_log(s))
            .unwrap_or_else(|| "(unknown error)".to_owned());
        write_capped(view, &log, buf_ptr, buf_len, length_ptr)
    }

    pub fn get_program_info_log<M: WasmMemory + ?Sized>(
        &mut self,
        view: &MemView<'_, M>,
        program: u32,
        buf_ptr: u64,
        buf_len: u64,
        length_ptr: u64,
    ) -> Result<(), GlError> {
        let log = self
            .programs
            .get(&program)
            .and_then(|p| self.ctx.get_program_info_log(p))
            .unwrap_or_else(|| "(unknown error)".to_owned());
        write_capped(view, &log, buf_ptr, buf_len, length_ptr)
    }

    pub fn get_program_parameter(&self, program: u32, pname: u32) -> i32 {
        match self.programs.get(&program) {
            Some(p) => self.ctx.get_program_parameter(p, pname),
            None => 0,
        }
    }

    /* ----------------------------- uniforms ---------------------------- */

    pub fn uniform1i(&mut self, location: i32, x: i32) {
        if let Some(loc) = self.location(location) {
            self.ctx.uniform1i(&loc, x);
        }
    }

    pub fn uniform4fv<M: WasmMemory + ?Sized>(
        &mut self,
        view: &MemView<'_, M>,
        location: i32,
        values_ptr: u64,
    ) -> Result<(), GlError> {
        let values = load_f32_slice(view, values_ptr, 4)?;
        if let Some(loc) = self.location(location) {
            self.ctx.uniform4fv(&loc, &values);
        }
        Ok(())
    }

    pub fn uniform_matrix4fv<M: WasmMemory + ?Sized>(
        &mut self,
        view: &MemView<'_, M>,
        location: i32,
        values_ptr: u64,
    ) -> Result<(), GlError> {
        let values = load_f32_slice(view, values_ptr, 16)?;
        if let Some(loc) = self.location(location) {
            self.ctx.uniform_matrix4fv(&loc, &values);
        }
        Ok(())
    }

    fn location(&self, location: i32) -> Option<C::UniformLocation> {
        u32::try_from(location)
            .ok()
            .and_then(|id| self.uniforms.get(&id))
            .cloned()
    }

    /* ------------------------------ state ------------------------------ */

    pub fn clear(&mut self, mask: u32) {
        self.ctx.clear(mask);
    }

    pub fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.ctx.clear_color(r, g, b, a);
    }

    pub fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.ctx.viewport(x, y, width, height);
    }

    pub fn enable(&mut self, cap: u32) {
        self.ctx.enable(cap);
    }

    pub fn disable(&mut self, cap: u32) {
        self.ctx.disable(cap);
    }

    pub fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        self.ctx.draw_arrays(mode, first, count);
    }

    pub fn draw_elements(&mut self, mode: u32, count: i32, element_type: u32, offset: i64) {
        self.ctx.draw_elements(mode, count, element_type, offset);
    }
}

fn load_f32_slice<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
    count: usize,
) -> Result<Vec<f32>, MemoryError> {
    let mut values = Vec::with_capacity(count);
    for i in 0..count {
        values.push(view.load_f32(ptr + (i as u64) * 4)?);
    }
    Ok(values)
}

fn write_capped<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    text: &str,
    buf_ptr: u64,
    buf_len: u64,
    length_ptr: u64,
) -> Result<(), GlError> {
    if buf_len == 0 || buf_ptr == 0 {
        return Ok(());
    }
    let mut end = (buf_len as usize).min(text.len());
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    view.store_bytes(buf_ptr, &text.as_bytes()[..end])?;
    view.store_int(length_ptr, end as i64)?;
    Ok(())
}
