use weft_mem::{MemView, PtrWidth, VecMemory};
use weft_webgl::{
    ActiveUniform, ContextAttributes, GlError, RecordingGl, WebGl, GL_INFO_LOG_LENGTH,
    GL_INVALID_OPERATION,
};

fn view(mem: &VecMemory) -> MemView<'_, VecMemory> {
    MemView::new(mem, PtrWidth::Four)
}

#[test]
fn object_ids_come_from_one_shared_counter() {
    let mut gl = WebGl::new(RecordingGl::webgl2());
    let buffer = gl.create_buffer();
    let texture = gl.create_texture();
    let program = gl.create_program();
    assert_eq!((buffer, texture, program), (1, 2, 3));

    gl.delete_texture(texture);
    // Freed ids are not reused.
    assert_eq!(gl.create_texture(), 4);
}

#[test]
fn failed_creation_returns_zero_and_records_error() {
    let mut gl = WebGl::new(RecordingGl::webgl2());
    gl.ctx_mut().fail_next_create = true;
    assert_eq!(gl.create_buffer(), 0);

    // First error wins; GetError reads and clears.
    assert_eq!(gl.get_error(), GL_INVALID_OPERATION);
    assert_eq!(gl.get_error(), 0);
}

#[test]
fn shader_source_concatenates_string_headers() {
    let mem = VecMemory::new(512);
    let v = view(&mem);
    let mut gl = WebGl::new(RecordingGl::webgl2());
    let shader = gl.create_shader(0x8B31);

    let a = v.store_string(256, "precision highp float;\n").unwrap();
    let b = v.store_string(320, "void main() {}\n").unwrap();
    // Two (ptr, len) headers, stride 8 on the 32-bit target.
    v.store_ptr(0, 256).unwrap();
    v.store_uint(4, a as u64).unwrap();
    v.store_ptr(8, 320).unwrap();
    v.store_uint(12, b as u64).unwrap();

    let source = gl.shader_source_from_strings(&v, 0, 2).unwrap();
    assert_eq!(source, "precision highp float;\nvoid main() {}\n");

    gl.shader_source(&v, shader, 0, 2).unwrap();
    gl.compile_shader(shader);
    assert!(gl
        .ctx()
        .calls
        .iter()
        .any(|c| c.starts_with("shader_source")));
}

#[test]
fn info_log_probe_then_fill() {
    let mem = VecMemory::new(256);
    let v = view(&mem);
    let mut gl = WebGl::new(RecordingGl::webgl2());
    let shader = gl.create_shader(0x8B30);
    gl.ctx_mut()
        .shader_logs
        .insert(1, "ERROR: 0:1: bad cast".to_owned());

    // Probe: GetShaderiv(INFO_LOG_LENGTH) reports length + NUL.
    gl.get_shader_iv(&v, shader, GL_INFO_LOG_LENGTH, 0).unwrap();
    gl.get_shader_iv(&v, shader, GL_INFO_LOG_LENGTH, 16).unwrap();
    let needed = v.load_int(16).unwrap();
    assert_eq!(needed, "ERROR: 0:1: bad cast".len() as i64 + 1);

    // Fill with a buffer of exactly the reported size.
    gl.get_shader_info_log(&v, shader, 64, needed as u64, 32)
        .unwrap();
    let written = v.load_int(32).unwrap();
    assert_eq!(written, "ERROR: 0:1: bad cast".len() as i64);
    assert_eq!(
        v.load_string(64, written as usize).unwrap(),
        "ERROR: 0:1: bad cast"
    );

    // A tiny buffer truncates and reports the truncated length.
    gl.get_shader_info_log(&v, shader, 64, 5, 32).unwrap();
    assert_eq!(v.load_int(32).unwrap(), 5);
    assert_eq!(v.load_string(64, 5).unwrap(), "ERROR");
}

#[test]
fn uniform_locations_resolve_array_elements() {
    let mem = VecMemory::new(256);
    let v = view(&mem);
    let mut gl = WebGl::new(RecordingGl::webgl2());
    let program = gl.create_program();
    gl.ctx_mut().program_uniforms.insert(
        1,
        vec![
            ActiveUniform {
                name: "u_color".to_owned(),
                size: 1,
            },
            ActiveUniform {
                name: "u_lights[0]".to_owned(),
                size: 3,
            },
        ],
    );
    gl.link_program(program);

    let n = v.store_string(0, "u_color").unwrap();
    let color = gl.get_uniform_location(&v, program, 0, n as u64).unwrap();
    assert!(color >= 0);

    let n = v.store_string(32, "u_lights").unwrap();
    let base = gl.get_uniform_location(&v, program, 32, n as u64).unwrap();
    let n = v.store_string(64, "u_lights[2]").unwrap();
    let third = gl.get_uniform_location(&v, program, 64, n as u64).unwrap();
    assert_eq!(third, base + 2);

    let n = v.store_string(96, "u_lights[3]").unwrap();
    assert_eq!(
        gl.get_uniform_location(&v, program, 96, n as u64).unwrap(),
        -1
    );

    let n = v.store_string(128, "u_missing").unwrap();
    assert_eq!(
        gl.get_uniform_location(&v, program, 128, n as u64).unwrap(),
        -1
    );

    // Uploads resolve through the location table.
    v.store_f32(160, 1.0).unwrap();
    v.store_f32(164, 0.5).unwrap();
    v.store_f32(168, 0.25).unwrap();
    v.store_f32(172, 1.0).unwrap();
    gl.uniform4fv(&v, color, 160).unwrap();
    assert!(gl.ctx().calls.iter().any(|c| c.starts_with("uniform4fv")));
}

#[test]
fn vertex_arrays_require_webgl2() {
    let mut gl = WebGl::new(RecordingGl::webgl1());
    assert!(matches!(gl.create_vertex_array(), Err(GlError::NotWebGl2)));

    let mut gl = WebGl::new(RecordingGl::webgl2());
    let vao = gl.create_vertex_array().unwrap();
    gl.bind_vertex_array(vao).unwrap();
    gl.bind_vertex_array(0).unwrap();
}

#[test]
fn buffer_data_distinguishes_null_pointer() {
    let mem = VecMemory::new(64);
    let v = view(&mem);
    let mut gl = WebGl::new(RecordingGl::webgl2());
    let buffer = gl.create_buffer();
    gl.bind_buffer(0x8892, buffer);

    gl.buffer_data(&v, 0x8892, 16, 0, 0x88E4).unwrap();
    gl.buffer_data(&v, 0x8892, 16, 8, 0x88E4).unwrap();
    let calls = &gl.ctx().calls;
    assert!(calls.iter().any(|c| c.starts_with("buffer_data_size")));
    assert!(calls.iter().any(|c| c.starts_with("buffer_data(")));
}

#[test]
fn context_attribute_bits_round_trip() {
    let attrs = ContextAttributes::DISABLE_ANTIALIAS | ContextAttributes::STENCIL;
    assert_eq!(attrs.bits(), (1 << 1) | (1 << 6));
    assert_eq!(ContextAttributes::from_bits_truncate(attrs.bits()), attrs);
}
