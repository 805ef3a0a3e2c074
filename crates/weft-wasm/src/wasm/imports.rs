//! The import namespaces handed to `WebAssembly.instantiate`.
//!
//! Function names and arities here are the compatibility contract with the
//! compiled guest module; they must not be renamed or reordered.

use js_sys::Object;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use weft_wgpu::callback::GuestCallback;
use weft_wgpu::{ComputeCmd, RenderCmd};

use super::gl::CanvasGl;
use super::{set_gl, with_dom, with_env, with_gl, with_gpu, with_view};
use weft_webgl::WebGl;

macro_rules! bind {
    ($ns:expr, $name:literal, [$($arg:ident: $ty:ty),*], $body:expr) => {{
        let closure = Closure::wrap(
            Box::new(move |$($arg: $ty),*| $body) as Box<dyn FnMut($($ty),*)>
        );
        js_sys::Reflect::set($ns, &JsValue::from_str($name), closure.as_ref())
            .expect_throw("import object entry");
        closure.forget();
    }};
    ($ns:expr, $name:literal, [$($arg:ident: $ty:ty),*] -> $ret:ty, $body:expr) => {{
        let closure = Closure::wrap(
            Box::new(move |$($arg: $ty),*| -> $ret { $body }) as Box<dyn FnMut($($ty),*) -> $ret>
        );
        js_sys::Reflect::set($ns, &JsValue::from_str($name), closure.as_ref())
            .expect_throw("import object entry");
        closure.forget();
    }};
}

fn ok_or_throw<T>(result: Result<T, impl std::fmt::Display>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => wasm_bindgen::throw_str(&err.to_string()),
    }
}

fn callback(fnptr: u32, userdata: u32) -> GuestCallback {
    GuestCallback {
        fnptr,
        userdata: userdata as u64,
    }
}

pub fn build() -> JsValue {
    let imports = Object::new();
    let set_ns = |name: &str, ns: &Object| {
        js_sys::Reflect::set(&imports, &JsValue::from_str(name), ns)
            .expect_throw("import namespace");
    };

    set_ns("env", &Object::new());
    set_ns("odin_env", &odin_env());
    set_ns("odin_dom", &odin_dom());
    set_ns("webgl", &webgl());
    set_ns("webgl2", &webgl2());
    set_ns("wgpu", &wgpu_ns());
    imports.into()
}

fn odin_env() -> Object {
    let ns = Object::new();

    bind!(&ns, "write", [fd: i32, ptr: u32, len: u32], {
        let result = with_view(|view| {
            with_env(|env| env.write(view, fd, ptr as u64, len as u64))
        });
        ok_or_throw(result)
    });
    bind!(&ns, "trap", [], {
        wasm_bindgen::throw_str("trap");
    });
    bind!(&ns, "abort", [], {
        with_env(|env| env.console_mut().flush());
        wasm_bindgen::throw_str("abort");
    });
    bind!(&ns, "alert", [ptr: u32, len: u32], {
        ok_or_throw(with_view(|view| {
            with_env(|env| env.alert(view, ptr as u64, len as u64))
        }))
    });
    bind!(&ns, "evaluate", [ptr: u32, len: u32], {
        ok_or_throw(with_view(|view| {
            with_env(|env| env.evaluate(view, ptr as u64, len as u64))
        }))
    });
    bind!(&ns, "time_now", [] -> f64, { with_env(|env| env.time_now()) as f64 });
    bind!(&ns, "tick_now", [] -> f64, { with_env(|env| env.tick_now()) as f64 });
    bind!(&ns, "time_sleep", [duration_ms: f64], {
        with_env(|env| env.time_sleep(duration_ms as i64))
    });
    bind!(&ns, "rand_bytes", [ptr: u32, len: u32], {
        ok_or_throw(with_view(|view| {
            with_env(|env| env.rand_bytes(view, ptr as u64, len as u64))
        }))
    });

    bind!(&ns, "sqrt", [x: f64] -> f64, weft_env::math::sqrt(x));
    bind!(&ns, "sin", [x: f64] -> f64, weft_env::math::sin(x));
    bind!(&ns, "cos", [x: f64] -> f64, weft_env::math::cos(x));
    bind!(&ns, "pow", [x: f64, power: f64] -> f64, weft_env::math::pow(x, power));
    bind!(&ns, "fmuladd", [x: f64, y: f64, z: f64] -> f64, weft_env::math::fmuladd(x, y, z));
    bind!(&ns, "ln", [x: f64] -> f64, weft_env::math::ln(x));
    bind!(&ns, "exp", [x: f64] -> f64, weft_env::math::exp(x));
    bind!(&ns, "ldexp", [x: f64, exp: i32] -> f64, weft_env::math::ldexp(x, exp));

    ns
}

fn odin_dom() -> Object {
    let ns = Object::new();

    bind!(&ns, "init_event_raw", [ep: u32], {
        ok_or_throw(with_view(|view| {
            with_dom(|dom| dom.init_event_raw(view, ep as u64))
        }))
    });
    bind!(
        &ns,
        "add_event_listener",
        [id_ptr: u32, id_len: u32, name_ptr: u32, name_len: u32, name_code: u32, data: u32,
            cb: u32, use_capture: i32] -> i32,
        {
            let ok = ok_or_throw(with_view(|view| {
                with_dom(|dom| {
                    dom.add_event_listener(
                        view,
                        id_ptr as u64,
                        id_len as u64,
                        name_ptr as u64,
                        name_len as u64,
                        name_code,
                        data as u64,
                        cb as u64,
                        use_capture != 0,
                    )
                })
            }));
            ok as i32
        }
    );
    bind!(
        &ns,
        "remove_event_listener",
        [id_ptr: u32, id_len: u32, name_ptr: u32, name_len: u32, data: u32, cb: u32] -> i32,
        {
            let ok = ok_or_throw(with_view(|view| {
                with_dom(|dom| {
                    dom.remove_event_listener(
                        view,
                        id_ptr as u64,
                        id_len as u64,
                        name_ptr as u64,
                        name_len as u64,
                        data as u64,
                        cb as u64,
                    )
                })
            }));
            ok as i32
        }
    );
    bind!(
        &ns,
        "add_window_event_listener",
        [name_ptr: u32, name_len: u32, name_code: u32, data: u32, cb: u32, use_capture: i32]
            -> i32,
        {
            let ok = ok_or_throw(with_view(|view| {
                with_dom(|dom| {
                    dom.add_window_event_listener(
                        view,
                        name_ptr as u64,
                        name_len as u64,
                        name_code,
                        data as u64,
                        cb as u64,
                        use_capture != 0,
                    )
                })
            }));
            ok as i32
        }
    );
    bind!(
        &ns,
        "remove_window_event_listener",
        [name_ptr: u32, name_len: u32, data: u32, cb: u32] -> i32,
        {
            let ok = ok_or_throw(with_view(|view| {
                with_dom(|dom| {
                    dom.remove_window_event_listener(
                        view,
                        name_ptr as u64,
                        name_len as u64,
                        data as u64,
                        cb as u64,
                    )
                })
            }));
            ok as i32
        }
    );
    bind!(&ns, "event_stop_propagation", [], {
        with_dom(|dom| dom.event_stop_propagation())
    });
    bind!(&ns, "event_stop_immediate_propagation", [], {
        with_dom(|dom| dom.event_stop_immediate_propagation())
    });
    bind!(&ns, "event_prevent_default", [], {
        with_dom(|dom| dom.event_prevent_default())
    });
    bind!(&ns, "get_element_value_f64", [id_ptr: u32, id_len: u32] -> f64, {
        ok_or_throw(with_view(|view| {
            with_dom(|dom| dom.get_element_value_f64(view, id_ptr as u64, id_len as u64))
        }))
    });
    bind!(
        &ns,
        "get_element_value_string",
        [id_ptr: u32, id_len: u32, buf_ptr: u32, buf_len: u32] -> u32,
        {
            ok_or_throw(with_view(|view| {
                with_dom(|dom| {
                    dom.get_element_value_string(
                        view,
                        id_ptr as u64,
                        id_len as u64,
                        buf_ptr as u64,
                        buf_len as u64,
                    )
                })
            })) as u32
        }
    );
    bind!(&ns, "get_element_min_max", [dst_ptr: u32, id_ptr: u32, id_len: u32], {
        ok_or_throw(with_view(|view| {
            with_dom(|dom| dom.get_element_min_max(view, dst_ptr as u64, id_ptr as u64, id_len as u64))
        }))
    });
    bind!(&ns, "set_element_value_f64", [id_ptr: u32, id_len: u32, value: f64], {
        ok_or_throw(with_view(|view| {
            with_dom(|dom| dom.set_element_value_f64(view, id_ptr as u64, id_len as u64, value))
        }))
    });
    bind!(
        &ns,
        "set_element_value_string",
        [id_ptr: u32, id_len: u32, value_ptr: u32, value_len: u32],
        {
            ok_or_throw(with_view(|view| {
                with_dom(|dom| {
                    dom.set_element_value_string(
                        view,
                        id_ptr as u64,
                        id_len as u64,
                        value_ptr as u64,
                        value_len as u64,
                    )
                })
            }))
        }
    );

    ns
}

/// Creates the rendering context for the canvas with the given element id
/// and installs it as the current GL state.
fn create_context(id_ptr: u32, id_len: u32, attributes: u32) -> bool {
    let id = with_view(|view| view.load_string(id_ptr as u64, id_len as usize));
    let id = ok_or_throw(id);
    let Some(canvas) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(&id))
        .and_then(|e| e.dyn_into::<web_sys::HtmlCanvasElement>().ok())
    else {
        return false;
    };
    let attributes = weft_webgl::ContextAttributes::from_bits_truncate(attributes);
    match CanvasGl::from_canvas(&canvas, attributes) {
        Some(ctx) => {
            set_gl(Some(WebGl::new(ctx)));
            true
        }
        None => false,
    }
}

fn webgl() -> Object {
    let ns = Object::new();

    bind!(&ns, "SetCurrentContextById", [id_ptr: u32, id_len: u32] -> i32, {
        create_context(id_ptr, id_len, 0) as i32
    });
    bind!(
        &ns,
        "CreateCurrentContextById",
        [id_ptr: u32, id_len: u32, attributes: u32] -> i32,
        { create_context(id_ptr, id_len, attributes) as i32 }
    );
    bind!(&ns, "DrawingBufferWidth", [] -> i32, {
        with_gl(|gl| gl.drawing_buffer_width()).unwrap_or(0)
    });
    bind!(&ns, "DrawingBufferHeight", [] -> i32, {
        with_gl(|gl| gl.drawing_buffer_height()).unwrap_or(0)
    });
    bind!(&ns, "IsExtensionSupported", [name_ptr: u32, name_len: u32] -> i32, {
        with_view(|view| {
            with_gl(|gl| ok_or_throw(gl.is_extension_supported(view, name_ptr as u64, name_len as u64)))
        })
        .unwrap_or(false) as i32
    });
    bind!(&ns, "GetError", [] -> u32, { with_gl(|gl| gl.get_error()).unwrap_or(0) });
    bind!(&ns, "GetWebGLVersion", [major_ptr: u32, minor_ptr: u32], {
        with_view(|view| {
            with_gl(|gl| ok_or_throw(gl.get_webgl_version(view, major_ptr as u64, minor_ptr as u64)))
        });
    });

    bind!(&ns, "CreateBuffer", [] -> u32, { with_gl(|gl| gl.create_buffer()).unwrap_or(0) });
    bind!(&ns, "DeleteBuffer", [id: u32], { with_gl(|gl| gl.delete_buffer(id)); });
    bind!(&ns, "BindBuffer", [target: u32, id: u32], {
        with_gl(|gl| gl.bind_buffer(target, id));
    });
    bind!(&ns, "BufferData", [target: u32, size: i32, data: u32, usage: u32], {
        with_view(|view| {
            with_gl(|gl| ok_or_throw(gl.buffer_data(view, target, size as i64, data as u64, usage)))
        });
    });
    bind!(
        &ns,
        "BufferSubData",
        [target: u32, offset: i32, size: i32, data: u32],
        {
            with_view(|view| {
                with_gl(|gl| {
                    ok_or_throw(gl.buffer_sub_data(view, target, offset as i64, size as i64, data as u64))
                })
            });
        }
    );

    bind!(&ns, "CreateShader", [shader_type: u32] -> u32, {
        with_gl(|gl| gl.create_shader(shader_type)).unwrap_or(0)
    });
    bind!(&ns, "DeleteShader", [id: u32], { with_gl(|gl| gl.delete_shader(id)); });
    bind!(&ns, "ShaderSource", [shader: u32, strings_ptr: u32, strings_len: u32], {
        with_view(|view| {
            with_gl(|gl| {
                ok_or_throw(gl.shader_source(view, shader, strings_ptr as u64, strings_len as u64))
            })
        });
    });
    bind!(&ns, "CompileShader", [shader: u32], { with_gl(|gl| gl.compile_shader(shader)); });
    bind!(&ns, "CreateProgram", [] -> u32, { with_gl(|gl| gl.create_program()).unwrap_or(0) });
    bind!(&ns, "DeleteProgram", [id: u32], { with_gl(|gl| gl.delete_program(id)); });
    bind!(&ns, "AttachShader", [program: u32, shader: u32], {
        with_gl(|gl| gl.attach_shader(program, shader));
    });
    bind!(&ns, "LinkProgram", [program: u32], { with_gl(|gl| gl.link_program(program)); });
    bind!(&ns, "UseProgram", [program: u32], { with_gl(|gl| gl.use_program(program)); });

    bind!(
        &ns,
        "GetUniformLocation",
        [program: u32, name_ptr: u32, name_len: u32] -> i32,
        {
            with_view(|view| {
                with_gl(|gl| {
                    ok_or_throw(gl.get_uniform_location(view, program, name_ptr as u64, name_len as u64))
                })
            })
            .unwrap_or(-1)
        }
    );
    bind!(
        &ns,
        "GetAttribLocation",
        [program: u32, name_ptr: u32, name_len: u32] -> i32,
        {
            with_view(|view| {
                with_gl(|gl| {
                    ok_or_throw(gl.get_attrib_location(view, program, name_ptr as u64, name_len as u64))
                })
            })
            .unwrap_or(-1)
        }
    );
    bind!(&ns, "GetShaderiv", [shader: u32, pname: u32, p_ptr: u32], {
        with_view(|view| {
            with_gl(|gl| ok_or_throw(gl.get_shader_iv(view, shader, pname, p_ptr as u64)))
        });
    });
    bind!(
        &ns,
        "GetShaderInfoLog",
        [shader: u32, buf_ptr: u32, buf_len: u32, length_ptr: u32],
        {
            with_view(|view| {
                with_gl(|gl| {
                    ok_or_throw(gl.get_shader_info_log(
                        view,
                        shader,
                        buf_ptr as u64,
                        buf_len as u64,
                        length_ptr as u64,
                    ))
                })
            });
        }
    );
    bind!(
        &ns,
        "GetProgramInfoLog",
        [program: u32, buf_ptr: u32, buf_len: u32, length_ptr: u32],
        {
            with_view(|view| {
                with_gl(|gl| {
                    ok_or_throw(gl.get_program_info_log(
                        view,
                        program,
                        buf_ptr as u64,
                        buf_len as u64,
                        length_ptr as u64,
                    ))
                })
            });
        }
    );
    bind!(&ns, "GetProgramParameter", [program: u32, pname: u32] -> i32, {
        with_gl(|gl| gl.get_program_parameter(program, pname)).unwrap_or(0)
    });

    bind!(&ns, "Uniform1i", [location: i32, x: i32], {
        with_gl(|gl| gl.uniform1i(location, x));
    });
    bind!(&ns, "Uniform4fv", [location: i32, values_ptr: u32], {
        with_view(|view| {
            with_gl(|gl| ok_or_throw(gl.uniform4fv(view, location, values_ptr as u64)))
        });
    });
    bind!(&ns, "UniformMatrix4fv", [location: i32, values_ptr: u32], {
        with_view(|view| {
            with_gl(|gl| ok_or_throw(gl.uniform_matrix4fv(view, location, values_ptr as u64)))
        });
    });

    bind!(&ns, "Clear", [mask: u32], { with_gl(|gl| gl.clear(mask)); });
    bind!(&ns, "ClearColor", [r: f32, g: f32, b: f32, a: f32], {
        with_gl(|gl| gl.clear_color(r, g, b, a));
    });
    bind!(&ns, "Viewport", [x: i32, y: i32, width: i32, height: i32], {
        with_gl(|gl| gl.viewport(x, y, width, height));
    });
    bind!(&ns, "Enable", [cap: u32], { with_gl(|gl| gl.enable(cap)); });
    bind!(&ns, "Disable", [cap: u32], { with_gl(|gl| gl.disable(cap)); });
    bind!(&ns, "DrawArrays", [mode: u32, first: i32, count: i32], {
        with_gl(|gl| gl.draw_arrays(mode, first, count));
    });
    bind!(
        &ns,
        "DrawElements",
        [mode: u32, count: i32, element_type: u32, offset: i32],
        {
            with_gl(|gl| gl.draw_elements(mode, count, element_type, offset as i64));
        }
    );

    bind!(&ns, "CreateTexture", [] -> u32, { with_gl(|gl| gl.create_texture()).unwrap_or(0) });
    bind!(&ns, "DeleteTexture", [id: u32], { with_gl(|gl| gl.delete_texture(id)); });
    bind!(&ns, "BindTexture", [target: u32, id: u32], {
        with_gl(|gl| gl.bind_texture(target, id));
    });
    bind!(&ns, "CreateFramebuffer", [] -> u32, {
        with_gl(|gl| gl.create_framebuffer()).unwrap_or(0)
    });
    bind!(&ns, "DeleteFramebuffer", [id: u32], { with_gl(|gl| gl.delete_framebuffer(id)); });
    bind!(&ns, "BindFramebuffer", [target: u32, id: u32], {
        with_gl(|gl| gl.bind_framebuffer(target, id));
    });
    bind!(&ns, "CreateRenderbuffer", [] -> u32, {
        with_gl(|gl| gl.create_renderbuffer()).unwrap_or(0)
    });
    bind!(&ns, "DeleteRenderbuffer", [id: u32], { with_gl(|gl| gl.delete_renderbuffer(id)); });

    ns
}

fn webgl2() -> Object {
    let ns = Object::new();

    bind!(&ns, "CreateVertexArray", [] -> u32, {
        with_gl(|gl| ok_or_throw(gl.create_vertex_array())).unwrap_or(0)
    });
    bind!(&ns, "DeleteVertexArray", [id: u32], {
        with_gl(|gl| ok_or_throw(gl.delete_vertex_array(id)));
    });
    bind!(&ns, "BindVertexArray", [id: u32], {
        with_gl(|gl| ok_or_throw(gl.bind_vertex_array(id)));
    });

    ns
}

fn wgpu_ns() -> Object {
    let ns = Object::new();

    bind!(&ns, "wgpuCreateInstance", [_descriptor: u32] -> u32, {
        with_gpu(|gpu| gpu.create_instance())
    });
    bind!(
        &ns,
        "wgpuInstanceRequestAdapter",
        [instance: u32, options: u32, cb: u32, userdata: u32],
        {
            with_view(|view| {
                with_gpu(|gpu| {
                    ok_or_throw(gpu.instance_request_adapter(
                        view,
                        instance,
                        options as u64,
                        callback(cb, userdata),
                    ))
                })
            });
        }
    );

    bind!(&ns, "wgpuAdapterEnumerateFeatures", [adapter: u32, features: u32] -> u32, {
        with_view(|view| {
            with_gpu(|gpu| ok_or_throw(gpu.adapter_enumerate_features(view, adapter, features as u64)))
        }) as u32
    });
    bind!(&ns, "wgpuAdapterGetLimits", [adapter: u32, limits: u32] -> i32, {
        with_view(|view| {
            with_gpu(|gpu| ok_or_throw(gpu.adapter_get_limits(view, adapter, limits as u64)))
        }) as i32
    });
    bind!(&ns, "wgpuAdapterHasFeature", [adapter: u32, feature: u32] -> i32, {
        with_gpu(|gpu| ok_or_throw(gpu.adapter_has_feature(adapter, feature))) as i32
    });
    bind!(&ns, "wgpuAdapterGetProperties", [adapter: u32, properties: u32], {
        with_view(|view| {
            with_gpu(|gpu| ok_or_throw(gpu.adapter_get_properties(view, adapter, properties as u64)))
        });
    });
    bind!(
        &ns,
        "wgpuAdapterRequestDevice",
        [adapter: u32, descriptor: u32, cb: u32, userdata: u32],
        {
            with_view(|view| {
                with_gpu(|gpu| {
                    ok_or_throw(gpu.adapter_request_device(
                        view,
                        adapter,
                        descriptor as u64,
                        callback(cb, userdata),
                    ))
                })
            });
        }
    );

    bind!(&ns, "wgpuDeviceEnumerateFeatures", [device: u32, features: u32] -> u32, {
        with_view(|view| {
            with_gpu(|gpu| ok_or_throw(gpu.device_enumerate_features(view, device, features as u64)))
        }) as u32
    });
    bind!(&ns, "wgpuDeviceGetLimits", [device: u32, limits: u32] -> i32, {
        with_view(|view| {
            with_gpu(|gpu| ok_or_throw(gpu.device_get_limits(view, device, limits as u64)))
        }) as i32
    });
    bind!(&ns, "wgpuDeviceHasFeature", [device: u32, feature: u32] -> i32, {
        with_gpu(|gpu| ok_or_throw(gpu.device_has_feature(device, feature))) as i32
    });
    bind!(&ns, "wgpuDeviceGetQueue", [device: u32] -> u32, {
        with_gpu(|gpu| ok_or_throw(gpu.device_get_queue(device)))
    });
    bind!(&ns, "wgpuDeviceDestroy", [device: u32], {
        with_gpu(|gpu| gpu.device_destroy(device));
    });
    bind!(&ns, "wgpuDevicePushErrorScope", [device: u32, filter: u32], {
        with_gpu(|gpu| ok_or_throw(gpu.device_push_error_scope(device, filter)));
    });
    bind!(&ns, "wgpuDevicePopErrorScope", [device: u32, cb: u32, userdata: u32], {
        with_gpu(|gpu| gpu.device_pop_error_scope(device, callback(cb, userdata)));
    });
    bind!(
        &ns,
        "wgpuDeviceSetUncapturedErrorCallback",
        [device: u32, cb: u32, userdata: u32],
        {
            with_gpu(|gpu| gpu.device_set_uncaptured_error_callback(device, callback(cb, userdata)));
        }
    );

    macro_rules! device_create {
        ($name:literal, $method:ident) => {
            bind!(&ns, $name, [device: u32, descriptor: u32] -> u32, {
                with_view(|view| {
                    with_gpu(|gpu| ok_or_throw(gpu.$method(view, device, descriptor as u64)))
                })
            });
        };
    }
    device_create!("wgpuDeviceCreateBuffer", device_create_buffer);
    device_create!("wgpuDeviceCreateTexture", device_create_texture);
    device_create!("wgpuDeviceCreateSampler", device_create_sampler);
    device_create!("wgpuDeviceCreateShaderModule", device_create_shader_module);
    device_create!("wgpuDeviceCreateBindGroupLayout", device_create_bind_group_layout);
    device_create!("wgpuDeviceCreateBindGroup", device_create_bind_group);
    device_create!("wgpuDeviceCreatePipelineLayout", device_create_pipeline_layout);
    device_create!("wgpuDeviceCreateRenderPipeline", device_create_render_pipeline);
    device_create!("wgpuDeviceCreateComputePipeline", device_create_compute_pipeline);
    device_create!("wgpuDeviceCreateCommandEncoder", device_create_command_encoder);
    device_create!("wgpuDeviceCreateQuerySet", device_create_query_set);

    bind!(
        &ns,
        "wgpuDeviceCreateRenderPipelineAsync",
        [device: u32, descriptor: u32, cb: u32, userdata: u32],
        {
            with_view(|view| {
                with_gpu(|gpu| {
                    ok_or_throw(gpu.device_create_render_pipeline_async(
                        view,
                        device,
                        descriptor as u64,
                        callback(cb, userdata),
                    ))
                })
            });
        }
    );
    bind!(
        &ns,
        "wgpuDeviceCreateComputePipelineAsync",
        [device: u32, descriptor: u32, cb: u32, userdata: u32],
        {
            with_view(|view| {
                with_gpu(|gpu| {
                    ok_or_throw(gpu.device_create_compute_pipeline_async(
                        view,
                        device,
                        descriptor as u64,
                        callback(cb, userdata),
                    ))
                })
            });
        }
    );

    bind!(&ns, "wgpuTextureCreateView", [texture: u32, descriptor: u32] -> u32, {
        with_view(|view| {
            with_gpu(|gpu| ok_or_throw(gpu.texture_create_view(view, texture, descriptor as u64)))
        })
    });
    bind!(&ns, "wgpuTextureDestroy", [texture: u32], {
        with_gpu(|gpu| gpu.texture_destroy(texture));
    });
    bind!(&ns, "wgpuTextureGetWidth", [texture: u32] -> u32, {
        with_gpu(|gpu| gpu.texture_width(texture))
    });
    bind!(&ns, "wgpuTextureGetHeight", [texture: u32] -> u32, {
        with_gpu(|gpu| gpu.texture_height(texture))
    });
    bind!(&ns, "wgpuTextureGetDepthOrArrayLayers", [texture: u32] -> u32, {
        with_gpu(|gpu| gpu.texture_depth_or_array_layers(texture))
    });
    bind!(&ns, "wgpuTextureGetMipLevelCount", [texture: u32] -> u32, {
        with_gpu(|gpu| gpu.texture_mip_level_count(texture))
    });
    bind!(&ns, "wgpuTextureGetSampleCount", [texture: u32] -> u32, {
        with_gpu(|gpu| gpu.texture_sample_count(texture))
    });
    bind!(&ns, "wgpuTextureGetFormat", [texture: u32] -> u32, {
        with_gpu(|gpu| gpu.texture_format_code(texture))
    });
    bind!(&ns, "wgpuTextureGetDimension", [texture: u32] -> u32, {
        with_gpu(|gpu| gpu.texture_dimension_code(texture))
    });
    bind!(&ns, "wgpuTextureGetUsage", [texture: u32] -> u32, {
        with_gpu(|gpu| gpu.texture_usage_bits(texture))
    });

    bind!(&ns, "wgpuBufferGetSize", [buffer: u32] -> u64, {
        with_gpu(|gpu| gpu.buffer_get_size(buffer))
    });
    bind!(&ns, "wgpuBufferGetUsage", [buffer: u32] -> u32, {
        with_gpu(|gpu| gpu.buffer_get_usage_bits(buffer))
    });
    bind!(&ns, "wgpuBufferDestroy", [buffer: u32], {
        with_gpu(|gpu| gpu.buffer_destroy(buffer));
    });
    bind!(
        &ns,
        "wgpuBufferMapAsync",
        [buffer: u32, mode: u32, offset: u64, size: u64, cb: u32, userdata: u32],
        {
            with_gpu(|gpu| {
                ok_or_throw(gpu.buffer_map_async(buffer, mode, offset, size, callback(cb, userdata)))
            });
        }
    );
    bind!(&ns, "wgpuBufferGetMappedRange", [buffer: u32, offset: u64, size: u64] -> u32, {
        with_view(|view| {
            with_gpu(|gpu| ok_or_throw(gpu.buffer_get_mapped_range(view, buffer, offset, size)))
        }) as u32
    });
    bind!(&ns, "wgpuBufferUnmap", [buffer: u32], {
        with_view(|view| with_gpu(|gpu| ok_or_throw(gpu.buffer_unmap(view, buffer))));
    });

    bind!(
        &ns,
        "wgpuCommandEncoderBeginRenderPass",
        [encoder: u32, descriptor: u32] -> u32,
        {
            with_view(|view| {
                with_gpu(|gpu| {
                    ok_or_throw(gpu.command_encoder_begin_render_pass(view, encoder, descriptor as u64))
                })
            })
        }
    );
    bind!(
        &ns,
        "wgpuCommandEncoderBeginComputePass",
        [encoder: u32, descriptor: u32] -> u32,
        {
            with_view(|view| {
                with_gpu(|gpu| {
                    ok_or_throw(gpu.command_encoder_begin_compute_pass(view, encoder, descriptor as u64))
                })
            })
        }
    );
    bind!(
        &ns,
        "wgpuCommandEncoderCopyBufferToBuffer",
        [encoder: u32, src: u32, src_offset: u64, dst: u32, dst_offset: u64, size: u64],
        {
            with_gpu(|gpu| {
                ok_or_throw(gpu.command_encoder_copy_buffer_to_buffer(
                    encoder, src, src_offset, dst, dst_offset, size,
                ))
            });
        }
    );
    bind!(
        &ns,
        "wgpuCommandEncoderCopyBufferToTexture",
        [encoder: u32, src: u32, dst: u32, size: u32],
        {
            with_view(|view| {
                with_gpu(|gpu| {
                    ok_or_throw(gpu.command_encoder_copy_buffer_to_texture(
                        view,
                        encoder,
                        src as u64,
                        dst as u64,
                        size as u64,
                    ))
                })
            });
        }
    );
    bind!(
        &ns,
        "wgpuCommandEncoderCopyTextureToBuffer",
        [encoder: u32, src: u32, dst: u32, size: u32],
        {
            with_view(|view| {
                with_gpu(|gpu| {
                    ok_or_throw(gpu.command_encoder_copy_texture_to_buffer(
                        view,
                        encoder,
                        src as u64,
                        dst as u64,
                        size as u64,
                    ))
                })
            });
        }
    );
    bind!(
        &ns,
        "wgpuCommandEncoderCopyTextureToTexture",
        [encoder: u32, src: u32, dst: u32, size: u32],
        {
            with_view(|view| {
                with_gpu(|gpu| {
                    ok_or_throw(gpu.command_encoder_copy_texture_to_texture(
                        view,
                        encoder,
                        src as u64,
                        dst as u64,
                        size as u64,
                    ))
                })
            });
        }
    );
    bind!(&ns, "wgpuCommandEncoderFinish", [encoder: u32, _descriptor: u32] -> u32, {
        with_gpu(|gpu| ok_or_throw(gpu.command_encoder_finish(encoder)))
    });

    bind!(&ns, "wgpuRenderPassEncoderSetPipeline", [pass: u32, pipeline: u32], {
        with_gpu(|gpu| ok_or_throw(gpu.render_pass_record(pass, RenderCmd::SetPipeline(pipeline))));
    });
    bind!(
        &ns,
        "wgpuRenderPassEncoderSetBindGroup",
        [pass: u32, index: u32, group: u32, offset_count: u32, offsets: u32],
        {
            with_view(|view| {
                with_gpu(|gpu| {
                    ok_or_throw(gpu.render_pass_set_bind_group(
                        view,
                        pass,
                        index,
                        group,
                        offset_count as u64,
                        offsets as u64,
                    ))
                })
            });
        }
    );
    bind!(
        &ns,
        "wgpuRenderPassEncoderSetVertexBuffer",
        [pass: u32, slot: u32, buffer: u32, offset: u64, size: u64],
        {
            with_gpu(|gpu| {
                ok_or_throw(gpu.render_pass_record(
                    pass,
                    RenderCmd::SetVertexBuffer {
                        slot,
                        buffer,
                        offset,
                        size,
                    },
                ))
            });
        }
    );
    bind!(
        &ns,
        "wgpuRenderPassEncoderSetIndexBuffer",
        [pass: u32, buffer: u32, format: u32, offset: u64, size: u64],
        {
            let format = ok_or_throw(weft_wgpu::enums::index_format(format))
                .unwrap_or(wgpu::IndexFormat::Uint16);
            with_gpu(|gpu| {
                ok_or_throw(gpu.render_pass_record(
                    pass,
                    RenderCmd::SetIndexBuffer {
                        buffer,
                        format,
                        offset,
                        size,
                    },
                ))
            });
        }
    );
    bind!(
        &ns,
        "wgpuRenderPassEncoderSetViewport",
        [pass: u32, x: f32, y: f32, width: f32, height: f32, min_depth: f32, max_depth: f32],
        {
            with_gpu(|gpu| {
                ok_or_throw(gpu.render_pass_record(
                    pass,
                    RenderCmd::SetViewport {
                        x,
                        y,
                        width,
                        height,
                        min_depth,
                        max_depth,
                    },
                ))
            });
        }
    );
    bind!(
        &ns,
        "wgpuRenderPassEncoderSetScissorRect",
        [pass: u32, x: u32, y: u32, width: u32, height: u32],
        {
            with_gpu(|gpu| {
                ok_or_throw(gpu.render_pass_record(
                    pass,
                    RenderCmd::SetScissorRect {
                        x,
                        y,
                        width,
                        height,
                    },
                ))
            });
        }
    );
    bind!(&ns, "wgpuRenderPassEncoderSetBlendConstant", [pass: u32, color: u32], {
        let value = with_view(|view| {
            let mut cur = weft_abi::Cursor::new(view, color as u64);
            Ok::<_, weft_mem::MemoryError>(wgpu::Color {
                r: cur.read_f64()?,
                g: cur.read_f64()?,
                b: cur.read_f64()?,
                a: cur.read_f64()?,
            })
        });
        let value = ok_or_throw(value);
        with_gpu(|gpu| {
            ok_or_throw(gpu.render_pass_record(pass, RenderCmd::SetBlendConstant(value)))
        });
    });
    bind!(&ns, "wgpuRenderPassEncoderSetStencilReference", [pass: u32, reference: u32], {
        with_gpu(|gpu| {
            ok_or_throw(gpu.render_pass_record(pass, RenderCmd::SetStencilReference(reference)))
        });
    });
    bind!(
        &ns,
        "wgpuRenderPassEncoderDraw",
        [pass: u32, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32],
        {
            with_gpu(|gpu| {
                ok_or_throw(gpu.render_pass_record(
                    pass,
                    RenderCmd::Draw {
                        vertex_count,
                        instance_count,
                        first_vertex,
                        first_instance,
                    },
                ))
            });
        }
    );
    bind!(
        &ns,
        "wgpuRenderPassEncoderDrawIndexed",
        [pass: u32, index_count: u32, instance_count: u32, first_index: u32, base_vertex: i32,
            first_instance: u32],
        {
            with_gpu(|gpu| {
                ok_or_throw(gpu.render_pass_record(
                    pass,
                    RenderCmd::DrawIndexed {
                        index_count,
                        instance_count,
                        first_index,
                        base_vertex,
                        first_instance,
                    },
                ))
            });
        }
    );
    bind!(
        &ns,
        "wgpuRenderPassEncoderDrawIndirect",
        [pass: u32, buffer: u32, offset: u64],
        {
            with_gpu(|gpu| {
                ok_or_throw(gpu.render_pass_record(pass, RenderCmd::DrawIndirect { buffer, offset }))
            });
        }
    );
    bind!(
        &ns,
        "wgpuRenderPassEncoderDrawIndexedIndirect",
        [pass: u32, buffer: u32, offset: u64],
        {
            with_gpu(|gpu| {
                ok_or_throw(
                    gpu.render_pass_record(pass, RenderCmd::DrawIndexedIndirect { buffer, offset }),
                )
            });
        }
    );
    bind!(&ns, "wgpuRenderPassEncoderEnd", [pass: u32], {
        with_gpu(|gpu| ok_or_throw(gpu.render_pass_end(pass)));
    });

    bind!(&ns, "wgpuComputePassEncoderSetPipeline", [pass: u32, pipeline: u32], {
        with_gpu(|gpu| ok_or_throw(gpu.compute_pass_record(pass, ComputeCmd::SetPipeline(pipeline))));
    });
    bind!(
        &ns,
        "wgpuComputePassEncoderSetBindGroup",
        [pass: u32, index: u32, group: u32, offset_count: u32, offsets: u32],
        {
            with_view(|view| {
                with_gpu(|gpu| {
                    ok_or_throw(gpu.compute_pass_set_bind_group(
                        view,
                        pass,
                        index,
                        group,
                        offset_count as u64,
                        offsets as u64,
                    ))
                })
            });
        }
    );
    bind!(
        &ns,
        "wgpuComputePassEncoderDispatchWorkgroups",
        [pass: u32, x: u32, y: u32, z: u32],
        {
            with_gpu(|gpu| {
                ok_or_throw(
                    gpu.compute_pass_record(pass, ComputeCmd::DispatchWorkgroups { x, y, z }),
                )
            });
        }
    );
    bind!(
        &ns,
        "wgpuComputePassEncoderDispatchWorkgroupsIndirect",
        [pass: u32, buffer: u32, offset: u64],
        {
            with_gpu(|gpu| {
                ok_or_throw(gpu.compute_pass_record(
                    pass,
                    ComputeCmd::DispatchWorkgroupsIndirect { buffer, offset },
                ))
            });
        }
    );
    bind!(&ns, "wgpuComputePassEncoderEnd", [pass: u32], {
        with_gpu(|gpu| ok_or_throw(gpu.compute_pass_end(pass)));
    });

    device_create!("wgpuDeviceCreateRenderBundleEncoder", device_create_render_bundle_encoder);

    bind!(&ns, "wgpuRenderBundleEncoderSetPipeline", [encoder: u32, pipeline: u32], {
        with_gpu(|gpu| ok_or_throw(gpu.render_bundle_record(encoder, RenderCmd::SetPipeline(pipeline))));
    });
    bind!(
        &ns,
        "wgpuRenderBundleEncoderSetBindGroup",
        [encoder: u32, index: u32, group: u32, offset_count: u32, offsets: u32],
        {
            with_view(|view| {
                with_gpu(|gpu| {
                    ok_or_throw(gpu.render_bundle_set_bind_group(
                        view,
                        encoder,
                        index,
                        group,
                        offset_count as u64,
                        offsets as u64,
                    ))
                })
            });
        }
    );
    bind!(
        &ns,
        "wgpuRenderBundleEncoderSetVertexBuffer",
        [encoder: u32, slot: u32, buffer: u32, offset: u64, size: u64],
        {
            with_gpu(|gpu| {
                ok_or_throw(gpu.render_bundle_record(
                    encoder,
                    RenderCmd::SetVertexBuffer {
                        slot,
                        buffer,
                        offset,
                        size,
                    },
                ))
            });
        }
    );
    bind!(
        &ns,
        "wgpuRenderBundleEncoderSetIndexBuffer",
        [encoder: u32, buffer: u32, format: u32, offset: u64, size: u64],
        {
            let format = ok_or_throw(weft_wgpu::enums::index_format(format))
                .unwrap_or(wgpu::IndexFormat::Uint16);
            with_gpu(|gpu| {
                ok_or_throw(gpu.render_bundle_record(
                    encoder,
                    RenderCmd::SetIndexBuffer {
                        buffer,
                        format,
                        offset,
                        size,
                    },
                ))
            });
        }
    );
    bind!(
        &ns,
        "wgpuRenderBundleEncoderDraw",
        [encoder: u32, vertex_count: u32, instance_count: u32, first_vertex: u32,
            first_instance: u32],
        {
            with_gpu(|gpu| {
                ok_or_throw(gpu.render_bundle_record(
                    encoder,
                    RenderCmd::Draw {
                        vertex_count,
                        instance_count,
                        first_vertex,
                        first_instance,
                    },
                ))
            });
        }
    );
    bind!(
        &ns,
        "wgpuRenderBundleEncoderDrawIndexed",
        [encoder: u32, index_count: u32, instance_count: u32, first_index: u32, base_vertex: i32,
            first_instance: u32],
        {
            with_gpu(|gpu| {
                ok_or_throw(gpu.render_bundle_record(
                    encoder,
                    RenderCmd::DrawIndexed {
                        index_count,
                        instance_count,
                        first_index,
                        base_vertex,
                        first_instance,
                    },
                ))
            });
        }
    );
    bind!(
        &ns,
        "wgpuRenderBundleEncoderDrawIndirect",
        [encoder: u32, buffer: u32, offset: u64],
        {
            with_gpu(|gpu| {
                ok_or_throw(gpu.render_bundle_record(encoder, RenderCmd::DrawIndirect { buffer, offset }))
            });
        }
    );
    bind!(
        &ns,
        "wgpuRenderBundleEncoderDrawIndexedIndirect",
        [encoder: u32, buffer: u32, offset: u64],
        {
            with_gpu(|gpu| {
                ok_or_throw(
                    gpu.render_bundle_record(encoder, RenderCmd::DrawIndexedIndirect { buffer, offset }),
                )
            });
        }
    );
    bind!(&ns, "wgpuRenderBundleEncoderFinish", [encoder: u32, _descriptor: u32] -> u32, {
        with_gpu(|gpu| ok_or_throw(gpu.render_bundle_encoder_finish(encoder)))
    });
    bind!(
        &ns,
        "wgpuRenderPassEncoderExecuteBundles",
        [pass: u32, bundle_count: u32, bundles: u32],
        {
            with_view(|view| {
                with_gpu(|gpu| {
                    ok_or_throw(gpu.render_pass_execute_bundles(
                        view,
                        pass,
                        bundle_count as u64,
                        bundles as u64,
                    ))
                })
            });
        }
    );

    bind!(&ns, "wgpuQueueSubmit", [queue: u32, command_count: u32, commands: u32], {
        with_view(|view| {
            with_gpu(|gpu| {
                ok_or_throw(gpu.queue_submit(view, queue, command_count as u64, commands as u64))
            })
        });
    });
    bind!(
        &ns,
        "wgpuQueueWriteBuffer",
        [queue: u32, buffer: u32, offset: u64, data: u32, size: u32],
        {
            with_view(|view| {
                with_gpu(|gpu| {
                    ok_or_throw(gpu.queue_write_buffer(
                        view,
                        queue,
                        buffer,
                        offset,
                        data as u64,
                        size as u64,
                    ))
                })
            });
        }
    );
    bind!(
        &ns,
        "wgpuQueueWriteTexture",
        [queue: u32, dst: u32, data: u32, data_size: u32, layout: u32, extent: u32],
        {
            with_view(|view| {
                with_gpu(|gpu| {
                    ok_or_throw(gpu.queue_write_texture(
                        view,
                        queue,
                        dst as u64,
                        data as u64,
                        data_size as u64,
                        layout as u64,
                        extent as u64,
                    ))
                })
            });
        }
    );
    bind!(&ns, "wgpuQueueOnSubmittedWorkDone", [queue: u32, cb: u32, userdata: u32], {
        with_gpu(|gpu| gpu.queue_on_submitted_work_done(queue, callback(cb, userdata)));
    });

    bind!(
        &ns,
        "wgpuShaderModuleGetCompilationInfo",
        [module: u32, cb: u32, userdata: u32],
        {
            let memory = std::rc::Rc::new(super::memory());
            with_gpu(|gpu| {
                gpu.shader_module_get_compilation_info(memory, module, callback(cb, userdata))
            });
        }
    );

    macro_rules! lifetimes {
        ($category:literal, $table:ident) => {
            bind!(&ns, concat!("wgpu", $category, "Reference"), [handle: u32], {
                with_gpu(|gpu| gpu.gpu.borrow_mut().$table.reference(handle));
            });
            bind!(&ns, concat!("wgpu", $category, "Release"), [handle: u32], {
                with_gpu(|gpu| {
                    gpu.gpu.borrow_mut().$table.release(handle);
                });
            });
        };
    }
    lifetimes!("Instance", instances);
    lifetimes!("Adapter", adapters);
    lifetimes!("Device", devices);
    lifetimes!("Queue", queues);
    lifetimes!("Buffer", buffers);
    lifetimes!("Texture", textures);
    lifetimes!("TextureView", texture_views);
    lifetimes!("Sampler", samplers);
    lifetimes!("BindGroup", bind_groups);
    lifetimes!("BindGroupLayout", bind_group_layouts);
    lifetimes!("PipelineLayout", pipeline_layouts);
    lifetimes!("RenderPipeline", render_pipelines);
    lifetimes!("ComputePipeline", compute_pipelines);
    lifetimes!("ShaderModule", shader_modules);
    lifetimes!("CommandEncoder", command_encoders);
    lifetimes!("CommandBuffer", command_buffers);
    lifetimes!("RenderPassEncoder", render_pass_encoders);
    lifetimes!("ComputePassEncoder", compute_pass_encoders);
    lifetimes!("RenderBundle", render_bundles);
    lifetimes!("RenderBundleEncoder", render_bundle_encoders);
    lifetimes!("QuerySet", query_sets);

    macro_rules! set_label {
        ($category:literal) => {
            bind!(&ns, concat!("wgpu", $category, "SetLabel"), [handle: u32, label: u32], {
                // Backend labels are fixed at creation; record for
                // diagnostics only.
                let label = with_view(|view| view.load_cstring(label as u64));
                tracing::debug!(category = $category, handle, ?label, "SetLabel ignored");
            });
        };
    }
    set_label!("Device");
    set_label!("Queue");
    set_label!("Buffer");
    set_label!("Texture");
    set_label!("TextureView");
    set_label!("Sampler");
    set_label!("BindGroup");
    set_label!("BindGroupLayout");
    set_label!("PipelineLayout");
    set_label!("RenderPipeline");
    set_label!("ComputePipeline");
    set_label!("ShaderModule");
    set_label!("CommandEncoder");
    set_label!("CommandBuffer");
    set_label!("RenderPassEncoder");
    set_label!("ComputePassEncoder");
    set_label!("RenderBundle");
    set_label!("RenderBundleEncoder");
    set_label!("QuerySet");

    ns
}
