//! Runtime wiring: singletons, instantiation and the frame loop.

mod gl;
mod host;
mod imports;
mod page;

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Reflect, WebAssembly};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use weft_dom::{Dom, GuestExports as _};
use weft_env::Env;
use weft_mem::{MemView, PtrWidth, WasmMemory};
use weft_webgl::WebGl;
use weft_wgpu::state::{GuestAllocator, WebGpu};
use weft_wgpu::{WebGpuRuntime, callback::CallbackInvoker, callback::Spawn};

pub use gl::CanvasGl;
pub use host::{JsAllocator, JsGuestExports, JsMemory, LocalSpawner, TableInvoker};
pub use page::{BrowserHost, WebConsoleSink, WebDom};

/// The guest's default integer width. The browser target is wasm32.
const PTR_WIDTH: PtrWidth = PtrWidth::Four;

thread_local! {
    static MEMORY: RefCell<Option<JsMemory>> = const { RefCell::new(None) };
    static EXPORTS: RefCell<Option<Rc<JsGuestExports>>> = const { RefCell::new(None) };
    static ENV: RefCell<Option<Env<BrowserHost, WebConsoleSink>>> = const { RefCell::new(None) };
    static DOM: RefCell<Option<Dom<WebDom>>> = const { RefCell::new(None) };
    static GL: RefCell<Option<WebGl<CanvasGl>>> = const { RefCell::new(None) };
    static GPU: RefCell<Option<WebGpuRuntime>> = const { RefCell::new(None) };
}

pub(crate) fn memory() -> JsMemory {
    MEMORY.with(|m| m.borrow().clone().expect_throw("runtime not initialized"))
}

/// Runs `f` with a typed view of the guest memory. The view is rebuilt per
/// call; memory growth between calls is therefore always observed.
pub(crate) fn with_view<R>(f: impl FnOnce(&MemView<'_, JsMemory>) -> R) -> R {
    let memory = memory();
    let view = MemView::new(&memory, PTR_WIDTH);
    f(&view)
}

pub(crate) fn with_env<R>(f: impl FnOnce(&mut Env<BrowserHost, WebConsoleSink>) -> R) -> R {
    ENV.with(|env| f(env.borrow_mut().as_mut().expect_throw("runtime not initialized")))
}

pub(crate) fn with_dom<R>(f: impl FnOnce(&mut Dom<WebDom>) -> R) -> R {
    DOM.with(|dom| f(dom.borrow_mut().as_mut().expect_throw("runtime not initialized")))
}

pub(crate) fn with_gl<R>(f: impl FnOnce(&mut WebGl<CanvasGl>) -> R) -> Option<R> {
    GL.with(|gl| gl.borrow_mut().as_mut().map(f))
}

pub(crate) fn set_gl(gl: Option<WebGl<CanvasGl>>) {
    GL.with(|slot| *slot.borrow_mut() = gl);
}

pub(crate) fn with_gpu<R>(f: impl FnOnce(&WebGpuRuntime) -> R) -> R {
    GPU.with(|gpu| f(gpu.borrow().as_ref().expect_throw("runtime not initialized")))
}

pub(crate) fn guest_exports() -> Option<Rc<JsGuestExports>> {
    EXPORTS.with(|e| e.borrow().clone())
}

/// Null guest allocator used until the module's exports are known.
struct NoAllocator;

impl GuestAllocator for NoAllocator {
    fn alloc(&self, _size: u64) -> u64 {
        0
    }

    fn free(&self, _ptr: u64) {}
}

/// Builds the import object for `WebAssembly.instantiate`. Must be called
/// before [`attach_instance`].
#[wasm_bindgen]
pub fn import_object() -> JsValue {
    let window = web_sys::window().expect_throw("no window");
    let document = window.document().expect_throw("no document");

    ENV.with(|env| {
        *env.borrow_mut() = Some(Env::new(BrowserHost::new(window.clone()), WebConsoleSink));
    });

    let dispatch: Rc<dyn Fn(weft_dom::ListenerToken, weft_dom::EventInfo)> =
        Rc::new(|token, info| {
            let ticket = with_dom(|dom| dom.begin_dispatch(token, info));
            let Some(ticket) = ticket else {
                return;
            };
            if let Some(exports) = guest_exports() {
                let ctx = exports.default_context_ptr();
                exports.do_event_callback(ticket.data, ticket.callback, ctx);
            }
            with_dom(|dom| dom.end_dispatch());
        });
    DOM.with(|dom| {
        *dom.borrow_mut() = Some(Dom::new(WebDom::new(window, document, dispatch)));
    });

    imports::build()
}

/// Binds the instantiated module: memory, indirect function table, exported
/// allocator and callback entry points. Rebinding after memory growth is
/// unnecessary since no view outlives a call.
#[wasm_bindgen]
pub fn attach_instance(instance: &WebAssembly::Instance) -> Result<(), JsValue> {
    let exports = instance.exports();

    let memory: WebAssembly::Memory = Reflect::get(&exports, &"memory".into())?.dyn_into()?;
    let table: WebAssembly::Table =
        Reflect::get(&exports, &"__indirect_function_table".into())?.dyn_into()?;

    MEMORY.with(|m| *m.borrow_mut() = Some(JsMemory::new(memory)));
    EXPORTS.with(|e| *e.borrow_mut() = JsGuestExports::from_exports(&exports).map(Rc::new));

    let allocator: Rc<dyn GuestAllocator> = match JsAllocator::from_exports(&exports) {
        Some(allocator) => Rc::new(allocator),
        None => Rc::new(NoAllocator),
    };
    let invoker: Rc<dyn CallbackInvoker> = Rc::new(TableInvoker::new(table));
    let spawner: Rc<dyn Spawn> = Rc::new(LocalSpawner);
    GPU.with(|gpu| {
        *gpu.borrow_mut() = Some(WebGpuRuntime::new(
            WebGpu::new(allocator),
            PTR_WIDTH,
            invoker,
            spawner,
        ));
    });
    Ok(())
}

/// Fetches, instantiates and starts a guest module: `_start()`, then the
/// `step(dt, ctx)` animation-frame loop if the module exports one, then
/// `_end()`.
#[wasm_bindgen]
pub async fn run(wasm_path: String) -> Result<(), JsValue> {
    let window = web_sys::window().expect_throw("no window");
    let imports = import_object();

    let response = JsFuture::from(window.fetch_with_str(&wasm_path)).await?;
    let response: web_sys::Response = response.dyn_into()?;
    let buffer = JsFuture::from(response.array_buffer()?).await?;

    let imports: js_sys::Object = imports.dyn_into()?;
    let result = JsFuture::from(WebAssembly::instantiate_buffer(
        &js_sys::Uint8Array::new(&buffer).to_vec(),
        &imports,
    ))
    .await?;
    let instance: WebAssembly::Instance =
        Reflect::get(&result, &"instance".into())?.dyn_into()?;
    attach_instance(&instance)?;

    let exports = instance.exports();
    call_export(&exports, "_start")?;

    if let Ok(step) = Reflect::get(&exports, &"step".into()) {
        if let Ok(step) = step.dyn_into::<js_sys::Function>() {
            start_step_loop(step)?;
        }
    }

    call_export(&exports, "_end")?;
    Ok(())
}

fn call_export(exports: &JsValue, name: &str) -> Result<(), JsValue> {
    let function: js_sys::Function = Reflect::get(exports, &name.into())?.dyn_into()?;
    function.call0(&JsValue::NULL)?;
    Ok(())
}

/// Drives the guest's `step(dt_seconds, ctx)` on the animation-frame clock.
fn start_step_loop(step: js_sys::Function) -> Result<(), JsValue> {
    let window = web_sys::window().expect_throw("no window");
    let ctx = guest_exports()
        .map(|e| e.default_context_ptr())
        .unwrap_or(0);

    let prev = Rc::new(RefCell::new(None::<f64>));
    let hook: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
    let hook_inner = Rc::clone(&hook);

    *hook.borrow_mut() = Some(Closure::wrap(Box::new(move |now: f64| {
        let dt = {
            let mut prev = prev.borrow_mut();
            let dt = prev.map(|p| (now - p) * 1e-3).unwrap_or(0.0);
            *prev = Some(now);
            dt
        };
        if let Err(err) = step.call2(&JsValue::NULL, &dt.into(), &(ctx as u32).into()) {
            tracing::error!(?err, "guest step threw; stopping frame loop");
            return;
        }
        if let (Some(window), Some(hook)) = (web_sys::window(), hook_inner.borrow().as_ref()) {
            let _ = window.request_animation_frame(hook.as_ref().unchecked_ref());
        }
    }) as Box<dyn FnMut(f64)>));

    if let Some(closure) = hook.borrow().as_ref() {
        window.request_animation_frame(closure.as_ref().unchecked_ref())?;
    }
    Ok(())
}

/// Current memory size in bytes, mostly for diagnostics from the page.
#[wasm_bindgen]
pub fn memory_size() -> u32 {
    memory().size() as u32
}
