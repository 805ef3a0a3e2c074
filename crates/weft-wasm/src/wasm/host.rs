//! Guest-module seams: linear memory, indirect function table, exported
//! allocator and callback dispatcher.

use std::future::Future;
use std::pin::Pin;

use js_sys::{Function, Reflect, Uint8Array, WebAssembly};
use wasm_bindgen::{JsCast, JsValue};

use weft_mem::{MemoryError, WasmMemory};
use weft_wgpu::callback::{CallbackArg, CallbackInvoker, Spawn};
use weft_wgpu::state::GuestAllocator;

/// Linear memory of the instantiated guest.
///
/// The backing `ArrayBuffer` is re-read on every access: `memory.grow`
/// detaches previously obtained buffers, so no view is ever cached.
#[derive(Clone)]
pub struct JsMemory {
    memory: WebAssembly::Memory,
}

impl JsMemory {
    pub fn new(memory: WebAssembly::Memory) -> Self {
        Self { memory }
    }

    fn bytes(&self) -> Uint8Array {
        Uint8Array::new(&self.memory.buffer())
    }
}

impl WasmMemory for JsMemory {
    fn read(&self, addr: u64, dst: &mut [u8]) -> Result<(), MemoryError> {
        let bytes = self.bytes();
        let end = addr + dst.len() as u64;
        if end > bytes.length() as u64 {
            return Err(MemoryError {
                addr,
                len: dst.len(),
            });
        }
        bytes
            .subarray(addr as u32, end as u32)
            .copy_to(dst);
        Ok(())
    }

    fn write(&self, addr: u64, src: &[u8]) -> Result<(), MemoryError> {
        let bytes = self.bytes();
        let end = addr + src.len() as u64;
        if end > bytes.length() as u64 {
            return Err(MemoryError {
                addr,
                len: src.len(),
            });
        }
        bytes
            .subarray(addr as u32, end as u32)
            .copy_from(src);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.bytes().length() as u64
    }
}

/// Calls back into the guest through its exported indirect function table.
pub struct TableInvoker {
    table: WebAssembly::Table,
}

impl TableInvoker {
    pub fn new(table: WebAssembly::Table) -> Self {
        Self { table }
    }
}

impl CallbackInvoker for TableInvoker {
    fn invoke(&self, fnptr: u32, args: &[CallbackArg]) {
        let function: Function = match self.table.get(fnptr) {
            Ok(function) => function,
            Err(err) => {
                tracing::error!(fnptr, ?err, "callback index not in function table");
                return;
            }
        };
        let js_args = js_sys::Array::new();
        for arg in args {
            let value = match arg {
                CallbackArg::I32(v) => JsValue::from(*v),
                CallbackArg::U32(v) => JsValue::from(*v),
                CallbackArg::Ptr(v) => JsValue::from(*v as u32),
            };
            js_args.push(&value);
        }
        if let Err(err) = function.apply(&JsValue::NULL, &js_args) {
            tracing::error!(fnptr, ?err, "guest callback threw");
        }
    }
}

/// The guest's exported `wgpu_alloc`/`wgpu_free` pair.
pub struct JsAllocator {
    alloc: Function,
    free: Function,
}

impl JsAllocator {
    pub fn from_exports(exports: &JsValue) -> Option<Self> {
        let alloc = Reflect::get(exports, &"wgpu_alloc".into()).ok()?;
        let free = Reflect::get(exports, &"wgpu_free".into()).ok()?;
        Some(Self {
            alloc: alloc.dyn_into().ok()?,
            free: free.dyn_into().ok()?,
        })
    }
}

impl GuestAllocator for JsAllocator {
    fn alloc(&self, size: u64) -> u64 {
        self.alloc
            .call1(&JsValue::NULL, &JsValue::from(size as u32))
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0) as u64
    }

    fn free(&self, ptr: u64) {
        let _ = self.free.call1(&JsValue::NULL, &JsValue::from(ptr as u32));
    }
}

/// Host futures ride the browser microtask queue.
pub struct LocalSpawner;

impl Spawn for LocalSpawner {
    fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + 'static>>) {
        wasm_bindgen_futures::spawn_local(future);
    }
}

/// Exported guest entry points the DOM group re-enters through.
pub struct JsGuestExports {
    default_context_ptr: Function,
    do_event_callback: Function,
}

impl JsGuestExports {
    pub fn from_exports(exports: &JsValue) -> Option<Self> {
        let ctx = Reflect::get(exports, &"default_context_ptr".into()).ok()?;
        let cb = Reflect::get(exports, &"odin_dom_do_event_callback".into()).ok()?;
        Some(Self {
            default_context_ptr: ctx.dyn_into().ok()?,
            do_event_callback: cb.dyn_into().ok()?,
        })
    }
}

impl weft_dom::GuestExports for JsGuestExports {
    fn default_context_ptr(&self) -> u64 {
        self.default_context_ptr
            .call0(&JsValue::NULL)
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0) as u64
    }

    fn do_event_callback(&self, data: u64, callback: u64, ctx: u64) {
        if let Err(err) = self.do_event_callback.call3(
            &JsValue::NULL,
            &JsValue::from(data as u32),
            &JsValue::from(callback as u32),
            &JsValue::from(ctx as u32),
        ) {
            tracing::error!(?err, "odin_dom_do_event_callback threw");
        }
    }
}
