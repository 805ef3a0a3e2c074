//! End-to-end adapter tests against a real `wgpu` device.
//!
//! These skip silently on machines with no usable adapter (headless CI
//! without a software rasterizer).

#![cfg(not(target_arch = "wasm32"))]

use std::rc::Rc;

use weft_mem::{MemView, PtrWidth, VecMemory};
use weft_wgpu::callback::{CallbackArg, CallbackInvoker, GuestCallback, QueueSpawner,
    RecordingInvoker, Spawn, status};
use weft_wgpu::state::WebGpu;
use weft_wgpu::{BumpAllocator, WebGpuRuntime};

struct Harness {
    mem: VecMemory,
    runtime: WebGpuRuntime,
    invoker: Rc<RecordingInvoker>,
    spawner: Rc<QueueSpawner>,
}

impl Harness {
    fn view(&self) -> MemView<'_, VecMemory> {
        MemView::new(&self.mem, PtrWidth::Four)
    }

    fn drive(&self) {
        for future in self.spawner.take_all() {
            pollster::block_on(future);
        }
    }

    /// Last callback invocation of `fnptr`, as recorded by the invoker.
    fn last_call(&self, fnptr: u32) -> Vec<CallbackArg> {
        self.invoker
            .calls
            .borrow()
            .iter()
            .rev()
            .find(|(f, _)| *f == fnptr)
            .map(|(_, args)| args.clone())
            .expect("callback not invoked")
    }

    fn handle_arg(&self, fnptr: u32) -> u32 {
        match self.last_call(fnptr)[1] {
            CallbackArg::U32(handle) => handle,
            ref other => panic!("expected handle argument, got {other:?}"),
        }
    }
}

fn harness() -> Option<Harness> {
    let instance = wgpu::Instance::default();
    pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))?;

    let invoker = RecordingInvoker::new();
    let spawner = QueueSpawner::new();
    let gpu = WebGpu::with_instance(instance, Rc::new(BumpAllocator::new(0x8000, 0x20000)));
    let runtime = WebGpuRuntime::new(
        gpu,
        PtrWidth::Four,
        Rc::clone(&invoker) as Rc<dyn CallbackInvoker>,
        Rc::clone(&spawner) as Rc<dyn Spawn>,
    );
    Some(Harness {
        mem: VecMemory::new(0x20000),
        runtime,
        invoker,
        spawner,
    })
}

/// Requests adapter + device through the guest-facing path and returns
/// their handles.
fn request_device(h: &Harness) -> (u32, u32) {
    let instance = h.runtime.create_instance();
    h.runtime
        .instance_request_adapter(
            &h.view(),
            instance,
            0,
            GuestCallback {
                fnptr: 1,
                userdata: 0xA0,
            },
        )
        .unwrap();
    h.drive();
    assert_eq!(h.invoker.invocations_of(1), 1);
    let adapter = h.handle_arg(1);
    assert_ne!(adapter, 0);

    h.runtime
        .adapter_request_device(
            &h.view(),
            adapter,
            0,
            GuestCallback {
                fnptr: 2,
                userdata: 0xB0,
            },
        )
        .unwrap();
    h.drive();
    assert_eq!(h.invoker.invocations_of(2), 1);
    assert_eq!(h.last_call(2)[0], CallbackArg::I32(status::REQUEST_DEVICE_SUCCESS));
    let device = h.handle_arg(2);
    assert_ne!(device, 0);
    (adapter, device)
}

#[test]
fn adapter_and_device_requests_fire_once() {
    let Some(h) = harness() else {
        return;
    };
    let (adapter, device) = request_device(&h);

    // Userdata is echoed as the final callback argument.
    assert_eq!(h.last_call(1).last(), Some(&CallbackArg::Ptr(0xA0)));
    assert_eq!(h.last_call(2).last(), Some(&CallbackArg::Ptr(0xB0)));

    // Probe-then-fill feature enumeration: the counts agree.
    let view = h.view();
    let count = h
        .runtime
        .adapter_enumerate_features(&view, adapter, 0)
        .unwrap();
    let filled = h
        .runtime
        .adapter_enumerate_features(&view, adapter, 0x1000)
        .unwrap();
    assert_eq!(count, filled);
    for i in 0..count {
        assert_ne!(view.load_i32(0x1000 + i * 4).unwrap(), 0);
    }

    assert!(h.runtime.device_get_limits(&view, device, 0x2000).unwrap());
    let decoded =
        weft_wgpu::desc::decode_limits(&view, 0x2000 + weft_wgpu::desc::LIMITS_BLOCK_OFFSET)
            .unwrap();
    assert!(decoded.max_texture_dimension_2d.unwrap() >= 2048);
}

#[test]
fn buffer_map_callback_fires_exactly_once() {
    let Some(h) = harness() else {
        return;
    };
    let (_, device) = request_device(&h);
    let view = h.view();

    // BufferDescriptor: usage MAP_READ | COPY_DST, size 256.
    let base = 0x100;
    view.store_ptr(base, 0).unwrap();
    view.store_ptr(base + 4, 0).unwrap();
    view.store_u32(base + 8, 0x9).unwrap();
    view.store_u64(base + 16, 256).unwrap();
    view.store_u32(base + 24, 0).unwrap();
    let buffer = h.runtime.device_create_buffer(&view, device, base).unwrap();
    assert_eq!(h.runtime.buffer_get_size(buffer), 256);

    h.runtime
        .buffer_map_async(
            buffer,
            1,
            0,
            u64::MAX,
            GuestCallback {
                fnptr: 5,
                userdata: 0,
            },
        )
        .unwrap();

    // A second request while the first is pending reports already-pending
    // without disturbing it.
    h.runtime
        .buffer_map_async(
            buffer,
            1,
            0,
            u64::MAX,
            GuestCallback {
                fnptr: 6,
                userdata: 0,
            },
        )
        .unwrap();
    assert_eq!(h.invoker.invocations_of(6), 1);
    assert_eq!(
        h.last_call(6)[0],
        CallbackArg::I32(status::BUFFER_MAP_ALREADY_PENDING)
    );

    let device_rc = Rc::clone(h.runtime.gpu.borrow().devices.get(device));
    let _ = device_rc.poll(wgpu::Maintain::Wait);
    h.drive();

    assert_eq!(h.invoker.invocations_of(5), 1);
    assert_eq!(h.last_call(5)[0], CallbackArg::I32(status::BUFFER_MAP_SUCCESS));

    // Probe the mapped range through the guest staging allocation.
    let ptr = h
        .runtime
        .buffer_get_mapped_range(&view, buffer, 0, u64::MAX)
        .unwrap();
    assert_ne!(ptr, 0);
    assert_eq!(view.load_bytes(ptr, 256).unwrap(), vec![0u8; 256]);
    h.runtime.buffer_unmap(&view, buffer).unwrap();

    // After unmap the buffer can be mapped again.
    h.runtime
        .buffer_map_async(
            buffer,
            1,
            0,
            u64::MAX,
            GuestCallback {
                fnptr: 7,
                userdata: 0,
            },
        )
        .unwrap();
    let _ = device_rc.poll(wgpu::Maintain::Wait);
    h.drive();
    assert_eq!(h.invoker.invocations_of(7), 1);
}

#[test]
fn error_scopes_translate_to_status_codes() {
    let Some(h) = harness() else {
        return;
    };
    let (_, device) = request_device(&h);
    let view = h.view();

    // Scope with no error pops as ERROR_NONE.
    h.runtime.device_push_error_scope(device, 0).unwrap();
    h.runtime.device_pop_error_scope(
        device,
        GuestCallback {
            fnptr: 10,
            userdata: 0,
        },
    );
    h.drive();
    assert_eq!(h.invoker.invocations_of(10), 1);
    assert_eq!(h.last_call(10)[0], CallbackArg::I32(status::ERROR_NONE));

    // A buffer far past max_buffer_size raises a validation error inside
    // the scope.
    h.runtime.device_push_error_scope(device, 0).unwrap();
    let base = 0x100;
    view.store_ptr(base, 0).unwrap();
    view.store_ptr(base + 4, 0).unwrap();
    view.store_u32(base + 8, 0x8).unwrap(); // COPY_DST
    view.store_u64(base + 16, u64::MAX / 2).unwrap();
    view.store_u32(base + 24, 0).unwrap();
    let _ = h.runtime.device_create_buffer(&view, device, base).unwrap();

    h.runtime.device_pop_error_scope(
        device,
        GuestCallback {
            fnptr: 11,
            userdata: 0,
        },
    );
    h.drive();
    assert_eq!(h.invoker.invocations_of(11), 1);
    assert_eq!(h.last_call(11)[0], CallbackArg::I32(status::ERROR_VALIDATION));
}

#[test]
fn submitted_work_done_fires_once() {
    let Some(h) = harness() else {
        return;
    };
    let (_, device) = request_device(&h);
    let view = h.view();

    let queue = h.runtime.device_get_queue(device).unwrap();
    // Each GetQueue call mints a distinct handle.
    let queue2 = h.runtime.device_get_queue(device).unwrap();
    assert_ne!(queue, queue2);

    let encoder = h
        .runtime
        .device_create_command_encoder(&view, device, 0)
        .unwrap();
    let command_buffer = h.runtime.command_encoder_finish(encoder).unwrap();

    // Submitting the same command buffer twice is a validation error, not
    // a panic.
    view.store_ptr(0x100, command_buffer as u64).unwrap();
    h.runtime.queue_submit(&view, queue, 1, 0x100).unwrap();
    assert!(h.runtime.queue_submit(&view, queue, 1, 0x100).is_err());

    h.runtime.queue_on_submitted_work_done(
        queue,
        GuestCallback {
            fnptr: 20,
            userdata: 0x77,
        },
    );
    let device_rc = Rc::clone(h.runtime.gpu.borrow().devices.get(device));
    let _ = device_rc.poll(wgpu::Maintain::Wait);
    h.drive();

    assert_eq!(h.invoker.invocations_of(20), 1);
    assert_eq!(
        h.last_call(20),
        vec![
            CallbackArg::I32(status::QUEUE_WORK_DONE_SUCCESS),
            CallbackArg::Ptr(0x77)
        ]
    );
}

#[test]
fn compute_pipeline_end_to_end() {
    let Some(h) = harness() else {
        return;
    };
    let (_, device) = request_device(&h);
    let view = h.view();

    let code = "@compute @workgroup_size(1) fn main() {}";
    let code_ptr = 0x1000;
    let n = view.store_string(code_ptr, code).unwrap();
    view.store_u8(code_ptr + n as u64, 0).unwrap();

    let chain = 0x200;
    view.store_ptr(chain, 0).unwrap();
    view.store_u32(chain + 4, 6).unwrap(); // ShaderModuleWGSLDescriptor
    view.store_ptr(chain + 8, code_ptr).unwrap();
    let base = 0x100;
    view.store_ptr(base, chain).unwrap();
    view.store_ptr(base + 4, 0).unwrap();
    let module = h
        .runtime
        .device_create_shader_module(&view, device, base)
        .unwrap();

    // ComputePipelineDescriptor: label, layout (auto), stage inline.
    let entry = 0x1200;
    let n = view.store_string(entry, "main").unwrap();
    view.store_u8(entry + n as u64, 0).unwrap();
    let pdesc = 0x300;
    view.store_ptr(pdesc, 0).unwrap();
    view.store_ptr(pdesc + 4, 0).unwrap();
    view.store_ptr(pdesc + 8, 0).unwrap(); // layout: auto
    view.store_ptr(pdesc + 12, 0).unwrap(); // stage.nextInChain
    view.store_ptr(pdesc + 16, module as u64).unwrap();
    view.store_ptr(pdesc + 20, entry).unwrap();
    view.store_uint(pdesc + 24, 0).unwrap();
    view.store_ptr(pdesc + 28, 0).unwrap();

    let pipeline = h
        .runtime
        .device_create_compute_pipeline(&view, device, pdesc)
        .unwrap();
    assert_ne!(pipeline, 0);

    // Record a pass, end it, finish, submit.
    let encoder = h
        .runtime
        .device_create_command_encoder(&view, device, 0)
        .unwrap();
    let pass = h
        .runtime
        .command_encoder_begin_compute_pass(&view, encoder, 0)
        .unwrap();
    h.runtime
        .compute_pass_record(pass, weft_wgpu::ComputeCmd::SetPipeline(pipeline))
        .unwrap();
    h.runtime
        .compute_pass_record(
            pass,
            weft_wgpu::ComputeCmd::DispatchWorkgroups { x: 1, y: 1, z: 1 },
        )
        .unwrap();
    h.runtime.compute_pass_end(pass).unwrap();
    // Ending twice is caught.
    assert!(h.runtime.compute_pass_end(pass).is_err());

    let command_buffer = h.runtime.command_encoder_finish(encoder).unwrap();
    let queue = h.runtime.device_get_queue(device).unwrap();
    view.store_ptr(0x500, command_buffer as u64).unwrap();
    h.runtime.queue_submit(&view, queue, 1, 0x500).unwrap();
}
