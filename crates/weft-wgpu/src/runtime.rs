//! Foreign-callable WebGPU operations.
//!
//! Synchronous operations decode their arguments, resolve handles, make the
//! single corresponding backend call and hand a fresh handle (or scalar)
//! back. Asynchronous operations capture the guest callback, kick off the
//! backend future through the [`Spawn`] seam and invoke the callback with a
//! status code exactly once when the future settles — success or failure,
//! never both, never zero times.

use std::cell::RefCell;
use std::collections::HashMap;
use std::num::NonZeroU64;
use std::rc::Rc;

use futures_intrusive::channel::shared::oneshot_channel;
use weft_abi::limit_u64;
use weft_handles::Handle;
use weft_mem::{MemView, PtrWidth, WasmMemory};

use crate::callback::{CallbackArg, CallbackInvoker, GuestCallback, Spawn, status};
use crate::desc::{self, BindingLayoutIr, BindingResourceIr, CompilationMessageIr};
use crate::pass::{
    ComputeCmd, RenderCmd, replay_compute_pass, replay_render_bundle, replay_render_pass,
};
use crate::state::{
    BufferSlot, ComputePassSlot, Mapping, PassResources, RenderBundleSlot, RenderPassSlot, WebGpu,
};
use crate::{WebGpuError, enums};

fn deliver(invoker: &Rc<dyn CallbackInvoker>, callback: GuestCallback, args: &[CallbackArg]) {
    let mut full = args.to_vec();
    full.push(CallbackArg::Ptr(callback.userdata));
    invoker.invoke(callback.fnptr, &full);
}

/// The WebGPU import namespace: shared state plus the callback and spawn
/// seams into the embedding.
pub struct WebGpuRuntime {
    pub gpu: Rc<RefCell<WebGpu>>,
    ptr_width: PtrWidth,
    invoker: Rc<dyn CallbackInvoker>,
    spawner: Rc<dyn Spawn>,
}

impl WebGpuRuntime {
    pub fn new(
        gpu: WebGpu,
        ptr_width: PtrWidth,
        invoker: Rc<dyn CallbackInvoker>,
        spawner: Rc<dyn Spawn>,
    ) -> Self {
        Self {
            gpu: Rc::new(RefCell::new(gpu)),
            ptr_width,
            invoker,
            spawner,
        }
    }

    /* --------------------------- instance --------------------------- */

    pub fn create_instance(&self) -> Handle {
        self.gpu.borrow_mut().instances.create(())
    }

    pub fn instance_request_adapter<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        _instance: Handle,
        options_ptr: u64,
        callback: GuestCallback,
    ) -> Result<(), WebGpuError> {
        let options = desc::adapter_options(view, options_ptr)?;
        let backend = Rc::clone(&self.gpu.borrow().backend);
        let gpu = Rc::clone(&self.gpu);
        let invoker = Rc::clone(&self.invoker);

        self.spawner.spawn(Box::pin(async move {
            let request = backend.request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: options.power_preference.unwrap_or_default(),
                force_fallback_adapter: options.force_fallback_adapter,
                compatible_surface: None,
            });
            match request.await {
                Some(adapter) => {
                    let handle = gpu.borrow_mut().adapters.create(Rc::new(adapter));
                    deliver(
                        &invoker,
                        callback,
                        &[
                            CallbackArg::I32(status::REQUEST_ADAPTER_SUCCESS),
                            CallbackArg::U32(handle),
                            CallbackArg::Ptr(0),
                        ],
                    );
                }
                None => {
                    deliver(
                        &invoker,
                        callback,
                        &[
                            CallbackArg::I32(status::REQUEST_ADAPTER_UNAVAILABLE),
                            CallbackArg::U32(0),
                            CallbackArg::Ptr(0),
                        ],
                    );
                }
            }
        }));
        Ok(())
    }

    /* ---------------------------- adapter ---------------------------- */

    /// Probe-then-fill: a null `features_ptr` reports the count only; the
    /// second call fills a buffer the guest sized from the first.
    pub fn adapter_enumerate_features<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        adapter: Handle,
        features_ptr: u64,
    ) -> Result<u64, WebGpuError> {
        let features = self.gpu.borrow().adapters.get(adapter).features();
        enumerate_features(view, features, features_ptr)
    }

    pub fn adapter_has_feature(&self, adapter: Handle, feature_raw: u32) -> Result<bool, WebGpuError> {
        let flag = enums::feature(feature_raw)?;
        let features = self.gpu.borrow().adapters.get(adapter).features();
        Ok(flag.is_some_and(|flag| features.contains(flag)))
    }

    pub fn adapter_get_limits<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        adapter: Handle,
        supported_limits_ptr: u64,
    ) -> Result<bool, WebGpuError> {
        let limits = self.gpu.borrow().adapters.get(adapter).limits();
        desc::encode_limits(view, supported_limits_ptr, &limits)?;
        Ok(true)
    }

    /// Reports "unknown adapter on the WebGPU backend", as the browser
    /// cannot see through to the real hardware either.
    pub fn adapter_get_properties<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        _adapter: Handle,
        properties_ptr: u64,
    ) -> Result<(), WebGpuError> {
        view.store_i32(properties_ptr + 28, 3)?; // adapterType: unknown
        view.store_i32(properties_ptr + 32, 2)?; // backendType: WebGPU
        Ok(())
    }

    pub fn adapter_request_device<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        adapter: Handle,
        descriptor_ptr: u64,
        callback: GuestCallback,
    ) -> Result<(), WebGpuError> {
        let descriptor = desc::device_descriptor(view, descriptor_ptr)?;
        let adapter = Rc::clone(self.gpu.borrow().adapters.get(adapter));
        let gpu = Rc::clone(&self.gpu);
        let invoker = Rc::clone(&self.invoker);

        self.spawner.spawn(Box::pin(async move {
            let limits = descriptor
                .required_limits
                .as_ref()
                .map(|ir| ir.apply_to(wgpu::Limits::default()))
                .unwrap_or_default();
            let request = adapter.request_device(
                &wgpu::DeviceDescriptor {
                    label: descriptor.label.as_deref(),
                    required_features: descriptor.required_features,
                    required_limits: limits,
                },
                None,
            );
            match request.await {
                Ok((device, queue)) => {
                    let handle = {
                        let mut g = gpu.borrow_mut();
                        let queue = Rc::new(queue);
                        let handle = g.devices.create(Rc::new(device));
                        g.device_queues.insert(handle, queue);
                        handle
                    };
                    deliver(
                        &invoker,
                        callback,
                        &[
                            CallbackArg::I32(status::REQUEST_DEVICE_SUCCESS),
                            CallbackArg::U32(handle),
                            CallbackArg::Ptr(0),
                        ],
                    );
                }
                Err(err) => {
                    tracing::warn!(%err, "request_device failed");
                    deliver(
                        &invoker,
                        callback,
                        &[
                            CallbackArg::I32(status::REQUEST_DEVICE_ERROR),
                            CallbackArg::U32(0),
                            CallbackArg::Ptr(0),
                        ],
                    );
                }
            }
        }));
        Ok(())
    }

    /* ---------------------------- device ----------------------------- */

    pub fn device_enumerate_features<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        device: Handle,
        features_ptr: u64,
    ) -> Result<u64, WebGpuError> {
        let features = self.gpu.borrow().devices.get(device).features();
        enumerate_features(view, features, features_ptr)
    }

    pub fn device_has_feature(&self, device: Handle, feature_raw: u32) -> Result<bool, WebGpuError> {
        let flag = enums::feature(feature_raw)?;
        let features = self.gpu.borrow().devices.get(device).features();
        Ok(flag.is_some_and(|flag| features.contains(flag)))
    }

    pub fn device_get_limits<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        device: Handle,
        supported_limits_ptr: u64,
    ) -> Result<bool, WebGpuError> {
        let limits = self.gpu.borrow().devices.get(device).limits();
        desc::encode_limits(view, supported_limits_ptr, &limits)?;
        Ok(true)
    }

    /// Every call mints a fresh handle over the device's one queue, each
    /// with its own reference count.
    pub fn device_get_queue(&self, device: Handle) -> Result<Handle, WebGpuError> {
        let mut g = self.gpu.borrow_mut();
        let queue = g
            .device_queues
            .get(&device)
            .cloned()
            .ok_or_else(|| WebGpuError::Validation("device has no queue".into()))?;
        Ok(g.queues.create(queue))
    }

    pub fn device_destroy(&self, device: Handle) {
        self.gpu.borrow().devices.get(device).destroy();
    }

    pub fn device_push_error_scope(&self, device: Handle, filter_raw: u32) -> Result<(), WebGpuError> {
        let filter = enums::error_filter(filter_raw)?;
        self.gpu.borrow().devices.get(device).push_error_scope(filter);
        Ok(())
    }

    pub fn device_pop_error_scope(&self, device: Handle, callback: GuestCallback) {
        let device = Rc::clone(self.gpu.borrow().devices.get(device));
        let invoker = Rc::clone(&self.invoker);
        self.spawner.spawn(Box::pin(async move {
            let error = device.pop_error_scope().await;
            let code = match &error {
                None => status::ERROR_NONE,
                Some(wgpu::Error::Validation { .. }) => status::ERROR_VALIDATION,
                Some(wgpu::Error::OutOfMemory { .. }) => status::ERROR_OUT_OF_MEMORY,
                Some(wgpu::Error::Internal { .. }) => status::ERROR_INTERNAL,
            };
            if let Some(error) = &error {
                tracing::warn!(%error, "popped error scope");
            }
            deliver(
                &invoker,
                callback,
                &[CallbackArg::I32(code), CallbackArg::Ptr(0)],
            );
        }));
    }

    /// Stores the callback; the embedding reports errors through
    /// [`WebGpuRuntime::report_uncaptured_error`]. Re-registration replaces
    /// the previous callback.
    pub fn device_set_uncaptured_error_callback(&self, device: Handle, callback: GuestCallback) {
        self.gpu
            .borrow_mut()
            .uncaptured_error_callbacks
            .insert(device, callback);
    }

    pub fn report_uncaptured_error(&self, device: Handle, error_code: i32) {
        let callback = self
            .gpu
            .borrow()
            .uncaptured_error_callbacks
            .get(&device)
            .copied();
        if let Some(callback) = callback {
            deliver(
                &self.invoker,
                callback,
                &[CallbackArg::I32(error_code), CallbackArg::Ptr(0)],
            );
        }
    }

    /* ------------------------ device creation ------------------------ */

    pub fn device_create_buffer<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        device: Handle,
        descriptor_ptr: u64,
    ) -> Result<Handle, WebGpuError> {
        let descriptor = desc::buffer_descriptor(view, descriptor_ptr)?;
        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let buffer = gpu.devices.get(device).create_buffer(&wgpu::BufferDescriptor {
            label: descriptor.label.as_deref(),
            size: descriptor.size,
            usage: wgpu::BufferUsages::from_bits_truncate(descriptor.usage),
            mapped_at_creation: descriptor.mapped_at_creation,
        });
        Ok(gpu.buffers.create(BufferSlot {
            buffer,
            mapping: None,
            map_write: descriptor.mapped_at_creation,
            map_pending: false,
        }))
    }

    pub fn device_create_texture<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        device: Handle,
        descriptor_ptr: u64,
    ) -> Result<Handle, WebGpuError> {
        let descriptor = desc::texture_descriptor(view, descriptor_ptr)?;
        let format = descriptor
            .format
            .ok_or_else(|| WebGpuError::Validation("texture format not specified".into()))?;
        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let texture = gpu.devices.get(device).create_texture(&wgpu::TextureDescriptor {
            label: descriptor.label.as_deref(),
            size: descriptor.size,
            mip_level_count: descriptor.mip_level_count,
            sample_count: descriptor.sample_count,
            dimension: descriptor.dimension,
            format,
            usage: wgpu::TextureUsages::from_bits_truncate(descriptor.usage),
            view_formats: &descriptor.view_formats,
        });
        Ok(gpu.textures.create(texture))
    }

    pub fn device_create_sampler<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        device: Handle,
        descriptor_ptr: u64,
    ) -> Result<Handle, WebGpuError> {
        let descriptor = desc::sampler_descriptor(view, descriptor_ptr)?;
        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let device = gpu.devices.get(device);
        let sampler = match &descriptor {
            None => device.create_sampler(&wgpu::SamplerDescriptor::default()),
            Some(d) => device.create_sampler(&wgpu::SamplerDescriptor {
                label: d.label.as_deref(),
                address_mode_u: d.address_mode_u,
                address_mode_v: d.address_mode_v,
                address_mode_w: d.address_mode_w,
                mag_filter: d.mag_filter,
                min_filter: d.min_filter,
                mipmap_filter: d.mipmap_filter,
                lod_min_clamp: d.lod_min_clamp,
                lod_max_clamp: d.lod_max_clamp,
                compare: d.compare,
                anisotropy_clamp: d.max_anisotropy.max(1),
                border_color: None,
            }),
        };
        Ok(gpu.samplers.create(sampler))
    }

    pub fn device_create_shader_module<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        device: Handle,
        descriptor_ptr: u64,
    ) -> Result<Handle, WebGpuError> {
        let descriptor = desc::shader_module_descriptor(view, descriptor_ptr)?;
        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let module = gpu
            .devices
            .get(device)
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: descriptor.label.as_deref(),
                source: wgpu::ShaderSource::Wgsl(descriptor.code.into()),
            });
        Ok(gpu.shader_modules.create(Rc::new(module)))
    }

    pub fn device_create_bind_group_layout<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        device: Handle,
        descriptor_ptr: u64,
    ) -> Result<Handle, WebGpuError> {
        let descriptor = desc::bind_group_layout_descriptor(view, descriptor_ptr)?;
        let entries = descriptor
            .entries
            .iter()
            .filter_map(|entry| {
                let ty = binding_type(entry.layout.as_ref()?);
                Some(wgpu::BindGroupLayoutEntry {
                    binding: entry.binding,
                    visibility: wgpu::ShaderStages::from_bits_truncate(entry.visibility),
                    ty,
                    count: None,
                })
            })
            .collect::<Vec<_>>();
        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let layout = gpu
            .devices
            .get(device)
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: descriptor.label.as_deref(),
                entries: &entries,
            });
        Ok(gpu.bind_group_layouts.create(layout))
    }

    pub fn device_create_bind_group<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        device: Handle,
        descriptor_ptr: u64,
    ) -> Result<Handle, WebGpuError> {
        let descriptor = desc::bind_group_descriptor(view, descriptor_ptr)?;
        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;

        let mut entries = Vec::with_capacity(descriptor.entries.len());
        for entry in &descriptor.entries {
            let resource = match &entry.resource {
                BindingResourceIr::Buffer {
                    buffer,
                    offset,
                    size,
                } => wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &gpu.buffers.get(*buffer).buffer,
                    offset: *offset,
                    size: limit_u64(*size).and_then(NonZeroU64::new),
                }),
                BindingResourceIr::Sampler(sampler) => {
                    wgpu::BindingResource::Sampler(gpu.samplers.get(*sampler))
                }
                BindingResourceIr::TextureView(texture_view) => {
                    wgpu::BindingResource::TextureView(gpu.texture_views.get(*texture_view))
                }
                BindingResourceIr::Empty => {
                    return Err(WebGpuError::Validation(format!(
                        "bind group entry {} has no resource",
                        entry.binding
                    )));
                }
            };
            entries.push(wgpu::BindGroupEntry {
                binding: entry.binding,
                resource,
            });
        }

        let bind_group = gpu.devices.get(device).create_bind_group(&wgpu::BindGroupDescriptor {
            label: descriptor.label.as_deref(),
            layout: gpu.bind_group_layouts.get(descriptor.layout),
            entries: &entries,
        });
        drop(entries);
        Ok(gpu.bind_groups.create(bind_group))
    }

    pub fn device_create_pipeline_layout<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        device: Handle,
        descriptor_ptr: u64,
    ) -> Result<Handle, WebGpuError> {
        let descriptor = desc::pipeline_layout_descriptor(view, descriptor_ptr)?;
        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let layouts = descriptor
            .bind_group_layouts
            .iter()
            .map(|&h| gpu.bind_group_layouts.get(h))
            .collect::<Vec<_>>();
        let layout = gpu
            .devices
            .get(device)
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: descriptor.label.as_deref(),
                bind_group_layouts: &layouts,
                push_constant_ranges: &[],
            });
        drop(layouts);
        Ok(gpu.pipeline_layouts.create(layout))
    }

    pub fn device_create_render_pipeline<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        device: Handle,
        descriptor_ptr: u64,
    ) -> Result<Handle, WebGpuError> {
        let descriptor = desc::render_pipeline_descriptor(view, descriptor_ptr)?;
        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let pipeline = create_render_pipeline(gpu, device, &descriptor)?;
        Ok(gpu.render_pipelines.create(pipeline))
    }

    /// The backend creates pipelines eagerly; the asynchronous flavor
    /// preserves the callback contract by settling on the spawned future.
    pub fn device_create_render_pipeline_async<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        device: Handle,
        descriptor_ptr: u64,
        callback: GuestCallback,
    ) -> Result<(), WebGpuError> {
        let result = self.device_create_render_pipeline(view, device, descriptor_ptr);
        self.settle_pipeline_async(result, callback);
        Ok(())
    }

    pub fn device_create_compute_pipeline<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        device: Handle,
        descriptor_ptr: u64,
    ) -> Result<Handle, WebGpuError> {
        let descriptor = desc::compute_pipeline_descriptor(view, descriptor_ptr)?;
        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;

        let module = Rc::clone(gpu.shader_modules.get(descriptor.stage.module));
        let constants: HashMap<String, f64> = descriptor.stage.constants.iter().cloned().collect();
        let pipeline = gpu
            .devices
            .get(device)
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: descriptor.label.as_deref(),
                layout: descriptor.layout.map(|h| gpu.pipeline_layouts.get(h)),
                module: &module,
                entry_point: descriptor.stage.entry_point.as_deref().unwrap_or("main"),
                compilation_options: wgpu::PipelineCompilationOptions {
                    constants: &constants,
                    ..Default::default()
                },
            });
        Ok(gpu.compute_pipelines.create(pipeline))
    }

    pub fn device_create_compute_pipeline_async<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        device: Handle,
        descriptor_ptr: u64,
        callback: GuestCallback,
    ) -> Result<(), WebGpuError> {
        let result = self.device_create_compute_pipeline(view, device, descriptor_ptr);
        self.settle_pipeline_async(result, callback);
        Ok(())
    }

    fn settle_pipeline_async(&self, result: Result<Handle, WebGpuError>, callback: GuestCallback) {
        let invoker = Rc::clone(&self.invoker);
        self.spawner.spawn(Box::pin(async move {
            match result {
                Ok(handle) => deliver(
                    &invoker,
                    callback,
                    &[
                        CallbackArg::I32(status::CREATE_PIPELINE_SUCCESS),
                        CallbackArg::U32(handle),
                        CallbackArg::Ptr(0),
                    ],
                ),
                Err(err) => {
                    tracing::warn!(%err, "async pipeline creation failed");
                    deliver(
                        &invoker,
                        callback,
                        &[
                            CallbackArg::I32(status::CREATE_PIPELINE_UNKNOWN),
                            CallbackArg::U32(0),
                            CallbackArg::Ptr(0),
                        ],
                    );
                }
            }
        }));
    }

    pub fn device_create_command_encoder<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        device: Handle,
        descriptor_ptr: u64,
    ) -> Result<Handle, WebGpuError> {
        let descriptor = desc::command_encoder_descriptor(view, descriptor_ptr)?;
        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let encoder = gpu
            .devices
            .get(device)
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: descriptor.label.as_deref(),
            });
        Ok(gpu.command_encoders.create(Some(encoder)))
    }

    pub fn device_create_query_set<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        device: Handle,
        descriptor_ptr: u64,
    ) -> Result<Handle, WebGpuError> {
        let descriptor = desc::query_set_descriptor(view, descriptor_ptr)?;
        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let query_set = gpu.devices.get(device).create_query_set(&wgpu::QuerySetDescriptor {
            label: descriptor.label.as_deref(),
            ty: descriptor.ty,
            count: descriptor.count,
        });
        Ok(gpu.query_sets.create(query_set))
    }

    /* ---------------------------- texture ---------------------------- */

    pub fn texture_create_view<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        texture: Handle,
        descriptor_ptr: u64,
    ) -> Result<Handle, WebGpuError> {
        let descriptor = desc::texture_view_descriptor(view, descriptor_ptr)?;
        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let texture = gpu.textures.get(texture);
        let texture_view = match &descriptor {
            None => texture.create_view(&wgpu::TextureViewDescriptor::default()),
            Some(d) => texture.create_view(&wgpu::TextureViewDescriptor {
                label: d.label.as_deref(),
                format: d.format,
                dimension: d.dimension,
                aspect: d.aspect,
                base_mip_level: d.base_mip_level,
                mip_level_count: d.mip_level_count,
                base_array_layer: d.base_array_layer,
                array_layer_count: d.array_layer_count,
            }),
        };
        Ok(gpu.texture_views.create(texture_view))
    }

    pub fn texture_width(&self, texture: Handle) -> u32 {
        self.gpu.borrow().textures.get(texture).width()
    }

    pub fn texture_height(&self, texture: Handle) -> u32 {
        self.gpu.borrow().textures.get(texture).height()
    }

    pub fn texture_depth_or_array_layers(&self, texture: Handle) -> u32 {
        self.gpu.borrow().textures.get(texture).depth_or_array_layers()
    }

    pub fn texture_mip_level_count(&self, texture: Handle) -> u32 {
        self.gpu.borrow().textures.get(texture).mip_level_count()
    }

    pub fn texture_sample_count(&self, texture: Handle) -> u32 {
        self.gpu.borrow().textures.get(texture).sample_count()
    }

    pub fn texture_format_code(&self, texture: Handle) -> u32 {
        enums::texture_format_code(self.gpu.borrow().textures.get(texture).format())
    }

    pub fn texture_dimension_code(&self, texture: Handle) -> u32 {
        enums::texture_dimension_code(self.gpu.borrow().textures.get(texture).dimension())
    }

    pub fn texture_usage_bits(&self, texture: Handle) -> u32 {
        self.gpu.borrow().textures.get(texture).usage().bits()
    }

    pub fn texture_destroy(&self, texture: Handle) {
        self.gpu.borrow().textures.get(texture).destroy();
    }

    /* ----------------------------- buffer ----------------------------- */

    pub fn buffer_get_size(&self, buffer: Handle) -> u64 {
        self.gpu.borrow().buffers.get(buffer).buffer.size()
    }

    pub fn buffer_get_usage_bits(&self, buffer: Handle) -> u32 {
        self.gpu.borrow().buffers.get(buffer).buffer.usage().bits()
    }

    pub fn buffer_destroy(&self, buffer: Handle) {
        self.gpu.borrow().buffers.get(buffer).buffer.destroy();
    }

    pub fn buffer_map_async(
        &self,
        buffer: Handle,
        mode_bits: u32,
        offset: u64,
        size: u64,
        callback: GuestCallback,
    ) -> Result<(), WebGpuError> {
        const MAP_WRITE: u32 = 1 << 1;
        let write = mode_bits & MAP_WRITE != 0;
        let mode = if write {
            wgpu::MapMode::Write
        } else {
            wgpu::MapMode::Read
        };

        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let slot = gpu.buffers.get_mut(buffer);
        if slot.map_pending || slot.mapping.is_some() {
            drop(g);
            deliver(
                &self.invoker,
                callback,
                &[CallbackArg::I32(status::BUFFER_MAP_ALREADY_PENDING)],
            );
            return Ok(());
        }
        slot.map_write = write;
        slot.map_pending = true;

        let size = limit_u64(size).unwrap_or(slot.buffer.size() - offset);
        let (sender, receiver) = oneshot_channel();
        slot.buffer
            .slice(offset..offset + size)
            .map_async(mode, move |result| {
                let _ = sender.send(result);
            });
        drop(g);

        let invoker = Rc::clone(&self.invoker);
        let shared = Rc::clone(&self.gpu);
        self.spawner.spawn(Box::pin(async move {
            let code = match receiver.receive().await {
                Some(Ok(())) => status::BUFFER_MAP_SUCCESS,
                Some(Err(err)) => {
                    tracing::warn!(%err, "buffer map failed");
                    status::BUFFER_MAP_VALIDATION_ERROR
                }
                None => status::BUFFER_MAP_UNKNOWN,
            };
            if let Some(slot) = shared.borrow_mut().buffers.try_get_mut(buffer) {
                slot.map_pending = false;
            }
            deliver(&invoker, callback, &[CallbackArg::I32(code)]);
        }));
        Ok(())
    }

    /// Copies the mapped range into a guest staging allocation and returns
    /// its address. The staging bytes flow back on
    /// [`WebGpuRuntime::buffer_unmap`] for writable mappings.
    pub fn buffer_get_mapped_range<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        buffer: Handle,
        offset: u64,
        size: u64,
    ) -> Result<u64, WebGpuError> {
        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let slot = gpu.buffers.get_mut(buffer);
        if slot.mapping.is_some() {
            return Err(WebGpuError::Validation("buffer already has a mapped range".into()));
        }
        let size = limit_u64(size).unwrap_or(slot.buffer.size() - offset);
        let ptr = gpu.allocator.alloc(size);
        if ptr == 0 {
            return Err(WebGpuError::Validation(
                "guest allocator exhausted for mapped range".into(),
            ));
        }

        {
            let range = slot.buffer.slice(offset..offset + size).get_mapped_range();
            view.store_bytes(ptr, &range[..])?;
        }
        slot.mapping = Some(Mapping {
            ptr,
            offset,
            size,
            write: slot.map_write,
        });
        Ok(ptr)
    }

    pub fn buffer_unmap<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        buffer: Handle,
    ) -> Result<(), WebGpuError> {
        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let slot = gpu.buffers.get_mut(buffer);
        let mapping = slot
            .mapping
            .take()
            .ok_or_else(|| WebGpuError::Validation("buffer not mapped".into()))?;

        if mapping.write {
            let staged = view.load_bytes(mapping.ptr, mapping.size as usize)?;
            let mut range = slot
                .buffer
                .slice(mapping.offset..mapping.offset + mapping.size)
                .get_mapped_range_mut();
            range.copy_from_slice(&staged);
        }
        slot.buffer.unmap();
        gpu.allocator.free(mapping.ptr);
        Ok(())
    }

    /* ------------------------- command encoding ----------------------- */

    pub fn command_encoder_begin_render_pass<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        encoder: Handle,
        descriptor_ptr: u64,
    ) -> Result<Handle, WebGpuError> {
        let descriptor = desc::render_pass_descriptor(view, descriptor_ptr)?;
        let mut g = self.gpu.borrow_mut();
        Ok(g.render_pass_encoders.create(RenderPassSlot {
            encoder,
            descriptor,
            commands: Vec::new(),
            ended: false,
        }))
    }

    pub fn command_encoder_begin_compute_pass<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        encoder: Handle,
        descriptor_ptr: u64,
    ) -> Result<Handle, WebGpuError> {
        let descriptor = desc::compute_pass_descriptor(view, descriptor_ptr)?;
        let mut g = self.gpu.borrow_mut();
        Ok(g.compute_pass_encoders.create(ComputePassSlot {
            encoder,
            descriptor,
            commands: Vec::new(),
            ended: false,
        }))
    }

    pub fn command_encoder_copy_buffer_to_buffer(
        &self,
        encoder: Handle,
        source: Handle,
        source_offset: u64,
        destination: Handle,
        destination_offset: u64,
        size: u64,
    ) -> Result<(), WebGpuError> {
        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let enc = live_encoder(&mut gpu.command_encoders, encoder)?;
        enc.copy_buffer_to_buffer(
            &gpu.buffers.get(source).buffer,
            source_offset,
            &gpu.buffers.get(destination).buffer,
            destination_offset,
            size,
        );
        Ok(())
    }

    pub fn command_encoder_copy_buffer_to_texture<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        encoder: Handle,
        source_ptr: u64,
        destination_ptr: u64,
        copy_size_ptr: u64,
    ) -> Result<(), WebGpuError> {
        let source = desc::image_copy_buffer(view, source_ptr)?;
        let destination = desc::image_copy_texture(view, destination_ptr)?;
        let size = desc::extent_3d_at(view, copy_size_ptr)?;

        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let enc = live_encoder(&mut gpu.command_encoders, encoder)?;
        enc.copy_buffer_to_texture(
            wgpu::ImageCopyBuffer {
                buffer: &gpu.buffers.get(source.buffer).buffer,
                layout: image_data_layout(&source.layout),
            },
            image_copy_texture(&gpu.textures, &destination),
            size,
        );
        Ok(())
    }

    pub fn command_encoder_copy_texture_to_buffer<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        encoder: Handle,
        source_ptr: u64,
        destination_ptr: u64,
        copy_size_ptr: u64,
    ) -> Result<(), WebGpuError> {
        let source = desc::image_copy_texture(view, source_ptr)?;
        let destination = desc::image_copy_buffer(view, destination_ptr)?;
        let size = desc::extent_3d_at(view, copy_size_ptr)?;

        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let enc = live_encoder(&mut gpu.command_encoders, encoder)?;
        enc.copy_texture_to_buffer(
            image_copy_texture(&gpu.textures, &source),
            wgpu::ImageCopyBuffer {
                buffer: &gpu.buffers.get(destination.buffer).buffer,
                layout: image_data_layout(&destination.layout),
            },
            size,
        );
        Ok(())
    }

    pub fn command_encoder_copy_texture_to_texture<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        encoder: Handle,
        source_ptr: u64,
        destination_ptr: u64,
        copy_size_ptr: u64,
    ) -> Result<(), WebGpuError> {
        let source = desc::image_copy_texture(view, source_ptr)?;
        let destination = desc::image_copy_texture(view, destination_ptr)?;
        let size = desc::extent_3d_at(view, copy_size_ptr)?;

        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let enc = live_encoder(&mut gpu.command_encoders, encoder)?;
        enc.copy_texture_to_texture(
            image_copy_texture(&gpu.textures, &source),
            image_copy_texture(&gpu.textures, &destination),
            size,
        );
        Ok(())
    }

    pub fn command_encoder_finish(&self, encoder: Handle) -> Result<Handle, WebGpuError> {
        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let enc = gpu
            .command_encoders
            .get_mut(encoder)
            .take()
            .ok_or_else(|| WebGpuError::Validation("command encoder already finished".into()))?;
        Ok(gpu.command_buffers.create(Some(enc.finish())))
    }

    /* ------------------------- pass recording ------------------------- */

    pub fn render_pass_record(&self, pass: Handle, command: RenderCmd) -> Result<(), WebGpuError> {
        let mut g = self.gpu.borrow_mut();
        let slot = g.render_pass_encoders.get_mut(pass);
        if slot.ended {
            return Err(WebGpuError::Validation("render pass already ended".into()));
        }
        slot.commands.push(command);
        Ok(())
    }

    pub fn render_pass_set_bind_group<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        pass: Handle,
        index: u32,
        bind_group: Handle,
        dynamic_offset_count: u64,
        dynamic_offsets_ptr: u64,
    ) -> Result<(), WebGpuError> {
        let dynamic_offsets = load_u32_array(view, dynamic_offsets_ptr, dynamic_offset_count)?;
        self.render_pass_record(
            pass,
            RenderCmd::SetBindGroup {
                index,
                bind_group,
                dynamic_offsets,
            },
        )
    }

    pub fn render_pass_end(&self, pass: Handle) -> Result<(), WebGpuError> {
        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let (encoder_handle, descriptor, commands) = {
            let slot = gpu.render_pass_encoders.get_mut(pass);
            if slot.ended {
                return Err(WebGpuError::Validation("render pass already ended".into()));
            }
            slot.ended = true;
            (
                slot.encoder,
                slot.descriptor.clone(),
                std::mem::take(&mut slot.commands),
            )
        };

        let resources = PassResources {
            texture_views: &gpu.texture_views,
            query_sets: &gpu.query_sets,
            render_pipelines: &gpu.render_pipelines,
            compute_pipelines: &gpu.compute_pipelines,
            bind_groups: &gpu.bind_groups,
            buffers: &gpu.buffers,
            render_bundles: &gpu.render_bundles,
        };
        let encoder = gpu
            .command_encoders
            .get_mut(encoder_handle)
            .as_mut()
            .ok_or_else(|| WebGpuError::Validation("command encoder already finished".into()))?;
        replay_render_pass(&resources, encoder, &descriptor, &commands)
    }

    pub fn compute_pass_record(&self, pass: Handle, command: ComputeCmd) -> Result<(), WebGpuError> {
        let mut g = self.gpu.borrow_mut();
        let slot = g.compute_pass_encoders.get_mut(pass);
        if slot.ended {
            return Err(WebGpuError::Validation("compute pass already ended".into()));
        }
        slot.commands.push(command);
        Ok(())
    }

    pub fn compute_pass_set_bind_group<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        pass: Handle,
        index: u32,
        bind_group: Handle,
        dynamic_offset_count: u64,
        dynamic_offsets_ptr: u64,
    ) -> Result<(), WebGpuError> {
        let dynamic_offsets = load_u32_array(view, dynamic_offsets_ptr, dynamic_offset_count)?;
        self.compute_pass_record(
            pass,
            ComputeCmd::SetBindGroup {
                index,
                bind_group,
                dynamic_offsets,
            },
        )
    }

    pub fn compute_pass_end(&self, pass: Handle) -> Result<(), WebGpuError> {
        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let (encoder_handle, descriptor, commands) = {
            let slot = gpu.compute_pass_encoders.get_mut(pass);
            if slot.ended {
                return Err(WebGpuError::Validation("compute pass already ended".into()));
            }
            slot.ended = true;
            (
                slot.encoder,
                slot.descriptor.clone(),
                std::mem::take(&mut slot.commands),
            )
        };

        let resources = PassResources {
            texture_views: &gpu.texture_views,
            query_sets: &gpu.query_sets,
            render_pipelines: &gpu.render_pipelines,
            compute_pipelines: &gpu.compute_pipelines,
            bind_groups: &gpu.bind_groups,
            buffers: &gpu.buffers,
            render_bundles: &gpu.render_bundles,
        };
        let encoder = gpu
            .command_encoders
            .get_mut(encoder_handle)
            .as_mut()
            .ok_or_else(|| WebGpuError::Validation("command encoder already finished".into()))?;
        replay_compute_pass(&resources, encoder, &descriptor, &commands)
    }

    /* -------------------------- render bundles ------------------------ */

    pub fn device_create_render_bundle_encoder<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        device: Handle,
        descriptor_ptr: u64,
    ) -> Result<Handle, WebGpuError> {
        let descriptor = desc::render_bundle_encoder_descriptor(view, descriptor_ptr)?;
        let mut g = self.gpu.borrow_mut();
        Ok(g.render_bundle_encoders.create(RenderBundleSlot {
            device,
            descriptor,
            commands: Vec::new(),
            finished: false,
        }))
    }

    pub fn render_bundle_record(
        &self,
        encoder: Handle,
        command: RenderCmd,
    ) -> Result<(), WebGpuError> {
        let mut g = self.gpu.borrow_mut();
        let slot = g.render_bundle_encoders.get_mut(encoder);
        if slot.finished {
            return Err(WebGpuError::Validation("render bundle already finished".into()));
        }
        slot.commands.push(command);
        Ok(())
    }

    pub fn render_bundle_set_bind_group<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        encoder: Handle,
        index: u32,
        bind_group: Handle,
        dynamic_offset_count: u64,
        dynamic_offsets_ptr: u64,
    ) -> Result<(), WebGpuError> {
        let dynamic_offsets = load_u32_array(view, dynamic_offsets_ptr, dynamic_offset_count)?;
        self.render_bundle_record(
            encoder,
            RenderCmd::SetBindGroup {
                index,
                bind_group,
                dynamic_offsets,
            },
        )
    }

    /// Opens the real bundle encoder on the owning device, replays the
    /// recorded commands and returns the finished bundle's handle.
    pub fn render_bundle_encoder_finish(&self, encoder: Handle) -> Result<Handle, WebGpuError> {
        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let (device_handle, descriptor, commands) = {
            let slot = gpu.render_bundle_encoders.get_mut(encoder);
            if slot.finished {
                return Err(WebGpuError::Validation("render bundle already finished".into()));
            }
            slot.finished = true;
            (
                slot.device,
                slot.descriptor.clone(),
                std::mem::take(&mut slot.commands),
            )
        };

        let resources = PassResources {
            texture_views: &gpu.texture_views,
            query_sets: &gpu.query_sets,
            render_pipelines: &gpu.render_pipelines,
            compute_pipelines: &gpu.compute_pipelines,
            bind_groups: &gpu.bind_groups,
            buffers: &gpu.buffers,
            render_bundles: &gpu.render_bundles,
        };

        let device = gpu.devices.get(device_handle);
        let mut bundle_encoder =
            device.create_render_bundle_encoder(&wgpu::RenderBundleEncoderDescriptor {
                label: descriptor.label.as_deref(),
                color_formats: &descriptor.color_formats,
                depth_stencil: descriptor.depth_stencil_format.map(|format| {
                    wgpu::RenderBundleDepthStencil {
                        format,
                        depth_read_only: descriptor.depth_read_only,
                        stencil_read_only: descriptor.stencil_read_only,
                    }
                }),
                sample_count: descriptor.sample_count.max(1),
                multiview: None,
            });
        replay_render_bundle(&resources, &mut bundle_encoder, &commands)?;
        let bundle = bundle_encoder.finish(&wgpu::RenderBundleDescriptor {
            label: descriptor.label.as_deref(),
        });
        Ok(gpu.render_bundles.create(bundle))
    }

    /// `ExecuteBundles` on a render pass: the bundle handles are read from
    /// a pointer-width array.
    pub fn render_pass_execute_bundles<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        pass: Handle,
        bundle_count: u64,
        bundles_ptr: u64,
    ) -> Result<(), WebGpuError> {
        let w = view.ptr_width().size();
        let mut bundles = Vec::with_capacity(bundle_count as usize);
        for i in 0..bundle_count {
            bundles.push(view.load_ptr(bundles_ptr + i * w)? as Handle);
        }
        self.render_pass_record(pass, RenderCmd::ExecuteBundles(bundles))
    }

    /* ------------------------------ queue ------------------------------ */

    pub fn queue_submit<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        queue: Handle,
        command_count: u64,
        commands_ptr: u64,
    ) -> Result<(), WebGpuError> {
        let w = view.ptr_width().size();
        let mut handles = Vec::with_capacity(command_count as usize);
        for i in 0..command_count {
            handles.push(view.load_ptr(commands_ptr + i * w)? as Handle);
        }

        let mut g = self.gpu.borrow_mut();
        let gpu = &mut *g;
        let mut buffers = Vec::with_capacity(handles.len());
        for handle in handles {
            let buffer = gpu.command_buffers.get_mut(handle).take().ok_or_else(|| {
                WebGpuError::Validation(format!("command buffer {handle} already submitted"))
            })?;
            buffers.push(buffer);
        }
        gpu.queues.get(queue).submit(buffers);
        Ok(())
    }

    pub fn queue_write_buffer<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        queue: Handle,
        buffer: Handle,
        buffer_offset: u64,
        data_ptr: u64,
        size: u64,
    ) -> Result<(), WebGpuError> {
        let data = view.load_bytes(data_ptr, size as usize)?;
        let g = self.gpu.borrow();
        g.queues
            .get(queue)
            .write_buffer(&g.buffers.get(buffer).buffer, buffer_offset, &data);
        Ok(())
    }

    pub fn queue_write_texture<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        queue: Handle,
        destination_ptr: u64,
        data_ptr: u64,
        data_size: u64,
        data_layout_ptr: u64,
        write_size_ptr: u64,
    ) -> Result<(), WebGpuError> {
        let destination = desc::image_copy_texture(view, destination_ptr)?;
        let data = view.load_bytes(data_ptr, data_size as usize)?;
        let layout = desc::data_layout_at(view, data_layout_ptr)?;
        let size = desc::extent_3d_at(view, write_size_ptr)?;

        let g = self.gpu.borrow();
        g.queues.get(queue).write_texture(
            image_copy_texture(&g.textures, &destination),
            &data,
            image_data_layout(&layout),
            size,
        );
        Ok(())
    }

    pub fn queue_on_submitted_work_done(&self, queue: Handle, callback: GuestCallback) {
        let (sender, receiver) = oneshot_channel();
        self.gpu
            .borrow()
            .queues
            .get(queue)
            .on_submitted_work_done(move || {
                let _ = sender.send(());
            });

        let invoker = Rc::clone(&self.invoker);
        self.spawner.spawn(Box::pin(async move {
            let _ = receiver.receive().await;
            deliver(
                &invoker,
                callback,
                &[CallbackArg::I32(status::QUEUE_WORK_DONE_SUCCESS)],
            );
        }));
    }

    /* -------------------------- shader module ------------------------- */

    pub fn shader_module_get_compilation_info<M: WasmMemory + 'static>(
        &self,
        mem: Rc<M>,
        module: Handle,
        callback: GuestCallback,
    ) {
        let module = Rc::clone(self.gpu.borrow().shader_modules.get(module));
        let gpu = Rc::clone(&self.gpu);
        let invoker = Rc::clone(&self.invoker);
        let ptr_width = self.ptr_width;

        self.spawner.spawn(Box::pin(async move {
            let info = module.get_compilation_info().await;
            let messages: Vec<CompilationMessageIr> = info
                .messages
                .iter()
                .map(|message| CompilationMessageIr {
                    message: message.message.clone(),
                    ..CompilationMessageIr::default()
                })
                .collect();

            let view = MemView::new(&*mem, ptr_width);
            let encoded = {
                let g = gpu.borrow();
                desc::encode_compilation_info(&view, &*g.allocator, &messages)
            };
            match encoded {
                Ok((ret_ptr, allocations)) => {
                    deliver(
                        &invoker,
                        callback,
                        &[
                            CallbackArg::I32(status::COMPILATION_INFO_SUCCESS),
                            CallbackArg::Ptr(ret_ptr),
                        ],
                    );
                    let g = gpu.borrow();
                    for ptr in allocations {
                        g.allocator.free(ptr);
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, "compilation info encode failed");
                    deliver(
                        &invoker,
                        callback,
                        &[
                            CallbackArg::I32(status::COMPILATION_INFO_ERROR),
                            CallbackArg::Ptr(0),
                        ],
                    );
                }
            }
        }));
    }
}

/* ------------------------------ helpers ------------------------------ */

fn enumerate_features<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    features: wgpu::Features,
    features_ptr: u64,
) -> Result<u64, WebGpuError> {
    let mut codes = Vec::new();
    for (code, flag) in enums::FEATURES {
        if features.contains(*flag) {
            codes.push(*code);
        }
    }
    if features_ptr != 0 {
        for (i, code) in codes.iter().enumerate() {
            view.store_i32(features_ptr + (i as u64) * 4, *code as i32)?;
        }
    }
    Ok(codes.len() as u64)
}

fn load_u32_array<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
    count: u64,
) -> Result<Vec<u32>, WebGpuError> {
    let mut values = Vec::with_capacity(count as usize);
    for i in 0..count {
        values.push(view.load_u32(ptr + i * 4)?);
    }
    Ok(values)
}

fn live_encoder(
    encoders: &mut weft_handles::HandleTable<Option<wgpu::CommandEncoder>>,
    handle: Handle,
) -> Result<&mut wgpu::CommandEncoder, WebGpuError> {
    encoders
        .get_mut(handle)
        .as_mut()
        .ok_or_else(|| WebGpuError::Validation("command encoder already finished".into()))
}

fn image_copy_texture<'a>(
    textures: &'a weft_handles::HandleTable<wgpu::Texture>,
    ir: &desc::ImageCopyTextureIr,
) -> wgpu::ImageCopyTexture<'a> {
    wgpu::ImageCopyTexture {
        texture: textures.get(ir.texture),
        mip_level: ir.mip_level,
        origin: ir.origin,
        aspect: ir.aspect,
    }
}

fn image_data_layout(ir: &desc::DataLayoutIr) -> wgpu::ImageDataLayout {
    wgpu::ImageDataLayout {
        offset: ir.offset,
        bytes_per_row: ir.bytes_per_row,
        rows_per_image: ir.rows_per_image,
    }
}

fn binding_type(layout: &BindingLayoutIr) -> wgpu::BindingType {
    match layout {
        BindingLayoutIr::Buffer {
            ty,
            has_dynamic_offset,
            min_binding_size,
        } => wgpu::BindingType::Buffer {
            ty: *ty,
            has_dynamic_offset: *has_dynamic_offset,
            min_binding_size: NonZeroU64::new(*min_binding_size),
        },
        BindingLayoutIr::Sampler(ty) => wgpu::BindingType::Sampler(*ty),
        BindingLayoutIr::Texture {
            sample_type,
            view_dimension,
            multisampled,
        } => wgpu::BindingType::Texture {
            sample_type: *sample_type,
            view_dimension: view_dimension.unwrap_or(wgpu::TextureViewDimension::D2),
            multisampled: *multisampled,
        },
        BindingLayoutIr::StorageTexture {
            access,
            format,
            view_dimension,
        } => wgpu::BindingType::StorageTexture {
            access: *access,
            format: format.unwrap_or(wgpu::TextureFormat::Rgba8Unorm),
            view_dimension: view_dimension.unwrap_or(wgpu::TextureViewDimension::D2),
        },
    }
}

fn create_render_pipeline(
    gpu: &WebGpu,
    device: Handle,
    descriptor: &desc::RenderPipelineDesc,
) -> Result<wgpu::RenderPipeline, WebGpuError> {
    const NO_ATTRIBUTES: &[wgpu::VertexAttribute] = &[];

    let vertex_module = Rc::clone(gpu.shader_modules.get(descriptor.vertex.stage.module));
    let vertex_constants: HashMap<String, f64> =
        descriptor.vertex.stage.constants.iter().cloned().collect();

    // Hole slots keep their position so later buffers keep their indices.
    let vertex_buffers: Vec<wgpu::VertexBufferLayout<'_>> = descriptor
        .vertex
        .buffers
        .iter()
        .map(|slot| match slot {
            Some(ir) => wgpu::VertexBufferLayout {
                array_stride: ir.array_stride,
                step_mode: ir.step_mode,
                attributes: &ir.attributes,
            },
            None => wgpu::VertexBufferLayout {
                array_stride: 0,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: NO_ATTRIBUTES,
            },
        })
        .collect();

    let fragment_module = descriptor
        .fragment
        .as_ref()
        .map(|f| Rc::clone(gpu.shader_modules.get(f.stage.module)));
    let fragment_constants: HashMap<String, f64> = descriptor
        .fragment
        .as_ref()
        .map(|f| f.stage.constants.iter().cloned().collect())
        .unwrap_or_default();
    let fragment_targets: Vec<Option<wgpu::ColorTargetState>> = descriptor
        .fragment
        .as_ref()
        .map(|f| {
            f.targets
                .iter()
                .map(|target| {
                    target.as_ref().map(|t| wgpu::ColorTargetState {
                        format: t.format,
                        blend: t.blend,
                        write_mask: wgpu::ColorWrites::from_bits_truncate(t.write_mask),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let fragment = match (&descriptor.fragment, &fragment_module) {
        (Some(f), Some(module)) => Some(wgpu::FragmentState {
            module: &**module,
            entry_point: f.stage.entry_point.as_deref().unwrap_or("main"),
            compilation_options: wgpu::PipelineCompilationOptions {
                constants: &fragment_constants,
                ..Default::default()
            },
            targets: &fragment_targets,
        }),
        _ => None,
    };

    let pipeline = gpu
        .devices
        .get(device)
        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: descriptor.label.as_deref(),
            layout: descriptor.layout.map(|h| gpu.pipeline_layouts.get(h)),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: descriptor.vertex.stage.entry_point.as_deref().unwrap_or("main"),
                compilation_options: wgpu::PipelineCompilationOptions {
                    constants: &vertex_constants,
                    ..Default::default()
                },
                buffers: &vertex_buffers,
            },
            primitive: wgpu::PrimitiveState {
                topology: descriptor.primitive.topology,
                strip_index_format: descriptor.primitive.strip_index_format,
                front_face: descriptor.primitive.front_face,
                cull_mode: descriptor.primitive.cull_mode,
                unclipped_depth: descriptor.primitive.unclipped_depth,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: descriptor.depth_stencil.clone(),
            multisample: descriptor.multisample,
            fragment,
            multiview: None,
        });
    Ok(pipeline)
}
