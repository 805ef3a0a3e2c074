use std::rc::Rc;

use weft_handles::{Handle, HandleTable};

use crate::desc;
use crate::pass::{ComputeCmd, RenderCmd};

/// Allocation inside the guest's linear memory, provided by the module's
/// exported `wgpu_alloc`/`wgpu_free` pair. Returns 0 on exhaustion.
pub trait GuestAllocator {
    fn alloc(&self, size: u64) -> u64;
    fn free(&self, ptr: u64);
}

/// Staging copy of a mapped buffer range living in guest memory.
#[derive(Clone, Copy, Debug)]
pub struct Mapping {
    /// Guest address of the staging allocation.
    pub ptr: u64,
    /// Offset of the mapped range within the buffer.
    pub offset: u64,
    pub size: u64,
    /// Whether the staging bytes are copied back into the buffer on unmap.
    pub write: bool,
}

#[derive(Debug)]
pub struct BufferSlot {
    pub buffer: wgpu::Buffer,
    pub mapping: Option<Mapping>,
    /// Write access of the most recent mapping request. Buffers created
    /// mapped start writable.
    pub map_write: bool,
    /// A map request is in flight; a second request short-circuits with
    /// the already-pending status.
    pub map_pending: bool,
}

/// Recorded render pass; commands replay onto the parent encoder at `End`.
#[derive(Debug)]
pub struct RenderPassSlot {
    pub encoder: Handle,
    pub descriptor: desc::RenderPassDesc,
    pub commands: Vec<RenderCmd>,
    pub ended: bool,
}

#[derive(Debug)]
pub struct ComputePassSlot {
    pub encoder: Handle,
    pub descriptor: desc::ComputePassDesc,
    pub commands: Vec<ComputeCmd>,
    pub ended: bool,
}

/// Recorded render bundle; the real bundle encoder is created, replayed and
/// finished against the owning device at `Finish`.
#[derive(Debug)]
pub struct RenderBundleSlot {
    pub device: Handle,
    pub descriptor: desc::RenderBundleEncoderDesc,
    pub commands: Vec<RenderCmd>,
    pub finished: bool,
}

/// All per-category object tables plus the backing `wgpu` instance.
///
/// Command encoders and command buffers are stored as `Option`: `Finish` and
/// `Submit` consume the underlying object while the guest still holds the
/// handle until its `Release`. Objects that asynchronous operations call
/// into after settling (adapters, devices, queues, shader modules) are held
/// behind `Rc` so a spawned future can own them without keeping the tables
/// borrowed across an await.
pub struct WebGpu {
    pub backend: Rc<wgpu::Instance>,
    pub allocator: Rc<dyn GuestAllocator>,

    pub instances: HandleTable<()>,
    pub adapters: HandleTable<Rc<wgpu::Adapter>>,
    pub devices: HandleTable<Rc<wgpu::Device>>,
    pub queues: HandleTable<Rc<wgpu::Queue>>,
    pub buffers: HandleTable<BufferSlot>,
    pub textures: HandleTable<wgpu::Texture>,
    pub texture_views: HandleTable<wgpu::TextureView>,
    pub samplers: HandleTable<wgpu::Sampler>,
    pub bind_groups: HandleTable<wgpu::BindGroup>,
    pub bind_group_layouts: HandleTable<wgpu::BindGroupLayout>,
    pub pipeline_layouts: HandleTable<wgpu::PipelineLayout>,
    pub render_pipelines: HandleTable<wgpu::RenderPipeline>,
    pub compute_pipelines: HandleTable<wgpu::ComputePipeline>,
    pub shader_modules: HandleTable<Rc<wgpu::ShaderModule>>,
    pub command_encoders: HandleTable<Option<wgpu::CommandEncoder>>,
    pub command_buffers: HandleTable<Option<wgpu::CommandBuffer>>,
    pub render_pass_encoders: HandleTable<RenderPassSlot>,
    pub compute_pass_encoders: HandleTable<ComputePassSlot>,
    pub render_bundles: HandleTable<wgpu::RenderBundle>,
    pub render_bundle_encoders: HandleTable<RenderBundleSlot>,
    pub query_sets: HandleTable<wgpu::QuerySet>,
    /// Queue paired with each device at request time; `DeviceGetQueue`
    /// wraps it in a fresh handle per call.
    pub device_queues: std::collections::HashMap<Handle, Rc<wgpu::Queue>>,
    /// Guest callbacks registered through `SetUncapturedErrorCallback`;
    /// re-registration replaces (last wins).
    pub uncaptured_error_callbacks:
        std::collections::HashMap<Handle, crate::callback::GuestCallback>,
}

impl WebGpu {
    pub fn new(allocator: Rc<dyn GuestAllocator>) -> Self {
        Self::with_instance(wgpu::Instance::default(), allocator)
    }

    pub fn with_instance(backend: wgpu::Instance, allocator: Rc<dyn GuestAllocator>) -> Self {
        Self {
            backend: Rc::new(backend),
            allocator,
            instances: HandleTable::new("instance"),
            adapters: HandleTable::new("adapter"),
            devices: HandleTable::new("device"),
            queues: HandleTable::new("queue"),
            buffers: HandleTable::new("buffer"),
            textures: HandleTable::new("texture"),
            texture_views: HandleTable::new("texture view"),
            samplers: HandleTable::new("sampler"),
            bind_groups: HandleTable::new("bind group"),
            bind_group_layouts: HandleTable::new("bind group layout"),
            pipeline_layouts: HandleTable::new("pipeline layout"),
            render_pipelines: HandleTable::new("render pipeline"),
            compute_pipelines: HandleTable::new("compute pipeline"),
            shader_modules: HandleTable::new("shader module"),
            command_encoders: HandleTable::new("command encoder"),
            command_buffers: HandleTable::new("command buffer"),
            render_pass_encoders: HandleTable::new("render pass encoder"),
            compute_pass_encoders: HandleTable::new("compute pass encoder"),
            render_bundles: HandleTable::new("render bundle"),
            render_bundle_encoders: HandleTable::new("render bundle encoder"),
            query_sets: HandleTable::new("query set"),
            device_queues: std::collections::HashMap::new(),
            uncaptured_error_callbacks: std::collections::HashMap::new(),
        }
    }
}

/// Immutable views of the tables a pass replay resolves against, split out
/// so the parent command encoder can stay mutably borrowed alongside.
pub struct PassResources<'a> {
    pub texture_views: &'a HandleTable<wgpu::TextureView>,
    pub query_sets: &'a HandleTable<wgpu::QuerySet>,
    pub render_pipelines: &'a HandleTable<wgpu::RenderPipeline>,
    pub compute_pipelines: &'a HandleTable<wgpu::ComputePipeline>,
    pub bind_groups: &'a HandleTable<wgpu::BindGroup>,
    pub buffers: &'a HandleTable<BufferSlot>,
    pub render_bundles: &'a HandleTable<wgpu::RenderBundle>,
}

impl<'a> PassResources<'a> {
    pub fn split(gpu: &'a WebGpu) -> Self {
        Self {
            texture_views: &gpu.texture_views,
            query_sets: &gpu.query_sets,
            render_pipelines: &gpu.render_pipelines,
            compute_pipelines: &gpu.compute_pipelines,
            bind_groups: &gpu.bind_groups,
            buffers: &gpu.buffers,
            render_bundles: &gpu.render_bundles,
        }
    }
}

/// Bump allocator over a reserved guest region, for native embedders and
/// tests. Frees are dropped; the region is reset wholesale.
#[derive(Debug)]
pub struct BumpAllocator {
    next: std::cell::Cell<u64>,
    end: u64,
}

impl BumpAllocator {
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            next: std::cell::Cell::new(start),
            end,
        }
    }
}

impl GuestAllocator for BumpAllocator {
    fn alloc(&self, size: u64) -> u64 {
        let ptr = self.next.get().next_multiple_of(8);
        if ptr + size > self.end {
            return 0;
        }
        self.next.set(ptr + size);
        ptr
    }

    fn free(&self, _ptr: u64) {}
}
