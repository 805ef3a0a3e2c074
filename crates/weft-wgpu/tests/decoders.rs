//! Descriptor decode tests against hand-laid-out guest bytes.
//!
//! Offsets in these tests are written out explicitly for the 4-byte pointer
//! width, so they double as a layout contract: if the cursor arithmetic
//! drifts from the ABI, these fail.

use weft_mem::{MemView, PtrWidth, VecMemory};
use weft_wgpu::desc::{
    self, BindingLayoutIr, BindingResourceIr, CompilationMessageIr, STYPE_SHADER_MODULE_WGSL,
};
use weft_wgpu::{BumpAllocator, GuestAllocator};

fn mem() -> VecMemory {
    VecMemory::new(64 * 1024)
}

fn view(mem: &VecMemory) -> MemView<'_, VecMemory> {
    MemView::new(mem, PtrWidth::Four)
}

/// Writes a NUL-terminated string and returns its address.
fn cstr(v: &MemView<'_, VecMemory>, addr: u64, text: &str) -> u64 {
    let n = v.store_string(addr, text).unwrap();
    v.store_u8(addr + n as u64, 0).unwrap();
    addr
}

#[test]
fn buffer_descriptor_layout() {
    let mem = mem();
    let v = view(&mem);
    let label = cstr(&v, 0x400, "vertices");

    let base = 0x100;
    v.store_ptr(base, 0).unwrap(); // nextInChain
    v.store_ptr(base + 4, label).unwrap();
    v.store_u32(base + 8, 0x28).unwrap(); // usage: COPY_DST | VERTEX
    v.store_u64(base + 16, 1 << 40).unwrap();
    v.store_u32(base + 24, 1).unwrap(); // mappedAtCreation

    assert!(matches!(
        desc::buffer_descriptor(&v, 0),
        Err(weft_abi::DecodeError::NullDescriptor(_))
    ));

    let desc = desc::buffer_descriptor(&v, base).unwrap();
    assert_eq!(desc.label.as_deref(), Some("vertices"));
    assert_eq!(desc.usage, 0x28);
    assert_eq!(desc.size, 1 << 40);
    assert!(desc.mapped_at_creation);
}

#[test]
fn sampler_descriptor_null_is_default() {
    let mem = mem();
    let v = view(&mem);
    assert_eq!(desc::sampler_descriptor(&v, 0).unwrap(), None);

    let base = 0x100;
    v.store_ptr(base, 0).unwrap();
    v.store_ptr(base + 4, 0).unwrap(); // no label
    v.store_u32(base + 8, 0).unwrap(); // addressModeU: repeat
    v.store_u32(base + 12, 2).unwrap(); // addressModeV: clamp-to-edge
    v.store_u32(base + 16, 1).unwrap(); // addressModeW: mirror-repeat
    v.store_u32(base + 20, 1).unwrap(); // mag: linear
    v.store_u32(base + 24, 0).unwrap(); // min: nearest
    v.store_u32(base + 28, 1).unwrap(); // mipmap: linear
    v.store_f32(base + 32, 0.0).unwrap();
    v.store_f32(base + 36, 32.0).unwrap();
    v.store_u32(base + 40, 0).unwrap(); // compare: undefined
    v.store_u16(base + 44, 4).unwrap(); // maxAnisotropy

    let desc = desc::sampler_descriptor(&v, base).unwrap().unwrap();
    assert_eq!(desc.address_mode_v, wgpu::AddressMode::ClampToEdge);
    assert_eq!(desc.mag_filter, wgpu::FilterMode::Linear);
    assert_eq!(desc.min_filter, wgpu::FilterMode::Nearest);
    assert_eq!(desc.lod_max_clamp, 32.0);
    assert_eq!(desc.compare, None);
    assert_eq!(desc.max_anisotropy, 4);
}

#[test]
fn shader_module_follows_wgsl_chain() {
    let mem = mem();
    let v = view(&mem);
    let code = cstr(&v, 0x800, "@vertex fn main() {}");
    let label = cstr(&v, 0x900, "triangle shader");

    // Chained WGSL descriptor: header {next, sType}, then the code pointer.
    let chain = 0x200;
    v.store_ptr(chain, 0).unwrap();
    v.store_u32(chain + 4, STYPE_SHADER_MODULE_WGSL).unwrap();
    v.store_ptr(chain + 8, code).unwrap();

    let base = 0x100;
    v.store_ptr(base, chain).unwrap();
    v.store_ptr(base + 4, label).unwrap();

    let desc = desc::shader_module_descriptor(&v, base).unwrap();
    assert_eq!(desc.label.as_deref(), Some("triangle shader"));
    assert_eq!(desc.code, "@vertex fn main() {}");

    // A wrong chain tag is rejected, not guessed at.
    v.store_u32(chain + 4, 0x4).unwrap();
    assert!(matches!(
        desc::shader_module_descriptor(&v, base),
        Err(weft_abi::DecodeError::UnexpectedChainType { expected: 6, found: 4 })
    ));
}

#[test]
fn limits_all_ones_means_unspecified() {
    let mem = mem();
    let v = view(&mem);
    let block = 0x100;
    for off in (0u64..144).step_by(4) {
        v.store_u32(block + off, 0xffff_ffff).unwrap();
    }
    v.store_u32(block, 8192).unwrap(); // maxTextureDimension1D
    v.store_u64(block + 88, 1 << 33).unwrap(); // maxBufferSize
    // High word all-ones, low word not: a real (huge) value, not the
    // sentinel.
    v.store_u64(block + 56, 0xffff_ffff_0000_0000).unwrap();

    let limits = desc::decode_limits(&v, block).unwrap();
    assert_eq!(limits.max_texture_dimension_1d, Some(8192));
    assert_eq!(limits.max_texture_dimension_2d, None);
    assert_eq!(limits.max_buffer_size, Some(1 << 33));
    assert_eq!(
        limits.max_uniform_buffer_binding_size,
        Some(0xffff_ffff_0000_0000)
    );
    assert_eq!(limits.max_storage_buffer_binding_size, None);

    let applied = limits.apply_to(wgpu::Limits::default());
    assert_eq!(applied.max_texture_dimension_1d, 8192);
    assert_eq!(
        applied.max_texture_dimension_2d,
        wgpu::Limits::default().max_texture_dimension_2d
    );
    assert_eq!(applied.max_buffer_size, 1 << 33);
}

#[test]
fn encode_then_decode_limits_round_trips() {
    let mem = mem();
    let v = view(&mem);
    let limits = wgpu::Limits::default();
    desc::encode_limits(&v, 0x100, &limits).unwrap();

    let decoded = desc::decode_limits(&v, 0x100 + desc::LIMITS_BLOCK_OFFSET).unwrap();
    assert_eq!(
        decoded.max_texture_dimension_2d,
        Some(limits.max_texture_dimension_2d)
    );
    assert_eq!(decoded.max_buffer_size, Some(limits.max_buffer_size));
    assert_eq!(
        decoded.max_compute_workgroups_per_dimension,
        Some(limits.max_compute_workgroups_per_dimension)
    );
}

#[test]
fn device_descriptor_with_features_and_queue_label() {
    let mem = mem();
    let v = view(&mem);
    let label = cstr(&v, 0x800, "main device");
    let queue_label = cstr(&v, 0x900, "main queue");

    // Two required features: timestamp-query (3), shader-f16 (8).
    let features = 0x300;
    v.store_u32(features, 3).unwrap();
    v.store_u32(features + 4, 8).unwrap();

    let base = 0x100;
    v.store_ptr(base, 0).unwrap();
    v.store_ptr(base + 4, label).unwrap();
    v.store_uint(base + 8, 2).unwrap();
    v.store_ptr(base + 12, features).unwrap();
    v.store_ptr(base + 16, 0).unwrap(); // requiredLimits: none
    v.store_ptr(base + 20, 0).unwrap(); // defaultQueue.nextInChain
    v.store_ptr(base + 24, queue_label).unwrap();

    let desc = desc::device_descriptor(&v, base).unwrap();
    assert_eq!(desc.label.as_deref(), Some("main device"));
    assert!(desc.required_features.contains(wgpu::Features::TIMESTAMP_QUERY));
    assert!(desc.required_features.contains(wgpu::Features::SHADER_F16));
    assert_eq!(desc.required_limits, None);
    assert_eq!(desc.queue_label.as_deref(), Some("main queue"));

    // Null descriptor decodes to all defaults.
    let defaulted = desc::device_descriptor(&v, 0).unwrap();
    assert_eq!(defaulted, desc::DeviceDesc::default());
}

#[test]
fn bind_group_layout_entry_union_selection() {
    let mem = mem();
    let v = view(&mem);

    // Entry stride is 80; lay out three entries back to back.
    let entries = 0x200;
    let entry = |i: u64| entries + i * 80;

    // Entry 0: uniform buffer with dynamic offset and min size.
    v.store_u32(entry(0) + 4, 0).unwrap(); // binding
    v.store_u32(entry(0) + 8, 0x3).unwrap(); // visibility: vertex|fragment
    v.store_u32(entry(0) + 20, 1).unwrap(); // buffer.type: uniform
    v.store_u32(entry(0) + 24, 1).unwrap(); // buffer.hasDynamicOffset
    v.store_u64(entry(0) + 32, 256).unwrap(); // buffer.minBindingSize

    // Entry 1: comparison sampler.
    v.store_u32(entry(1) + 4, 1).unwrap();
    v.store_u32(entry(1) + 8, 0x2).unwrap();
    v.store_u32(entry(1) + 44, 3).unwrap(); // sampler.type: comparison

    // Entry 2: multisampled depth texture.
    v.store_u32(entry(2) + 4, 2).unwrap();
    v.store_u32(entry(2) + 8, 0x2).unwrap();
    v.store_u32(entry(2) + 52, 3).unwrap(); // texture.sampleType: depth
    v.store_u32(entry(2) + 56, 2).unwrap(); // texture.viewDimension: 2d
    v.store_u32(entry(2) + 60, 1).unwrap(); // texture.multisampled

    let base = 0x100;
    v.store_ptr(base, 0).unwrap();
    v.store_ptr(base + 4, 0).unwrap();
    v.store_uint(base + 8, 3).unwrap();
    v.store_ptr(base + 12, entries).unwrap();

    let desc = desc::bind_group_layout_descriptor(&v, base).unwrap();
    assert_eq!(desc.entries.len(), 3);

    assert_eq!(
        desc.entries[0].layout,
        Some(BindingLayoutIr::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: true,
            min_binding_size: 256,
        })
    );
    assert_eq!(
        desc.entries[1].layout,
        Some(BindingLayoutIr::Sampler(wgpu::SamplerBindingType::Comparison))
    );
    assert_eq!(
        desc.entries[2].layout,
        Some(BindingLayoutIr::Texture {
            sample_type: wgpu::TextureSampleType::Depth,
            view_dimension: Some(wgpu::TextureViewDimension::D2),
            multisampled: true,
        })
    );
}

#[test]
fn bind_group_entry_resource_union() {
    let mem = mem();
    let v = view(&mem);

    let entries = 0x200;
    // Entry 0: buffer binding with offset and WHOLE_SIZE.
    v.store_u32(entries + 4, 0).unwrap();
    v.store_ptr(entries + 8, 7).unwrap(); // buffer handle
    v.store_u64(entries + 16, 64).unwrap();
    v.store_u64(entries + 24, u64::MAX).unwrap();
    // Entry 1: texture view.
    v.store_u32(entries + 40 + 4, 1).unwrap();
    v.store_ptr(entries + 40 + 36, 9).unwrap();

    let base = 0x100;
    v.store_ptr(base, 0).unwrap();
    v.store_ptr(base + 4, 0).unwrap();
    v.store_ptr(base + 8, 3).unwrap(); // layout handle
    v.store_uint(base + 12, 2).unwrap();
    v.store_ptr(base + 16, entries).unwrap();

    let desc = desc::bind_group_descriptor(&v, base).unwrap();
    assert_eq!(desc.layout, 3);
    assert_eq!(
        desc.entries[0].resource,
        BindingResourceIr::Buffer {
            buffer: 7,
            offset: 64,
            size: u64::MAX,
        }
    );
    assert_eq!(desc.entries[1].resource, BindingResourceIr::TextureView(9));
}

#[test]
fn zero_count_arrays_ignore_null_bases() {
    let mem = mem();
    let v = view(&mem);

    let base = 0x100;
    v.store_ptr(base, 0).unwrap();
    v.store_ptr(base + 4, 0).unwrap();
    v.store_uint(base + 8, 0).unwrap(); // entryCount == 0
    v.store_ptr(base + 12, 0).unwrap(); // entries == null

    let desc = desc::bind_group_layout_descriptor(&v, base).unwrap();
    assert!(desc.entries.is_empty());

    let desc = desc::pipeline_layout_descriptor(&v, base).unwrap();
    assert!(desc.bind_group_layouts.is_empty());
}

#[test]
fn render_pipeline_descriptor_full_decode() {
    let mem = mem();
    let v = view(&mem);
    let entry_vs = cstr(&v, 0x800, "vs_main");
    let entry_fs = cstr(&v, 0x880, "fs_main");

    // Vertex attributes, stride 24.
    let attrs = 0x300;
    v.store_u32(attrs, 22).unwrap(); // float32x4
    v.store_u64(attrs + 8, 0).unwrap();
    v.store_u32(attrs + 16, 0).unwrap();
    v.store_u32(attrs + 24, 19).unwrap(); // float32
    v.store_u64(attrs + 32, 16).unwrap();
    v.store_u32(attrs + 40, 1).unwrap();

    // Two vertex buffer slots, stride 24: one used, one hole.
    let vbufs = 0x380;
    v.store_u64(vbufs, 20).unwrap(); // arrayStride
    v.store_u32(vbufs + 8, 0).unwrap(); // stepMode: vertex
    v.store_uint(vbufs + 12, 2).unwrap(); // attributeCount
    v.store_ptr(vbufs + 16, attrs).unwrap();
    v.store_u64(vbufs + 24, 0).unwrap();
    v.store_u32(vbufs + 32, 2).unwrap(); // stepMode: not used

    // Blend state pointee.
    let blend = 0x480;
    v.store_u32(blend, 0).unwrap(); // color.operation: add
    v.store_u32(blend + 4, 4).unwrap(); // color.src: src-alpha
    v.store_u32(blend + 8, 5).unwrap(); // color.dst: one-minus-src-alpha
    v.store_u32(blend + 12, 0).unwrap();
    v.store_u32(blend + 16, 1).unwrap(); // alpha.src: one
    v.store_u32(blend + 20, 0).unwrap(); // alpha.dst: zero

    // One color target, stride 16.
    let targets = 0x4c0;
    v.store_ptr(targets, 0).unwrap();
    v.store_u32(targets + 4, 23).unwrap(); // bgra8unorm
    v.store_ptr(targets + 8, blend).unwrap();
    v.store_u32(targets + 12, 0xF).unwrap(); // write mask: all

    // Fragment state pointee.
    let fragment = 0x500;
    v.store_ptr(fragment, 0).unwrap();
    v.store_ptr(fragment + 4, 12).unwrap(); // module handle
    v.store_ptr(fragment + 8, entry_fs).unwrap();
    v.store_uint(fragment + 12, 0).unwrap(); // constants
    v.store_ptr(fragment + 16, 0).unwrap();
    v.store_uint(fragment + 20, 1).unwrap(); // targetCount
    v.store_ptr(fragment + 24, targets).unwrap();

    // Root descriptor.
    let base = 0x100;
    v.store_ptr(base, 0).unwrap();
    v.store_ptr(base + 4, 0).unwrap(); // label
    v.store_ptr(base + 8, 4).unwrap(); // layout handle
    // vertex (inline at +12): nextInChain, module, entryPoint, constants,
    // buffers.
    v.store_ptr(base + 12, 0).unwrap();
    v.store_ptr(base + 16, 11).unwrap(); // module handle
    v.store_ptr(base + 20, entry_vs).unwrap();
    v.store_uint(base + 24, 0).unwrap();
    v.store_ptr(base + 28, 0).unwrap();
    v.store_uint(base + 32, 2).unwrap(); // bufferCount
    v.store_ptr(base + 36, vbufs).unwrap();
    // primitive (inline at +40).
    v.store_ptr(base + 40, 0).unwrap();
    v.store_u32(base + 44, 3).unwrap(); // triangle-list
    v.store_u32(base + 48, 0).unwrap(); // stripIndexFormat: undefined
    v.store_u32(base + 52, 0).unwrap(); // ccw
    v.store_u32(base + 56, 2).unwrap(); // cull back
    // depthStencil pointer (+60): none.
    v.store_ptr(base + 60, 0).unwrap();
    // multisample (inline at +64).
    v.store_ptr(base + 64, 0).unwrap();
    v.store_u32(base + 68, 1).unwrap(); // count
    v.store_u32(base + 72, 0xffff_ffff).unwrap(); // mask
    v.store_u32(base + 76, 0).unwrap();
    // fragment pointer (+80).
    v.store_ptr(base + 80, fragment).unwrap();

    let desc = desc::render_pipeline_descriptor(&v, base).unwrap();
    assert_eq!(desc.layout, Some(4));
    assert_eq!(desc.vertex.stage.module, 11);
    assert_eq!(desc.vertex.stage.entry_point.as_deref(), Some("vs_main"));
    assert_eq!(desc.vertex.buffers.len(), 2);
    let first = desc.vertex.buffers[0].as_ref().unwrap();
    assert_eq!(first.array_stride, 20);
    assert_eq!(first.attributes.len(), 2);
    assert_eq!(first.attributes[1].format, wgpu::VertexFormat::Float32);
    assert_eq!(first.attributes[1].offset, 16);
    assert!(desc.vertex.buffers[1].is_none());

    assert_eq!(desc.primitive.topology, wgpu::PrimitiveTopology::TriangleList);
    assert_eq!(desc.primitive.cull_mode, Some(wgpu::Face::Back));
    assert_eq!(desc.primitive.strip_index_format, None);
    assert!(desc.depth_stencil.is_none());
    assert_eq!(desc.multisample.count, 1);
    assert_eq!(desc.multisample.mask, 0xffff_ffff);

    let fragment = desc.fragment.unwrap();
    assert_eq!(fragment.stage.module, 12);
    assert_eq!(fragment.stage.entry_point.as_deref(), Some("fs_main"));
    let target = fragment.targets[0].as_ref().unwrap();
    assert_eq!(target.format, wgpu::TextureFormat::Bgra8Unorm);
    let blend = target.blend.unwrap();
    assert_eq!(blend.color.src_factor, wgpu::BlendFactor::SrcAlpha);
    assert_eq!(blend.alpha.src_factor, wgpu::BlendFactor::One);
}

#[test]
fn primitive_depth_clip_control_chain() {
    let mem = mem();
    let v = view(&mem);

    // Minimal pipeline descriptor with a chained primitive extension.
    let chain = 0x300;
    v.store_ptr(chain, 0).unwrap();
    v.store_u32(chain + 4, 7).unwrap(); // PrimitiveDepthClipControl
    v.store_u32(chain + 8, 1).unwrap(); // unclippedDepth

    let base = 0x100;
    v.store_ptr(base + 16, 1).unwrap(); // vertex module handle
    v.store_ptr(base + 40, chain).unwrap();
    v.store_u32(base + 44, 3).unwrap();

    let desc = desc::render_pipeline_descriptor(&v, base).unwrap();
    assert!(desc.primitive.unclipped_depth);
}

#[test]
fn render_pass_descriptor_null_view_slot() {
    let mem = mem();
    let v = view(&mem);

    // Two attachments, stride 56; the second has a null view.
    let attachments = 0x200;
    v.store_ptr(attachments + 4, 5).unwrap(); // view handle
    v.store_ptr(attachments + 8, 0).unwrap(); // no resolve target
    v.store_u32(attachments + 12, 1).unwrap(); // loadOp: clear
    v.store_u32(attachments + 16, 1).unwrap(); // storeOp: store
    v.store_f64(attachments + 24, 0.25).unwrap();
    v.store_f64(attachments + 32, 0.5).unwrap();
    v.store_f64(attachments + 40, 0.75).unwrap();
    v.store_f64(attachments + 48, 1.0).unwrap();

    let base = 0x100;
    v.store_ptr(base, 0).unwrap();
    v.store_ptr(base + 4, 0).unwrap();
    v.store_uint(base + 8, 2).unwrap();
    v.store_ptr(base + 12, attachments).unwrap();
    v.store_ptr(base + 16, 0).unwrap(); // no depth-stencil
    v.store_ptr(base + 20, 0).unwrap(); // no occlusion query set
    v.store_ptr(base + 24, 0).unwrap(); // no timestamp writes

    let desc = desc::render_pass_descriptor(&v, base).unwrap();
    assert_eq!(desc.color_attachments.len(), 2);
    let first = desc.color_attachments[0].as_ref().unwrap();
    assert_eq!(first.view, 5);
    assert_eq!(first.clear_value.r, 0.25);
    assert_eq!(first.clear_value.a, 1.0);
    assert!(desc.color_attachments[1].is_none());
    assert!(desc.depth_stencil_attachment.is_none());
}

#[test]
fn texture_view_count_sentinels() {
    let mem = mem();
    let v = view(&mem);
    let base = 0x100;
    v.store_u32(base + 8, 0).unwrap(); // format: undefined
    v.store_u32(base + 12, 0).unwrap(); // dimension: undefined
    v.store_u32(base + 16, 1).unwrap(); // baseMipLevel
    v.store_u32(base + 20, 0xffff_ffff).unwrap(); // mipLevelCount: undefined
    v.store_u32(base + 24, 0).unwrap();
    v.store_u32(base + 28, 2).unwrap(); // arrayLayerCount

    let desc = desc::texture_view_descriptor(&v, base).unwrap().unwrap();
    assert_eq!(desc.format, None);
    assert_eq!(desc.dimension, None);
    assert_eq!(desc.base_mip_level, 1);
    assert_eq!(desc.mip_level_count, None);
    assert_eq!(desc.array_layer_count, Some(2));
}

#[test]
fn data_layout_copy_stride_sentinel() {
    let mem = mem();
    let v = view(&mem);
    let base = 0x100;
    v.store_u64(base + 8, 512).unwrap(); // offset
    v.store_u32(base + 16, 0xffff_ffff).unwrap(); // bytesPerRow undefined
    v.store_u32(base + 20, 4).unwrap();

    let layout = desc::data_layout_at(&v, base).unwrap();
    assert_eq!(layout.offset, 512);
    assert_eq!(layout.bytes_per_row, None);
    assert_eq!(layout.rows_per_image, Some(4));
}

#[test]
fn image_copy_structs() {
    let mem = mem();
    let v = view(&mem);

    let tex = 0x100;
    v.store_ptr(tex + 4, 3).unwrap(); // texture handle
    v.store_u32(tex + 8, 2).unwrap(); // mip level
    v.store_u32(tex + 12, 4).unwrap(); // origin.x
    v.store_u32(tex + 16, 8).unwrap();
    v.store_u32(tex + 20, 0).unwrap();
    v.store_u32(tex + 24, 0).unwrap(); // aspect: all

    let copy = desc::image_copy_texture(&v, tex).unwrap();
    assert_eq!(copy.texture, 3);
    assert_eq!(copy.mip_level, 2);
    assert_eq!(copy.origin, wgpu::Origin3d { x: 4, y: 8, z: 0 });

    let buf = 0x200;
    v.store_u64(buf + 16, 256).unwrap(); // layout.offset
    v.store_u32(buf + 24, 1024).unwrap(); // bytesPerRow
    v.store_u32(buf + 28, 16).unwrap();
    v.store_ptr(buf + 32, 9).unwrap(); // buffer handle

    let copy = desc::image_copy_buffer(&v, buf).unwrap();
    assert_eq!(copy.buffer, 9);
    assert_eq!(copy.layout.offset, 256);
    assert_eq!(copy.layout.bytes_per_row, Some(1024));
}

#[test]
fn surface_configuration_layout() {
    let mem = mem();
    let v = view(&mem);
    let base = 0x100;
    v.store_ptr(base, 0).unwrap();
    v.store_ptr(base + 4, 2).unwrap(); // device handle
    v.store_u32(base + 8, 23).unwrap(); // bgra8unorm
    v.store_u32(base + 12, 0x10).unwrap(); // usage: RENDER_ATTACHMENT
    v.store_uint(base + 16, 0).unwrap(); // no view formats
    v.store_ptr(base + 20, 0).unwrap();
    v.store_u32(base + 24, 2).unwrap(); // alpha: premultiplied
    v.store_u32(base + 28, 800).unwrap();
    v.store_u32(base + 32, 600).unwrap();
    v.store_u32(base + 36, 0).unwrap(); // fifo

    let config = desc::surface_configuration(&v, base).unwrap();
    assert_eq!(config.device, 2);
    assert_eq!(config.format, Some(wgpu::TextureFormat::Bgra8Unorm));
    assert_eq!(config.alpha_mode, wgpu::CompositeAlphaMode::PreMultiplied);
    assert_eq!((config.width, config.height), (800, 600));
    assert_eq!(config.present_mode, wgpu::PresentMode::Fifo);
}

#[test]
fn compilation_info_encode_layout() {
    let mem = mem();
    let v = view(&mem);
    let allocator = BumpAllocator::new(0x1000, 0x4000);

    let messages = vec![
        CompilationMessageIr {
            message: "unknown identifier".to_owned(),
            kind: 1,
            line_num: 3,
            line_pos: 14,
            offset: 52,
            length: 7,
        },
        CompilationMessageIr {
            message: "unused variable".to_owned(),
            kind: 2,
            ..CompilationMessageIr::default()
        },
    ];

    let (ret_ptr, allocations) =
        desc::encode_compilation_info(&v, &allocator, &messages).unwrap();
    // Array + two strings + return struct.
    assert_eq!(allocations.len(), 4);

    let count = v.load_uint(ret_ptr + 4).unwrap();
    let array_ptr = v.load_ptr(ret_ptr + 8).unwrap();
    assert_eq!(count, 2);
    assert_ne!(array_ptr, 0);

    let msg_ptr = v.load_ptr(array_ptr + 4).unwrap();
    assert_eq!(
        v.load_cstring(msg_ptr).unwrap().as_deref(),
        Some("unknown identifier")
    );
    assert_eq!(v.load_u32(array_ptr + 8).unwrap(), 1);
    assert_eq!(v.load_u64(array_ptr + 16).unwrap(), 3);
    assert_eq!(v.load_u64(array_ptr + 24).unwrap(), 14);

    let second = array_ptr + 72;
    let msg_ptr = v.load_ptr(second + 4).unwrap();
    assert_eq!(
        v.load_cstring(msg_ptr).unwrap().as_deref(),
        Some("unused variable")
    );
    assert_eq!(v.load_u32(second + 8).unwrap(), 2);

    // Empty info still produces a return struct with a null array.
    let (ret_ptr, allocations) = desc::encode_compilation_info(&v, &allocator, &[]).unwrap();
    assert_eq!(allocations.len(), 1);
    assert_eq!(v.load_uint(ret_ptr + 4).unwrap(), 0);
    assert_eq!(v.load_ptr(ret_ptr + 8).unwrap(), 0);
}

#[test]
fn bump_allocator_returns_zero_when_exhausted() {
    let allocator = BumpAllocator::new(0x100, 0x140);
    assert_ne!(allocator.alloc(32), 0);
    assert_ne!(allocator.alloc(32), 0);
    assert_eq!(allocator.alloc(32), 0);
}
