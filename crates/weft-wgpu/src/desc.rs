//! Guest descriptor layouts.
//!
//! Each decoder reconstructs an owned, host-side descriptor from the byte
//! layout the guest compiler emits, via the width-generic cursor. Decoded
//! descriptors reference other objects by handle; resolution against the
//! live tables happens at the call site, so decoding itself never touches
//! the GPU.

use weft_abi::{Cursor, DecodeError, Writer, decode_array, limit_u32, limit_u64, read_chained};
use weft_handles::Handle;
use weft_mem::{MemView, PtrWidth, WasmMemory};

use crate::enums;
use crate::enums::{LoadOpCode, StepModeCode};

/// Chained struct-type tags the decoders accept.
pub const STYPE_SURFACE_DESCRIPTOR_FROM_CANVAS: u32 = 0x4;
pub const STYPE_SHADER_MODULE_WGSL: u32 = 0x6;
pub const STYPE_PRIMITIVE_DEPTH_CLIP_CONTROL: u32 = 0x7;

fn align8(value: u64) -> u64 {
    value.next_multiple_of(8)
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BufferDesc {
    pub label: Option<String>,
    pub usage: u32,
    pub size: u64,
    pub mapped_at_creation: bool,
}

pub fn buffer_descriptor<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<BufferDesc, DecodeError> {
    if ptr == 0 {
        return Err(DecodeError::NullDescriptor("BufferDescriptor"));
    }
    let mut cur = Cursor::new(view, ptr);
    cur.read_ptr()?; // nextInChain
    let label = cur.read_cstring()?;
    let usage = cur.read_u32()?;
    let size = cur.read_u64()?;
    let mapped_at_creation = cur.read_b32()?;
    Ok(BufferDesc {
        label,
        usage,
        size,
        mapped_at_creation,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextureDesc {
    pub label: Option<String>,
    pub usage: u32,
    pub dimension: wgpu::TextureDimension,
    pub size: wgpu::Extent3d,
    pub format: Option<wgpu::TextureFormat>,
    pub mip_level_count: u32,
    pub sample_count: u32,
    pub view_formats: Vec<wgpu::TextureFormat>,
}

pub fn texture_descriptor<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<TextureDesc, DecodeError> {
    if ptr == 0 {
        return Err(DecodeError::NullDescriptor("TextureDescriptor"));
    }
    let mut cur = Cursor::new(view, ptr);
    cur.read_ptr()?;
    let label = cur.read_cstring()?;
    let usage = cur.read_u32()?;
    let dimension = enums::texture_dimension(cur.read_u32()?)?;
    let size = extent_3d(&mut cur)?;
    let format = enums::texture_format(cur.read_u32()?)?;
    let mip_level_count = cur.read_u32()?;
    let sample_count = cur.read_u32()?;
    let (count, base) = cur.read_array_header()?;
    let view_formats = decode_array(count, base, 4, |addr| {
        Ok(enums::texture_format(view.load_u32(addr)?)?)
    })?
    .into_iter()
    .flatten()
    .collect();
    Ok(TextureDesc {
        label,
        usage,
        dimension,
        size,
        format,
        mip_level_count,
        sample_count,
        view_formats,
    })
}

fn extent_3d<M: WasmMemory + ?Sized>(
    cur: &mut Cursor<'_, '_, M>,
) -> Result<wgpu::Extent3d, DecodeError> {
    Ok(wgpu::Extent3d {
        width: cur.read_u32()?,
        height: cur.read_u32()?,
        depth_or_array_layers: cur.read_u32()?,
    })
}

pub fn extent_3d_at<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<wgpu::Extent3d, DecodeError> {
    let mut cur = Cursor::new(view, ptr);
    extent_3d(&mut cur)
}

fn origin_3d<M: WasmMemory + ?Sized>(
    cur: &mut Cursor<'_, '_, M>,
) -> Result<wgpu::Origin3d, DecodeError> {
    Ok(wgpu::Origin3d {
        x: cur.read_u32()?,
        y: cur.read_u32()?,
        z: cur.read_u32()?,
    })
}

fn color<M: WasmMemory + ?Sized>(
    cur: &mut Cursor<'_, '_, M>,
) -> Result<wgpu::Color, DecodeError> {
    Ok(wgpu::Color {
        r: cur.read_f64()?,
        g: cur.read_f64()?,
        b: cur.read_f64()?,
        a: cur.read_f64()?,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct SamplerDesc {
    pub label: Option<String>,
    pub address_mode_u: wgpu::AddressMode,
    pub address_mode_v: wgpu::AddressMode,
    pub address_mode_w: wgpu::AddressMode,
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
    pub mipmap_filter: wgpu::FilterMode,
    pub lod_min_clamp: f32,
    pub lod_max_clamp: f32,
    pub compare: Option<wgpu::CompareFunction>,
    pub max_anisotropy: u16,
}

pub fn sampler_descriptor<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<Option<SamplerDesc>, DecodeError> {
    if ptr == 0 {
        return Ok(None);
    }
    let mut cur = Cursor::new(view, ptr);
    cur.read_ptr()?;
    Ok(Some(SamplerDesc {
        label: cur.read_cstring()?,
        address_mode_u: enums::address_mode(cur.read_u32()?)?,
        address_mode_v: enums::address_mode(cur.read_u32()?)?,
        address_mode_w: enums::address_mode(cur.read_u32()?)?,
        mag_filter: enums::filter_mode(cur.read_u32()?)?,
        min_filter: enums::filter_mode(cur.read_u32()?)?,
        mipmap_filter: enums::filter_mode(cur.read_u32()?)?,
        lod_min_clamp: cur.read_f32()?,
        lod_max_clamp: cur.read_f32()?,
        compare: enums::compare_function(cur.read_u32()?)?,
        max_anisotropy: cur.read_u16()?,
    }))
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShaderModuleDesc {
    pub label: Option<String>,
    /// WGSL source carried by the chained descriptor.
    pub code: String,
}

pub fn shader_module_descriptor<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<ShaderModuleDesc, DecodeError> {
    if ptr == 0 {
        return Err(DecodeError::NullDescriptor("ShaderModuleDescriptor"));
    }
    let chained = read_chained(view, ptr)?
        .ok_or(DecodeError::NullDescriptor("ShaderModuleWGSLDescriptor"))?
        .expect(STYPE_SHADER_MODULE_WGSL)?;
    let code = view
        .load_cstring(view.load_ptr(chained.payload)?)?
        .unwrap_or_default();

    let mut cur = Cursor::new(view, ptr);
    cur.read_ptr()?;
    let label = cur.read_cstring()?;
    Ok(ShaderModuleDesc { label, code })
}

#[derive(Clone, Debug, PartialEq)]
pub enum BindingLayoutIr {
    Buffer {
        ty: wgpu::BufferBindingType,
        has_dynamic_offset: bool,
        min_binding_size: u64,
    },
    Sampler(wgpu::SamplerBindingType),
    Texture {
        sample_type: wgpu::TextureSampleType,
        view_dimension: Option<wgpu::TextureViewDimension>,
        multisampled: bool,
    },
    StorageTexture {
        access: wgpu::StorageTextureAccess,
        format: Option<wgpu::TextureFormat>,
        view_dimension: Option<wgpu::TextureViewDimension>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct BindGroupLayoutEntryIr {
    pub binding: u32,
    pub visibility: u32,
    pub layout: Option<BindingLayoutIr>,
}

/// The entry is a union-of-optionals: whichever member decodes to a defined
/// type wins, matching the "unset members have their type at the undefined
/// slot" convention.
fn bind_group_layout_entry<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    base: u64,
) -> Result<BindGroupLayoutEntryIr, DecodeError> {
    let mut cur = Cursor::new(view, base);
    cur.read_ptr()?;
    let binding = cur.read_u32()?;
    let visibility = cur.read_u32()?;

    // buffer member
    cur.align_to(8);
    cur.read_ptr()?;
    let buffer_ty = enums::buffer_binding_type(cur.read_u32()?)?;
    let has_dynamic_offset = cur.read_b32()?;
    let min_binding_size = cur.read_u64()?;

    // sampler member
    cur.read_ptr()?;
    let sampler_ty = enums::sampler_binding_type(cur.read_u32()?)?;

    // texture member
    cur.read_ptr()?;
    let sample_type = enums::texture_sample_type(cur.read_u32()?)?;
    let texture_view_dimension = enums::texture_view_dimension(cur.read_u32()?)?;
    let multisampled = cur.read_b32()?;

    // storage texture member
    cur.read_ptr()?;
    let access = enums::storage_texture_access(cur.read_u32()?)?;
    let storage_format = enums::texture_format(cur.read_u32()?)?;
    let storage_view_dimension = enums::texture_view_dimension(cur.read_u32()?)?;

    let layout = if let Some(ty) = buffer_ty {
        Some(BindingLayoutIr::Buffer {
            ty,
            has_dynamic_offset,
            min_binding_size,
        })
    } else if let Some(ty) = sampler_ty {
        Some(BindingLayoutIr::Sampler(ty))
    } else if let Some(sample_type) = sample_type {
        Some(BindingLayoutIr::Texture {
            sample_type,
            view_dimension: texture_view_dimension,
            multisampled,
        })
    } else {
        access.map(|access| BindingLayoutIr::StorageTexture {
            access,
            format: storage_format,
            view_dimension: storage_view_dimension,
        })
    };

    Ok(BindGroupLayoutEntryIr {
        binding,
        visibility,
        layout,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct BindGroupLayoutDesc {
    pub label: Option<String>,
    pub entries: Vec<BindGroupLayoutEntryIr>,
}

pub fn bind_group_layout_descriptor<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<BindGroupLayoutDesc, DecodeError> {
    if ptr == 0 {
        return Err(DecodeError::NullDescriptor("BindGroupLayoutDescriptor"));
    }
    let entry_stride = match view.ptr_width() {
        PtrWidth::Four => 80,
        PtrWidth::Eight => 104,
    };
    let mut cur = Cursor::new(view, ptr);
    cur.read_ptr()?;
    let label = cur.read_cstring()?;
    let (count, base) = cur.read_array_header()?;
    let entries = decode_array(count, base, entry_stride, |addr| {
        bind_group_layout_entry(view, addr)
    })?;
    Ok(BindGroupLayoutDesc { label, entries })
}

#[derive(Clone, Debug, PartialEq)]
pub enum BindingResourceIr {
    Buffer {
        buffer: Handle,
        offset: u64,
        size: u64,
    },
    Sampler(Handle),
    TextureView(Handle),
    /// No member set; surfaces as a validation failure at realization.
    Empty,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BindGroupEntryIr {
    pub binding: u32,
    pub resource: BindingResourceIr,
}

fn bind_group_entry<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    base: u64,
) -> Result<BindGroupEntryIr, DecodeError> {
    let mut cur = Cursor::new(view, base);
    cur.read_ptr()?;
    let binding = cur.read_u32()?;
    cur.align_to(8);
    let buffer = cur.read_ptr()? as Handle;
    let offset = cur.read_u64()?;
    let size = cur.read_u64()?;
    let sampler = cur.read_ptr()? as Handle;
    let texture_view = cur.read_ptr()? as Handle;

    let resource = if buffer != 0 {
        BindingResourceIr::Buffer {
            buffer,
            offset,
            size,
        }
    } else if sampler != 0 {
        BindingResourceIr::Sampler(sampler)
    } else if texture_view != 0 {
        BindingResourceIr::TextureView(texture_view)
    } else {
        BindingResourceIr::Empty
    };

    Ok(BindGroupEntryIr { binding, resource })
}

#[derive(Clone, Debug, PartialEq)]
pub struct BindGroupDesc {
    pub label: Option<String>,
    pub layout: Handle,
    pub entries: Vec<BindGroupEntryIr>,
}

pub fn bind_group_descriptor<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<BindGroupDesc, DecodeError> {
    if ptr == 0 {
        return Err(DecodeError::NullDescriptor("BindGroupDescriptor"));
    }
    let entry_stride = match view.ptr_width() {
        PtrWidth::Four => 40,
        PtrWidth::Eight => 56,
    };

    let mut cur = Cursor::new(view, ptr);
    cur.read_ptr()?;
    let label = cur.read_cstring()?;
    let layout = cur.read_ptr()? as Handle;
    let (count, base) = cur.read_array_header()?;
    let entries = decode_array(count, base, entry_stride, |addr| {
        bind_group_entry(view, addr)
    })?;
    Ok(BindGroupDesc {
        label,
        layout,
        entries,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineLayoutDesc {
    pub label: Option<String>,
    pub bind_group_layouts: Vec<Handle>,
}

pub fn pipeline_layout_descriptor<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<PipelineLayoutDesc, DecodeError> {
    if ptr == 0 {
        return Err(DecodeError::NullDescriptor("PipelineLayoutDescriptor"));
    }
    let w = view.ptr_width().size();
    let mut cur = Cursor::new(view, ptr);
    cur.read_ptr()?;
    let label = cur.read_cstring()?;
    let (count, base) = cur.read_array_header()?;
    let bind_group_layouts =
        decode_array(count, base, w, |addr| Ok(view.load_ptr(addr)? as Handle))?;
    Ok(PipelineLayoutDesc {
        label,
        bind_group_layouts,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProgrammableStageIr {
    pub module: Handle,
    pub entry_point: Option<String>,
    pub constants: Vec<(String, f64)>,
}

fn constant_entry<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    base: u64,
) -> Result<(String, f64), DecodeError> {
    let mut cur = Cursor::new(view, base);
    cur.read_ptr()?;
    let key = cur.read_cstring()?.unwrap_or_default();
    let value = cur.read_f64()?;
    Ok((key, value))
}

fn programmable_stage<M: WasmMemory + ?Sized>(
    cur: &mut Cursor<'_, '_, M>,
) -> Result<ProgrammableStageIr, DecodeError> {
    let view = cur.view();
    let w = view.ptr_width().size();
    let constant_stride = align8(2 * w + 8);

    cur.read_ptr()?;
    let module = cur.read_ptr()? as Handle;
    let entry_point = cur.read_cstring()?;
    let (count, base) = cur.read_array_header()?;
    let constants = decode_array(count, base, constant_stride, |addr| {
        constant_entry(view, addr)
    })?;
    Ok(ProgrammableStageIr {
        module,
        entry_point,
        constants,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct ComputePipelineDesc {
    pub label: Option<String>,
    pub layout: Option<Handle>,
    pub stage: ProgrammableStageIr,
}

pub fn compute_pipeline_descriptor<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<ComputePipelineDesc, DecodeError> {
    if ptr == 0 {
        return Err(DecodeError::NullDescriptor("ComputePipelineDescriptor"));
    }
    let mut cur = Cursor::new(view, ptr);
    cur.read_ptr()?;
    let label = cur.read_cstring()?;
    let layout = cur.read_opt_ptr()?.map(|p| p as Handle);
    let stage = programmable_stage(&mut cur)?;
    Ok(ComputePipelineDesc {
        label,
        layout,
        stage,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct VertexBufferLayoutIr {
    pub array_stride: u64,
    pub step_mode: wgpu::VertexStepMode,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

fn vertex_attribute<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    base: u64,
) -> Result<wgpu::VertexAttribute, DecodeError> {
    let mut cur = Cursor::new(view, base);
    let format = enums::vertex_format(cur.read_u32()?)?.ok_or(DecodeError::UnknownEnum {
        name: "VertexFormat",
        value: 0,
    })?;
    let offset = cur.read_u64()?;
    let shader_location = cur.read_u32()?;
    Ok(wgpu::VertexAttribute {
        format,
        offset,
        shader_location,
    })
}

/// A hole in the vertex buffer list (step mode "not used") decodes to
/// `None`.
fn vertex_buffer_layout<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    base: u64,
) -> Result<Option<VertexBufferLayoutIr>, DecodeError> {
    let mut cur = Cursor::new(view, base);
    let array_stride = cur.read_u64()?;
    let step_mode = match enums::vertex_step_mode(cur.read_u32()?)? {
        StepModeCode::NotUsed => return Ok(None),
        StepModeCode::Used(mode) => mode,
    };
    let (count, attrs_base) = cur.read_array_header()?;
    let attributes = decode_array(count, attrs_base, 24, |addr| vertex_attribute(view, addr))?;
    Ok(Some(VertexBufferLayoutIr {
        array_stride,
        step_mode,
        attributes,
    }))
}

#[derive(Clone, Debug, PartialEq)]
pub struct VertexStateIr {
    pub stage: ProgrammableStageIr,
    pub buffers: Vec<Option<VertexBufferLayoutIr>>,
}

fn vertex_state<M: WasmMemory + ?Sized>(
    cur: &mut Cursor<'_, '_, M>,
) -> Result<VertexStateIr, DecodeError> {
    let view = cur.view();
    let w = view.ptr_width().size();
    let buffer_stride = align8(8 + 4 + 2 * w);

    let stage = programmable_stage(cur)?;
    let (count, base) = cur.read_array_header()?;
    let buffers = decode_array(count, base, buffer_stride, |addr| {
        vertex_buffer_layout(view, addr)
    })?;
    Ok(VertexStateIr { stage, buffers })
}

fn stencil_face_state<M: WasmMemory + ?Sized>(
    cur: &mut Cursor<'_, '_, M>,
) -> Result<wgpu::StencilFaceState, DecodeError> {
    Ok(wgpu::StencilFaceState {
        compare: enums::compare_function(cur.read_u32()?)?.unwrap_or(wgpu::CompareFunction::Always),
        fail_op: enums::stencil_operation(cur.read_u32()?)?,
        depth_fail_op: enums::stencil_operation(cur.read_u32()?)?,
        pass_op: enums::stencil_operation(cur.read_u32()?)?,
    })
}

fn depth_stencil_state<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<Option<wgpu::DepthStencilState>, DecodeError> {
    let base = view.load_ptr(ptr)?;
    if base == 0 {
        return Ok(None);
    }
    let mut cur = Cursor::new(view, base);
    cur.read_ptr()?;
    let format = enums::texture_format(cur.read_u32()?)?.ok_or(DecodeError::UnknownEnum {
        name: "TextureFormat",
        value: 0,
    })?;
    let depth_write_enabled = cur.read_b32()?;
    let depth_compare =
        enums::compare_function(cur.read_u32()?)?.unwrap_or(wgpu::CompareFunction::Always);
    let front = stencil_face_state(&mut cur)?;
    let back = stencil_face_state(&mut cur)?;
    let read_mask = cur.read_u32()?;
    let write_mask = cur.read_u32()?;
    let constant = cur.read_i32()?;
    let slope_scale = cur.read_f32()?;
    let clamp = cur.read_f32()?;

    Ok(Some(wgpu::DepthStencilState {
        format,
        depth_write_enabled,
        depth_compare,
        stencil: wgpu::StencilState {
            front,
            back,
            read_mask,
            write_mask,
        },
        bias: wgpu::DepthBiasState {
            constant,
            slope_scale,
            clamp,
        },
    }))
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrimitiveStateIr {
    pub topology: wgpu::PrimitiveTopology,
    pub strip_index_format: Option<wgpu::IndexFormat>,
    pub front_face: wgpu::FrontFace,
    pub cull_mode: Option<wgpu::Face>,
    pub unclipped_depth: bool,
}

fn primitive_state<M: WasmMemory + ?Sized>(
    cur: &mut Cursor<'_, '_, M>,
) -> Result<PrimitiveStateIr, DecodeError> {
    let view = cur.view();
    cur.align_to(view.ptr_width().size());
    let chain_addr = cur.offset();
    // Only the depth-clip-control extension is recognized here.
    let mut unclipped_depth = false;
    if let Some(chained) = read_chained(view, chain_addr)? {
        if chained.stype == STYPE_PRIMITIVE_DEPTH_CLIP_CONTROL {
            unclipped_depth = view.load_b32(chained.payload)?;
        }
    }
    cur.read_ptr()?;

    Ok(PrimitiveStateIr {
        topology: enums::primitive_topology(cur.read_u32()?)?,
        strip_index_format: enums::index_format(cur.read_u32()?)?,
        front_face: enums::front_face(cur.read_u32()?)?,
        cull_mode: enums::cull_mode(cur.read_u32()?)?,
        unclipped_depth,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColorTargetIr {
    pub format: wgpu::TextureFormat,
    pub blend: Option<wgpu::BlendState>,
    pub write_mask: u32,
}

fn blend_component<M: WasmMemory + ?Sized>(
    cur: &mut Cursor<'_, '_, M>,
) -> Result<wgpu::BlendComponent, DecodeError> {
    Ok(wgpu::BlendComponent {
        operation: enums::blend_operation(cur.read_u32()?)?,
        src_factor: enums::blend_factor(cur.read_u32()?)?,
        dst_factor: enums::blend_factor(cur.read_u32()?)?,
    })
}

fn blend_state_ptr<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<Option<wgpu::BlendState>, DecodeError> {
    let base = view.load_ptr(ptr)?;
    if base == 0 {
        return Ok(None);
    }
    let mut cur = Cursor::new(view, base);
    let color = blend_component(&mut cur)?;
    let alpha = blend_component(&mut cur)?;
    Ok(Some(wgpu::BlendState { color, alpha }))
}

/// Color target with the undefined format decodes to `None` (unused slot).
fn color_target<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    base: u64,
) -> Result<Option<ColorTargetIr>, DecodeError> {
    let mut cur = Cursor::new(view, base);
    cur.read_ptr()?;
    let format = enums::texture_format(cur.read_u32()?)?;
    let blend_field = cur.field(view.ptr_width().size(), view.ptr_width().size());
    let blend = blend_state_ptr(view, blend_field)?;
    let write_mask = cur.read_u32()?;
    Ok(format.map(|format| ColorTargetIr {
        format,
        blend,
        write_mask,
    }))
}

#[derive(Clone, Debug, PartialEq)]
pub struct FragmentStateIr {
    pub stage: ProgrammableStageIr,
    pub targets: Vec<Option<ColorTargetIr>>,
}

fn fragment_state<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<Option<FragmentStateIr>, DecodeError> {
    let base = view.load_ptr(ptr)?;
    if base == 0 {
        return Ok(None);
    }
    let target_stride = match view.ptr_width() {
        PtrWidth::Four => 16,
        PtrWidth::Eight => 32,
    };

    let mut cur = Cursor::new(view, base);
    let stage = programmable_stage(&mut cur)?;
    let (count, targets_base) = cur.read_array_header()?;
    let targets = decode_array(count, targets_base, target_stride, |addr| {
        color_target(view, addr)
    })?;
    Ok(Some(FragmentStateIr { stage, targets }))
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderPipelineDesc {
    pub label: Option<String>,
    pub layout: Option<Handle>,
    pub vertex: VertexStateIr,
    pub primitive: PrimitiveStateIr,
    pub depth_stencil: Option<wgpu::DepthStencilState>,
    pub multisample: wgpu::MultisampleState,
    pub fragment: Option<FragmentStateIr>,
}

pub fn render_pipeline_descriptor<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<RenderPipelineDesc, DecodeError> {
    if ptr == 0 {
        return Err(DecodeError::NullDescriptor("RenderPipelineDescriptor"));
    }
    let mut cur = Cursor::new(view, ptr);
    cur.read_ptr()?;
    let label = cur.read_cstring()?;
    let layout = cur.read_opt_ptr()?.map(|p| p as Handle);
    let vertex = vertex_state(&mut cur)?;
    let primitive = primitive_state(&mut cur)?;
    let ds_field = cur.field(view.ptr_width().size(), view.ptr_width().size());
    let depth_stencil = depth_stencil_state(view, ds_field)?;

    cur.read_ptr()?; // multisample nextInChain
    let multisample = wgpu::MultisampleState {
        count: cur.read_u32()?,
        mask: cur.read_u32()? as u64,
        alpha_to_coverage_enabled: cur.read_b32()?,
    };

    let frag_field = cur.field(view.ptr_width().size(), view.ptr_width().size());
    let fragment = fragment_state(view, frag_field)?;

    Ok(RenderPipelineDesc {
        label,
        layout,
        vertex,
        primitive,
        depth_stencil,
        multisample,
        fragment,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColorAttachmentIr {
    pub view: Handle,
    pub resolve_target: Option<Handle>,
    pub load: Option<LoadOpCode>,
    pub store: Option<wgpu::StoreOp>,
    pub clear_value: wgpu::Color,
}

fn color_attachment<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    base: u64,
) -> Result<Option<ColorAttachmentIr>, DecodeError> {
    let mut cur = Cursor::new(view, base);
    cur.read_ptr()?;
    let view_handle = cur.read_ptr()? as Handle;
    let resolve_target = cur.read_opt_ptr()?.map(|p| p as Handle);
    let load = enums::load_op(cur.read_u32()?)?;
    let store = enums::store_op(cur.read_u32()?)?;
    cur.align_to(8);
    let clear_value = color(&mut cur)?;

    if view_handle == 0 {
        return Ok(None);
    }
    Ok(Some(ColorAttachmentIr {
        view: view_handle,
        resolve_target,
        load,
        store,
        clear_value,
    }))
}

#[derive(Clone, Debug, PartialEq)]
pub struct DepthStencilAttachmentIr {
    pub view: Handle,
    pub depth_load: Option<LoadOpCode>,
    pub depth_store: Option<wgpu::StoreOp>,
    pub depth_clear_value: f32,
    pub depth_read_only: bool,
    pub stencil_load: Option<LoadOpCode>,
    pub stencil_store: Option<wgpu::StoreOp>,
    pub stencil_clear_value: u32,
    pub stencil_read_only: bool,
}

fn depth_stencil_attachment<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<Option<DepthStencilAttachmentIr>, DecodeError> {
    let base = view.load_ptr(ptr)?;
    if base == 0 {
        return Ok(None);
    }
    let mut cur = Cursor::new(view, base);
    Ok(Some(DepthStencilAttachmentIr {
        view: cur.read_ptr()? as Handle,
        depth_load: enums::load_op(cur.read_u32()?)?,
        depth_store: enums::store_op(cur.read_u32()?)?,
        depth_clear_value: cur.read_f32()?,
        depth_read_only: cur.read_b32()?,
        stencil_load: enums::load_op(cur.read_u32()?)?,
        stencil_store: enums::store_op(cur.read_u32()?)?,
        stencil_clear_value: cur.read_u32()?,
        stencil_read_only: cur.read_b32()?,
    }))
}

#[derive(Clone, Debug, PartialEq)]
pub struct TimestampWritesIr {
    pub query_set: Handle,
    pub beginning_of_pass_write_index: Option<u32>,
    pub end_of_pass_write_index: Option<u32>,
}

fn timestamp_writes<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<Option<TimestampWritesIr>, DecodeError> {
    let base = view.load_ptr(ptr)?;
    if base == 0 {
        return Ok(None);
    }
    let mut cur = Cursor::new(view, base);
    Ok(Some(TimestampWritesIr {
        query_set: cur.read_ptr()? as Handle,
        beginning_of_pass_write_index: limit_u32(cur.read_u32()?),
        end_of_pass_write_index: limit_u32(cur.read_u32()?),
    }))
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderPassDesc {
    pub label: Option<String>,
    pub color_attachments: Vec<Option<ColorAttachmentIr>>,
    pub depth_stencil_attachment: Option<DepthStencilAttachmentIr>,
    pub occlusion_query_set: Option<Handle>,
    pub timestamp_writes: Option<TimestampWritesIr>,
}

pub fn render_pass_descriptor<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<RenderPassDesc, DecodeError> {
    if ptr == 0 {
        return Err(DecodeError::NullDescriptor("RenderPassDescriptor"));
    }
    let w = view.ptr_width().size();
    let attachment_stride = match view.ptr_width() {
        PtrWidth::Four => 56,
        PtrWidth::Eight => 64,
    };

    let mut cur = Cursor::new(view, ptr);
    cur.read_ptr()?;
    let label = cur.read_cstring()?;
    let (count, base) = cur.read_array_header()?;
    let color_attachments = decode_array(count, base, attachment_stride, |addr| {
        color_attachment(view, addr)
    })?;
    let ds_field = cur.field(w, w);
    let depth_stencil_attachment = depth_stencil_attachment(view, ds_field)?;
    let occlusion_query_set = cur.read_opt_ptr()?.map(|p| p as Handle);
    let ts_field = cur.field(w, w);
    let timestamp_writes = timestamp_writes(view, ts_field)?;

    Ok(RenderPassDesc {
        label,
        color_attachments,
        depth_stencil_attachment,
        occlusion_query_set,
        timestamp_writes,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct ComputePassDesc {
    pub label: Option<String>,
    pub timestamp_writes: Option<TimestampWritesIr>,
}

pub fn compute_pass_descriptor<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<ComputePassDesc, DecodeError> {
    if ptr == 0 {
        return Ok(ComputePassDesc {
            label: None,
            timestamp_writes: None,
        });
    }
    let w = view.ptr_width().size();
    let mut cur = Cursor::new(view, ptr);
    cur.read_ptr()?;
    let label = cur.read_cstring()?;
    let ts_field = cur.field(w, w);
    let timestamp_writes = timestamp_writes(view, ts_field)?;
    Ok(ComputePassDesc {
        label,
        timestamp_writes,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderBundleEncoderDesc {
    pub label: Option<String>,
    pub color_formats: Vec<Option<wgpu::TextureFormat>>,
    pub depth_stencil_format: Option<wgpu::TextureFormat>,
    pub sample_count: u32,
    pub depth_read_only: bool,
    pub stencil_read_only: bool,
}

pub fn render_bundle_encoder_descriptor<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<RenderBundleEncoderDesc, DecodeError> {
    if ptr == 0 {
        return Err(DecodeError::NullDescriptor("RenderBundleEncoderDescriptor"));
    }
    let mut cur = Cursor::new(view, ptr);
    cur.read_ptr()?;
    let label = cur.read_cstring()?;
    let (count, base) = cur.read_array_header()?;
    let color_formats = decode_array(count, base, 4, |addr| {
        Ok(enums::texture_format(view.load_u32(addr)?)?)
    })?;
    Ok(RenderBundleEncoderDesc {
        label,
        color_formats,
        depth_stencil_format: enums::texture_format(cur.read_u32()?)?,
        sample_count: cur.read_u32()?,
        depth_read_only: cur.read_b32()?,
        stencil_read_only: cur.read_b32()?,
    })
}

// `wgpu::QueryType` does not implement `PartialEq` in wgpu 0.20 (the
// spec-pinned version), so this descriptor cannot derive it.
#[derive(Clone, Debug)]
pub struct QuerySetDesc {
    pub label: Option<String>,
    pub ty: wgpu::QueryType,
    pub count: u32,
}

pub fn query_set_descriptor<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<QuerySetDesc, DecodeError> {
    if ptr == 0 {
        return Err(DecodeError::NullDescriptor("QuerySetDescriptor"));
    }
    let mut cur = Cursor::new(view, ptr);
    cur.read_ptr()?;
    Ok(QuerySetDesc {
        label: cur.read_cstring()?,
        ty: enums::query_type(cur.read_u32()?)?,
        count: cur.read_u32()?,
    })
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdapterOptions {
    pub power_preference: Option<wgpu::PowerPreference>,
    pub force_fallback_adapter: bool,
}

pub fn adapter_options<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<AdapterOptions, DecodeError> {
    if ptr == 0 {
        return Ok(AdapterOptions::default());
    }
    let mut cur = Cursor::new(view, ptr);
    cur.read_ptr()?;
    cur.read_ptr()?; // compatibleSurface
    let power_preference = enums::power_preference(cur.read_u32()?)?;
    cur.read_u32()?; // backendType
    let force_fallback_adapter = cur.read_b32()?;
    Ok(AdapterOptions {
        power_preference,
        force_fallback_adapter,
    })
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceDesc {
    pub label: Option<String>,
    pub required_features: wgpu::Features,
    pub required_limits: Option<LimitsIr>,
    pub queue_label: Option<String>,
}

pub fn device_descriptor<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<DeviceDesc, DecodeError> {
    if ptr == 0 {
        return Ok(DeviceDesc::default());
    }
    let mut cur = Cursor::new(view, ptr);
    cur.read_ptr()?;
    let label = cur.read_cstring()?;
    let (count, base) = cur.read_array_header()?;
    let mut required_features = wgpu::Features::empty();
    for feature in decode_array(count, base, 4, |addr| {
        enums::feature(view.load_u32(addr)?)
    })? {
        if let Some(flag) = feature {
            required_features |= flag;
        }
    }
    let limits_field = cur.field(view.ptr_width().size(), view.ptr_width().size());
    let required_limits = required_limits(view, limits_field)?;
    cur.read_ptr()?; // defaultQueue.nextInChain
    let queue_label = cur.read_cstring()?;

    Ok(DeviceDesc {
        label,
        required_features,
        required_limits,
        queue_label,
    })
}

/// All wire limit fields; `None` is the all-ones "not specified" sentinel.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LimitsIr {
    pub max_texture_dimension_1d: Option<u32>,
    pub max_texture_dimension_2d: Option<u32>,
    pub max_texture_dimension_3d: Option<u32>,
    pub max_texture_array_layers: Option<u32>,
    pub max_bind_groups: Option<u32>,
    pub max_bind_groups_plus_vertex_buffers: Option<u32>,
    pub max_bindings_per_bind_group: Option<u32>,
    pub max_dynamic_uniform_buffers_per_pipeline_layout: Option<u32>,
    pub max_dynamic_storage_buffers_per_pipeline_layout: Option<u32>,
    pub max_sampled_textures_per_shader_stage: Option<u32>,
    pub max_samplers_per_shader_stage: Option<u32>,
    pub max_storage_buffers_per_shader_stage: Option<u32>,
    pub max_storage_textures_per_shader_stage: Option<u32>,
    pub max_uniform_buffers_per_shader_stage: Option<u32>,
    pub max_uniform_buffer_binding_size: Option<u64>,
    pub max_storage_buffer_binding_size: Option<u64>,
    pub min_uniform_buffer_offset_alignment: Option<u32>,
    pub min_storage_buffer_offset_alignment: Option<u32>,
    pub max_vertex_buffers: Option<u32>,
    pub max_buffer_size: Option<u64>,
    pub max_vertex_attributes: Option<u32>,
    pub max_vertex_buffer_array_stride: Option<u32>,
    pub max_inter_stage_shader_components: Option<u32>,
    pub max_inter_stage_shader_variables: Option<u32>,
    pub max_color_attachments: Option<u32>,
    pub max_color_attachment_bytes_per_sample: Option<u32>,
    pub max_compute_workgroup_storage_size: Option<u32>,
    pub max_compute_invocations_per_workgroup: Option<u32>,
    pub max_compute_workgroup_size_x: Option<u32>,
    pub max_compute_workgroup_size_y: Option<u32>,
    pub max_compute_workgroup_size_z: Option<u32>,
    pub max_compute_workgroups_per_dimension: Option<u32>,
}

/// Offset of the limits block inside the `(nextInChain, limits)` wrapper
/// structs: the first limit is 8-aligned after the chain pointer at either
/// pointer width.
pub const LIMITS_BLOCK_OFFSET: u64 = 8;

pub fn required_limits<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<Option<LimitsIr>, DecodeError> {
    let base = view.load_ptr(ptr)?;
    if base == 0 {
        return Ok(None);
    }
    Ok(Some(decode_limits(view, base + LIMITS_BLOCK_OFFSET)?))
}

/// Decodes the packed limits block at `base` (fixed, width-independent
/// offsets; 64-bit fields sit at their natural 8-byte alignment).
pub fn decode_limits<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    base: u64,
) -> Result<LimitsIr, DecodeError> {
    let u32_at = |off: u64| -> Result<Option<u32>, DecodeError> {
        Ok(limit_u32(view.load_u32(base + off)?))
    };
    let u64_at = |off: u64| -> Result<Option<u64>, DecodeError> {
        Ok(limit_u64(view.load_u64(base + off)?))
    };

    Ok(LimitsIr {
        max_texture_dimension_1d: u32_at(0)?,
        max_texture_dimension_2d: u32_at(4)?,
        max_texture_dimension_3d: u32_at(8)?,
        max_texture_array_layers: u32_at(12)?,
        max_bind_groups: u32_at(16)?,
        max_bind_groups_plus_vertex_buffers: u32_at(20)?,
        max_bindings_per_bind_group: u32_at(24)?,
        max_dynamic_uniform_buffers_per_pipeline_layout: u32_at(28)?,
        max_dynamic_storage_buffers_per_pipeline_layout: u32_at(32)?,
        max_sampled_textures_per_shader_stage: u32_at(36)?,
        max_samplers_per_shader_stage: u32_at(40)?,
        max_storage_buffers_per_shader_stage: u32_at(44)?,
        max_storage_textures_per_shader_stage: u32_at(48)?,
        max_uniform_buffers_per_shader_stage: u32_at(52)?,
        max_uniform_buffer_binding_size: u64_at(56)?,
        max_storage_buffer_binding_size: u64_at(64)?,
        min_uniform_buffer_offset_alignment: u32_at(72)?,
        min_storage_buffer_offset_alignment: u32_at(76)?,
        max_vertex_buffers: u32_at(80)?,
        max_buffer_size: u64_at(88)?,
        max_vertex_attributes: u32_at(96)?,
        max_vertex_buffer_array_stride: u32_at(100)?,
        max_inter_stage_shader_components: u32_at(104)?,
        max_inter_stage_shader_variables: u32_at(108)?,
        max_color_attachments: u32_at(112)?,
        max_color_attachment_bytes_per_sample: u32_at(116)?,
        max_compute_workgroup_storage_size: u32_at(120)?,
        max_compute_invocations_per_workgroup: u32_at(124)?,
        max_compute_workgroup_size_x: u32_at(128)?,
        max_compute_workgroup_size_y: u32_at(132)?,
        max_compute_workgroup_size_z: u32_at(136)?,
        max_compute_workgroups_per_dimension: u32_at(140)?,
    })
}

impl LimitsIr {
    /// Overlays the specified limits on `base`; unspecified fields keep the
    /// base value. Wire fields with no backend counterpart are dropped.
    pub fn apply_to(&self, base: wgpu::Limits) -> wgpu::Limits {
        let mut limits = base;
        macro_rules! set {
            ($field:ident) => {
                if let Some(value) = self.$field {
                    limits.$field = value;
                }
            };
            ($field:ident as $ty:ty) => {
                if let Some(value) = self.$field {
                    limits.$field = value as $ty;
                }
            };
        }
        set!(max_texture_dimension_1d);
        set!(max_texture_dimension_2d);
        set!(max_texture_dimension_3d);
        set!(max_texture_array_layers);
        set!(max_bind_groups);
        set!(max_bindings_per_bind_group);
        set!(max_dynamic_uniform_buffers_per_pipeline_layout);
        set!(max_dynamic_storage_buffers_per_pipeline_layout);
        set!(max_sampled_textures_per_shader_stage);
        set!(max_samplers_per_shader_stage);
        set!(max_storage_buffers_per_shader_stage);
        set!(max_storage_textures_per_shader_stage);
        set!(max_uniform_buffers_per_shader_stage);
        set!(max_uniform_buffer_binding_size as u32);
        set!(max_storage_buffer_binding_size as u32);
        set!(min_uniform_buffer_offset_alignment);
        set!(min_storage_buffer_offset_alignment);
        set!(max_vertex_buffers);
        set!(max_buffer_size);
        set!(max_vertex_attributes);
        set!(max_vertex_buffer_array_stride);
        set!(max_inter_stage_shader_components);
        set!(max_color_attachments);
        set!(max_color_attachment_bytes_per_sample);
        set!(max_compute_workgroup_storage_size);
        set!(max_compute_invocations_per_workgroup);
        set!(max_compute_workgroup_size_x);
        set!(max_compute_workgroup_size_y);
        set!(max_compute_workgroup_size_z);
        set!(max_compute_workgroups_per_dimension);
        limits
    }
}

/// Encodes the backend's supported limits into the guest's
/// `(nextInChain, limits)` out-struct at `ptr`. Wire fields the backend does
/// not model are written as 0.
pub fn encode_limits<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
    limits: &wgpu::Limits,
) -> Result<(), weft_mem::MemoryError> {
    let base = ptr + LIMITS_BLOCK_OFFSET;
    view.store_u32(base, limits.max_texture_dimension_1d)?;
    view.store_u32(base + 4, limits.max_texture_dimension_2d)?;
    view.store_u32(base + 8, limits.max_texture_dimension_3d)?;
    view.store_u32(base + 12, limits.max_texture_array_layers)?;
    view.store_u32(base + 16, limits.max_bind_groups)?;
    view.store_u32(base + 20, 0)?; // maxBindGroupsPlusVertexBuffers
    view.store_u32(base + 24, limits.max_bindings_per_bind_group)?;
    view.store_u32(
        base + 28,
        limits.max_dynamic_uniform_buffers_per_pipeline_layout,
    )?;
    view.store_u32(
        base + 32,
        limits.max_dynamic_storage_buffers_per_pipeline_layout,
    )?;
    view.store_u32(base + 36, limits.max_sampled_textures_per_shader_stage)?;
    view.store_u32(base + 40, limits.max_samplers_per_shader_stage)?;
    view.store_u32(base + 44, limits.max_storage_buffers_per_shader_stage)?;
    view.store_u32(base + 48, limits.max_storage_textures_per_shader_stage)?;
    view.store_u32(base + 52, limits.max_uniform_buffers_per_shader_stage)?;
    view.store_u64(base + 56, limits.max_uniform_buffer_binding_size as u64)?;
    view.store_u64(base + 64, limits.max_storage_buffer_binding_size as u64)?;
    view.store_u32(base + 72, limits.min_uniform_buffer_offset_alignment)?;
    view.store_u32(base + 76, limits.min_storage_buffer_offset_alignment)?;
    view.store_u32(base + 80, limits.max_vertex_buffers)?;
    view.store_u64(base + 88, limits.max_buffer_size)?;
    view.store_u32(base + 96, limits.max_vertex_attributes)?;
    view.store_u32(base + 100, limits.max_vertex_buffer_array_stride)?;
    view.store_u32(base + 104, limits.max_inter_stage_shader_components)?;
    view.store_u32(base + 108, 0)?; // maxInterStageShaderVariables
    view.store_u32(base + 112, limits.max_color_attachments)?;
    view.store_u32(base + 116, limits.max_color_attachment_bytes_per_sample)?;
    view.store_u32(base + 120, limits.max_compute_workgroup_storage_size)?;
    view.store_u32(base + 124, limits.max_compute_invocations_per_workgroup)?;
    view.store_u32(base + 128, limits.max_compute_workgroup_size_x)?;
    view.store_u32(base + 132, limits.max_compute_workgroup_size_y)?;
    view.store_u32(base + 136, limits.max_compute_workgroup_size_z)?;
    view.store_u32(base + 140, limits.max_compute_workgroups_per_dimension)?;
    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub struct DataLayoutIr {
    pub offset: u64,
    pub bytes_per_row: Option<u32>,
    pub rows_per_image: Option<u32>,
}

fn data_layout<M: WasmMemory + ?Sized>(
    cur: &mut Cursor<'_, '_, M>,
) -> Result<DataLayoutIr, DecodeError> {
    cur.read_ptr()?;
    cur.align_to(8);
    Ok(DataLayoutIr {
        offset: cur.read_u64()?,
        bytes_per_row: limit_u32(cur.read_u32()?),
        rows_per_image: limit_u32(cur.read_u32()?),
    })
}

pub fn data_layout_at<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<DataLayoutIr, DecodeError> {
    let mut cur = Cursor::new(view, ptr);
    data_layout(&mut cur)
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageCopyTextureIr {
    pub texture: Handle,
    pub mip_level: u32,
    pub origin: wgpu::Origin3d,
    pub aspect: wgpu::TextureAspect,
}

pub fn image_copy_texture<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<ImageCopyTextureIr, DecodeError> {
    if ptr == 0 {
        return Err(DecodeError::NullDescriptor("ImageCopyTexture"));
    }
    let mut cur = Cursor::new(view, ptr);
    cur.read_ptr()?;
    Ok(ImageCopyTextureIr {
        texture: cur.read_ptr()? as Handle,
        mip_level: cur.read_u32()?,
        origin: origin_3d(&mut cur)?,
        aspect: enums::texture_aspect(cur.read_u32()?)?,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageCopyBufferIr {
    pub layout: DataLayoutIr,
    pub buffer: Handle,
}

pub fn image_copy_buffer<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<ImageCopyBufferIr, DecodeError> {
    if ptr == 0 {
        return Err(DecodeError::NullDescriptor("ImageCopyBuffer"));
    }
    let mut cur = Cursor::new(view, ptr);
    cur.read_ptr()?;
    cur.align_to(8);
    // Inline data layout carries its own chain pointer.
    let layout = data_layout(&mut cur)?;
    let buffer = cur.read_ptr()? as Handle;
    Ok(ImageCopyBufferIr { layout, buffer })
}

#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceConfigIr {
    pub device: Handle,
    pub format: Option<wgpu::TextureFormat>,
    pub usage: u32,
    pub view_formats: Vec<wgpu::TextureFormat>,
    pub alpha_mode: wgpu::CompositeAlphaMode,
    pub width: u32,
    pub height: u32,
    pub present_mode: wgpu::PresentMode,
}

pub fn surface_configuration<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<SurfaceConfigIr, DecodeError> {
    if ptr == 0 {
        return Err(DecodeError::NullDescriptor("SurfaceConfiguration"));
    }
    let mut cur = Cursor::new(view, ptr);
    cur.read_ptr()?;
    let device = cur.read_ptr()? as Handle;
    let format = enums::texture_format(cur.read_u32()?)?;
    let usage = cur.read_u32()?;
    let (count, base) = cur.read_array_header()?;
    let view_formats = decode_array(count, base, 4, |addr| {
        Ok(enums::texture_format(view.load_u32(addr)?)?)
    })?
    .into_iter()
    .flatten()
    .collect();
    let alpha_mode = enums::composite_alpha_mode(cur.read_u32()?)?;
    let width = cur.read_u32()?;
    let height = cur.read_u32()?;
    let present_mode = enums::present_mode(cur.read_u32()?)?;
    Ok(SurfaceConfigIr {
        device,
        format,
        usage,
        view_formats,
        alpha_mode,
        width,
        height,
        present_mode,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextureViewDesc {
    pub label: Option<String>,
    pub format: Option<wgpu::TextureFormat>,
    pub dimension: Option<wgpu::TextureViewDimension>,
    pub base_mip_level: u32,
    pub mip_level_count: Option<u32>,
    pub base_array_layer: u32,
    pub array_layer_count: Option<u32>,
    pub aspect: wgpu::TextureAspect,
}

pub fn texture_view_descriptor<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<Option<TextureViewDesc>, DecodeError> {
    if ptr == 0 {
        return Ok(None);
    }
    let mut cur = Cursor::new(view, ptr);
    cur.read_ptr()?;
    Ok(Some(TextureViewDesc {
        label: cur.read_cstring()?,
        format: enums::texture_format(cur.read_u32()?)?,
        dimension: enums::texture_view_dimension(cur.read_u32()?)?,
        base_mip_level: cur.read_u32()?,
        mip_level_count: limit_u32(cur.read_u32()?),
        base_array_layer: cur.read_u32()?,
        array_layer_count: limit_u32(cur.read_u32()?),
        aspect: enums::texture_aspect(cur.read_u32()?)?,
    }))
}

/// One shader compilation diagnostic, in the shape the guest record expects.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompilationMessageIr {
    pub message: String,
    /// Message-type table index (0 unspecified, 1 error, 2 warning, 3 info).
    pub kind: u32,
    pub line_num: u64,
    pub line_pos: u64,
    pub offset: u64,
    pub length: u64,
}

const COMPILATION_MESSAGE_STRIDE: u64 = 72;

/// Encodes a compilation-info result into guest allocations: a message
/// array plus one C string per message, and a `(pad, count, ptr)` return
/// struct. Returns the return struct's address and every allocation made,
/// for the caller to free after the callback returns.
pub fn encode_compilation_info<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    allocator: &dyn crate::state::GuestAllocator,
    messages: &[CompilationMessageIr],
) -> Result<(u64, Vec<u64>), crate::WebGpuError> {
    let w = view.ptr_width().size();
    let mut allocations = Vec::new();

    let array_ptr = if messages.is_empty() {
        0
    } else {
        let ptr = allocator.alloc(messages.len() as u64 * COMPILATION_MESSAGE_STRIDE);
        if ptr == 0 {
            return Err(crate::WebGpuError::Validation(
                "guest allocator exhausted for compilation info".into(),
            ));
        }
        allocations.push(ptr);
        ptr
    };

    for (i, message) in messages.iter().enumerate() {
        let text_ptr = allocator.alloc(message.message.len() as u64 + 1);
        if text_ptr == 0 {
            return Err(crate::WebGpuError::Validation(
                "guest allocator exhausted for compilation message".into(),
            ));
        }
        allocations.push(text_ptr);
        let written = view.store_string(text_ptr, &message.message)?;
        view.store_u8(text_ptr + written as u64, 0)?;

        let mut rec = Writer::new(view, array_ptr + i as u64 * COMPILATION_MESSAGE_STRIDE);
        rec.write_ptr(0)?; // nextInChain
        rec.write_ptr(text_ptr)?;
        rec.write_u32(message.kind)?;
        rec.align_to(8);
        rec.write_u64(message.line_num)?;
        rec.write_u64(message.line_pos)?;
        rec.write_u64(message.offset)?;
        rec.write_u64(message.length)?;
        // UTF-16 positions mirror the byte positions.
        rec.write_u64(message.line_pos)?;
        rec.write_u64(message.offset)?;
        rec.write_u64(message.length)?;
    }

    let ret_ptr = allocator.alloc(3 * w);
    if ret_ptr == 0 {
        return Err(crate::WebGpuError::Validation(
            "guest allocator exhausted for compilation info".into(),
        ));
    }
    allocations.push(ret_ptr);
    view.store_ptr(ret_ptr, 0)?;
    view.store_uint(ret_ptr + w, messages.len() as u64)?;
    view.store_ptr(ret_ptr + 2 * w, array_ptr)?;

    Ok((ret_ptr, allocations))
}

#[derive(Clone, Debug, PartialEq)]
pub struct CommandEncoderDesc {
    pub label: Option<String>,
}

pub fn command_encoder_descriptor<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ptr: u64,
) -> Result<CommandEncoderDesc, DecodeError> {
    if ptr == 0 {
        return Ok(CommandEncoderDesc { label: None });
    }
    let mut cur = Cursor::new(view, ptr);
    cur.read_ptr()?;
    Ok(CommandEncoderDesc {
        label: cur.read_cstring()?,
    })
}
