//! Declaration-ordered wire enum tables.
//!
//! Every enum crosses the boundary as a 32-bit index into a fixed,
//! declaration-ordered table; decoding is a table lookup. Tables whose slot
//! 0 means "unspecified" decode to `Option`, preserving the distinction
//! between "explicitly the first named value" and "not given". An index past
//! the end of a table is a decode error, never a silent default.

use weft_abi::DecodeError;
use wgpu::{AstcBlock, AstcChannel, TextureFormat as Tf};

fn unknown(name: &'static str, value: u32) -> DecodeError {
    DecodeError::UnknownEnum { name, value }
}

/// Feature codes with their `wgpu` flag; slot 0 is the undefined slot.
pub const FEATURES: &[(u32, wgpu::Features)] = &[
    (1, wgpu::Features::DEPTH_CLIP_CONTROL),
    (2, wgpu::Features::DEPTH32FLOAT_STENCIL8),
    (3, wgpu::Features::TIMESTAMP_QUERY),
    (4, wgpu::Features::TEXTURE_COMPRESSION_BC),
    (5, wgpu::Features::TEXTURE_COMPRESSION_ETC2),
    (6, wgpu::Features::TEXTURE_COMPRESSION_ASTC),
    (7, wgpu::Features::INDIRECT_FIRST_INSTANCE),
    (8, wgpu::Features::SHADER_F16),
    (9, wgpu::Features::RG11B10UFLOAT_RENDERABLE),
    (10, wgpu::Features::BGRA8UNORM_STORAGE),
    (11, wgpu::Features::FLOAT32_FILTERABLE),
];

pub fn feature(raw: u32) -> Result<Option<wgpu::Features>, DecodeError> {
    if raw == 0 {
        return Ok(None);
    }
    FEATURES
        .iter()
        .find(|(code, _)| *code == raw)
        .map(|(_, flag)| Some(*flag))
        .ok_or_else(|| unknown("FeatureName", raw))
}

const fn astc(block: AstcBlock, channel: AstcChannel) -> Option<Tf> {
    Some(Tf::Astc { block, channel })
}

/// Full texture format table in wire declaration order; slot 0 undefined.
pub const TEXTURE_FORMATS: &[Option<Tf>] = &[
    None,
    Some(Tf::R8Unorm),
    Some(Tf::R8Snorm),
    Some(Tf::R8Uint),
    Some(Tf::R8Sint),
    Some(Tf::R16Uint),
    Some(Tf::R16Sint),
    Some(Tf::R16Float),
    Some(Tf::Rg8Unorm),
    Some(Tf::Rg8Snorm),
    Some(Tf::Rg8Uint),
    Some(Tf::Rg8Sint),
    Some(Tf::R32Float),
    Some(Tf::R32Uint),
    Some(Tf::R32Sint),
    Some(Tf::Rg16Uint),
    Some(Tf::Rg16Sint),
    Some(Tf::Rg16Float),
    Some(Tf::Rgba8Unorm),
    Some(Tf::Rgba8UnormSrgb),
    Some(Tf::Rgba8Snorm),
    Some(Tf::Rgba8Uint),
    Some(Tf::Rgba8Sint),
    Some(Tf::Bgra8Unorm),
    Some(Tf::Bgra8UnormSrgb),
    Some(Tf::Rgb10a2Uint),
    Some(Tf::Rgb10a2Unorm),
    Some(Tf::Rg11b10Float),
    Some(Tf::Rgb9e5Ufloat),
    Some(Tf::Rg32Float),
    Some(Tf::Rg32Uint),
    Some(Tf::Rg32Sint),
    Some(Tf::Rgba16Uint),
    Some(Tf::Rgba16Sint),
    Some(Tf::Rgba16Float),
    Some(Tf::Rgba32Float),
    Some(Tf::Rgba32Uint),
    Some(Tf::Rgba32Sint),
    Some(Tf::Stencil8),
    Some(Tf::Depth16Unorm),
    Some(Tf::Depth24Plus),
    Some(Tf::Depth24PlusStencil8),
    Some(Tf::Depth32Float),
    Some(Tf::Depth32FloatStencil8),
    Some(Tf::Bc1RgbaUnorm),
    Some(Tf::Bc1RgbaUnormSrgb),
    Some(Tf::Bc2RgbaUnorm),
    Some(Tf::Bc2RgbaUnormSrgb),
    Some(Tf::Bc3RgbaUnorm),
    Some(Tf::Bc3RgbaUnormSrgb),
    Some(Tf::Bc4RUnorm),
    Some(Tf::Bc4RSnorm),
    Some(Tf::Bc5RgUnorm),
    Some(Tf::Bc5RgSnorm),
    Some(Tf::Bc6hRgbUfloat),
    Some(Tf::Bc6hRgbFloat),
    Some(Tf::Bc7RgbaUnorm),
    Some(Tf::Bc7RgbaUnormSrgb),
    Some(Tf::Etc2Rgb8Unorm),
    Some(Tf::Etc2Rgb8UnormSrgb),
    Some(Tf::Etc2Rgb8A1Unorm),
    Some(Tf::Etc2Rgb8A1UnormSrgb),
    Some(Tf::Etc2Rgba8Unorm),
    Some(Tf::Etc2Rgba8UnormSrgb),
    Some(Tf::EacR11Unorm),
    Some(Tf::EacR11Snorm),
    Some(Tf::EacRg11Unorm),
    Some(Tf::EacRg11Snorm),
    astc(AstcBlock::B4x4, AstcChannel::Unorm),
    astc(AstcBlock::B4x4, AstcChannel::UnormSrgb),
    astc(AstcBlock::B5x4, AstcChannel::Unorm),
    astc(AstcBlock::B5x4, AstcChannel::UnormSrgb),
    astc(AstcBlock::B5x5, AstcChannel::Unorm),
    astc(AstcBlock::B5x5, AstcChannel::UnormSrgb),
    astc(AstcBlock::B6x5, AstcChannel::Unorm),
    astc(AstcBlock::B6x5, AstcChannel::UnormSrgb),
    astc(AstcBlock::B6x6, AstcChannel::Unorm),
    astc(AstcBlock::B6x6, AstcChannel::UnormSrgb),
    astc(AstcBlock::B8x5, AstcChannel::Unorm),
    astc(AstcBlock::B8x5, AstcChannel::UnormSrgb),
    astc(AstcBlock::B8x6, AstcChannel::Unorm),
    astc(AstcBlock::B8x6, AstcChannel::UnormSrgb),
    astc(AstcBlock::B8x8, AstcChannel::Unorm),
    astc(AstcBlock::B8x8, AstcChannel::UnormSrgb),
    astc(AstcBlock::B10x5, AstcChannel::Unorm),
    astc(AstcBlock::B10x5, AstcChannel::UnormSrgb),
    astc(AstcBlock::B10x6, AstcChannel::Unorm),
    astc(AstcBlock::B10x6, AstcChannel::UnormSrgb),
    astc(AstcBlock::B10x8, AstcChannel::Unorm),
    astc(AstcBlock::B10x8, AstcChannel::UnormSrgb),
    astc(AstcBlock::B10x10, AstcChannel::Unorm),
    astc(AstcBlock::B10x10, AstcChannel::UnormSrgb),
    astc(AstcBlock::B12x10, AstcChannel::Unorm),
    astc(AstcBlock::B12x10, AstcChannel::UnormSrgb),
    astc(AstcBlock::B12x12, AstcChannel::Unorm),
    astc(AstcBlock::B12x12, AstcChannel::UnormSrgb),
];

pub fn texture_format(raw: u32) -> Result<Option<Tf>, DecodeError> {
    TEXTURE_FORMATS
        .get(raw as usize)
        .copied()
        .ok_or_else(|| unknown("TextureFormat", raw))
}

/// Reverse lookup for the getters that report a format back to the guest.
pub fn texture_format_code(format: Tf) -> u32 {
    TEXTURE_FORMATS
        .iter()
        .position(|entry| *entry == Some(format))
        .unwrap_or(0) as u32
}

pub fn store_op(raw: u32) -> Result<Option<wgpu::StoreOp>, DecodeError> {
    match raw {
        0 => Ok(None),
        1 => Ok(Some(wgpu::StoreOp::Store)),
        2 => Ok(Some(wgpu::StoreOp::Discard)),
        _ => Err(unknown("StoreOp", raw)),
    }
}

/// Load ops carry their clear value elsewhere in the struct, so the wire
/// code alone is a kind, not a complete `wgpu::LoadOp`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOpCode {
    Clear,
    Load,
}

pub fn load_op(raw: u32) -> Result<Option<LoadOpCode>, DecodeError> {
    match raw {
        0 => Ok(None),
        1 => Ok(Some(LoadOpCode::Clear)),
        2 => Ok(Some(LoadOpCode::Load)),
        _ => Err(unknown("LoadOp", raw)),
    }
}

pub fn buffer_binding_type(raw: u32) -> Result<Option<wgpu::BufferBindingType>, DecodeError> {
    match raw {
        0 => Ok(None),
        1 => Ok(Some(wgpu::BufferBindingType::Uniform)),
        2 => Ok(Some(wgpu::BufferBindingType::Storage { read_only: false })),
        3 => Ok(Some(wgpu::BufferBindingType::Storage { read_only: true })),
        _ => Err(unknown("BufferBindingType", raw)),
    }
}

pub fn sampler_binding_type(raw: u32) -> Result<Option<wgpu::SamplerBindingType>, DecodeError> {
    match raw {
        0 => Ok(None),
        1 => Ok(Some(wgpu::SamplerBindingType::Filtering)),
        2 => Ok(Some(wgpu::SamplerBindingType::NonFiltering)),
        3 => Ok(Some(wgpu::SamplerBindingType::Comparison)),
        _ => Err(unknown("SamplerBindingType", raw)),
    }
}

pub fn texture_sample_type(raw: u32) -> Result<Option<wgpu::TextureSampleType>, DecodeError> {
    match raw {
        0 => Ok(None),
        1 => Ok(Some(wgpu::TextureSampleType::Float { filterable: true })),
        2 => Ok(Some(wgpu::TextureSampleType::Float { filterable: false })),
        3 => Ok(Some(wgpu::TextureSampleType::Depth)),
        4 => Ok(Some(wgpu::TextureSampleType::Sint)),
        5 => Ok(Some(wgpu::TextureSampleType::Uint)),
        _ => Err(unknown("TextureSampleType", raw)),
    }
}

pub fn texture_view_dimension(
    raw: u32,
) -> Result<Option<wgpu::TextureViewDimension>, DecodeError> {
    use wgpu::TextureViewDimension as Tvd;
    match raw {
        0 => Ok(None),
        1 => Ok(Some(Tvd::D1)),
        2 => Ok(Some(Tvd::D2)),
        3 => Ok(Some(Tvd::D2Array)),
        4 => Ok(Some(Tvd::Cube)),
        5 => Ok(Some(Tvd::CubeArray)),
        6 => Ok(Some(Tvd::D3)),
        _ => Err(unknown("TextureViewDimension", raw)),
    }
}

pub fn storage_texture_access(
    raw: u32,
) -> Result<Option<wgpu::StorageTextureAccess>, DecodeError> {
    use wgpu::StorageTextureAccess as Sta;
    match raw {
        0 => Ok(None),
        1 => Ok(Some(Sta::WriteOnly)),
        2 => Ok(Some(Sta::ReadOnly)),
        3 => Ok(Some(Sta::ReadWrite)),
        _ => Err(unknown("StorageTextureAccess", raw)),
    }
}

pub fn query_type(raw: u32) -> Result<wgpu::QueryType, DecodeError> {
    match raw {
        0 => Ok(wgpu::QueryType::Occlusion),
        1 => Ok(wgpu::QueryType::Timestamp),
        _ => Err(unknown("QueryType", raw)),
    }
}

pub fn query_type_code(ty: wgpu::QueryType) -> u32 {
    match ty {
        wgpu::QueryType::Occlusion => 0,
        wgpu::QueryType::Timestamp => 1,
        _ => 0,
    }
}

/// Step mode 2 is the "vertex buffer not used" hole sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepModeCode {
    Used(wgpu::VertexStepMode),
    NotUsed,
}

pub fn vertex_step_mode(raw: u32) -> Result<StepModeCode, DecodeError> {
    match raw {
        0 => Ok(StepModeCode::Used(wgpu::VertexStepMode::Vertex)),
        1 => Ok(StepModeCode::Used(wgpu::VertexStepMode::Instance)),
        2 => Ok(StepModeCode::NotUsed),
        _ => Err(unknown("VertexStepMode", raw)),
    }
}

pub const VERTEX_FORMATS: &[Option<wgpu::VertexFormat>] = &[
    None,
    Some(wgpu::VertexFormat::Uint8x2),
    Some(wgpu::VertexFormat::Uint8x4),
    Some(wgpu::VertexFormat::Sint8x2),
    Some(wgpu::VertexFormat::Sint8x4),
    Some(wgpu::VertexFormat::Unorm8x2),
    Some(wgpu::VertexFormat::Unorm8x4),
    Some(wgpu::VertexFormat::Snorm8x2),
    Some(wgpu::VertexFormat::Snorm8x4),
    Some(wgpu::VertexFormat::Uint16x2),
    Some(wgpu::VertexFormat::Uint16x4),
    Some(wgpu::VertexFormat::Sint16x2),
    Some(wgpu::VertexFormat::Sint16x4),
    Some(wgpu::VertexFormat::Unorm16x2),
    Some(wgpu::VertexFormat::Unorm16x4),
    Some(wgpu::VertexFormat::Snorm16x2),
    Some(wgpu::VertexFormat::Snorm16x4),
    Some(wgpu::VertexFormat::Float16x2),
    Some(wgpu::VertexFormat::Float16x4),
    Some(wgpu::VertexFormat::Float32),
    Some(wgpu::VertexFormat::Float32x2),
    Some(wgpu::VertexFormat::Float32x3),
    Some(wgpu::VertexFormat::Float32x4),
    Some(wgpu::VertexFormat::Uint32),
    Some(wgpu::VertexFormat::Uint32x2),
    Some(wgpu::VertexFormat::Uint32x3),
    Some(wgpu::VertexFormat::Uint32x4),
    Some(wgpu::VertexFormat::Sint32),
    Some(wgpu::VertexFormat::Sint32x2),
    Some(wgpu::VertexFormat::Sint32x3),
    Some(wgpu::VertexFormat::Sint32x4),
];

pub fn vertex_format(raw: u32) -> Result<Option<wgpu::VertexFormat>, DecodeError> {
    VERTEX_FORMATS
        .get(raw as usize)
        .copied()
        .ok_or_else(|| unknown("VertexFormat", raw))
}

pub fn primitive_topology(raw: u32) -> Result<wgpu::PrimitiveTopology, DecodeError> {
    use wgpu::PrimitiveTopology as Pt;
    match raw {
        0 => Ok(Pt::PointList),
        1 => Ok(Pt::LineList),
        2 => Ok(Pt::LineStrip),
        3 => Ok(Pt::TriangleList),
        4 => Ok(Pt::TriangleStrip),
        _ => Err(unknown("PrimitiveTopology", raw)),
    }
}

pub fn index_format(raw: u32) -> Result<Option<wgpu::IndexFormat>, DecodeError> {
    match raw {
        0 => Ok(None),
        1 => Ok(Some(wgpu::IndexFormat::Uint16)),
        2 => Ok(Some(wgpu::IndexFormat::Uint32)),
        _ => Err(unknown("IndexFormat", raw)),
    }
}

pub fn front_face(raw: u32) -> Result<wgpu::FrontFace, DecodeError> {
    match raw {
        0 => Ok(wgpu::FrontFace::Ccw),
        1 => Ok(wgpu::FrontFace::Cw),
        _ => Err(unknown("FrontFace", raw)),
    }
}

pub fn cull_mode(raw: u32) -> Result<Option<wgpu::Face>, DecodeError> {
    match raw {
        0 => Ok(None),
        1 => Ok(Some(wgpu::Face::Front)),
        2 => Ok(Some(wgpu::Face::Back)),
        _ => Err(unknown("CullMode", raw)),
    }
}

pub fn address_mode(raw: u32) -> Result<wgpu::AddressMode, DecodeError> {
    use wgpu::AddressMode as Am;
    match raw {
        0 => Ok(Am::Repeat),
        1 => Ok(Am::MirrorRepeat),
        2 => Ok(Am::ClampToEdge),
        _ => Err(unknown("AddressMode", raw)),
    }
}

pub fn filter_mode(raw: u32) -> Result<wgpu::FilterMode, DecodeError> {
    match raw {
        0 => Ok(wgpu::FilterMode::Nearest),
        1 => Ok(wgpu::FilterMode::Linear),
        _ => Err(unknown("FilterMode", raw)),
    }
}

pub fn compare_function(raw: u32) -> Result<Option<wgpu::CompareFunction>, DecodeError> {
    use wgpu::CompareFunction as Cf;
    match raw {
        0 => Ok(None),
        1 => Ok(Some(Cf::Never)),
        2 => Ok(Some(Cf::Less)),
        3 => Ok(Some(Cf::LessEqual)),
        4 => Ok(Some(Cf::Greater)),
        5 => Ok(Some(Cf::GreaterEqual)),
        6 => Ok(Some(Cf::Equal)),
        7 => Ok(Some(Cf::NotEqual)),
        8 => Ok(Some(Cf::Always)),
        _ => Err(unknown("CompareFunction", raw)),
    }
}

pub fn texture_dimension(raw: u32) -> Result<wgpu::TextureDimension, DecodeError> {
    use wgpu::TextureDimension as Td;
    match raw {
        0 => Ok(Td::D1),
        1 => Ok(Td::D2),
        2 => Ok(Td::D3),
        _ => Err(unknown("TextureDimension", raw)),
    }
}

pub fn texture_dimension_code(dimension: wgpu::TextureDimension) -> u32 {
    match dimension {
        wgpu::TextureDimension::D1 => 0,
        wgpu::TextureDimension::D2 => 1,
        wgpu::TextureDimension::D3 => 2,
    }
}

pub fn texture_aspect(raw: u32) -> Result<wgpu::TextureAspect, DecodeError> {
    use wgpu::TextureAspect as Ta;
    match raw {
        0 => Ok(Ta::All),
        1 => Ok(Ta::StencilOnly),
        2 => Ok(Ta::DepthOnly),
        _ => Err(unknown("TextureAspect", raw)),
    }
}

pub fn power_preference(raw: u32) -> Result<Option<wgpu::PowerPreference>, DecodeError> {
    match raw {
        0 => Ok(None),
        1 => Ok(Some(wgpu::PowerPreference::LowPower)),
        2 => Ok(Some(wgpu::PowerPreference::HighPerformance)),
        _ => Err(unknown("PowerPreference", raw)),
    }
}

pub fn stencil_operation(raw: u32) -> Result<wgpu::StencilOperation, DecodeError> {
    use wgpu::StencilOperation as So;
    match raw {
        0 => Ok(So::Keep),
        1 => Ok(So::Zero),
        2 => Ok(So::Replace),
        3 => Ok(So::Invert),
        4 => Ok(So::IncrementClamp),
        5 => Ok(So::DecrementClamp),
        6 => Ok(So::IncrementWrap),
        7 => Ok(So::DecrementWrap),
        _ => Err(unknown("StencilOperation", raw)),
    }
}

pub fn blend_operation(raw: u32) -> Result<wgpu::BlendOperation, DecodeError> {
    use wgpu::BlendOperation as Bo;
    match raw {
        0 => Ok(Bo::Add),
        1 => Ok(Bo::Subtract),
        2 => Ok(Bo::ReverseSubtract),
        3 => Ok(Bo::Min),
        4 => Ok(Bo::Max),
        _ => Err(unknown("BlendOperation", raw)),
    }
}

pub fn blend_factor(raw: u32) -> Result<wgpu::BlendFactor, DecodeError> {
    use wgpu::BlendFactor as Bf;
    match raw {
        0 => Ok(Bf::Zero),
        1 => Ok(Bf::One),
        2 => Ok(Bf::Src),
        3 => Ok(Bf::OneMinusSrc),
        4 => Ok(Bf::SrcAlpha),
        5 => Ok(Bf::OneMinusSrcAlpha),
        6 => Ok(Bf::Dst),
        7 => Ok(Bf::OneMinusDst),
        8 => Ok(Bf::DstAlpha),
        9 => Ok(Bf::OneMinusDstAlpha),
        10 => Ok(Bf::SrcAlphaSaturated),
        11 => Ok(Bf::Constant),
        12 => Ok(Bf::OneMinusConstant),
        _ => Err(unknown("BlendFactor", raw)),
    }
}

pub fn error_filter(raw: u32) -> Result<wgpu::ErrorFilter, DecodeError> {
    match raw {
        0 => Ok(wgpu::ErrorFilter::Validation),
        1 => Ok(wgpu::ErrorFilter::OutOfMemory),
        2 => Ok(wgpu::ErrorFilter::Internal),
        _ => Err(unknown("ErrorFilter", raw)),
    }
}

pub fn composite_alpha_mode(raw: u32) -> Result<wgpu::CompositeAlphaMode, DecodeError> {
    use wgpu::CompositeAlphaMode as Cam;
    match raw {
        0 => Ok(Cam::Auto),
        1 => Ok(Cam::Opaque),
        2 => Ok(Cam::PreMultiplied),
        3 => Ok(Cam::PostMultiplied),
        4 => Ok(Cam::Inherit),
        _ => Err(unknown("CompositeAlphaMode", raw)),
    }
}

pub fn present_mode(raw: u32) -> Result<wgpu::PresentMode, DecodeError> {
    use wgpu::PresentMode as Pm;
    match raw {
        0 => Ok(Pm::Fifo),
        1 => Ok(Pm::FifoRelaxed),
        2 => Ok(Pm::Immediate),
        3 => Ok(Pm::Mailbox),
        _ => Err(unknown("PresentMode", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_slots_decode_to_none() {
        assert_eq!(texture_format(0).unwrap(), None);
        assert_eq!(load_op(0).unwrap(), None);
        assert_eq!(index_format(0).unwrap(), None);
        assert_eq!(compare_function(0).unwrap(), None);
        assert_eq!(power_preference(0).unwrap(), None);
        assert_eq!(feature(0).unwrap(), None);
    }

    #[test]
    fn declaration_order_matches_wire_codes() {
        assert_eq!(texture_format(1).unwrap(), Some(Tf::R8Unorm));
        assert_eq!(texture_format(18).unwrap(), Some(Tf::Rgba8Unorm));
        assert_eq!(texture_format(23).unwrap(), Some(Tf::Bgra8Unorm));
        assert_eq!(texture_format(40).unwrap(), Some(Tf::Depth24Plus));
        assert_eq!(
            vertex_format(22).unwrap(),
            Some(wgpu::VertexFormat::Float32x4)
        );
        assert_eq!(
            primitive_topology(3).unwrap(),
            wgpu::PrimitiveTopology::TriangleList
        );
    }

    #[test]
    fn reverse_lookup_round_trips() {
        for raw in 0..TEXTURE_FORMATS.len() as u32 {
            if let Some(format) = texture_format(raw).unwrap() {
                assert_eq!(texture_format_code(format), raw);
            }
        }
    }

    #[test]
    fn out_of_range_is_an_error_not_a_default() {
        assert!(texture_format(9999).is_err());
        assert!(blend_factor(13).is_err());
        assert!(cull_mode(3).is_err());
        assert!(feature(99).is_err());
    }

    #[test]
    fn step_mode_hole_sentinel() {
        assert_eq!(
            vertex_step_mode(0).unwrap(),
            StepModeCode::Used(wgpu::VertexStepMode::Vertex)
        );
        assert_eq!(vertex_step_mode(2).unwrap(), StepModeCode::NotUsed);
    }
}
