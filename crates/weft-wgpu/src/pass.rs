//! Recorded pass commands.
//!
//! `wgpu` pass encoders borrow their command encoder for the duration of the
//! pass, which cannot be expressed through independent guest handles. Pass
//! encoder handles therefore record an owned command list; `End` opens the
//! real pass on the parent encoder, replays the list and drops the pass
//! within one call.

use weft_abi::limit_u64;
use weft_handles::Handle;

use crate::enums::LoadOpCode;
use crate::state::PassResources;
use crate::{WebGpuError, desc};

/// Wire sentinel for "the rest of the buffer".
pub const WHOLE_SIZE: u64 = u64::MAX;

#[derive(Clone, Debug, PartialEq)]
pub enum RenderCmd {
    SetPipeline(Handle),
    SetBindGroup {
        index: u32,
        bind_group: Handle,
        dynamic_offsets: Vec<u32>,
    },
    SetVertexBuffer {
        slot: u32,
        buffer: Handle,
        offset: u64,
        size: u64,
    },
    SetIndexBuffer {
        buffer: Handle,
        format: wgpu::IndexFormat,
        offset: u64,
        size: u64,
    },
    SetViewport {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        min_depth: f32,
        max_depth: f32,
    },
    SetScissorRect {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    SetBlendConstant(wgpu::Color),
    SetStencilReference(u32),
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    },
    DrawIndirect {
        buffer: Handle,
        offset: u64,
    },
    DrawIndexedIndirect {
        buffer: Handle,
        offset: u64,
    },
    ExecuteBundles(Vec<Handle>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ComputeCmd {
    SetPipeline(Handle),
    SetBindGroup {
        index: u32,
        bind_group: Handle,
        dynamic_offsets: Vec<u32>,
    },
    DispatchWorkgroups {
        x: u32,
        y: u32,
        z: u32,
    },
    DispatchWorkgroupsIndirect {
        buffer: Handle,
        offset: u64,
    },
}

fn slice_bounds(offset: u64, size: u64) -> impl std::ops::RangeBounds<u64> {
    use std::ops::Bound;
    let end = match limit_u64(size) {
        // WHOLE_SIZE decodes to "absent", i.e. to the end of the buffer.
        None => Bound::Unbounded,
        Some(size) => Bound::Excluded(offset + size),
    };
    (Bound::Included(offset), end)
}

/// Replays a recorded render pass on `encoder`, resolving handles against
/// the live tables.
pub fn replay_render_pass(
    gpu: &PassResources<'_>,
    encoder: &mut wgpu::CommandEncoder,
    descriptor: &desc::RenderPassDesc,
    commands: &[RenderCmd],
) -> Result<(), WebGpuError> {
    let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment<'_>>> = descriptor
        .color_attachments
        .iter()
        .map(|attachment| {
            attachment.as_ref().map(|a| wgpu::RenderPassColorAttachment {
                view: gpu.texture_views.get(a.view),
                resolve_target: a.resolve_target.map(|h| gpu.texture_views.get(h)),
                ops: wgpu::Operations {
                    load: match a.load {
                        Some(LoadOpCode::Clear) | None => wgpu::LoadOp::Clear(a.clear_value),
                        Some(LoadOpCode::Load) => wgpu::LoadOp::Load,
                    },
                    store: match a.store {
                        Some(wgpu::StoreOp::Discard) => wgpu::StoreOp::Discard,
                        _ => wgpu::StoreOp::Store,
                    },
                },
            })
        })
        .collect();

    let depth_stencil_attachment =
        descriptor
            .depth_stencil_attachment
            .as_ref()
            .map(|a| wgpu::RenderPassDepthStencilAttachment {
                view: gpu.texture_views.get(a.view),
                depth_ops: a.depth_load.map(|load| wgpu::Operations {
                    load: match load {
                        LoadOpCode::Clear => wgpu::LoadOp::Clear(a.depth_clear_value),
                        LoadOpCode::Load => wgpu::LoadOp::Load,
                    },
                    store: a.depth_store.unwrap_or(wgpu::StoreOp::Store),
                }),
                stencil_ops: a.stencil_load.map(|load| wgpu::Operations {
                    load: match load {
                        LoadOpCode::Clear => wgpu::LoadOp::Clear(a.stencil_clear_value),
                        LoadOpCode::Load => wgpu::LoadOp::Load,
                    },
                    store: a.stencil_store.unwrap_or(wgpu::StoreOp::Store),
                }),
            });

    let timestamp_writes =
        descriptor
            .timestamp_writes
            .as_ref()
            .map(|tw| wgpu::RenderPassTimestampWrites {
                query_set: gpu.query_sets.get(tw.query_set),
                beginning_of_pass_write_index: tw.beginning_of_pass_write_index,
                end_of_pass_write_index: tw.end_of_pass_write_index,
            });

    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: descriptor.label.as_deref(),
        color_attachments: &color_attachments,
        depth_stencil_attachment,
        occlusion_query_set: descriptor
            .occlusion_query_set
            .map(|h| gpu.query_sets.get(h)),
        timestamp_writes,
    });

    for command in commands {
        match command {
            RenderCmd::SetPipeline(pipeline) => {
                pass.set_pipeline(gpu.render_pipelines.get(*pipeline));
            }
            RenderCmd::SetBindGroup {
                index,
                bind_group,
                dynamic_offsets,
            } => {
                pass.set_bind_group(*index, gpu.bind_groups.get(*bind_group), dynamic_offsets);
            }
            RenderCmd::SetVertexBuffer {
                slot,
                buffer,
                offset,
                size,
            } => {
                let buffer = &gpu.buffers.get(*buffer).buffer;
                pass.set_vertex_buffer(*slot, buffer.slice(slice_bounds(*offset, *size)));
            }
            RenderCmd::SetIndexBuffer {
                buffer,
                format,
                offset,
                size,
            } => {
                let buffer = &gpu.buffers.get(*buffer).buffer;
                pass.set_index_buffer(buffer.slice(slice_bounds(*offset, *size)), *format);
            }
            RenderCmd::SetViewport {
                x,
                y,
                width,
                height,
                min_depth,
                max_depth,
            } => {
                pass.set_viewport(*x, *y, *width, *height, *min_depth, *max_depth);
            }
            RenderCmd::SetScissorRect {
                x,
                y,
                width,
                height,
            } => {
                pass.set_scissor_rect(*x, *y, *width, *height);
            }
            RenderCmd::SetBlendConstant(color) => {
                pass.set_blend_constant(*color);
            }
            RenderCmd::SetStencilReference(reference) => {
                pass.set_stencil_reference(*reference);
            }
            RenderCmd::Draw {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            } => {
                pass.draw(
                    *first_vertex..*first_vertex + *vertex_count,
                    *first_instance..*first_instance + *instance_count,
                );
            }
            RenderCmd::DrawIndexed {
                index_count,
                instance_count,
                first_index,
                base_vertex,
                first_instance,
            } => {
                pass.draw_indexed(
                    *first_index..*first_index + *index_count,
                    *base_vertex,
                    *first_instance..*first_instance + *instance_count,
                );
            }
            RenderCmd::DrawIndirect { buffer, offset } => {
                pass.draw_indirect(&gpu.buffers.get(*buffer).buffer, *offset);
            }
            RenderCmd::DrawIndexedIndirect { buffer, offset } => {
                pass.draw_indexed_indirect(&gpu.buffers.get(*buffer).buffer, *offset);
            }
            RenderCmd::ExecuteBundles(bundles) => {
                pass.execute_bundles(bundles.iter().map(|h| gpu.render_bundles.get(*h)));
            }
        }
    }

    Ok(())
}

/// Replays the bundle-legal command subset on a render bundle encoder.
/// State commands that only exist on real passes are validation errors.
pub fn replay_render_bundle<'a>(
    gpu: &PassResources<'a>,
    encoder: &mut wgpu::RenderBundleEncoder<'a>,
    commands: &[RenderCmd],
) -> Result<(), WebGpuError> {
    for command in commands {
        match command {
            RenderCmd::SetPipeline(pipeline) => {
                encoder.set_pipeline(gpu.render_pipelines.get(*pipeline));
            }
            RenderCmd::SetBindGroup {
                index,
                bind_group,
                dynamic_offsets,
            } => {
                encoder.set_bind_group(*index, gpu.bind_groups.get(*bind_group), dynamic_offsets);
            }
            RenderCmd::SetVertexBuffer {
                slot,
                buffer,
                offset,
                size,
            } => {
                let buffer = &gpu.buffers.get(*buffer).buffer;
                encoder.set_vertex_buffer(*slot, buffer.slice(slice_bounds(*offset, *size)));
            }
            RenderCmd::SetIndexBuffer {
                buffer,
                format,
                offset,
                size,
            } => {
                let buffer = &gpu.buffers.get(*buffer).buffer;
                encoder.set_index_buffer(buffer.slice(slice_bounds(*offset, *size)), *format);
            }
            RenderCmd::Draw {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            } => {
                encoder.draw(
                    *first_vertex..*first_vertex + *vertex_count,
                    *first_instance..*first_instance + *instance_count,
                );
            }
            RenderCmd::DrawIndexed {
                index_count,
                instance_count,
                first_index,
                base_vertex,
                first_instance,
            } => {
                encoder.draw_indexed(
                    *first_index..*first_index + *index_count,
                    *base_vertex,
                    *first_instance..*first_instance + *instance_count,
                );
            }
            RenderCmd::DrawIndirect { buffer, offset } => {
                encoder.draw_indirect(&gpu.buffers.get(*buffer).buffer, *offset);
            }
            RenderCmd::DrawIndexedIndirect { buffer, offset } => {
                encoder.draw_indexed_indirect(&gpu.buffers.get(*buffer).buffer, *offset);
            }
            other => {
                return Err(WebGpuError::Validation(format!(
                    "{other:?} is not recordable in a render bundle"
                )));
            }
        }
    }
    Ok(())
}

pub fn replay_compute_pass(
    gpu: &PassResources<'_>,
    encoder: &mut wgpu::CommandEncoder,
    descriptor: &desc::ComputePassDesc,
    commands: &[ComputeCmd],
) -> Result<(), WebGpuError> {
    let timestamp_writes =
        descriptor
            .timestamp_writes
            .as_ref()
            .map(|tw| wgpu::ComputePassTimestampWrites {
                query_set: gpu.query_sets.get(tw.query_set),
                beginning_of_pass_write_index: tw.beginning_of_pass_write_index,
                end_of_pass_write_index: tw.end_of_pass_write_index,
            });

    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
        label: descriptor.label.as_deref(),
        timestamp_writes,
    });

    for command in commands {
        match command {
            ComputeCmd::SetPipeline(pipeline) => {
                pass.set_pipeline(gpu.compute_pipelines.get(*pipeline));
            }
            ComputeCmd::SetBindGroup {
                index,
                bind_group,
                dynamic_offsets,
            } => {
                pass.set_bind_group(*index, gpu.bind_groups.get(*bind_group), dynamic_offsets);
            }
            ComputeCmd::DispatchWorkgroups { x, y, z } => {
                pass.dispatch_workgroups(*x, *y, *z);
            }
            ComputeCmd::DispatchWorkgroupsIndirect { buffer, offset } => {
                pass.dispatch_workgroups_indirect(&gpu.buffers.get(*buffer).buffer, *offset);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ops::{Bound, RangeBounds};

    #[test]
    fn whole_size_sentinel_is_unbounded() {
        let bounds = slice_bounds(16, WHOLE_SIZE);
        assert_eq!(bounds.start_bound(), Bound::Included(&16u64));
        assert_eq!(bounds.end_bound(), Bound::Unbounded);
    }

    #[test]
    fn explicit_size_is_a_half_open_range() {
        let bounds = slice_bounds(8, 32);
        assert_eq!(bounds.start_bound(), Bound::Included(&8u64));
        assert_eq!(bounds.end_bound(), Bound::Excluded(&40u64));
    }
}
