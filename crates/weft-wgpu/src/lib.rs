//! The `wgpu` import namespace: maps the guest's C-style WebGPU ABI onto the
//! [`wgpu`] crate.
//!
//! Layering, innermost first:
//! - [`enums`]: declaration-ordered wire enum tables;
//! - [`desc`]: descriptor decoders producing owned, handle-referencing
//!   intermediate structs;
//! - [`state`]: per-category handle tables around live backend objects;
//! - [`pass`]: recorded pass command lists replayed at `End`;
//! - [`runtime`]: the foreign-callable operations, including the
//!   asynchronous ones with their exactly-once guest callbacks.
//!
//! Host-API failures never cross the boundary as panics: they are narrowed
//! to the wire status taxonomy (validation / out-of-memory / internal /
//! unknown) at this layer. Panics are reserved for FFI-contract violations
//! such as stale handles.

pub mod callback;
pub mod desc;
pub mod enums;
pub mod pass;
pub mod runtime;
pub mod state;

pub use callback::{CallbackArg, CallbackInvoker, GuestCallback, QueueSpawner, RecordingInvoker,
    Spawn, status};
pub use pass::{ComputeCmd, RenderCmd, WHOLE_SIZE};
pub use runtime::WebGpuRuntime;
pub use state::{BufferSlot, BumpAllocator, GuestAllocator, PassResources, WebGpu};

use weft_abi::DecodeError;
use weft_mem::MemoryError;

#[derive(Debug, thiserror::Error)]
pub enum WebGpuError {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("validation error: {0}")]
    Validation(String),
}
