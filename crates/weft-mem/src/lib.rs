//! Typed access to a WebAssembly guest module's linear memory.
//!
//! [`WasmMemory`] is the byte-level seam: the browser runtime implements it
//! over the live `WebAssembly.Memory` object (rereading the backing buffer on
//! every access, since growth can reallocate it), while [`VecMemory`] is a
//! contiguous in-memory implementation for native use and tests.
//!
//! [`MemView`] layers the guest ABI's typed loads and stores on top: fixed
//! width integers and floats, the width-configurable default integer/pointer
//! pair, strings and zero-terminated strings. All multi-byte values are
//! little-endian.

#![forbid(unsafe_code)]

mod memory;
mod view;

pub use memory::{MemoryError, PtrWidth, VecMemory, WasmMemory};
pub use view::MemView;
