//! Browser bindings: wires the import namespaces to the live page.
//!
//! Everything meaningful here requires the browser, so the implementation is
//! gated to wasm32; on other targets this crate is intentionally empty.
//! The runtime is a thread-local singleton (the guest module is too), and
//! the import object handed to `WebAssembly.instantiate` closes over it.

#![forbid(unsafe_code)]

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;
