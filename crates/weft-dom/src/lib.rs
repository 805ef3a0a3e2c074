//! The `odin_dom` import group: event listener registration keyed by an
//! explicit composite identity, event records encoded into guest memory, and
//! element value access.
//!
//! Host DOM access sits behind [`DomHost`] so the adapter logic and the wire
//! layout are exercised natively against [`MockDom`]; the browser
//! implementation lives in the wasm bindings crate.

#![forbid(unsafe_code)]

mod adapter;
mod event;
mod host;
mod listeners;

pub use adapter::{DispatchTicket, Dom, DomError, EventInfo, GuestExports};
pub use event::{EventData, EventRecord, TargetCode, encode_event};
pub use host::{DomHost, ListenerToken, MockDom, MockElement};
pub use listeners::{ListenerKey, ListenerTable, ListenerTarget, Registration};
