use weft_mem::{MemView, MemoryError, WasmMemory};

use crate::event::{EventData, EventRecord, TargetCode, encode_event};
use crate::host::DomHost;
use crate::listeners::{ListenerKey, ListenerTable, ListenerTarget, Registration};

#[derive(Debug, thiserror::Error)]
pub enum DomError {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("init_event_raw called outside an event dispatch")]
    NoActiveEvent,
}

/// Exported guest entry points the DOM group calls back into. Callbacks
/// re-enter the module through its exported dispatcher rather than the
/// indirect function table: the dispatcher pairs the callback pointer with
/// the guest-side context.
pub trait GuestExports {
    fn default_context_ptr(&self) -> u64;
    fn do_event_callback(&self, data: u64, callback: u64, ctx: u64);
}

/// Host event description handed to [`Dom::dispatch`], already narrowed to
/// one [`EventData`] variant by the host layer.
#[derive(Clone, Debug)]
pub struct EventInfo {
    pub target: TargetCode,
    pub current_target: TargetCode,
    /// Seconds since time origin.
    pub timestamp: f64,
    pub phase: u8,
    pub bubbles: bool,
    pub cancelable: bool,
    pub composed: bool,
    pub is_composing: bool,
    pub is_trusted: bool,
    pub data: EventData,
}

impl Default for EventInfo {
    fn default() -> Self {
        Self {
            target: TargetCode::Element,
            current_target: TargetCode::Element,
            timestamp: 0.0,
            phase: 0,
            bubbles: false,
            cancelable: false,
            composed: false,
            is_composing: false,
            is_trusted: true,
            data: EventData::Generic,
        }
    }
}

/// Guest callback pair returned by [`Dom::begin_dispatch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchTicket {
    pub data: u64,
    pub callback: u64,
}

/// Adapter for the `odin_dom` import namespace.
#[derive(Debug)]
pub struct Dom<H> {
    host: H,
    listeners: ListenerTable,
    /// Event currently being dispatched; `init_event_raw` encodes it into
    /// guest memory on demand and it dies with the dispatch.
    current_event: Option<EventRecord>,
}

impl<H: DomHost> Dom<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            listeners: ListenerTable::new(),
            current_event: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn listeners(&self) -> &ListenerTable {
        &self.listeners
    }

    /// `add_event_listener(id, name, name_code, data, callback, capture)`;
    /// false when the element does not exist.
    #[allow(clippy::too_many_arguments)]
    pub fn add_event_listener<M: WasmMemory + ?Sized>(
        &mut self,
        view: &MemView<'_, M>,
        id_ptr: u64,
        id_len: u64,
        name_ptr: u64,
        name_len: u64,
        name_code: u32,
        data: u64,
        callback: u64,
        use_capture: bool,
    ) -> Result<bool, DomError> {
        let id = view.load_string(id_ptr, id_len as usize)?;
        let name = view.load_string(name_ptr, name_len as usize)?;
        let target = ListenerTarget::Element(id);

        let Some(token) = self.host.add_listener(&target, &name, use_capture) else {
            return Ok(false);
        };

        let key = ListenerKey {
            target,
            name,
            data,
            callback,
        };
        let registration = Registration {
            token,
            capture: use_capture,
            name_code,
            id_ptr,
            id_len,
        };
        if let Some(old) = self.listeners.insert(key, registration) {
            self.host.remove_listener(old.token);
        }
        Ok(true)
    }

    pub fn remove_event_listener<M: WasmMemory + ?Sized>(
        &mut self,
        view: &MemView<'_, M>,
        id_ptr: u64,
        id_len: u64,
        name_ptr: u64,
        name_len: u64,
        data: u64,
        callback: u64,
    ) -> Result<bool, DomError> {
        let id = view.load_string(id_ptr, id_len as usize)?;
        let name = view.load_string(name_ptr, name_len as usize)?;
        let key = ListenerKey {
            target: ListenerTarget::Element(id),
            name,
            data,
            callback,
        };
        Ok(self.detach(&key))
    }

    pub fn add_window_event_listener<M: WasmMemory + ?Sized>(
        &mut self,
        view: &MemView<'_, M>,
        name_ptr: u64,
        name_len: u64,
        name_code: u32,
        data: u64,
        callback: u64,
        use_capture: bool,
    ) -> Result<bool, DomError> {
        let name = view.load_string(name_ptr, name_len as usize)?;

        let Some(token) = self
            .host
            .add_listener(&ListenerTarget::Window, &name, use_capture)
        else {
            return Ok(false);
        };

        let key = ListenerKey {
            target: ListenerTarget::Window,
            name,
            data,
            callback,
        };
        let registration = Registration {
            token,
            capture: use_capture,
            name_code,
            id_ptr: 0,
            id_len: 0,
        };
        if let Some(old) = self.listeners.insert(key, registration) {
            self.host.remove_listener(old.token);
        }
        Ok(true)
    }

    pub fn remove_window_event_listener<M: WasmMemory + ?Sized>(
        &mut self,
        view: &MemView<'_, M>,
        name_ptr: u64,
        name_len: u64,
        data: u64,
        callback: u64,
    ) -> Result<bool, DomError> {
        let name = view.load_string(name_ptr, name_len as usize)?;
        let key = ListenerKey {
            target: ListenerTarget::Window,
            name,
            data,
            callback,
        };
        Ok(self.detach(&key))
    }

    fn detach(&mut self, key: &ListenerKey) -> bool {
        match self.listeners.remove(key) {
            Some(registration) => {
                self.host.remove_listener(registration.token);
                true
            }
            None => false,
        }
    }

    /// Stages a host event for `token` and returns the guest callback pair
    /// to invoke. Returns `None` for an unknown token (listener already
    /// removed), in which case the event is dropped.
    ///
    /// The caller must release its borrow of this adapter before re-entering
    /// the guest — the callback synchronously calls back into
    /// [`Dom::init_event_raw`] — and call [`Dom::end_dispatch`] afterwards:
    ///
    /// ```ignore
    /// if let Some(ticket) = dom.begin_dispatch(token, info) {
    ///     let ctx = exports.default_context_ptr();
    ///     exports.do_event_callback(ticket.data, ticket.callback, ctx);
    ///     dom.end_dispatch();
    /// }
    /// ```
    pub fn begin_dispatch(
        &mut self,
        token: crate::host::ListenerToken,
        info: EventInfo,
    ) -> Option<DispatchTicket> {
        let Some((key, registration)) = self.listeners.get_by_token(token) else {
            tracing::debug!(token = token.0, "event for removed listener dropped");
            return None;
        };
        let ticket = DispatchTicket {
            data: key.data,
            callback: key.callback,
        };

        self.current_event = Some(EventRecord {
            name_code: registration.name_code,
            target: info.target,
            current_target: info.current_target,
            id_ptr: registration.id_ptr,
            id_len: registration.id_len,
            timestamp: info.timestamp,
            phase: info.phase,
            bubbles: info.bubbles,
            cancelable: info.cancelable,
            composed: info.composed,
            is_composing: info.is_composing,
            is_trusted: info.is_trusted,
            data: info.data,
        });
        Some(ticket)
    }

    /// Drops the staged event once the guest callback has returned.
    pub fn end_dispatch(&mut self) {
        self.current_event = None;
    }

    /// `init_event_raw(ep)`: encodes the in-flight event at the
    /// guest-supplied pointer.
    pub fn init_event_raw<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        ep: u64,
    ) -> Result<(), DomError> {
        let record = self.current_event.as_ref().ok_or(DomError::NoActiveEvent)?;
        encode_event(view, ep, record)?;
        Ok(())
    }

    pub fn event_stop_propagation(&mut self) {
        if self.current_event.is_some() {
            self.host.stop_propagation();
        }
    }

    pub fn event_stop_immediate_propagation(&mut self) {
        if self.current_event.is_some() {
            self.host.stop_immediate_propagation();
        }
    }

    pub fn event_prevent_default(&mut self) {
        if self.current_event.is_some() {
            self.host.prevent_default();
        }
    }

    pub fn get_element_value_f64<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        id_ptr: u64,
        id_len: u64,
    ) -> Result<f64, DomError> {
        let id = view.load_string(id_ptr, id_len as usize)?;
        Ok(self.host.get_element_value_f64(&id).unwrap_or(0.0))
    }

    /// Copies the element value into the caller's buffer, capped at
    /// `buf_len` bytes; returns the number of bytes written. A null or
    /// empty buffer writes nothing and returns 0.
    pub fn get_element_value_string<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        id_ptr: u64,
        id_len: u64,
        buf_ptr: u64,
        buf_len: u64,
    ) -> Result<u64, DomError> {
        let id = view.load_string(id_ptr, id_len as usize)?;
        let Some(value) = self.host.get_element_value_string(&id) else {
            return Ok(0);
        };
        if buf_ptr == 0 || buf_len == 0 {
            return Ok(0);
        }

        let mut end = (buf_len as usize).min(value.len());
        while end > 0 && !value.is_char_boundary(end) {
            end -= 1;
        }
        view.store_bytes(buf_ptr, &value.as_bytes()[..end])?;
        Ok(end as u64)
    }

    /// Stores the element's min/max into a guest `[2]f64`.
    pub fn get_element_min_max<M: WasmMemory + ?Sized>(
        &self,
        view: &MemView<'_, M>,
        dst_ptr: u64,
        id_ptr: u64,
        id_len: u64,
    ) -> Result<(), DomError> {
        let id = view.load_string(id_ptr, id_len as usize)?;
        let (min, max) = self.host.get_element_min_max(&id).unwrap_or((0.0, 0.0));
        view.store_f64(dst_ptr, min)?;
        view.store_f64(dst_ptr + 8, max)?;
        Ok(())
    }

    pub fn set_element_value_f64<M: WasmMemory + ?Sized>(
        &mut self,
        view: &MemView<'_, M>,
        id_ptr: u64,
        id_len: u64,
        value: f64,
    ) -> Result<(), DomError> {
        let id = view.load_string(id_ptr, id_len as usize)?;
        self.host.set_element_value_f64(&id, value);
        Ok(())
    }

    pub fn set_element_value_string<M: WasmMemory + ?Sized>(
        &mut self,
        view: &MemView<'_, M>,
        id_ptr: u64,
        id_len: u64,
        value_ptr: u64,
        value_len: u64,
    ) -> Result<(), DomError> {
        let id = view.load_string(id_ptr, id_len as usize)?;
        let value = view.load_string(value_ptr, value_len as usize)?;
        self.host.set_element_value_string(&id, &value);
        Ok(())
    }
}
