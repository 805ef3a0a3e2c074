//! Guest callback plumbing for the asynchronous WebGPU operations.
//!
//! The guest passes a "function pointer" (an index into its indirect
//! function table) plus a userdata word; when the host operation settles the
//! callback is invoked through [`CallbackInvoker`] exactly once, success or
//! failure. Completion order across independent operations is
//! host-determined, not issuance order.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

/// Status codes delivered to guest callbacks. Values are part of the wire
/// contract.
pub mod status {
    pub const REQUEST_ADAPTER_SUCCESS: i32 = 0;
    pub const REQUEST_ADAPTER_UNAVAILABLE: i32 = 2;

    pub const REQUEST_DEVICE_SUCCESS: i32 = 0;
    pub const REQUEST_DEVICE_ERROR: i32 = 1;

    pub const BUFFER_MAP_SUCCESS: i32 = 0;
    pub const BUFFER_MAP_VALIDATION_ERROR: i32 = 1;
    pub const BUFFER_MAP_UNKNOWN: i32 = 2;
    pub const BUFFER_MAP_ALREADY_PENDING: i32 = 6;

    pub const QUEUE_WORK_DONE_SUCCESS: i32 = 0;

    pub const CREATE_PIPELINE_SUCCESS: i32 = 0;
    pub const CREATE_PIPELINE_UNKNOWN: i32 = 5;

    pub const COMPILATION_INFO_SUCCESS: i32 = 0;
    pub const COMPILATION_INFO_ERROR: i32 = 1;

    /// Error-type codes shared by `PopErrorScope` and the uncaptured-error
    /// callback.
    pub const ERROR_NONE: i32 = 0;
    pub const ERROR_VALIDATION: i32 = 1;
    pub const ERROR_OUT_OF_MEMORY: i32 = 2;
    pub const ERROR_INTERNAL: i32 = 3;
    pub const ERROR_UNKNOWN: i32 = 4;
}

/// A guest callback: indirect-function-table index plus userdata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GuestCallback {
    pub fnptr: u32,
    pub userdata: u64,
}

/// One argument of a guest callback invocation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CallbackArg {
    I32(i32),
    U32(u32),
    /// Pointer-width value (handles, pointers, userdata).
    Ptr(u64),
}

/// Invokes a guest function through the module's indirect function table.
pub trait CallbackInvoker {
    fn invoke(&self, fnptr: u32, args: &[CallbackArg]);
}

/// Schedules a host future; the browser implementation forwards to
/// `spawn_local`, native embedders drive futures however they choose.
pub trait Spawn {
    fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + 'static>>);
}

/// Test/native invoker capturing every invocation.
#[derive(Debug, Default)]
pub struct RecordingInvoker {
    pub calls: RefCell<Vec<(u32, Vec<CallbackArg>)>>,
}

impl RecordingInvoker {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn invocations_of(&self, fnptr: u32) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|(f, _)| *f == fnptr)
            .count()
    }
}

impl CallbackInvoker for RecordingInvoker {
    fn invoke(&self, fnptr: u32, args: &[CallbackArg]) {
        self.calls.borrow_mut().push((fnptr, args.to_vec()));
    }
}

/// Native spawner that queues futures for the embedder to drive after the
/// GPU has been polled. Mirrors how the browser defers settlement to its
/// own event loop.
#[derive(Default)]
pub struct QueueSpawner {
    queued: RefCell<Vec<Pin<Box<dyn Future<Output = ()> + 'static>>>>,
}

impl QueueSpawner {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn pending(&self) -> usize {
        self.queued.borrow().len()
    }

    /// Drains and returns the queued futures for the caller to await.
    pub fn take_all(&self) -> Vec<Pin<Box<dyn Future<Output = ()> + 'static>>> {
        std::mem::take(&mut *self.queued.borrow_mut())
    }
}

impl Spawn for QueueSpawner {
    fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + 'static>>) {
        self.queued.borrow_mut().push(future);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_invoker_counts_per_fnptr() {
        let invoker = RecordingInvoker::new();
        invoker.invoke(3, &[CallbackArg::I32(0), CallbackArg::Ptr(16)]);
        invoker.invoke(4, &[CallbackArg::I32(1)]);
        invoker.invoke(3, &[CallbackArg::I32(0)]);
        assert_eq!(invoker.invocations_of(3), 2);
        assert_eq!(invoker.invocations_of(4), 1);
        assert_eq!(invoker.invocations_of(9), 0);
    }

    #[test]
    fn queue_spawner_defers_until_taken() {
        let spawner = QueueSpawner::new();
        let invoker = RecordingInvoker::new();
        let inner = Rc::clone(&invoker);
        spawner.spawn(Box::pin(async move {
            inner.invoke(7, &[CallbackArg::I32(0)]);
        }));

        assert_eq!(spawner.pending(), 1);
        assert_eq!(invoker.invocations_of(7), 0);
        for fut in spawner.take_all() {
            pollster::block_on(fut);
        }
        assert_eq!(invoker.invocations_of(7), 1);
        assert_eq!(spawner.pending(), 0);
    }
}
