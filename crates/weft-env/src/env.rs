use std::time::Instant;

use weft_mem::{MemView, MemoryError, WasmMemory};

use crate::console::{ConsoleSink, ConsoleWriter, StdStream};

#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("invalid fd {fd} passed to 'write': {text:?}")]
    InvalidFd { fd: i32, text: String },

    #[error("guest executed trap")]
    Trap,

    #[error("guest aborted")]
    Abort,

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("entropy source failed: {0}")]
    Entropy(getrandom::Error),
}

/// Host services the environment group defers to: user-facing alerts,
/// host-side script evaluation and the two clocks.
pub trait EnvHost {
    fn alert(&mut self, message: &str);

    fn evaluate(&mut self, code: &str);

    /// Wall-clock time in nanoseconds since the Unix epoch.
    fn time_now_ns(&self) -> i64;

    /// Monotonic tick in nanoseconds since an arbitrary origin.
    fn tick_now_ns(&self) -> i64;
}

/// Native [`EnvHost`] over the system clocks. Alerts and evaluation have no
/// host surface outside a browser and are logged instead.
#[derive(Debug)]
pub struct SystemHost {
    origin: Instant,
}

impl SystemHost {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemHost {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvHost for SystemHost {
    fn alert(&mut self, message: &str) {
        tracing::info!(message, "guest alert");
    }

    fn evaluate(&mut self, code: &str) {
        tracing::warn!(code, "guest evaluate ignored outside a browser host");
    }

    fn time_now_ns(&self) -> i64 {
        match std::time::SystemTime::UNIX_EPOCH.elapsed() {
            Ok(elapsed) => elapsed.as_nanos() as i64,
            Err(_) => 0,
        }
    }

    fn tick_now_ns(&self) -> i64 {
        self.origin.elapsed().as_nanos() as i64
    }
}

/// Adapter for the `odin_env` import namespace.
#[derive(Debug)]
pub struct Env<H, S> {
    host: H,
    console: ConsoleWriter<S>,
}

impl<H: EnvHost, S: ConsoleSink> Env<H, S> {
    pub fn new(host: H, sink: S) -> Self {
        Self {
            host,
            console: ConsoleWriter::new(sink),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn console(&self) -> &ConsoleWriter<S> {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut ConsoleWriter<S> {
        &mut self.console
    }

    /// `write(fd, ptr, len)`: fd 1 is stdout-like, fd 2 stderr-like;
    /// anything else is an FFI-contract error.
    pub fn write<M: WasmMemory + ?Sized>(
        &mut self,
        view: &MemView<'_, M>,
        fd: i32,
        ptr: u64,
        len: u64,
    ) -> Result<(), EnvError> {
        let text = view.load_string(ptr, len as usize)?;
        let stream = StdStream::from_fd(fd).ok_or(EnvError::InvalidFd { fd, text: text.clone() })?;
        self.console.write(stream, &text);
        Ok(())
    }

    pub fn trap(&self) -> EnvError {
        EnvError::Trap
    }

    pub fn abort(&mut self) -> EnvError {
        self.console.flush();
        EnvError::Abort
    }

    pub fn alert<M: WasmMemory + ?Sized>(
        &mut self,
        view: &MemView<'_, M>,
        ptr: u64,
        len: u64,
    ) -> Result<(), EnvError> {
        let message = view.load_string(ptr, len as usize)?;
        self.host.alert(&message);
        Ok(())
    }

    pub fn evaluate<M: WasmMemory + ?Sized>(
        &mut self,
        view: &MemView<'_, M>,
        ptr: u64,
        len: u64,
    ) -> Result<(), EnvError> {
        let code = view.load_string(ptr, len as usize)?;
        self.host.evaluate(&code);
        Ok(())
    }

    pub fn time_now(&self) -> i64 {
        self.host.time_now_ns()
    }

    pub fn tick_now(&self) -> i64 {
        self.host.tick_now_ns()
    }

    /// The browser host has no way to block; sleeping is a no-op there and
    /// everywhere else for parity.
    pub fn time_sleep(&self, duration_ms: i64) {
        if duration_ms > 0 {
            tracing::trace!(duration_ms, "time_sleep ignored");
        }
    }

    /// Fills `len` guest bytes at `ptr` from the host CSPRNG.
    pub fn rand_bytes<M: WasmMemory + ?Sized>(
        &mut self,
        view: &MemView<'_, M>,
        ptr: u64,
        len: u64,
    ) -> Result<(), EnvError> {
        let mut buf = vec![0u8; len as usize];
        getrandom::getrandom(&mut buf).map_err(EnvError::Entropy)?;
        view.store_bytes(ptr, &buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::VecSink;
    use weft_mem::{PtrWidth, VecMemory};

    fn env() -> Env<SystemHost, VecSink> {
        Env::new(SystemHost::new(), VecSink::default())
    }

    fn store(view: &MemView<'_, VecMemory>, addr: u64, text: &str) -> (u64, u64) {
        let n = view.store_string(addr, text).unwrap();
        (addr, n as u64)
    }

    #[test]
    fn write_routes_fds_to_streams() {
        let mem = VecMemory::new(256);
        let view = MemView::new(&mem, PtrWidth::Four);
        let mut env = env();

        let (p, n) = store(&view, 0, "hello\n");
        env.write(&view, 1, p, n).unwrap();
        let (p, n) = store(&view, 64, "oops\n");
        env.write(&view, 2, p, n).unwrap();

        assert_eq!(
            env.console().sink().lines,
            vec![
                (StdStream::Stdout, "hello".to_owned()),
                (StdStream::Stderr, "oops".to_owned()),
            ]
        );
    }

    #[test]
    fn write_rejects_unknown_fd() {
        let mem = VecMemory::new(64);
        let view = MemView::new(&mem, PtrWidth::Four);
        let mut env = env();
        let (p, n) = store(&view, 0, "x");
        assert!(matches!(
            env.write(&view, 3, p, n),
            Err(EnvError::InvalidFd { fd: 3, .. })
        ));
    }

    #[test]
    fn rand_bytes_fills_guest_memory() {
        let mem = VecMemory::new(64);
        let view = MemView::new(&mem, PtrWidth::Four);
        let mut env = env();
        env.rand_bytes(&view, 8, 32).unwrap();
        // 32 random bytes are all-zero with probability 2^-256.
        assert!(view.load_bytes(8, 32).unwrap().iter().any(|&b| b != 0));
    }

    #[test]
    fn clocks_are_sane() {
        let env = env();
        assert!(env.time_now() > 0);
        let a = env.tick_now();
        let b = env.tick_now();
        assert!(b >= a);
    }
}
