use std::cell::{Ref, RefCell, RefMut};

/// Width of the guest's default integer and pointer types, fixed once at
/// setup. Must match what the guest module was compiled for, or every offset
/// computation downstream silently corrupts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PtrWidth {
    Four,
    Eight,
}

impl PtrWidth {
    pub const fn size(self) -> u64 {
        match self {
            PtrWidth::Four => 4,
            PtrWidth::Eight => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("linear memory access out of bounds: addr=0x{addr:x}, len=0x{len:x}")]
pub struct MemoryError {
    pub addr: u64,
    pub len: usize,
}

/// Byte-level access to guest linear memory.
///
/// Implementations take `&self`: the browser backing is external mutable
/// state, and the native backing uses interior mutability so a single
/// memory can be shared between the import namespaces that borrow it.
pub trait WasmMemory {
    fn read(&self, addr: u64, dst: &mut [u8]) -> Result<(), MemoryError>;
    fn write(&self, addr: u64, src: &[u8]) -> Result<(), MemoryError>;

    /// Current size of the memory in bytes. May grow between calls.
    fn size(&self) -> u64;
}

/// Contiguous in-memory implementation backed by a `Vec<u8>`.
#[derive(Clone, Debug, Default)]
pub struct VecMemory {
    bytes: RefCell<Vec<u8>>,
}

impl VecMemory {
    pub fn new(size_bytes: usize) -> Self {
        Self {
            bytes: RefCell::new(vec![0u8; size_bytes]),
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes: RefCell::new(bytes),
        }
    }

    /// Appends `extra` zero bytes, modelling `memory.grow`.
    pub fn grow(&self, extra: usize) {
        let mut bytes = self.bytes.borrow_mut();
        let new_len = bytes.len() + extra;
        bytes.resize(new_len, 0);
    }

    /// Zero-copy window onto the whole backing store. Invalidated by
    /// [`VecMemory::grow`]; do not hold across calls that may grow.
    pub fn as_slice(&self) -> Ref<'_, [u8]> {
        Ref::map(self.bytes.borrow(), |v| v.as_slice())
    }

    pub fn as_mut_slice(&self) -> RefMut<'_, [u8]> {
        RefMut::map(self.bytes.borrow_mut(), |v| v.as_mut_slice())
    }

    fn range(&self, addr: u64, len: usize) -> Result<(usize, usize), MemoryError> {
        let start = usize::try_from(addr).map_err(|_| MemoryError { addr, len })?;
        let end = start.checked_add(len).ok_or(MemoryError { addr, len })?;
        Ok((start, end))
    }
}

impl WasmMemory for VecMemory {
    fn read(&self, addr: u64, dst: &mut [u8]) -> Result<(), MemoryError> {
        let (start, end) = self.range(addr, dst.len())?;
        let bytes = self.bytes.borrow();
        let slice = bytes.get(start..end).ok_or(MemoryError {
            addr,
            len: dst.len(),
        })?;
        dst.copy_from_slice(slice);
        Ok(())
    }

    fn write(&self, addr: u64, src: &[u8]) -> Result<(), MemoryError> {
        let (start, end) = self.range(addr, src.len())?;
        let mut bytes = self.bytes.borrow_mut();
        let slice = bytes.get_mut(start..end).ok_or(MemoryError {
            addr,
            len: src.len(),
        })?;
        slice.copy_from_slice(src);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.bytes.borrow().len() as u64
    }
}

impl<M: WasmMemory + ?Sized> WasmMemory for &M {
    fn read(&self, addr: u64, dst: &mut [u8]) -> Result<(), MemoryError> {
        (**self).read(addr, dst)
    }

    fn write(&self, addr: u64, src: &[u8]) -> Result<(), MemoryError> {
        (**self).write(addr, src)
    }

    fn size(&self) -> u64 {
        (**self).size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_read_reports_addr_and_len() {
        let mem = VecMemory::new(16);
        let mut buf = [0u8; 8];
        let err = mem.read(12, &mut buf).unwrap_err();
        assert_eq!(err, MemoryError { addr: 12, len: 8 });
    }

    #[test]
    fn grow_extends_with_zeroes() {
        let mem = VecMemory::from_bytes(vec![0xff; 4]);
        mem.grow(4);
        assert_eq!(mem.size(), 8);
        assert_eq!(&mem.as_slice()[4..], &[0, 0, 0, 0]);
    }
}
