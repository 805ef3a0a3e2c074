//! Decoding of C-layout guest structs from linear memory.
//!
//! Decoders do not hardcode per-width field offsets. [`Cursor`] and
//! [`Writer`] advance a running offset by `(size, alignment)` pairs with
//! automatic alignment padding, so one decoder body serves both the 4- and
//! 8-byte pointer-width targets.
//!
//! The module also carries the cross-cutting wire conventions: optional
//! pointer fields (`0` means absent), `(count, base)` array-of-struct
//! fields, `(ptr, len)` string headers, chained descriptor headers with a
//! 32-bit struct-type tag, and the all-ones "limit not specified" sentinels.

#![forbid(unsafe_code)]

mod chain;
mod cursor;

pub use chain::{ChainedStruct, read_chained};
pub use cursor::{Cursor, Writer};

use weft_mem::{MemView, MemoryError, WasmMemory};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("array of {count} elements has null base pointer")]
    NullArrayBase { count: u64 },

    #[error("unknown {name} value {value}")]
    UnknownEnum { name: &'static str, value: u32 },

    #[error("chained struct has type tag {found}, expected {expected}")]
    UnexpectedChainType { expected: u32, found: u32 },

    #[error("descriptor pointer for {0} is null")]
    NullDescriptor(&'static str),
}

/// All-ones sentinel for "caller did not specify" in 32-bit limit fields.
pub const LIMIT_U32_UNDEFINED: u32 = u32::MAX;

/// All-ones sentinel for "caller did not specify" in 64-bit limit fields
/// (both words all-ones).
pub const LIMIT_U64_UNDEFINED: u64 = u64::MAX;

/// Translates the all-ones sentinel to "absent" rather than the literal
/// maximum integer.
pub fn limit_u32(value: u32) -> Option<u32> {
    (value != LIMIT_U32_UNDEFINED).then_some(value)
}

pub fn limit_u64(value: u64) -> Option<u64> {
    (value != LIMIT_U64_UNDEFINED).then_some(value)
}

/// Decodes a `(count, base)` array-of-struct field: applies a fixed
/// per-element stride and invokes `element` once per index.
///
/// `count == 0` yields an empty vector without dereferencing `base`, which
/// may legitimately be 0 in that case; a null base with a non-zero count is
/// a decode error.
pub fn decode_array<T, F>(
    count: u64,
    base: u64,
    stride: u64,
    mut element: F,
) -> Result<Vec<T>, DecodeError>
where
    F: FnMut(u64) -> Result<T, DecodeError>,
{
    if count == 0 {
        return Ok(Vec::new());
    }
    if base == 0 {
        return Err(DecodeError::NullArrayBase { count });
    }

    let mut out = Vec::with_capacity(count.min(1024) as usize);
    let mut addr = base;
    for _ in 0..count {
        out.push(element(addr)?);
        addr += stride;
    }
    Ok(out)
}

/// Reads an optional struct pointer field: `0` means "absent/default", any
/// other value is the base address of the pointee.
pub fn read_opt_ptr<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    addr: u64,
) -> Result<Option<u64>, DecodeError> {
    let ptr = view.load_ptr(addr)?;
    Ok((ptr != 0).then_some(ptr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_mem::{PtrWidth, VecMemory};

    #[test]
    fn zero_count_array_ignores_null_base() {
        let out: Vec<u32> =
            decode_array(0, 0, 8, |_| panic!("must not decode")).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn zero_count_array_ignores_dangling_base() {
        // A dangling base must not be dereferenced either when count == 0.
        let out: Vec<u32> =
            decode_array(0, 0xdead_0000, 8, |_| panic!("must not decode"))
                .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn null_base_with_elements_is_an_error() {
        let err = decode_array(3, 0, 8, |_| Ok(())).unwrap_err();
        assert_eq!(err, DecodeError::NullArrayBase { count: 3 });
    }

    #[test]
    fn array_applies_stride_per_element() {
        let mem = VecMemory::new(64);
        let view = MemView::new(&mem, PtrWidth::Four);
        for i in 0..4u32 {
            view.store_u32(16 + u64::from(i) * 12, i * 100).unwrap();
        }

        let out = decode_array(4, 16, 12, |addr| {
            Ok(view.load_u32(addr)?)
        })
        .unwrap();
        assert_eq!(out, vec![0, 100, 200, 300]);
    }

    #[test]
    fn limit_sentinels_decode_to_absent() {
        assert_eq!(limit_u32(0xffff_ffff), None);
        assert_eq!(limit_u32(0xffff_fffe), Some(0xffff_fffe));
        assert_eq!(limit_u64(u64::MAX), None);
        assert_eq!(limit_u64(u64::MAX - 1), Some(u64::MAX - 1));
        assert_eq!(limit_u64(0), Some(0));
    }

    #[test]
    fn opt_ptr_null_is_absent() {
        let mem = VecMemory::new(16);
        let view = MemView::new(&mem, PtrWidth::Four);
        assert_eq!(read_opt_ptr(&view, 0).unwrap(), None);
        view.store_ptr(4, 0x100).unwrap();
        assert_eq!(read_opt_ptr(&view, 4).unwrap(), Some(0x100));
    }
}
