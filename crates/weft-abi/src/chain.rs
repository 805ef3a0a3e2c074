use weft_mem::{MemView, WasmMemory};

use crate::DecodeError;

/// A decoded "next in chain" header: extension descriptors carry a small
/// header (next pointer + 32-bit struct-type tag) before their payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainedStruct {
    /// Struct-type tag identifying the extension.
    pub stype: u32,
    /// Address of the payload, immediately after the aligned header.
    pub payload: u64,
    /// Next link in the chain, if any.
    pub next: u64,
}

/// Reads the optional chain pointer at `addr` and decodes the pointee's
/// header. Returns `None` for a null pointer (no extensions).
pub fn read_chained<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    addr: u64,
) -> Result<Option<ChainedStruct>, DecodeError> {
    let base = view.load_ptr(addr)?;
    if base == 0 {
        return Ok(None);
    }

    let w = view.ptr_width().size();
    let next = view.load_ptr(base)?;
    let stype = view.load_u32(base + w)?;
    // Header is (pointer, u32) padded out to pointer alignment.
    let header = (w + 4).next_multiple_of(w);

    Ok(Some(ChainedStruct {
        stype,
        payload: base + header,
        next,
    }))
}

impl ChainedStruct {
    /// Fails unless the tag matches the single extension type a decoder
    /// accepts at this position.
    pub fn expect(self, stype: u32) -> Result<Self, DecodeError> {
        if self.stype != stype {
            return Err(DecodeError::UnexpectedChainType {
                expected: stype,
                found: self.stype,
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_mem::{PtrWidth, VecMemory};

    #[test]
    fn null_chain_is_absent() {
        let mem = VecMemory::new(16);
        let view = MemView::new(&mem, PtrWidth::Four);
        assert_eq!(read_chained(&view, 0).unwrap(), None);
        assert_eq!(read_chained(&view, 8).unwrap(), None);
    }

    #[test]
    fn chain_header_payload_is_width_dependent() {
        let mem = VecMemory::new(128);

        let v4 = MemView::new(&mem, PtrWidth::Four);
        v4.store_ptr(0, 32).unwrap();
        v4.store_ptr(32, 0).unwrap(); // next
        v4.store_u32(36, 6).unwrap(); // stype
        let chained = read_chained(&v4, 0).unwrap().unwrap();
        assert_eq!(chained.stype, 6);
        assert_eq!(chained.payload, 40);

        let v8 = MemView::new(&mem, PtrWidth::Eight);
        v8.store_ptr(64, 80).unwrap();
        v8.store_ptr(80, 0).unwrap();
        v8.store_u32(88, 4).unwrap();
        let chained = read_chained(&v8, 64).unwrap().unwrap();
        assert_eq!(chained.stype, 4);
        assert_eq!(chained.payload, 96);
    }

    #[test]
    fn expect_rejects_mismatched_tag() {
        let chained = ChainedStruct {
            stype: 7,
            payload: 0x40,
            next: 0,
        };
        assert!(chained.expect(7).is_ok());
        let err = ChainedStruct {
            stype: 7,
            payload: 0x40,
            next: 0,
        }
        .expect(6)
        .unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnexpectedChainType {
                expected: 6,
                found: 7
            }
        );
    }
}
