#![cfg(not(target_arch = "wasm32"))]

use proptest::prelude::*;
use weft_mem::{MemView, PtrWidth, VecMemory};

proptest! {
    #[test]
    fn u64_roundtrip(value in any::<u64>(), offset in 0u64..56) {
        let mem = VecMemory::new(64);
        let view = MemView::new(&mem, PtrWidth::Four);
        view.store_u64(offset, value).unwrap();
        prop_assert_eq!(view.load_u64(offset).unwrap(), value);
    }

    #[test]
    fn i64_roundtrip(value in any::<i64>()) {
        let mem = VecMemory::new(16);
        let view = MemView::new(&mem, PtrWidth::Eight);
        view.store_i64(0, value).unwrap();
        prop_assert_eq!(view.load_i64(0).unwrap(), value);
    }

    #[test]
    fn f64_roundtrip(value in any::<f64>()) {
        let mem = VecMemory::new(16);
        let view = MemView::new(&mem, PtrWidth::Four);
        view.store_f64(0, value).unwrap();
        let back = view.load_f64(0).unwrap();
        prop_assert_eq!(back.to_bits(), value.to_bits());
    }

    #[test]
    fn string_roundtrip(text in "\\PC{0,64}") {
        let mem = VecMemory::new(512);
        let view = MemView::new(&mem, PtrWidth::Four);
        let n = view.store_string(16, &text).unwrap();
        prop_assert_eq!(n, text.len());
        prop_assert_eq!(view.load_string(16, n).unwrap(), text);
    }

    #[test]
    fn fixed_width_loads_never_panic(addr in any::<u64>()) {
        let mem = VecMemory::new(32);
        let view = MemView::new(&mem, PtrWidth::Four);
        let _ = view.load_u32(addr);
        let _ = view.load_u64(addr);
        let _ = view.load_f64(addr);
    }
}
