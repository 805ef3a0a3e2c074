use weft_abi::Writer;
use weft_mem::{MemView, MemoryError, WasmMemory};

/// Whether an event's (current) target is a plain element, the document or
/// the window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum TargetCode {
    Element = 0,
    Document = 1,
    Window = 2,
}

/// Kind-specific event payload, decided once at dispatch time.
#[derive(Clone, Debug, PartialEq)]
pub enum EventData {
    Mouse {
        screen: (i64, i64),
        client: (i64, i64),
        offset: (i64, i64),
        page: (i64, i64),
        movement: (i64, i64),
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
        button: i16,
        buttons: u16,
    },
    Key {
        key: String,
        code: String,
        location: u8,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
        repeat: bool,
    },
    Wheel {
        delta: (f64, f64, f64),
        delta_mode: u32,
    },
    Scroll {
        scroll: (f64, f64),
    },
    Generic,
}

/// A host event, reconstructed into the record layout the guest expects.
#[derive(Clone, Debug, PartialEq)]
pub struct EventRecord {
    pub name_code: u32,
    pub target: TargetCode,
    pub current_target: TargetCode,
    /// Guest pointer/length of the element id, echoed back verbatim
    /// (0/0 for window-level listeners).
    pub id_ptr: u64,
    pub id_len: u64,
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

/// Inline capacity for the key/code strings of a keyboard event.
const KEY_STR_BUF: u64 = 16;

/// Encodes `record` at `ep`, reproducing the guest compiler's layout for the
/// event struct at either pointer width: fixed header, then the 8-aligned
/// kind-specific body.
pub fn encode_event<M: WasmMemory + ?Sized>(
    view: &MemView<'_, M>,
    ep: u64,
    record: &EventRecord,
) -> Result<(), MemoryError> {
    let mut w = Writer::new(view, ep);

    w.write_u32(record.name_code)?;
    w.write_u32(record.target as u32)?;
    w.write_u32(record.current_target as u32)?;

    w.write_uint(record.id_ptr)?;
    w.write_uint(record.id_len)?;
    w.write_uint(0)?; // padding

    w.write_f64(record.timestamp)?;

    w.write_u8(record.phase)?;
    let mut options = 0u8;
    if record.bubbles {
        options |= 1 << 0;
    }
    if record.cancelable {
        options |= 1 << 1;
    }
    if record.composed {
        options |= 1 << 2;
    }
    w.write_u8(options)?;
    w.write_u8(record.is_composing as u8)?;
    w.write_u8(record.is_trusted as u8)?;

    w.align_to(8);

    match &record.data {
        EventData::Mouse {
            screen,
            client,
            offset,
            page,
            movement,
            ctrl,
            shift,
            alt,
            meta,
            button,
            buttons,
        } => {
            for (x, y) in [screen, client, offset, page, movement] {
                w.write_i64(*x)?;
                w.write_i64(*y)?;
            }
            w.write_u8(*ctrl as u8)?;
            w.write_u8(*shift as u8)?;
            w.write_u8(*alt as u8)?;
            w.write_u8(*meta as u8)?;
            w.write_i16(*button)?;
            w.write_u16(*buttons)?;
        }
        EventData::Key {
            key,
            code,
            location,
            ctrl,
            shift,
            alt,
            meta,
            repeat,
        } => {
            // The guest-side string headers are assembled by the guest from
            // the length-prefixed inline buffers below; skip their slots.
            let ptr_width = view.ptr_width().size();
            w.field(ptr_width * 2, ptr_width);
            w.field(ptr_width * 2, ptr_width);

            w.write_u8(*location)?;
            w.write_u8(*ctrl as u8)?;
            w.write_u8(*shift as u8)?;
            w.write_u8(*alt as u8)?;
            w.write_u8(*meta as u8)?;
            w.write_u8(*repeat as u8)?;

            w.write_int(inline_len(key) as i64)?;
            w.write_int(inline_len(code) as i64)?;
            w.write_inline_str(key, KEY_STR_BUF)?;
            w.write_inline_str(code, KEY_STR_BUF)?;
        }
        EventData::Wheel { delta, delta_mode } => {
            w.write_f64(delta.0)?;
            w.write_f64(delta.1)?;
            w.write_f64(delta.2)?;
            w.write_u32(*delta_mode)?;
        }
        EventData::Scroll { scroll } => {
            w.write_f64(scroll.0)?;
            w.write_f64(scroll.1)?;
        }
        EventData::Generic => {}
    }

    Ok(())
}

fn inline_len(s: &str) -> u64 {
    let mut end = (s.len() as u64).min(KEY_STR_BUF) as usize;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    end as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_mem::{PtrWidth, VecMemory};

    fn base_record(data: EventData) -> EventRecord {
        EventRecord {
            name_code: 5,
            target: TargetCode::Element,
            current_target: TargetCode::Document,
            id_ptr: 0x1000,
            id_len: 6,
            timestamp: 1.25,
            phase: 2,
            bubbles: true,
            cancelable: false,
            composed: true,
            is_composing: false,
            is_trusted: true,
            data,
        }
    }

    #[test]
    fn header_layout_32bit() {
        let mem = VecMemory::new(256);
        let view = MemView::new(&mem, PtrWidth::Four);
        encode_event(&view, 0, &base_record(EventData::Generic)).unwrap();

        assert_eq!(view.load_u32(0).unwrap(), 5); // name_code
        assert_eq!(view.load_u32(4).unwrap(), 0); // target: element
        assert_eq!(view.load_u32(8).unwrap(), 1); // current target: document
        assert_eq!(view.load_u32(12).unwrap(), 0x1000);
        assert_eq!(view.load_u32(16).unwrap(), 6);
        assert_eq!(view.load_u32(20).unwrap(), 0); // padding
        assert_eq!(view.load_f64(24).unwrap(), 1.25);
        assert_eq!(view.load_u8(32).unwrap(), 2); // phase
        assert_eq!(view.load_u8(33).unwrap(), 0b101); // bubbles | composed
        assert_eq!(view.load_u8(34).unwrap(), 0);
        assert_eq!(view.load_u8(35).unwrap(), 1);
    }

    #[test]
    fn mouse_body_starts_8_aligned() {
        let mem = VecMemory::new(256);
        let view = MemView::new(&mem, PtrWidth::Four);
        let record = base_record(EventData::Mouse {
            screen: (11, -22),
            client: (33, 44),
            offset: (55, 66),
            page: (77, 88),
            movement: (-1, 1),
            ctrl: true,
            shift: false,
            alt: false,
            meta: false,
            button: -1,
            buttons: 4,
        });
        encode_event(&view, 0, &record).unwrap();

        assert_eq!(view.load_i64(40).unwrap(), 11);
        assert_eq!(view.load_i64(48).unwrap(), -22);
        assert_eq!(view.load_i64(104).unwrap(), -1); // movement.x
        assert_eq!(view.load_u8(120).unwrap(), 1); // ctrl
        assert_eq!(view.load_i16(124).unwrap(), -1); // button
        assert_eq!(view.load_u16(126).unwrap(), 4); // buttons
    }

    #[test]
    fn key_event_inline_strings_32bit() {
        let mem = VecMemory::new(256);
        let view = MemView::new(&mem, PtrWidth::Four);
        let record = base_record(EventData::Key {
            key: "ArrowLeft".to_owned(),
            code: "KeyA".to_owned(),
            location: 1,
            ctrl: false,
            shift: true,
            alt: false,
            meta: false,
            repeat: true,
        });
        encode_event(&view, 0, &record).unwrap();

        // Body at 40: two skipped 8-byte string headers, then six u8 flags.
        assert_eq!(view.load_u8(56).unwrap(), 1); // location
        assert_eq!(view.load_u8(58).unwrap(), 1); // shift
        assert_eq!(view.load_u8(61).unwrap(), 1); // repeat
        // Length slots align back to the pointer width.
        assert_eq!(view.load_i32(64).unwrap(), 9);
        assert_eq!(view.load_i32(68).unwrap(), 4);
        assert_eq!(view.load_string(72, 9).unwrap(), "ArrowLeft");
        assert_eq!(view.load_string(88, 4).unwrap(), "KeyA");
    }

    #[test]
    fn wheel_event_body() {
        let mem = VecMemory::new(256);
        let view = MemView::new(&mem, PtrWidth::Four);
        let record = base_record(EventData::Wheel {
            delta: (1.0, -120.0, 0.0),
            delta_mode: 1,
        });
        encode_event(&view, 0, &record).unwrap();
        assert_eq!(view.load_f64(40).unwrap(), 1.0);
        assert_eq!(view.load_f64(48).unwrap(), -120.0);
        assert_eq!(view.load_f64(56).unwrap(), 0.0);
        assert_eq!(view.load_u32(64).unwrap(), 1);
    }

    #[test]
    fn layout_is_width_aware() {
        let mem = VecMemory::new(256);
        let view = MemView::new(&mem, PtrWidth::Eight);
        encode_event(&view, 0, &base_record(EventData::Generic)).unwrap();

        // id_ptr/id_len/pad widen to 8 bytes each: 12 aligns to 16.
        assert_eq!(view.load_u64(16).unwrap(), 0x1000);
        assert_eq!(view.load_u64(24).unwrap(), 6);
        assert_eq!(view.load_f64(40).unwrap(), 1.25);
        assert_eq!(view.load_u8(48).unwrap(), 2);
    }
}
