//! Cross-crate scenarios: guest-visible behavior assembled from the memory
//! view, decoders, handle tables and adapters together.

use weft_abi::Cursor;
use weft_dom::{Dom, EventData, EventInfo, MockDom, MockElement};
use weft_env::{Env, StdStream, SystemHost, VecSink};
use weft_handles::HandleTable;
use weft_mem::{MemView, PtrWidth, VecMemory};
use weft_webgl::{RecordingGl, WebGl, GL_INFO_LOG_LENGTH};

fn store(view: &MemView<'_, VecMemory>, addr: u64, text: &str) -> (u64, u64) {
    let n = view.store_string(addr, text).unwrap();
    (addr, n as u64)
}

#[test]
fn interleaved_console_streams_keep_line_boundaries() {
    let mem = VecMemory::new(1024);
    let view = MemView::new(&mem, PtrWidth::Four);
    let mut env = Env::new(SystemHost::new(), VecSink::default());

    let (p1, n1) = store(&view, 0, "loading ");
    let (p2, n2) = store(&view, 64, "warning: slow path\n");
    let (p3, n3) = store(&view, 128, "done\n");

    env.write(&view, 1, p1, n1).unwrap();
    env.write(&view, 2, p2, n2).unwrap();
    env.write(&view, 1, p3, n3).unwrap();

    assert_eq!(
        env.console().sink().lines,
        vec![
            // Switching to stderr flushed the stdout partial.
            (StdStream::Stdout, "loading ".to_owned()),
            (StdStream::Stderr, "warning: slow path".to_owned()),
            (StdStream::Stdout, "done".to_owned()),
        ]
    );
}

#[test]
fn handle_lifecycle_follows_the_foreign_contract() {
    let mut table = HandleTable::new("buffer");

    let a = table.create("a");
    let b = table.create("b");
    assert_eq!((a, b), (1, 2));

    assert!(table.release(a).is_some());
    // Freed integers are never handed out again.
    let c = table.create("c");
    assert_eq!(c, 3);
    assert!(!table.contains(a));

    table.reference(b);
    assert!(table.release(b).is_none());
    assert!(table.contains(b));
    assert!(table.release(b).is_some());
    assert!(!table.contains(b));
}

#[test]
fn info_log_probe_then_fill_agrees_with_direct_decode() {
    let mem = VecMemory::new(512);
    let view = MemView::new(&mem, PtrWidth::Four);
    let mut gl = WebGl::new(RecordingGl::webgl2());

    let shader = gl.create_shader(0x8B31);
    let log = "ERROR: 2:7: unexpected token";
    gl.ctx_mut().shader_logs.insert(1, log.to_owned());

    // Probe with no buffer: only the required length comes back.
    gl.get_shader_iv(&view, shader, GL_INFO_LOG_LENGTH, 64).unwrap();
    let required = view.load_int(64).unwrap();
    assert_eq!(required, log.len() as i64 + 1);

    // Fill with a buffer of exactly the probed size.
    gl.get_shader_info_log(&view, shader, 128, required as u64, 72)
        .unwrap();
    let written = view.load_int(72).unwrap() as usize;
    assert_eq!(view.load_string(128, written).unwrap(), log);
}

#[test]
fn event_record_round_trips_through_the_cursor() {
    for width in [PtrWidth::Four, PtrWidth::Eight] {
        let mem = VecMemory::new(512);
        let view = MemView::new(&mem, width);
        let mut dom = Dom::new(MockDom::new().with_element("canvas", MockElement::default()));

        let (idp, idl) = store(&view, 0, "canvas");
        let (np, nl) = store(&view, 32, "wheel");
        dom.add_event_listener(&view, idp, idl, np, nl, 9, 0x40, 0x50, false)
            .unwrap();
        let token = *dom.host().attached.keys().next().unwrap();

        let info = EventInfo {
            timestamp: 2.5,
            bubbles: true,
            cancelable: true,
            data: EventData::Wheel {
                delta: (0.0, -53.0, 0.0),
                delta_mode: 0,
            },
            ..EventInfo::default()
        };
        dom.begin_dispatch(token, info).unwrap();
        dom.init_event_raw(&view, 256).unwrap();
        dom.end_dispatch();

        // The guest reads the record back with the same running-offset
        // rules the encoder used.
        let mut cur = Cursor::new(&view, 256);
        assert_eq!(cur.read_u32().unwrap(), 9); // name code
        assert_eq!(cur.read_u32().unwrap(), 0); // target: element
        assert_eq!(cur.read_u32().unwrap(), 0);
        assert_eq!(cur.read_uint().unwrap(), idp);
        assert_eq!(cur.read_uint().unwrap(), idl);
        cur.read_uint().unwrap(); // padding
        assert_eq!(cur.read_f64().unwrap(), 2.5);
        assert_eq!(cur.read_u8().unwrap(), 0); // phase
        assert_eq!(cur.read_u8().unwrap(), 0b11); // bubbles | cancelable
        cur.read_u8().unwrap();
        assert_eq!(cur.read_u8().unwrap(), 1); // trusted
        cur.align_to(8);
        assert_eq!(cur.read_f64().unwrap(), 0.0); // delta x
        assert_eq!(cur.read_f64().unwrap(), -53.0); // delta y
    }
}

#[test]
fn sixty_four_bit_values_survive_the_boundary() {
    let mem = VecMemory::new(64);
    let view = MemView::new(&mem, PtrWidth::Four);

    for value in [0u64, 1 << 20, (1 << 53) + 987, u64::MAX - 3] {
        view.store_u64(8, value).unwrap();
        assert_eq!(view.load_u64(8).unwrap(), value);
    }

    let text = "grüße, wörld ✓";
    let count = view.store_string(16, text).unwrap();
    assert!(count > text.chars().count());
    assert_eq!(view.load_string(16, count).unwrap(), text);
}
