use weft_dom::{
    Dom, DomError, EventData, EventInfo, ListenerToken, MockDom, MockElement, TargetCode,
};
use weft_mem::{MemView, PtrWidth, VecMemory};

fn store(view: &MemView<'_, VecMemory>, addr: u64, text: &str) -> (u64, u64) {
    let n = view.store_string(addr, text).unwrap();
    (addr, n as u64)
}

fn dom_with_canvas() -> Dom<MockDom> {
    Dom::new(MockDom::new().with_element("canvas", MockElement::default()))
}

#[test]
fn add_listener_unknown_element_returns_false() {
    let mem = VecMemory::new(256);
    let view = MemView::new(&mem, PtrWidth::Four);
    let mut dom = dom_with_canvas();

    let (idp, idl) = store(&view, 0, "missing");
    let (np, nl) = store(&view, 32, "click");
    let ok = dom
        .add_event_listener(&view, idp, idl, np, nl, 1, 0x10, 0x20, false)
        .unwrap();
    assert!(!ok);
    assert!(dom.listeners().is_empty());
}

#[test]
fn add_then_remove_listener() {
    let mem = VecMemory::new(256);
    let view = MemView::new(&mem, PtrWidth::Four);
    let mut dom = dom_with_canvas();

    let (idp, idl) = store(&view, 0, "canvas");
    let (np, nl) = store(&view, 32, "click");
    assert!(dom
        .add_event_listener(&view, idp, idl, np, nl, 1, 0x10, 0x20, true)
        .unwrap());
    assert_eq!(dom.listeners().len(), 1);
    assert_eq!(dom.host().attached.len(), 1);

    // A different (data, callback) pair is a different listener.
    assert!(!dom
        .remove_event_listener(&view, idp, idl, np, nl, 0x10, 0x99)
        .unwrap());
    assert!(dom
        .remove_event_listener(&view, idp, idl, np, nl, 0x10, 0x20)
        .unwrap());
    assert!(dom.listeners().is_empty());
    assert!(dom.host().attached.is_empty());
}

#[test]
fn dispatch_encodes_event_and_invokes_guest_callback() {
    let mem = VecMemory::new(512);
    let view = MemView::new(&mem, PtrWidth::Four);
    let mut dom = dom_with_canvas();

    let (idp, idl) = store(&view, 0, "canvas");
    let (np, nl) = store(&view, 32, "mousedown");
    dom.add_event_listener(&view, idp, idl, np, nl, 7, 0xAA, 0xBB, false)
        .unwrap();
    let token = *dom.host().attached.keys().next().unwrap();

    let info = EventInfo {
        timestamp: 0.5,
        bubbles: true,
        data: EventData::Mouse {
            screen: (1, 2),
            client: (3, 4),
            offset: (5, 6),
            page: (7, 8),
            movement: (0, 0),
            ctrl: false,
            shift: false,
            alt: false,
            meta: false,
            button: 0,
            buttons: 1,
        },
        ..EventInfo::default()
    };

    let ticket = dom.begin_dispatch(token, info).unwrap();
    assert_eq!(ticket.data, 0xAA);
    assert_eq!(ticket.callback, 0xBB);

    // The guest callback calls init_event_raw with a buffer it owns.
    let ep = 256;
    dom.init_event_raw(&view, ep).unwrap();
    dom.end_dispatch();

    assert_eq!(view.load_u32(ep).unwrap(), 7); // name_code
    assert_eq!(view.load_u32(ep + 12).unwrap(), idp as u32);
    assert_eq!(view.load_u32(ep + 16).unwrap(), idl as u32);
    assert_eq!(view.load_f64(ep + 24).unwrap(), 0.5);
    assert_eq!(view.load_i64(ep + 40).unwrap(), 1); // screen.x
    assert_eq!(view.load_u16(ep + 126).unwrap(), 1); // buttons

    // Outside a dispatch the record is gone.
    assert!(matches!(
        dom.init_event_raw(&view, ep),
        Err(DomError::NoActiveEvent)
    ));
}

#[test]
fn dispatch_for_removed_listener_is_dropped() {
    let mut dom = dom_with_canvas();
    assert!(dom
        .begin_dispatch(ListenerToken(42), EventInfo::default())
        .is_none());
}

#[test]
fn window_listeners_have_no_element_id() {
    let mem = VecMemory::new(512);
    let view = MemView::new(&mem, PtrWidth::Four);
    let mut dom = dom_with_canvas();

    let (np, nl) = store(&view, 0, "resize");
    assert!(dom
        .add_window_event_listener(&view, np, nl, 3, 0x1, 0x2, false)
        .unwrap());
    let token = *dom.host().attached.keys().next().unwrap();

    let info = EventInfo {
        target: TargetCode::Window,
        current_target: TargetCode::Window,
        data: EventData::Scroll { scroll: (0.0, 120.0) },
        ..EventInfo::default()
    };
    dom.begin_dispatch(token, info).unwrap();
    dom.init_event_raw(&view, 256).unwrap();
    dom.end_dispatch();

    assert_eq!(view.load_u32(256 + 4).unwrap(), 2); // target: window
    assert_eq!(view.load_u32(256 + 12).unwrap(), 0); // id_ptr
    assert_eq!(view.load_f64(256 + 48).unwrap(), 120.0); // scroll.y

    assert!(dom
        .remove_window_event_listener(&view, np, nl, 0x1, 0x2)
        .unwrap());
}

#[test]
fn element_value_string_is_caller_capped() {
    let mem = VecMemory::new(256);
    let view = MemView::new(&mem, PtrWidth::Four);
    let mut dom = Dom::new(MockDom::new().with_element(
        "name",
        MockElement {
            value_string: "ada lovelace".to_owned(),
            ..MockElement::default()
        },
    ));

    let (idp, idl) = store(&view, 0, "name");

    // Probe with a null buffer writes nothing.
    assert_eq!(
        dom.get_element_value_string(&view, idp, idl, 0, 0).unwrap(),
        0
    );

    let n = dom
        .get_element_value_string(&view, idp, idl, 128, 3)
        .unwrap();
    assert_eq!(n, 3);
    assert_eq!(view.load_string(128, 3).unwrap(), "ada");

    let n = dom
        .get_element_value_string(&view, idp, idl, 128, 64)
        .unwrap();
    assert_eq!(n, 12);
    assert_eq!(view.load_string(128, n as usize).unwrap(), "ada lovelace");

    dom.set_element_value_f64(&view, idp, idl, 4.5).unwrap();
    assert_eq!(dom.get_element_value_f64(&view, idp, idl).unwrap(), 4.5);

    let (vp, vl) = store(&view, 64, "turing");
    dom.set_element_value_string(&view, idp, idl, vp, vl).unwrap();
    let n = dom
        .get_element_value_string(&view, idp, idl, 128, 64)
        .unwrap();
    assert_eq!(view.load_string(128, n as usize).unwrap(), "turing");
}

#[test]
fn min_max_stored_as_two_f64() {
    let mem = VecMemory::new(256);
    let view = MemView::new(&mem, PtrWidth::Four);
    let dom = Dom::new(MockDom::new().with_element(
        "slider",
        MockElement {
            min: -1.0,
            max: 9.5,
            ..MockElement::default()
        },
    ));

    let (idp, idl) = store(&view, 0, "slider");
    dom.get_element_min_max(&view, 64, idp, idl).unwrap();
    assert_eq!(view.load_f64(64).unwrap(), -1.0);
    assert_eq!(view.load_f64(72).unwrap(), 9.5);
}
