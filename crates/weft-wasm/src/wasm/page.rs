//! Page-level hosts: console sink, environment services and the DOM.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, Window};

use weft_dom::{DomHost, EventData, EventInfo, ListenerTarget, ListenerToken, TargetCode};
use weft_env::{ConsoleSink, EnvHost, StdStream};

/// Completed lines go to the developer console; the error stream gets the
/// error styling.
pub struct WebConsoleSink;

impl ConsoleSink for WebConsoleSink {
    fn print_line(&mut self, stream: StdStream, line: &str) {
        match stream {
            StdStream::Stdout => web_sys::console::log_1(&JsValue::from_str(line)),
            StdStream::Stderr => web_sys::console::error_1(&JsValue::from_str(line)),
        }
    }
}

pub struct BrowserHost {
    window: Window,
}

impl BrowserHost {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl EnvHost for BrowserHost {
    fn alert(&mut self, message: &str) {
        let _ = self.window.alert_with_message(message);
    }

    fn evaluate(&mut self, code: &str) {
        if let Err(err) = js_sys::eval(code) {
            tracing::warn!(?err, "guest evaluate threw");
        }
    }

    fn time_now_ns(&self) -> i64 {
        (js_sys::Date::now() * 1e6) as i64
    }

    fn tick_now_ns(&self) -> i64 {
        self.window
            .performance()
            .map(|p| (p.now() * 1e6) as i64)
            .unwrap_or(0)
    }
}

type DispatchFn = Rc<dyn Fn(ListenerToken, EventInfo)>;

struct Attached {
    target: web_sys::EventTarget,
    name: String,
    capture: bool,
    closure: Closure<dyn FnMut(web_sys::Event)>,
}

/// DOM host over the live document. Each attached listener owns a closure
/// that narrows the browser event to one [`EventData`] variant and forwards
/// it to the runtime's dispatch hook. The in-flight browser event is shared
/// with the listener closures so the stop/prevent operations can reach it.
pub struct WebDom {
    window: Window,
    document: Document,
    dispatch: DispatchFn,
    attached: RefCell<HashMap<ListenerToken, Attached>>,
    next_token: std::cell::Cell<u64>,
    current_event: Rc<RefCell<Option<web_sys::Event>>>,
}

impl WebDom {
    pub fn new(window: Window, document: Document, dispatch: DispatchFn) -> Self {
        Self {
            window,
            document,
            dispatch,
            attached: RefCell::new(HashMap::new()),
            next_token: std::cell::Cell::new(0),
            current_event: Rc::new(RefCell::new(None)),
        }
    }

    fn element(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }
}

/// Narrow the browser event once, at dispatch time.
fn classify(event: &web_sys::Event) -> EventData {
    if let Some(mouse) = event.dyn_ref::<web_sys::MouseEvent>() {
        if let Some(wheel) = event.dyn_ref::<web_sys::WheelEvent>() {
            return EventData::Wheel {
                delta: (wheel.delta_x(), wheel.delta_y(), wheel.delta_z()),
                delta_mode: wheel.delta_mode(),
            };
        }
        return EventData::Mouse {
            screen: (mouse.screen_x() as i64, mouse.screen_y() as i64),
            client: (mouse.client_x() as i64, mouse.client_y() as i64),
            offset: (mouse.offset_x() as i64, mouse.offset_y() as i64),
            page: (mouse.page_x() as i64, mouse.page_y() as i64),
            movement: (mouse.movement_x() as i64, mouse.movement_y() as i64),
            ctrl: mouse.ctrl_key(),
            shift: mouse.shift_key(),
            alt: mouse.alt_key(),
            meta: mouse.meta_key(),
            button: mouse.button(),
            buttons: mouse.buttons(),
        };
    }
    if let Some(key) = event.dyn_ref::<web_sys::KeyboardEvent>() {
        return EventData::Key {
            key: key.key(),
            code: key.code(),
            location: key.location() as u8,
            ctrl: key.ctrl_key(),
            shift: key.shift_key(),
            alt: key.alt_key(),
            meta: key.meta_key(),
            repeat: key.repeat(),
        };
    }
    if event.type_() == "scroll" {
        let window = web_sys::window();
        let scroll = window
            .map(|w| {
                (
                    w.scroll_x().unwrap_or(0.0),
                    w.scroll_y().unwrap_or(0.0),
                )
            })
            .unwrap_or((0.0, 0.0));
        return EventData::Scroll { scroll };
    }
    EventData::Generic
}

fn target_code(event_target: Option<&web_sys::EventTarget>) -> TargetCode {
    match event_target {
        Some(t) if t.dyn_ref::<Document>().is_some() => TargetCode::Document,
        Some(t) if t.dyn_ref::<Window>().is_some() => TargetCode::Window,
        _ => TargetCode::Element,
    }
}

impl DomHost for WebDom {
    fn add_listener(
        &mut self,
        target: &ListenerTarget,
        name: &str,
        capture: bool,
    ) -> Option<ListenerToken> {
        let event_target: web_sys::EventTarget = match target {
            ListenerTarget::Element(id) => self.element(id)?.into(),
            ListenerTarget::Window => self.window.clone().into(),
        };

        self.next_token.set(self.next_token.get() + 1);
        let token = ListenerToken(self.next_token.get());

        let dispatch = Rc::clone(&self.dispatch);
        let current_event = Rc::clone(&self.current_event);
        let closure = Closure::wrap(Box::new(move |event: web_sys::Event| {
            let info = EventInfo {
                target: target_code(event.target().as_ref()),
                current_target: target_code(event.current_target().as_ref()),
                timestamp: event.time_stamp() * 1e-3,
                phase: event.event_phase() as u8,
                bubbles: event.bubbles(),
                cancelable: event.cancelable(),
                composed: event.composed(),
                is_composing: false,
                is_trusted: event.is_trusted(),
                data: classify(&event),
            };
            *current_event.borrow_mut() = Some(event);
            dispatch(token, info);
            *current_event.borrow_mut() = None;
        }) as Box<dyn FnMut(web_sys::Event)>);

        if event_target
            .add_event_listener_with_callback_and_bool(
                name,
                closure.as_ref().unchecked_ref(),
                capture,
            )
            .is_err()
        {
            return None;
        }

        self.attached.borrow_mut().insert(
            token,
            Attached {
                target: event_target,
                name: name.to_owned(),
                capture,
                closure,
            },
        );
        Some(token)
    }

    fn remove_listener(&mut self, token: ListenerToken) {
        if let Some(attached) = self.attached.borrow_mut().remove(&token) {
            let _ = attached
                .target
                .remove_event_listener_with_callback_and_bool(
                    &attached.name,
                    attached.closure.as_ref().unchecked_ref(),
                    attached.capture,
                );
        }
    }

    fn get_element_value_f64(&self, id: &str) -> Option<f64> {
        let input = self.element(id)?.dyn_into::<web_sys::HtmlInputElement>().ok()?;
        input.value().parse().ok()
    }

    fn get_element_value_string(&self, id: &str) -> Option<String> {
        let input = self.element(id)?.dyn_into::<web_sys::HtmlInputElement>().ok()?;
        Some(input.value())
    }

    fn get_element_min_max(&self, id: &str) -> Option<(f64, f64)> {
        let input = self.element(id)?.dyn_into::<web_sys::HtmlInputElement>().ok()?;
        Some((
            input.min().parse().unwrap_or(0.0),
            input.max().parse().unwrap_or(0.0),
        ))
    }

    fn set_element_value_f64(&mut self, id: &str, value: f64) {
        if let Some(input) = self
            .element(id)
            .and_then(|e| e.dyn_into::<web_sys::HtmlInputElement>().ok())
        {
            input.set_value_as_number(value);
        }
    }

    fn set_element_value_string(&mut self, id: &str, value: &str) {
        if let Some(input) = self
            .element(id)
            .and_then(|e| e.dyn_into::<web_sys::HtmlInputElement>().ok())
        {
            input.set_value(value);
        }
    }

    fn stop_propagation(&mut self) {
        if let Some(event) = &*self.current_event.borrow() {
            event.stop_propagation();
        }
    }

    fn stop_immediate_propagation(&mut self) {
        if let Some(event) = &*self.current_event.borrow() {
            event.stop_immediate_propagation();
        }
    }

    fn prevent_default(&mut self) {
        if let Some(event) = &*self.current_event.borrow() {
            event.prevent_default();
        }
    }
}
