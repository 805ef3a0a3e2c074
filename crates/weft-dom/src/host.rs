use std::collections::HashMap;

use crate::listeners::ListenerTarget;

/// Host-side identity of an attached listener, returned by
/// [`DomHost::add_listener`] and used to route events back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerToken(pub u64);

/// The DOM operations the adapter needs from its host.
///
/// The in-flight event operations (`stop_propagation` etc.) act on whatever
/// event the host is currently dispatching; outside a dispatch they are
/// no-ops, as in the browser.
pub trait DomHost {
    /// Attaches a native listener. `None` if the target element does not
    /// exist.
    fn add_listener(
        &mut self,
        target: &ListenerTarget,
        name: &str,
        capture: bool,
    ) -> Option<ListenerToken>;

    fn remove_listener(&mut self, token: ListenerToken);

    fn get_element_value_f64(&self, id: &str) -> Option<f64>;
    fn get_element_value_string(&self, id: &str) -> Option<String>;
    fn get_element_min_max(&self, id: &str) -> Option<(f64, f64)>;
    fn set_element_value_f64(&mut self, id: &str, value: f64);
    fn set_element_value_string(&mut self, id: &str, value: &str);

    fn stop_propagation(&mut self);
    fn stop_immediate_propagation(&mut self);
    fn prevent_default(&mut self);
}

/// In-memory DOM double for native tests.
#[derive(Debug, Default)]
pub struct MockDom {
    pub elements: HashMap<String, MockElement>,
    pub attached: HashMap<ListenerToken, (ListenerTarget, String, bool)>,
    next_token: u64,
    pub propagation_stopped: u32,
    pub immediate_propagation_stopped: u32,
    pub default_prevented: u32,
}

#[derive(Debug, Default, Clone)]
pub struct MockElement {
    pub value_f64: f64,
    pub value_string: String,
    pub min: f64,
    pub max: f64,
}

impl MockDom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(mut self, id: &str, element: MockElement) -> Self {
        self.elements.insert(id.to_owned(), element);
        self
    }
}

impl DomHost for MockDom {
    fn add_listener(
        &mut self,
        target: &ListenerTarget,
        name: &str,
        capture: bool,
    ) -> Option<ListenerToken> {
        if let ListenerTarget::Element(id) = target {
            if !self.elements.contains_key(id) {
                return None;
            }
        }
        self.next_token += 1;
        let token = ListenerToken(self.next_token);
        self.attached
            .insert(token, (target.clone(), name.to_owned(), capture));
        Some(token)
    }

    fn remove_listener(&mut self, token: ListenerToken) {
        self.attached.remove(&token);
    }

    fn get_element_value_f64(&self, id: &str) -> Option<f64> {
        self.elements.get(id).map(|e| e.value_f64)
    }

    fn get_element_value_string(&self, id: &str) -> Option<String> {
        self.elements.get(id).map(|e| e.value_string.clone())
    }

    fn get_element_min_max(&self, id: &str) -> Option<(f64, f64)> {
        self.elements.get(id).map(|e| (e.min, e.max))
    }

    fn set_element_value_f64(&mut self, id: &str, value: f64) {
        if let Some(element) = self.elements.get_mut(id) {
            element.value_f64 = value;
        }
    }

    fn set_element_value_string(&mut self, id: &str, value: &str) {
        if let Some(element) = self.elements.get_mut(id) {
            element.value_string = value.to_owned();
        }
    }

    fn stop_propagation(&mut self) {
        self.propagation_stopped += 1;
    }

    fn stop_immediate_propagation(&mut self) {
        self.immediate_propagation_stopped += 1;
    }

    fn prevent_default(&mut self) {
        self.default_prevented += 1;
    }
}
