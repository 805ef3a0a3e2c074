use std::collections::HashMap;

use crate::host::ListenerToken;

/// What a listener is attached to. Elements are addressed by id; the window
/// target has no id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ListenerTarget {
    Element(String),
    Window,
}

/// Composite identity of a guest-registered listener.
///
/// The guest identifies a listener on removal by target, event name, its
/// userdata pointer and its callback pointer, so exactly those fields form
/// the key. The capture flag is registration state, not identity: removal
/// does not supply it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    pub target: ListenerTarget,
    pub name: String,
    pub data: u64,
    pub callback: u64,
}

#[derive(Clone, Debug)]
pub struct Registration {
    pub token: ListenerToken,
    pub capture: bool,
    /// Guest-chosen numeric code for the event name, passed back in the
    /// event record.
    pub name_code: u32,
    /// Guest pointer/length of the element id string, passed back verbatim.
    pub id_ptr: u64,
    pub id_len: u64,
}

/// Listener registrations keyed by [`ListenerKey`], with a token index for
/// host-initiated dispatch.
#[derive(Debug, Default)]
pub struct ListenerTable {
    by_key: HashMap<ListenerKey, Registration>,
    by_token: HashMap<ListenerToken, ListenerKey>,
}

impl ListenerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener; an existing registration under the same key is
    /// replaced and returned so the caller can detach it from the host.
    pub fn insert(&mut self, key: ListenerKey, registration: Registration) -> Option<Registration> {
        self.by_token.insert(registration.token, key.clone());
        let old = self.by_key.insert(key, registration);
        if let Some(old) = &old {
            self.by_token.remove(&old.token);
        }
        old
    }

    pub fn remove(&mut self, key: &ListenerKey) -> Option<Registration> {
        let registration = self.by_key.remove(key)?;
        self.by_token.remove(&registration.token);
        Some(registration)
    }

    pub fn get_by_token(&self, token: ListenerToken) -> Option<(&ListenerKey, &Registration)> {
        let key = self.by_token.get(&token)?;
        let registration = self.by_key.get(key)?;
        Some((key, registration))
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str, name: &str, data: u64, callback: u64) -> ListenerKey {
        ListenerKey {
            target: ListenerTarget::Element(id.to_owned()),
            name: name.to_owned(),
            data,
            callback,
        }
    }

    fn registration(token: u64) -> Registration {
        Registration {
            token: ListenerToken(token),
            capture: false,
            name_code: 1,
            id_ptr: 0x100,
            id_len: 6,
        }
    }

    #[test]
    fn distinct_callbacks_are_distinct_listeners() {
        let mut table = ListenerTable::new();
        table.insert(key("canvas", "click", 0x10, 1), registration(1));
        table.insert(key("canvas", "click", 0x10, 2), registration(2));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn reinsert_replaces_and_returns_old() {
        let mut table = ListenerTable::new();
        assert!(table
            .insert(key("canvas", "click", 0x10, 1), registration(1))
            .is_none());
        let old = table
            .insert(key("canvas", "click", 0x10, 1), registration(2))
            .unwrap();
        assert_eq!(old.token, ListenerToken(1));
        assert!(table.get_by_token(ListenerToken(1)).is_none());
        assert!(table.get_by_token(ListenerToken(2)).is_some());
    }

    #[test]
    fn remove_clears_token_index() {
        let mut table = ListenerTable::new();
        let k = key("slider", "input", 0, 7);
        table.insert(k.clone(), registration(9));
        assert!(table.remove(&k).is_some());
        assert!(table.get_by_token(ListenerToken(9)).is_none());
        assert!(table.remove(&k).is_none());
    }
}
