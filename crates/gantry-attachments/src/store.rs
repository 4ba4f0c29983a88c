//! Mutex-guarded heterogeneous attachment storage

use crate::key::{AttachmentKey, ListAttachmentKey};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;

type Slot = Box<dyn Any + Send + Sync>;

/// Key-addressed storage for heterogeneous values.
///
/// One lock covers every operation on a store instance, so concurrent
/// processors see each operation as atomic. Scalar keys behave as a
/// single-value slot; list keys behave as an always-present ordered sequence
/// that is materialized on first append.
#[derive(Default)]
pub struct AttachmentStore {
    slots: Mutex<HashMap<u64, Slot>>,
}

impl AttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a value is present under `key`.
    pub fn has<T>(&self, key: AttachmentKey<T>) -> bool {
        self.slots.lock().contains_key(&key.id())
    }

    /// Read the value under `key`, if any.
    pub fn get<T>(&self, key: AttachmentKey<T>) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let slots = self.slots.lock();
        slots
            .get(&key.id())
            .map(|slot| expect_slot::<T>(slot, key.name()).clone())
    }

    /// Store `value` under `key`, returning the previously stored value.
    pub fn put<T>(&self, key: AttachmentKey<T>, value: T) -> Option<T>
    where
        T: Send + Sync + 'static,
    {
        let mut slots = self.slots.lock();
        slots
            .insert(key.id(), Box::new(value))
            .map(|prior| take_slot::<T>(prior, key.name()))
    }

    /// Remove and return the value under `key`.
    pub fn remove<T>(&self, key: AttachmentKey<T>) -> Option<T>
    where
        T: Send + Sync + 'static,
    {
        let mut slots = self.slots.lock();
        slots
            .remove(&key.id())
            .map(|prior| take_slot::<T>(prior, key.name()))
    }

    /// Whether a list has been materialized under `key`.
    ///
    /// Distinguishes "never appended" from "appended then drained", which
    /// matters for inheritance-style fallbacks where an absent list defers to
    /// a parent's list but an empty one does not.
    pub fn has_list<T>(&self, key: ListAttachmentKey<T>) -> bool {
        self.slots.lock().contains_key(&key.id())
    }

    /// Read the sequence under `key`. Absent lists read as empty.
    pub fn get_list<T>(&self, key: ListAttachmentKey<T>) -> Vec<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let slots = self.slots.lock();
        slots
            .get(&key.id())
            .map(|slot| expect_list_slot::<T>(slot, key.name()).clone())
            .unwrap_or_default()
    }

    /// Append `value` to the sequence under `key`, creating it on demand.
    pub fn add_to_list<T>(&self, key: ListAttachmentKey<T>, value: T)
    where
        T: Send + Sync + 'static,
    {
        let mut slots = self.slots.lock();
        let slot = slots
            .entry(key.id())
            .or_insert_with(|| Box::new(Vec::<T>::new()));
        match slot.downcast_mut::<Vec<T>>() {
            Some(list) => list.push(value),
            None => panic!(
                "attachment list {} does not hold values of the requested type",
                key.name()
            ),
        }
    }

    /// Remove the sequence under `key`, returning its contents.
    pub fn remove_list<T>(&self, key: ListAttachmentKey<T>) -> Vec<T>
    where
        T: Send + Sync + 'static,
    {
        let mut slots = self.slots.lock();
        slots
            .remove(&key.id())
            .map(|prior| match prior.downcast::<Vec<T>>() {
                Ok(list) => *list,
                Err(_) => panic!(
                    "attachment list {} does not hold values of the requested type",
                    key.name()
                ),
            })
            .unwrap_or_default()
    }
}

// Key identity ties each slot to exactly one value type, so a failed downcast
// here means the key token itself was forged. Treated as a contract violation
// rather than a recoverable error.

fn expect_slot<'a, T: 'static>(slot: &'a Slot, name: &str) -> &'a T {
    match slot.downcast_ref::<T>() {
        Some(value) => value,
        None => panic!("attachment {name} does not hold a value of the requested type"),
    }
}

fn expect_list_slot<'a, T: 'static>(slot: &'a Slot, name: &str) -> &'a Vec<T> {
    match slot.downcast_ref::<Vec<T>>() {
        Some(list) => list,
        None => panic!("attachment list {name} does not hold values of the requested type"),
    }
}

fn take_slot<T: 'static>(slot: Slot, name: &str) -> T {
    match slot.downcast::<T>() {
        Ok(value) => *value,
        Err(_) => panic!("attachment {name} does not hold a value of the requested type"),
    }
}

impl std::fmt::Debug for AttachmentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.slots.lock().len();
        f.debug_struct("AttachmentStore").field("len", &len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn scalar_round_trip() {
        let store = AttachmentStore::new();
        let key: AttachmentKey<String> = AttachmentKey::create("runtime-name");

        assert!(!store.has(key));
        assert_eq!(store.get(key), None);

        assert_eq!(store.put(key, "app.war".to_string()), None);
        assert!(store.has(key));
        assert_eq!(store.get(key), Some("app.war".to_string()));
    }

    #[test]
    fn put_returns_prior_value() {
        let store = AttachmentStore::new();
        let key: AttachmentKey<u32> = AttachmentKey::create("count");

        store.put(key, 1);
        assert_eq!(store.put(key, 2), Some(1));
        assert_eq!(store.get(key), Some(2));
    }

    #[test]
    fn remove_clears_the_slot() {
        let store = AttachmentStore::new();
        let key: AttachmentKey<u32> = AttachmentKey::create("count");

        store.put(key, 7);
        assert_eq!(store.remove(key), Some(7));
        assert!(!store.has(key));
        assert_eq!(store.remove(key), None);
    }

    #[test]
    fn lists_read_empty_until_appended_and_preserve_order() {
        let store = AttachmentStore::new();
        let key: ListAttachmentKey<String> = ListAttachmentKey::create("subsystems");

        assert!(!store.has_list(key));
        assert!(store.get_list(key).is_empty());

        store.add_to_list(key, "web".to_string());
        store.add_to_list(key, "messaging".to_string());

        assert!(store.has_list(key));
        assert_eq!(store.get_list(key), vec!["web", "messaging"]);
    }

    #[test]
    fn remove_list_drains_contents() {
        let store = AttachmentStore::new();
        let key: ListAttachmentKey<u32> = ListAttachmentKey::create("values");

        store.add_to_list(key, 1);
        store.add_to_list(key, 2);

        assert_eq!(store.remove_list(key), vec![1, 2]);
        assert!(!store.has_list(key));
        assert!(store.remove_list(key).is_empty());
    }

    #[test]
    fn distinct_keys_do_not_share_slots() {
        let store = AttachmentStore::new();
        let a: AttachmentKey<u32> = AttachmentKey::create("slot");
        let b: AttachmentKey<u32> = AttachmentKey::create("slot");

        store.put(a, 1);
        assert_eq!(store.get(b), None);
    }

    #[test]
    fn concurrent_appends_are_not_lost() {
        let store = Arc::new(AttachmentStore::new());
        let key: ListAttachmentKey<u32> = ListAttachmentKey::create("hits");

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        store.add_to_list(key, n * 100 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get_list(key).len(), 800);
    }
}
