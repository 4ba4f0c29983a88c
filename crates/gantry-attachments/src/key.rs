//! Attachment key tokens

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(1);

fn allocate_key_id() -> u64 {
    NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed)
}

/// An identity token addressing a single value of type `T` in an
/// [`AttachmentStore`](crate::AttachmentStore).
///
/// Every call to [`AttachmentKey::create`] allocates a distinct key. Copies of
/// one key address the same slot; keys created separately never collide, even
/// with the same name. The name is carried for diagnostics only.
pub struct AttachmentKey<T> {
    id: u64,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AttachmentKey<T> {
    /// Create a new, globally unique key.
    pub fn create(name: &'static str) -> Self {
        Self {
            id: allocate_key_id(),
            name,
            _marker: PhantomData,
        }
    }

    /// Diagnostic name given at creation.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

/// An identity token addressing an ordered sequence of `T` values.
///
/// List slots are created lazily on first append and read as an empty
/// sequence while absent, so readers never have to distinguish "no list"
/// from "empty list".
pub struct ListAttachmentKey<T> {
    id: u64,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ListAttachmentKey<T> {
    /// Create a new, globally unique list key.
    pub fn create(name: &'static str) -> Self {
        Self {
            id: allocate_key_id(),
            name,
            _marker: PhantomData,
        }
    }

    /// Diagnostic name given at creation.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

// Manual impls: the derived forms would bound `T`, but keys are plain tokens
// and copyable regardless of the value type they address.

impl<T> Clone for AttachmentKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AttachmentKey<T> {}

impl<T> PartialEq for AttachmentKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for AttachmentKey<T> {}

impl<T> Hash for AttachmentKey<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for AttachmentKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttachmentKey({}#{})", self.name, self.id)
    }
}

impl<T> Clone for ListAttachmentKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ListAttachmentKey<T> {}

impl<T> PartialEq for ListAttachmentKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for ListAttachmentKey<T> {}

impl<T> Hash for ListAttachmentKey<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for ListAttachmentKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListAttachmentKey({}#{})", self.name, self.id)
    }
}
