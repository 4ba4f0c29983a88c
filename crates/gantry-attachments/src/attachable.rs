//! The Attachable trait

use crate::key::{AttachmentKey, ListAttachmentKey};
use crate::store::AttachmentStore;

/// Implemented by anything that owns an [`AttachmentStore`].
///
/// All accessors forward to the store, so implementors only supply the store
/// itself. Deployment units and phase contexts are the two implementors in
/// the pipeline.
pub trait Attachable {
    /// The backing store.
    fn attachments(&self) -> &AttachmentStore;

    fn has_attachment<T>(&self, key: AttachmentKey<T>) -> bool {
        self.attachments().has(key)
    }

    fn get_attachment<T>(&self, key: AttachmentKey<T>) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.attachments().get(key)
    }

    fn put_attachment<T>(&self, key: AttachmentKey<T>, value: T) -> Option<T>
    where
        T: Send + Sync + 'static,
    {
        self.attachments().put(key, value)
    }

    fn remove_attachment<T>(&self, key: AttachmentKey<T>) -> Option<T>
    where
        T: Send + Sync + 'static,
    {
        self.attachments().remove(key)
    }

    fn has_attachment_list<T>(&self, key: ListAttachmentKey<T>) -> bool {
        self.attachments().has_list(key)
    }

    fn get_attachment_list<T>(&self, key: ListAttachmentKey<T>) -> Vec<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.attachments().get_list(key)
    }

    fn add_to_attachment_list<T>(&self, key: ListAttachmentKey<T>, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.attachments().add_to_list(key, value)
    }

    fn remove_attachment_list<T>(&self, key: ListAttachmentKey<T>) -> Vec<T>
    where
        T: Send + Sync + 'static,
    {
        self.attachments().remove_list(key)
    }
}
