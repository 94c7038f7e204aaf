use core::fmt;
use std::sync::Arc;

use crate::{
    error::StoreError,
    node::Node,
    store::{Handle, Store},
};

#[derive(Clone)]
struct Root {
    store: Arc<Store>,
    handle: Handle,
}

/// A JSON value designated as root, together with the store it lives in.
///
/// The default document is empty and denotes an absent value. Cloning a document shares the
/// store.
#[derive(Clone, Default)]
pub struct Document {
    root: Option<Root>,
}

impl Document {
    pub(crate) fn new(store: Arc<Store>, handle: Handle) -> Document {
        Document {
            root: Some(Root { store, handle }),
        }
    }

    #[must_use]
    pub fn root(&self) -> Option<Node<'_>> {
        let root = self.root.as_ref()?;
        root.store.node(root.handle).ok()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    #[must_use]
    pub fn store(&self) -> Option<&Store> {
        self.root.as_ref().map(|root| &*root.store)
    }

    /// Handle of the root value, [`Handle::NONE`] for an empty document.
    #[must_use]
    pub fn handle(&self) -> Handle {
        self.root.as_ref().map_or(Handle::NONE, |root| root.handle)
    }

    /// A document rooted at `node` that shares this document's store.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::ForeignHandle`] if `node` belongs to a different store.
    pub fn with_root(&self, node: Node<'_>) -> Result<Document, StoreError> {
        match &self.root {
            Some(root) if std::ptr::eq(node.store(), Arc::as_ptr(&root.store)) => {
                Ok(Document::new(Arc::clone(&root.store), node.handle()))
            }
            _ => Err(StoreError::ForeignHandle),
        }
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        match (self.root(), other.root()) {
            (None, None) => true,
            (Some(left), Some(right)) => jsonlike::equal(left, right),
            _ => false,
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.root())
            .finish()
    }
}

/// Compact JSON; `null` for an empty document.
impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root() {
            Some(node) => node.fmt(f),
            None => f.write_str("null"),
        }
    }
}
