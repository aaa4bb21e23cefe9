//! ObservableList - shared list whose identity survives property updates
//!
//! A list-typed property hands out handles to one `ObservableList`. Setting
//! the property again refills that same instance, so observers attached to
//! the list keep working.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::event::{Subscribers, Subscription};

/// Structural change applied to an [`ObservableList`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListChange {
    /// Contents were replaced wholesale (clear or refill)
    Reset,
    ItemAdded { index: usize },
    ItemRemoved { index: usize },
    ItemReplaced { index: usize },
}

#[derive(Default)]
struct ListInner {
    items: RwLock<Vec<Value>>,
    changes: Subscribers<ListChange>,
}

/// Handle onto a shared list of JSON values
///
/// Cloning yields another handle to the **same** list; use
/// [`ptr_eq`](Self::ptr_eq) to compare identity and `==` to compare contents.
#[derive(Clone, Default)]
pub struct ObservableList {
    inner: Arc<ListInner>,
}

impl ObservableList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a list holding `items`
    pub fn from_values(items: impl IntoIterator<Item = Value>) -> Self {
        let list = Self::new();
        *list.inner.items.write() = items.into_iter().collect();
        list
    }

    /// Whether both handles point at the same list instance
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn len(&self) -> usize {
        self.inner.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.inner.items.read().get(index).cloned()
    }

    /// Copy of the current contents
    pub fn to_vec(&self) -> Vec<Value> {
        self.inner.items.read().clone()
    }

    /// Compare contents with a slice
    pub fn contents_eq(&self, other: &[Value]) -> bool {
        self.inner.items.read().as_slice() == other
    }

    pub fn push(&self, item: impl Into<Value>) {
        let index = {
            let mut items = self.inner.items.write();
            items.push(item.into());
            items.len() - 1
        };
        self.inner.changes.notify(&ListChange::ItemAdded { index });
    }

    /// Insert at `index`; returns false when `index > len`
    pub fn insert(&self, index: usize, item: impl Into<Value>) -> bool {
        {
            let mut items = self.inner.items.write();
            if index > items.len() {
                return false;
            }
            items.insert(index, item.into());
        }
        self.inner.changes.notify(&ListChange::ItemAdded { index });
        true
    }

    pub fn remove(&self, index: usize) -> Option<Value> {
        let removed = {
            let mut items = self.inner.items.write();
            (index < items.len()).then(|| items.remove(index))
        };
        if removed.is_some() {
            self.inner.changes.notify(&ListChange::ItemRemoved { index });
        }
        removed
    }

    /// Replace the item at `index`, returning the previous one
    pub fn set(&self, index: usize, item: impl Into<Value>) -> Option<Value> {
        let previous = {
            let mut items = self.inner.items.write();
            items
                .get_mut(index)
                .map(|slot| std::mem::replace(slot, item.into()))
        };
        if previous.is_some() {
            self.inner.changes.notify(&ListChange::ItemReplaced { index });
        }
        previous
    }

    pub fn clear(&self) {
        self.inner.items.write().clear();
        self.inner.changes.notify(&ListChange::Reset);
    }

    /// Clear in place and refill from `items`; one `Reset` is raised
    pub fn replace_all(&self, items: impl IntoIterator<Item = Value>) {
        let fresh: Vec<Value> = items.into_iter().collect();
        {
            let mut current = self.inner.items.write();
            current.clear();
            current.extend(fresh);
        }
        self.inner.changes.notify(&ListChange::Reset);
    }

    /// Observe structural changes of this list instance
    pub fn subscribe(
        &self,
        callback: impl Fn(&ListChange) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.changes.subscribe(callback)
    }

    /// Contents as a JSON array
    pub fn to_json(&self) -> Value {
        Value::Array(self.to_vec())
    }
}

impl PartialEq for ObservableList {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let left = self.to_vec();
        other.contents_eq(&left)
    }
}

impl fmt::Debug for ObservableList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.items.read().iter()).finish()
    }
}

impl Serialize for ObservableList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.items.read().serialize(serializer)
    }
}
