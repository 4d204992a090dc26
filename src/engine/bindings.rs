use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::facet::Facet;

pub const UPDATED_PREFIX: &str = "facet:updated:";
pub const ERROR_PREFIX: &str = "facet:error:";

pub type Binding = Rc<dyn Fn(&dyn Facet)>;

pub fn updated_key(facet_name: &str) -> String {
    format!("{UPDATED_PREFIX}{facet_name}")
}

pub fn error_key(facet_name: &str) -> String {
    format!("{ERROR_PREFIX}{facet_name}")
}

/// One callback per key; registering again replaces the previous callback.
#[derive(Default)]
pub struct BindingTable {
    entries: RefCell<HashMap<String, Binding>>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `callback` to `key`, returning the callback it replaced.
    pub fn register(
        &self,
        key: impl Into<String>,
        callback: impl Fn(&dyn Facet) + 'static,
    ) -> Option<Binding> {
        self.entries
            .borrow_mut()
            .insert(key.into(), Rc::new(callback))
    }

    pub fn unregister(&self, key: &str) -> bool {
        self.entries.borrow_mut().remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Invoke the `facet:updated:<name>` binding, if any.
    pub fn notify_updated(&self, facet: &dyn Facet) -> bool {
        self.invoke(&updated_key(facet.name()), facet)
    }

    /// Invoke the `facet:error:<name>` binding, if any.
    pub fn notify_error(&self, facet: &dyn Facet) -> bool {
        self.invoke(&error_key(facet.name()), facet)
    }

    fn invoke(&self, key: &str, facet: &dyn Facet) -> bool {
        // Released before the call so callbacks may re-register.
        let binding = self.entries.borrow().get(key).cloned();
        match binding {
            Some(callback) => {
                callback(facet);
                true
            }
            None => {
                tracing::trace!(target: "engine", key = %key, "nobody is listening");
                false
            }
        }
    }
}

impl fmt::Debug for BindingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.borrow();
        let mut keys: Vec<&String> = entries.keys().collect();
        keys.sort();
        f.debug_struct("BindingTable").field("keys", &keys).finish()
    }
}
