use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use serde_json::Value;
use tokio::sync::Notify;

pub type ListenerId = u64;
pub type Listener = Rc<dyn Fn(&Value)>;

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub name: String,
    pub payload: Value,
}

/// Listener table and signal queue for one context.
///
/// Listeners belong to the current document and are dropped by `clear`;
/// queued signals belong to the window and survive it.
#[derive(Default)]
pub struct EventTarget {
    listeners: RefCell<HashMap<String, Vec<(ListenerId, Listener)>>>,
    queue: RefCell<VecDeque<Signal>>,
    wake: Notify,
    next_id: Cell<ListenerId>,
}

impl EventTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, name: &str, listener: impl Fn(&Value) + 'static) -> ListenerId {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.listeners
            .borrow_mut()
            .entry(name.to_string())
            .or_default()
            .push((id, Rc::new(listener)));
        id
    }

    pub fn remove_listener(&self, name: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(entries) = listeners.get_mut(name) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        before != entries.len()
    }

    pub fn contains(&self, name: &str, id: ListenerId) -> bool {
        self.listeners
            .borrow()
            .get(name)
            .is_some_and(|entries| entries.iter().any(|(existing, _)| *existing == id))
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.borrow().get(name).map_or(0, Vec::len)
    }

    /// Drop every listener.
    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }

    /// Queue a signal for the next `pump`.
    pub fn emit(&self, name: &str, payload: Value) {
        self.queue.borrow_mut().push_back(Signal {
            name: name.to_string(),
            payload,
        });
        self.wake.notify_one();
    }

    /// Run the listeners for `name` now. Returns how many ran.
    pub fn dispatch(&self, name: &str, payload: &Value) -> usize {
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .get(name)
            .map(|entries| entries.iter().map(|(_, l)| Rc::clone(l)).collect())
            .unwrap_or_default();

        if listeners.is_empty() {
            tracing::trace!(target: "frame", signal = %name, "no listeners");
        }
        for listener in &listeners {
            listener(payload);
        }
        listeners.len()
    }

    /// Dispatch queued signals in arrival order, including ones queued while
    /// pumping. Returns how many signals were processed.
    pub fn pump(&self) -> usize {
        let mut processed = 0;
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(signal) = next else {
                break;
            };
            self.dispatch(&signal.name, &signal.payload);
            processed += 1;
        }
        processed
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Resolves once a signal has been emitted since the last wait.
    pub async fn wait(&self) {
        self.wake.notified().await;
    }
}
