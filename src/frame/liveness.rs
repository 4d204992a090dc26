//! Detects listeners lost to a document replacement.
//!
//! A probe emits a sentinel signal and arms a timer. A watch listener for the
//! same sentinel acknowledges the probe when the signal is pumped; if the
//! timer wins, the listener is gone and the probe's `on_lost` callback runs.
//! Context teardown resolves every in-flight probe as lost immediately.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::sleep;

use super::events::{EventTarget, ListenerId};

pub type ProbeId = u64;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(250);

struct PendingProbe {
    sentinel: String,
    on_lost: Box<dyn FnOnce()>,
    cancel_tx: oneshot::Sender<()>,
}

struct ProbeState {
    timeout: Duration,
    pending: RefCell<HashMap<ProbeId, PendingProbe>>,
    next_id: Cell<ProbeId>,
}

#[derive(Clone)]
pub struct LivenessProbe {
    state: Rc<ProbeState>,
}

impl LivenessProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: Rc::new(ProbeState {
                timeout,
                pending: RefCell::new(HashMap::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Attach the listener that acknowledges probes for `sentinel`.
    pub fn watch(&self, target: &EventTarget, sentinel: &str) -> ListenerId {
        let state = Rc::downgrade(&self.state);
        let watched = sentinel.to_string();
        target.add_listener(sentinel, move |_| {
            if let Some(state) = Weak::upgrade(&state) {
                state.acknowledge(&watched);
            }
        })
    }

    /// Emit `sentinel` once and start the timer. Must run inside a `LocalSet`.
    pub fn probe(
        &self,
        target: &EventTarget,
        sentinel: &str,
        on_lost: impl FnOnce() + 'static,
    ) -> ProbeId {
        let id = self.state.next_id.get() + 1;
        self.state.next_id.set(id);

        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.state.pending.borrow_mut().insert(
            id,
            PendingProbe {
                sentinel: sentinel.to_string(),
                on_lost: Box::new(on_lost),
                cancel_tx,
            },
        );

        target.emit(sentinel, Value::Null);

        let state = Rc::downgrade(&self.state);
        let timeout = self.state.timeout;
        tokio::task::spawn_local(async move {
            tokio::select! {
                _ = sleep(timeout) => {
                    if let Some(state) = Weak::upgrade(&state) {
                        state.expire(id);
                    }
                }
                _ = cancel_rx => {
                    // acknowledged or torn down
                }
            }
        });

        tracing::trace!(target: "frame", probe = id, sentinel = %sentinel, "probe armed");
        id
    }

    pub fn is_pending(&self, id: ProbeId) -> bool {
        self.state.pending.borrow().contains_key(&id)
    }

    pub fn pending(&self) -> usize {
        self.state.pending.borrow().len()
    }

    /// Resolve every in-flight probe as lost. Returns how many were resolved.
    pub fn teardown(&self) -> usize {
        let drained: Vec<PendingProbe> = self
            .state
            .pending
            .borrow_mut()
            .drain()
            .map(|(_, probe)| probe)
            .collect();
        let count = drained.len();
        for probe in drained {
            let _ = probe.cancel_tx.send(());
            tracing::debug!(target: "frame", sentinel = %probe.sentinel, "listener torn down");
            (probe.on_lost)();
        }
        count
    }
}

impl ProbeState {
    fn acknowledge(&self, sentinel: &str) -> usize {
        let acknowledged: Vec<PendingProbe> = {
            let mut pending = self.pending.borrow_mut();
            let ids: Vec<ProbeId> = pending
                .iter()
                .filter(|(_, probe)| probe.sentinel == sentinel)
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| pending.remove(id)).collect()
        };
        let count = acknowledged.len();
        for probe in acknowledged {
            let _ = probe.cancel_tx.send(());
        }
        if count > 0 {
            tracing::trace!(target: "frame", sentinel = %sentinel, count, "listener alive");
        }
        count
    }

    fn expire(&self, id: ProbeId) {
        let lost = self.pending.borrow_mut().remove(&id);
        if let Some(probe) = lost {
            tracing::warn!(
                target: "frame",
                probe = id,
                sentinel = %probe.sentinel,
                "listener did not answer; assuming it was lost"
            );
            (probe.on_lost)();
        }
    }
}
