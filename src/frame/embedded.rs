use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::{EventTarget, ListenerId};
use super::liveness::{LivenessProbe, ProbeId};
use super::location::Location;
use super::message::{FrameCommand, FrameMessage};
use crate::engine::{Engine, FacetContext, FacetRegistry, ROUTER_FACET};

pub const MESSAGE_SIGNAL: &str = "message";
pub const BRIDGE_SENTINEL: &str = "shimframe:bridge";

/// The UI bundle living in the embedded document. Called with a fresh engine
/// every time the document is created so it can bind again.
pub trait Guest {
    fn attach(&mut self, engine: &Rc<Engine>, document: &EmbeddedDocument);
}

/// A guest that binds nothing.
#[derive(Debug, Default)]
pub struct DetachedGuest;

impl Guest for DetachedGuest {
    fn attach(&mut self, engine: &Rc<Engine>, document: &EmbeddedDocument) {
        tracing::trace!(
            target: "frame",
            engine = %engine.id(),
            generation = document.generation,
            "no guest to attach"
        );
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbeddedDocument {
    pub id: Uuid,
    pub generation: u64,
    pub content: String,
}

impl EmbeddedDocument {
    fn new(generation: u64, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            generation,
            content,
        }
    }
}

type TeardownHook = Rc<dyn Fn()>;

/// The embedded frame: current document, its engine, and the message bridge
/// that receives [`FrameMessage`]s from the top-level router.
pub struct EmbeddedContext {
    registry: FacetRegistry,
    facets: FacetContext,
    engine: RefCell<Rc<Engine>>,
    document: RefCell<EmbeddedDocument>,
    events: EventTarget,
    probe: LivenessProbe,
    guest: RefCell<Box<dyn Guest>>,
    teardown_hooks: RefCell<Vec<TeardownHook>>,
    bridge: Cell<Option<ListenerId>>,
    watcher: Cell<Option<ListenerId>>,
}

impl EmbeddedContext {
    /// Must be called inside a `LocalSet`; the bridge probe spawns a timer.
    pub fn new(
        registry: FacetRegistry,
        facets: FacetContext,
        probe_timeout: Duration,
        guest: Box<dyn Guest>,
    ) -> Rc<Self> {
        let engine = Rc::new(Engine::new(&registry, &facets));
        let context = Rc::new(Self {
            registry,
            facets,
            engine: RefCell::new(engine),
            document: RefCell::new(EmbeddedDocument::new(0, String::new())),
            events: EventTarget::new(),
            probe: LivenessProbe::new(probe_timeout),
            guest: RefCell::new(guest),
            teardown_hooks: RefCell::new(Vec::new()),
            bridge: Cell::new(None),
            watcher: Cell::new(None),
        });

        context.attach_guest();

        let weak = Rc::downgrade(&context);
        context.add_teardown_hook(move || {
            if let Some(context) = Weak::upgrade(&weak) {
                context.ensure_bridge();
            }
        });
        context.ensure_bridge();
        context
    }

    pub fn engine(&self) -> Rc<Engine> {
        self.engine.borrow().clone()
    }

    pub fn location(&self) -> Location {
        self.facets.location.borrow().clone()
    }

    pub fn document(&self) -> EmbeddedDocument {
        self.document.borrow().clone()
    }

    pub fn events(&self) -> &EventTarget {
        &self.events
    }

    pub fn probe(&self) -> &LivenessProbe {
        &self.probe
    }

    pub fn has_bridge(&self) -> bool {
        self.bridge
            .get()
            .is_some_and(|id| self.events.contains(MESSAGE_SIGNAL, id))
    }

    /// Run `hook` every time the current document is torn down.
    pub fn add_teardown_hook(&self, hook: impl Fn() + 'static) {
        self.teardown_hooks.borrow_mut().push(Rc::new(hook));
    }

    /// Re-attach the message listener if the current document lost it.
    pub fn ensure_bridge(self: &Rc<Self>) {
        if self.has_bridge() {
            return;
        }

        let weak = Rc::downgrade(self);
        let id = self.events.add_listener(MESSAGE_SIGNAL, move |payload| {
            if let Some(context) = Weak::upgrade(&weak) {
                context.on_message(payload);
            }
        });
        self.bridge.set(Some(id));
        // One acknowledging listener per context, even when only the bridge
        // was lost.
        if let Some(stale) = self.watcher.take() {
            self.events.remove_listener(BRIDGE_SENTINEL, stale);
        }
        self.watcher
            .set(Some(self.probe.watch(&self.events, BRIDGE_SENTINEL)));
        tracing::debug!(
            target: "frame",
            generation = self.document.borrow().generation,
            "message bridge attached"
        );
        self.verify_bridge();
    }

    /// Probe the bridge; if nobody answers before the timeout it is attached
    /// again.
    pub fn verify_bridge(self: &Rc<Self>) -> ProbeId {
        let weak = Rc::downgrade(self);
        self.probe.probe(&self.events, BRIDGE_SENTINEL, move || {
            if let Some(context) = Weak::upgrade(&weak) {
                context.ensure_bridge();
            }
        })
    }

    /// Apply a command from the top-level window.
    pub fn deliver(&self, command: FrameCommand) {
        match command {
            FrameCommand::Write { content } => self.replace_document(content),
            FrameCommand::Post(message) => match serde_json::to_value(&message) {
                Ok(payload) => self.events.emit(MESSAGE_SIGNAL, payload),
                Err(err) => {
                    tracing::error!(target: "frame", error = %err, "failed to encode frame message")
                }
            },
        }
    }

    /// Dispatch queued signals.
    pub fn pump(&self) -> usize {
        self.events.pump()
    }

    /// Process commands until the sender side is dropped.
    pub async fn run(self: Rc<Self>, mut inbox: mpsc::UnboundedReceiver<FrameCommand>) {
        loop {
            self.pump();
            tokio::select! {
                command = inbox.recv() => match command {
                    Some(command) => self.deliver(command),
                    None => break,
                },
                _ = self.events.wait() => {}
            }
        }
        self.pump();
        tracing::debug!(target: "frame", "embedded context stopped");
    }

    fn on_message(&self, payload: &Value) {
        let message: FrameMessage = match serde_json::from_value(payload.clone()) {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(target: "frame", error = %err, "ignoring foreign message");
                return;
            }
        };

        tracing::trace!(
            target: "frame",
            path = %message.pathname,
            replace = message.replaces_document(),
            "frame message"
        );
        if let Some(content) = message.content {
            self.replace_document(content);
        }

        self.facets
            .location
            .borrow_mut()
            .set_pathname(&message.pathname);
        tracing::debug!(target: "frame", path = %message.pathname, "embedded location changed");
        self.engine().notify_updated(ROUTER_FACET);
    }

    fn replace_document(&self, content: String) {
        self.teardown();

        let generation = self.document.borrow().generation + 1;
        *self.document.borrow_mut() = EmbeddedDocument::new(generation, content);
        *self.engine.borrow_mut() = Rc::new(Engine::new(&self.registry, &self.facets));
        tracing::info!(target: "frame", generation, "document replaced");

        self.attach_guest();
    }

    fn teardown(&self) {
        let listeners = self.events.listener_count(MESSAGE_SIGNAL)
            + self.events.listener_count(BRIDGE_SENTINEL);
        self.engine.borrow().bindings().clear();
        self.events.clear();
        self.bridge.set(None);
        self.watcher.set(None);

        let lost = self.probe.teardown();
        let hooks: Vec<TeardownHook> = self.teardown_hooks.borrow().clone();
        tracing::debug!(
            target: "frame",
            probes = lost,
            listeners,
            hooks = hooks.len(),
            "tearing down document"
        );
        for hook in hooks {
            hook();
        }
    }

    fn attach_guest(&self) {
        let engine = self.engine();
        let document = self.document.borrow().clone();
        self.guest.borrow_mut().attach(&engine, &document);
    }
}
