//! The engine object handed to the UI guest: facets, bindings, and the
//! inbound event dispatcher.

pub mod bindings;
pub mod dispatch;
pub mod facet;
pub mod facets;
pub mod registry;

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;
use uuid::Uuid;

pub use bindings::{error_key, updated_key, Binding, BindingTable};
pub use dispatch::{DispatchOutcome, EngineEvent, EventParseError};
pub use facet::{Facet, FacetContext, FacetError, MissingFacet, PlaceholderFacet};
pub use facets::{HistoryAction, LocaleFacet, RouterFacet, LOCALE_FACET, ROUTER_FACET};
pub use registry::{FacetConstructor, FacetRegistry};

/// One per embedded document. Dropped wholesale when the document is replaced.
pub struct Engine {
    id: Uuid,
    facets: HashMap<String, Rc<dyn Facet>>,
    bindings: BindingTable,
    attached: Cell<bool>,
}

impl Engine {
    pub fn new(registry: &FacetRegistry, context: &FacetContext) -> Self {
        let engine = Self {
            id: Uuid::new_v4(),
            facets: registry.instantiate(context),
            bindings: BindingTable::new(),
            attached: Cell::new(false),
        };
        tracing::debug!(target: "engine", engine = %engine.id, facets = engine.facets.len(), "engine created");
        tracing::trace!(target: "engine", engine = %engine.id, names = ?engine.facet_names(), "facets instantiated");
        engine
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn facet(&self, name: &str) -> Option<Rc<dyn Facet>> {
        self.facets.get(name).cloned()
    }

    pub fn facet_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.facets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }

    pub fn on(&self, event: &str) {
        tracing::info!(target: "engine", event, "engine.on");
    }

    pub fn off(&self, event: &str) {
        tracing::info!(target: "engine", event, "engine.off");
    }

    pub fn add_or_remove_on_handler(
        &self,
        id: impl Into<String>,
        callback: impl Fn(&dyn Facet) + 'static,
    ) {
        let id = id.into();
        tracing::info!(target: "engine", id = %id, "add on handler");
        self.bindings.register(id, callback);
    }

    pub fn remove_on_handler(&self, id: &str) -> bool {
        tracing::info!(target: "engine", id, "remove on handler");
        self.bindings.unregister(id)
    }

    pub fn add_or_remove_off_handler(&self, id: &str) -> bool {
        tracing::info!(target: "engine", id, "add or remove off handler");
        true
    }

    pub fn bindings_ready(&self) {
        tracing::debug!(target: "engine", engine = %self.id, "bindings ready");
        self.attached.set(true);
    }

    /// Fire the update binding for `name` if the facet exists.
    pub fn notify_updated(&self, name: &str) -> bool {
        match self.facets.get(name) {
            Some(facet) => self.bindings.notify_updated(facet.as_ref()),
            None => false,
        }
    }

    pub fn field(&self, facet: &str, field: &str) -> Option<Value> {
        let Some(target) = self.facets.get(facet) else {
            tracing::info!(target: "engine", facet, field, "DUMMY facet");
            return None;
        };
        let value = target.field(field);
        if value.is_none() {
            tracing::info!(target: "engine", facet, field, "DUMMY field");
        }
        value
    }

    pub fn call(&self, facet: &str, method: &str, args: &[Value]) -> Option<Value> {
        let Some(target) = self.facets.get(facet) else {
            tracing::info!(target: "engine", facet, method, "DUMMY facet");
            return None;
        };
        match target.invoke(method, args) {
            Ok(value) => Some(value),
            Err(FacetError::UnknownMethod { .. }) => {
                tracing::info!(target: "engine", facet, method, "DUMMY method");
                None
            }
            Err(err) => {
                tracing::warn!(target: "engine", error = %err, "facet call rejected");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{ParentMessage, ParentPort};
    use crate::translation::Translations;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn engine() -> (Engine, UnboundedReceiver<ParentMessage>) {
        let (parent, rx) = ParentPort::channel();
        let translations = Translations::parse("greeting=Hello %1$s\n");
        let context = FacetContext::new(Arc::new(translations), parent);
        (Engine::new(&FacetRegistry::standard(), &context), rx)
    }

    #[test]
    fn each_engine_gets_its_own_id() {
        let (first, _) = engine();
        let (second, _) = engine();
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn handler_lifecycle_maps_onto_bindings() {
        let (engine, _) = engine();
        engine.add_or_remove_on_handler(updated_key(ROUTER_FACET), |_| {});
        assert!(engine.bindings().contains("facet:updated:core.router"));
        assert!(engine.remove_on_handler("facet:updated:core.router"));
        assert!(engine.bindings().is_empty());
        assert!(engine.add_or_remove_off_handler("anything"));
    }

    #[test]
    fn bindings_ready_marks_engine_attached() {
        let (engine, _) = engine();
        assert!(!engine.is_attached());
        engine.bindings_ready();
        assert!(engine.is_attached());
    }

    #[test]
    fn unknown_names_return_nothing() {
        let (engine, _) = engine();
        assert_eq!(engine.field("vanilla.nothing", "x"), None);
        assert_eq!(engine.field("core.safeZone", "nope"), None);
        assert_eq!(engine.call("core.safeZone", "nope", &[]), None);
        assert_eq!(engine.call("vanilla.nothing", "nope", &[]), None);
    }

    #[test]
    fn locale_facet_translates_through_engine() {
        let (engine, _) = engine();
        assert_eq!(
            engine.call(LOCALE_FACET, "translateWithParameters", &[json!("greeting"), json!(["World"])]),
            Some(json!("Hello World"))
        );
        assert_eq!(
            engine.call(LOCALE_FACET, "translate", &[json!("missing.key")]),
            Some(json!("missing.key"))
        );
    }

    #[test]
    fn start_menu_settings_asks_parent_to_navigate() {
        let (engine, mut rx) = engine();
        engine.call("badger.badgerStartMenuMethods", "openSettings", &[]);
        let message = rx.try_recv().unwrap();
        assert_eq!(message.router_event, "/badger/settings");
    }
}
