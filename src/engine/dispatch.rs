use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::facet::MissingFacet;
use super::Engine;

pub const FACET_REQUEST: &str = "facet:request";
pub const CORE_EXCEPTION: &str = "core:exception";
pub const FACET_DISCARD: &str = "facet:discard";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventParseError {
    #[error("event is not a [kind, args] array")]
    NotAnArray,
    #[error("event kind is missing or not a string")]
    MissingKind,
    #[error("facet:request carries no facet name")]
    MissingFacetName,
}

/// Inbound protocol event, decoded from `[kind, args]`.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    FacetRequest { name: String },
    CoreException { message: Value },
    FacetDiscard { args: Value },
    Unhandled { kind: String, args: Value },
}

impl EngineEvent {
    pub fn from_wire(wire: &Value) -> Result<Self, EventParseError> {
        let items = wire.as_array().ok_or(EventParseError::NotAnArray)?;
        let kind = items
            .first()
            .and_then(Value::as_str)
            .ok_or(EventParseError::MissingKind)?;
        let args = items.get(1).cloned().unwrap_or(Value::Null);

        Ok(match kind {
            FACET_REQUEST => {
                let name = facet_name(&args).ok_or(EventParseError::MissingFacetName)?;
                Self::FacetRequest {
                    name: name.to_string(),
                }
            }
            CORE_EXCEPTION => Self::CoreException { message: args },
            FACET_DISCARD => Self::FacetDiscard { args },
            other => Self::Unhandled {
                kind: other.to_string(),
                args,
            },
        })
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::FacetRequest { .. } => FACET_REQUEST,
            Self::CoreException { .. } => CORE_EXCEPTION,
            Self::FacetDiscard { .. } => FACET_DISCARD,
            Self::Unhandled { kind, .. } => kind,
        }
    }
}

// Guests send either `[["core.router"]]` or `["core.router"]`.
fn facet_name(args: &Value) -> Option<&str> {
    let first = match args {
        Value::Array(items) => items.first()?,
        other => other,
    };
    match first {
        Value::String(name) => Some(name.as_str()),
        Value::Array(inner) => inner.first()?.as_str(),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The facet exists; its update binding was looked up.
    Updated,
    /// The facet is unknown; its error binding was looked up.
    Errored,
    Logged,
    Discarded,
    Unhandled,
}

impl Engine {
    pub fn dispatch(&self, event: EngineEvent) -> DispatchOutcome {
        tracing::trace!(target: "dispatch", engine = %self.id(), kind = event.kind(), "dispatching");
        match event {
            EngineEvent::FacetRequest { name } => match self.facet(&name) {
                Some(facet) => {
                    tracing::info!(target: "dispatch", facet = %name, "sending facet");
                    self.bindings().notify_updated(facet.as_ref());
                    DispatchOutcome::Updated
                }
                None => {
                    tracing::error!(target: "dispatch", facet = %name, "missing facet");
                    self.bindings().notify_error(&MissingFacet::new(name));
                    DispatchOutcome::Errored
                }
            },
            EngineEvent::CoreException { message } => {
                tracing::error!(target: "dispatch", exception = %message, "guest reported exception");
                DispatchOutcome::Logged
            }
            EngineEvent::FacetDiscard { args } => {
                tracing::debug!(target: "dispatch", %args, "facet discarded");
                DispatchOutcome::Discarded
            }
            EngineEvent::Unhandled { kind, .. } => {
                tracing::warn!(target: "dispatch", kind = %kind, "unhandled event");
                DispatchOutcome::Unhandled
            }
        }
    }

    /// Decode and dispatch a raw `[kind, args]` event. Malformed input is
    /// logged and reported as unhandled.
    pub fn trigger_event(&self, wire: &Value) -> DispatchOutcome {
        match EngineEvent::from_wire(wire) {
            Ok(event) => self.dispatch(event),
            Err(err) => {
                tracing::warn!(target: "dispatch", error = %err, event = %wire, "ignoring malformed event");
                DispatchOutcome::Unhandled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::bindings::{error_key, updated_key};
    use crate::engine::facet::{Facet, FacetContext};
    use crate::engine::registry::FacetRegistry;
    use crate::frame::ParentPort;
    use crate::translation::Translations;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    fn engine() -> Engine {
        let (parent, _rx) = ParentPort::channel();
        let context = FacetContext::new(Arc::new(Translations::empty()), parent);
        Engine::new(&FacetRegistry::standard(), &context)
    }

    fn recorder(engine: &Engine, key: String) -> Rc<RefCell<Vec<String>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        engine.add_or_remove_on_handler(key, move |facet: &dyn Facet| {
            sink.borrow_mut().push(facet.name().to_string())
        });
        seen
    }

    #[test]
    fn parses_nested_and_flat_facet_names() {
        let nested = EngineEvent::from_wire(&json!(["facet:request", [["core.router"]]])).unwrap();
        let flat = EngineEvent::from_wire(&json!(["facet:request", ["core.router"]])).unwrap();
        let expected = EngineEvent::FacetRequest {
            name: "core.router".into(),
        };
        assert_eq!(nested, expected);
        assert_eq!(flat, expected);
    }

    #[test]
    fn rejects_malformed_wire_shapes() {
        assert_eq!(
            EngineEvent::from_wire(&json!({ "kind": "facet:request" })),
            Err(EventParseError::NotAnArray)
        );
        assert_eq!(
            EngineEvent::from_wire(&json!([42])),
            Err(EventParseError::MissingKind)
        );
        assert_eq!(
            EngineEvent::from_wire(&json!(["facet:request", []])),
            Err(EventParseError::MissingFacetName)
        );
    }

    #[test]
    fn known_facet_takes_update_path() {
        let engine = engine();
        let updated = recorder(&engine, updated_key("core.router"));
        let errored = recorder(&engine, error_key("core.router"));

        let outcome = engine.trigger_event(&json!(["facet:request", [["core.router"]]]));

        assert_eq!(outcome, DispatchOutcome::Updated);
        assert_eq!(*updated.borrow(), vec!["core.router"]);
        assert!(errored.borrow().is_empty());
    }

    #[test]
    fn unknown_facet_takes_error_path_only() {
        let engine = engine();
        let updated = recorder(&engine, updated_key("vanilla.nothing"));
        let errored = recorder(&engine, error_key("vanilla.nothing"));

        let outcome = engine.trigger_event(&json!(["facet:request", [["vanilla.nothing"]]]));

        assert_eq!(outcome, DispatchOutcome::Errored);
        assert!(updated.borrow().is_empty());
        assert_eq!(*errored.borrow(), vec!["vanilla.nothing"]);
    }

    #[test]
    fn unknown_facet_without_listener_is_harmless() {
        let engine = engine();
        assert_eq!(
            engine.trigger_event(&json!(["facet:request", [["vanilla.nothing"]]])),
            DispatchOutcome::Errored
        );
    }

    #[test]
    fn other_kinds_never_touch_bindings() {
        let engine = engine();
        let updated = recorder(&engine, updated_key("core.router"));

        assert_eq!(
            engine.trigger_event(&json!(["core:exception", "boom"])),
            DispatchOutcome::Logged
        );
        assert_eq!(
            engine.trigger_event(&json!(["facet:discard", ["core.router"]])),
            DispatchOutcome::Discarded
        );
        assert_eq!(
            engine.trigger_event(&json!(["vanilla:unknown", []])),
            DispatchOutcome::Unhandled
        );
        assert_eq!(engine.trigger_event(&json!("garbage")), DispatchOutcome::Unhandled);
        assert!(updated.borrow().is_empty());
    }
}
