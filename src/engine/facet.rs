use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::frame::{Location, ParentPort};
use crate::translation::Translations;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FacetError {
    #[error("facet {facet} has no method {method}")]
    UnknownMethod { facet: String, method: String },
    #[error("{facet}.{method} expects {expected}")]
    InvalidArguments {
        facet: String,
        method: String,
        expected: &'static str,
    },
}

impl FacetError {
    pub fn unknown(facet: &str, method: &str) -> Self {
        Self::UnknownMethod {
            facet: facet.to_string(),
            method: method.to_string(),
        }
    }

    pub fn invalid(facet: &str, method: &str, expected: &'static str) -> Self {
        Self::InvalidArguments {
            facet: facet.to_string(),
            method: method.to_string(),
            expected,
        }
    }
}

/// A named slice of host state exposed to the UI.
pub trait Facet {
    /// Registration name, e.g. `core.router`.
    fn name(&self) -> &str;

    /// Current state as the UI would read it.
    fn snapshot(&self) -> Value;

    fn field(&self, field: &str) -> Option<Value> {
        self.snapshot().get(field).cloned()
    }

    fn invoke(&self, method: &str, _args: &[Value]) -> Result<Value, FacetError> {
        Err(FacetError::unknown(self.name(), method))
    }
}

/// What facets may reach inside their engine context.
#[derive(Debug, Clone)]
pub struct FacetContext {
    pub translations: Arc<Translations>,
    pub location: Rc<RefCell<Location>>,
    pub parent: ParentPort,
}

impl FacetContext {
    pub fn new(translations: Arc<Translations>, parent: ParentPort) -> Self {
        Self {
            translations,
            location: Rc::new(RefCell::new(Location::default())),
            parent,
        }
    }
}

/// Data-only facet holding an opaque state snapshot.
#[derive(Debug, Clone)]
pub struct PlaceholderFacet {
    name: String,
    state: Value,
}

impl PlaceholderFacet {
    pub fn new(name: impl Into<String>, state: Value) -> Self {
        Self {
            name: name.into(),
            state,
        }
    }
}

impl Facet for PlaceholderFacet {
    fn name(&self) -> &str {
        &self.name
    }

    fn snapshot(&self) -> Value {
        self.state.clone()
    }
}

/// Stands in for a facet name the registry does not know, so the error
/// channel still has something to hand to its listener.
#[derive(Debug, Clone)]
pub struct MissingFacet {
    name: String,
}

impl MissingFacet {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Facet for MissingFacet {
    fn name(&self) -> &str {
        &self.name
    }

    fn snapshot(&self) -> Value {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn placeholder_fields_come_from_snapshot() {
        let facet = PlaceholderFacet::new("core.safeZone", json!({ "safeAreaX": 1 }));
        assert_eq!(facet.field("safeAreaX"), Some(json!(1)));
        assert_eq!(facet.field("safeAreaY"), None);
    }

    #[test]
    fn default_invoke_reports_unknown_method() {
        let facet = PlaceholderFacet::new("core.safeZone", json!({}));
        assert_eq!(
            facet.invoke("explode", &[]),
            Err(FacetError::unknown("core.safeZone", "explode"))
        );
    }

    #[test]
    fn missing_facet_keeps_requested_name() {
        let facet = MissingFacet::new("vanilla.nothing");
        assert_eq!(facet.name(), "vanilla.nothing");
        assert_eq!(facet.snapshot(), Value::Null);
        assert_eq!(facet.field("anything"), None);
    }
}
