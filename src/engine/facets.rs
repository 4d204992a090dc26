use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use super::facet::{Facet, FacetContext, FacetError};
use crate::frame::{Location, ParentPort};
use crate::translation::Translations;

pub const ROUTER_FACET: &str = "core.router";
pub const LOCALE_FACET: &str = "core.locale";

fn string_arg<'a>(
    facet: &str,
    method: &str,
    args: &'a [Value],
    index: usize,
) -> Result<&'a str, FacetError> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| FacetError::invalid(facet, method, "a string argument"))
}

fn display_arg(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `core.locale`: translation lookups backed by the context's table.
pub struct LocaleFacet {
    name: String,
    locale: String,
    translations: Arc<Translations>,
}

impl LocaleFacet {
    pub fn new(name: &str, context: &FacetContext) -> Self {
        Self {
            name: name.to_string(),
            locale: String::from("en_US"),
            translations: Arc::clone(&context.translations),
        }
    }

    pub fn translate(&self, id: &str) -> String {
        self.translations.translate(id).to_string()
    }

    pub fn translate_with_parameters(&self, id: &str, params: &[String]) -> String {
        self.translations.translate_with_parameters(id, params)
    }

    /// `M/D/YYYY`, the `en_US` short date. Accepts epoch milliseconds or an
    /// RFC 3339 / `YYYY-MM-DD` string.
    pub fn format_date(&self, date: &Value) -> Option<String> {
        let date: NaiveDate = match date {
            Value::Number(n) => DateTime::<Utc>::from_timestamp_millis(n.as_f64()? as i64)?.date_naive(),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.date_naive())
                .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
                .ok()?,
            _ => return None,
        };
        Some(date.format("%-m/%-d/%Y").to_string())
    }
}

impl Facet for LocaleFacet {
    fn name(&self) -> &str {
        &self.name
    }

    fn snapshot(&self) -> Value {
        json!({ "locale": self.locale })
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, FacetError> {
        match method {
            "translate" => {
                let id = string_arg(&self.name, method, args, 0)?;
                Ok(Value::String(self.translate(id)))
            }
            "translateWithParameters" => {
                let id = string_arg(&self.name, method, args, 0)?;
                let params: Vec<String> = match args.get(1) {
                    Some(Value::Array(values)) => values.iter().map(display_arg).collect(),
                    Some(_) => {
                        return Err(FacetError::invalid(&self.name, method, "a parameter list"))
                    }
                    None => Vec::new(),
                };
                Ok(Value::String(self.translate_with_parameters(id, &params)))
            }
            "formatDate" => {
                let date = args
                    .first()
                    .ok_or_else(|| FacetError::invalid(&self.name, method, "a date"))?;
                self.format_date(date)
                    .map(Value::String)
                    .ok_or_else(|| FacetError::invalid(&self.name, method, "a date"))
            }
            _ => Err(FacetError::unknown(&self.name, method)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HistoryAction {
    Replace,
    Push,
}

/// `core.router`: mirrors the embedded location and turns history calls into
/// parent navigation requests.
pub struct RouterFacet {
    name: String,
    location: Rc<RefCell<Location>>,
    parent: ParentPort,
    previous: RefCell<Vec<String>>,
    action: Cell<HistoryAction>,
}

impl RouterFacet {
    pub const TRANSITION_TIME_MS: u64 = 800;
    pub const HISTORY_LENGTH: usize = 5;

    pub fn new(name: &str, context: &FacetContext) -> Self {
        Self {
            name: name.to_string(),
            location: Rc::clone(&context.location),
            parent: context.parent.clone(),
            previous: RefCell::new(Vec::new()),
            action: Cell::new(HistoryAction::Replace),
        }
    }

    pub fn location(&self) -> Location {
        self.location.borrow().clone()
    }

    pub fn action(&self) -> HistoryAction {
        self.action.get()
    }

    pub fn push(&self, path: &str) {
        self.action.set(HistoryAction::Push);
        self.remember_current();
        tracing::info!(target: "engine", path = %path, "router push");
        self.parent.goto_route(path);
    }

    pub fn replace(&self, path: &str) {
        self.remember_current();
        self.action.set(HistoryAction::Replace);
        tracing::info!(target: "engine", path = %path, "router replace");
        self.parent.goto_route(path);
    }

    /// Navigate to the path recorded before the current one. The newest
    /// record is dropped either way.
    pub fn go_back(&self) -> Option<String> {
        let mut previous = self.previous.borrow_mut();
        let target = previous.len().checked_sub(2).map(|index| previous[index].clone());
        previous.pop();
        let recorded = previous.len();
        drop(previous);

        let Some(path) = target else {
            tracing::warn!(target: "engine", recorded, "nothing to go back to");
            return None;
        };

        tracing::info!(target: "engine", path = %path, "router back");
        self.parent.goto_route(&path);
        Some(path)
    }

    fn remember_current(&self) {
        let current = self.location.borrow().pathname.clone();
        self.previous.borrow_mut().push(current);
    }
}

impl Facet for RouterFacet {
    fn name(&self) -> &str {
        &self.name
    }

    fn snapshot(&self) -> Value {
        json!({
            "engineUITransitionTime": Self::TRANSITION_TIME_MS,
            "history": {
                "location": self.location(),
                "length": Self::HISTORY_LENGTH,
                "action": self.action(),
            }
        })
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, FacetError> {
        let method = method.strip_prefix("history.").unwrap_or(method);
        match method {
            "push" => {
                self.push(string_arg(&self.name, method, args, 0)?);
                Ok(Value::Null)
            }
            "replace" => {
                self.replace(string_arg(&self.name, method, args, 0)?);
                Ok(Value::Null)
            }
            "goBack" => {
                self.go_back();
                Ok(Value::Null)
            }
            _ => Err(FacetError::unknown(&self.name, method)),
        }
    }
}

/// Method facet whose calls map to fixed parent navigations.
pub struct NavigationMethodsFacet {
    name: String,
    parent: ParentPort,
    targets: &'static [(&'static str, &'static str)],
}

impl NavigationMethodsFacet {
    pub fn new(
        name: &str,
        context: &FacetContext,
        targets: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            name: name.to_string(),
            parent: context.parent.clone(),
            targets,
        }
    }
}

impl Facet for NavigationMethodsFacet {
    fn name(&self) -> &str {
        &self.name
    }

    fn snapshot(&self) -> Value {
        json!({})
    }

    fn invoke(&self, method: &str, _args: &[Value]) -> Result<Value, FacetError> {
        let (_, path) = self
            .targets
            .iter()
            .find(|(name, _)| *name == method)
            .ok_or_else(|| FacetError::unknown(&self.name, method))?;
        self.parent.goto_route(path);
        Ok(Value::Null)
    }
}

/// Facet whose methods only acknowledge the call, optionally with a fixed
/// return value.
pub struct LoggingMethodsFacet {
    name: String,
    state: Value,
    methods: &'static [(&'static str, fn() -> Value)],
}

impl LoggingMethodsFacet {
    pub fn new(
        name: &str,
        state: Value,
        methods: &'static [(&'static str, fn() -> Value)],
    ) -> Self {
        Self {
            name: name.to_string(),
            state,
            methods,
        }
    }
}

impl Facet for LoggingMethodsFacet {
    fn name(&self) -> &str {
        &self.name
    }

    fn snapshot(&self) -> Value {
        self.state.clone()
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, FacetError> {
        let (_, result) = self
            .methods
            .iter()
            .find(|(name, _)| *name == method)
            .ok_or_else(|| FacetError::unknown(&self.name, method))?;
        tracing::info!(target: "engine", facet = %self.name, method, ?args, "facet method called");
        Ok(result())
    }
}

/// `core.sound`: asset playback is out of reach, so requests are only logged.
pub struct SoundFacet {
    name: String,
    played: RefCell<Vec<String>>,
}

impl SoundFacet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            played: RefCell::new(Vec::new()),
        }
    }

    #[cfg(test)]
    pub fn played(&self) -> Vec<String> {
        self.played.borrow().clone()
    }
}

impl Facet for SoundFacet {
    fn name(&self) -> &str {
        &self.name
    }

    fn snapshot(&self) -> Value {
        json!({ "sound_definitions": {} })
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, FacetError> {
        match method {
            "play" => {
                let id = string_arg(&self.name, method, args, 0)?;
                tracing::info!(target: "engine", sound = %id, "sound requested");
                self.played.borrow_mut().push(id.to_string());
                Ok(Value::Null)
            }
            "isPlaying" => Ok(Value::Bool(false)),
            "fadeOut" => Ok(Value::Null),
            _ => Err(FacetError::unknown(&self.name, method)),
        }
    }
}
