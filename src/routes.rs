use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetch::{FetchError, ResourceFetcher};

pub const DEFAULT_MANIFEST_PATH: &str = "hbui/routes.json";

#[derive(Debug, Error)]
pub enum RouteTableError {
    #[error("failed to fetch route manifest: {0}")]
    Fetch(#[from] FetchError),
    #[error("failed to parse route manifest: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedRoute {
    pub route: String,
    pub regexp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEntry {
    pub file_name: String,
    #[serde(default)]
    pub supported_routes: Vec<SupportedRoute>,
}

#[derive(Debug, Deserialize)]
struct RouteManifest {
    #[serde(default)]
    routes: Vec<RouteEntry>,
}

#[derive(Debug, Clone)]
struct CompiledEntry {
    entry: RouteEntry,
    // Aligned with `entry.supported_routes`; `None` for patterns that failed to compile.
    patterns: Vec<Option<Regex>>,
}

/// The entry a path resolved to, plus the sub-route that matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub entry: &'a RouteEntry,
    pub route: &'a SupportedRoute,
}

/// Path-pattern to document-file mappings, in manifest order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<CompiledEntry>,
}

impl RouteTable {
    /// A table with no routes; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<RouteEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| {
                let patterns = entry
                    .supported_routes
                    .iter()
                    .map(|supported| match Regex::new(&supported.regexp) {
                        Ok(regex) => Some(regex),
                        Err(err) => {
                            tracing::warn!(
                                target: "router",
                                file = %entry.file_name,
                                regexp = %supported.regexp,
                                error = %err,
                                "ignoring route pattern that does not compile"
                            );
                            None
                        }
                    })
                    .collect();
                CompiledEntry { entry, patterns }
            })
            .collect();

        Self { entries }
    }

    pub fn from_json(text: &str) -> Result<Self, RouteTableError> {
        let manifest: RouteManifest = serde_json::from_str(text)?;
        Ok(Self::from_entries(manifest.routes))
    }

    pub async fn load<F: ResourceFetcher>(
        fetcher: &F,
        manifest_path: &str,
    ) -> Result<Self, RouteTableError> {
        let text = fetcher.fetch_text(manifest_path).await?;
        Self::from_json(&text)
    }

    /// First entry, in manifest order, with a pattern found anywhere in `path`.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.entries.iter().find_map(|compiled| {
            compiled
                .entry
                .supported_routes
                .iter()
                .zip(&compiled.patterns)
                .find(|(_, pattern)| pattern.as_ref().is_some_and(|re| re.is_match(path)))
                .map(|(route, _)| RouteMatch {
                    entry: &compiled.entry,
                    route,
                })
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter().map(|compiled| &compiled.entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
