use serde::{Deserialize, Serialize};

/// Where the embedded context currently is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub hash: String,
    pub search: String,
    pub state: String,
    pub pathname: String,
}

impl Location {
    /// Build a location from a raw hash such as `#/badger/play?world=1`.
    pub fn from_hash(raw: &str) -> Self {
        let body = raw.strip_prefix('#').unwrap_or(raw);
        let (pathname, search) = match body.split_once('?') {
            Some((path, query)) => (path, format!("?{query}")),
            None => (body, String::new()),
        };
        Self {
            hash: format!("#{body}"),
            search,
            state: String::new(),
            pathname: pathname.to_string(),
        }
    }

    pub fn set_pathname(&mut self, pathname: &str) {
        self.pathname = pathname.to_string();
        self.hash = format!("#{pathname}{}", self.search);
    }

    /// Decoded `key=value` pairs from `search`.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let query = self.search.strip_prefix('?').unwrap_or(&self.search);
        if query.is_empty() {
            return Vec::new();
        }
        serde_urlencoded::from_str(query).unwrap_or_else(|err| {
            tracing::debug!(target: "frame", search = %self.search, error = %err, "unparseable search string");
            Vec::new()
        })
    }
}

/// Strip the leading `#` and anything from `?` on.
pub fn strip_hash(raw: &str) -> &str {
    let body = raw.strip_prefix('#').unwrap_or(raw);
    body.split('?').next().unwrap_or("")
}
