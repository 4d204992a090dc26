use std::collections::HashMap;

use crate::fetch::ResourceFetcher;

pub const DEFAULT_VERSION_PATH: &str = "hbui/VERSION";
pub const DEFAULT_LOCALE_STEM: &str = "loc";

/// Key/value table parsed from a `KEY=value` locale file.
///
/// Lookups never fail: a missing key translates to itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translations {
    entries: HashMap<String, String>,
}

impl Translations {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a locale file. Content after `#` is a comment, blank lines are
    /// skipped and Windows line endings are tolerated. Lines without `=` are
    /// ignored. A value ends at the next `=`.
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        for line in text.split('\n') {
            let line = line.split('#').next().unwrap_or("");
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split('=');
            if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
                entries.insert(key.to_string(), value.replace('\r', ""));
            }
        }
        Self { entries }
    }

    /// Fetch `VERSION` (optional) and then `<stem>[.<version>].lang`.
    ///
    /// Fetch failures are logged and produce an empty table.
    pub async fn load<F: ResourceFetcher>(fetcher: &F, version_path: &str, stem: &str) -> Self {
        let version = match fetcher.fetch_text(version_path).await {
            Ok(text) => text.lines().next().unwrap_or("").trim().to_string(),
            Err(err) => {
                tracing::debug!(target: "translations", error = %err, "no bundle version file");
                String::new()
            }
        };

        if !version.is_empty() {
            tracing::info!(target: "translations", version = %version, "bundle version");
        }

        let file = locale_file_name(stem, &version);
        tracing::info!(target: "translations", file = %file, "loading locale file");

        match fetcher.fetch_text(&file).await {
            Ok(text) => {
                let table = Self::parse(&text);
                tracing::debug!(target: "translations", keys = table.len(), "loaded");
                table
            }
            Err(err) => {
                tracing::error!(
                    target: "translations",
                    file = %file,
                    error = %err,
                    "failed to load locale file; lookups will return raw keys"
                );
                Self::empty()
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn translate<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).unwrap_or(key)
    }

    /// Substitute positional `%N$s` placeholders, 1-based.
    pub fn translate_with_parameters<S: AsRef<str>>(&self, key: &str, params: &[S]) -> String {
        let mut translation = self.translate(key).to_string();
        for (index, param) in params.iter().enumerate() {
            let placeholder = format!("%{}$s", index + 1);
            translation = translation.replace(&placeholder, param.as_ref());
        }
        translation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn locale_file_name(stem: &str, version: &str) -> String {
    if version.is_empty() {
        format!("{stem}.lang")
    } else {
        format!("{stem}.{version}.lang")
    }
}
