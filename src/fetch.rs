use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected status {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("file error: {0}")]
    File(#[from] std::io::Error),
    #[error("invalid resource path {path}: {source}")]
    InvalidPath {
        path: String,
        source: url::ParseError,
    },
    #[error("invalid bundle root: {0}")]
    InvalidRoot(String),
    #[error("resource not found: {0}")]
    NotFound(String),
}

/// Source of bundle resources (route manifest, documents, locale files).
///
/// Paths are bundle-relative; a leading `/` is tolerated and refers to the
/// bundle root rather than the filesystem root.
pub trait ResourceFetcher {
    fn fetch_text(&self, path: &str) -> impl Future<Output = Result<String, FetchError>>;
}

impl<T: ResourceFetcher> ResourceFetcher for Rc<T> {
    fn fetch_text(&self, path: &str) -> impl Future<Output = Result<String, FetchError>> {
        (**self).fetch_text(path)
    }
}

/// Fetches bundle resources over http(s) or from disk, relative to a root URL.
#[derive(Debug, Clone)]
pub struct BundleFetcher {
    root: Url,
    client: reqwest::Client,
}

impl BundleFetcher {
    pub fn new(root: Url) -> Self {
        Self {
            root: ensure_directory_url(root),
            client: reqwest::Client::new(),
        }
    }

    /// Accepts either a URL (`http`, `https`, `file`) or a local directory path.
    pub fn from_location(location: &str) -> Result<Self, FetchError> {
        let trimmed = location.trim();
        if trimmed.is_empty() {
            return Err(FetchError::InvalidRoot(String::from("bundle root is empty")));
        }

        if let Ok(url) = Url::parse(trimmed) {
            if matches!(url.scheme(), "http" | "https" | "file") {
                return Ok(Self::new(url));
            }
        }

        let path = Path::new(trimmed);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let url = Url::from_directory_path(&absolute)
            .map_err(|_| FetchError::InvalidRoot(absolute.display().to_string()))?;
        Ok(Self::new(url))
    }

    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Local directory backing the bundle, when the root is a `file://` URL.
    pub fn root_dir(&self) -> Option<PathBuf> {
        if self.root.scheme() == "file" {
            self.root.to_file_path().ok()
        } else {
            None
        }
    }

    pub fn resolve(&self, path: &str) -> Result<Url, FetchError> {
        let relative = path.trim_start_matches('/');
        self.root
            .join(relative)
            .map_err(|source| FetchError::InvalidPath {
                path: path.to_string(),
                source,
            })
    }
}

impl ResourceFetcher for BundleFetcher {
    async fn fetch_text(&self, path: &str) -> Result<String, FetchError> {
        let url = self.resolve(path)?;
        tracing::debug!(target: "fetch", url = %url, "fetching");

        if url.scheme() == "file" {
            return fetch_file_url(&url).await;
        }

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}

async fn fetch_file_url(url: &Url) -> Result<String, FetchError> {
    let path = url.to_file_path().map_err(|_| {
        FetchError::File(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "invalid file URL",
        ))
    })?;

    if path.is_dir() {
        return Err(FetchError::File(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path is a directory",
        )));
    }

    match tokio::fs::read_to_string(&path).await {
        Ok(contents) => Ok(contents),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(FetchError::NotFound(path.display().to_string()))
        }
        Err(err) => Err(FetchError::File(err)),
    }
}

fn ensure_directory_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// In-memory bundle with per-path fetch counters.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    files: RefCell<HashMap<String, String>>,
    delays: RefCell<HashMap<String, Duration>>,
    hits: RefCell<HashMap<String, usize>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&self, path: &str, contents: impl Into<String>) {
        self.files
            .borrow_mut()
            .insert(normalize(path).to_string(), contents.into());
    }

    pub fn remove(&self, path: &str) -> Option<String> {
        self.files.borrow_mut().remove(normalize(path))
    }

    /// Make every fetch of `path` wait `delay` before completing.
    pub fn set_delay(&self, path: &str, delay: Duration) {
        self.delays
            .borrow_mut()
            .insert(normalize(path).to_string(), delay);
    }

    pub fn fetch_count(&self, path: &str) -> usize {
        self.hits.borrow().get(normalize(path)).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.hits.borrow().values().sum()
    }
}

impl ResourceFetcher for MemoryFetcher {
    async fn fetch_text(&self, path: &str) -> Result<String, FetchError> {
        let key = normalize(path).to_string();
        *self.hits.borrow_mut().entry(key.clone()).or_insert(0) += 1;

        let delay = self.delays.borrow().get(&key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.files
            .borrow()
            .get(&key)
            .cloned()
            .ok_or(FetchError::NotFound(key))
    }
}

fn normalize(path: &str) -> &str {
    path.trim_start_matches('/')
}
