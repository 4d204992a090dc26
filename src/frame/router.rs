use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use super::location::{strip_hash, Location};
use super::message::{FrameCommand, FrameMessage, ParentMessage};
use crate::fetch::{FetchError, ResourceFetcher};
use crate::routes::{RouteTable, DEFAULT_MANIFEST_PATH};

pub const DEFAULT_ROUTE: &str = "/badger/mainMenu";
pub const NOT_FOUND_TAG: &str = "404";
pub const NOT_FOUND_DOCUMENT: &str = "<body><h1>Not found</h1></body>";

/// Prepended to every fetched document.
pub const BASE_STYLESHEET: &str = "<style>
  div {
    box-sizing: border-box;
  }
  * {
    user-select: none;
  }
</style>
";

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("failed to fetch {file_name}: {source}")]
    Fetch {
        file_name: String,
        #[source]
        source: FetchError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NavigationOutcome {
    Redirected { to: String },
    NotFound { path: String },
    InPlace { path: String, file_name: String },
    Swapped { path: String, file_name: String },
}

/// The top-level side of the embedded frame: its file tag and command port.
#[derive(Debug)]
pub struct FrameHandle {
    tag: RefCell<Option<String>>,
    port: mpsc::UnboundedSender<FrameCommand>,
}

impl FrameHandle {
    pub fn new(port: mpsc::UnboundedSender<FrameCommand>) -> Self {
        Self {
            tag: RefCell::new(None),
            port,
        }
    }

    /// The file currently loaded in the frame, or [`NOT_FOUND_TAG`].
    pub fn tag(&self) -> Option<String> {
        self.tag.borrow().clone()
    }

    pub fn set_tag(&self, tag: &str) {
        *self.tag.borrow_mut() = Some(tag.to_string());
    }

    pub fn clear_tag(&self) {
        self.tag.borrow_mut().take();
    }

    pub fn post(&self, message: FrameMessage) {
        self.send(FrameCommand::Post(message));
    }

    pub fn write(&self, content: &str) {
        self.send(FrameCommand::Write {
            content: content.to_string(),
        });
    }

    fn send(&self, command: FrameCommand) {
        if self.port.send(command).is_err() {
            tracing::warn!(target: "router", "embedded frame is gone");
        }
    }
}

/// The top-level window's location. Setting a different hash queues a
/// change.
#[derive(Debug)]
pub struct TopWindow {
    location: RefCell<Location>,
    changes: mpsc::UnboundedSender<String>,
}

impl TopWindow {
    pub fn new(changes: mpsc::UnboundedSender<String>) -> Self {
        Self {
            location: RefCell::new(Location::default()),
            changes,
        }
    }

    pub fn hash(&self) -> String {
        self.location.borrow().hash.clone()
    }

    pub fn location(&self) -> Location {
        self.location.borrow().clone()
    }

    /// Returns false when the hash was already `hash`; no change is queued.
    pub fn set_hash(&self, hash: &str) -> bool {
        let location = Location::from_hash(hash);
        if self.location.borrow().hash == location.hash {
            return false;
        }
        let hash = location.hash.clone();
        *self.location.borrow_mut() = location;
        self.queue(hash);
        true
    }

    /// Queue a change for the current hash even though it did not move.
    pub fn force_hashchange(&self) {
        self.queue(self.hash());
    }

    fn queue(&self, hash: String) {
        if self.changes.send(hash).is_err() {
            tracing::debug!(target: "router", "hash change dropped; router stopped");
        }
    }
}

/// Resolves hash changes against the route table and drives the embedded
/// frame.
pub struct NavigationRouter<F> {
    fetcher: F,
    routes: RefCell<Rc<RouteTable>>,
    frame: FrameHandle,
    window: Rc<TopWindow>,
    default_route: String,
    manifest_path: String,
}

impl<F: ResourceFetcher> NavigationRouter<F> {
    pub fn new(fetcher: F, frame: FrameHandle, window: Rc<TopWindow>) -> Self {
        Self {
            fetcher,
            routes: RefCell::new(Rc::new(RouteTable::empty())),
            frame,
            window,
            default_route: DEFAULT_ROUTE.to_string(),
            manifest_path: DEFAULT_MANIFEST_PATH.to_string(),
        }
    }

    pub fn with_default_route(mut self, route: impl Into<String>) -> Self {
        self.default_route = route.into();
        self
    }

    pub fn with_manifest_path(mut self, path: impl Into<String>) -> Self {
        self.manifest_path = path.into();
        self
    }

    /// Fetch the manifest. On failure the table stays empty and every path
    /// resolves to Not Found.
    pub async fn load_routes(&self) -> bool {
        match RouteTable::load(&self.fetcher, &self.manifest_path).await {
            Ok(table) => {
                tracing::info!(target: "router", routes = table.len(), "route manifest loaded");
                self.install_routes(table);
                true
            }
            Err(err) => {
                tracing::error!(
                    target: "router",
                    path = %self.manifest_path,
                    error = %err,
                    "failed to load route manifest"
                );
                false
            }
        }
    }

    pub fn install_routes(&self, table: RouteTable) {
        *self.routes.borrow_mut() = Rc::new(table);
    }

    pub fn routes(&self) -> Rc<RouteTable> {
        self.routes.borrow().clone()
    }

    pub fn frame(&self) -> &FrameHandle {
        &self.frame
    }

    pub fn window(&self) -> &Rc<TopWindow> {
        &self.window
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub async fn handle_hash_change(
        &self,
        hash: &str,
    ) -> Result<NavigationOutcome, NavigationError> {
        let path = strip_hash(hash);
        if path.is_empty() {
            tracing::debug!(target: "router", to = %self.default_route, "empty path; redirecting");
            self.window.set_hash(&self.default_route);
            return Ok(NavigationOutcome::Redirected {
                to: self.default_route.clone(),
            });
        }

        let routes = self.routes();
        let Some(found) = routes.resolve(path) else {
            tracing::error!(target: "router", path = %html_escape::encode_text(path), "not found");
            self.frame.write(NOT_FOUND_DOCUMENT);
            self.frame.set_tag(NOT_FOUND_TAG);
            return Ok(NavigationOutcome::NotFound {
                path: path.to_string(),
            });
        };
        let file_name = found.entry.file_name.clone();
        tracing::debug!(target: "router", path = %path, route = %found.route.route, file = %file_name, "resolved");

        if self.frame.tag().as_deref() == Some(file_name.as_str()) {
            self.frame.post(FrameMessage::navigate(path));
            return Ok(NavigationOutcome::InPlace {
                path: path.to_string(),
                file_name,
            });
        }

        tracing::info!(target: "router", file = %file_name, "loading file");
        let text = self
            .fetcher
            .fetch_text(&file_name)
            .await
            .map_err(|source| NavigationError::Fetch {
                file_name: file_name.clone(),
                source,
            })?;

        // Whatever finishes last owns the frame.
        self.frame.set_tag(&file_name);
        self.frame
            .post(FrameMessage::replace(path, format!("{BASE_STYLESHEET}{text}")));
        Ok(NavigationOutcome::Swapped {
            path: path.to_string(),
            file_name,
        })
    }

    /// Treat a navigation request from the embedded context as a hash change.
    pub fn relay(&self, message: &ParentMessage) -> bool {
        if message.router_event.is_empty() {
            tracing::debug!(target: "router", "ignoring empty navigation request");
            return false;
        }
        tracing::info!(target: "router", path = %message.router_event, "navigation requested by frame");
        self.window.set_hash(&message.router_event);
        true
    }

    /// Forget the loaded file and navigate to the current hash again.
    pub fn reload(&self) {
        self.frame.clear_tag();
        self.window.force_hashchange();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;
    use crate::routes::{RouteEntry, SupportedRoute};

    struct Harness {
        router: NavigationRouter<Rc<MemoryFetcher>>,
        fetcher: Rc<MemoryFetcher>,
        frame_rx: mpsc::UnboundedReceiver<FrameCommand>,
        hash_rx: mpsc::UnboundedReceiver<String>,
    }

    fn entry(file_name: &str, regexp: &str) -> RouteEntry {
        RouteEntry {
            file_name: file_name.to_string(),
            supported_routes: vec![SupportedRoute {
                route: regexp.trim_start_matches('^').to_string(),
                regexp: regexp.to_string(),
            }],
        }
    }

    fn harness() -> Harness {
        let fetcher = Rc::new(
            MemoryFetcher::new()
                .with_file("menu.html", "<p>menu</p>")
                .with_file("play.html", "<p>play</p>"),
        );
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (hash_tx, hash_rx) = mpsc::unbounded_channel();
        let router = NavigationRouter::new(
            Rc::clone(&fetcher),
            FrameHandle::new(frame_tx),
            Rc::new(TopWindow::new(hash_tx)),
        );
        router.install_routes(RouteTable::from_entries(vec![
            entry("menu.html", "^/badger/mainMenu"),
            entry("menu.html", "^/badger/settings"),
            entry("play.html", "^/badger/play"),
        ]));
        Harness {
            router,
            fetcher,
            frame_rx,
            hash_rx,
        }
    }

    #[tokio::test]
    async fn empty_path_redirects_to_default() {
        let mut h = harness();
        for hash in ["", "#", "#?x=1"] {
            let outcome = h.router.handle_hash_change(hash).await.unwrap();
            assert_eq!(
                outcome,
                NavigationOutcome::Redirected {
                    to: DEFAULT_ROUTE.to_string()
                }
            );
        }
        assert_eq!(h.hash_rx.try_recv().unwrap(), "#/badger/mainMenu");
        assert!(h.frame_rx.try_recv().is_err());
        assert_eq!(h.fetcher.total_fetches(), 0);
    }

    #[tokio::test]
    async fn new_file_is_fetched_tagged_and_posted_with_content() {
        let mut h = harness();
        let outcome = h.router.handle_hash_change("#/badger/mainMenu").await.unwrap();

        assert!(matches!(outcome, NavigationOutcome::Swapped { .. }));
        assert_eq!(h.router.frame().tag().as_deref(), Some("menu.html"));
        match h.frame_rx.try_recv().unwrap() {
            FrameCommand::Post(message) => {
                assert_eq!(message.pathname, "/badger/mainMenu");
                let content = message.content.unwrap();
                assert!(content.starts_with(BASE_STYLESHEET));
                assert!(content.ends_with("<p>menu</p>"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[tokio::test]
    async fn same_file_navigates_in_place_without_fetching() {
        let mut h = harness();
        h.router.handle_hash_change("#/badger/mainMenu").await.unwrap();
        let outcome = h.router.handle_hash_change("#/badger/settings?tab=2").await.unwrap();

        assert_eq!(
            outcome,
            NavigationOutcome::InPlace {
                path: "/badger/settings".into(),
                file_name: "menu.html".into()
            }
        );
        assert_eq!(h.fetcher.fetch_count("menu.html"), 1);
        assert!(matches!(
            h.frame_rx.try_recv().unwrap(),
            FrameCommand::Post(FrameMessage { content: Some(_), .. })
        ));
        assert_eq!(
            h.frame_rx.try_recv().unwrap(),
            FrameCommand::Post(FrameMessage::navigate("/badger/settings"))
        );
    }

    #[tokio::test]
    async fn unmatched_path_writes_not_found() {
        let mut h = harness();
        let outcome = h.router.handle_hash_change("#/badger/nowhere").await.unwrap();

        assert_eq!(
            outcome,
            NavigationOutcome::NotFound {
                path: "/badger/nowhere".into()
            }
        );
        assert_eq!(h.router.frame().tag().as_deref(), Some(NOT_FOUND_TAG));
        assert_eq!(
            h.frame_rx.try_recv().unwrap(),
            FrameCommand::Write {
                content: NOT_FOUND_DOCUMENT.into()
            }
        );
        assert_eq!(h.fetcher.total_fetches(), 0);
    }

    #[tokio::test]
    async fn fetch_failure_propagates_and_leaves_tag() {
        let mut h = harness();
        h.fetcher.remove("play.html");
        let err = h.router.handle_hash_change("#/badger/play").await.unwrap_err();

        assert!(matches!(err, NavigationError::Fetch { ref file_name, .. } if file_name == "play.html"));
        assert_eq!(h.router.frame().tag(), None);
        assert!(h.frame_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn relay_sets_hash_once() {
        let mut h = harness();
        assert!(h.router.relay(&ParentMessage {
            router_event: "/badger/play".into()
        }));
        assert!(!h.router.relay(&ParentMessage {
            router_event: String::new()
        }));
        h.router.relay(&ParentMessage {
            router_event: "/badger/play".into(),
        });

        assert_eq!(h.hash_rx.try_recv().unwrap(), "#/badger/play");
        assert!(h.hash_rx.try_recv().is_err());
    }

    #[test]
    fn window_keeps_search_of_latest_hash() {
        let (hash_tx, mut hash_rx) = mpsc::unbounded_channel();
        let window = TopWindow::new(hash_tx);

        assert!(window.set_hash("/badger/play?world=alpha"));
        assert!(!window.set_hash("#/badger/play?world=alpha"));
        let location = window.location();
        assert_eq!(location.pathname, "/badger/play");
        assert_eq!(location.search, "?world=alpha");
        assert_eq!(hash_rx.try_recv().unwrap(), "#/badger/play?world=alpha");
        assert!(hash_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn reload_refetches_current_file() {
        let mut h = harness();
        h.router.window().set_hash("/badger/play");
        let hash = h.hash_rx.try_recv().unwrap();
        h.router.handle_hash_change(&hash).await.unwrap();

        h.router.reload();
        let hash = h.hash_rx.try_recv().unwrap();
        let outcome = h.router.handle_hash_change(&hash).await.unwrap();

        assert!(matches!(outcome, NavigationOutcome::Swapped { .. }));
        assert_eq!(h.fetcher.fetch_count("play.html"), 2);
    }
}
