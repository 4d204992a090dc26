use std::rc::Rc;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, LocalSet};
use uuid::Uuid;

use crate::config::ShimConfig;
use crate::engine::{updated_key, DispatchOutcome, Engine, FacetContext, FacetRegistry, ROUTER_FACET};
use crate::fetch::ResourceFetcher;
use crate::frame::{
    EmbeddedContext, EmbeddedDocument, FrameHandle, Guest, Location, NavigationRouter,
    ParentMessage, ParentPort, TopWindow,
};
use crate::translation::Translations;

pub enum ShellCommand {
    SetHash {
        hash: String,
        reply: oneshot::Sender<bool>,
    },
    Trigger {
        event: Value,
        reply: oneshot::Sender<DispatchOutcome>,
    },
    Snapshot {
        reply: oneshot::Sender<ShellSnapshot>,
    },
    Document {
        reply: oneshot::Sender<EmbeddedDocument>,
    },
    Reload {
        reply: Option<oneshot::Sender<()>>,
    },
    Shutdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShellSnapshot {
    pub hash: String,
    /// Decoded query string of the top-level hash.
    pub query: Vec<(String, String)>,
    pub location: Location,
    pub file_name: Option<String>,
    pub generation: u64,
    pub engine_id: Uuid,
    pub attached: bool,
}

/// Cloneable, `Send` handle for driving a running [`Shell`].
#[derive(Clone)]
pub struct ShellHandle {
    tx: mpsc::Sender<ShellCommand>,
}

impl ShellHandle {
    pub fn channel() -> (Self, mpsc::Receiver<ShellCommand>) {
        let (tx, rx) = mpsc::channel(32);
        (Self { tx }, rx)
    }

    pub async fn set_hash(&self, hash: &str) -> Result<bool> {
        self.request(|reply| ShellCommand::SetHash {
            hash: hash.to_string(),
            reply,
        })
        .await
    }

    pub async fn trigger(&self, event: Value) -> Result<DispatchOutcome> {
        self.request(|reply| ShellCommand::Trigger { event, reply }).await
    }

    pub async fn snapshot(&self) -> Result<ShellSnapshot> {
        self.request(|reply| ShellCommand::Snapshot { reply }).await
    }

    pub async fn document(&self) -> Result<EmbeddedDocument> {
        self.request(|reply| ShellCommand::Document { reply }).await
    }

    pub async fn reload(&self) -> Result<()> {
        self.request(|reply| ShellCommand::Reload { reply: Some(reply) })
            .await
    }

    /// Fire-and-forget reload, callable from non-async threads.
    pub fn request_reload(&self) -> bool {
        self.tx
            .try_send(ShellCommand::Reload { reply: None })
            .is_ok()
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.tx
            .send(ShellCommand::Shutdown)
            .await
            .map_err(|_| anyhow!("shell has stopped"))
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> ShellCommand) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| anyhow!("shell has stopped"))?;
        rx.await.context("shell dropped the request")
    }
}

/// Both browsing contexts on one `LocalSet`.
pub struct Shell<F> {
    router: Rc<NavigationRouter<F>>,
    frame: Rc<EmbeddedContext>,
    hashes: mpsc::UnboundedReceiver<String>,
    parent: mpsc::UnboundedReceiver<ParentMessage>,
    frame_task: JoinHandle<()>,
}

impl<F: ResourceFetcher + 'static> Shell<F> {
    /// Load routes and translations, then create the embedded context.
    /// Must be called inside a `LocalSet`.
    pub async fn boot(config: &ShimConfig, fetcher: F, guest: Box<dyn Guest>) -> Self {
        let (hash_tx, hashes) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (port, parent) = ParentPort::channel();

        let window = Rc::new(TopWindow::new(hash_tx));
        let router = Rc::new(
            NavigationRouter::new(fetcher, FrameHandle::new(frame_tx), window)
                .with_default_route(config.default_route.clone())
                .with_manifest_path(config.manifest_path.clone()),
        );

        let (_, translations) = tokio::join!(
            router.load_routes(),
            Translations::load(router.fetcher(), &config.version_path, &config.locale_stem)
        );

        let facets = FacetContext::new(Arc::new(translations), port);
        let frame = EmbeddedContext::new(
            FacetRegistry::standard(),
            facets,
            config.probe_timeout(),
            guest,
        );
        let frame_task = tokio::task::spawn_local(Rc::clone(&frame).run(frame_rx));

        Self {
            router,
            frame,
            hashes,
            parent,
            frame_task,
        }
    }

    pub fn router(&self) -> &Rc<NavigationRouter<F>> {
        &self.router
    }

    pub fn frame(&self) -> &Rc<EmbeddedContext> {
        &self.frame
    }

    /// Navigate to the current hash, then serve hash changes, frame requests
    /// and commands until shutdown.
    pub async fn run(mut self, mut commands: mpsc::Receiver<ShellCommand>) {
        self.router.window().force_hashchange();
        loop {
            tokio::select! {
                Some(hash) = self.hashes.recv() => self.navigate(hash),
                Some(message) = self.parent.recv() => {
                    self.router.relay(&message);
                }
                command = commands.recv() => match command {
                    Some(ShellCommand::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
            }
        }
        self.frame_task.abort();
        tracing::info!(target: "frame", "shell stopped");
    }

    // Each navigation runs on its own; a slow fetch never blocks a newer one.
    fn navigate(&self, hash: String) {
        let router = Rc::clone(&self.router);
        tokio::task::spawn_local(async move {
            match router.handle_hash_change(&hash).await {
                Ok(outcome) => tracing::debug!(target: "router", ?outcome, "navigation finished"),
                Err(err) => tracing::error!(target: "router", hash = %hash, error = %err, "navigation failed"),
            }
        });
    }

    fn handle(&self, command: ShellCommand) {
        match command {
            ShellCommand::SetHash { hash, reply } => {
                let _ = reply.send(self.router.window().set_hash(&hash));
            }
            ShellCommand::Trigger { event, reply } => {
                let _ = reply.send(self.frame.engine().trigger_event(&event));
            }
            ShellCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            ShellCommand::Document { reply } => {
                let _ = reply.send(self.frame.document());
            }
            ShellCommand::Reload { reply } => {
                tracing::info!(target: "router", "reloading current route");
                self.router.reload();
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
            ShellCommand::Shutdown => {}
        }
    }

    fn snapshot(&self) -> ShellSnapshot {
        let engine = self.frame.engine();
        let top = self.router.window().location();
        ShellSnapshot {
            hash: top.hash.clone(),
            query: top.query_pairs(),
            location: self.frame.location(),
            file_name: self.router.frame().tag(),
            generation: self.frame.document().generation,
            engine_id: engine.id(),
            attached: engine.is_attached(),
        }
    }
}

/// Stand-in guest: logs router updates and declares its bindings ready.
#[derive(Debug, Default)]
pub struct TracingGuest;

impl Guest for TracingGuest {
    fn attach(&mut self, engine: &Rc<Engine>, document: &EmbeddedDocument) {
        engine.add_or_remove_on_handler(updated_key(ROUTER_FACET), |facet| {
            tracing::info!(target: "frame", state = %facet.snapshot(), "router facet updated");
        });
        engine.bindings_ready();
        tracing::debug!(target: "frame", generation = document.generation, "guest attached");
    }
}

/// Run a shell on a dedicated thread with its own current-thread runtime.
pub fn spawn_shell<F>(config: ShimConfig, fetcher: F) -> Result<(ShellHandle, thread::JoinHandle<()>)>
where
    F: ResourceFetcher + Send + 'static,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build shell runtime")?;
    let (handle, commands) = ShellHandle::channel();

    let join = thread::Builder::new()
        .name("shimframe-shell".into())
        .spawn(move || {
            let local = LocalSet::new();
            local.block_on(&runtime, async move {
                let shell = Shell::boot(&config, fetcher, Box::new(TracingGuest)).await;
                shell.run(commands).await;
            });
        })
        .context("failed to spawn shell thread")?;

    Ok((handle, join))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;
    use std::time::Duration;

    const MANIFEST: &str = r#"{
        "routes": [
            { "fileName": "menu.html", "supportedRoutes": [
                { "route": "/badger/mainMenu", "regexp": "^/badger/mainMenu" },
                { "route": "/badger/settings", "regexp": "^/badger/settings" }
            ] },
            { "fileName": "play.html", "supportedRoutes": [
                { "route": "/badger/play", "regexp": "^/badger/play" }
            ] }
        ]
    }"#;

    fn fetcher() -> MemoryFetcher {
        MemoryFetcher::new()
            .with_file("hbui/routes.json", MANIFEST)
            .with_file("menu.html", "<p>menu</p>")
            .with_file("play.html", "<p>play</p>")
            .with_file("loc.lang", "menu.title=Main Menu\n")
    }

    async fn settle(handle: &ShellHandle, path: &str) -> ShellSnapshot {
        for _ in 0..200 {
            let snapshot = handle.snapshot().await.unwrap();
            if snapshot.location.pathname == path {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("never reached {path}");
    }

    #[tokio::test]
    async fn boots_into_default_route() {
        LocalSet::new()
            .run_until(async {
                let shell = Shell::boot(&ShimConfig::default(), fetcher(), Box::new(TracingGuest)).await;
                let (handle, commands) = ShellHandle::channel();
                tokio::task::spawn_local(shell.run(commands));

                let snapshot = settle(&handle, "/badger/mainMenu").await;
                assert_eq!(snapshot.hash, "#/badger/mainMenu");
                assert_eq!(snapshot.file_name.as_deref(), Some("menu.html"));
                assert_eq!(snapshot.generation, 1);
                assert!(snapshot.attached);

                handle.shutdown().await.unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn frame_navigation_request_reaches_router() {
        LocalSet::new()
            .run_until(async {
                let shell = Shell::boot(&ShimConfig::default(), fetcher(), Box::new(TracingGuest)).await;
                let (handle, commands) = ShellHandle::channel();
                let frame = Rc::clone(shell.frame());
                tokio::task::spawn_local(shell.run(commands));
                settle(&handle, "/badger/mainMenu").await;

                frame
                    .engine()
                    .call("badger.badgerStartMenuMethods", "openSettings", &[]);

                let snapshot = settle(&handle, "/badger/settings").await;
                assert_eq!(snapshot.hash, "#/badger/settings");
                assert_eq!(snapshot.generation, 1, "same file navigates in place");

                handle.shutdown().await.unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn snapshot_decodes_top_level_query() {
        LocalSet::new()
            .run_until(async {
                let shell = Shell::boot(&ShimConfig::default(), fetcher(), Box::new(TracingGuest)).await;
                let (handle, commands) = ShellHandle::channel();
                tokio::task::spawn_local(shell.run(commands));
                settle(&handle, "/badger/mainMenu").await;

                assert!(handle.set_hash("/badger/play?world=alpha%20one&slot=2").await.unwrap());
                let snapshot = settle(&handle, "/badger/play").await;
                assert_eq!(snapshot.hash, "#/badger/play?world=alpha%20one&slot=2");
                assert_eq!(
                    snapshot.query,
                    vec![
                        (String::from("world"), String::from("alpha one")),
                        (String::from("slot"), String::from("2")),
                    ]
                );

                handle.shutdown().await.unwrap();
            })
            .await;
    }
}
