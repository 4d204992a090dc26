use std::path::Path;

use notify::{Error as NotifyError, Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};

use crate::shell::ShellHandle;

/// Reload the current route whenever something under `root` changes.
/// The returned watcher must be kept alive.
pub fn watch_bundle(root: &Path, shell: ShellHandle) -> notify::Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |event: Result<NotifyEvent, NotifyError>| {
        match event {
            Ok(event) if is_content_change(&event.kind) => {
                tracing::info!(target: "watch", paths = ?event.paths, "bundle changed");
                if !shell.request_reload() {
                    tracing::warn!(target: "watch", "shell is busy or gone; reload skipped");
                }
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(target: "watch", error = %err, "watch error"),
        }
    })?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    tracing::info!(target: "watch", root = %root.display(), "watching bundle");
    Ok(watcher)
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};

    #[test]
    fn only_content_changes_trigger_reloads() {
        assert!(is_content_change(&EventKind::Create(CreateKind::File)));
        assert!(is_content_change(&EventKind::Modify(ModifyKind::Any)));
        assert!(!is_content_change(&EventKind::Access(AccessKind::Any)));
    }

    #[tokio::test]
    async fn file_change_requests_reload() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, mut commands) = ShellHandle::channel();
        let _watcher = watch_bundle(dir.path(), handle).unwrap();

        std::fs::write(dir.path().join("menu.html"), "<p>changed</p>").unwrap();

        let command = tokio::time::timeout(std::time::Duration::from_secs(5), commands.recv())
            .await
            .expect("no reload within timeout");
        assert!(matches!(
            command,
            Some(crate::shell::ShellCommand::Reload { reply: None })
        ));
    }
}
