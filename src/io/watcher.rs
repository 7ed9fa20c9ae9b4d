use crate::io::events::InboxEvent;
use anyhow::Result;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use tokio::sync::mpsc::Sender;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Watch the inbox directory and forward every dropped photo to the
/// pipeline channel. The returned watcher must be kept alive.
pub fn setup_inbox_watcher(path: &Path, tx: Sender<InboxEvent>) -> Result<RecommendedWatcher> {
    let tx_clone = tx.clone();

    let mut watcher =
        notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
            match res {
                Ok(event) => {
                    // Only creations and writes matter; metadata churn is noise.
                    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        return;
                    }
                    for path in event.paths {
                        if is_image_file(&path) {
                            let _ = tx_clone.blocking_send(InboxEvent::NewImage(path));
                        }
                    }
                }
                Err(e) => {
                    let _ = tx_clone
                        .blocking_send(InboxEvent::WatchError(format!("Watch error: {:?}", e)));
                }
            }
        })?;

    watcher.watch(path, RecursiveMode::NonRecursive)?;

    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extension_filter() {
        assert!(is_image_file(Path::new("inbox/photo.jpg")));
        assert!(is_image_file(Path::new("inbox/PHOTO.JPEG")));
        assert!(is_image_file(Path::new("inbox/label.webp")));
        assert!(!is_image_file(Path::new("inbox/notes.txt")));
        assert!(!is_image_file(Path::new("inbox/archive.tar.gz")));
        assert!(!is_image_file(Path::new("inbox/noextension")));
    }
}
