use std::future::Future;
use std::time::Duration;

use log::{debug, error, info};

use crate::clipboard::{self, ClipboardSource};
use crate::detector::{Classification, DetectionState};
use crate::dispatcher::Dispatcher;
use crate::image_store::ImageStore;
use crate::types::{ClipboardSnapshot, DispatchContent};

/// The poll-detect-dispatch loop. Owns the detection state outright.
pub struct Monitor<S> {
    source: S,
    state: DetectionState,
    store: ImageStore,
    dispatcher: Dispatcher,
    interval: Duration,
}

impl<S: ClipboardSource> Monitor<S> {
    pub fn new(source: S, store: ImageStore, dispatcher: Dispatcher, interval: Duration) -> Self {
        Self {
            source,
            state: DetectionState::new(),
            store,
            dispatcher,
            interval,
        }
    }

    pub fn state(&self) -> &DetectionState {
        &self.state
    }

    /// Reads the clipboard and classifies what it holds. New images are
    /// persisted here. Returns the content to dispatch, if any.
    ///
    /// The state advances before persistence or dispatch, so a failure
    /// further down is not retried for the same content.
    pub fn poll(&mut self) -> Option<DispatchContent> {
        let snapshot = clipboard::snapshot(&mut self.source);

        match (self.state.classify(&snapshot), snapshot) {
            (Classification::NewImage(fingerprint), ClipboardSnapshot::Image(image)) => {
                info!(
                    "New image detected in clipboard (hash: {}...). Processing.",
                    fingerprint.short()
                );
                match self.store.save(&image) {
                    Ok(saved) => Some(DispatchContent::Image(saved)),
                    Err(e) => {
                        error!("Failed to save clipboard image: {}", e);
                        None
                    }
                }
            }
            (Classification::NewText(text), _) => {
                info!("New text detected in clipboard ({} chars). Processing.", text.chars().count());
                Some(DispatchContent::Text(text))
            }
            (Classification::Empty { cleared: true }, _) => {
                info!("Clipboard is empty, resetting last seen content.");
                None
            }
            (Classification::Unchanged, _) => {
                debug!("Clipboard content unchanged");
                None
            }
            _ => None,
        }
    }

    /// One full tick. Errors are logged, never returned.
    pub async fn tick(&mut self) {
        let Some(content) = self.poll() else {
            return;
        };

        if let Err(e) = self.dispatcher.dispatch(&content).await {
            error!("Error while processing workflow: {}", e);
        }
    }

    /// Ticks until `shutdown` resolves. Shutdown is only observed between
    /// ticks; a tick in progress always completes.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            "Clipboard monitor started. Polling every {:?}, posting to {}",
            self.interval,
            self.dispatcher.endpoint()
        );

        let mut delay = Duration::ZERO;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(delay) => {}
            }

            self.tick().await;
            delay = self.interval;
        }

        info!("Clipboard monitor stopped by user.");
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use serde_json::{json, Value};

    use super::*;
    use crate::clipboard::fake::FakeClipboard;
    use crate::clipboard::ClipboardRead;
    use crate::dispatcher::stub::serve_once;
    use crate::dispatcher::DEFAULT_CLIENT_ID;
    use crate::types::RawImage;
    use reqwest::Url;

    fn pixel(fill: u8) -> RawImage {
        RawImage {
            width: 1,
            height: 1,
            rgba: vec![fill, fill, fill, 255],
        }
    }

    fn monitor(root: &Path, source: FakeClipboard, endpoint: Url) -> Monitor<FakeClipboard> {
        let input_root = root.join("input");
        let template = root.join("workflow.json");
        fs::write(
            &template,
            json!({
                "7": {"class_type": "LoadImage", "_meta": {"title": "load_clipboard_image"}, "inputs": {"image": "old.png"}}
            })
            .to_string(),
        )
        .unwrap();

        Monitor::new(
            source,
            ImageStore::new(input_root.join("clipboard_images"), Some(input_root)),
            Dispatcher::new(endpoint, template, DEFAULT_CLIENT_ID, Duration::from_secs(5)).unwrap(),
            Duration::from_millis(10),
        )
    }

    fn offline() -> Url {
        Url::parse("http://127.0.0.1:1/prompt").unwrap()
    }

    fn saved_files(root: &Path) -> usize {
        fs::read_dir(root.join("input").join("clipboard_images"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[test]
    fn same_image_is_persisted_and_dispatched_once() {
        let tmp = tempfile::tempdir().unwrap();
        let mut source = FakeClipboard::default();
        source
            .push(ClipboardRead::Content(pixel(1)), ClipboardRead::Absent)
            .push(ClipboardRead::Content(pixel(1)), ClipboardRead::Absent);
        let mut monitor = monitor(tmp.path(), source, offline());

        let first = monitor.poll();
        let second = monitor.poll();

        match first {
            Some(DispatchContent::Image(saved)) => {
                assert!(saved.engine_path.starts_with("clipboard_images/clipboard_"));
            }
            other => panic!("expected image dispatch, got {:?}", other),
        }
        assert_eq!(second, None);
        assert_eq!(saved_files(tmp.path()), 1);
    }

    #[test]
    fn image_and_text_together_only_take_image_path() {
        let tmp = tempfile::tempdir().unwrap();
        let mut source = FakeClipboard::default();
        source.push(
            ClipboardRead::Content(pixel(5)),
            ClipboardRead::Content("caption".into()),
        );
        let mut monitor = monitor(tmp.path(), source, offline());

        assert!(matches!(monitor.poll(), Some(DispatchContent::Image(_))));
        assert_eq!(monitor.source.text_reads, 0);
        assert!(monitor.state().last_text_value().is_none());
    }

    #[test]
    fn empty_clipboard_allows_the_same_text_again() {
        let tmp = tempfile::tempdir().unwrap();
        let mut source = FakeClipboard::default();
        source
            .push(ClipboardRead::Absent, ClipboardRead::Content("hello".into()))
            .push(ClipboardRead::Unavailable("busy".into()), ClipboardRead::Absent)
            .push(ClipboardRead::Absent, ClipboardRead::Content("hello".into()));
        let mut monitor = monitor(tmp.path(), source, offline());

        assert_eq!(monitor.poll(), Some(DispatchContent::Text("hello".into())));
        assert_eq!(monitor.poll(), None);
        assert!(monitor.state().is_clear());
        assert_eq!(monitor.poll(), Some(DispatchContent::Text("hello".into())));
    }

    #[test]
    fn whitespace_text_is_not_dispatched() {
        let tmp = tempfile::tempdir().unwrap();
        let mut source = FakeClipboard::default();
        source.push(ClipboardRead::Absent, ClipboardRead::Content("  \n ".into()));
        let mut monitor = monitor(tmp.path(), source, offline());

        assert_eq!(monitor.poll(), None);
        assert!(monitor.state().is_clear());
    }

    #[tokio::test]
    async fn tick_posts_patched_template_for_new_image() {
        let tmp = tempfile::tempdir().unwrap();
        let mut source = FakeClipboard::default();
        source.push(ClipboardRead::Content(pixel(9)), ClipboardRead::Absent);
        let (endpoint, server) = serve_once("HTTP/1.1 200 OK", r#"{"prompt_id": "p1"}"#).await;
        let mut monitor = monitor(tmp.path(), source, endpoint);

        monitor.tick().await;

        let sent: Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        let image = sent["prompt"]["7"]["inputs"]["image"].as_str().unwrap();
        assert!(image.starts_with("clipboard_images/clipboard_") && image.ends_with(".png"));
        assert_eq!(sent["client_id"], json!("clipboard_script"));
    }

    #[tokio::test]
    async fn failed_dispatch_still_advances_state() {
        let tmp = tempfile::tempdir().unwrap();
        let mut source = FakeClipboard::default();
        source
            .push(ClipboardRead::Absent, ClipboardRead::Content("prompt".into()))
            .push(ClipboardRead::Absent, ClipboardRead::Content("prompt".into()));
        let mut monitor = monitor(tmp.path(), source, offline());

        monitor.tick().await;

        assert_eq!(monitor.state().last_text_value(), Some("prompt"));
        assert_eq!(monitor.poll(), None);
    }

    #[tokio::test]
    async fn run_stops_when_shutdown_resolves() {
        let tmp = tempfile::tempdir().unwrap();
        let monitor = monitor(tmp.path(), FakeClipboard::default(), offline());

        tokio::time::timeout(
            Duration::from_secs(5),
            monitor.run(tokio::time::sleep(Duration::from_millis(50))),
        )
        .await
        .expect("monitor did not stop");
    }
}
