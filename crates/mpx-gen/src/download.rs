use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, channel};
use std::thread::{self, JoinHandle};

use log::debug;
use mpx_api::GenerationApi;
use mpx_core::error::Result;

/// Result of a background artifact download.
#[derive(Debug)]
pub enum DownloadOutcome {
    Complete(PathBuf),
    Failed(String),
}

/// Handle to the worker thread fetching a large binary off the
/// cooperative context.
///
/// Dropping the handle detaches the worker: it runs to completion on its
/// own and its outcome is discarded with the closed channel. There is no
/// forced termination.
pub struct DownloadHandle {
    rx: Receiver<DownloadOutcome>,
    thread: JoinHandle<()>,
}

impl DownloadHandle {
    pub fn spawn<C: GenerationApi>(client: C, url: String, dest: PathBuf) -> Self {
        let (tx, rx) = channel();
        let thread = thread::spawn(move || {
            let outcome = match fetch_to_file(&client, &url, &dest) {
                Ok(()) => DownloadOutcome::Complete(dest),
                Err(err) => DownloadOutcome::Failed(err.to_string()),
            };
            if tx.send(outcome).is_err() {
                debug!("download finished after cancellation, result discarded");
            }
        });
        Self { rx, thread }
    }

    /// Non-blocking completion check, called from the cooperative tick.
    pub fn try_outcome(&self) -> Option<DownloadOutcome> {
        self.rx.try_recv().ok()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

fn fetch_to_file<C: GenerationApi>(client: &C, url: &str, dest: &Path) -> Result<()> {
    let bytes = client.fetch_bytes(url)?;
    fs::write(dest, &bytes)?;
    debug!("wrote {} bytes to {}", bytes.len(), dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::MockApi;

    fn wait_for_outcome(handle: &DownloadHandle) -> DownloadOutcome {
        for _ in 0..500 {
            if let Some(outcome) = handle.try_outcome() {
                return outcome;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("download worker never reported an outcome");
    }

    #[test]
    fn test_download_writes_file_and_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("model.glb");
        let api = MockApi::new();
        api.expect_fetch(b"glb-bytes".to_vec());

        let handle = DownloadHandle::spawn(api, "https://cdn/model.glb".into(), dest.clone());
        match wait_for_outcome(&handle) {
            DownloadOutcome::Complete(path) => {
                assert_eq!(path, dest);
                assert_eq!(fs::read(&dest).unwrap(), b"glb-bytes");
            }
            DownloadOutcome::Failed(message) => panic!("unexpected failure: {message}"),
        }
        for _ in 0..500 {
            if handle.is_finished() {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }
        assert!(handle.is_finished());
    }

    #[test]
    fn test_failed_fetch_reports_message() {
        let dir = tempfile::tempdir().unwrap();
        let api = MockApi::new();
        api.expect_fetch_err("connection reset");

        let handle =
            DownloadHandle::spawn(api, "https://cdn/model.glb".into(), dir.path().join("m.glb"));
        match wait_for_outcome(&handle) {
            DownloadOutcome::Failed(message) => assert!(message.contains("connection reset")),
            DownloadOutcome::Complete(_) => panic!("expected a failure"),
        }
    }

    #[test]
    fn test_dropped_handle_detaches_worker() {
        let api = MockApi::new();
        api.expect_fetch(b"late".to_vec());
        let dir = tempfile::tempdir().unwrap();

        let handle =
            DownloadHandle::spawn(api, "https://cdn/model.glb".into(), dir.path().join("m.glb"));
        drop(handle);
        // Nothing to assert beyond "no panic/hang": the worker finishes
        // on its own and its send lands in a closed channel.
        thread::sleep(Duration::from_millis(10));
    }
}
