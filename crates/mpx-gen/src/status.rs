use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use mpx_core::Phase;
use uuid::Uuid;

/// Shared record for one generation run.
///
/// Written only by the workflow controller and its poller/downloader
/// callbacks on the cooperative context; the host UI reads it through
/// [`Workflow::status`](crate::workflow::Workflow::status) or a
/// [`StatusSnapshot`]. Re-initialized at the start of every run, never
/// persisted.
#[derive(Debug, Clone)]
pub struct GenerationStatus {
    /// Correlation id for this run, used in log lines.
    pub run_id: Uuid,
    /// True iff a run is in progress; the only state a new run may start
    /// from is `false`.
    pub active: bool,
    pub phase: Phase,
    /// Display progress, 0-100.
    pub progress: u8,
    pub status_text: String,
    /// Non-empty means the run failed; `active` is false by then.
    pub error: String,
    /// Id of the text-to-image job.
    pub image_request_id: Option<String>,
    /// Id of the image-to-3D job.
    pub model_request_id: Option<String>,
    /// Id of the uploaded image asset.
    pub asset_request_id: Option<String>,
    pub image_url: Option<String>,
    pub model_url: Option<String>,
    /// Local temp path of the downloaded preview image.
    pub image_path: Option<PathBuf>,
    /// Local temp path of the downloaded model.
    pub model_path: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub(crate) last_poll: Option<Instant>,
    pub(crate) phase_entered: Instant,
}

/// Cloneable read-only view for the host UI.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub run_id: Uuid,
    pub active: bool,
    pub phase: Phase,
    pub progress: u8,
    pub status_text: String,
    pub error: String,
    pub started_at: DateTime<Utc>,
}

impl GenerationStatus {
    pub(crate) fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            active: false,
            phase: Phase::Idle,
            progress: 0,
            status_text: String::new(),
            error: String::new(),
            image_request_id: None,
            model_request_id: None,
            asset_request_id: None,
            image_url: None,
            model_url: None,
            image_path: None,
            model_path: None,
            started_at: Utc::now(),
            last_poll: Some(Instant::now()),
            phase_entered: Instant::now(),
        }
    }

    /// Blank everything from the previous run and stamp fresh
    /// timestamps and a fresh run id.
    pub(crate) fn reset_for_run(&mut self) {
        *self = Self::new();
    }

    pub(crate) fn set_progress(&mut self, progress: u8, text: impl Into<String>) {
        self.progress = progress;
        self.status_text = text.into();
    }

    pub(crate) fn enter_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.phase_entered = Instant::now();
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.error = message.into();
        self.active = false;
    }

    /// Neutral cancellation, distinguishable from failure by the empty
    /// error field.
    pub(crate) fn cancel(&mut self) {
        self.active = false;
        self.status_text = "Generation cancelled".into();
        self.progress = 0;
        self.phase = Phase::Idle;
    }

    pub(crate) fn mark_polled(&mut self) {
        self.last_poll = Some(Instant::now());
    }

    /// True when the run went straight from an uploaded source image to
    /// 3D generation, with no text-to-image stage.
    pub(crate) fn is_direct_image_run(&self) -> bool {
        self.asset_request_id.is_some() && self.image_request_id.is_none()
    }

    pub fn elapsed_label(&self) -> String {
        let elapsed = (Utc::now() - self.started_at).num_seconds().max(0);
        format!("{}m {}s", elapsed / 60, elapsed % 60)
    }

    /// While a "Generating ..." message is showing, keep an elapsed-time
    /// suffix on it so the user can see the run is alive.
    pub(crate) fn refresh_elapsed_suffix(&mut self) {
        if !self.status_text.starts_with("Generating") {
            return;
        }
        let base = match self.status_text.split_once(" (") {
            Some((base, _)) => base.to_string(),
            None => self.status_text.clone(),
        };
        self.status_text = format!("{base} ({})", self.elapsed_label());
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            run_id: self.run_id,
            active: self.active,
            phase: self.phase,
            progress: self.progress,
            status_text: self.status_text.clone(),
            error: self.error.clone(),
            started_at: self.started_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_clears_previous_run() {
        let mut status = GenerationStatus::new();
        status.active = true;
        status.enter_phase(Phase::Model);
        status.set_progress(62, "Generating 3D model...");
        status.image_request_id = Some("img".into());
        status.model_request_id = Some("mdl".into());
        status.asset_request_id = Some("ast".into());
        status.image_url = Some("https://cdn/a.png".into());
        status.model_url = Some("https://cdn/a.glb".into());
        status.image_path = Some("/tmp/a.png".into());
        status.model_path = Some("/tmp/a.glb".into());
        let old_run = status.run_id;

        status.reset_for_run();

        assert!(!status.active);
        assert_eq!(status.phase, Phase::Idle);
        assert_eq!(status.progress, 0);
        assert!(status.status_text.is_empty());
        assert!(status.error.is_empty());
        assert!(status.image_request_id.is_none());
        assert!(status.model_request_id.is_none());
        assert!(status.asset_request_id.is_none());
        assert!(status.image_url.is_none());
        assert!(status.model_url.is_none());
        assert!(status.image_path.is_none());
        assert!(status.model_path.is_none());
        assert_ne!(status.run_id, old_run);
    }

    #[test]
    fn test_cancel_is_distinguishable_from_failure() {
        let mut status = GenerationStatus::new();
        status.active = true;
        status.set_progress(45, "Generating 3D model from image...");

        status.cancel();
        assert!(!status.active);
        assert!(status.error.is_empty());
        assert_eq!(status.status_text, "Generation cancelled");
        assert_eq!(status.progress, 0);
        assert_eq!(status.phase, Phase::Idle);

        let mut status = GenerationStatus::new();
        status.active = true;
        status.fail("3D model generation failed");
        assert!(!status.active);
        assert_eq!(status.error, "3D model generation failed");
    }

    #[test]
    fn test_elapsed_suffix_only_touches_generating_text() {
        let mut status = GenerationStatus::new();
        status.status_text = "Generating image from text...".into();
        status.refresh_elapsed_suffix();
        assert!(status.status_text.starts_with("Generating image from text..."));
        assert!(status.status_text.ends_with("s)"));

        // Refreshing again replaces the suffix instead of stacking.
        status.refresh_elapsed_suffix();
        assert_eq!(status.status_text.matches('(').count(), 1);

        let mut status = GenerationStatus::new();
        status.status_text = "Uploading image...".into();
        status.refresh_elapsed_suffix();
        assert_eq!(status.status_text, "Uploading image...");
    }
}
