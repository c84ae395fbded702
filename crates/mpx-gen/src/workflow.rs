use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{error, info, warn};

use mpx_api::GenerationApi;
use mpx_api::assets::{mime_for_path, sanitize_asset_name};
use mpx_api::schemas::{AssetCreateRequest, ImageTo3dRequest, TextToImageRequest};
use mpx_core::error::{Error, Result};
use mpx_core::{GenerationRequest, GenerationSource, Phase};

use crate::download::DownloadHandle;
use crate::progress;
use crate::status::{GenerationStatus, StatusSnapshot};

/// Style applied to generated images; the service tunes this one for
/// game-ready geometry.
const TEXT_TO_IMAGE_STYLE: &str = "mpx_game";

pub(crate) const PREVIEW_FILE: &str = "mpx_generated_image.png";
pub(crate) const MODEL_FILE: &str = "mpx_generated_model.glb";

#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    /// Minimum spacing between remote status checks.
    pub poll_interval: Duration,
    /// Cap on how long one phase may keep polling; `None` disables it.
    pub phase_timeout: Option<Duration>,
    /// Where the run's two temporary artifacts are written.
    pub temp_dir: PathBuf,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            phase_timeout: Some(Duration::from_secs(600)),
            temp_dir: std::env::temp_dir(),
        }
    }
}

/// The workflow controller: owns the status record for the current run,
/// the credential-bound API client, and the background download handle.
///
/// All control flow runs on the host's cooperative context, advanced by
/// [`tick`](Self::tick); only the final model download happens on a
/// worker thread.
pub struct Workflow<C: GenerationApi> {
    pub(crate) options: WorkflowOptions,
    pub(crate) status: GenerationStatus,
    pub(crate) client: Option<C>,
    pub(crate) request: Option<GenerationRequest>,
    pub(crate) download: Option<DownloadHandle>,
}

impl<C: GenerationApi> Workflow<C> {
    pub fn new(options: WorkflowOptions) -> Self {
        Self {
            options,
            status: GenerationStatus::new(),
            client: None,
            request: None,
            download: None,
        }
    }

    pub fn status(&self) -> &GenerationStatus {
        &self.status
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    pub fn is_active(&self) -> bool {
        self.status.active
    }

    /// Start a run. Validates input, binds the client to the run, issues
    /// the first remote call for the chosen entry path and returns
    /// immediately; the poller carries the run from there.
    ///
    /// Fails without touching the current run while one is active.
    pub fn start(&mut self, client: C, request: GenerationRequest) -> Result<()> {
        if self.status.active {
            return Err(Error::AlreadyRunning);
        }
        request.validate()?;

        self.status.reset_for_run();
        self.client = Some(client);
        self.download = None;
        self.status.active = true;
        self.status.set_progress(progress::INIT, "Initializing...");
        info!("generation run {} starting", self.status.run_id);

        let result = match &request.source {
            GenerationSource::Prompt(prompt) => self.start_text_run(prompt, request.num_steps),
            GenerationSource::Image(path) => self.start_image_run(path, &request),
        };
        self.request = Some(request);

        if let Err(err) = result {
            self.fail_run(&format!("Error initiating generation: {err}"));
            return Err(err);
        }
        Ok(())
    }

    fn start_text_run(&mut self, prompt: &str, num_steps: u32) -> Result<()> {
        self.status
            .set_progress(progress::PATH_START, "Starting image generation...");
        self.status.enter_phase(Phase::Image);

        let response = self.client()?.create_text_to_image(&TextToImageRequest {
            prompt: prompt.to_string(),
            num_images: 1,
            num_steps,
            lora_id: TEXT_TO_IMAGE_STYLE.to_string(),
        })?;
        self.status.image_request_id = Some(response.request_id);
        self.status
            .set_progress(progress::JOB_CREATED, "Generating image from text...");
        Ok(())
    }

    fn start_image_run(&mut self, path: &Path, request: &GenerationRequest) -> Result<()> {
        self.status
            .set_progress(progress::PATH_START, "Preparing to upload image...");

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("image.png");
        let asset_name = sanitize_asset_name(file_name);
        let mime_type = mime_for_path(path);
        let bytes = fs::read(path)?;

        self.status
            .set_progress(progress::JOB_CREATED, "Creating asset for image upload...");
        let asset_id = self.create_and_upload_asset(
            format!("Source image upload: {file_name}"),
            asset_name,
            mime_type,
            &bytes,
            progress::SOURCE_UPLOAD,
        )?;

        self.status.set_progress(
            progress::DIRECT_MODEL_START,
            "Starting 3D model generation...",
        );
        let model = self.client()?.create_image_to_3d(&ImageTo3dRequest {
            image_request_id: asset_id,
            seed: request.seed,
            texture_size: request.texture_size,
        })?;
        self.status.model_request_id = Some(model.request_id);
        self.status.enter_phase(Phase::Model);
        self.status.set_progress(
            progress::DIRECT_MODEL_REQUESTED,
            "Generating 3D model from image...",
        );
        Ok(())
    }

    /// Register an upload asset, PUT the bytes to its pre-signed URL and
    /// return the asset's request id. Used for both the caller's source
    /// image and the generated preview.
    pub(crate) fn create_and_upload_asset(
        &mut self,
        description: String,
        name: String,
        mime_type: &str,
        bytes: &[u8],
        upload_progress: u8,
    ) -> Result<String> {
        let asset = self.client()?.create_asset(&AssetCreateRequest {
            description,
            name,
            mime_type: mime_type.to_string(),
        })?;
        self.status.asset_request_id = Some(asset.request_id.clone());

        self.status
            .set_progress(upload_progress, "Uploading image...");
        self.client()?
            .upload_asset(&asset.asset_url, mime_type, bytes)?;
        Ok(asset.request_id)
    }

    /// Cancel the active run. The poller observes the flag on its next
    /// tick; an in-flight download worker is detached, never killed, and
    /// its result is discarded. Returns false when nothing was active.
    pub fn cancel(&mut self) -> bool {
        if !self.status.active {
            return false;
        }
        info!("generation run {} cancelled", self.status.run_id);
        self.status.cancel();
        self.download = None;
        self.client = None;
        true
    }

    /// Explicit teardown for host shutdown: deactivate, detach workers,
    /// delete temp artifacts, release the credential-bound client.
    /// Idempotent; also invoked from `Drop`.
    pub fn shutdown(&mut self) {
        self.status.active = false;
        if let Some(download) = self.download.take() {
            if !download.is_finished() {
                warn!("detaching in-flight download worker on shutdown");
            }
        }
        self.client = None;
        self.remove_temp_artifacts();
    }

    pub(crate) fn fail_run(&mut self, message: &str) {
        error!("generation run {} failed: {message}", self.status.run_id);
        self.status.fail(message);
        self.download = None;
        self.client = None;
        self.remove_temp_artifacts();
    }

    pub(crate) fn finish_run(&mut self) {
        info!(
            "generation run {} finished in {}",
            self.status.run_id,
            self.status.elapsed_label()
        );
        self.status
            .set_progress(progress::DONE, "Model imported successfully!");
        self.status.active = false;
        self.status.phase = Phase::Idle;
        self.client = None;
    }

    pub(crate) fn client(&self) -> Result<&C> {
        self.client
            .as_ref()
            .ok_or_else(|| Error::Remote("no API client bound to the run".into()))
    }

    /// Partial artifacts are not useful across runs; drop them eagerly.
    fn remove_temp_artifacts(&mut self) {
        let paths = [self.status.image_path.take(), self.status.model_path.take()];
        for path in paths.into_iter().flatten() {
            if let Err(err) = fs::remove_file(&path) {
                if err.kind() != ErrorKind::NotFound {
                    warn!("could not remove {}: {err}", path.display());
                }
            }
        }
    }
}

impl<C: GenerationApi> Drop for Workflow<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
