//! Tick-driven status polling and phase transitions.
//!
//! Nothing here blocks: each tick either returns immediately (inactive,
//! throttled, or waiting on the download worker) or issues one short
//! remote call and applies the resulting transition.

use std::fs;

use log::debug;

use mpx_api::GenerationApi;
use mpx_api::schemas::{JobState, JobStatusResponse};
use mpx_core::error::{Error, Result};
use mpx_core::{Phase, RunState};

use crate::download::{DownloadHandle, DownloadOutcome};
use crate::host::SceneImporter;
use crate::progress;
use crate::workflow::{MODEL_FILE, PREVIEW_FILE, Workflow};

impl<C: GenerationApi> Workflow<C> {
    /// Advance the run by one cooperative step.
    ///
    /// Remote status checks are spaced at least the configured poll
    /// interval apart; the download phase only inspects the worker
    /// channel, which is cheap enough to do every tick.
    pub fn tick(&mut self, importer: &mut dyn SceneImporter) -> RunState {
        if !self.status.active {
            return RunState::Idle;
        }
        match self.status.phase {
            Phase::DownloadModel => self.check_download(importer),
            Phase::Image | Phase::Model => self.poll_remote(),
            Phase::Idle | Phase::ProcessImage => RunState::Running,
        }
    }

    fn poll_remote(&mut self) -> RunState {
        if !self.poll_due() {
            return RunState::Running;
        }
        self.status.mark_polled();
        self.status.refresh_elapsed_suffix();

        if self.phase_timed_out() {
            let message = format!("Timed out waiting for {}", self.status.phase.label());
            self.fail_run(&message);
            return RunState::Failed;
        }

        let phase = self.status.phase;
        let result = match phase {
            Phase::Image => self.check_image_status(),
            Phase::Model => self.check_model_status(),
            _ => Ok(RunState::Running),
        };
        match result {
            Ok(state) => state,
            Err(err) => {
                let message = match phase {
                    Phase::Image => format!("Error checking image status: {err}"),
                    Phase::Model => format!("Error checking model status: {err}"),
                    _ => format!("Error in polling: {err}"),
                };
                self.fail_run(&message);
                RunState::Failed
            }
        }
    }

    fn poll_due(&self) -> bool {
        match self.status.last_poll {
            Some(at) => at.elapsed() >= self.options.poll_interval,
            None => true,
        }
    }

    fn phase_timed_out(&self) -> bool {
        self.options
            .phase_timeout
            .is_some_and(|cap| self.status.phase_entered.elapsed() >= cap)
    }

    fn check_image_status(&mut self) -> Result<RunState> {
        let request_id = self
            .status
            .image_request_id
            .clone()
            .ok_or_else(|| Error::Remote("no image request id recorded".into()))?;
        let response = self.client()?.job_status(&request_id)?;

        match response.status {
            JobState::Complete => {
                self.status
                    .set_progress(progress::IMAGE_DONE, "Image generated successfully!");
                self.status.enter_phase(Phase::ProcessImage);
                if let Err(err) = self.process_image(&response) {
                    self.fail_run(&format!("Error in processing image: {err}"));
                    return Ok(RunState::Failed);
                }
                Ok(RunState::Running)
            }
            JobState::Failed => {
                self.fail_run("Image generation failed");
                Ok(RunState::Failed)
            }
            JobState::Processing => Ok(RunState::Running),
        }
    }

    /// The one-shot stage between image and model generation: fetch the
    /// preview, re-register it as an upload asset and kick off the
    /// image-to-3D job. Short transfers, so issued inline from the tick.
    fn process_image(&mut self, response: &JobStatusResponse) -> Result<()> {
        let url = response
            .first_image()
            .ok_or_else(|| Error::MissingOutput("No images were generated".into()))?
            .to_string();
        self.status.image_url = Some(url.clone());

        self.status
            .set_progress(progress::IMAGE_FETCH, "Downloading generated image...");
        let bytes = self.client()?.fetch_bytes(&url)?;
        image::load_from_memory(&bytes)
            .map_err(|err| Error::Remote(format!("generated image did not decode: {err}")))?;
        debug!("preview image decoded ({} bytes)", bytes.len());

        let path = self.options.temp_dir.join(PREVIEW_FILE);
        fs::write(&path, &bytes)?;
        self.status.image_path = Some(path);

        let asset_id = self.create_and_upload_asset(
            "Generated preview image".to_string(),
            PREVIEW_FILE.to_string(),
            "image/png",
            &bytes,
            progress::IMAGE_UPLOAD,
        )?;

        self.status
            .set_progress(progress::MODEL_START, "Starting 3D model generation...");
        let request = self
            .request
            .clone()
            .ok_or_else(|| Error::Remote("no request recorded for the run".into()))?;
        let model = self
            .client()?
            .create_image_to_3d(&mpx_api::schemas::ImageTo3dRequest {
                image_request_id: asset_id,
                seed: request.seed,
                texture_size: request.texture_size,
            })?;
        self.status.model_request_id = Some(model.request_id);
        self.status.enter_phase(Phase::Model);
        self.status.status_text = "Generating 3D model...".into();
        Ok(())
    }

    fn check_model_status(&mut self) -> Result<RunState> {
        let request_id = self
            .status
            .model_request_id
            .clone()
            .ok_or_else(|| Error::Remote("no model request id recorded".into()))?;
        let response = self.client()?.job_status(&request_id)?;

        if let Some(raw) = response.progress {
            let mapped = progress::map_model_progress(raw, self.status.is_direct_image_run());
            debug!("model progress {raw:.3} -> {mapped}%");
            self.status.progress = mapped;
        }

        match response.status {
            JobState::Complete => {
                self.status
                    .set_progress(progress::MODEL_DONE, "3D model generated successfully!");
                let Some(url) = response.glb_url() else {
                    self.fail_run("No GLB model was generated");
                    return Ok(RunState::Failed);
                };
                self.begin_model_download(url.to_string())?;
                Ok(RunState::Running)
            }
            JobState::Failed => {
                self.fail_run("3D model generation failed");
                Ok(RunState::Failed)
            }
            JobState::Processing => Ok(RunState::Running),
        }
    }

    fn begin_model_download(&mut self, url: String) -> Result<()> {
        self.status.model_url = Some(url.clone());
        self.status
            .set_progress(progress::MODEL_FETCH, "Downloading 3D model...");
        self.status.enter_phase(Phase::DownloadModel);

        let dest = self.options.temp_dir.join(MODEL_FILE);
        let client = self.client()?.clone();
        self.download = Some(DownloadHandle::spawn(client, url, dest));
        Ok(())
    }

    fn check_download(&mut self, importer: &mut dyn SceneImporter) -> RunState {
        let outcome = match self.download.as_ref() {
            Some(handle) => handle.try_outcome(),
            None => {
                self.fail_run("No model download in flight");
                return RunState::Failed;
            }
        };
        match outcome {
            None => RunState::Running,
            Some(DownloadOutcome::Failed(message)) => {
                self.fail_run(&format!("Error downloading model: {message}"));
                RunState::Failed
            }
            Some(DownloadOutcome::Complete(path)) => {
                self.download = None;
                self.status.model_path = Some(path.clone());
                self.status
                    .set_progress(progress::IMPORT, "Importing 3D model...");

                if !importer.is_available() {
                    self.fail_run(
                        "GLTF importer is not available in the host application. \
                         Enable its glTF 2.0 import feature.",
                    );
                    return RunState::Failed;
                }
                if let Err(err) = importer.import(&path) {
                    self.fail_run(&format!("Error importing model: {err}"));
                    return RunState::Failed;
                }
                self.finish_run();
                RunState::Finished
            }
        }
    }
}
