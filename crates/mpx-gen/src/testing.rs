//! Scripted test doubles shared by the workflow and download tests.

use std::collections::VecDeque;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use mpx_api::GenerationApi;
use mpx_api::schemas::{
    AssetCreateRequest, AssetCreateResponse, CreateResponse, ImageTo3dRequest, JobOutputs,
    JobState, JobStatusResponse, TextToImageRequest,
};
use mpx_core::error::{Error, Result};

use crate::host::SceneImporter;

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Remote client whose responses are queued up front. Each call pops the
/// next scripted response for its endpoint; an empty queue means the
/// call was not expected and fails the run loudly. Every call is also
/// recorded so tests can assert on exactly what went over the wire.
#[derive(Clone, Default)]
pub(crate) struct MockApi {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    text_to_image: VecDeque<Result<CreateResponse>>,
    assets: VecDeque<Result<AssetCreateResponse>>,
    uploads: VecDeque<Result<()>>,
    image_to_3d: VecDeque<Result<CreateResponse>>,
    statuses: VecDeque<Result<JobStatusResponse>>,
    fetches: VecDeque<Result<Vec<u8>>>,
    calls: Vec<String>,
}

fn take<T>(queue: &mut VecDeque<Result<T>>, call: &str) -> Result<T> {
    queue
        .pop_front()
        .unwrap_or_else(|| Err(Error::Remote(format!("unexpected {call} call"))))
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_text_to_image(&self, request_id: &str) {
        self.state.lock().unwrap().text_to_image.push_back(Ok(CreateResponse {
            request_id: request_id.into(),
        }));
    }

    pub fn expect_text_to_image_err(&self, message: &str) {
        self.state
            .lock()
            .unwrap()
            .text_to_image
            .push_back(Err(Error::Remote(message.into())));
    }

    pub fn expect_asset(&self, request_id: &str, upload_url: &str) {
        self.state.lock().unwrap().assets.push_back(Ok(AssetCreateResponse {
            request_id: request_id.into(),
            asset_url: upload_url.into(),
        }));
    }

    pub fn expect_upload_ok(&self) {
        self.state.lock().unwrap().uploads.push_back(Ok(()));
    }

    pub fn expect_image_to_3d(&self, request_id: &str) {
        self.state.lock().unwrap().image_to_3d.push_back(Ok(CreateResponse {
            request_id: request_id.into(),
        }));
    }

    pub fn expect_status(&self, response: JobStatusResponse) {
        self.state.lock().unwrap().statuses.push_back(Ok(response));
    }

    pub fn expect_fetch(&self, bytes: Vec<u8>) {
        self.state.lock().unwrap().fetches.push_back(Ok(bytes));
    }

    pub fn expect_fetch_err(&self, message: &str) {
        self.state
            .lock()
            .unwrap()
            .fetches
            .push_back(Err(Error::Remote(message.into())));
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }
}

impl GenerationApi for MockApi {
    fn create_text_to_image(&self, request: &TextToImageRequest) -> Result<CreateResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("text2image:{}", request.prompt));
        take(&mut state.text_to_image, "text2image")
    }

    fn create_asset(&self, request: &AssetCreateRequest) -> Result<AssetCreateResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("asset:{}", request.name));
        take(&mut state.assets, "asset")
    }

    fn upload_asset(&self, _upload_url: &str, mime_type: &str, _bytes: &[u8]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("upload:{mime_type}"));
        take(&mut state.uploads, "upload")
    }

    fn create_image_to_3d(&self, request: &ImageTo3dRequest) -> Result<CreateResponse> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("imageto3d:{}", request.image_request_id));
        take(&mut state.image_to_3d, "imageto3d")
    }

    fn job_status(&self, request_id: &str) -> Result<JobStatusResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("status:{request_id}"));
        take(&mut state.statuses, "status")
    }

    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("fetch:{url}"));
        take(&mut state.fetches, "fetch")
    }
}

pub(crate) fn processing_status(progress: Option<f64>) -> JobStatusResponse {
    JobStatusResponse {
        status: JobState::Processing,
        progress,
        outputs: None,
    }
}

pub(crate) fn image_complete(url: &str) -> JobStatusResponse {
    JobStatusResponse {
        status: JobState::Complete,
        progress: Some(1.0),
        outputs: Some(JobOutputs {
            images: vec![url.into()],
            glb: None,
        }),
    }
}

pub(crate) fn model_complete(glb_url: Option<&str>) -> JobStatusResponse {
    JobStatusResponse {
        status: JobState::Complete,
        progress: Some(1.0),
        outputs: Some(JobOutputs {
            images: Vec::new(),
            glb: glb_url.map(Into::into),
        }),
    }
}

pub(crate) fn failed_status() -> JobStatusResponse {
    JobStatusResponse {
        status: JobState::Failed,
        progress: None,
        outputs: None,
    }
}

/// A small but real PNG, so the preview-decode check passes.
pub(crate) fn png_bytes() -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(image::RgbaImage::new(4, 4))
        .write_to(&mut buffer, image::ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

#[derive(Default)]
pub(crate) struct RecordingImporter {
    pub imported: Vec<PathBuf>,
    pub unavailable: bool,
    pub fail_with: Option<String>,
}

impl SceneImporter for RecordingImporter {
    fn is_available(&self) -> bool {
        !self.unavailable
    }

    fn import(&mut self, path: &Path) -> anyhow::Result<()> {
        if let Some(message) = &self.fail_with {
            anyhow::bail!("{message}");
        }
        self.imported.push(path.to_path_buf());
        Ok(())
    }
}
