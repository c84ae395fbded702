use std::time::Duration;

use log::debug;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;

use mpx_core::error::{Error, Result};

use crate::schemas::{
    AssetCreateRequest, AssetCreateResponse, CreateResponse, ImageTo3dRequest, JobStatusResponse,
    TextToImageRequest,
};

pub const DEFAULT_BASE_URL: &str = "https://api.masterpiecex.com/v1";

/// Timeout for the short job-control calls issued from the cooperative
/// tick.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for binary transfers (asset upload, artifact download).
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(60);

/// Operations the workflow needs from the remote generation service.
///
/// `Clone + Send` so the background downloader can carry its own handle
/// into a worker thread while the cooperative context keeps ticking.
pub trait GenerationApi: Clone + Send + 'static {
    fn create_text_to_image(&self, request: &TextToImageRequest) -> Result<CreateResponse>;

    fn create_asset(&self, request: &AssetCreateRequest) -> Result<AssetCreateResponse>;

    /// PUT raw file bytes to a pre-signed upload URL. The service
    /// requires bearer auth and the asset's MIME type on this request.
    fn upload_asset(&self, upload_url: &str, mime_type: &str, bytes: &[u8]) -> Result<()>;

    fn create_image_to_3d(&self, request: &ImageTo3dRequest) -> Result<CreateResponse>;

    fn job_status(&self, request_id: &str) -> Result<JobStatusResponse>;

    /// Plain GET for a binary artifact (generated image or model).
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking REST client bound to one bearer credential for the duration
/// of a run.
#[derive(Debug, Clone)]
pub struct MpxClient {
    http: reqwest::blocking::Client,
    base_url: String,
    bearer_token: String,
}

impl MpxClient {
    pub fn new(bearer_token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: bearer_token.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        debug!("POST {path}");
        let response = self
            .http
            .post(self.endpoint(path))
            .bearer_auth(&self.bearer_token)
            .json(body)
            .send()?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(Error::Remote(format!("{path}: HTTP {status}: {body}")));
        }
        Ok(response.json()?)
    }
}

impl GenerationApi for MpxClient {
    fn create_text_to_image(&self, request: &TextToImageRequest) -> Result<CreateResponse> {
        self.post_json("components/text2image", request)
    }

    fn create_asset(&self, request: &AssetCreateRequest) -> Result<AssetCreateResponse> {
        self.post_json("assets", request)
    }

    fn upload_asset(&self, upload_url: &str, mime_type: &str, bytes: &[u8]) -> Result<()> {
        debug!("PUT {upload_url} ({} bytes)", bytes.len());
        let response = self
            .http
            .put(upload_url)
            .timeout(TRANSFER_TIMEOUT)
            .bearer_auth(&self.bearer_token)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes.to_vec())
            .send()?;
        if response.status() != StatusCode::OK {
            let status = response.status().as_u16();
            let mut body = response.text().unwrap_or_default();
            if body.contains("Invalid asset name") {
                body.push_str(" Use a simpler file name (letters, numbers, underscores only).");
            }
            return Err(Error::Upload { status, body });
        }
        Ok(())
    }

    fn create_image_to_3d(&self, request: &ImageTo3dRequest) -> Result<CreateResponse> {
        self.post_json("functions/imageto3d", request)
    }

    fn job_status(&self, request_id: &str) -> Result<JobStatusResponse> {
        debug!("GET status/{request_id}");
        let response = self
            .http
            .get(self.endpoint(&format!("status/{request_id}")))
            .bearer_auth(&self.bearer_token)
            .send()?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(Error::Remote(format!(
                "status/{request_id}: HTTP {status}: {body}"
            )));
        }
        Ok(response.json()?)
    }

    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!("GET {url}");
        let response = self
            .http
            .get(url)
            .timeout(TRANSFER_TIMEOUT)
            .send()?
            .error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}
