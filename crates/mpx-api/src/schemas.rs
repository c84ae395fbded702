use serde::{Deserialize, Serialize};

/// Body for `POST components/text2image`.
#[derive(Debug, Clone, Serialize)]
pub struct TextToImageRequest {
    pub prompt: String,
    pub num_images: u32,
    pub num_steps: u32,
    /// Style the service applies to the generated image.
    pub lora_id: String,
}

/// Returned by every job-creating endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateResponse {
    pub request_id: String,
}

/// Body for `POST assets`.
#[derive(Debug, Clone, Serialize)]
pub struct AssetCreateRequest {
    pub description: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetCreateResponse {
    pub request_id: String,
    /// Pre-signed URL the raw file bytes are PUT to.
    pub asset_url: String,
}

/// Body for `POST functions/imageto3d`.
#[derive(Debug, Clone, Serialize)]
pub struct ImageTo3dRequest {
    /// Request id of the uploaded image asset.
    pub image_request_id: String,
    pub seed: u32,
    pub texture_size: u32,
}

/// Remote job state. Anything the service reports besides `complete`
/// and `failed` means the job is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Complete,
    Failed,
    #[serde(other)]
    Processing,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobOutputs {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub glb: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusResponse {
    pub status: JobState,
    /// Fractional progress in [0, 1] when the service supplies one.
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub outputs: Option<JobOutputs>,
}

impl JobStatusResponse {
    pub fn first_image(&self) -> Option<&str> {
        self.outputs
            .as_ref()
            .and_then(|outputs| outputs.images.first())
            .map(String::as_str)
    }

    pub fn glb_url(&self) -> Option<&str> {
        self.outputs
            .as_ref()
            .and_then(|outputs| outputs.glb.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_complete_status_with_glb() {
        let response: JobStatusResponse = serde_json::from_str(
            r#"{"status":"complete","outputs":{"glb":"https://cdn/model.glb"}}"#,
        )
        .unwrap();
        assert_eq!(response.status, JobState::Complete);
        assert_eq!(response.glb_url(), Some("https://cdn/model.glb"));
        assert_eq!(response.first_image(), None);
    }

    #[test]
    fn test_parse_in_progress_status() {
        let response: JobStatusResponse =
            serde_json::from_str(r#"{"status":"in_progress","progress":0.25}"#).unwrap();
        assert_eq!(response.status, JobState::Processing);
        assert_eq!(response.progress, Some(0.25));
    }

    #[test]
    fn test_parse_image_outputs() {
        let response: JobStatusResponse = serde_json::from_str(
            r#"{"status":"complete","outputs":{"images":["https://cdn/a.png","https://cdn/b.png"]}}"#,
        )
        .unwrap();
        assert_eq!(response.first_image(), Some("https://cdn/a.png"));
    }

    #[test]
    fn test_asset_request_serializes_type_field() {
        let body = serde_json::to_value(AssetCreateRequest {
            description: "d".into(),
            name: "n.png".into(),
            mime_type: "image/png".into(),
        })
        .unwrap();
        assert_eq!(body["type"], "image/png");
    }
}
