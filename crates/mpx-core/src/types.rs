use std::path::PathBuf;

use crate::error::{Error, Result};

/// One discrete stage of the generation pipeline.
///
/// Phases only move forward: `Idle → Image → ProcessImage → Model →
/// DownloadModel → Idle`. The image-entry workflow skips straight to
/// `Model` since the source image replaces the generated one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Image,
    ProcessImage,
    Model,
    DownloadModel,
}

impl Phase {
    /// Label used in log and timeout messages.
    pub fn label(&self) -> &str {
        match self {
            Self::Idle => "idle",
            Self::Image => "image generation",
            Self::ProcessImage => "image processing",
            Self::Model => "3D model generation",
            Self::DownloadModel => "model download",
        }
    }

    pub fn is_polled(&self) -> bool {
        matches!(self, Self::Image | Self::Model)
    }
}

/// What one cooperative tick left the run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Finished,
    Failed,
}

/// Where the generation starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationSource {
    Prompt(String),
    Image(PathBuf),
}

/// Caller-supplied parameters for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub source: GenerationSource,
    /// Diffusion step count for the text-to-image stage, 1..=4.
    pub num_steps: u32,
    /// Output texture resolution in pixels, 512..=2048.
    pub texture_size: u32,
    pub seed: u32,
}

impl GenerationRequest {
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            source: GenerationSource::Prompt(prompt.into()),
            num_steps: 4,
            texture_size: 1024,
            seed: 1,
        }
    }

    pub fn from_image(path: impl Into<PathBuf>) -> Self {
        Self {
            source: GenerationSource::Image(path.into()),
            num_steps: 4,
            texture_size: 1024,
            seed: 1,
        }
    }

    /// Reject bad input before any remote call is made.
    pub fn validate(&self) -> Result<()> {
        match &self.source {
            GenerationSource::Prompt(prompt) => {
                if prompt.trim().is_empty() {
                    return Err(Error::InvalidInput(
                        "enter a prompt to generate a model".into(),
                    ));
                }
            }
            GenerationSource::Image(path) => {
                if !path.is_file() {
                    return Err(Error::InvalidInput(format!(
                        "image file not found: {}",
                        path.display()
                    )));
                }
            }
        }
        if !(1..=4).contains(&self.num_steps) {
            return Err(Error::InvalidInput("num_steps must be 1..=4".into()));
        }
        if !(512..=2048).contains(&self.texture_size) {
            return Err(Error::InvalidInput(
                "texture_size must be 512..=2048".into(),
            ));
        }
        if self.seed == 0 {
            return Err(Error::InvalidInput("seed must be at least 1".into()));
        }
        Ok(())
    }
}
