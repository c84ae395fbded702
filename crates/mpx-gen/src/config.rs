use std::env;
use std::time::Duration;

use mpx_api::client::DEFAULT_BASE_URL;
use mpx_core::error::{Error, Result};

use crate::workflow::WorkflowOptions;

/// Environment variable the vendor SDK reads its API key from; the same
/// name is used here so one configuration serves both.
pub const BEARER_TOKEN_VAR: &str = "MPX_SDK_BEARER_TOKEN";

#[derive(Debug, Clone)]
pub struct GenConfig {
    pub bearer_token: String,
    pub base_url: String,
    pub poll_interval: Duration,
    /// Cap on how long a single phase may keep polling; `None` disables
    /// the bound.
    pub phase_timeout: Option<Duration>,
}

impl GenConfig {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let bearer_token = env::var(BEARER_TOKEN_VAR).map_err(|_| {
            Error::Config(format!(
                "{BEARER_TOKEN_VAR} is not set; add your Masterpiece X API key to the environment"
            ))
        })?;
        let base_url =
            env::var("MPX_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let poll_interval = Duration::from_secs(env_secs("MPX_POLL_INTERVAL_SECS", 3)?);
        let timeout_secs = env_secs("MPX_PHASE_TIMEOUT_SECS", 600)?;
        let phase_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

        Ok(Self {
            bearer_token,
            base_url,
            poll_interval,
            phase_timeout,
        })
    }

    pub fn workflow_options(&self) -> WorkflowOptions {
        WorkflowOptions {
            poll_interval: self.poll_interval,
            phase_timeout: self.phase_timeout,
            temp_dir: env::temp_dir(),
        }
    }
}

fn env_secs(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| Error::Config(format!("{name} must be a number of seconds"))),
        Err(_) => Ok(default),
    }
}
