use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("a generation is already in progress")]
    AlreadyRunning,

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("upload rejected (HTTP {status}): {body}")]
    Upload { status: u16, body: String },

    /// The remote service reported a failure or returned an unusable
    /// response.
    #[error("{0}")]
    Remote(String),

    /// A completed job carried no usable output.
    #[error("{0}")]
    MissingOutput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
