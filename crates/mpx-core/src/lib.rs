pub mod error;
mod types;

pub use types::{GenerationRequest, GenerationSource, Phase, RunState};
