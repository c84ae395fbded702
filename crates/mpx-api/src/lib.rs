pub mod assets;
pub mod client;
pub mod schemas;

pub use client::{GenerationApi, MpxClient};
