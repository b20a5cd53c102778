//! Runtime around the adjudication engine: configuration, an HTTP
//! reasoning oracle with retry, and transcript loading for the CLI.

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod http_oracle;
pub mod input;
pub mod retry;

pub use config::{ConfigError, EndpointConfig, RunnerConfig};
pub use http_oracle::HttpOracle;
pub use input::{load_transcript, InputError, TranscriptDocument};
pub use retry::RetryPolicy;
