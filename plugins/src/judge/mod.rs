//! Judge providers: a local agent CLI or an OpenAI-compatible HTTP API.

pub mod api;
pub mod cli;

pub use api::ApiJudge;
pub use cli::CliJudge;
