//! The TypeScript compiler as a type checker.

mod converter;
mod executor;
mod parser;

pub use converter::TscConverter;
pub use executor::TscTool;

pub const NAME: &str = "tsc";
pub const CONFIG_FILE: &str = "tsconfig.json";

fn languages() -> Vec<String> {
    vec!["typescript".to_string(), "tsx".to_string()]
}
