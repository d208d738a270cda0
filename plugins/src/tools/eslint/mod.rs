//! ESLint for JavaScript and TypeScript.

mod converter;
mod executor;
mod parser;

pub use converter::EslintConverter;
pub use executor::EslintTool;

pub const NAME: &str = "eslint";
pub const CONFIG_FILE: &str = ".eslintrc.json";

fn languages() -> Vec<String> {
    ["javascript", "typescript", "jsx", "tsx"]
        .into_iter()
        .map(String::from)
        .collect()
}
