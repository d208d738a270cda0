//! Pylint for Python.

mod converter;
mod executor;
mod parser;

pub use converter::PylintConverter;
pub use executor::PylintTool;

pub const NAME: &str = "pylint";
pub const CONFIG_FILE: &str = ".pylintrc";
