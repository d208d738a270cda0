//! Built-in native tools. Each tool ships an executor and a converter.

pub mod eslint;
pub mod pylint;
pub mod tsc;

mod support;

pub use eslint::{EslintConverter, EslintTool};
pub use pylint::{PylintConverter, PylintTool};
pub use tsc::{TscConverter, TscTool};
