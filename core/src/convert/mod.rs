mod compiler;
mod driver;
mod routing;

pub use compiler::{CompileResult, CompilerOptions, Fallback, PolicyCompiler, CODE_POLICY_FILE};
pub use driver::convert_rules_for_tool;
pub use routing::{candidate_tools, parse_tool_selection, route_rules};
