mod load;
mod types;

pub use load::{expand_path, load_default, DEFAULT_CONFIG_FILE};
pub use types::*;
