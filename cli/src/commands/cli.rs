use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Compile and enforce natural-language code policies")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ./codepact.toml, then the user config dir).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ValidateArgs {
    /// Compiled policy (defaults to <config_dir>/code-policy.json).
    #[arg(long)]
    pub policy: Option<PathBuf>,

    /// Validate the staged changes instead of the working tree.
    #[arg(long, conflicts_with_all = ["base", "head"])]
    pub staged: bool,

    #[arg(long, requires = "head")]
    pub base: Option<String>,

    #[arg(long, requires = "base")]
    pub head: Option<String>,

    /// Repository root (defaults to the current directory).
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// Print the full result as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ConvertArgs {
    /// Natural-language policy to compile.
    #[arg(long, default_value = "user-policy.json")]
    pub input: PathBuf,

    /// Where generated configs and code-policy.json are written.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ToolsArgs {
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Check changed files against a compiled policy.
    Validate(ValidateArgs),
    /// Compile a natural-language policy into tool configs.
    Convert(ConvertArgs),
    /// List registered tools.
    Tools(ToolsArgs),
}
