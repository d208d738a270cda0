use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("config read error: {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error")]
    Parse(#[source] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy file: {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse policy")]
    Parse(#[source] serde_json::Error),

    #[error("duplicate rule id in policy: {0}")]
    DuplicateRuleId(String),

    #[error("failed to write policy: {path}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tool not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool not available: {tool} ({reason})")]
    Unavailable { tool: String, reason: String },

    #[error("failed to install {tool}")]
    Install {
        tool: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to spawn process: {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },

    #[error("failed to parse {tool} output: {message}")]
    Parse { tool: String, message: String },

    #[error("tool config error: {0}")]
    Config(String),

    #[error("io error")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("judge provider call failed")]
    Provider(#[source] anyhow::Error),

    #[error("judge returned an empty response")]
    EmptyResponse,

    #[error("malformed judge response: {message}")]
    MalformedResponse { message: String },

    #[error("payload for rule {rule_id} has unexpected shape: {message}")]
    Payload { rule_id: String, message: String },

    #[error("failed to serialize native config")]
    Serialize(#[from] serde_json::Error),

    #[error("conversion task aborted: {0}")]
    Aborted(String),
}

/// Fatal errors: the run aborts because no partial result is meaningful.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("policy has no rules")]
    EmptyPolicy,

    #[error("rules routed to the judge but no judge is configured: {rule_ids:?}")]
    MissingJudge { rule_ids: Vec<String> },

    #[error("engine is not registered: {engine}")]
    UnknownEngine { engine: String },

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run git")]
    Spawn(#[source] std::io::Error),

    #[error("git {command} failed: {stderr}")]
    Command { command: String, stderr: String },
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to create output directory: {path}")]
    OutputDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Validate(#[from] ValidateError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("judge setup failed")]
    Judge(#[source] anyhow::Error),

    #[error("io error")]
    Io(#[from] std::io::Error),
}
