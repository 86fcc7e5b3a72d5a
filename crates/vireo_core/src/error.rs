use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the runtime API
#[derive(Debug, Error)]
pub enum VireoError {
    #[error("runtime is missing its {0} collaborator")]
    MissingCollaborator(&'static str),

    #[error("state initialization failed for instance {uid}: {message}")]
    StateInit { uid: u64, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Template compilation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to compile template:\n{}", .errors.iter().map(|e| format!("  - {e}")).collect::<Vec<_>>().join("\n"))]
pub struct CompileError {
    pub errors: Vec<String>,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
        }
    }
}

/// Failure while committing a virtual tree to the host
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("host node no longer exists")]
    MissingNode,

    #[error("component <{0}> could not be mounted")]
    ComponentMount(String),

    #[error("cannot replace a node that has no parent")]
    Detached,
}

/// Rejected reactive registration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    #[error("state key `{0}` is reserved")]
    ReservedKey(String),
}

/// Configuration loading failure
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
