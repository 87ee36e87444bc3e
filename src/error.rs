//! Error taxonomy for runtime interactions.
//!
//! Every fallible operation in this crate returns [`Result`]. Local
//! recoverable conditions (missing previous snapshot, missing config,
//! empty relation data) are expressed as `None`/`false` at the call
//! site and never surface here.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A hook tool exited nonzero. Not retried at this layer.
    #[error("`{program}` exited with status {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: i32,
        stderr: String,
    },

    /// The hook tool binary is not present on this runtime.
    #[error("`{program}` not found")]
    CommandNotFound { program: String },

    /// A hook tool produced output that was not the expected JSON.
    #[error("failed to decode `{program}` output")]
    Decode {
        program: String,
        #[source]
        source: serde_json::Error,
    },

    /// The persisted snapshot file exists but does not hold a JSON object.
    #[error("corrupt state file {path}")]
    State {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No handler is registered for the resolved event name.
    #[error("no handler registered for hook `{0}`")]
    UnregisteredHook(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation needs a capability this runtime version lacks.
    #[error("runtime does not support `{0}`")]
    Unsupported(&'static str),

    #[error("failed to parse metadata at {path}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to encode relation data")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A before/after lifecycle callback failed.
    #[error("lifecycle callback failed")]
    Callback(#[source] anyhow::Error),

    /// The hook handler itself failed.
    #[error("hook `{hook}` failed")]
    Hook {
        hook: String,
        #[source]
        source: anyhow::Error,
    },
}
