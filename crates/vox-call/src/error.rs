use thiserror::Error;

use crate::state::CallState;

/// Failures reported by a voice SDK client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    #[error("voice client could not be created: {0}")]
    Create(String),

    #[error("call start rejected: {0}")]
    Start(String),

    #[error("call stop failed: {0}")]
    Stop(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum CallError {
    #[error("voice functionality unavailable")]
    SdkUnavailable,

    #[error("cannot start a call while {0}")]
    NotIdle(CallState),

    #[error("no active call")]
    NotActive,

    #[error(transparent)]
    Sdk(#[from] SdkError),
}
