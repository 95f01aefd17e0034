// src/error.rs
//! Public error types for the entire crate

use thiserror::Error;

use crate::enums::{RecordClass, RecordSpace};

#[derive(Error, Debug)]
pub enum CoreError {
    /// Missing or invalid request input; nothing was attempted
    #[error("Invalid request: {0}")]
    Precondition(String),

    #[error("Backup helper failed: {0}")]
    Capability(#[from] HelperError),

    #[error("Keychain class '{class}' missing from {space}")]
    FormatInconsistency {
        class: RecordClass,
        space: RecordSpace,
    },

    #[error("Malformed container: {0}")]
    Container(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Plist error: {0}")]
    Plist(#[from] plist::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl CoreError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        CoreError::Precondition(msg.into())
    }
}

/// Failure reported by the external decrypt/encrypt helper
#[derive(Error, Debug)]
pub enum HelperError {
    #[error("Bad password.")]
    BadCredential,

    #[error("Timeout waiting for {helper}.")]
    Timeout { helper: String },

    #[error("{helper} failed with code {code}: {output}")]
    Failed {
        helper: String,
        code: i32,
        output: String,
    },

    #[error("could not launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A persistent reference that is not valid base64 in either alphabet
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistRefError {
    #[error("empty persistent reference")]
    Empty,

    #[error("persistent reference {reference:?} is not base64: {reason}")]
    Decode { reference: String, reason: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
