// src/request.rs
//! Request inputs and their preconditions
//!
//! Everything here is checked before the helper is ever launched.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::aliases::{BackupPassword, ExposeSecret};
use crate::error::{CoreError, Result};
use crate::keychain::{DeleteDescriptor, EditDescriptor};

/// Which backup to open and how to unlock it
pub struct BackupRequest {
    pub path: PathBuf,
    pub password: BackupPassword,
}

impl BackupRequest {
    pub fn new(path: impl Into<PathBuf>, password: impl Into<String>) -> Self {
        let password: String = password.into();
        Self {
            path: path.into(),
            password: BackupPassword::from(password),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() || self.password.expose_secret().is_empty() {
            return Err(CoreError::precondition("Missing path or password"));
        }
        if !self.path.exists() {
            return Err(CoreError::precondition(format!(
                "Backup path does not exist: {}",
                self.path.display()
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for BackupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupRequest")
            .field("path", &self.path)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

fn parse_array(items: &str, what: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(items) {
        Ok(Value::Array(values)) => Ok(values),
        Ok(_) => Err(CoreError::precondition(format!("{what} must be a JSON array"))),
        Err(e) => Err(CoreError::precondition(format!("{what} are not valid JSON: {e}"))),
    }
}

/// Parse the JSON array of edits sent by the caller. An empty array is valid.
pub fn parse_edits(items: &str) -> Result<Vec<EditDescriptor>> {
    parse_array(items, "edit items")?
        .into_iter()
        .map(|v| {
            serde_json::from_value(v)
                .map_err(|e| CoreError::precondition(format!("bad edit item: {e}")))
        })
        .collect()
}

/// Parse the JSON array of deletes. At least one item is required.
pub fn parse_deletes(items: &str) -> Result<Vec<DeleteDescriptor>> {
    let deletes = parse_array(items, "delete items")?
        .into_iter()
        .map(|v| {
            serde_json::from_value(v)
                .map_err(|e| CoreError::precondition(format!("bad delete item: {e}")))
        })
        .collect::<Result<Vec<DeleteDescriptor>>>()?;
    require_deletes(&deletes)?;
    Ok(deletes)
}

pub(crate) fn require_deletes(deletes: &[DeleteDescriptor]) -> Result<()> {
    if deletes.is_empty() {
        return Err(CoreError::precondition("No items specified for deletion"));
    }
    Ok(())
}
