// src/workspace.rs
//! Per-request scratch directory
//!
//! Everything the helper writes lands here. The directory and its contents
//! are removed when the [`WorkArea`] drops, on success and failure alike.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::consts::{
    DUMP_FILE, FRAGMENT_FILE, KEYCHAIN_CONTAINER_FILE, KEYCHAIN_DOMAIN, UPDATED_DUMP_FILE,
};
use crate::error::Result;

#[derive(Debug)]
pub struct WorkArea {
    dir: TempDir,
}

impl WorkArea {
    pub fn acquire(prefix: &str) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        tracing::debug!(path = %dir.path().display(), "work area acquired");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Plaintext dump written by `dumpkeys`
    pub fn dump_path(&self) -> PathBuf {
        self.path().join(DUMP_FILE)
    }

    /// Restore target for the keychain domain
    pub fn domain_dir(&self) -> PathBuf {
        self.path().join(KEYCHAIN_DOMAIN)
    }

    pub fn container_path(&self) -> PathBuf {
        self.domain_dir().join(KEYCHAIN_CONTAINER_FILE)
    }

    pub fn updated_dump_path(&self) -> PathBuf {
        self.path().join(UPDATED_DUMP_FILE)
    }

    pub fn fragment_path(&self) -> PathBuf {
        self.path().join(FRAGMENT_FILE)
    }

    /// Remove the directory now and report any failure; dropping does the
    /// same silently
    pub fn release(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}
