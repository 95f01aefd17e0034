// src/helper/mod.rs
//! Boundary to the external decrypt/encrypt helper
//!
//! The helper owns all keychain cryptography. This crate only asks it to
//! dump, restore and re-encrypt, and reads back the files it writes.

mod irestore;

pub use irestore::{tcl_word, IRestore};

use std::path::Path;

use crate::error::HelperError;
use crate::request::BackupRequest;

pub type HelperResult<T> = std::result::Result<T, HelperError>;

/// Decrypt/encrypt capability over one backup
pub trait KeychainHelper {
    /// Write every decryptable keychain record as JSON to `out`
    fn dump_keys(&self, backup: &BackupRequest, out: &Path) -> HelperResult<()>;

    /// Restore one backup domain (files as stored) into `dest`
    fn restore_domain(&self, backup: &BackupRequest, domain: &str, dest: &Path)
        -> HelperResult<()>;

    /// Re-encrypt the JSON dump at `input` into a container fragment at `output`
    fn encrypt_keys(&self, backup: &BackupRequest, input: &Path, output: &Path)
        -> HelperResult<()>;
}
