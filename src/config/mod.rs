// src/config/mod.rs
//! Configuration system for keychain-backup-editor
//!
//! Central, lazy-loaded global config with TOML + env overrides.

pub use app::{load, Config, HelperConfig, OutputConfig, WorkspaceConfig};

mod app;
mod defaults;
