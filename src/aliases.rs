// src/aliases.rs
//! Secret types, re-exported from secrecy
//!
//! The backup password is the only secret this crate ever touches.

pub use secrecy::ExposeSecret;

/// Unlocks the device backup; answered to the helper prompt. Zeroized on drop.
pub type BackupPassword = secrecy::SecretString;
