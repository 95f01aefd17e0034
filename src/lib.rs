// src/lib.rs
//! keychain-backup-editor: inspect and edit the keychain of an encrypted
//! device backup
//!
//! Features:
//! - Editable plaintext view of every keychain class
//! - Targeted edits and deletes keyed by persistent reference
//! - Merge back into `keychain-backup.plist` without disturbing other records
//! - Cryptography delegated to the `irestore` helper

pub mod aliases;
pub mod codec;
pub mod config;
pub mod consts;
pub mod enums;
pub mod error;
pub mod helper;
pub mod keychain;
pub mod request;
pub mod session;
pub mod workspace;

// Re-export everything users need at the crate root
pub use aliases::{BackupPassword, ExposeSecret};
pub use codec::{BinaryPlistCodec, ContainerCodec};
pub use config::load as load_config;
pub use enums::RecordClass;
pub use error::{CoreError, HelperError, Result as CoreResult};
pub use helper::{IRestore, KeychainHelper};
pub use keychain::{DeleteDescriptor, EditDescriptor, KeychainView};
pub use request::{parse_deletes, parse_edits, BackupRequest};
pub use session::Session;
