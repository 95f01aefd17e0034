// src/keychain/mod.rs
//! Record reconciliation engine: pure and in-memory
//!
//! Joins the helper's plaintext dump with the binary container on the
//! composite persistent reference, and folds edits/deletes back into the
//! container without touching records nobody asked about.
mod edit;
mod merge;
mod persistref;
mod project;
mod record;

pub use edit::{apply_deletes, apply_edits, DeleteDescriptor, EditDescriptor, EditOutcome};
pub use merge::{merge_deletes, merge_edits, MergeReport};
pub use persistref::{composite_key, decode as decode_persistref, normalize, CompositeKey};
pub use project::{project, ClassView, KeychainView};
pub use record::{
    is_internal_field, Container, ContainerRecord, PlaintextDump, PlaintextRecord,
    CREATED_FIELD, GROUP_FIELD, LABEL_FIELD, MODIFIED_FIELD,
};
