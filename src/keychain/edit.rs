// src/keychain/edit.rs
//! Caller-supplied mutations and their application to the plaintext dump

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::record::PlaintextDump;
use crate::enums::RecordClass;

/// `{ "persistref": "...", "<attribute>": <value>, ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditDescriptor {
    pub persistref: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl EditDescriptor {
    pub fn new(persistref: impl Into<String>) -> Self {
        Self {
            persistref: persistref.into(),
            attributes: Map::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_owned(), value.into());
        self
    }
}

/// `{ "persistref": "..." }`; any other fields are ignored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteDescriptor {
    pub persistref: String,
}

impl DeleteDescriptor {
    pub fn new(persistref: impl Into<String>) -> Self {
        Self {
            persistref: persistref.into(),
        }
    }
}

/// Where an edit landed, if anywhere. Only used for logging; callers are not
/// told which edits took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub persistref: String,
    pub class: Option<RecordClass>,
}

/// Overwrite the named attributes of the first record (classes in fixed
/// order) whose `persistref` equals the descriptor's. Unmatched descriptors
/// are no-ops.
pub fn apply_edits(dump: &mut PlaintextDump, edits: &[EditDescriptor]) -> Vec<EditOutcome> {
    edits
        .iter()
        .map(|edit| {
            let class = apply_edit(dump, edit);
            match class {
                Some(class) => debug!(%class, persistref = %edit.persistref, "edit applied"),
                None => debug!(persistref = %edit.persistref, "edit matched no record"),
            }
            EditOutcome {
                persistref: edit.persistref.clone(),
                class,
            }
        })
        .collect()
}

fn apply_edit(dump: &mut PlaintextDump, edit: &EditDescriptor) -> Option<RecordClass> {
    if edit.persistref.is_empty() {
        return None;
    }

    let mut hit: Option<RecordClass> = None;
    for (class, records) in dump.classes_mut() {
        let Some(record) = records
            .iter_mut()
            .find(|r| r.persistref.as_deref() == Some(edit.persistref.as_str()))
        else {
            continue;
        };
        match hit {
            None => {
                for (name, value) in &edit.attributes {
                    record.set(name, value.clone());
                }
                hit = Some(class);
            }
            Some(first) => {
                warn!(
                    persistref = %edit.persistref,
                    applied_to = %first,
                    also_in = %class,
                    "reference present in more than one class; only the first was edited"
                );
            }
        }
    }
    hit
}

/// Drop every plaintext record whose `persistref` is in the delete set.
/// Records without a reference are never dropped.
/// Returns how many records were removed.
pub fn apply_deletes(dump: &mut PlaintextDump, deletes: &[DeleteDescriptor]) -> usize {
    let refs: HashSet<&str> = deletes
        .iter()
        .map(|d| d.persistref.as_str())
        .filter(|r| !r.is_empty())
        .collect();
    let mut removed = 0;
    for (class, records) in dump.classes_mut() {
        let before = records.len();
        records.retain(|r| !r.persistref.as_deref().is_some_and(|p| refs.contains(p)));
        let dropped = before - records.len();
        if dropped > 0 {
            debug!(%class, dropped, "removed plaintext records");
        }
        removed += dropped;
    }
    removed
}
