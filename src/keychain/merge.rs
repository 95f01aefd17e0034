// src/keychain/merge.rs
//! Fold edits and deletes back into the original binary container
//!
//! Matching is by composite reference only. Records that no descriptor
//! names are never touched, so their bytes and their order survive as read.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, warn};

use super::edit::{DeleteDescriptor, EditDescriptor};
use super::persistref::{composite_key, CompositeKey};
use super::record::{Container, ContainerRecord};
use crate::enums::RecordClass;
use crate::error::Result;

/// What a merge changed, per class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub replaced: BTreeMap<RecordClass, usize>,
    pub removed: BTreeMap<RecordClass, usize>,
}

impl MergeReport {
    pub fn replaced_total(&self) -> usize {
        self.replaced.values().sum()
    }

    pub fn removed_total(&self) -> usize {
        self.removed.values().sum()
    }

    /// Nothing in the container changed
    pub fn is_unchanged(&self) -> bool {
        self.replaced_total() == 0 && self.removed_total() == 0
    }
}

fn keys_for<'a, I>(class: RecordClass, refs: I) -> HashSet<CompositeKey>
where
    I: IntoIterator<Item = &'a str>,
{
    refs.into_iter()
        .filter_map(|r| composite_key(class, r))
        .collect()
}

/// Replace the payload of every container record named by an edit with the
/// payload of the same record in the re-encrypted `fragment`. A record the
/// fragment does not carry, or a class it lacks, is left as it was.
pub fn merge_edits(
    container: &mut Container,
    fragment: &Container,
    edits: &[EditDescriptor],
) -> Result<MergeReport> {
    let mut report = MergeReport::default();

    for class in RecordClass::ALL {
        let records = container.class_mut(class)?;
        let wanted = keys_for(class, edits.iter().map(|e| e.persistref.as_str()));
        if wanted.is_empty() {
            continue;
        }

        // built on the first container hit in this class
        let mut index: Option<HashMap<&[u8], &ContainerRecord>> = None;
        let mut replaced = 0;
        for record in records.iter_mut() {
            if !wanted.contains(record.persistent_ref.as_slice()) {
                continue;
            }
            let lookup = index.get_or_insert_with(|| fragment_index(fragment, class));
            match lookup.get(record.persistent_ref.as_slice()) {
                Some(updated) => {
                    record.payload = updated.payload.clone();
                    replaced += 1;
                    debug!(%class, "payload replaced");
                }
                None => warn!(
                    %class,
                    persistent_ref = %hex::encode(&record.persistent_ref),
                    "edited record missing from re-encrypted fragment; left unchanged"
                ),
            }
        }
        if replaced > 0 {
            report.replaced.insert(class, replaced);
        }
    }

    Ok(report)
}

fn fragment_index(fragment: &Container, class: RecordClass) -> HashMap<&[u8], &ContainerRecord> {
    match fragment.class(class) {
        Ok(records) => records
            .iter()
            .map(|r| (r.persistent_ref.as_slice(), r))
            .collect(),
        Err(_) => {
            warn!(%class, "class missing from re-encrypted fragment");
            HashMap::new()
        }
    }
}

/// Remove every container record named by a delete descriptor.
pub fn merge_deletes(container: &mut Container, deletes: &[DeleteDescriptor]) -> Result<MergeReport> {
    let mut report = MergeReport::default();

    for class in RecordClass::ALL {
        let records = container.class_mut(class)?;
        let doomed = keys_for(class, deletes.iter().map(|d| d.persistref.as_str()));
        if doomed.is_empty() {
            continue;
        }

        let before = records.len();
        records.retain(|r| !doomed.contains(r.persistent_ref.as_slice()));
        let removed = before - records.len();
        if removed > 0 {
            debug!(%class, removed, "container records removed");
            report.removed.insert(class, removed);
        }
    }

    Ok(report)
}
