// src/keychain/project.rs
//! Container + plaintext dump → editable view

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use super::record::{Container, PlaintextDump, PlaintextRecord};
use crate::enums::RecordClass;
use crate::error::Result;

/// Per-class slice of the view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassView {
    /// Entries in the container, decrypted or not
    pub total: usize,
    /// Decrypted entries with internal fields removed
    pub items: Vec<PlaintextRecord>,
}

impl ClassView {
    /// Container entries the helper could not decrypt; these can be neither
    /// edited nor deleted
    pub fn undecrypted(&self) -> usize {
        self.total.saturating_sub(self.items.len())
    }
}

/// What `inspect` returns: `{ "cert": {..}, "genp": {..}, "inet": {..}, "keys": {..} }`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct KeychainView(BTreeMap<RecordClass, ClassView>);

impl KeychainView {
    pub fn class(&self, class: RecordClass) -> &ClassView {
        // project() fills every class
        &self.0[&class]
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordClass, &ClassView)> {
        self.0.iter().map(|(class, view)| (*class, view))
    }

    pub fn undecrypted(&self) -> usize {
        self.0.values().map(ClassView::undecrypted).sum()
    }
}

/// Build the editable view. Inputs are left untouched; a class missing from
/// either side is a [`crate::CoreError::FormatInconsistency`].
pub fn project(container: &Container, dump: &PlaintextDump) -> Result<KeychainView> {
    let mut view = BTreeMap::new();
    for class in RecordClass::ALL {
        let total = container.class(class)?.len();
        let items: Vec<PlaintextRecord> = dump
            .class(class)?
            .iter()
            .map(PlaintextRecord::editable)
            .collect();

        let class_view = ClassView { total, items };
        if class_view.undecrypted() > 0 {
            warn!(
                %class,
                total,
                undecrypted = class_view.undecrypted(),
                "container holds entries the helper could not decrypt"
            );
        }
        view.insert(class, class_view);
    }
    Ok(KeychainView(view))
}
