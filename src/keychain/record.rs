// src/keychain/record.rs
//! Record types for the two spaces the engine reconciles
//!
//! - [`PlaintextRecord`] / [`PlaintextDump`]: what the helper's `dumpkeys` emits
//! - [`ContainerRecord`] / [`Container`]: what `keychain-backup.plist` holds

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::consts::{INTERNAL_FIELD_MARKER, PERSISTREF_FIELD};
use crate::enums::{RecordClass, RecordSpace};
use crate::error::{CoreError, Result};

pub const GROUP_FIELD: &str = "agrp";
pub const LABEL_FIELD: &str = "labl";
pub const CREATED_FIELD: &str = "cdat";
pub const MODIFIED_FIELD: &str = "mdat";

/// True for decryption metadata such as `_class`
pub fn is_internal_field(name: &str) -> bool {
    name.starts_with(INTERNAL_FIELD_MARKER)
}

/// One decrypted keychain entry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct PlaintextRecord {
    /// Plain base64 persistent reference, without the class tag. `None` when
    /// the dump carries no usable reference; such a record never matches.
    pub persistref: Option<String>,
    pub group: Option<Value>,
    pub label: Option<Value>,
    pub created: Option<Value>,
    pub modified: Option<Value>,
    /// Class-specific attributes (`acct`, `svce`, `v_Data`, ...)
    pub attributes: Map<String, Value>,
    internal: Map<String, Value>,
    /// Non-string `persistref` as read (e.g. `null`), written back verbatim
    raw_persistref: Option<Value>,
}

impl PlaintextRecord {
    pub fn new(persistref: impl Into<String>) -> Self {
        Self {
            persistref: Some(persistref.into()),
            ..Self::default()
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        match name {
            GROUP_FIELD => self.group.as_ref(),
            LABEL_FIELD => self.label.as_ref(),
            CREATED_FIELD => self.created.as_ref(),
            MODIFIED_FIELD => self.modified.as_ref(),
            _ if is_internal_field(name) => self.internal.get(name),
            _ => self.attributes.get(name),
        }
    }

    /// Overwrite one attribute. The persistent reference is the record's
    /// identity and is never rewritten here.
    pub fn set(&mut self, name: &str, value: Value) {
        match name {
            PERSISTREF_FIELD => {}
            GROUP_FIELD => self.group = Some(value),
            LABEL_FIELD => self.label = Some(value),
            CREATED_FIELD => self.created = Some(value),
            MODIFIED_FIELD => self.modified = Some(value),
            _ if is_internal_field(name) => {
                self.internal.insert(name.to_owned(), value);
            }
            _ => {
                self.attributes.insert(name.to_owned(), value);
            }
        }
    }

    pub fn internal_fields(&self) -> &Map<String, Value> {
        &self.internal
    }

    /// Copy without decryption metadata, the shape callers get to edit
    pub fn editable(&self) -> Self {
        Self {
            internal: Map::new(),
            ..self.clone()
        }
    }
}

impl TryFrom<Map<String, Value>> for PlaintextRecord {
    type Error = String;

    fn try_from(fields: Map<String, Value>) -> std::result::Result<Self, Self::Error> {
        let mut record = PlaintextRecord::default();
        for (name, value) in fields {
            if name == PERSISTREF_FIELD {
                match value {
                    Value::String(s) => record.persistref = Some(s),
                    other => record.raw_persistref = Some(other),
                }
            } else {
                record.set(&name, value);
            }
        }
        Ok(record)
    }
}

impl From<PlaintextRecord> for Map<String, Value> {
    fn from(record: PlaintextRecord) -> Self {
        let mut fields = Map::new();
        match (record.persistref, record.raw_persistref) {
            (Some(reference), _) => {
                fields.insert(PERSISTREF_FIELD.into(), Value::String(reference));
            }
            (None, Some(raw)) => {
                fields.insert(PERSISTREF_FIELD.into(), raw);
            }
            (None, None) => {}
        }
        let known = [
            (GROUP_FIELD, record.group),
            (LABEL_FIELD, record.label),
            (CREATED_FIELD, record.created),
            (MODIFIED_FIELD, record.modified),
        ];
        for (name, value) in known {
            if let Some(value) = value {
                fields.insert(name.into(), value);
            }
        }
        fields.extend(record.attributes);
        fields.extend(record.internal);
        fields
    }
}

/// The helper's plaintext dump, keyed by class label on the wire
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct PlaintextDump {
    classes: BTreeMap<RecordClass, Vec<PlaintextRecord>>,
    /// Top-level keys that are not record classes, passed through untouched
    extra: Map<String, Value>,
}

impl PlaintextDump {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json_pretty(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn insert_class(&mut self, class: RecordClass, records: Vec<PlaintextRecord>) {
        self.classes.insert(class, records);
    }

    pub fn class(&self, class: RecordClass) -> Result<&[PlaintextRecord]> {
        self.classes
            .get(&class)
            .map(Vec::as_slice)
            .ok_or(CoreError::FormatInconsistency {
                class,
                space: RecordSpace::Plaintext,
            })
    }

    pub fn class_mut(&mut self, class: RecordClass) -> Result<&mut Vec<PlaintextRecord>> {
        self.classes
            .get_mut(&class)
            .ok_or(CoreError::FormatInconsistency {
                class,
                space: RecordSpace::Plaintext,
            })
    }

    /// Classes present in the dump, in matching order
    pub fn classes_mut(&mut self) -> impl Iterator<Item = (RecordClass, &mut Vec<PlaintextRecord>)> {
        self.classes.iter_mut().map(|(class, records)| (*class, records))
    }

    pub fn len(&self) -> usize {
        self.classes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TryFrom<Map<String, Value>> for PlaintextDump {
    type Error = String;

    fn try_from(fields: Map<String, Value>) -> std::result::Result<Self, Self::Error> {
        let mut dump = PlaintextDump::default();
        for (key, value) in fields {
            match RecordClass::from_label(&key) {
                Some(class) => {
                    // helper emits `null` for a class with no decodable items
                    let records = match value {
                        Value::Null => Vec::new(),
                        value => serde_json::from_value(value)
                            .map_err(|e| format!("class {key}: {e}"))?,
                    };
                    dump.classes.insert(class, records);
                }
                None => {
                    dump.extra.insert(key, value);
                }
            }
        }
        Ok(dump)
    }
}

impl From<PlaintextDump> for Map<String, Value> {
    fn from(dump: PlaintextDump) -> Self {
        let mut fields = Map::new();
        for (class, records) in dump.classes {
            let records = records
                .into_iter()
                .map(|r| Value::Object(r.into()))
                .collect();
            fields.insert(class.label().into(), Value::Array(records));
        }
        fields.extend(dump.extra);
        fields
    }
}

/// One opaque entry of the binary container
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerRecord {
    /// Class tag followed by the raw plaintext reference bytes
    pub persistent_ref: Vec<u8>,
    /// Encrypted `v_Data` blob
    pub payload: Vec<u8>,
    /// The entry as read, including fields this crate never interprets
    pub(crate) fields: plist::Dictionary,
}

impl ContainerRecord {
    pub fn new(persistent_ref: Vec<u8>, payload: Vec<u8>) -> Self {
        Self {
            persistent_ref,
            payload,
            fields: plist::Dictionary::new(),
        }
    }
}

/// Decoded `keychain-backup.plist`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Container {
    classes: BTreeMap<RecordClass, Vec<ContainerRecord>>,
    /// Original top-level document; fixes key order and carries non-class keys
    pub(crate) root: plist::Dictionary,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_class(&mut self, class: RecordClass, records: Vec<ContainerRecord>) {
        self.classes.insert(class, records);
    }

    pub fn class(&self, class: RecordClass) -> Result<&[ContainerRecord]> {
        self.classes
            .get(&class)
            .map(Vec::as_slice)
            .ok_or(CoreError::FormatInconsistency {
                class,
                space: RecordSpace::Container,
            })
    }

    pub fn class_mut(&mut self, class: RecordClass) -> Result<&mut Vec<ContainerRecord>> {
        self.classes
            .get_mut(&class)
            .ok_or(CoreError::FormatInconsistency {
                class,
                space: RecordSpace::Container,
            })
    }

    pub fn classes(&self) -> impl Iterator<Item = (RecordClass, &[ContainerRecord])> {
        self.classes.iter().map(|(class, records)| (*class, records.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.classes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
