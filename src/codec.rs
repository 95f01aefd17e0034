// src/codec.rs
//! Binary property-list codec for `keychain-backup.plist`
//!
//! Entry fields and top-level keys this crate never interprets are carried
//! through in their original order.

use std::io::Cursor;
use std::path::Path;

use plist::{Dictionary, Value};

use crate::consts::{CONTAINER_DATA_FIELD, CONTAINER_REF_FIELD};
use crate::enums::RecordClass;
use crate::error::{CoreError, Result};
use crate::keychain::{Container, ContainerRecord};

/// Reads and writes the container format
pub trait ContainerCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Container>;

    fn encode(&self, container: &Container) -> Result<Vec<u8>>;

    fn read(&self, path: &Path) -> Result<Container> {
        self.decode(&std::fs::read(path)?)
    }

    /// Encode, write to `path`, and hand back the bytes written
    fn write(&self, container: &Container, path: &Path) -> Result<Vec<u8>> {
        let bytes = self.encode(container)?;
        std::fs::write(path, &bytes)?;
        Ok(bytes)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryPlistCodec;

impl ContainerCodec for BinaryPlistCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Container> {
        let root = Value::from_reader(Cursor::new(bytes))?
            .into_dictionary()
            .ok_or_else(|| CoreError::Container("top level is not a dictionary".into()))?;

        let mut container = Container::new();
        for (key, value) in root.iter() {
            let Some(class) = RecordClass::from_tag(key) else {
                continue;
            };
            let entries = value.as_array().ok_or_else(|| {
                CoreError::Container(format!("class '{class}' is not an array"))
            })?;
            let records = entries
                .iter()
                .enumerate()
                .map(|(i, entry)| decode_record(class, i, entry))
                .collect::<Result<Vec<_>>>()?;
            container.insert_class(class, records);
        }
        container.root = root;
        Ok(container)
    }

    fn encode(&self, container: &Container) -> Result<Vec<u8>> {
        let mut root = container.root.clone();
        for (class, records) in container.classes() {
            let entries = records.iter().map(encode_record).collect();
            // existing keys keep their position
            root.insert(class.tag().to_owned(), Value::Array(entries));
        }

        let mut out = Vec::new();
        Value::Dictionary(root).to_writer_binary(&mut out)?;
        Ok(out)
    }
}

fn decode_record(class: RecordClass, index: usize, entry: &Value) -> Result<ContainerRecord> {
    let fields = entry.as_dictionary().ok_or_else(|| {
        CoreError::Container(format!("{class}[{index}] is not a dictionary"))
    })?;
    let data_field = |name: &str| {
        fields
            .get(name)
            .and_then(Value::as_data)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| CoreError::Container(format!("{class}[{index}] has no {name} data")))
    };

    Ok(ContainerRecord {
        persistent_ref: data_field(CONTAINER_REF_FIELD)?,
        payload: data_field(CONTAINER_DATA_FIELD)?,
        fields: fields.clone(),
    })
}

fn encode_record(record: &ContainerRecord) -> Value {
    let mut fields: Dictionary = record.fields.clone();
    fields.insert(
        CONTAINER_REF_FIELD.to_owned(),
        Value::Data(record.persistent_ref.clone()),
    );
    fields.insert(
        CONTAINER_DATA_FIELD.to_owned(),
        Value::Data(record.payload.clone()),
    );
    Value::Dictionary(fields)
}
