// src/keychain/persistref.rs
//! Persistent-reference transcoding between the two record spaces
//!
//! The dump stores a bare reference (`persistref`, base64). The container
//! stores `tag ++ raw` as bytes. Producers of the dump do not always use the
//! standard alphabet or keep padding, so decoding is lenient; anything that
//! still fails to decode simply never matches.

use std::borrow::Borrow;
use std::fmt;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;

use crate::enums::RecordClass;
use crate::error::PersistRefError;

/// Standard alphabet, padding checked by hand, tolerant of non-zero trailing bits
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Map URL-safe characters onto the standard alphabet and restore padding
pub fn normalize(reference: &str) -> String {
    let mut normalized: String = reference
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();
    while normalized.len() % 4 != 0 {
        normalized.push('=');
    }
    normalized
}

/// Raw reference bytes for a plaintext `persistref`
pub fn decode(reference: &str) -> Result<Vec<u8>, PersistRefError> {
    if reference.is_empty() {
        return Err(PersistRefError::Empty);
    }
    LENIENT
        .decode(normalize(reference))
        .map_err(|e| PersistRefError::Decode {
            reference: reference.to_owned(),
            reason: e.to_string(),
        })
}

/// Join key between a plaintext record and its container entry
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey(Vec<u8>);

impl CompositeKey {
    pub fn from_raw(class: RecordClass, raw: &[u8]) -> Self {
        let tag = class.tag().as_bytes();
        let mut bytes = Vec::with_capacity(tag.len() + raw.len());
        bytes.extend_from_slice(tag);
        bytes.extend_from_slice(raw);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Canonical comparison form
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }
}

// lets a HashSet<CompositeKey> be probed with a container record's raw bytes
impl Borrow<[u8]> for CompositeKey {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompositeKey({})", hex::encode(&self.0))
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

/// `tag(class) ++ decode(reference)`, or `None` when the reference does not
/// decode. A bad reference is dropped here rather than failing the batch.
pub fn composite_key(class: RecordClass, reference: &str) -> Option<CompositeKey> {
    match decode(reference) {
        Ok(raw) => Some(CompositeKey::from_raw(class, &raw)),
        Err(e) => {
            tracing::debug!(%class, "unmatchable reference: {e}");
            None
        }
    }
}
