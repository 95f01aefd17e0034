// src/enums.rs
//! Public enum types used throughout the crate
//!
//! The record-class table is closed: every tag and label below must match
//! what the backup helper emits, byte for byte.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Keychain record class
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecordClass {
    #[serde(rename = "cert")]
    Certificate,
    #[serde(rename = "genp")]
    GenericPassword,
    #[serde(rename = "inet")]
    InternetPassword,
    #[serde(rename = "keys")]
    Key,
}

impl RecordClass {
    /// Every class, in matching order
    pub const ALL: [RecordClass; 4] = [
        RecordClass::Certificate,
        RecordClass::GenericPassword,
        RecordClass::InternetPassword,
        RecordClass::Key,
    ];

    /// 4-byte tag used inside the binary container
    pub const fn tag(self) -> &'static str {
        match self {
            RecordClass::Certificate => "cert",
            RecordClass::GenericPassword => "genp",
            RecordClass::InternetPassword => "inet",
            RecordClass::Key => "keys",
        }
    }

    /// Label used in the plaintext dump
    pub const fn label(self) -> &'static str {
        match self {
            RecordClass::Certificate => "Certs",
            RecordClass::GenericPassword => "General",
            RecordClass::InternetPassword => "Internet",
            RecordClass::Key => "Keys",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.tag() == tag)
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.label() == label)
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Which record space a class was missing from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSpace {
    Container,
    Plaintext,
}

impl fmt::Display for RecordSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordSpace::Container => "container",
            RecordSpace::Plaintext => "plaintext dump",
        })
    }
}
