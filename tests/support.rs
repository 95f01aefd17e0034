// tests/support.rs
//! Test utilities: fixture keychains and a scripted stand-in for the helper

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use keychain_backup_editor::error::HelperError;
use keychain_backup_editor::helper::{HelperResult, KeychainHelper};
use keychain_backup_editor::keychain::{decode_persistref, PlaintextDump, PlaintextRecord};
use keychain_backup_editor::{BackupRequest, RecordClass};
use plist::{Dictionary, Value};
use serde_json::json;

/// Raw reference bytes of a container entry the helper cannot decrypt
#[allow(dead_code)]
pub const UNDECRYPTABLE_REF: &[u8] = b"\x00locked-item";

#[cfg(feature = "logging")]
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[cfg(not(feature = "logging"))]
#[allow(dead_code)]
pub fn init_tracing() {}

#[allow(dead_code)]
pub fn b64(raw: &[u8]) -> String {
    STANDARD.encode(raw)
}

/// What the helper's `dumpkeys` writes for the fixture backup
#[allow(dead_code)]
pub fn sample_dump_json() -> serde_json::Value {
    json!({
        "General": [
            {
                "persistref": b64(b"genp-0001"),
                "agrp": "com.example.mail",
                "labl": "mail",
                "acct": "alice",
                "svce": "imap",
                "v_Data": "hunter2",
                "_class": "genp",
                "_version": 3
            },
            {
                "persistref": b64(b"genp-0002"),
                "agrp": "com.example.chat",
                "labl": "old",
                "acct": "bob",
                "_class": "genp"
            },
            {
                "persistref": b64(b"genp-0003"),
                "labl": "vpn",
                "_class": "genp"
            }
        ],
        "Internet": [
            {
                "persistref": b64(b"inet-0001"),
                "srvr": "example.org",
                "ptcl": "htps",
                "_class": "inet"
            }
        ],
        "Certs": [
            {
                "persistref": b64(b"cert-0001"),
                "labl": "Example Root CA",
                "_class": "cert"
            }
        ],
        "Keys": []
    })
}

#[allow(dead_code)]
pub fn sample_dump() -> PlaintextDump {
    serde_json::from_value(sample_dump_json()).expect("fixture dump parses")
}

/// Deterministic stand-in for encrypting one record
pub fn seal(record: &PlaintextRecord) -> Vec<u8> {
    let mut out = b"sealed:".to_vec();
    out.extend(serde_json::to_vec(record).expect("record serializes"));
    out
}

fn entry(persistent_ref: Vec<u8>, payload: Vec<u8>) -> Value {
    let mut fields = Dictionary::new();
    fields.insert("pdmn".into(), Value::String("ak".into()));
    fields.insert("v_PersistentRef".into(), Value::Data(persistent_ref));
    fields.insert("v_Data".into(), Value::Data(payload));
    Value::Dictionary(fields)
}

/// Binary container whose entries are the sealed dump records, plus
/// `extra` entries that have no plaintext counterpart
pub fn container_bytes(dump: &PlaintextDump, extra: &[(RecordClass, &[u8])]) -> Vec<u8> {
    let mut root = Dictionary::new();
    root.insert("backupVersion".into(), Value::String("5.0".into()));
    for class in RecordClass::ALL {
        let mut entries: Vec<Value> = dump
            .class(class)
            .expect("fixture has every class")
            .iter()
            .map(|record| {
                let raw = record
                    .persistref
                    .as_deref()
                    .and_then(|r| decode_persistref(r).ok())
                    .expect("fixture ref decodes");
                let mut composite = class.tag().as_bytes().to_vec();
                composite.extend(raw);
                entry(composite, seal(record))
            })
            .collect();
        for (extra_class, raw) in extra {
            if *extra_class == class {
                let mut composite = class.tag().as_bytes().to_vec();
                composite.extend_from_slice(raw);
                entries.push(entry(composite, b"opaque".to_vec()));
            }
        }
        root.insert(class.tag().into(), Value::Array(entries));
    }

    let mut out = Vec::new();
    Value::Dictionary(root)
        .to_writer_binary(&mut out)
        .expect("fixture container encodes");
    out
}

/// The fixture backup: the sample dump plus one undecryptable `genp` entry
#[allow(dead_code)]
pub fn sample_container_bytes() -> Vec<u8> {
    container_bytes(
        &sample_dump(),
        &[(RecordClass::GenericPassword, UNDECRYPTABLE_REF)],
    )
}

fn io_failure(source: std::io::Error) -> HelperError {
    HelperError::Spawn {
        program: "fake-helper".into(),
        source,
    }
}

/// Scripted helper: serves fixture files and "encrypts" with [`seal`]
#[allow(dead_code)]
pub struct FakeHelper {
    pub dump_json: Vec<u8>,
    pub container: Vec<u8>,
    pub reject_password: bool,
    pub calls: RefCell<Vec<&'static str>>,
    /// Last work area the helper wrote into
    pub work_area: RefCell<Option<PathBuf>>,
}

#[allow(dead_code)]
impl FakeHelper {
    pub fn new(dump_json: serde_json::Value, container: Vec<u8>) -> Self {
        Self {
            dump_json: serde_json::to_vec(&dump_json).expect("dump serializes"),
            container,
            reject_password: false,
            calls: RefCell::new(Vec::new()),
            work_area: RefCell::new(None),
        }
    }

    pub fn sample() -> Self {
        Self::new(sample_dump_json(), sample_container_bytes())
    }

    pub fn rejecting_password() -> Self {
        Self {
            reject_password: true,
            ..Self::sample()
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    fn note(&self, call: &'static str, path: &Path) {
        self.calls.borrow_mut().push(call);
        *self.work_area.borrow_mut() = path.parent().map(Path::to_path_buf);
    }
}

impl KeychainHelper for FakeHelper {
    fn dump_keys(&self, _backup: &BackupRequest, out: &Path) -> HelperResult<()> {
        self.note("dumpkeys", out);
        if self.reject_password {
            return Err(HelperError::BadCredential);
        }
        fs::write(out, &self.dump_json).map_err(io_failure)
    }

    fn restore_domain(&self, _backup: &BackupRequest, domain: &str, dest: &Path) -> HelperResult<()> {
        self.note("restore", dest);
        assert_eq!(domain, "KeychainDomain");
        fs::create_dir_all(dest).map_err(io_failure)?;
        fs::write(dest.join("keychain-backup.plist"), &self.container).map_err(io_failure)
    }

    fn encrypt_keys(&self, _backup: &BackupRequest, input: &Path, output: &Path) -> HelperResult<()> {
        self.note("encryptkeys", input);
        let json = fs::read(input).map_err(io_failure)?;
        let dump: PlaintextDump = serde_json::from_slice(&json).expect("edited dump parses");
        fs::write(output, container_bytes(&dump, &[])).map_err(io_failure)
    }
}
