// src/session.rs
//! Request orchestration: helper → reconciliation engine → container bytes
//!
//! A [`Session`] holds no per-request state. Each operation acquires its own
//! [`WorkArea`], runs one sequential pipeline, and releases the area on every
//! exit path.

use tracing::info;

use crate::codec::{BinaryPlistCodec, ContainerCodec};
use crate::config::Config;
use crate::consts::{DEFAULT_TEMP_PREFIX, KEYCHAIN_DOMAIN};
use crate::error::Result;
use crate::helper::{IRestore, KeychainHelper};
use crate::keychain::{
    apply_deletes, apply_edits, merge_deletes, merge_edits, project, Container, DeleteDescriptor,
    EditDescriptor, KeychainView, PlaintextDump,
};
use crate::request::{require_deletes, BackupRequest};
use crate::workspace::WorkArea;

/// Both record spaces as read from one backup
struct Decrypted {
    container: Container,
    /// The container file exactly as restored
    original: Vec<u8>,
    dump: PlaintextDump,
}

#[derive(Debug, Clone)]
pub struct Session<H, C = BinaryPlistCodec> {
    helper: H,
    codec: C,
    temp_prefix: String,
}

impl Session<IRestore, BinaryPlistCodec> {
    pub fn from_config(config: &Config) -> Self {
        Session::new(IRestore::from_config(&config.helper), BinaryPlistCodec)
            .with_temp_prefix(&config.workspace.temp_prefix)
    }
}

impl<H: KeychainHelper, C: ContainerCodec> Session<H, C> {
    pub fn new(helper: H, codec: C) -> Self {
        Self {
            helper,
            codec,
            temp_prefix: DEFAULT_TEMP_PREFIX.to_owned(),
        }
    }

    pub fn with_temp_prefix(mut self, prefix: &str) -> Self {
        self.temp_prefix = prefix.to_owned();
        self
    }

    pub fn helper(&self) -> &H {
        &self.helper
    }

    /// Editable view of every class
    pub fn inspect(&self, backup: &BackupRequest) -> Result<KeychainView> {
        backup.validate()?;
        let area = WorkArea::acquire(&self.temp_prefix)?;
        let decrypted = self.decrypt(backup, &area)?;

        let view = project(&decrypted.container, &decrypted.dump)?;
        info!(
            records = decrypted.container.len(),
            undecrypted = view.undecrypted(),
            "keychain inspected"
        );
        area.release()?;
        Ok(view)
    }

    /// Apply `edits` and return the updated container bytes. Edits that
    /// match nothing are ignored.
    pub fn update(&self, backup: &BackupRequest, edits: &[EditDescriptor]) -> Result<Vec<u8>> {
        backup.validate()?;
        let area = WorkArea::acquire(&self.temp_prefix)?;
        let Decrypted {
            mut container,
            original,
            mut dump,
        } = self.decrypt(backup, &area)?;

        let outcomes = apply_edits(&mut dump, edits);
        let matched = outcomes.iter().filter(|o| o.class.is_some()).count();
        info!(requested = edits.len(), matched, "edits applied to plaintext");
        if matched == 0 {
            area.release()?;
            return Ok(original);
        }

        let fragment = self.reencrypt(backup, &area, &dump)?;
        let report = merge_edits(&mut container, &fragment, edits)?;
        info!(replaced = report.replaced_total(), "edits merged into container");

        let bytes = if report.is_unchanged() {
            original
        } else {
            self.codec.write(&container, &area.container_path())?
        };
        area.release()?;
        Ok(bytes)
    }

    /// Remove `deletes` from both record spaces and return the updated
    /// container bytes. Entries the helper could not decrypt are never
    /// deletable.
    pub fn delete(&self, backup: &BackupRequest, deletes: &[DeleteDescriptor]) -> Result<Vec<u8>> {
        require_deletes(deletes)?;
        backup.validate()?;
        let area = WorkArea::acquire(&self.temp_prefix)?;
        let Decrypted {
            mut container,
            original,
            mut dump,
        } = self.decrypt(backup, &area)?;

        let plaintext_removed = apply_deletes(&mut dump, deletes);
        let report = merge_deletes(&mut container, deletes)?;
        info!(
            requested = deletes.len(),
            plaintext_removed,
            container_removed = report.removed_total(),
            "deletes applied"
        );

        let bytes = if report.is_unchanged() {
            original
        } else {
            self.codec.write(&container, &area.container_path())?
        };
        area.release()?;
        Ok(bytes)
    }

    fn decrypt(&self, backup: &BackupRequest, area: &WorkArea) -> Result<Decrypted> {
        self.helper.dump_keys(backup, &area.dump_path())?;
        self.helper
            .restore_domain(backup, KEYCHAIN_DOMAIN, &area.domain_dir())?;

        let dump = PlaintextDump::from_json(&std::fs::read(area.dump_path())?)?;
        let original = std::fs::read(area.container_path())?;
        let container = self.codec.decode(&original)?;
        info!(
            decrypted = dump.len(),
            container = container.len(),
            "backup keychain loaded"
        );
        Ok(Decrypted {
            container,
            original,
            dump,
        })
    }

    fn reencrypt(
        &self,
        backup: &BackupRequest,
        area: &WorkArea,
        dump: &PlaintextDump,
    ) -> Result<Container> {
        let input = area.updated_dump_path();
        let output = area.fragment_path();
        std::fs::write(&input, dump.to_json_pretty()?)?;
        self.helper.encrypt_keys(backup, &input, &output)?;
        self.codec.read(&output)
    }
}
