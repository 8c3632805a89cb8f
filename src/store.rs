//! The credential store is where derived escrow keys live between sealing a
//! bottle and opening it again. We don't implement a platform keychain here,
//! only the interface the escrow code speaks and an in-memory store that
//! honors it (useful for tests and for callers that bring their own
//! persistence).
//!
//! Entries are indexed by a label and distinguished from one another by their
//! [`KeyClass`] attribute, so one label holds one signing key, one encryption
//! key, and one symmetric key.

use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use zeroize::Zeroizing;

/// What kind of key an entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyClass {
    /// A private signing key
    Signing,
    /// A private encryption key
    Encryption,
    /// A symmetric key
    Symmetric,
}

/// Attributes stored alongside an entry's key bytes.
#[derive(Debug, Clone, PartialEq, Eq, getset::Getters)]
#[getset(get = "pub")]
pub struct StoreAttributes {
    /// The class of key stored.
    key_class: KeyClass,
    /// Free-form tag identifying who wrote the entry.
    application_tag: String,
}

impl StoreAttributes {
    /// Create a new set of attributes
    pub fn new<T: Into<String>>(key_class: KeyClass, application_tag: T) -> Self {
        Self {
            key_class,
            application_tag: application_tag.into(),
        }
    }
}

/// One stored key.
#[derive(Clone, getset::Getters)]
#[getset(get = "pub")]
pub struct StoreEntry {
    /// The label this entry lives under.
    label: String,
    /// The entry's attributes.
    attributes: StoreAttributes,
    /// The raw key bytes.
    key_bytes: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for StoreEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreEntry")
            .field("label", &self.label)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

/// A label-indexed key store.
///
/// Implementations must make `put` an atomic upsert: a concurrent reader sees
/// either the old entry or the new one, never half of either, and two writers
/// to the same label+class leave exactly one entry behind (last writer wins).
pub trait CredentialStore {
    /// Insert or overwrite the entry at `label` with the same key class.
    ///
    /// Stores that refuse to overwrite return [`Error::DuplicateUpsert`];
    /// anything else that goes wrong is [`Error::StoreWriteFailure`].
    fn put(&self, label: &str, attributes: StoreAttributes, key_bytes: &[u8]) -> Result<()>;

    /// Grab every entry stored under `label`, or [`Error::ItemDoesNotExist`].
    fn get(&self, label: &str) -> Result<Vec<StoreEntry>>;

    /// Remove every entry under `label`. Returns [`Error::ItemDoesNotExist`]
    /// if there was nothing to remove.
    fn delete(&self, label: &str) -> Result<()>;

    /// Grab the entry of the given class under `label`.
    fn get_class(&self, label: &str, key_class: KeyClass) -> Result<StoreEntry> {
        self.get(label)?
            .into_iter()
            .find(|entry| entry.attributes().key_class() == &key_class)
            .ok_or_else(|| Error::ItemDoesNotExist(label.to_string()))
    }
}

/// An in-memory [`CredentialStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<(String, KeyClass), StoreEntry>>,
}

impl MemoryStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// How many entries we're holding.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether we're holding anything.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CredentialStore for MemoryStore {
    fn put(&self, label: &str, attributes: StoreAttributes, key_bytes: &[u8]) -> Result<()> {
        if label.is_empty() {
            Err(Error::StoreWriteFailure(String::from("empty label")))?;
        }
        let key = (label.to_string(), *attributes.key_class());
        let entry = StoreEntry {
            label: label.to_string(),
            attributes,
            key_bytes: Zeroizing::new(Vec::from(key_bytes)),
        };
        self.entries.write().insert(key, entry);
        Ok(())
    }

    fn get(&self, label: &str) -> Result<Vec<StoreEntry>> {
        let entries = self.entries.read();
        let found = entries
            .values()
            .filter(|entry| entry.label() == label)
            .cloned()
            .collect::<Vec<_>>();
        if found.is_empty() {
            Err(Error::ItemDoesNotExist(label.to_string()))?;
        }
        Ok(found)
    }

    fn delete(&self, label: &str) -> Result<()> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry_label, _), _| entry_label != label);
        if entries.len() == before {
            Err(Error::ItemDoesNotExist(label.to_string()))?;
        }
        Ok(())
    }
}
