//! The escrow key set: a signing keypair, an encryption keypair, and a
//! symmetric key, all derived from one `(secret, salt)` pair.
//!
//! Keys are filed in the credential store under a label computed from the
//! signing key itself (base64 of the SHA-384 of its SPKI), so a given
//! secret/salt always lands on the same label and no caller ever has to pick
//! one.

use crate::{
    crypto::base::{
        derive_crypto_keypair, derive_secret_key, derive_sign_keypair, CryptoKeypair, Purpose, Secret, SecretKey, SignKeypair,
        SignKeypairPublic,
    },
    error::{Error, KeyCheck, Result},
    store::{CredentialStore, KeyClass, StoreAttributes},
};
use tracing::{debug, warn};

/// The application tag we write on every escrow entry in the credential store.
pub const ESCROW_APPLICATION_TAG: &str = "escrow";

/// Compute the credential store label for an escrow signing public key.
pub fn escrow_label(signing_public: &SignKeypairPublic) -> Result<String> {
    Ok(format!("{}", signing_public.spki_hash()?))
}

/// The three keys that seal and open a bottle.
#[derive(Debug, Clone, getset::Getters)]
#[getset(get = "pub")]
pub struct EscrowKeys {
    /// Signs bottles.
    signing_key: SignKeypair,
    /// Escrow encryption keypair. Its public half is published in the bottle.
    encryption_key: CryptoKeypair,
    /// Encrypts bottle contents.
    symmetric_key: SecretKey,
    /// Where these keys live in the credential store.
    label: String,
}

impl EscrowKeys {
    fn from_parts(signing_key: SignKeypair, encryption_key: CryptoKeypair, symmetric_key: SecretKey) -> Result<Self> {
        let label = escrow_label(&signing_key.public())?;
        Ok(Self {
            signing_key,
            encryption_key,
            symmetric_key,
            label,
        })
    }

    /// Derive the escrow keys for a secret and bottle salt without touching
    /// any store. Same inputs, same keys, every time.
    pub fn derive(secret: &Secret, bottle_salt: &str) -> Result<Self> {
        let secret_bytes = secret.expose_secret();
        let salt = bottle_salt.as_bytes();
        let signing_key = derive_sign_keypair(secret_bytes, salt, Purpose::EscrowSigning)?;
        let encryption_key = derive_crypto_keypair(secret_bytes, salt, Purpose::EscrowEncryption)?;
        let symmetric_key = derive_secret_key(secret_bytes, salt, Purpose::EscrowSymmetric)?;
        Self::from_parts(signing_key, encryption_key, symmetric_key)
    }

    /// Derive the escrow keys and file all three in the credential store,
    /// overwriting whatever was under the same label.
    pub fn create<S: CredentialStore>(store: &S, secret: &Secret, bottle_salt: &str) -> Result<Self> {
        let keys = Self::derive(secret, bottle_salt)?;
        keys.save(store)?;
        Ok(keys)
    }

    /// Write our keys into the credential store under our label.
    pub fn save<S: CredentialStore>(&self, store: &S) -> Result<()> {
        store.put(
            &self.label,
            StoreAttributes::new(KeyClass::Signing, ESCROW_APPLICATION_TAG),
            &self.signing_key.secret_bytes(),
        )?;
        store.put(
            &self.label,
            StoreAttributes::new(KeyClass::Encryption, ESCROW_APPLICATION_TAG),
            &self.encryption_key.secret_bytes(),
        )?;
        store.put(
            &self.label,
            StoreAttributes::new(KeyClass::Symmetric, ESCROW_APPLICATION_TAG),
            self.symmetric_key.as_ref(),
        )?;
        debug!(label = %self.label, "escrow keys stored");
        Ok(())
    }

    /// Pull a full set of escrow keys out of the credential store. All three
    /// must be present, and the signing key must actually hash to `label`.
    pub fn lookup<S: CredentialStore>(store: &S, label: &str) -> Result<Self> {
        let signing_entry = store.get_class(label, KeyClass::Signing)?;
        let encryption_entry = store.get_class(label, KeyClass::Encryption)?;
        let symmetric_entry = store.get_class(label, KeyClass::Symmetric)?;

        let signing_key = SignKeypair::new_p384_from_bytes(signing_entry.key_bytes())?;
        let encryption_key = CryptoKeypair::new_p384_from_bytes(encryption_entry.key_bytes())?;
        let symmetric_key = SecretKey::new_aes256gcm_from_slice(symmetric_entry.key_bytes())?;

        let keys = Self::from_parts(signing_key, encryption_key, symmetric_key)?;
        if keys.label != label {
            warn!(label = %label, "stored escrow signing key does not match its label");
            Err(Error::KeyMismatch(KeyCheck::Signing))?;
        }
        debug!(label = %label, "escrow keys found");
        Ok(keys)
    }

    /// The SPKI of our signing key, as published in bottles.
    pub fn signing_spki(&self) -> Result<Vec<u8>> {
        self.signing_key.spki()
    }

    /// The SPKI of our encryption key, as published in bottles.
    pub fn encryption_spki(&self) -> Result<Vec<u8>> {
        self.encryption_key.spki()
    }
}
