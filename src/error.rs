//! The main error enum for the project lives here, and documents the various
//! conditions that can arise while deriving keys, sealing bottles, and opening
//! them again.

use thiserror::Error;

/// Names the signature that failed to verify while opening a bottle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    /// The signature made by the escrow signing key.
    Escrow,
    /// The signature made by the bottled peer's own signing key.
    Peer,
}

/// Names the key that didn't match its declared public half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCheck {
    /// The peer's signing key
    Signing,
    /// The peer's encryption key
    Encryption,
}

/// This is our error enum. It contains an entry for any part of the system in
/// which an expectation is not met or a problem occurs.
///
/// None of these variants carry secret material: they name the check that
/// failed and nothing more.
#[derive(Error, Debug)]
pub enum Error {
    /// A byte slice was the wrong length for the object being built.
    #[error("bad length")]
    BadLength,

    /// Bad key.
    #[error("key is invalid")]
    CryptoBadKey,

    /// Failed to seal a value with a symmetric key.
    #[error("failed to seal an object")]
    CryptoSealFailed,

    /// Failed to produce a signature
    #[error("failed to create a signature")]
    CryptoSignatureFailed,

    /// Encrypted contents could not be opened (bad key, bad tag, or empty
    /// plaintext).
    #[error("decryption failed")]
    DecryptionFailure,

    /// A KDF or key generation primitive failed. These are fatal and never
    /// retried.
    #[error("key derivation failed: {0}")]
    DerivationFailure(&'static str),

    /// An error while engaging in deserialization.
    #[error("deserialization error: {0}")]
    Deserialize(rasn::error::DecodeError),

    /// An error while engaging in deserialization.
    #[error("deserialization error")]
    DeserializeBase64(#[from] base64::DecodeError),

    /// The credential store refused an upsert because the entry already
    /// exists and the store does not overwrite.
    #[error("duplicate item in credential store")]
    DuplicateUpsert,

    /// The secret/salt given do not correspond to the record being opened or
    /// bound.
    #[error("the given secret does not match this record")]
    EntropyKeyMismatch,

    /// The credential store has nothing under the given label (or is missing
    /// one of the key classes we need).
    #[error("item does not exist: {0}")]
    ItemDoesNotExist(String),

    /// Decrypted key material does not match the public keys declared on the
    /// bottle. Always treated as tampering.
    #[error("decrypted {0:?} key does not match the declared public key")]
    KeyMismatch(KeyCheck),

    /// An error while engaging in serialization.
    #[error("serialization error: {0}")]
    Serialize(rasn::error::EncodeError),

    /// An error while engaging in yaml serialization.
    #[cfg(feature = "yaml-export")]
    #[error("yaml serialization error")]
    SerializeYaml(#[from] serde_yaml::Error),

    /// A signature failed to verify.
    #[error("the {0:?} signature does not verify")]
    SignatureInvalid(SignatureCheck),

    /// The credential store failed to write an entry.
    #[error("credential store write failed: {0}")]
    StoreWriteFailure(String),

    /// A private key record names an algorithm we don't speak.
    #[error("unsupported key kind")]
    UnsupportedKeyKind,

    /// A bottle was produced by a version of the protocol we don't speak.
    #[error("unsupported bottle version {0}")]
    UnsupportedVersion(u8),
}

// rasn's codec errors don't implement `std::error::Error`, so thiserror's
// `#[from]` can't be used for them.
impl From<rasn::error::DecodeError> for Error {
    fn from(err: rasn::error::DecodeError) -> Self {
        Error::Deserialize(err)
    }
}

impl From<rasn::error::EncodeError> for Error {
    fn from(err: rasn::error::EncodeError) -> Self {
        Error::Serialize(err)
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        // the codec errors aren't eq-able, so compare what we'd print
        format!("{:?}", self) == format!("{:?}", other)
    }
}

/// Wraps `std::result::Result` around our `Error` enum
pub type Result<T> = std::result::Result<T, Error>;
