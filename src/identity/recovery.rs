//! Recovery identities are the simpler sibling of bottles: a signing and
//! encryption keypair derived straight from a secret and a salt, with no
//! encryption step in between. The derived keypair *is* the recoverable
//! identity.
//!
//! The public half of a recovery identity gets published as a
//! [`RecoveryRecord`]. Later on, whoever holds the secret can re-derive the
//! keys and [bind][RecoveryIdentity::bind] them to that record, which only
//! succeeds if every published key matches exactly. This is what lets a
//! custodian or an heir reconstitute a key purely from a recovery string
//! without blindly trusting whatever the derivation spits out.

use crate::{
    crypto::base::{derive_crypto_keypair, derive_sign_keypair, Purpose, Secret},
    error::{Error, Result},
    identity::peer::{PeerID, PeerIdentity},
    util::{
        self,
        ser::{human_bytes, AsnBinary},
    },
};
use rand::{CryptoRng, RngCore};
use rasn::{types::OctetString, AsnType, Decode, Encode};
use serde_derive::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Peer ID prefix for plain recovery keys
pub const RECOVERY_KEY_PREFIX: &str = "RK-";
/// Peer ID prefix for custodian recovery keys
pub const CUSTODIAN_RECOVERY_KEY_PREFIX: &str = "CRK-";
/// Peer ID prefix for inheritance keys
pub const INHERITANCE_KEY_PREFIX: &str = "IK-";

/// What a recovery identity is for. Each kind gets its own peer ID prefix, so
/// the same secret and salt used for two kinds still yields two distinct IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsnType, Encode, Decode, Serialize, Deserialize)]
#[rasn(choice)]
pub enum RecoveryKind {
    /// A recovery key the identity owner holds on to themselves
    #[rasn(tag(explicit(0)))]
    RecoveryKey,
    /// A recovery key held by a trusted custodian
    #[rasn(tag(explicit(1)))]
    CustodianRecoveryKey,
    /// A key handed down to an heir
    #[rasn(tag(explicit(2)))]
    InheritanceKey,
}

impl RecoveryKind {
    /// The peer ID prefix for this kind of key.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::RecoveryKey => RECOVERY_KEY_PREFIX,
            Self::CustodianRecoveryKey => CUSTODIAN_RECOVERY_KEY_PREFIX,
            Self::InheritanceKey => INHERITANCE_KEY_PREFIX,
        }
    }
}

/// The public face of a recovery identity: enough to check a re-derived
/// identity against later, and nothing private.
#[derive(Debug, Clone, PartialEq, AsnType, Encode, Decode, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct RecoveryRecord {
    /// Names this record
    #[rasn(tag(explicit(0)))]
    uuid: String,
    /// The recovery identity's peer ID
    #[rasn(tag(explicit(1)))]
    peer_id: String,
    /// SPKI of the signing key
    #[rasn(tag(explicit(2)))]
    #[serde(with = "human_bytes")]
    signing_spki: OctetString,
    /// SPKI of the encryption key
    #[rasn(tag(explicit(3)))]
    #[serde(with = "human_bytes")]
    encryption_spki: OctetString,
    /// What kind of recovery key this is
    #[rasn(tag(explicit(4)))]
    kind: RecoveryKind,
}

impl AsnBinary for RecoveryRecord {}

impl RecoveryRecord {
    /// Dump this record as YAML.
    #[cfg(feature = "yaml-export")]
    pub fn serialize_human(&self) -> Result<String> {
        crate::util::ser::serialize_human(self)
    }

    /// Read a record from YAML.
    #[cfg(feature = "yaml-export")]
    pub fn deserialize_human(bytes: &[u8]) -> Result<Self> {
        crate::util::ser::deserialize_human(bytes)
    }
}

/// A recovery identity: a peer identity derived from a secret, plus what kind
/// of recovery key it is.
#[derive(Debug, Clone, PartialEq, getset::Getters)]
#[getset(get = "pub")]
pub struct RecoveryIdentity {
    /// What kind of key we are
    kind: RecoveryKind,
    /// Our derived keys and peer ID
    identity: PeerIdentity,
}

impl RecoveryIdentity {
    /// Derive a recovery identity from a secret and salt. Same inputs, same
    /// identity, every time.
    pub fn derive(secret: &Secret, salt: &str, kind: RecoveryKind) -> Result<Self> {
        let secret_bytes = secret.expose_secret();
        let signing_key = derive_sign_keypair(secret_bytes, salt.as_bytes(), Purpose::RecoverySigning)?;
        let encryption_key = derive_crypto_keypair(secret_bytes, salt.as_bytes(), Purpose::RecoveryEncryption)?;
        let identity = PeerIdentity::new_with_prefix(kind.prefix(), signing_key, encryption_key)?;
        debug!(peer_id = %identity.peer_id(), "recovery identity derived");
        Ok(Self { kind, identity })
    }

    /// Our peer ID
    pub fn peer_id(&self) -> &PeerID {
        self.identity.peer_id()
    }

    /// Create a public record for this identity under a fresh UUID.
    pub fn publish<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<RecoveryRecord> {
        self.publish_with_uuid(util::random_uuid(rng))
    }

    /// Create a public record for this identity under a given UUID.
    pub fn publish_with_uuid(&self, uuid: String) -> Result<RecoveryRecord> {
        Ok(RecoveryRecord {
            uuid,
            peer_id: self.identity.peer_id().as_str().to_string(),
            signing_spki: OctetString::from(self.identity.signing_key().spki()?),
            encryption_spki: OctetString::from(self.identity.encryption_key().spki()?),
            kind: self.kind,
        })
    }

    /// Re-derive a recovery identity from a secret and salt and make sure it
    /// is the one `existing` describes: same peer ID, same signing key, same
    /// encryption key. Any difference means the secret or salt is wrong.
    pub fn bind(existing: &RecoveryRecord, secret: &Secret, salt: &str) -> Result<Self> {
        let derived = Self::derive(secret, salt, existing.kind)?;
        if derived.identity.peer_id().as_str() != existing.peer_id {
            warn!(uuid = %existing.uuid, "re-derived peer ID does not match recovery record");
            Err(Error::EntropyKeyMismatch)?;
        }
        if !derived.identity.signing_key().public().matches_spki(&existing.signing_spki) {
            warn!(uuid = %existing.uuid, "re-derived signing key does not match recovery record");
            Err(Error::EntropyKeyMismatch)?;
        }
        if !derived.identity.encryption_key().public().matches_spki(&existing.encryption_spki) {
            warn!(uuid = %existing.uuid, "re-derived encryption key does not match recovery record");
            Err(Error::EntropyKeyMismatch)?;
        }
        debug!(uuid = %existing.uuid, peer_id = %derived.peer_id(), "recovery identity bound");
        Ok(derived)
    }

    /// Give up the recovery wrapper and keep the peer identity.
    pub fn into_identity(self) -> PeerIdentity {
        self.identity
    }
}
