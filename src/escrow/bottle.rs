//! Bottles: a peer's private keys sealed under escrow keys, plus enough public
//! information to check that whoever opens the bottle gets back exactly what
//! went in.
//!
//! A bottle travels as three blobs: the DER-encoded [`Bottle`], a signature
//! over those bytes by the escrow signing key, and a signature over the same
//! bytes by the peer's own signing key. [`SignedBottle`] bundles the three.
//! Signatures always cover the exact bytes that were encoded at seal time. We
//! never decode a bottle and re-encode it to check a signature.
//!
//! Opening runs its checks in a fixed order:
//!
//! 1. the escrow signing key derived from the caller's secret must be the one
//!    named in the bottle (otherwise the secret/salt are simply wrong)
//! 2. the bottle version must be one we understand
//! 3. the escrow signature must verify
//! 4. the contents must decrypt
//! 5. the decrypted private keys must match the public keys the bottle
//!    declares, and the peer ID must be built from the signing key
//! 6. the peer signature must verify under the recovered signing key
//!
//! Any failure ends the call. Nothing partially-verified is ever returned.

use crate::{
    crypto::base::{Sealed, Secret, SignKeypairPublic, SignKeypairSignature},
    error::{Error, KeyCheck, Result, SignatureCheck},
    escrow::keys::{escrow_label, EscrowKeys},
    identity::peer::{PeerID, PeerIdentity, PrivateKeyRecord},
    store::CredentialStore,
    util::{
        self,
        ser::{human_bytes, AsnBinary},
    },
};
use rand::{CryptoRng, RngCore};
use rasn::{types::OctetString, AsnType, Decode, Encode};
use serde_derive::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// The bottle format version we produce (and the only one we open).
pub const BOTTLE_VERSION: u8 = 1;

/// What gets encrypted inside a bottle: the peer's two private keys.
#[derive(Debug, Clone, AsnType, Encode, Decode, getset::Getters)]
#[getset(get = "pub")]
pub struct BottleContents {
    /// The peer's private signing key
    #[rasn(tag(explicit(0)))]
    peer_signing_private: PrivateKeyRecord,
    /// The peer's private encryption key
    #[rasn(tag(explicit(1)))]
    peer_encryption_private: PrivateKeyRecord,
}

impl BottleContents {
    fn from_peer(peer: &PeerIdentity) -> Self {
        Self {
            peer_signing_private: PrivateKeyRecord::from_sign_keypair(peer.signing_key()),
            peer_encryption_private: PrivateKeyRecord::from_crypto_keypair(peer.encryption_key()),
        }
    }
}

impl AsnBinary for BottleContents {}

/// A sealed bottle. Immutable once made: its signatures travel next to it, not
/// inside it.
#[derive(Debug, Clone, PartialEq, AsnType, Encode, Decode, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct Bottle {
    /// Format version
    #[rasn(tag(explicit(0)))]
    version: u8,
    /// The bottled peer's ID
    #[rasn(tag(explicit(1)))]
    peer_id: String,
    /// A random UUID naming this particular bottle
    #[rasn(tag(explicit(2)))]
    bottle_id: String,
    /// SPKI of the escrow signing key
    #[rasn(tag(explicit(3)))]
    #[serde(with = "human_bytes")]
    escrow_signing_spki: OctetString,
    /// SPKI of the escrow encryption key
    #[rasn(tag(explicit(4)))]
    #[serde(with = "human_bytes")]
    escrow_encryption_spki: OctetString,
    /// SPKI of the peer's signing key
    #[rasn(tag(explicit(5)))]
    #[serde(with = "human_bytes")]
    peer_signing_spki: OctetString,
    /// SPKI of the peer's encryption key
    #[rasn(tag(explicit(6)))]
    #[serde(with = "human_bytes")]
    peer_encryption_spki: OctetString,
    /// The [`BottleContents`], sealed under the escrow symmetric key
    #[rasn(tag(explicit(7)))]
    encrypted_contents: Sealed,
}

impl AsnBinary for Bottle {}

impl Bottle {
    /// Seal a peer's identity into a bottle with an existing set of escrow
    /// keys. Returns the encoded bottle with both of its signatures.
    pub fn seal<R: RngCore + CryptoRng>(rng: &mut R, peer: &PeerIdentity, escrow_keys: &EscrowKeys) -> Result<SignedBottle> {
        let plaintext = Zeroizing::new(BottleContents::from_peer(peer).serialize_binary()?);
        let encrypted_contents = escrow_keys.symmetric_key().seal(rng, plaintext.as_slice())?;
        let bottle = Self {
            version: BOTTLE_VERSION,
            peer_id: peer.peer_id().as_str().to_string(),
            bottle_id: util::random_uuid(rng),
            escrow_signing_spki: OctetString::from(escrow_keys.signing_spki()?),
            escrow_encryption_spki: OctetString::from(escrow_keys.encryption_spki()?),
            peer_signing_spki: OctetString::from(peer.signing_key().spki()?),
            peer_encryption_spki: OctetString::from(peer.encryption_key().spki()?),
            encrypted_contents,
        };
        let contents = bottle.serialize_binary()?;
        let signature_by_escrow = escrow_keys.signing_key().sign(&contents)?;
        let signature_by_peer = peer.signing_key().sign(&contents)?;
        debug!(peer_id = %bottle.peer_id, bottle_id = %bottle.bottle_id, "bottle sealed");
        Ok(SignedBottle::new(contents, signature_by_escrow, signature_by_peer))
    }

    /// Derive escrow keys from a secret/salt and seal the peer with them. The
    /// escrow keys aren't stored anywhere.
    pub fn seal_with_secret<R: RngCore + CryptoRng>(rng: &mut R, peer: &PeerIdentity, secret: &Secret, bottle_salt: &str) -> Result<SignedBottle> {
        let escrow_keys = EscrowKeys::derive(secret, bottle_salt)?;
        Self::seal(rng, peer, &escrow_keys)
    }

    /// Derive escrow keys from a secret/salt, file them in the credential
    /// store, and seal the peer with them.
    pub fn create<S: CredentialStore, R: RngCore + CryptoRng>(
        rng: &mut R,
        store: &S,
        peer: &PeerIdentity,
        secret: &Secret,
        bottle_salt: &str,
    ) -> Result<SignedBottle> {
        let escrow_keys = EscrowKeys::create(store, secret, bottle_salt)?;
        Self::seal(rng, peer, &escrow_keys)
    }

    /// Open a bottle using escrow keys re-derived from the secret and salt.
    /// Re-deriving is the identity check: no store lookup happens.
    pub fn open(
        bottle_bytes: &[u8],
        secret: &Secret,
        bottle_salt: &str,
        signature_by_escrow: &SignKeypairSignature,
        signature_by_peer: &SignKeypairSignature,
    ) -> Result<PeerIdentity> {
        let escrow_keys = EscrowKeys::derive(secret, bottle_salt)?;
        Self::open_with_keys(bottle_bytes, &escrow_keys, signature_by_escrow, signature_by_peer)
    }

    /// Open a bottle using escrow keys pulled from the credential store.
    pub fn open_with_store<S: CredentialStore>(
        store: &S,
        label: &str,
        bottle_bytes: &[u8],
        signature_by_escrow: &SignKeypairSignature,
        signature_by_peer: &SignKeypairSignature,
    ) -> Result<PeerIdentity> {
        let escrow_keys = EscrowKeys::lookup(store, label)?;
        Self::open_with_keys(bottle_bytes, &escrow_keys, signature_by_escrow, signature_by_peer)
    }

    /// Open a bottle with a known set of escrow keys.
    pub fn open_with_keys(
        bottle_bytes: &[u8],
        escrow_keys: &EscrowKeys,
        signature_by_escrow: &SignKeypairSignature,
        signature_by_peer: &SignKeypairSignature,
    ) -> Result<PeerIdentity> {
        let bottle = Self::deserialize_binary(bottle_bytes).map_err(|e| {
            warn!("bottle failed to decode");
            e
        })?;

        // cheap check first: is this even our bottle?
        if !escrow_keys.signing_key().public().matches_spki(&bottle.escrow_signing_spki) {
            warn!(bottle_id = %bottle.bottle_id, "escrow signing key does not match bottle");
            Err(Error::EntropyKeyMismatch)?;
        }
        if bottle.version != BOTTLE_VERSION {
            warn!(bottle_id = %bottle.bottle_id, version = bottle.version, "unsupported bottle version");
            Err(Error::UnsupportedVersion(bottle.version))?;
        }

        if !escrow_keys.signing_key().verify(signature_by_escrow, bottle_bytes) {
            warn!(bottle_id = %bottle.bottle_id, "escrow signature failed to verify");
            Err(Error::SignatureInvalid(SignatureCheck::Escrow))?;
        }

        let plaintext = escrow_keys.symmetric_key().open(&bottle.encrypted_contents).map_err(|_| {
            warn!(bottle_id = %bottle.bottle_id, "bottle contents failed to decrypt");
            Error::DecryptionFailure
        })?;
        if plaintext.is_empty() {
            warn!(bottle_id = %bottle.bottle_id, "bottle contents are empty");
            Err(Error::DecryptionFailure)?;
        }
        let contents = BottleContents::deserialize_binary(&plaintext).map_err(|e| {
            warn!(bottle_id = %bottle.bottle_id, "bottle contents failed to decode");
            e
        })?;

        let signing_key = contents.peer_signing_private().to_sign_keypair().map_err(|e| {
            warn!(bottle_id = %bottle.bottle_id, "bottled signing key is unreadable");
            e
        })?;
        if !signing_key.public().matches_spki(&bottle.peer_signing_spki) {
            warn!(bottle_id = %bottle.bottle_id, "bottled signing key does not match its public key");
            Err(Error::KeyMismatch(KeyCheck::Signing))?;
        }
        let encryption_key = contents.peer_encryption_private().to_crypto_keypair().map_err(|e| {
            warn!(bottle_id = %bottle.bottle_id, "bottled encryption key is unreadable");
            e
        })?;
        if !encryption_key.public().matches_spki(&bottle.peer_encryption_spki) {
            warn!(bottle_id = %bottle.bottle_id, "bottled encryption key does not match its public key");
            Err(Error::KeyMismatch(KeyCheck::Encryption))?;
        }
        let peer_id = PeerID::from(bottle.peer_id.clone());
        if !peer_id.is_derived_from(&signing_key.public())? {
            warn!(bottle_id = %bottle.bottle_id, "peer ID does not match the bottled signing key");
            Err(Error::KeyMismatch(KeyCheck::Signing))?;
        }

        if !signing_key.verify(signature_by_peer, bottle_bytes) {
            warn!(bottle_id = %bottle.bottle_id, "peer signature failed to verify");
            Err(Error::SignatureInvalid(SignatureCheck::Peer))?;
        }

        debug!(peer_id = %bottle.peer_id, bottle_id = %bottle.bottle_id, "bottle opened");
        Ok(PeerIdentity::from_parts(peer_id, signing_key, encryption_key))
    }

    /// The credential store label of the escrow keys that sealed this bottle.
    pub fn escrow_label(&self) -> Result<String> {
        escrow_label(&SignKeypairPublic::from_spki(&self.escrow_signing_spki)?)
    }

    /// Dump this bottle as YAML.
    #[cfg(feature = "yaml-export")]
    pub fn serialize_human(&self) -> Result<String> {
        crate::util::ser::serialize_human(self)
    }

    /// Read a bottle from YAML. Don't verify signatures against a bottle you
    /// re-encoded from this: keep the original bytes.
    #[cfg(feature = "yaml-export")]
    pub fn deserialize_human(bytes: &[u8]) -> Result<Self> {
        crate::util::ser::deserialize_human(bytes)
    }
}

/// An encoded bottle and the two signatures over it: everything needed to
/// store or ship a bottle as one unit.
#[derive(Debug, Clone, PartialEq, AsnType, Encode, Decode, Serialize, Deserialize)]
pub struct SignedBottle {
    /// The DER-encoded [`Bottle`]
    #[rasn(tag(explicit(0)))]
    #[serde(with = "human_bytes")]
    contents: OctetString,
    /// Escrow signature over `contents`
    #[rasn(tag(explicit(1)))]
    #[serde(with = "human_bytes")]
    signature_by_escrow: OctetString,
    /// Peer signature over `contents`
    #[rasn(tag(explicit(2)))]
    #[serde(with = "human_bytes")]
    signature_by_peer: OctetString,
}

impl AsnBinary for SignedBottle {}

impl SignedBottle {
    /// Bundle an encoded bottle with its signatures.
    pub fn new(contents: Vec<u8>, signature_by_escrow: SignKeypairSignature, signature_by_peer: SignKeypairSignature) -> Self {
        Self {
            contents: OctetString::from(contents),
            signature_by_escrow: OctetString::from(signature_by_escrow.as_ref().to_vec()),
            signature_by_peer: OctetString::from(signature_by_peer.as_ref().to_vec()),
        }
    }

    /// The encoded bottle bytes (exactly what was signed).
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// The escrow key's signature
    pub fn signature_by_escrow(&self) -> SignKeypairSignature {
        SignKeypairSignature::from_p384_bytes(&self.signature_by_escrow)
    }

    /// The peer's signature
    pub fn signature_by_peer(&self) -> SignKeypairSignature {
        SignKeypairSignature::from_p384_bytes(&self.signature_by_peer)
    }

    /// Decode the bottle (without checking anything).
    pub fn bottle(&self) -> Result<Bottle> {
        Bottle::deserialize_binary(&self.contents)
    }

    /// Open this bottle. See [`Bottle::open`].
    pub fn open(&self, secret: &Secret, bottle_salt: &str) -> Result<PeerIdentity> {
        Bottle::open(&self.contents, secret, bottle_salt, &self.signature_by_escrow(), &self.signature_by_peer())
    }

    /// Open this bottle with keys from the credential store. See
    /// [`Bottle::open_with_store`].
    pub fn open_with_store<S: CredentialStore>(&self, store: &S, label: &str) -> Result<PeerIdentity> {
        Bottle::open_with_store(store, label, &self.contents, &self.signature_by_escrow(), &self.signature_by_peer())
    }
}
