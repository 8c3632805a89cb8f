//! A peer identity is a signing keypair, an encryption keypair, and the peer ID
//! that names them. The peer ID is derived from the signing key so it survives
//! any number of bottles being made (and opened) for the same peer.

use crate::{
    crypto::base::{CryptoKeypair, SignKeypair, SignKeypairPublic},
    error::{Error, Result},
    identity::recovery::{CUSTODIAN_RECOVERY_KEY_PREFIX, INHERITANCE_KEY_PREFIX, RECOVERY_KEY_PREFIX},
};
use rand::{CryptoRng, RngCore};
use rasn::{types::OctetString, AsnType, Decode, Encode};

/// Prefix for plain peer IDs.
pub const PEER_ID_PREFIX: &str = "SHA384:";

/// Every prefix a peer ID we made could start with.
pub const KNOWN_PEER_ID_PREFIXES: [&str; 4] = [
    PEER_ID_PREFIX,
    RECOVERY_KEY_PREFIX,
    CUSTODIAN_RECOVERY_KEY_PREFIX,
    INHERITANCE_KEY_PREFIX,
];

/// Names a peer: `<prefix>` followed by the base64 SHA-384 of the peer's
/// signing public key SPKI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerID(String);

impl PeerID {
    /// Build a peer ID from a signing public key and a prefix.
    pub fn from_signing_public(prefix: &str, public: &SignKeypairPublic) -> Result<Self> {
        Ok(Self(format!("{}{}", prefix, public.spki_hash()?)))
    }

    /// True if this ID is exactly one of the known prefixes followed by the
    /// hash of `public`. Anything else in front of the hash is a mismatch.
    pub fn is_derived_from(&self, public: &SignKeypairPublic) -> Result<bool> {
        let hash = format!("{}", public.spki_hash()?);
        Ok(KNOWN_PEER_ID_PREFIXES
            .iter()
            .any(|prefix| self.0.len() == prefix.len() + hash.len() && self.0.starts_with(prefix) && self.0.ends_with(&hash)))
    }

    /// Grab the peer ID as a string
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for PeerID {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for PeerID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A peer's full identity, private keys included.
#[derive(Debug, Clone, PartialEq, getset::Getters)]
#[getset(get = "pub")]
pub struct PeerIdentity {
    /// The peer's ID
    peer_id: PeerID,
    /// The peer's signing keypair
    signing_key: SignKeypair,
    /// The peer's encryption keypair
    encryption_key: CryptoKeypair,
}

impl PeerIdentity {
    /// Create a peer identity from its keys, using the plain peer ID prefix.
    pub fn new(signing_key: SignKeypair, encryption_key: CryptoKeypair) -> Result<Self> {
        Self::new_with_prefix(PEER_ID_PREFIX, signing_key, encryption_key)
    }

    /// Create a peer identity from its keys with a specific peer ID prefix.
    pub fn new_with_prefix(prefix: &str, signing_key: SignKeypair, encryption_key: CryptoKeypair) -> Result<Self> {
        let peer_id = PeerID::from_signing_public(prefix, &signing_key.public())?;
        Ok(Self {
            peer_id,
            signing_key,
            encryption_key,
        })
    }

    /// Reassemble a peer whose keys have already been checked against its ID.
    pub(crate) fn from_parts(peer_id: PeerID, signing_key: SignKeypair, encryption_key: CryptoKeypair) -> Self {
        Self {
            peer_id,
            signing_key,
            encryption_key,
        }
    }

    /// Generate a new peer with random keys.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self> {
        let signing_key = SignKeypair::new_p384(rng)?;
        let encryption_key = CryptoKeypair::new_p384(rng)?;
        Self::new(signing_key, encryption_key)
    }
}

/// The key algorithms a [`PrivateKeyRecord`] can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// A NIST P-384 private scalar
    EcNistP384 = 1,
}

impl TryFrom<u8> for KeyType {
    type Error = Error;

    fn try_from(val: u8) -> std::result::Result<Self, Self::Error> {
        match val {
            1 => Ok(Self::EcNistP384),
            _ => Err(Error::UnsupportedKeyKind),
        }
    }
}

/// A private key on the wire: which algorithm, plus the raw key.
#[derive(Clone, PartialEq, AsnType, Encode, Decode)]
pub struct PrivateKeyRecord {
    /// A [`KeyType`] discriminant. Kept as a raw integer so unknown types
    /// decode fine and get rejected with a useful error.
    #[rasn(tag(explicit(0)))]
    key_type: u8,
    /// The raw private key bytes
    #[rasn(tag(explicit(1)))]
    key_data: OctetString,
}

impl PrivateKeyRecord {
    /// Which algorithm this record holds.
    pub fn key_type(&self) -> Result<KeyType> {
        KeyType::try_from(self.key_type)
    }

    /// Wrap up a signing keypair's private key.
    pub fn from_sign_keypair(keypair: &SignKeypair) -> Self {
        match keypair {
            SignKeypair::P384 { .. } => Self {
                key_type: KeyType::EcNistP384 as u8,
                key_data: OctetString::from(keypair.secret_bytes().to_vec()),
            },
        }
    }

    /// Wrap up an encryption keypair's private key.
    pub fn from_crypto_keypair(keypair: &CryptoKeypair) -> Self {
        match keypair {
            CryptoKeypair::P384 { .. } => Self {
                key_type: KeyType::EcNistP384 as u8,
                key_data: OctetString::from(keypair.secret_bytes().to_vec()),
            },
        }
    }

    /// Rebuild a signing keypair (public half included) from this record.
    pub fn to_sign_keypair(&self) -> Result<SignKeypair> {
        match self.key_type()? {
            KeyType::EcNistP384 => SignKeypair::new_p384_from_bytes(&self.key_data),
        }
    }

    /// Rebuild an encryption keypair (public half included) from this record.
    pub fn to_crypto_keypair(&self) -> Result<CryptoKeypair> {
        match self.key_type()? {
            KeyType::EcNistP384 => CryptoKeypair::new_p384_from_bytes(&self.key_data),
        }
    }

    #[cfg(test)]
    pub(crate) fn new_raw(key_type: u8, key_data: Vec<u8>) -> Self {
        Self {
            key_type,
            key_data: OctetString::from(key_data),
        }
    }
}

impl std::fmt::Debug for PrivateKeyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKeyRecord").field("key_type", &self.key_type).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ser;

    #[test]
    fn peer_id_is_hash_of_spki() {
        let peer = crate::util::test::setup_peer();
        let spki = peer.signing_key().spki().unwrap();
        let hash = crate::crypto::base::Hash::new_sha384(&spki).unwrap();
        assert_eq!(peer.peer_id().as_str(), format!("SHA384:{}", hash));
        assert_eq!(format!("{}", peer.peer_id()), peer.peer_id().as_str());
    }

    #[test]
    fn peer_id_prefix() {
        let mut rng = crate::util::test::rng();
        let sign = SignKeypair::new_p384(&mut rng).unwrap();
        let crypto = CryptoKeypair::new_p384(&mut rng).unwrap();
        let peer1 = PeerIdentity::new(sign.clone(), crypto.clone()).unwrap();
        let peer2 = PeerIdentity::new_with_prefix("RK-", sign, crypto).unwrap();
        assert!(peer2.peer_id().as_str().starts_with("RK-"));
        assert_eq!(&peer1.peer_id().as_str()[7..], &peer2.peer_id().as_str()[3..]);
    }

    #[test]
    fn peer_id_derived_from() {
        let mut rng = crate::util::test::rng();
        let sign = SignKeypair::new_p384(&mut rng).unwrap();
        let public = sign.public();
        for prefix in KNOWN_PEER_ID_PREFIXES {
            assert!(PeerID::from_signing_public(prefix, &public).unwrap().is_derived_from(&public).unwrap());
        }
        let hash = format!("{}", public.spki_hash().unwrap());
        assert!(!PeerID::from(format!("totally-not-a-prefix:{}", hash)).is_derived_from(&public).unwrap());
        assert!(!PeerID::from(format!("xSHA384:{}", hash)).is_derived_from(&public).unwrap());
        assert!(!PeerID::from(hash.clone()).is_derived_from(&public).unwrap());
        assert!(!PeerID::from(format!("SHA384:{}x", hash)).is_derived_from(&public).unwrap());

        let other = SignKeypair::new_p384(&mut rng).unwrap().public();
        assert!(!PeerID::from_signing_public(PEER_ID_PREFIX, &public).unwrap().is_derived_from(&other).unwrap());
    }

    #[test]
    fn private_key_record_rebuilds_keys() {
        let peer = crate::util::test::setup_peer();
        let sign_rec = PrivateKeyRecord::from_sign_keypair(peer.signing_key());
        let crypto_rec = PrivateKeyRecord::from_crypto_keypair(peer.encryption_key());
        assert_eq!(sign_rec.key_type(), Ok(KeyType::EcNistP384));

        let bytes = ser::serialize(&sign_rec).unwrap();
        let sign_rec2: PrivateKeyRecord = ser::deserialize(&bytes).unwrap();
        let sign = sign_rec2.to_sign_keypair().unwrap();
        assert_eq!(&sign, peer.signing_key());
        assert_eq!(sign.secret_bytes(), peer.signing_key().secret_bytes());

        let crypto = crypto_rec.to_crypto_keypair().unwrap();
        assert_eq!(&crypto, peer.encryption_key());
    }

    #[test]
    fn private_key_record_unknown_type() {
        let rec = PrivateKeyRecord::new_raw(2, vec![1u8; 48]);
        assert_eq!(rec.key_type().err(), Some(Error::UnsupportedKeyKind));
        assert_eq!(rec.to_sign_keypair().err(), Some(Error::UnsupportedKeyKind));
        assert_eq!(rec.to_crypto_keypair().err(), Some(Error::UnsupportedKeyKind));
    }

    #[test]
    fn private_key_record_bad_data() {
        let rec = PrivateKeyRecord::new_raw(1, vec![1u8; 12]);
        assert_eq!(rec.to_sign_keypair().err(), Some(Error::BadLength));
    }
}
