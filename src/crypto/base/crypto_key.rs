use crate::{
    crypto::base::P384_SECRET_LEN,
    error::{Error, Result},
    util::ct_eq,
};
use p384::pkcs8::{DecodePublicKey, EncodePublicKey};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

/// An asymmetric encryption keypair. Peers publish the public half so others
/// can encrypt to them; the bottle carries the private half.
#[derive(Clone)]
pub enum CryptoKeypair {
    /// P-384 (secp384r1) encryption keypair
    P384 {
        public: p384::PublicKey,
        secret: p384::SecretKey,
    },
}

impl CryptoKeypair {
    pub(crate) fn from_p384(secret: p384::SecretKey) -> Self {
        Self::P384 {
            public: secret.public_key(),
            secret,
        }
    }

    /// Create a new random P-384 keypair
    pub fn new_p384<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self> {
        Ok(Self::from_p384(p384::SecretKey::random(rng)))
    }

    /// Rebuild a P-384 keypair from the raw 48-byte private scalar.
    pub fn new_p384_from_bytes(secret_bytes: &[u8]) -> Result<Self> {
        if secret_bytes.len() != P384_SECRET_LEN {
            Err(Error::BadLength)?;
        }
        let secret = p384::SecretKey::from_bytes(p384::FieldBytes::from_slice(secret_bytes)).map_err(|_| Error::CryptoBadKey)?;
        Ok(Self::from_p384(secret))
    }

    /// The raw private scalar.
    pub fn secret_bytes(&self) -> Zeroizing<Vec<u8>> {
        match self {
            Self::P384 { secret, .. } => Zeroizing::new(secret.to_bytes().to_vec()),
        }
    }

    /// Grab the public half of this keypair.
    pub fn public(&self) -> CryptoKeypairPublic {
        match self {
            Self::P384 { public, .. } => CryptoKeypairPublic::P384(*public),
        }
    }

    /// The SubjectPublicKeyInfo (DER) encoding of our public key.
    pub fn spki(&self) -> Result<Vec<u8>> {
        self.public().spki()
    }
}

impl std::fmt::Debug for CryptoKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::P384 { public, .. } => f.debug_struct("CryptoKeypair::P384").field("public", public).finish_non_exhaustive(),
        }
    }
}

impl PartialEq for CryptoKeypair {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::P384 { public: public1, .. }, Self::P384 { public: public2, .. }) => public1 == public2,
        }
    }
}

/// An asymmetric encryption public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoKeypairPublic {
    /// P-384 encryption public key
    P384(p384::PublicKey),
}

impl CryptoKeypairPublic {
    /// Parse a public key out of its SubjectPublicKeyInfo (DER) encoding.
    pub fn from_spki(spki: &[u8]) -> Result<Self> {
        let public = p384::PublicKey::from_public_key_der(spki).map_err(|_| Error::CryptoBadKey)?;
        Ok(Self::P384(public))
    }

    /// The SubjectPublicKeyInfo (DER) encoding of this key.
    pub fn spki(&self) -> Result<Vec<u8>> {
        match self {
            Self::P384(public) => {
                let doc = public.to_public_key_der().map_err(|_| Error::CryptoBadKey)?;
                Ok(doc.as_bytes().to_vec())
            }
        }
    }

    /// Returns true if our SPKI matches the given one exactly.
    pub fn matches_spki(&self, spki: &[u8]) -> bool {
        match self.spki() {
            Ok(ours) => ct_eq(&ours, spki),
            Err(_) => false,
        }
    }
}
