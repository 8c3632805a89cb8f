use crate::{
    crypto::base::Hash,
    error::{Error, Result},
    util::ct_eq,
};
use p384::{
    ecdsa::{
        signature::{Signer, Verifier},
        Signature, SigningKey, VerifyingKey,
    },
    pkcs8::{DecodePublicKey, EncodePublicKey},
};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

/// Length of a raw P-384 private scalar.
pub const P384_SECRET_LEN: usize = 48;

/// A signature derived from a signing keypair: ECDSA over SHA-384 of the
/// message, in X9.62 (DER) format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignKeypairSignature {
    P384(Vec<u8>),
}

impl SignKeypairSignature {
    /// Wrap signature bytes that arrived alongside a bottle.
    pub fn from_p384_bytes(bytes: &[u8]) -> Self {
        Self::P384(Vec::from(bytes))
    }
}

impl AsRef<[u8]> for SignKeypairSignature {
    fn as_ref(&self) -> &[u8] {
        match self {
            Self::P384(sig) => sig.as_slice(),
        }
    }
}

/// An asymmetric signing keypair.
///
/// The private half zeroes itself on drop.
#[derive(Clone)]
pub enum SignKeypair {
    /// P-384 (secp384r1) signing keypair
    P384 {
        public: p384::PublicKey,
        secret: p384::SecretKey,
    },
}

impl SignKeypair {
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

    /// Sign a value. The message is hashed with SHA-384 before signing.
    pub fn sign(&self, data: &[u8]) -> Result<SignKeypairSignature> {
        match self {
            Self::P384 { secret, .. } => {
                let signing_key = SigningKey::from(secret);
                let sig: Signature = signing_key.try_sign(data).map_err(|_| Error::CryptoSignatureFailed)?;
                Ok(SignKeypairSignature::P384(sig.to_der().as_bytes().to_vec()))
            }
        }
    }

    /// Verify a value with a detached signature.
    pub fn verify(&self, signature: &SignKeypairSignature, data: &[u8]) -> bool {
        self.public().verify(signature, data)
    }

    /// Grab the public half of this keypair.
    pub fn public(&self) -> SignKeypairPublic {
        match self {
            Self::P384 { public, .. } => SignKeypairPublic::P384(*public),
        }
    }

    /// The SubjectPublicKeyInfo (DER) encoding of our public key.
    pub fn spki(&self) -> Result<Vec<u8>> {
        self.public().spki()
    }
}

impl std::fmt::Debug for SignKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::P384 { public, .. } => f.debug_struct("SignKeypair::P384").field("public", public).finish_non_exhaustive(),
        }
    }
}

impl PartialEq for SignKeypair {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::P384 { public: public1, .. }, Self::P384 { public: public2, .. }) => public1 == public2,
        }
    }
}

/// An asymmetric signing public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignKeypairPublic {
    /// P-384 signing public key
    P384(p384::PublicKey),
}

impl SignKeypairPublic {
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

    /// SHA-384 over our SPKI. Labels and peer IDs are built from this.
    pub fn spki_hash(&self) -> Result<Hash> {
        Hash::new_sha384(&self.spki()?)
    }

    /// Verify a value with a detached signature given the public key of the
    /// signer. Anything that doesn't parse as a signature doesn't verify.
    pub fn verify(&self, signature: &SignKeypairSignature, data: &[u8]) -> bool {
        match (self, signature) {
            (Self::P384(public), SignKeypairSignature::P384(sig_bytes)) => {
                let sig = match Signature::from_der(sig_bytes) {
                    Ok(sig) => sig,
                    Err(_) => return false,
                };
                VerifyingKey::from(public).verify(data, &sig).is_ok()
            }
        }
    }
}
