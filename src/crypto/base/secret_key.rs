use crate::{
    error::{Error, Result},
    util::ser::{human_bytes, AsnBinary},
};
use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm, Nonce, Tag,
};
use rand::{CryptoRng, RngCore};
use rasn::{types::OctetString, AsnType, Decode, Encode};
use serde_derive::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Length of an AES-GCM IV.
pub const AES_GCM_IV_LEN: usize = 12;
/// Length of an AES-GCM authentication tag.
pub const AES_GCM_TAG_LEN: usize = 16;

/// A structure to help with the bundling of AAD (additional associated data) with our ciphertext.
#[derive(Debug, Clone, getset::Getters)]
#[getset(get = "pub")]
pub struct DataWithAAD<'msg> {
    data: &'msg [u8],
    aad: Option<Vec<u8>>,
}

impl<'msg> DataWithAAD<'msg> {
    /// Create a new data+AAD payload
    pub fn new(data: &'msg [u8], aad: Vec<u8>) -> Self {
        Self { data, aad: Some(aad) }
    }
}

impl<'msg> From<&'msg Vec<u8>> for DataWithAAD<'msg> {
    fn from(data: &'msg Vec<u8>) -> Self {
        Self {
            data: data.as_slice(),
            aad: None,
        }
    }
}

impl<'msg> From<&'msg [u8]> for DataWithAAD<'msg> {
    fn from(data: &'msg [u8]) -> Self {
        Self { data, aad: None }
    }
}

impl<'msg, const N: usize> From<&'msg [u8; N]> for DataWithAAD<'msg> {
    fn from(data: &'msg [u8; N]) -> Self {
        Self {
            data: data.as_slice(),
            aad: None,
        }
    }
}

/// An encrypted object that can be opened with the right key: the ciphertext,
/// its authentication tag, and the IV it was sealed with.
#[derive(
    Debug, Clone, PartialEq, AsnType, Encode, Decode, Serialize, Deserialize, getset::Getters, getset::MutGetters, getset::Setters,
)]
#[getset(get = "pub", get_mut = "pub(crate)", set = "pub(crate)")]
pub struct Sealed {
    /// The ciphertext
    #[rasn(tag(explicit(0)))]
    #[serde(with = "human_bytes")]
    ciphertext: OctetString,
    /// The GCM tag
    #[rasn(tag(explicit(1)))]
    #[serde(with = "human_bytes")]
    tag: OctetString,
    /// Our heroic IV
    #[rasn(tag(explicit(2)))]
    #[serde(with = "human_bytes")]
    iv: OctetString,
    /// Optional additional associated data to store with the ciphertext.
    #[rasn(tag(explicit(3)))]
    #[serde(default, skip_serializing_if = "Option::is_none", with = "human_bytes_opt")]
    aad: Option<OctetString>,
}

impl Sealed {
    fn new(ciphertext: Vec<u8>, tag: Vec<u8>, iv: Vec<u8>, aad: Option<Vec<u8>>) -> Self {
        Self {
            ciphertext: OctetString::from(ciphertext),
            tag: OctetString::from(tag),
            iv: OctetString::from(iv),
            aad: aad.map(OctetString::from),
        }
    }
}

impl AsnBinary for Sealed {}

mod human_bytes_opt {
    use rasn::types::OctetString;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(serde_derive::Deserialize)]
    struct Wrapper(#[serde(with = "super::human_bytes")] OctetString);

    pub fn serialize<S>(bytes: &Option<OctetString>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => super::human_bytes::serialize(bytes, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OctetString>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wrapped = Option::<Wrapper>::deserialize(deserializer)?;
        Ok(wrapped.map(|Wrapper(bytes)| bytes))
    }
}

/// A symmetric encryption key
#[derive(Clone, PartialEq, Eq)]
pub enum SecretKey {
    /// AES-256 in GCM mode
    Aes256Gcm(Zeroizing<[u8; 32]>),
}

impl SecretKey {
    /// Create a new random AES-256-GCM key
    pub fn new_aes256gcm<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self> {
        let mut randbuf = Zeroizing::new([0u8; 32]);
        rng.fill_bytes(randbuf.as_mut_slice());
        Ok(Self::Aes256Gcm(randbuf))
    }

    /// Create an AES-256-GCM key from existing key bytes. The bytes are copied
    /// straight into zeroizing storage.
    pub fn new_aes256gcm_from_slice(secret_bytes: &[u8]) -> Result<Self> {
        if secret_bytes.len() != 32 {
            Err(Error::BadLength)?;
        }
        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(secret_bytes);
        Ok(Self::Aes256Gcm(key))
    }

    /// Encrypt a value under a fresh random IV.
    pub fn seal<'msg, D: Into<DataWithAAD<'msg>>, R: RngCore + CryptoRng>(&self, rng: &mut R, data: D) -> Result<Sealed> {
        match self {
            SecretKey::Aes256Gcm(ref key) => {
                let mut iv = [0u8; AES_GCM_IV_LEN];
                rng.fill_bytes(&mut iv);
                let cipher = Aes256Gcm::new_from_slice(key.as_slice()).map_err(|_| Error::CryptoBadKey)?;
                let DataWithAAD { data, aad } = data.into();
                let mut buffer = Vec::from(data);
                let tag = cipher
                    .encrypt_in_place_detached(Nonce::from_slice(&iv), aad.as_deref().unwrap_or(&[]), buffer.as_mut_slice())
                    .map_err(|_| Error::CryptoSealFailed)?;
                Ok(Sealed::new(buffer, tag.to_vec(), iv.to_vec(), aad))
            }
        }
    }

    /// Decrypt a sealed value. Any failure (wrong key, tampered ciphertext,
    /// tag, IV, or AAD) is a [`Error::DecryptionFailure`].
    pub fn open(&self, sealed: &Sealed) -> Result<Zeroizing<Vec<u8>>> {
        match self {
            SecretKey::Aes256Gcm(ref key) => {
                if sealed.iv().len() != AES_GCM_IV_LEN || sealed.tag().len() != AES_GCM_TAG_LEN {
                    Err(Error::DecryptionFailure)?;
                }
                let cipher = Aes256Gcm::new_from_slice(key.as_slice()).map_err(|_| Error::CryptoBadKey)?;
                let aad: &[u8] = sealed.aad().as_deref().unwrap_or(&[]);
                let mut buffer = Zeroizing::new(sealed.ciphertext().to_vec());
                cipher
                    .decrypt_in_place_detached(
                        Nonce::from_slice(sealed.iv()),
                        aad,
                        buffer.as_mut_slice(),
                        Tag::from_slice(sealed.tag()),
                    )
                    .map_err(|_| Error::DecryptionFailure)?;
                Ok(buffer)
            }
        }
    }
}

impl AsRef<[u8]> for SecretKey {
    fn as_ref(&self) -> &[u8] {
        match self {
            Self::Aes256Gcm(ref key) => key.as_slice(),
        }
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aes256Gcm(_) => write!(f, "SecretKey::Aes256Gcm(<redacted>)"),
        }
    }
}
