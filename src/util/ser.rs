//! Helpful serialization tools.
//!
//! Everything that gets signed is DER (via rasn) so that the bytes a signature
//! covers are exactly the bytes that travel. We encode once, sign those bytes,
//! and never re-encode a decoded value to check a signature against it.
//!
//! Public records can also be dumped as YAML (with the `yaml-export` feature)
//! for humans to look at, in which case binary fields show up as base64.

use crate::error::Result;
use base64::{engine::general_purpose::STANDARD, Engine};
use rasn::{Decode, Encode};

pub(crate) fn serialize<T: Encode>(obj: &T) -> Result<Vec<u8>> {
    Ok(rasn::der::encode(obj)?)
}

pub(crate) fn deserialize<T: Decode>(bytes: &[u8]) -> Result<T> {
    Ok(rasn::der::decode(bytes)?)
}

#[cfg(feature = "yaml-export")]
pub(crate) fn serialize_human<T: serde::Serialize>(obj: &T) -> Result<String> {
    Ok(serde_yaml::to_string(obj)?)
}

#[cfg(feature = "yaml-export")]
pub(crate) fn deserialize_human<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_yaml::from_slice(bytes)?)
}

/// Convert bytes to (standard, padded) base64
pub fn base64_encode<T: AsRef<[u8]>>(bytes: T) -> String {
    STANDARD.encode(bytes.as_ref())
}

/// Convert (standard, padded) base64 to bytes
pub fn base64_decode<T: AsRef<[u8]>>(bytes: T) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(bytes.as_ref())?)
}

/// A default implementation for (de)serializing an object to or from its
/// canonical binary (DER) format.
pub trait AsnBinary: Encode + Decode {
    /// Serialize this object
    fn serialize_binary(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    /// Deserialize this object
    fn deserialize_binary(slice: &[u8]) -> Result<Self> {
        deserialize(slice)
    }
}

/// Lets serde write `OctetString` fields as base64 strings.
pub(crate) mod human_bytes {
    use super::{base64_decode, base64_encode};
    use rasn::types::OctetString;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &OctetString, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&base64_encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OctetString, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = <String>::deserialize(deserializer)?;
        let vec = base64_decode(s).map_err(de::Error::custom)?;
        Ok(OctetString::from(vec))
    }
}
