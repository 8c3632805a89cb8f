use crate::{
    error::{Error, Result},
    util::ser,
};
use sha2::{Digest, Sha384};

/// A cryptographic hash. By defining this as an enum, we allow expansion of
/// hash algorithms in the future.
///
/// When stringified, the hash is plain standard base64 of the digest bytes,
/// which is the format escrow labels and peer IDs are built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Hash {
    /// SHA-384
    Sha384([u8; 48]),
}

impl Hash {
    /// Create a new SHA-384 hash from a message
    pub fn new_sha384(message: &[u8]) -> Result<Self> {
        let genarr = Sha384::digest(message);
        let arr: [u8; 48] = genarr.as_slice().try_into().map_err(|_| Error::BadLength)?;
        Ok(Self::Sha384(arr))
    }

    /// Return the byte slice representing this hash.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Sha384(arr) => &arr[..],
        }
    }
}

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", ser::base64_encode(self.as_bytes()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[test]
    fn hash_sha384_known() {
        let hash = Hash::new_sha384(b"abc").unwrap();
        assert_eq!(
            format!("{}", hash),
            "ywB1P0WjXou1oD1pmsZQBycsMqsO3tFjGotgWkP/W+2AhgcroefMI1i67KE0yCWn"
        );
        assert_eq!(hash.as_bytes().len(), 48);
        assert_eq!(&hash.as_bytes()[0..4], &[0xcb, 0x00, 0x75, 0x3f]);
    }

    #[test]
    fn hash_sha384_differs() {
        let hash1 = Hash::new_sha384(b"that kook dropped in on me").unwrap();
        let hash2 = Hash::new_sha384(b"that kook dropped in on me.").unwrap();
        assert!(hash1 != hash2);
        assert_eq!(hash1, Hash::new_sha384(b"that kook dropped in on me").unwrap());
    }
}
