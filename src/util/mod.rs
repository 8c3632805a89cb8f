//! Utilities. OBVIOUSLY.

pub(crate) mod ser;
#[cfg(test)]
pub(crate) mod test;

use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;

/// Make a random (v4) UUID string from the given RNG.
pub(crate) fn random_uuid<R: RngCore + CryptoRng>(rng: &mut R) -> String {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
}

/// Compare two byte strings without short-circuiting on the first differing
/// byte. Lengths are not secret, so a length mismatch returns early.
pub(crate) fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ct_eq_compares() {
        assert!(ct_eq(b"", b""));
        assert!(ct_eq(b"get a job", b"get a job"));
        assert!(!ct_eq(b"get a job", b"get a jop"));
        assert!(!ct_eq(b"get a job", b"get a jobs"));
    }

    #[test]
    fn random_uuid_is_v4() {
        let mut rng = crate::util::test::rng();
        let id = random_uuid(&mut rng);
        let parsed = uuid::Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
        assert!(id != random_uuid(&mut rng));
    }
}
