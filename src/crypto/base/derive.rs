//! Deterministic key derivation.
//!
//! A secret and a salt go into HKDF-SHA384 along with a per-purpose info
//! string, so the same secret/salt pair gives unrelated keys for each purpose.
//! Symmetric purposes use the HKDF output directly. Elliptic-curve purposes
//! get 56 bytes of output which seed [`keygen_p384`], so the resulting key pair
//! is a pure function of `(secret, salt, purpose)`.
//!
//! # Deterministic keygen, version 1
//!
//! Every implementation has to agree on this bit-for-bit or bottles won't open
//! across platforms, so here it is in full:
//!
//! 1. `seed` must be exactly 56 bytes.
//! 2. Key a ChaCha20 keystream (64-bit counter starting at zero, stream zero)
//!    with `SHA-256(seed)`.
//! 3. Read the keystream 48 bytes at a time. Interpret each chunk as a
//!    big-endian integer; the first one in `[1, n)` (n = P-384 group order)
//!    is the private scalar.
//! 4. Give up after 64 chunks. Hitting this is astronomically unlikely.

use crate::{
    crypto::base::{CryptoKeypair, SecretKey, SignKeypair},
    error::{Error, Result},
};
use hkdf::Hkdf;
use rand::{RngCore, SeedableRng};
use sha2::{Digest, Sha256, Sha384};
use zeroize::Zeroizing;

/// Version tag for the deterministic keygen described in the module docs.
pub const KEYGEN_VERSION: u8 = 1;

/// How many bytes of HKDF output seed an elliptic-curve key.
pub const EC_SEED_LEN: usize = 56;

/// How many bytes of HKDF output make a symmetric key.
pub const SYMMETRIC_KEY_LEN: usize = 32;

const P384_SCALAR_LEN: usize = 48;
const MAX_KEYGEN_ATTEMPTS: usize = 64;

/// What a derived key is for. Each purpose has its own HKDF info string so
/// that keys for different purposes never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// The escrow key that signs bottles.
    EscrowSigning,
    /// The escrow encryption key pair.
    EscrowEncryption,
    /// The escrow key that encrypts bottle contents.
    EscrowSymmetric,
    /// A recovery identity's signing key.
    RecoverySigning,
    /// A recovery identity's encryption key.
    RecoveryEncryption,
}

impl Purpose {
    /// The HKDF info string for this purpose.
    pub fn info(&self) -> &'static [u8] {
        match self {
            Self::EscrowSigning => b"Escrow Signing Private Key",
            Self::EscrowEncryption => b"Escrow Encryption Private Key",
            Self::EscrowSymmetric => b"Escrow Symmetric Key",
            Self::RecoverySigning => b"Recovery Signing Private Key",
            Self::RecoveryEncryption => b"Recovery Encryption Private Key",
        }
    }

    /// How many bytes we pull out of HKDF for this purpose.
    pub fn output_len(&self) -> usize {
        match self {
            Self::EscrowSymmetric => SYMMETRIC_KEY_LEN,
            _ => EC_SEED_LEN,
        }
    }

    /// Whether this purpose produces an elliptic-curve key pair.
    pub fn is_ec(&self) -> bool {
        !matches!(self, Self::EscrowSymmetric)
    }
}

/// Run HKDF-SHA384 over the secret/salt for the given purpose.
pub fn derive_bytes(secret: &[u8], salt: &[u8], purpose: Purpose) -> Result<Zeroizing<Vec<u8>>> {
    let hkdf = Hkdf::<Sha384>::new(Some(salt), secret);
    let mut output = Zeroizing::new(vec![0u8; purpose.output_len()]);
    hkdf.expand(purpose.info(), output.as_mut_slice())
        .map_err(|_| Error::DerivationFailure("hkdf expand"))?;
    Ok(output)
}

/// Deterministically turn a 56-byte seed into a P-384 private key. See the
/// module docs for the exact algorithm.
pub fn keygen_p384(seed: &[u8]) -> Result<p384::SecretKey> {
    if seed.len() != EC_SEED_LEN {
        Err(Error::DerivationFailure("keygen seed length"))?;
    }
    let mut rng_seed = Zeroizing::new([0u8; 32]);
    rng_seed.copy_from_slice(Sha256::digest(seed).as_slice());
    let mut rng = rand_chacha::ChaCha20Rng::from_seed(*rng_seed);
    sample_p384_scalar(&mut rng)
}

/// Pull 48-byte candidates from `rng` until one is a valid P-384 scalar.
fn sample_p384_scalar<R: RngCore>(rng: &mut R) -> Result<p384::SecretKey> {
    let mut candidate = Zeroizing::new([0u8; P384_SCALAR_LEN]);
    for _ in 0..MAX_KEYGEN_ATTEMPTS {
        rng.fill_bytes(candidate.as_mut_slice());
        // from_bytes rejects zero and anything >= n
        if let Ok(secret) = p384::SecretKey::from_bytes(p384::FieldBytes::from_slice(candidate.as_slice())) {
            return Ok(secret);
        }
    }
    Err(Error::DerivationFailure("keygen exhausted"))
}

/// Derive a P-384 signing keypair for an EC purpose.
pub fn derive_sign_keypair(secret: &[u8], salt: &[u8], purpose: Purpose) -> Result<SignKeypair> {
    if !purpose.is_ec() {
        Err(Error::DerivationFailure("purpose does not produce a key pair"))?;
    }
    let seed = derive_bytes(secret, salt, purpose)?;
    Ok(SignKeypair::from_p384(keygen_p384(&seed)?))
}

/// Derive a P-384 encryption keypair for an EC purpose.
pub fn derive_crypto_keypair(secret: &[u8], salt: &[u8], purpose: Purpose) -> Result<CryptoKeypair> {
    if !purpose.is_ec() {
        Err(Error::DerivationFailure("purpose does not produce a key pair"))?;
    }
    let seed = derive_bytes(secret, salt, purpose)?;
    Ok(CryptoKeypair::from_p384(keygen_p384(&seed)?))
}

/// Derive an AES-256-GCM key. Only [`Purpose::EscrowSymmetric`] makes sense
/// here.
pub fn derive_secret_key(secret: &[u8], salt: &[u8], purpose: Purpose) -> Result<SecretKey> {
    if purpose.is_ec() {
        Err(Error::DerivationFailure("purpose does not produce a symmetric key"))?;
    }
    let bytes = derive_bytes(secret, salt, purpose)?;
    SecretKey::new_aes256gcm_from_slice(bytes.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Purpose; 5] = [
        Purpose::EscrowSigning,
        Purpose::EscrowEncryption,
        Purpose::EscrowSymmetric,
        Purpose::RecoverySigning,
        Purpose::RecoveryEncryption,
    ];

    #[test]
    fn derive_is_deterministic() {
        for purpose in ALL {
            let out1 = derive_bytes(b"ZONING IS COMMUNISM", b"test-salt", purpose).unwrap();
            let out2 = derive_bytes(b"ZONING IS COMMUNISM", b"test-salt", purpose).unwrap();
            assert_eq!(out1, out2);
            assert_eq!(out1.len(), purpose.output_len());
        }
    }

    #[test]
    fn derive_separates_purposes() {
        for a in ALL {
            for b in ALL {
                if a == b {
                    continue;
                }
                let out_a = derive_bytes(b"same secret", b"same salt", a).unwrap();
                let out_b = derive_bytes(b"same secret", b"same salt", b).unwrap();
                assert!(out_a[0..32] != out_b[0..32], "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn derive_separates_salts() {
        let out1 = derive_bytes(b"same secret", b"test-salt", Purpose::EscrowSymmetric).unwrap();
        let out2 = derive_bytes(b"same secret", b"test-salt2", Purpose::EscrowSymmetric).unwrap();
        assert!(out1 != out2);
    }

    #[test]
    fn derive_known_vector() {
        let out = derive_bytes(&[7u8; 32], b"test-salt", Purpose::EscrowSymmetric).unwrap();
        assert_eq!(
            out.as_slice(),
            &[153, 207, 7, 187, 237, 171, 255, 161, 100, 226, 10, 187, 131, 0, 238, 179, 41, 54, 252, 64, 169, 169, 15, 154, 151, 33, 150, 59, 41, 47, 218, 101]
        );
    }

    #[test]
    fn keygen_known_vector() {
        let seed: Vec<u8> = (0u8..56).collect();
        let secret = keygen_p384(&seed).unwrap();
        assert_eq!(
            secret.to_bytes().as_slice(),
            &[64, 11, 62, 82, 250, 220, 153, 107, 50, 212, 31, 17, 188, 141, 69, 83, 151, 117, 101, 8, 159, 129, 150, 114, 110, 240, 134, 222, 228, 97, 19, 131, 177, 167, 47, 15, 73, 210, 193, 122, 108, 7, 174, 226, 192, 1, 156, 216]
        );
    }

    #[test]
    fn keygen_is_deterministic() {
        let seed = derive_bytes(b"get a job", b"test-salt", Purpose::EscrowSigning).unwrap();
        let key1 = keygen_p384(&seed).unwrap();
        let key2 = keygen_p384(&seed).unwrap();
        assert_eq!(key1.to_bytes(), key2.to_bytes());
        assert_eq!(key1.public_key(), key2.public_key());

        let mut seed2 = seed.clone();
        seed2[55] ^= 1;
        let key3 = keygen_p384(&seed2).unwrap();
        assert!(key1.public_key() != key3.public_key());
    }

    #[test]
    fn keygen_wants_56_bytes() {
        assert_eq!(keygen_p384(&[1u8; 55]).err(), Some(Error::DerivationFailure("keygen seed length")));
        assert_eq!(keygen_p384(&[1u8; 57]).err(), Some(Error::DerivationFailure("keygen seed length")));
    }

    /// Hands out a fixed byte script, then 0xFF forever after.
    struct ScriptedRng {
        script: Vec<u8>,
        pos: usize,
        drawn: usize,
    }

    impl ScriptedRng {
        fn new(script: Vec<u8>) -> Self {
            Self { script, pos: 0, drawn: 0 }
        }
    }

    impl RngCore for ScriptedRng {
        fn next_u32(&mut self) -> u32 {
            let mut buf = [0u8; 4];
            self.fill_bytes(&mut buf);
            u32::from_le_bytes(buf)
        }

        fn next_u64(&mut self) -> u64 {
            let mut buf = [0u8; 8];
            self.fill_bytes(&mut buf);
            u64::from_le_bytes(buf)
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for byte in dest.iter_mut() {
                *byte = self.script.get(self.pos).copied().unwrap_or(0xff);
                self.pos += 1;
            }
            self.drawn += 1;
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    #[test]
    fn keygen_skips_out_of_range_candidates() {
        // all-ones is >= n, zero is not a scalar, then 1 is fine
        let mut script = vec![0xffu8; P384_SCALAR_LEN];
        script.extend_from_slice(&[0u8; P384_SCALAR_LEN]);
        let mut one = [0u8; P384_SCALAR_LEN];
        one[P384_SCALAR_LEN - 1] = 1;
        script.extend_from_slice(&one);
        let mut rng = ScriptedRng::new(script);
        let secret = sample_p384_scalar(&mut rng).unwrap();
        assert_eq!(secret.to_bytes().as_slice(), &one);
        assert_eq!(rng.drawn, 3);
    }

    #[test]
    fn keygen_gives_up_after_max_attempts() {
        let mut rng = ScriptedRng::new(vec![]);
        assert_eq!(sample_p384_scalar(&mut rng).err(), Some(Error::DerivationFailure("keygen exhausted")));
        assert_eq!(rng.drawn, MAX_KEYGEN_ATTEMPTS);

        // a good candidate one past the cap is never looked at
        let mut script = vec![0xffu8; P384_SCALAR_LEN * MAX_KEYGEN_ATTEMPTS];
        script.extend_from_slice(&[0x01u8; P384_SCALAR_LEN]);
        let mut rng = ScriptedRng::new(script);
        assert_eq!(sample_p384_scalar(&mut rng).err(), Some(Error::DerivationFailure("keygen exhausted")));

        // but the last allowed one is
        let mut script = vec![0xffu8; P384_SCALAR_LEN * (MAX_KEYGEN_ATTEMPTS - 1)];
        script.extend_from_slice(&[0x01u8; P384_SCALAR_LEN]);
        let mut rng = ScriptedRng::new(script);
        assert_eq!(sample_p384_scalar(&mut rng).unwrap().to_bytes().as_slice(), &[0x01u8; P384_SCALAR_LEN]);
    }

    #[test]
    fn derived_keypairs_match() {
        let sign1 = derive_sign_keypair(b"get a job", b"test-salt", Purpose::EscrowSigning).unwrap();
        let sign2 = derive_sign_keypair(b"get a job", b"test-salt", Purpose::EscrowSigning).unwrap();
        assert_eq!(sign1.spki().unwrap(), sign2.spki().unwrap());
        let crypto = derive_crypto_keypair(b"get a job", b"test-salt", Purpose::EscrowSigning).unwrap();
        // same seed, same scalar, whatever we call it
        assert_eq!(sign1.spki().unwrap(), crypto.spki().unwrap());
        let crypto2 = derive_crypto_keypair(b"get a job", b"test-salt", Purpose::EscrowEncryption).unwrap();
        assert!(crypto.spki().unwrap() != crypto2.spki().unwrap());
    }

    #[test]
    fn derive_rejects_mismatched_purpose() {
        assert!(matches!(
            derive_sign_keypair(b"s", b"s", Purpose::EscrowSymmetric),
            Err(Error::DerivationFailure(_))
        ));
        assert!(matches!(
            derive_crypto_keypair(b"s", b"s", Purpose::EscrowSymmetric),
            Err(Error::DerivationFailure(_))
        ));
        assert!(matches!(
            derive_secret_key(b"s", b"s", Purpose::RecoverySigning),
            Err(Error::DerivationFailure(_))
        ));
    }
}
