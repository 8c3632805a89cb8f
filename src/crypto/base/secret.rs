use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

/// How many random bytes go into a fresh escrow master secret.
pub const MASTER_SECRET_LEN: usize = 32;

// Crockford-style: no I/L/O/U, so 0 and 1 read back unambiguously over the phone
const RECOVERY_ALPHABET: &[u8; 32] = b"ABCDEFGHJKMNPQRSTVWXYZ0123456789";
const RECOVERY_BLOCKS: usize = 7;
const RECOVERY_BLOCK_LEN: usize = 4;

/// Secret input to key derivation: either a random escrow master secret or the
/// UTF-8 bytes of a recovery phrase. Zeroed on drop and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Zeroizing<Vec<u8>>);

impl Secret {
    /// Wrap some secret bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Use a recovery phrase as a secret.
    pub fn from_phrase(phrase: &str) -> Self {
        Self::new(Vec::from(phrase.as_bytes()))
    }

    /// Generate a fresh escrow master secret.
    pub fn generate_master<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = vec![0u8; MASTER_SECRET_LEN];
        rng.fill_bytes(bytes.as_mut_slice());
        Self::new(bytes)
    }

    /// Grab the secret bytes. Try not to hold onto them.
    pub fn expose_secret(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret(<{} bytes>)", self.0.len())
    }
}

/// A human-facing recovery secret, something like
/// `XK4D-9P2M-...`, seven blocks of four.
#[derive(Clone, PartialEq, Eq)]
pub struct RecoverySecret(Zeroizing<String>);

impl RecoverySecret {
    /// Generate a new random recovery secret. Each character carries five
    /// bits, so this is 140 bits of entropy.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut out = Zeroizing::new(String::with_capacity(RECOVERY_BLOCKS * (RECOVERY_BLOCK_LEN + 1)));
        let mut randbuf = Zeroizing::new([0u8; RECOVERY_BLOCKS * RECOVERY_BLOCK_LEN]);
        rng.fill_bytes(randbuf.as_mut_slice());
        for (i, byte) in randbuf.iter().enumerate() {
            if i > 0 && i % RECOVERY_BLOCK_LEN == 0 {
                out.push('-');
            }
            out.push(RECOVERY_ALPHABET[(*byte & 0x1f) as usize] as char);
        }
        Self(out)
    }

    /// Wrap an existing recovery string (say, one a user typed in).
    pub fn from_string(secret: String) -> Self {
        Self(Zeroizing::new(secret))
    }

    /// Grab the recovery string.
    pub fn expose_secret(&self) -> &str {
        self.0.as_str()
    }

    /// Turn this into the bytes we feed to key derivation.
    pub fn to_secret(&self) -> Secret {
        Secret::from_phrase(self.expose_secret())
    }
}

impl std::fmt::Debug for RecoverySecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecoverySecret(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_secret_is_random() {
        let mut rng = crate::util::test::rng();
        let secret1 = Secret::generate_master(&mut rng);
        let secret2 = Secret::generate_master(&mut rng);
        assert_eq!(secret1.expose_secret().len(), MASTER_SECRET_LEN);
        assert!(secret1 != secret2);
        assert_eq!(format!("{:?}", secret1), "Secret(<32 bytes>)");
    }

    #[test]
    fn recovery_secret_format() {
        let mut rng = crate::util::test::rng();
        let secret = RecoverySecret::generate(&mut rng);
        let blocks = secret.expose_secret().split('-').collect::<Vec<_>>();
        assert_eq!(blocks.len(), RECOVERY_BLOCKS);
        for block in blocks {
            assert_eq!(block.len(), RECOVERY_BLOCK_LEN);
            assert!(block.bytes().all(|b| RECOVERY_ALPHABET.contains(&b)));
        }
        assert_eq!(secret.to_secret().expose_secret(), secret.expose_secret().as_bytes());
        assert!(secret != RecoverySecret::generate(&mut rng));
        assert_eq!(format!("{:?}", secret), "RecoverySecret(<redacted>)");
    }

    #[test]
    fn recovery_alphabet_skips_lookalikes() {
        for b in b"ILOU" {
            assert!(!RECOVERY_ALPHABET.contains(b));
        }
        assert!(RECOVERY_ALPHABET.contains(&b'0'));
        assert!(RECOVERY_ALPHABET.contains(&b'1'));
        let mut sorted = RECOVERY_ALPHABET.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 32);
    }
}
