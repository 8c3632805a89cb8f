use crate::{
    crypto::base::{CryptoKeypair, Secret, SignKeypair},
    identity::peer::PeerIdentity,
};
use rand::SeedableRng;

/// A deterministic RNG so test failures can be reproduced.
pub(crate) fn rng() -> rand_chacha::ChaCha20Rng {
    rng_seeded(b"hi im jerry")
}

/// A deterministic RNG built from whatever seed phrase you like.
pub(crate) fn rng_seeded(seed: &[u8]) -> rand_chacha::ChaCha20Rng {
    let mut seed_bytes = [0u8; 32];
    for (i, b) in seed.iter().take(32).enumerate() {
        seed_bytes[i] = *b;
    }
    rand_chacha::ChaCha20Rng::from_seed(seed_bytes)
}

/// A brand new peer with random keys.
pub(crate) fn setup_peer() -> PeerIdentity {
    let mut rng = rng_seeded(b"a peer of the realm");
    let sign = SignKeypair::new_p384(&mut rng).unwrap();
    let crypto = CryptoKeypair::new_p384(&mut rng).unwrap();
    PeerIdentity::new(sign, crypto).unwrap()
}

/// A 32-byte escrow secret, like the ones callers generate.
pub(crate) fn setup_secret() -> Secret {
    let mut rng = rng_seeded(b"my secret secret");
    Secret::generate_master(&mut rng)
}
