//! The crypto base wraps the algorithms the escrow protocol needs: P-384 keys
//! for signing and encryption, AES-256-GCM for sealing bottle contents, SHA-384
//! for hashing, and HKDF-SHA384 for turning a secret into purpose-bound keys.
//!
//! The idea here is that specific algorithms are wrapped in descriptive
//! interfaces that allow high-level use of the encapsulated cryptographic
//! algorithms without needing to know the details of those algorithms.
//!
//! For instance, you have a `SignKeypair` which has a standard interface, but
//! could describe any number of signing algorithms. Right now it describes
//! exactly one.

use rand::{rngs::OsRng, RngCore, SeedableRng};

mod crypto_key;
mod derive;
mod hash;
mod secret;
mod secret_key;
mod sign_key;

pub use crypto_key::*;
pub use derive::*;
pub use hash::*;
pub use secret::*;
pub use secret_key::*;
pub use sign_key::*;

/// A convenience function that returns a ChaCha20 CSRNG seeded with OS random bytes. Use this if
/// you want a nice, strong random number generator, you don't want to wire one up yourself, and
/// your platform provides good entropy.
///
/// This can be used as an input to any function here that accepts `&mut rng`. Otherwise, you can
/// bring your own RNG that implements [`RngCore`].
pub fn rng_chacha20() -> rand_chacha::ChaCha20Rng {
    let mut seed_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut seed_bytes);
    rand_chacha::ChaCha20Rng::from_seed(seed_bytes)
}
