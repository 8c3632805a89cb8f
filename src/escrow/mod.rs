//! Escrow is how a peer's identity survives losing the device it lives on.
//!
//! A master secret (random bytes the caller keeps somewhere safe) and a bottle
//! salt derive a set of [escrow keys](keys::EscrowKeys). Those keys seal the
//! peer's private keys into a [bottle](bottle::Bottle), signed once by the
//! escrow signing key and once by the peer itself. Later, the same secret and
//! salt re-derive the escrow keys and open the bottle, checking every
//! signature and key along the way before handing back the peer identity.

pub mod bottle;
pub mod keys;

pub use bottle::*;
pub use keys::*;
