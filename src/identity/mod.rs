//! Identities are what escrow protects: a signing keypair, an encryption
//! keypair, and the peer ID that names them.
//!
//! Plain [peer identities](peer::PeerIdentity) get bottled. [Recovery
//! identities](recovery::RecoveryIdentity) skip the bottle entirely and are
//! derived straight from a secret, then checked against a published record.
//! [Inheritance keys](inheritance::InheritanceKey) are recovery identities
//! whose secret is itself wrapped up for later delivery.

pub mod inheritance;
pub mod peer;
pub mod recovery;

pub use inheritance::*;
pub use peer::*;
pub use recovery::*;
