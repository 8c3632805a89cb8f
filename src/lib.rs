//! Bottle core: escrow and recovery of peer identities.
//!
//! A peer identity is a pair of P-384 keys (one for signing, one for
//! encryption) and a peer ID derived from the signing key. This crate lets a
//! peer survive the loss of the device holding those keys in two ways:
//!
//! - **Bottling.** A master secret and a salt derive a set of escrow keys. The
//!   escrow keys encrypt the peer's private keys into a bottle, which is then
//!   signed by both the escrow key and the peer. Whoever later holds the same
//!   secret and salt can re-derive the escrow keys, check every signature and
//!   key, and get the peer identity back. See [`escrow`].
//! - **Recovery identities.** A recovery string and a salt derive a keypair
//!   directly. Its public half is published as a record, and re-deriving it
//!   later is only trusted if it matches that record exactly. See
//!   [`identity::recovery`].
//!
//! Everything is synchronous and deterministic given its inputs (RNGs are
//! always passed in). Key storage is abstracted behind
//! [`store::CredentialStore`]; the crate ships only an in-memory store.
//!
//! The crate logs through [`tracing`] but never installs a subscriber, and
//! never logs secret material.

pub mod crypto;
pub mod error;
pub mod escrow;
pub mod identity;
pub mod store;
pub(crate) mod util;
