//! The crypto module contains all of our cryptographic primitives for key
//! derivation, key generation, signing, hashing, and encrypting private data.

pub mod base;
