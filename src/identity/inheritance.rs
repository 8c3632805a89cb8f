//! Inheritance keys let an identity owner hand a recovery key to an heir
//! without the heir being able to use it early.
//!
//! Creating one generates a fresh recovery string, derives an
//! [`InheritanceKey`][RecoveryKind::InheritanceKey] recovery identity from it,
//! and then seals the recovery string under a random wrapping key. The heir
//! gets the wrapping key and a claim token. The wrapped secret stays with
//! whoever is holding it in trust until the claim is honored. Nobody holding
//! only one half can derive the key.

use crate::{
    crypto::base::{DataWithAAD, RecoverySecret, Sealed, SecretKey},
    error::{Error, Result},
    identity::recovery::{RecoveryIdentity, RecoveryKind, RecoveryRecord},
    util::ct_eq,
};
use rand::{CryptoRng, RngCore};
use rasn::types::OctetString;
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Length of the random claim token handed to an heir.
pub const CLAIM_TOKEN_LEN: usize = 32;

/// A freshly-made inheritance key and everything that needs handing out.
#[derive(getset::Getters)]
#[getset(get = "pub")]
pub struct InheritanceKey {
    /// The public record of the derived recovery identity
    record: RecoveryRecord,
    /// The recovery string, sealed under `wrapping_key` with the record UUID
    /// as AAD
    wrapped_secret: Sealed,
    /// Opens `wrapped_secret`
    wrapping_key: SecretKey,
    /// A random token the heir presents to claim the wrapped secret
    claim_token: Zeroizing<Vec<u8>>,
    /// The recovery identity itself
    identity: RecoveryIdentity,
}

impl std::fmt::Debug for InheritanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InheritanceKey")
            .field("record", &self.record)
            .field("wrapping_key", &self.wrapping_key)
            .field("claim_token", &"<redacted>")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl InheritanceKey {
    /// Create a new inheritance key under the given salt.
    pub fn create<R: RngCore + CryptoRng>(rng: &mut R, salt: &str) -> Result<Self> {
        let recovery_secret = RecoverySecret::generate(rng);
        let identity = RecoveryIdentity::derive(&recovery_secret.to_secret(), salt, RecoveryKind::InheritanceKey)?;
        let record = identity.publish(rng)?;
        let wrapping_key = SecretKey::new_aes256gcm(rng)?;
        let wrapped_secret = wrapping_key.seal(
            rng,
            DataWithAAD::new(recovery_secret.expose_secret().as_bytes(), record.uuid().as_bytes().to_vec()),
        )?;
        let mut claim_token = Zeroizing::new(vec![0u8; CLAIM_TOKEN_LEN]);
        rng.fill_bytes(claim_token.as_mut_slice());
        debug!(uuid = %record.uuid(), peer_id = %identity.peer_id(), "inheritance key created");
        Ok(Self {
            record,
            wrapped_secret,
            wrapping_key,
            claim_token,
            identity,
        })
    }

    /// Check a presented claim token against ours.
    pub fn check_claim_token(&self, token: &[u8]) -> bool {
        ct_eq(self.claim_token.as_slice(), token)
    }

    /// Unwrap the recovery string and bind the identity it derives to the
    /// published record. The wrapped secret only opens against the record it
    /// was made for.
    pub fn recover(record: &RecoveryRecord, wrapped_secret: &Sealed, wrapping_key: &SecretKey, salt: &str) -> Result<RecoveryIdentity> {
        if record.kind() != &RecoveryKind::InheritanceKey {
            warn!(uuid = %record.uuid(), "record is not an inheritance key");
            Err(Error::EntropyKeyMismatch)?;
        }
        let mut sealed = wrapped_secret.clone();
        sealed.set_aad(Some(OctetString::from(record.uuid().as_bytes().to_vec())));
        let secret_bytes = wrapping_key.open(&sealed).map_err(|e| {
            warn!(uuid = %record.uuid(), "wrapped inheritance secret failed to open");
            e
        })?;
        let secret_string = String::from_utf8(secret_bytes.to_vec()).map_err(|_| Error::DecryptionFailure)?;
        let recovery_secret = RecoverySecret::from_string(secret_string);
        let identity = RecoveryIdentity::bind(record, &recovery_secret.to_secret(), salt)?;
        debug!(uuid = %record.uuid(), "inheritance key recovered");
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inheritance_create_recover() {
        let mut rng = crate::util::test::rng();
        let key = InheritanceKey::create(&mut rng, "inheritance salt").unwrap();
        assert!(key.record().peer_id().starts_with("IK-"));
        assert_eq!(key.record().kind(), &RecoveryKind::InheritanceKey);
        assert_eq!(key.claim_token().len(), CLAIM_TOKEN_LEN);
        assert_eq!(key.wrapped_secret().aad().as_deref(), Some(key.record().uuid().as_bytes()));

        let recovered = InheritanceKey::recover(key.record(), key.wrapped_secret(), key.wrapping_key(), "inheritance salt").unwrap();
        assert_eq!(&recovered, key.identity());
    }

    #[test]
    fn inheritance_wrong_wrapping_key() {
        let mut rng = crate::util::test::rng();
        let key = InheritanceKey::create(&mut rng, "inheritance salt").unwrap();
        let other = SecretKey::new_aes256gcm(&mut rng).unwrap();
        let res = InheritanceKey::recover(key.record(), key.wrapped_secret(), &other, "inheritance salt");
        assert_eq!(res.err(), Some(Error::DecryptionFailure));
    }

    #[test]
    fn inheritance_wrong_salt() {
        let mut rng = crate::util::test::rng();
        let key = InheritanceKey::create(&mut rng, "inheritance salt").unwrap();
        let res = InheritanceKey::recover(key.record(), key.wrapped_secret(), key.wrapping_key(), "inheritance salt2");
        assert_eq!(res.err(), Some(Error::EntropyKeyMismatch));
    }

    #[test]
    fn inheritance_secret_swapped_between_records() {
        let mut rng = crate::util::test::rng();
        let key1 = InheritanceKey::create(&mut rng, "inheritance salt").unwrap();
        let key2 = InheritanceKey::create(&mut rng, "inheritance salt").unwrap();
        // right wrapping key, wrong record: the AAD doesn't line up
        let res = InheritanceKey::recover(key2.record(), key1.wrapped_secret(), key1.wrapping_key(), "inheritance salt");
        assert_eq!(res.err(), Some(Error::DecryptionFailure));
    }

    #[test]
    fn inheritance_wrong_kind() {
        let mut rng = crate::util::test::rng();
        let key = InheritanceKey::create(&mut rng, "inheritance salt").unwrap();
        let custodian = RecoveryIdentity::derive(&crate::util::test::setup_secret(), "inheritance salt", RecoveryKind::CustodianRecoveryKey)
            .unwrap()
            .publish_with_uuid(key.record().uuid().clone())
            .unwrap();
        let res = InheritanceKey::recover(&custodian, key.wrapped_secret(), key.wrapping_key(), "inheritance salt");
        assert_eq!(res.err(), Some(Error::EntropyKeyMismatch));
    }

    #[test]
    fn inheritance_claim_token() {
        let mut rng = crate::util::test::rng();
        let key = InheritanceKey::create(&mut rng, "inheritance salt").unwrap();
        let token = key.claim_token().to_vec();
        assert!(key.check_claim_token(&token));
        let mut bad = token.clone();
        bad[0] ^= 0x01;
        assert!(!key.check_claim_token(&bad));
        assert!(!key.check_claim_token(&token[..16]));
    }

    #[test]
    fn inheritance_debug_hides_claim_token() {
        let mut rng = crate::util::test::rng();
        let key = InheritanceKey::create(&mut rng, "inheritance salt").unwrap();
        let debug = format!("{:?}", key);
        assert!(debug.contains("claim_token: \"<redacted>\""));
        assert!(!debug.contains(&format!("{:?}", key.claim_token().as_slice())));
        let hex: String = key.claim_token().iter().map(|b| format!("{:02x}", b)).collect();
        assert!(!debug.contains(&hex));
    }
}
