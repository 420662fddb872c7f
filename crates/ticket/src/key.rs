//! Ticket keys and the rotation list.

use std::{fmt, ops::Deref, sync::Arc};

use sha2::{Digest, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{rand::SecureRandom, TicketError};

/// Length of an AES-128 ticket encryption key.
pub const AES_KEY_LEN: usize = 16;
/// Length of a ticket HMAC-SHA256 key.
pub const HMAC_KEY_LEN: usize = 16;
/// Length of the secret a ticket key is derived from.
pub const KEY_SEED_LEN: usize = 32;

// The first 16 bytes of the seed hash were once exposed on the wire as a
// ticket name prefix and must not be used as key material.
const LEGACY_KEY_NAME_LEN: usize = 16;

/// Where a ticket key came from.
///
/// The origin of the key that authenticates a ticket selects how the
/// decrypted session state is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyOrigin {
    /// A key generated by the key management layer to issue tickets.
    Issued,
    /// A key derived from a secret shared with clients out of band, which
    /// clients use to forge obfuscated tickets.
    SharedSecret,
}

/// An AES-128 key and an HMAC-SHA256 key protecting session tickets.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct TicketKey {
    aes_key: [u8; AES_KEY_LEN],
    hmac_key: [u8; HMAC_KEY_LEN],
    #[zeroize(skip)]
    origin: KeyOrigin,
}

opaque_debug::implement!(TicketKey);

impl TicketKey {
    /// Creates a ticket key from raw key material.
    pub fn new(aes_key: [u8; AES_KEY_LEN], hmac_key: [u8; HMAC_KEY_LEN]) -> Self {
        Self {
            aes_key,
            hmac_key,
            origin: KeyOrigin::Issued,
        }
    }

    /// Derives a ticket key from a 32 byte seed.
    ///
    /// The seed is hashed with SHA-512; bytes 16..32 of the digest form the
    /// AES key and bytes 32..48 the HMAC key. Both ends of an obfuscated
    /// ticket exchange must use this mapping.
    pub fn from_seed(seed: &[u8; KEY_SEED_LEN], origin: KeyOrigin) -> Self {
        let mut hashed = Sha512::digest(seed);

        let mut aes_key = [0u8; AES_KEY_LEN];
        let mut hmac_key = [0u8; HMAC_KEY_LEN];
        aes_key.copy_from_slice(&hashed[LEGACY_KEY_NAME_LEN..LEGACY_KEY_NAME_LEN + AES_KEY_LEN]);
        hmac_key.copy_from_slice(
            &hashed[LEGACY_KEY_NAME_LEN + AES_KEY_LEN
                ..LEGACY_KEY_NAME_LEN + AES_KEY_LEN + HMAC_KEY_LEN],
        );
        hashed.as_mut_slice().zeroize();

        Self {
            aes_key,
            hmac_key,
            origin,
        }
    }

    /// Derives the key for obfuscated tickets from a pre-shared secret.
    pub fn from_shared_secret(secret: &[u8; KEY_SEED_LEN]) -> Self {
        Self::from_seed(secret, KeyOrigin::SharedSecret)
    }

    /// Generates a fresh key for issuing tickets.
    pub fn generate(rng: &dyn SecureRandom) -> Result<Self, TicketError> {
        let mut seed = [0u8; KEY_SEED_LEN];
        rng.fill(&mut seed)?;
        let key = Self::from_seed(&seed, KeyOrigin::Issued);
        seed.zeroize();

        Ok(key)
    }

    /// Returns the AES-128 key.
    pub fn aes_key(&self) -> &[u8; AES_KEY_LEN] {
        &self.aes_key
    }

    /// Returns the HMAC-SHA256 key.
    pub fn hmac_key(&self) -> &[u8; HMAC_KEY_LEN] {
        &self.hmac_key
    }

    /// Returns where the key came from.
    pub fn origin(&self) -> KeyOrigin {
        self.origin
    }
}

/// An immutable snapshot of the ticket key rotation list.
///
/// Index 0 encrypts new tickets; later keys are kept so that older tickets
/// still decrypt. Rotating produces a new snapshot, so a caller holding a
/// snapshot sees the same keys for the whole of a decrypt attempt.
#[derive(Clone)]
pub struct TicketKeys(Arc<[TicketKey]>);

impl TicketKeys {
    /// Creates a snapshot from keys ordered newest first.
    pub fn new(keys: Vec<TicketKey>) -> Self {
        Self(keys.into())
    }

    /// Returns the key used to encrypt new tickets.
    pub fn current(&self) -> Option<&TicketKey> {
        self.0.first()
    }

    /// Returns a new snapshot with `key` in front, keeping at most
    /// `max_keys` keys.
    pub fn rotate(&self, key: TicketKey, max_keys: usize) -> Self {
        let keys: Vec<_> = std::iter::once(key)
            .chain(self.0.iter().cloned())
            .take(max_keys.max(1))
            .collect();

        Self::new(keys)
    }
}

impl Default for TicketKeys {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Deref for TicketKeys {
    type Target = [TicketKey];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<TicketKey>> for TicketKeys {
    fn from(keys: Vec<TicketKey>) -> Self {
        Self::new(keys)
    }
}

impl fmt::Debug for TicketKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketKeys")
            .field("len", &self.0.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rand::{test_utils::FailingRandom, SystemRandom};

    #[test]
    fn test_from_seed_mapping() {
        let seed = [7u8; KEY_SEED_LEN];
        let hashed = Sha512::digest(seed);

        let key = TicketKey::from_shared_secret(&seed);

        assert_eq!(key.aes_key(), &hashed[16..32]);
        assert_eq!(key.hmac_key(), &hashed[32..48]);
        assert_eq!(key.origin(), KeyOrigin::SharedSecret);
    }

    #[test]
    fn test_from_seed_is_deterministic() {
        let a = TicketKey::from_shared_secret(&[1; 32]);
        let b = TicketKey::from_shared_secret(&[1; 32]);
        let c = TicketKey::from_shared_secret(&[2; 32]);

        assert_eq!(a.aes_key(), b.aes_key());
        assert_eq!(a.hmac_key(), b.hmac_key());
        assert_ne!(a.aes_key(), c.aes_key());
    }

    #[test]
    fn test_generate() {
        let a = TicketKey::generate(&SystemRandom).unwrap();
        let b = TicketKey::generate(&SystemRandom).unwrap();

        assert_ne!(a.aes_key(), b.aes_key());
        assert_eq!(a.origin(), KeyOrigin::Issued);
        assert!(TicketKey::generate(&FailingRandom).is_err());
    }

    #[test]
    fn test_rotate_is_a_new_snapshot() {
        let k1 = TicketKey::new([1; 16], [1; 16]);
        let k2 = TicketKey::new([2; 16], [2; 16]);
        let k3 = TicketKey::new([3; 16], [3; 16]);

        let old = TicketKeys::new(vec![k1]);
        let rotated = old.rotate(k2, 2);
        let rotated_again = rotated.rotate(k3, 2);

        assert_eq!(old.len(), 1);
        assert_eq!(old[0].aes_key(), &[1; 16]);
        assert_eq!(rotated.len(), 2);
        assert_eq!(rotated[0].aes_key(), &[2; 16]);
        assert_eq!(rotated_again.len(), 2);
        assert_eq!(rotated_again[0].aes_key(), &[3; 16]);
        assert_eq!(rotated_again[1].aes_key(), &[2; 16]);
        assert_eq!(rotated_again.current().unwrap().aes_key(), &[3; 16]);
    }

    #[test]
    fn test_empty_snapshot() {
        let keys = TicketKeys::default();
        assert!(keys.is_empty());
        assert!(keys.current().is_none());
    }
}
