//! Randomness for IVs, forged master secrets and ticket keys.

use rand::{rngs::OsRng, TryRngCore};

use crate::{codec, TicketError};

/// A source of cryptographically secure random bytes.
///
/// A failing source is an error for the operation that needed the bytes;
/// callers never substitute a weaker source for secret material.
pub trait SecureRandom: Send + Sync {
    /// Fills `dest` with random bytes.
    fn fill(&self, dest: &mut [u8]) -> Result<(), TicketError>;
}

/// Random bytes from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRandom;

impl SecureRandom for SystemRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), TicketError> {
        OsRng.try_fill_bytes(dest).map_err(TicketError::rng)
    }
}

/// Make a Vec<u8> of the given size
/// containing random material.
pub fn random_vec(rng: &dyn SecureRandom, len: usize) -> Result<Vec<u8>, TicketError> {
    let mut v = vec![0; len];
    rng.fill(&mut v)?;
    Ok(v)
}

/// Return a uniformly random u32.
pub fn random_u32(rng: &dyn SecureRandom) -> Result<u32, TicketError> {
    let mut buf = [0u8; 4];
    rng.fill(&mut buf)?;
    codec::decode_u32(&buf).ok_or_else(|| TicketError::rng("failed to decode random u32"))
}

// Draws allowed before an index draw gives up. With a working source each
// draw is rejected with probability below 1/2.
const MAX_INDEX_DRAWS: usize = 64;

/// Return a uniformly random index below `len`.
///
/// `len` must be non-zero and fit in a u32. Draws from the tail of the u32
/// range are rejected; a source that keeps landing there, such as one
/// stuck on `0xff` bytes, is reported as an error after a bounded number
/// of draws.
pub fn random_index(rng: &dyn SecureRandom, len: usize) -> Result<usize, TicketError> {
    debug_assert!(len > 0 && len <= u32::MAX as usize);
    let len = u32::try_from(len).map_err(TicketError::rng)?;
    if len == 0 {
        return Err(TicketError::rng("empty index range"));
    }

    // Reject the tail of the u32 range so every index is equally likely.
    let zone = u32::MAX - (u32::MAX % len);
    for _ in 0..MAX_INDEX_DRAWS {
        let v = random_u32(rng)?;
        if v < zone {
            return Ok((v % len) as usize);
        }
    }

    Err(TicketError::rng("random source keeps returning rejected values"))
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;

    /// A source that always fails.
    pub(crate) struct FailingRandom;

    impl SecureRandom for FailingRandom {
        fn fill(&self, _dest: &mut [u8]) -> Result<(), TicketError> {
            Err(TicketError::rng("entropy source unavailable"))
        }
    }

    /// A source that repeats a single byte.
    pub(crate) struct FixedRandom(pub(crate) u8);

    impl SecureRandom for FixedRandom {
        fn fill(&self, dest: &mut [u8]) -> Result<(), TicketError> {
            dest.fill(self.0);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{test_utils::*, *};

    #[test]
    fn test_random_vec() {
        let a = random_vec(&SystemRandom, 32).unwrap();
        let b = random_vec(&SystemRandom, 32).unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_random_index_in_range() {
        for len in 1..10 {
            for _ in 0..32 {
                assert!(random_index(&SystemRandom, len).unwrap() < len);
            }
        }
        assert_eq!(random_index(&FixedRandom(0), 8).unwrap(), 0);
    }

    #[test]
    fn test_failure_propagates() {
        assert!(random_vec(&FailingRandom, 16).is_err());
        assert!(random_index(&FailingRandom, 4).is_err());
    }

    #[test]
    fn test_random_index_stuck_source() {
        // u32::MAX is always in the rejected tail.
        for len in [1, 5, 8] {
            let err = random_index(&FixedRandom(0xff), len).unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::Rng);
        }
    }
}
