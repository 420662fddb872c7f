//! Padding that makes encoded session state resemble the ticket sizes of
//! common TLS stacks.

use rand::{rngs::SmallRng, Rng, SeedableRng};
use tracing::warn;
use web_time::{SystemTime, UNIX_EPOCH};

use crate::rand::{random_index, SecureRandom, SystemRandom};

/// Target sizes the padding is drawn from.
pub const PADDED_SIZES: [usize; 8] = [160, 176, 192, 208, 218, 224, 240, 255];
/// Subtracted from the drawn target size to get the padding length.
pub const BASELINE_SIZE: usize = 120;

/// Appends zero padding to encoded session state.
///
/// The padding length is `size - baseline` for a size drawn uniformly from
/// the menu. The zeros are appended before encryption, so they are
/// authenticated along with the state and accepted by
/// [`TrailingData::RequireZeros`](crate::TrailingData::RequireZeros).
#[derive(Debug, Clone, Copy)]
pub struct PaddingObfuscator {
    padded_sizes: &'static [usize],
    baseline_size: usize,
}

impl Default for PaddingObfuscator {
    fn default() -> Self {
        Self {
            padded_sizes: &PADDED_SIZES,
            baseline_size: BASELINE_SIZE,
        }
    }
}

impl PaddingObfuscator {
    /// Creates an obfuscator with the standard size menu.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the size menu.
    pub fn padded_sizes(&self) -> &[usize] {
        self.padded_sizes
    }

    /// Returns the baseline subtracted from each menu size.
    pub fn baseline_size(&self) -> usize {
        self.baseline_size
    }

    /// Pads `bytes` in place.
    pub fn pad(&self, bytes: &mut Vec<u8>) {
        self.pad_with_rng(bytes, &SystemRandom)
    }

    /// Pads `bytes` in place, drawing the size from `rng`.
    ///
    /// The size is not secret, so a failing `rng` only degrades the draw
    /// to a non-cryptographic generator.
    pub fn pad_with_rng(&self, bytes: &mut Vec<u8>, rng: &dyn SecureRandom) {
        let len = self.padding_len(rng);
        bytes.resize(bytes.len() + len, 0);
    }

    /// Draws a padding length.
    pub fn padding_len(&self, rng: &dyn SecureRandom) -> usize {
        let index = random_index(rng, self.padded_sizes.len()).unwrap_or_else(|err| {
            warn!("secure padding draw failed, falling back: {}", err);
            fallback_rng().random_range(0..self.padded_sizes.len())
        });

        self.padded_sizes[index].saturating_sub(self.baseline_size)
    }
}

fn fallback_rng() -> SmallRng {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();

    SmallRng::seed_from_u64(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rand::test_utils::{FailingRandom, FixedRandom};
    use std::collections::HashSet;

    #[test]
    fn test_padding_from_menu() {
        let padding = PaddingObfuscator::new();

        let mut seen = HashSet::new();
        for _ in 0..256 {
            let mut bytes = vec![1u8; 37];
            padding.pad(&mut bytes);

            let size = bytes.len() - 37 + BASELINE_SIZE;
            assert!(PADDED_SIZES.contains(&size), "unexpected size {size}");
            assert!(bytes[37..].iter().all(|b| *b == 0));
            seen.insert(size);
        }

        assert!(seen.len() > 1);
    }

    #[test]
    fn test_fixed_draw() {
        let padding = PaddingObfuscator::new();
        assert_eq!(padding.padding_len(&FixedRandom(0)), 160 - 120);
    }

    #[test]
    fn test_rng_failure_degrades() {
        let padding = PaddingObfuscator::new();

        let mut bytes = Vec::new();
        padding.pad_with_rng(&mut bytes, &FailingRandom);

        assert!(PADDED_SIZES.contains(&(bytes.len() + BASELINE_SIZE)));
    }

    #[test]
    fn test_stuck_rng_degrades() {
        let padding = PaddingObfuscator::new();
        let len = padding.padding_len(&FixedRandom(0xff));

        assert!(PADDED_SIZES.contains(&(len + BASELINE_SIZE)));
    }
}
