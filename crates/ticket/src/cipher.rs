//! Session ticket encryption.
//!
//! A ticket is `IV(16) || AES-128-CTR(state) || HMAC-SHA256(IV || ciphertext)`.

use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{
    digest::{Key, KeyInit},
    Hmac, Mac,
};
use sha2::Sha256;
use tracing::trace;
use zeroize::Zeroize;

use crate::{
    key::{TicketKey, HMAC_KEY_LEN},
    rand::{SecureRandom, SystemRandom},
    TicketError,
};

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type HmacSha256 = Hmac<Sha256>;

/// Length of the ticket IV.
pub const IV_LEN: usize = 16;
/// Length of the ticket MAC tag.
pub const TAG_LEN: usize = 32;
/// The shortest blob that can be a ticket.
pub const MIN_TICKET_LEN: usize = IV_LEN + TAG_LEN;

/// Encrypts `plaintext` under the first key of `keys`.
pub fn encrypt(plaintext: &[u8], keys: &[TicketKey]) -> Result<Vec<u8>, TicketError> {
    encrypt_with_rng(plaintext, keys, &SystemRandom)
}

/// Encrypts `plaintext` under the first key of `keys`, drawing the IV from
/// `rng`.
pub fn encrypt_with_rng(
    plaintext: &[u8],
    keys: &[TicketKey],
    rng: &dyn SecureRandom,
) -> Result<Vec<u8>, TicketError> {
    let key = keys.first().ok_or_else(TicketError::key_unavailable)?;

    let mut iv = [0u8; IV_LEN];
    rng.fill(&mut iv)?;

    let mut encrypted = Vec::with_capacity(IV_LEN + plaintext.len() + TAG_LEN);
    encrypted.extend_from_slice(&iv);
    encrypted.extend_from_slice(plaintext);
    Aes128Ctr::new(key.aes_key().into(), (&iv).into()).apply_keystream(&mut encrypted[IV_LEN..]);

    let tag = hmac_for(key, &encrypted).finalize().into_bytes();
    encrypted.extend_from_slice(&tag);

    Ok(encrypted)
}

/// Decrypts a ticket, trying each key of `keys` in order.
///
/// Every failure, whether the blob is too short or no key authenticates
/// it, is reported as the same not decryptable error.
pub fn decrypt(blob: &[u8], keys: &[TicketKey]) -> Result<Vec<u8>, TicketError> {
    open(blob, keys)
        .map(|(plaintext, _)| plaintext)
        .ok_or_else(TicketError::not_decryptable)
}

/// Decrypts a ticket and returns the plaintext along with the key that
/// authenticated it.
pub fn open<'k>(blob: &[u8], keys: &'k [TicketKey]) -> Option<(Vec<u8>, &'k TicketKey)> {
    if blob.len() < MIN_TICKET_LEN {
        return None;
    }

    let (authenticated, tag) = blob.split_at(blob.len() - TAG_LEN);
    let (iv, ciphertext) = authenticated.split_at(IV_LEN);

    for (i, key) in keys.iter().enumerate() {
        // Constant time comparison.
        if hmac_for(key, authenticated).verify_slice(tag).is_err() {
            continue;
        }

        trace!(key_index = i, "ticket authenticated");

        let mut plaintext = ciphertext.to_vec();
        let iv: &[u8; IV_LEN] = iv.try_into().ok()?;
        Aes128Ctr::new(key.aes_key().into(), iv.into()).apply_keystream(&mut plaintext);

        return Some((plaintext, key));
    }

    None
}

fn hmac_for(key: &TicketKey, data: &[u8]) -> HmacSha256 {
    // HMAC zero-pads keys shorter than the hash block.
    let mut block = Key::<HmacSha256>::default();
    block[..HMAC_KEY_LEN].copy_from_slice(key.hmac_key());

    let mut mac = <HmacSha256 as KeyInit>::new(&block);
    block.as_mut_slice().zeroize();
    mac.update(data);

    mac
}
