//! License key format and checksum.
//!
//! Keys look like `PREFIX-XXXX-XXXX-XXXX-CCCC`: an uppercase alphanumeric
//! product prefix, a 12-character random body split into three groups, and a
//! 4-character checksum over the body. Validation happens before any store
//! lookup, so malformed or guessed keys cost zero backend calls.

use rand::Rng;
use thiserror::Error;

/// The 36-character key alphabet.
pub const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

const BODY_LEN: usize = 12;
const GROUP_LEN: usize = 4;
const CHECKSUM_LEN: usize = 4;
const MAX_PREFIX_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Does not match the PREFIX-XXXX-XXXX-XXXX-CCCC pattern
    #[error("malformed license key")]
    Format,
    /// Pattern is fine but the trailing group does not match the body
    #[error("license key checksum mismatch")]
    Checksum,
}

fn is_alphabet_char(b: u8) -> bool {
    b.is_ascii_uppercase() || b.is_ascii_digit()
}

/// Compute the 4-character checksum over a 12-character key body.
///
/// Weighted character-code sum; each output character takes a different bit
/// shift of the sum reduced mod 36. The same function backs both generation
/// and validation, so the two can never drift.
pub fn checksum(body: &str) -> String {
    debug_assert_eq!(body.len(), BODY_LEN);
    let sum: u64 = body
        .bytes()
        .enumerate()
        .map(|(i, b)| (i as u64 + 1) * b as u64)
        .sum();
    (0..CHECKSUM_LEN)
        .map(|i| ALPHABET[((sum >> (i * 5)) % 36) as usize] as char)
        .collect()
}

/// Validate a key's lexical format and checksum.
///
/// Pattern failures always report `KeyError::Format`; `KeyError::Checksum`
/// is only possible for a well-formed key.
pub fn validate(key: &str) -> Result<(), KeyError> {
    let segments: Vec<&str> = key.split('-').collect();
    if segments.len() != 5 {
        return Err(KeyError::Format);
    }

    let prefix = segments[0];
    if prefix.is_empty()
        || prefix.len() > MAX_PREFIX_LEN
        || !prefix.bytes().all(is_alphabet_char)
    {
        return Err(KeyError::Format);
    }
    for group in &segments[1..] {
        if group.len() != GROUP_LEN || !group.bytes().all(is_alphabet_char) {
            return Err(KeyError::Format);
        }
    }

    let body: String = segments[1..4].concat();
    if checksum(&body) != segments[4] {
        return Err(KeyError::Checksum);
    }
    Ok(())
}

/// Generate a new key with a random body and valid checksum.
///
/// The prefix is uppercased first; one that `validate` would still reject
/// (empty, overlong, or containing separators) is refused here instead of
/// producing a key that fails its own validation.
pub fn generate(prefix: &str) -> Result<String, KeyError> {
    let prefix = prefix.to_uppercase();
    if prefix.is_empty()
        || prefix.len() > MAX_PREFIX_LEN
        || !prefix.bytes().all(is_alphabet_char)
    {
        return Err(KeyError::Format);
    }
    let mut rng = rand::thread_rng();
    let body: String = (0..BODY_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    let cs = checksum(&body);
    Ok(format!(
        "{prefix}-{}-{}-{}-{cs}",
        &body[0..4],
        &body[4..8],
        &body[8..12],
    ))
}
