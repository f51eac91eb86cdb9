//! Seed tokens and their numeric form.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

const NOW_ENTROPY_MODULUS: i64 = 1_000_000;
const SUFFIX_LEN: usize = 11;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Fold `seed_text` into a numeric seed and mix in the evaluation instant.
///
/// The text is hashed over its UTF-16 code units with `acc = acc * 31 + c`,
/// wrapping at 32 bits and read as a signed value. `now_millis % 1_000_000`
/// (sign follows `now_millis`) is then added without further truncation.
pub fn derive_numeric_seed(seed_text: &str, now_millis: i64) -> i64 {
    let hash = seed_text.encode_utf16().fold(0i32, |acc, unit| {
        acc.wrapping_shl(5)
            .wrapping_sub(acc)
            .wrapping_add(i32::from(unit))
    });
    i64::from(hash) + now_millis % NOW_ENTROPY_MODULUS
}

/// Opaque raffle seed, `"<millis>-<random base36>"` when generated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedToken(String);

impl SeedToken {
    /// Fresh token from the wall clock plus a random suffix
    pub fn generate(now: DateTime<Utc>) -> Self {
        let random = Uuid::new_v4().as_u128();
        Self(format!("{}-{}", now.timestamp_millis(), base36(random, SUFFIX_LEN)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SeedToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SeedToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SeedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for SeedToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

fn base36(mut value: u128, len: usize) -> String {
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    out.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference fold in 64-bit arithmetic, truncated to 32 bits per step.
    fn reference_hash(text: &str) -> i64 {
        let mut acc: i64 = 0;
        for unit in text.encode_utf16() {
            acc = ((acc << 5) - acc + i64::from(unit)) as i32 as i64;
        }
        acc
    }

    #[test]
    fn empty_seed_is_time_only() {
        assert_eq!(derive_numeric_seed("", 1_700_000_123_456), 123_456);
        assert_eq!(derive_numeric_seed("", 0), 0);
    }

    #[test]
    fn short_seed_matches_polynomial_hash() {
        // "ab" = 97 * 31 + 98
        assert_eq!(derive_numeric_seed("ab", 0), 97 * 31 + 98);
        assert_eq!(derive_numeric_seed("a", 5_000_123), 97 + 123);
    }

    #[test]
    fn long_seed_wraps_at_32_bits() {
        let text = "1718035200000-k3j9x0q2z8m";
        let derived = derive_numeric_seed(text, 0);
        assert_eq!(derived, reference_hash(text));
        assert!(derived >= i64::from(i32::MIN) && derived <= i64::from(i32::MAX));

        // Enough characters that the unwrapped value would overflow i64.
        let long = "z".repeat(64);
        assert_eq!(derive_numeric_seed(&long, 0), reference_hash(&long));
    }

    #[test]
    fn hash_runs_over_utf16_units() {
        // U+1F3B2 is a surrogate pair: two units, not one char.
        let text = "\u{1F3B2}";
        let units: Vec<u16> = text.encode_utf16().collect();
        assert_eq!(units.len(), 2);
        let expected = i64::from(
            (i32::from(units[0]))
                .wrapping_mul(31)
                .wrapping_add(i32::from(units[1])),
        );
        assert_eq!(derive_numeric_seed(text, 0), expected);
    }

    #[test]
    fn negative_instant_keeps_remainder_sign() {
        assert_eq!(derive_numeric_seed("", -1_000_001), -1);
    }

    #[test]
    fn generated_token_has_time_and_suffix() {
        let now = DateTime::from_timestamp_millis(1_718_035_200_000).expect("instant");
        let token = SeedToken::generate(now);
        let (millis, suffix) = token.as_str().split_once('-').expect("dash");
        assert_eq!(millis, "1718035200000");
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.bytes().all(|b| BASE36.contains(&b)));
        assert_ne!(token, SeedToken::generate(now));
    }
}
