//! Internal implementation of prescription identifier services.
//!
//! This module contains the check-character algorithm and the short/long form identifier
//! types used when stamping prescription fixtures.

use crate::{IdentifierError, IdentifierResult};
use std::sync::OnceLock;
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Alphabet the check character is drawn from, indexed by check value.
pub const CHECK_CHARACTERS: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ+";

const CHECK_MODULUS: u64 = 37;

/// Length of the leading UUID segment of a short-form identifier.
const LEADING_SEGMENT_LEN: usize = 6;

/// Hex range of the v1 UUID used for the trailing segment (before the check character).
const TRAILING_HEX_RANGE: std::ops::Range<usize> = 12..17;

/// Computes the check character for a prescription identifier body.
///
/// Hyphens in `body` are ignored, so both `A7B2C1-A83008-5E0F1` and `A7B2C1A830085E0F1` produce
/// the same result. Digits are read as base-36 (`0-9`, then `A-Z`; lowercase is accepted).
///
/// The weighted sum is reduced modulo 37 as it accumulates, which yields the same residue as
/// summing the full powers of two and keeps arbitrarily long organisation codes from
/// overflowing.
///
/// # Errors
///
/// Returns [`IdentifierError::InvalidInput`] if the body is empty or any character is not a
/// base-36 digit.
pub fn check_character(body: &str) -> IdentifierResult<char> {
    let digits: Vec<u32> = body
        .chars()
        .filter(|c| *c != '-')
        .map(|c| {
            c.to_digit(36).ok_or_else(|| {
                IdentifierError::InvalidInput(format!(
                    "'{}' is not a base-36 digit in '{}'",
                    c, body
                ))
            })
        })
        .collect::<IdentifierResult<_>>()?;

    if digits.is_empty() {
        return Err(IdentifierError::InvalidInput(
            "identifier body cannot be empty".into(),
        ));
    }

    let n = digits.len() as u64;
    let running_total = digits
        .iter()
        .enumerate()
        .fold(0u64, |total, (i, digit)| {
            let weight = pow2_mod(n - i as u64, CHECK_MODULUS);
            (total + u64::from(*digit) * weight) % CHECK_MODULUS
        });

    // (38 - x) is reduced mod 37, not mod 38.
    let check_value = (38 - running_total) % CHECK_MODULUS;

    CHECK_CHARACTERS
        .chars()
        .nth(check_value as usize)
        .ok_or_else(|| IdentifierError::InvalidInput(format!("check value {check_value} out of range")))
}

fn pow2_mod(exponent: u64, modulus: u64) -> u64 {
    let mut result = 1u64;
    let mut base = 2 % modulus;
    let mut exponent = exponent;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = result * base % modulus;
        }
        base = base * base % modulus;
        exponent >>= 1;
    }
    result
}

/// Organisation codes are embedded verbatim. Hyphens are allowed because the check character
/// skips them; anything else must be a base-36 digit.
fn validate_organisation_code(organisation_code: &str) -> IdentifierResult<()> {
    if let Some(c) = organisation_code
        .chars()
        .find(|c| *c != '-' && !c.is_ascii_alphanumeric())
    {
        return Err(IdentifierError::InvalidInput(format!(
            "'{}' is not a base-36 digit in organisation code '{}'",
            c, organisation_code
        )));
    }

    Ok(())
}

/// Stored identifiers must split into exactly three segments, so their organisation code is
/// non-empty and hyphen-free.
fn validate_stored_organisation_code(organisation_code: &str) -> IdentifierResult<()> {
    if organisation_code.is_empty() {
        return Err(IdentifierError::InvalidInput(
            "organisation code cannot be empty".into(),
        ));
    }
    validate_organisation_code(organisation_code)
}

/// Random node id used for every v1 UUID generated by this process.
fn node_id() -> &'static [u8; 6] {
    static NODE_ID: OnceLock<[u8; 6]> = OnceLock::new();
    NODE_ID.get_or_init(rand::random)
}

/// A short-form (R2) prescription identifier: `XXXXXX-<organisation code>-ZZZZZC`.
///
/// Once constructed, the check character is guaranteed to match the body.
///
/// # Construction
/// - [`ShortFormId::generate`] allocates a new identifier from a time-ordered UUID.
/// - [`ShortFormId::parse`] validates an externally supplied identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShortFormId(String);

impl ShortFormId {
    /// Generates a new short-form identifier around `organisation_code`.
    ///
    /// The leading and trailing segments come from a version-1 UUID, so identifiers generated
    /// in sequence differ in their time fields.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidInput`] if the organisation code contains a character
    /// that is neither `-` nor a base-36 digit. Empty and hyphenated codes are accepted; such
    /// identifiers are not accepted back by [`ShortFormId::parse`].
    pub fn generate(organisation_code: &str) -> IdentifierResult<Self> {
        validate_organisation_code(organisation_code)?;
        let hex = Uuid::now_v1(node_id()).simple().to_string().to_uppercase();
        Self::from_hex(&hex, organisation_code)
    }

    /// Builds the identifier from a 32-character hex rendering of a UUID.
    fn from_hex(hex: &str, organisation_code: &str) -> IdentifierResult<Self> {
        let leading = hex.get(..LEADING_SEGMENT_LEN);
        let trailing = hex.get(TRAILING_HEX_RANGE);
        let (Some(leading), Some(trailing)) = (leading, trailing) else {
            return Err(IdentifierError::InvalidInput(format!(
                "UUID hex too short: '{}'",
                hex
            )));
        };

        let body = format!("{leading}-{organisation_code}-{trailing}");
        let check = check_character(&body)?;
        Ok(Self(format!("{body}{check}")))
    }

    /// Validates an existing short-form identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidInput`] if the identifier does not have exactly three
    /// hyphen-separated segments, the outer segments have the wrong length, or the check
    /// character does not match.
    pub fn parse(input: &str) -> IdentifierResult<Self> {
        if !input.is_ascii() {
            return Err(IdentifierError::InvalidInput(format!(
                "short-form identifier must be ASCII, got: '{}'",
                input
            )));
        }

        let segments: Vec<&str> = input.split('-').collect();
        if segments.len() != 3 {
            return Err(IdentifierError::InvalidInput(format!(
                "short-form identifier must have three '-' separated segments, got: '{}'",
                input
            )));
        }

        if segments[0].len() != LEADING_SEGMENT_LEN
            || segments[2].len() != TRAILING_HEX_RANGE.len() + 1
        {
            return Err(IdentifierError::InvalidInput(format!(
                "short-form identifier segments have the wrong length: '{}'",
                input
            )));
        }
        validate_stored_organisation_code(segments[1])?;

        // ASCII-only, so the last char boundary is len - 1.
        let (body, check) = input.split_at(input.len() - 1);
        let expected = check_character(body)?;
        if !check.starts_with(expected) {
            return Err(IdentifierError::InvalidInput(format!(
                "check character mismatch in '{}': expected '{}'",
                input, expected
            )));
        }

        Ok(Self(input.to_owned()))
    }

    /// Returns the organisation code embedded between the outer segments.
    pub fn organisation_code(&self) -> &str {
        let start = LEADING_SEGMENT_LEN + 1;
        let end = self.0.len().saturating_sub(TRAILING_HEX_RANGE.len() + 2);
        self.0.get(start..end).unwrap_or_default()
    }

    /// Returns the check character.
    pub fn check(&self) -> char {
        self.0.chars().last().unwrap_or('0')
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShortFormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ShortFormId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShortFormId::parse(s)
    }
}

impl AsRef<str> for ShortFormId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A long-form prescription identifier: a random UUID in hyphenated lowercase form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LongFormId(Uuid);

impl Default for LongFormId {
    fn default() -> Self {
        Self::new()
    }
}

impl LongFormId {
    /// Generates a new random (version 4) long-form identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a long-form identifier. Any standard UUID rendering is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidInput`] if `input` is not a UUID.
    pub fn parse(input: &str) -> IdentifierResult<Self> {
        Uuid::parse_str(input).map(Self).map_err(|e| {
            IdentifierError::InvalidInput(format!("invalid long-form identifier '{}': {}", input, e))
        })
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for LongFormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for LongFormId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LongFormId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ShortFormId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ShortFormId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ShortFormId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for LongFormId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for LongFormId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        LongFormId::parse(&s).map_err(serde::de::Error::custom)
    }
}
