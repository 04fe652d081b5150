//! Prescription identifier utilities.
//!
//! EPS prescriptions carry two identifiers:
//!
//! - a **short form** (`XXXXXX-YYYY-ZZZZZC`) built around the prescribing organisation's code
//!   and closed with a check character, written to `MedicationRequest.groupIdentifier.value`;
//! - a **long form**, a random UUID in hyphenated form, written to the
//!   `Extension-DM-PrescriptionId` extension of the same group identifier.
//!
//! ## Short form layout
//! - `XXXXXX`: hex characters `[0, 6)` of an uppercase, hyphen-free version-1 UUID
//! - `YYYY`: the organisation code, inserted verbatim (any length)
//! - `ZZZZZ`: hex characters `[12, 17)` of the same UUID
//! - `C`: check character over the hyphen-free body, drawn from
//!   `0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ+`
//!
//! Example: `A7B2C1-A83008-5E0F14`
//!
//! ## Check character
//! Each body character is read as a base-36 digit and weighted by `2^(n - i)`, where `n` is the
//! body length and `i` the zero-based position. The check value is
//! `(38 - total mod 37) mod 37`, used as an index into the alphabet above.
//!
//! Use [`ShortFormId::generate`] to allocate a new identifier and [`ShortFormId::parse`] to
//! validate one supplied from outside (fixtures, CLI input).

mod service;

// Re-export public types
pub use service::{check_character, LongFormId, ShortFormId, CHECK_CHARACTERS};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum IdentifierError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type IdentifierResult<T> = Result<T, IdentifierError>;

/// Generates a new short-form prescription identifier for `organisation_code`.
///
/// Convenience wrapper around [`ShortFormId::generate`] returning the rendered string.
///
/// # Errors
///
/// Returns [`IdentifierError::InvalidInput`] if the organisation code contains a character that
/// is neither `-` nor a base-36 digit.
pub fn generate_identifier(organisation_code: &str) -> IdentifierResult<String> {
    ShortFormId::generate(organisation_code).map(|id| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_identifier_shape_for_abc() {
        let pattern = regex::Regex::new(r"^[0-9A-Z]{6}-ABC-[0-9A-Z]{5}[0-9A-Z+]$").unwrap();
        let id = generate_identifier("ABC").unwrap();

        assert!(pattern.is_match(&id), "unexpected identifier: {id}");
        assert_eq!(id.len(), 17);
        assert_eq!(
            check_character(&id[..16]).unwrap(),
            id.chars().nth(16).unwrap()
        );
    }

    #[test]
    fn test_generate_identifier_invalid_input() {
        let result = generate_identifier("AB/C");

        assert!(matches!(result, Err(IdentifierError::InvalidInput(_))));
    }

    #[test]
    fn test_generate_identifier_hyphenated_organisation_code() {
        let id = generate_identifier("AB-C").unwrap();

        assert_eq!(id.len(), 18);
        assert_eq!(check_character(&id[..17]).unwrap(), id.chars().nth(17).unwrap());
    }
}
