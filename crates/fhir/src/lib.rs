//! FHIR fixture support for EPS example maintenance.
//!
//! This crate works on FHIR resources as untyped JSON trees so that every field of a stored
//! example survives a round trip untouched. It provides:
//! - [`bundle`]: stamping fresh identifiers and dates into a prescription Bundle
//! - [`parameters`]: reading values out of a `$prepare` Parameters response
//!
//! Only the fields the fixture workflow owns are ever written; everything else is left as
//! found, in its original key order.

pub mod bundle;
pub mod parameters;

pub use bundle::{format_authored_on, organisation_code, PrescriptionUpdate};
pub use parameters::signature_timestamp;

/// URL of the extension carrying the long-form prescription identifier.
pub const PRESCRIPTION_ID_EXTENSION_URL: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-DM-PrescriptionId";

/// Default length of a repeat-dispensing validity period.
pub const DEFAULT_VALIDITY_PERIOD_WEEKS: u32 = 4;

/// Errors returned by the `fhir` crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("missing element: {0}")]
    MissingElement(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
