//! Constants used throughout the EPS core crate.
//!
//! This module contains path, filename and endpoint constants to keep the fixture workflows
//! consistent with the layout of the example corpus.

/// Default root of the stored example corpus, relative to the repository root.
pub const DEFAULT_EXAMPLES_DIR: &str = "models/examples";

/// Path prefix of the FHIR endpoints on the sandbox API.
pub const DEFAULT_API_PREFIX: &str = "FHIR/R4";

/// Sandbox operation that returns the digest and timestamp to sign.
pub const PREPARE_OPERATION: &str = "$prepare";

/// Sandbox operation that translates a FHIR message into its HL7 V3 form.
pub const CONVERT_OPERATION: &str = "$convert";

/// Output directory for synthesized component examples.
pub const RESOURCES_DIR_NAME: &str = "resources";

/// Marker in the file name of a prepare request fixture.
pub const PREPARE_REQUEST_MARKER: &str = "Prepare-Request";

/// Status suffix of fixtures that describe a successful exchange.
pub const SUCCESS_STATUS: &str = "200_OK";

/// Extension of JSON fixtures.
pub const JSON_EXTENSION: &str = "json";

/// Extension of converted (HL7 V3) fixtures.
pub const XML_EXTENSION: &str = "xml";
