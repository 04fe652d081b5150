//! Prescription Bundle mutation.
//!
//! Stored prepare/process request examples are FHIR Bundles. Before a bundle is replayed against
//! the sandbox, the fixture workflow refreshes:
//! - `Provenance.signature[].when`
//! - `MedicationRequest.groupIdentifier.value` (short-form prescription id)
//! - `MedicationRequest.groupIdentifier.extension[Extension-DM-PrescriptionId].valueIdentifier.value`
//!   (long-form prescription id)
//! - `MedicationRequest.authoredOn`
//! - `MedicationRequest.dispenseRequest.validityPeriod` (only when already present)

use crate::{FhirError, FhirResult, DEFAULT_VALIDITY_PERIOD_WEEKS, PRESCRIPTION_ID_EXTENSION_URL};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde_json::Value;

/// Field values to stamp into a prescription Bundle.
///
/// Fields left as `None` are not touched. The validity period is always reset when the
/// MedicationRequest already carries one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrescriptionUpdate {
    pub prescription_id: Option<String>,
    pub short_prescription_id: Option<String>,
    pub authored_on: Option<String>,
    pub signature_time: Option<String>,
    pub validity_start: NaiveDate,
    pub validity_weeks: u32,
}

impl PrescriptionUpdate {
    /// Creates an update that only resets validity periods, starting on `validity_start`.
    pub fn new(validity_start: NaiveDate) -> Self {
        Self {
            prescription_id: None,
            short_prescription_id: None,
            authored_on: None,
            signature_time: None,
            validity_start,
            validity_weeks: DEFAULT_VALIDITY_PERIOD_WEEKS,
        }
    }

    pub fn with_prescription_id(mut self, id: impl Into<String>) -> Self {
        self.prescription_id = Some(id.into());
        self
    }

    pub fn with_short_prescription_id(mut self, id: impl Into<String>) -> Self {
        self.short_prescription_id = Some(id.into());
        self
    }

    pub fn with_authored_on(mut self, authored_on: impl Into<String>) -> Self {
        self.authored_on = Some(authored_on.into());
        self
    }

    pub fn with_signature_time(mut self, signature_time: Option<String>) -> Self {
        self.signature_time = signature_time;
        self
    }

    pub fn with_validity_weeks(mut self, weeks: u32) -> Self {
        self.validity_weeks = weeks;
        self
    }

    /// Last day of the validity period.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidInput`] if the period runs past the last representable date.
    pub fn validity_end(&self) -> FhirResult<NaiveDate> {
        self.validity_start
            .checked_add_days(Days::new(u64::from(self.validity_weeks) * 7))
            .ok_or_else(|| {
                FhirError::InvalidInput(format!(
                    "validity period of {} weeks from {} is out of range",
                    self.validity_weeks, self.validity_start
                ))
            })
    }

    /// Applies the update to every Provenance and MedicationRequest entry of `bundle`.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if the bundle has no `entry` list, an entry has no `resource`
    /// object, a Provenance has no `signature` list while a signature time is set, or a
    /// MedicationRequest has no `groupIdentifier` while an identifier is set.
    pub fn apply(&self, bundle: &mut Value) -> FhirResult<()> {
        let entries = bundle
            .get_mut("entry")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| FhirError::MissingElement("Bundle.entry".into()))?;

        let mut updated = 0usize;
        for (index, entry) in entries.iter_mut().enumerate() {
            let resource = entry
                .get_mut("resource")
                .filter(|r| r.is_object())
                .ok_or_else(|| FhirError::MissingElement(format!("Bundle.entry[{index}].resource")))?;

            match resource_type(resource) {
                Some("Provenance") => self.apply_to_provenance(resource, index)?,
                Some("MedicationRequest") => self.apply_to_medication_request(resource, index)?,
                _ => continue,
            }
            updated += 1;
        }

        tracing::debug!(updated, "applied prescription update to bundle");
        Ok(())
    }

    fn apply_to_provenance(&self, provenance: &mut Value, index: usize) -> FhirResult<()> {
        let Some(signature_time) = &self.signature_time else {
            return Ok(());
        };

        let signatures = provenance
            .get_mut("signature")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| {
                FhirError::MissingElement(format!("Bundle.entry[{index}].resource.signature"))
            })?;

        for signature in signatures.iter_mut().filter_map(Value::as_object_mut) {
            signature.insert("when".into(), Value::String(signature_time.clone()));
        }

        Ok(())
    }

    fn apply_to_medication_request(&self, request: &mut Value, index: usize) -> FhirResult<()> {
        if self.prescription_id.is_some() || self.short_prescription_id.is_some() {
            let group_identifier = request
                .get_mut("groupIdentifier")
                .and_then(Value::as_object_mut)
                .ok_or_else(|| {
                    FhirError::MissingElement(format!(
                        "Bundle.entry[{index}].resource.groupIdentifier"
                    ))
                })?;

            if let Some(short_id) = &self.short_prescription_id {
                group_identifier.insert("value".into(), Value::String(short_id.clone()));
            }

            if let Some(long_id) = &self.prescription_id {
                let extensions = group_identifier
                    .get_mut("extension")
                    .and_then(Value::as_array_mut)
                    .into_iter()
                    .flatten()
                    .filter(|ext| {
                        ext.get("url").and_then(Value::as_str) == Some(PRESCRIPTION_ID_EXTENSION_URL)
                    });

                for extension in extensions {
                    let value_identifier = extension
                        .get_mut("valueIdentifier")
                        .and_then(Value::as_object_mut)
                        .ok_or_else(|| {
                            FhirError::MissingElement(format!(
                                "Bundle.entry[{index}].resource.groupIdentifier.extension.valueIdentifier"
                            ))
                        })?;
                    value_identifier.insert("value".into(), Value::String(long_id.clone()));
                }
            }
        }

        if let Some(authored_on) = &self.authored_on {
            if let Some(request) = request.as_object_mut() {
                request.insert("authoredOn".into(), Value::String(authored_on.clone()));
            }
        }

        let validity_period = request
            .get_mut("dispenseRequest")
            .and_then(|d| d.get_mut("validityPeriod"))
            .and_then(Value::as_object_mut);

        if let Some(period) = validity_period {
            period.insert("start".into(), Value::String(self.validity_start.to_string()));
            let end = self.validity_end()?;
            period.insert("end".into(), Value::String(end.to_string()));
        }

        Ok(())
    }
}

/// Returns the ODS code of the first HealthcareService in `bundle`.
///
/// This is the first `identifier[].value` of the first HealthcareService entry, the organisation
/// the short-form prescription id is built around.
///
/// # Errors
///
/// Returns [`FhirError::MissingElement`] if no HealthcareService carries an identifier value.
pub fn organisation_code(bundle: &Value) -> FhirResult<String> {
    bundle
        .get("entry")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.get("resource"))
        .filter(|resource| resource_type(resource) == Some("HealthcareService"))
        .find_map(|service| {
            service
                .get("identifier")
                .and_then(Value::as_array)
                .and_then(|ids| ids.first())
                .and_then(|id| id.get("value"))
                .and_then(Value::as_str)
        })
        .map(str::to_owned)
        .ok_or_else(|| {
            FhirError::MissingElement("HealthcareService.identifier.value".into())
        })
}

/// Renders an `authoredOn` timestamp as `YYYY-MM-DDTHH:MM:SS+00:00`.
pub fn format_authored_on(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S+00:00").to_string()
}

fn resource_type(resource: &Value) -> Option<&str> {
    resource.get("resourceType").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn repeat_dispensing_bundle() -> Value {
        json!({
            "resourceType": "Bundle",
            "id": "aef77afb-7e3c-427a-8657-2c427f71a271",
            "identifier": {"system": "https://tools.ietf.org/html/rfc4122", "value": "ea66ee9d-a981-432f-8c27-6907cbd99219"},
            "type": "message",
            "entry": [
                {
                    "fullUrl": "urn:uuid:a5d3f7f2-0d54-4b4c-9c9f-4e1a1f2b0b9e",
                    "resource": {
                        "resourceType": "MedicationRequest",
                        "id": "a54219b8-f741-4c47-b662-e4f8dfa49ab6",
                        "groupIdentifier": {
                            "extension": [
                                {
                                    "url": "https://fhir.nhs.uk/StructureDefinition/Extension-DM-PrescriptionId",
                                    "valueIdentifier": {
                                        "system": "https://fhir.nhs.uk/Id/prescription",
                                        "value": "OLD-LONG-ID"
                                    }
                                }
                            ],
                            "system": "https://fhir.nhs.uk/Id/prescription-order-number",
                            "value": "OLD-SHORT-ID"
                        },
                        "authoredOn": "2021-05-07T14:47:29+00:00",
                        "dispenseRequest": {
                            "validityPeriod": {"start": "2021-05-07", "end": "2021-06-04"},
                            "numberOfRepeatsAllowed": 5
                        }
                    }
                },
                {
                    "fullUrl": "urn:uuid:51793ac0-112f-46c7-a891-9af8cefb206e",
                    "resource": {
                        "resourceType": "MedicationRequest",
                        "groupIdentifier": {
                            "extension": [
                                {
                                    "url": "https://fhir.nhs.uk/StructureDefinition/Extension-PrescriptionType",
                                    "valueIdentifier": {"value": "untouched"}
                                },
                                {
                                    "url": "https://fhir.nhs.uk/StructureDefinition/Extension-DM-PrescriptionId",
                                    "valueIdentifier": {"value": "OLD-LONG-ID"}
                                }
                            ],
                            "value": "OLD-SHORT-ID"
                        },
                        "authoredOn": "2021-05-07T14:47:29+00:00",
                        "dispenseRequest": {"quantity": {"value": 28}}
                    }
                },
                {
                    "resource": {
                        "resourceType": "HealthcareService",
                        "identifier": [
                            {"system": "https://fhir.nhs.uk/Id/ods-organization-code", "value": "A99968"},
                            {"value": "SECOND"}
                        ]
                    }
                },
                {
                    "resource": {
                        "resourceType": "Provenance",
                        "signature": [
                            {"when": "2021-05-07T14:47:30+00:00", "who": {"reference": "urn:uuid:x"}},
                            {"when": "2021-05-07T14:47:31+00:00"}
                        ]
                    }
                }
            ]
        })
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn medication_requests(bundle: &Value) -> Vec<&Value> {
        bundle["entry"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| &e["resource"])
            .filter(|r| r["resourceType"] == "MedicationRequest")
            .collect()
    }

    #[test]
    fn test_updates_prescription_id_extension() {
        let mut bundle = repeat_dispensing_bundle();
        PrescriptionUpdate::new(today())
            .with_prescription_id("newValue")
            .apply(&mut bundle)
            .unwrap();

        for request in medication_requests(&bundle) {
            let extensions = request["groupIdentifier"]["extension"].as_array().unwrap();
            for extension in extensions {
                if extension["url"] == PRESCRIPTION_ID_EXTENSION_URL {
                    assert_eq!(extension["valueIdentifier"]["value"], "newValue");
                } else {
                    assert_eq!(extension["valueIdentifier"]["value"], "untouched");
                }
            }
            assert_eq!(request["groupIdentifier"]["value"], "OLD-SHORT-ID");
        }
    }

    #[test]
    fn test_updates_short_prescription_id() {
        let mut bundle = repeat_dispensing_bundle();
        PrescriptionUpdate::new(today())
            .with_short_prescription_id("newValue")
            .apply(&mut bundle)
            .unwrap();

        for request in medication_requests(&bundle) {
            assert_eq!(request["groupIdentifier"]["value"], "newValue");
        }
    }

    #[test]
    fn test_updates_signature_time() {
        let mut bundle = repeat_dispensing_bundle();
        PrescriptionUpdate::new(today())
            .with_signature_time(Some("newValue".into()))
            .apply(&mut bundle)
            .unwrap();

        let provenance = &bundle["entry"][3]["resource"];
        for signature in provenance["signature"].as_array().unwrap() {
            assert_eq!(signature["when"], "newValue");
        }
        assert_eq!(provenance["signature"][0]["who"]["reference"], "urn:uuid:x");
    }

    #[test]
    fn test_signature_time_none_leaves_provenance_untouched() {
        let mut bundle = repeat_dispensing_bundle();
        PrescriptionUpdate::new(today()).apply(&mut bundle).unwrap();

        assert_eq!(
            bundle["entry"][3]["resource"]["signature"][0]["when"],
            "2021-05-07T14:47:30+00:00"
        );
    }

    #[test]
    fn test_updates_authored_on() {
        let mut bundle = repeat_dispensing_bundle();
        PrescriptionUpdate::new(today())
            .with_authored_on("newValue")
            .apply(&mut bundle)
            .unwrap();

        for request in medication_requests(&bundle) {
            assert_eq!(request["authoredOn"], "newValue");
        }
    }

    #[test]
    fn test_sets_validity_period_for_four_weeks_from_start() {
        let mut bundle = repeat_dispensing_bundle();
        PrescriptionUpdate::new(today()).apply(&mut bundle).unwrap();

        let period = &bundle["entry"][0]["resource"]["dispenseRequest"]["validityPeriod"];
        assert_eq!(period["start"], "2026-10-19");
        assert_eq!(period["end"], "2026-11-16");
    }

    #[test]
    fn test_does_not_add_validity_period_when_absent() {
        let mut bundle = repeat_dispensing_bundle();
        PrescriptionUpdate::new(today()).apply(&mut bundle).unwrap();

        let dispense_request = &bundle["entry"][1]["resource"]["dispenseRequest"];
        assert!(dispense_request.get("validityPeriod").is_none());
        assert_eq!(dispense_request["quantity"]["value"], 28);
    }

    #[test]
    fn test_custom_validity_weeks() {
        let update = PrescriptionUpdate::new(today()).with_validity_weeks(1);

        assert_eq!(
            update.validity_end().unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 26).unwrap()
        );
    }

    #[test]
    fn test_validity_weeks_out_of_range_is_an_error() {
        let mut bundle = repeat_dispensing_bundle();
        let update = PrescriptionUpdate::new(today()).with_validity_weeks(u32::MAX);

        assert!(matches!(update.validity_end(), Err(FhirError::InvalidInput(_))));
        assert!(matches!(
            update.apply(&mut bundle),
            Err(FhirError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_apply_preserves_key_order() {
        let mut bundle = repeat_dispensing_bundle();
        PrescriptionUpdate::new(today())
            .with_short_prescription_id("X")
            .apply(&mut bundle)
            .unwrap();

        let keys: Vec<&String> = bundle["entry"][0]["resource"]["groupIdentifier"]
            .as_object()
            .unwrap()
            .keys()
            .collect();
        assert_eq!(keys, vec!["extension", "system", "value"]);
    }

    #[test]
    fn test_apply_requires_entry_list() {
        let mut not_a_bundle = json!({"resourceType": "Parameters"});

        let result = PrescriptionUpdate::new(today()).apply(&mut not_a_bundle);

        assert!(matches!(result, Err(FhirError::MissingElement(_))));
    }

    #[test]
    fn test_apply_requires_group_identifier_when_setting_ids() {
        let mut bundle = json!({
            "entry": [{"resource": {"resourceType": "MedicationRequest"}}]
        });

        let err = PrescriptionUpdate::new(today())
            .with_short_prescription_id("X")
            .apply(&mut bundle)
            .unwrap_err();

        assert!(err.to_string().contains("entry[0].resource.groupIdentifier"));
    }

    #[test]
    fn test_organisation_code_from_first_healthcare_service() {
        let bundle = repeat_dispensing_bundle();

        assert_eq!(organisation_code(&bundle).unwrap(), "A99968");
    }

    #[test]
    fn test_organisation_code_missing() {
        let bundle = json!({"entry": [{"resource": {"resourceType": "Patient"}}]});

        assert!(matches!(
            organisation_code(&bundle),
            Err(FhirError::MissingElement(_))
        ));
    }

    #[test]
    fn test_format_authored_on() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 9, 5, 3).unwrap();

        assert_eq!(format_authored_on(at), "2026-10-19T09:05:03+00:00");
    }
}
