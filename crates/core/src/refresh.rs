//! Prescription fixture refresh.
//!
//! Stored prescriptions go stale: identifiers are reused and validity periods expire. This
//! module replays every successful prepare request in the corpus against a sandbox:
//!
//! 1. stamp a fresh long-form id, short-form id, `authoredOn` and validity period into the
//!    prepare request and save it
//! 2. send it to `$prepare`, save the response and read its signing timestamp
//! 3. stamp the same values plus the signing timestamp into each matching process request,
//!    save it, send it to `$convert` and save the XML response
//!
//! The sandbox itself sits behind [`SandboxClient`] so the workflow can run against a fake.

use crate::config::CoreConfig;
use crate::fixtures::{find_prepare_requests, process_requests_for, FixtureName};
use crate::{read_json, write_json, write_text, ToolError, ToolResult};
use chrono::{DateTime, NaiveDate, Utc};
use eps_identifiers::{LongFormId, ShortFormId};
use fhir::{format_authored_on, organisation_code, signature_timestamp, PrescriptionUpdate};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Operations the refresh workflow needs from a sandbox API.
pub trait SandboxClient {
    /// Sends a prepare request Bundle and returns the decoded `$prepare` response.
    fn prepare(&self, request: &Value) -> ToolResult<Value>;

    /// Sends a process request Bundle and returns the `$convert` response body.
    fn convert(&self, request: &Value) -> ToolResult<String>;
}

impl<C: SandboxClient + ?Sized> SandboxClient for &C {
    fn prepare(&self, request: &Value) -> ToolResult<Value> {
        (**self).prepare(request)
    }

    fn convert(&self, request: &Value) -> ToolResult<String> {
        (**self).convert(request)
    }
}

/// What was written for one prepare request and its process requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshedExchange {
    pub prepare_request: PathBuf,
    pub prepare_response: PathBuf,
    pub prescription_id: String,
    pub short_prescription_id: String,
    pub signature_time: String,
    /// Process requests paired with the convert responses written for them.
    pub process_requests: Vec<(PathBuf, PathBuf)>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub exchanges: Vec<RefreshedExchange>,
}

impl RefreshReport {
    /// Total number of files rewritten.
    pub fn files_written(&self) -> usize {
        self.exchanges
            .iter()
            .map(|e| 2 + 2 * e.process_requests.len())
            .sum()
    }
}

/// Service for refreshing stored prescription exchanges.
#[derive(Clone)]
pub struct RefreshService<C> {
    cfg: Arc<CoreConfig>,
    client: C,
}

impl<C: SandboxClient> RefreshService<C> {
    pub fn new(cfg: Arc<CoreConfig>, client: C) -> Self {
        Self { cfg, client }
    }

    /// Refreshes every successful prepare request under the configured examples root.
    ///
    /// All exchanges share one `authoredOn` value and validity start, both derived from `now`.
    /// Each exchange gets its own prescription ids.
    ///
    /// # Errors
    ///
    /// Stops at the first exchange that fails and returns its error. Exchanges already
    /// refreshed stay written.
    pub fn refresh_all(&self, now: DateTime<Utc>) -> ToolResult<RefreshReport> {
        let authored_on = format_authored_on(now);
        let today = now.date_naive();

        let prepare_requests = find_prepare_requests(self.cfg.examples_dir())?;
        tracing::info!(
            count = prepare_requests.len(),
            root = %self.cfg.examples_dir().display(),
            "refreshing prescription examples"
        );

        let mut report = RefreshReport::default();
        for prepare_request in prepare_requests {
            let exchange = self.refresh_exchange(&prepare_request, &authored_on, today)?;
            report.exchanges.push(exchange);
        }

        Ok(report)
    }

    /// Refreshes one prepare request and every process request of the same exchange.
    pub fn refresh_exchange(
        &self,
        prepare_request_path: &Path,
        authored_on: &str,
        today: NaiveDate,
    ) -> ToolResult<RefreshedExchange> {
        let prepare_name = FixtureName::from_path(prepare_request_path)?;
        let dir = prepare_request_path.parent().unwrap_or_else(|| Path::new("."));
        let prepare_response_path = dir.join(prepare_name.prepare_response()?.to_string());

        let prescription_id = LongFormId::new().to_string();
        let mut prepare_request = read_json(prepare_request_path)?;

        let org_code = organisation_code(&prepare_request).map_err(|source| ToolError::Fhir {
            path: prepare_request_path.to_path_buf(),
            source,
        })?;
        let short_prescription_id = ShortFormId::generate(&org_code)?.to_string();

        let update = PrescriptionUpdate::new(today)
            .with_validity_weeks(self.cfg.validity_weeks())
            .with_prescription_id(prescription_id.as_str())
            .with_short_prescription_id(short_prescription_id.as_str())
            .with_authored_on(authored_on);

        update
            .apply(&mut prepare_request)
            .map_err(|source| ToolError::Fhir {
                path: prepare_request_path.to_path_buf(),
                source,
            })?;
        write_json(prepare_request_path, &prepare_request)?;

        let prepare_response = self.client.prepare(&prepare_request)?;
        write_json(&prepare_response_path, &prepare_response)?;

        let signature_time =
            signature_timestamp(&prepare_response).map_err(|source| ToolError::Fhir {
                path: prepare_response_path.clone(),
                source,
            })?;

        let update = update.with_signature_time(Some(signature_time.clone()));
        let mut process_requests = Vec::new();

        for process_request_path in process_requests_for(prepare_request_path)? {
            let convert_name = FixtureName::from_path(&process_request_path)?.convert_response()?;
            let convert_response_path = dir.join(convert_name.to_string());

            let mut process_request = read_json(&process_request_path)?;
            update
                .apply(&mut process_request)
                .map_err(|source| ToolError::Fhir {
                    path: process_request_path.clone(),
                    source,
                })?;
            write_json(&process_request_path, &process_request)?;

            let converted = self.client.convert(&process_request)?;
            write_text(&convert_response_path, &converted)?;

            process_requests.push((process_request_path, convert_response_path));
        }

        tracing::info!(
            prepare_request = %prepare_request_path.display(),
            short_prescription_id = %short_prescription_id,
            process_requests = process_requests.len(),
            "refreshed prescription example"
        );

        Ok(RefreshedExchange {
            prepare_request: prepare_request_path.to_path_buf(),
            prepare_response: prepare_response_path,
            prescription_id,
            short_prescription_id,
            signature_time,
            process_requests,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    const SIGNATURE_TIME: &str = "2026-10-19T10:00:00+00:00";

    #[derive(Default)]
    struct FakeSandbox {
        prepared: RefCell<Vec<Value>>,
        converted: RefCell<Vec<Value>>,
    }

    impl SandboxClient for FakeSandbox {
        fn prepare(&self, request: &Value) -> ToolResult<Value> {
            self.prepared.borrow_mut().push(request.clone());
            Ok(json!({
                "resourceType": "Parameters",
                "parameter": [
                    {"name": "digest", "valueString": "ZGlnZXN0"},
                    {"name": "timestamp", "valueString": SIGNATURE_TIME}
                ]
            }))
        }

        fn convert(&self, request: &Value) -> ToolResult<String> {
            self.converted.borrow_mut().push(request.clone());
            Ok(format!(
                "<PORX_IN020101SM31>{}</PORX_IN020101SM31>",
                request["entry"][0]["resource"]["groupIdentifier"]["value"]
                    .as_str()
                    .unwrap_or_default()
            ))
        }
    }

    struct FailingSandbox;

    impl SandboxClient for FailingSandbox {
        fn prepare(&self, _request: &Value) -> ToolResult<Value> {
            Ok(json!({"resourceType": "OperationOutcome", "issue": []}))
        }

        fn convert(&self, _request: &Value) -> ToolResult<String> {
            Err(ToolError::Sandbox("unreachable".into()))
        }
    }

    fn bundle(with_provenance: bool) -> Value {
        let mut entries = vec![
            json!({"resource": {
                "resourceType": "MedicationRequest",
                "groupIdentifier": {
                    "extension": [{
                        "url": "https://fhir.nhs.uk/StructureDefinition/Extension-DM-PrescriptionId",
                        "valueIdentifier": {"value": "OLD"}
                    }],
                    "value": "OLD"
                },
                "authoredOn": "2021-01-01T00:00:00+00:00",
                "dispenseRequest": {"validityPeriod": {"start": "2021-01-01", "end": "2021-01-29"}}
            }}),
            json!({"resource": {
                "resourceType": "HealthcareService",
                "identifier": [{"value": "A83008"}]
            }}),
        ];
        if with_provenance {
            entries.push(json!({"resource": {
                "resourceType": "Provenance",
                "signature": [{"when": "2021-01-01T00:00:00+00:00"}]
            }}));
        }
        json!({"resourceType": "Bundle", "entry": entries})
    }

    fn write_bundle(path: &Path, with_provenance: bool) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string(&bundle(with_provenance)).unwrap()).unwrap();
    }

    fn read(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    fn test_cfg(root: &Path) -> Arc<CoreConfig> {
        Arc::new(
            CoreConfig::new(root.to_path_buf(), "FHIR/R4".into(), 4)
                .expect("CoreConfig::new should succeed"),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap()
    }

    #[test]
    fn refresh_all_rewrites_exchange() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let dir = temp_dir.path().join("primary-care/acute");
        let prepare_request = dir.join("1-Prepare-Request-200_OK.json");
        let process_request = dir.join("1-Process-Request-Send-200_OK.json");
        write_bundle(&prepare_request, false);
        write_bundle(&process_request, true);

        let sandbox = FakeSandbox::default();
        let service = RefreshService::new(test_cfg(temp_dir.path()), &sandbox);

        let report = service.refresh_all(now()).expect("refresh should succeed");

        assert_eq!(report.exchanges.len(), 1);
        assert_eq!(report.files_written(), 4);
        let exchange = &report.exchanges[0];
        assert_eq!(exchange.signature_time, SIGNATURE_TIME);
        assert!(exchange.short_prescription_id.contains("-A83008-"));

        let saved_prepare = read(&prepare_request);
        let request = &saved_prepare["entry"][0]["resource"];
        assert_eq!(request["groupIdentifier"]["value"], exchange.short_prescription_id.as_str());
        assert_eq!(
            request["groupIdentifier"]["extension"][0]["valueIdentifier"]["value"],
            exchange.prescription_id.as_str()
        );
        assert_eq!(request["authoredOn"], "2026-10-19T09:30:00+00:00");
        assert_eq!(request["dispenseRequest"]["validityPeriod"]["start"], "2026-10-19");
        assert_eq!(request["dispenseRequest"]["validityPeriod"]["end"], "2026-11-16");

        let saved_response = read(&dir.join("1-Prepare-Response-200_OK.json"));
        assert_eq!(saved_response["resourceType"], "Parameters");

        let saved_process = read(&process_request);
        assert_eq!(saved_process["entry"][2]["resource"]["signature"][0]["when"], SIGNATURE_TIME);
        assert_eq!(
            saved_process["entry"][0]["resource"]["groupIdentifier"]["value"],
            exchange.short_prescription_id.as_str()
        );

        let xml = fs::read_to_string(dir.join("1-Convert-Response-Send-200_OK.xml")).unwrap();
        assert_eq!(
            xml,
            format!("<PORX_IN020101SM31>{}</PORX_IN020101SM31>", exchange.short_prescription_id)
        );

        assert_eq!(sandbox.prepared.borrow().len(), 1);
        assert_eq!(sandbox.converted.borrow().len(), 1);
    }

    #[test]
    fn refresh_all_sends_prepare_request_without_signature_update() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let prepare_request = temp_dir.path().join("1-Prepare-Request-200_OK.json");
        let original = bundle(true);
        fs::write(&prepare_request, serde_json::to_string(&original).unwrap()).unwrap();

        let sandbox = FakeSandbox::default();
        RefreshService::new(test_cfg(temp_dir.path()), &sandbox)
            .refresh_all(now())
            .expect("refresh should succeed");

        let prepared = sandbox.prepared.borrow();
        assert_eq!(prepared[0]["entry"][2], original["entry"][2]);
    }

    #[test]
    fn each_exchange_gets_its_own_ids() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        write_bundle(&temp_dir.path().join("a/1-Prepare-Request-200_OK.json"), false);
        write_bundle(&temp_dir.path().join("b/1-Prepare-Request-200_OK.json"), false);

        let sandbox = FakeSandbox::default();
        let report = RefreshService::new(test_cfg(temp_dir.path()), &sandbox)
            .refresh_all(now())
            .expect("refresh should succeed");

        assert_eq!(report.exchanges.len(), 2);
        assert_ne!(
            report.exchanges[0].prescription_id,
            report.exchanges[1].prescription_id
        );
        assert_eq!(report.files_written(), 4);
    }

    #[test]
    fn malformed_prepare_request_name_does_not_abort_run() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let stray = temp_dir.path().join("x-Prepare-Request-a-200_OK-b.json");
        write_bundle(&temp_dir.path().join("1-Prepare-Request-200_OK.json"), false);
        write_bundle(&stray, false);

        let sandbox = FakeSandbox::default();
        let report = RefreshService::new(test_cfg(temp_dir.path()), &sandbox)
            .refresh_all(now())
            .expect("refresh should succeed");

        assert_eq!(report.exchanges.len(), 1);
        assert_eq!(sandbox.prepared.borrow().len(), 1);
        assert_eq!(read(&stray)["entry"][0]["resource"]["groupIdentifier"]["value"], "OLD");
    }

    #[test]
    fn missing_signature_timestamp_fails_after_saving_response() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let prepare_request = temp_dir.path().join("1-Prepare-Request-200_OK.json");
        write_bundle(&prepare_request, false);

        let err = RefreshService::new(test_cfg(temp_dir.path()), FailingSandbox)
            .refresh_all(now())
            .unwrap_err();

        assert!(matches!(err, ToolError::Fhir { .. }));
        let saved = read(&temp_dir.path().join("1-Prepare-Response-200_OK.json"));
        assert_eq!(saved["resourceType"], "OperationOutcome");
    }

    #[test]
    fn missing_organisation_code_is_reported_with_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let prepare_request = temp_dir.path().join("1-Prepare-Request-200_OK.json");
        fs::write(&prepare_request, r#"{"resourceType": "Bundle", "entry": []}"#).unwrap();

        let err = RefreshService::new(test_cfg(temp_dir.path()), FakeSandbox::default())
            .refresh_all(now())
            .unwrap_err();

        assert!(err.to_string().contains("1-Prepare-Request-200_OK.json"));
    }

    #[test]
    fn empty_corpus_is_a_no_op() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let report = RefreshService::new(test_cfg(temp_dir.path()), FakeSandbox::default())
            .refresh_all(now())
            .expect("refresh should succeed");

        assert_eq!(report, RefreshReport::default());
    }
}
