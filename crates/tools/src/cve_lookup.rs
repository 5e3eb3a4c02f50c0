//! CVE lookup worker backed by the CISA Known Exploited Vulnerabilities catalog.
//!
//! Downloads the KEV JSON feed on every call and returns the records whose
//! `cveID` matches one of the requested identifiers.

use async_trait::async_trait;
use patternrun_core::error::ToolError;
use patternrun_core::tool::{Tool, ToolArgs};
use serde_json::Value;
use tracing::debug;

const DOCUMENTATION: &str = "\
Looks up information for specified CVEs from CISA's known exploited vulnerabilities catalog.

Args:
    cve_list (str): A comma-separated string of CVE IDs to look up.

Returns:
    A JSON array with one record per matching CVE (vendor, product, description,
    required action, due date, ransomware use). CVEs not in the catalog are omitted.

Example Usage:
    [[WORKER: {\"name\": \"cve_lookup\", \"args\": {\"cve_list\": \"CVE-2024-43573,CVE-2023-12345\"}}]]";

pub struct CveLookupTool {
    client: reqwest::Client,
    catalog_url: String,
}

impl CveLookupTool {
    pub fn new(client: reqwest::Client, catalog_url: impl Into<String>) -> Self {
        Self {
            client,
            catalog_url: catalog_url.into(),
        }
    }

    async fn fetch_catalog(&self) -> Result<Value, ToolError> {
        let failed = |reason: String| ToolError::ExecutionFailed {
            tool_name: "cve_lookup".into(),
            reason,
        };

        let response = self
            .client
            .get(&self.catalog_url)
            .send()
            .await
            .map_err(|e| failed(format!("Unable to download CVE data: {e}")))?;

        if !response.status().is_success() {
            return Err(failed(format!(
                "Unable to download CVE data (status {})",
                response.status().as_u16()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| failed(format!("CVE catalog is not valid JSON: {e}")))
    }
}

#[async_trait]
impl Tool for CveLookupTool {
    fn name(&self) -> &str {
        "cve_lookup"
    }

    fn documentation(&self) -> &str {
        DOCUMENTATION
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let raw = args
            .get("cve_list")
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'cve_list' argument".into()))?;

        let ids = parse_cve_list(raw);
        if ids.is_empty() {
            return Err(ToolError::InvalidArguments(
                "'cve_list' contains no CVE IDs".into(),
            ));
        }

        let catalog = self.fetch_catalog().await?;
        let matches = filter_catalog(&catalog, &ids)?;
        debug!(requested = ids.len(), found = matches.len(), "CVE lookup complete");
        Ok(Value::Array(matches))
    }
}

/// Split a comma-separated list into normalized CVE IDs.
fn parse_cve_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|id| id.trim().to_uppercase())
        .filter(|id| !id.is_empty())
        .collect()
}

/// Select catalog records whose `cveID` is in `ids`, in catalog order.
fn filter_catalog(catalog: &Value, ids: &[String]) -> Result<Vec<Value>, ToolError> {
    let records = catalog["vulnerabilities"]
        .as_array()
        .ok_or_else(|| ToolError::ExecutionFailed {
            tool_name: "cve_lookup".into(),
            reason: "CVE catalog has no 'vulnerabilities' array".into(),
        })?;

    Ok(records
        .iter()
        .filter(|record| {
            record["cveID"]
                .as_str()
                .is_some_and(|id| ids.iter().any(|wanted| wanted == id))
        })
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> Value {
        serde_json::json!({
            "title": "CISA Catalog of Known Exploited Vulnerabilities",
            "catalogVersion": "2024.10.08",
            "vulnerabilities": [
                {"cveID": "CVE-2024-43573", "vendorProject": "Microsoft", "product": "Windows"},
                {"cveID": "CVE-2021-44228", "vendorProject": "Apache", "product": "Log4j2"},
                {"cveID": "CVE-2023-4966", "vendorProject": "Citrix", "product": "NetScaler"}
            ]
        })
    }

    #[test]
    fn cve_list_is_trimmed_and_normalized() {
        assert_eq!(
            parse_cve_list(" cve-2024-43573 , CVE-2021-44228,,"),
            vec!["CVE-2024-43573", "CVE-2021-44228"]
        );
        assert!(parse_cve_list(" , ").is_empty());
    }

    #[test]
    fn filter_keeps_catalog_order_and_drops_unknown_ids() {
        let ids = vec![
            "CVE-2023-4966".to_string(),
            "CVE-2024-43573".to_string(),
            "CVE-1999-0001".to_string(),
        ];
        let matches = filter_catalog(&sample_catalog(), &ids).unwrap();
        let found: Vec<&str> = matches.iter().map(|r| r["cveID"].as_str().unwrap()).collect();
        assert_eq!(found, vec!["CVE-2024-43573", "CVE-2023-4966"]);
        assert_eq!(matches[1]["vendorProject"], "Citrix");
    }

    #[test]
    fn catalog_without_vulnerabilities_is_an_error() {
        let err =
            filter_catalog(&serde_json::json!({"title": "x"}), &["CVE-1".into()]).unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }

    #[tokio::test]
    async fn missing_argument_is_rejected_before_any_request() {
        let tool = CveLookupTool::new(reqwest::Client::new(), "http://127.0.0.1:9/never");
        let err = tool.execute(ToolArgs::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));

        let mut args = ToolArgs::new();
        args.insert("cve_list".into(), " , ".into());
        let err = tool.execute(args).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
