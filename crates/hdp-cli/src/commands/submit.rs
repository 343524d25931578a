//! `hdp submit` command implementation

use crate::error::{CliError, Result};
use colored::Colorize;
use hdp_common::types::PackageKind;
use hdp_staging::StagingService;
use serde_json::Value;

/// Stage one payload by hand
pub async fn run(
    service: &StagingService,
    kind: &str,
    correlation_key: &str,
    payload: &str,
) -> Result<()> {
    let kind: PackageKind = kind.parse().map_err(|_| {
        CliError::invalid_argument(format!(
            "'{kind}' is not a package kind (expected entity-record, measurement-batch, or document-batch)"
        ))
    })?;
    let payload = parse_payload(payload)?;

    let id = service.submit(kind, correlation_key, payload)?;

    println!("{} {}", "Staged".green().bold(), id);
    println!("The package is durable; it will drain on the next pass.");
    Ok(())
}

/// Inline JSON, or `@path` to read the payload from a file
fn parse_payload(raw: &str) -> Result<Value> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)?,
        None => raw.to_string(),
    };
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inline_payload() {
        let value = parse_payload(r#"{"value": 140}"#).unwrap();
        assert_eq!(value["value"], 140);
    }

    #[test]
    fn test_parse_payload_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.json");
        std::fs::write(&path, r#"{"value": 98}"#).unwrap();

        let value = parse_payload(&format!("@{}", path.display())).unwrap();
        assert_eq!(value["value"], 98);
    }

    #[test]
    fn test_parse_payload_rejects_bad_json() {
        assert!(matches!(
            parse_payload("{nope"),
            Err(CliError::JsonParse(_))
        ));
    }
}
