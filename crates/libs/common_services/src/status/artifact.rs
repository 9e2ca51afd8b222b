//! The `irida_uploader_status.info` file the uploader tool leaves in every folder it touched.

use common_types::UploadedSample;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtifactState {
    #[default]
    Pending,
    Partial,
    Complete,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TransferStatusRecord {
    #[serde(rename = "Run ID", default, deserialize_with = "lenient_string")]
    pub run_id: Option<String>,
    #[serde(rename = "Upload Status", default, deserialize_with = "artifact_state")]
    pub upload_state: ArtifactState,
    #[serde(rename = "Sample Status", default, deserialize_with = "lenient_samples")]
    pub samples: Vec<SampleTransferStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SampleTransferStatus {
    #[serde(rename = "Sample Name", default)]
    pub sample_name: String,
    #[serde(rename = "Project ID", default, deserialize_with = "lenient_string")]
    pub project_id: Option<String>,
    #[serde(rename = "Uploaded", default, deserialize_with = "lenient_bool")]
    pub uploaded: bool,
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

fn artifact_state<'de, D: Deserializer<'de>>(d: D) -> Result<ArtifactState, D::Error> {
    let state = lenient_string(d)?.unwrap_or_default().to_lowercase();
    Ok(match state.as_str() {
        "complete" => ArtifactState::Complete,
        "partial" => ArtifactState::Partial,
        _ => ArtifactState::Pending,
    })
}

/// Skips sample entries that aren't objects instead of rejecting the whole file.
fn lenient_samples<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Vec<SampleTransferStatus>, D::Error> {
    let Some(Value::Array(items)) = Option::<Value>::deserialize(d)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

impl TransferStatusRecord {
    #[must_use]
    pub fn total_samples(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn uploaded_count(&self) -> usize {
        self.samples.iter().filter(|s| s.uploaded).count()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.total_samples().saturating_sub(self.uploaded_count())
    }

    /// Confirmed samples in artifact order.
    #[must_use]
    pub fn uploaded_samples(&self) -> Vec<UploadedSample> {
        self.samples
            .iter()
            .filter(|s| s.uploaded)
            .map(|s| UploadedSample {
                name: s.sample_name.clone(),
                project_id: s.project_id.clone().unwrap_or_default(),
            })
            .collect()
    }

    /// Project of the first uploaded sample.
    #[must_use]
    pub fn first_project_id(&self) -> Option<&str> {
        self.samples
            .iter()
            .filter(|s| s.uploaded)
            .find_map(|s| s.project_id.as_deref())
    }
}

/// Reads the status artifact at `path`.
///
/// A missing or unreadable artifact means there is no prior state, so this never fails.
#[must_use]
pub fn read_status_artifact(path: &Path) -> Option<TransferStatusRecord> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("Could not read status artifact {}: {e}", path.display());
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Ignoring unparseable status artifact {}: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::Result;
    use std::fs;

    #[test]
    fn parses_uploader_output() -> Result<()> {
        // ARRANGE
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("irida_uploader_status.info");
        fs::write(
            &path,
            r#"{
                "Upload Status": "PARTIAL",
                "Date Time": "2025-03-01 10:00",
                "Run ID": 88,
                "Sample Status": [
                    {"Sample Name": "S1", "Project ID": "5", "Uploaded": "True"},
                    {"Sample Name": "S2", "Project ID": "5", "Uploaded": "False"},
                    {"Sample Name": "S3", "Project ID": 5, "Uploaded": true},
                    "garbage"
                ]
            }"#,
        )?;

        // ACT
        let record = read_status_artifact(&path);

        // ASSERT
        let record = record.ok_or_else(|| color_eyre::eyre::eyre!("no record"))?;
        assert_eq!(record.upload_state, ArtifactState::Partial);
        assert_eq!(record.run_id.as_deref(), Some("88"));
        assert_eq!(record.total_samples(), 3);
        assert_eq!(record.uploaded_count(), 2);
        assert_eq!(record.remaining(), 1);
        assert_eq!(record.first_project_id(), Some("5"));
        assert_eq!(
            record.uploaded_samples(),
            vec![
                UploadedSample {
                    name: "S1".to_owned(),
                    project_id: "5".to_owned()
                },
                UploadedSample {
                    name: "S3".to_owned(),
                    project_id: "5".to_owned()
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn missing_or_broken_artifact_is_no_state() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("irida_uploader_status.info");

        assert!(read_status_artifact(&path).is_none());

        fs::write(&path, "{ not json")?;
        assert!(read_status_artifact(&path).is_none());
        Ok(())
    }

    #[test]
    fn unknown_state_is_pending() -> Result<()> {
        let record: TransferStatusRecord =
            serde_json::from_str(r#"{"Upload Status": "processing"}"#)?;
        assert_eq!(record.upload_state, ArtifactState::Pending);
        assert!(record.samples.is_empty());
        assert!(record.run_id.is_none());
        Ok(())
    }
}
