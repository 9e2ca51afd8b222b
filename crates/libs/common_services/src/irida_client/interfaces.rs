use crate::irida_client::RemoteError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteProject {
    pub identifier: String,
    pub name: String,
}

/// The project calls the upload pipeline makes against the remote repository.
#[async_trait]
pub trait ProjectApi: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<RemoteProject>, RemoteError>;

    /// Creates a project and returns its identifier.
    async fn create_project(&self, name: &str, description: &str) -> Result<String, RemoteError>;
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// Every payload of the remote REST API is wrapped in a `resource` object.
#[derive(Debug, Deserialize)]
pub struct ResourceEnvelope<T> {
    pub resource: T,
}

#[derive(Debug, Deserialize)]
pub struct ResourceList<T> {
    pub resources: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectResource {
    /// Sent as a string by some server versions and as a number by others.
    pub identifier: Value,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest<'a> {
    pub name: &'a str,
    pub project_description: &'a str,
}

impl ProjectResource {
    pub fn into_project(self) -> Result<RemoteProject, RemoteError> {
        Ok(RemoteProject {
            identifier: identifier_to_string(&self.identifier)?,
            name: self.name,
        })
    }
}

pub fn identifier_to_string(identifier: &Value) -> Result<String, RemoteError> {
    match identifier {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(RemoteError::Decode(format!(
            "project identifier has unexpected shape: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::Result;
    use serde_json::json;

    #[test]
    fn numeric_and_string_identifiers_both_parse() -> Result<()> {
        let body = json!({
            "resource": {
                "resources": [
                    {"identifier": "12", "name": "alpha"},
                    {"identifier": 13, "name": "beta"}
                ]
            }
        });

        let envelope: ResourceEnvelope<ResourceList<ProjectResource>> = serde_json::from_value(body)?;
        let projects = envelope
            .resource
            .resources
            .into_iter()
            .map(ProjectResource::into_project)
            .collect::<Result<Vec<_>, _>>()?;

        assert_eq!(projects[0].identifier, "12");
        assert_eq!(projects[1].identifier, "13");
        assert!(identifier_to_string(&json!(null)).is_err());
        Ok(())
    }
}
