use crate::irida_client::{ProjectApi, RemoteError};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

/// Looks up remote projects by name and creates the ones that don't exist yet.
#[derive(Clone)]
pub struct ProjectResolver {
    api: Arc<dyn ProjectApi>,
}

#[must_use]
pub fn default_project_description(date: NaiveDate) -> String {
    format!("Created on {} via the upload portal", date.format("%Y-%m-%d"))
}

impl ProjectResolver {
    #[must_use]
    pub fn new(api: Arc<dyn ProjectApi>) -> Self {
        Self { api }
    }

    /// Returns the id of the first project named `name`, creating it if there is none.
    pub async fn resolve_or_create(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<String, RemoteError> {
        let projects = self.api.list_projects().await?;
        if let Some(existing) = projects.into_iter().find(|p| p.name == name) {
            info!("Project {name} already exists with id {}", existing.identifier);
            return Ok(existing.identifier);
        }

        let description = description.map_or_else(
            || default_project_description(chrono::Local::now().date_naive()),
            str::to_owned,
        );
        info!("Project {name} doesn't exist, creating it");
        self.api.create_project(name, &description).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticProjectApi;
    use color_eyre::Result;

    #[tokio::test]
    async fn existing_project_is_reused() -> Result<()> {
        // ARRANGE
        let api = Arc::new(StaticProjectApi::with_projects(&[
            ("3", "other"),
            ("4", "run-1"),
            ("5", "run-1"),
        ]));
        let resolver = ProjectResolver::new(api.clone());

        // ACT
        let id = resolver.resolve_or_create("run-1", None).await?;

        // ASSERT
        assert_eq!(id, "4");
        assert!(api.created().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn missing_project_is_created_with_default_description() -> Result<()> {
        let api = Arc::new(StaticProjectApi::with_projects(&[("3", "other")]));
        let resolver = ProjectResolver::new(api.clone());

        let id = resolver.resolve_or_create("run-2", None).await?;

        let created = api.created().await;
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].0, "run-2");
        assert!(created[0].1.starts_with("Created on "));
        assert!(created[0].1.ends_with(" via the upload portal"));
        assert_eq!(id, "100");
        Ok(())
    }

    #[tokio::test]
    async fn remote_failures_propagate() -> Result<()> {
        let api = Arc::new(StaticProjectApi::failing());
        let resolver = ProjectResolver::new(api);

        let result = resolver.resolve_or_create("run-3", Some("desc")).await;

        assert!(matches!(result, Err(RemoteError::Server { status: 503, .. })));
        Ok(())
    }

    #[test]
    fn description_formats_iso_date() -> Result<()> {
        let date = NaiveDate::from_ymd_opt(2025, 1, 9)
            .ok_or_else(|| color_eyre::eyre::eyre!("bad date"))?;
        assert_eq!(
            default_project_description(date),
            "Created on 2025-01-09 via the upload portal"
        );
        Ok(())
    }
}
