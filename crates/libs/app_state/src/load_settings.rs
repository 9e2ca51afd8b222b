use crate::{AppSettings, RawSettings};
use color_eyre::eyre::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

const DEFAULT_CONFIG_PATH: &str = "config/settings.yaml";

/// Loads settings from `config/settings.yaml`, overridden by `APP__SECTION__KEY` variables.
pub fn load_app_settings() -> Result<AppSettings> {
    // Need to load from dotenv to get it to overwrite the secrets from env.
    dotenv::from_path(".env").ok();
    let config_path = std::env::var("APP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
    load_app_settings_from(Path::new(&config_path))
}

pub fn load_app_settings_from(config_path: &Path) -> Result<AppSettings> {
    let config_path = config_path
        .canonicalize()
        .wrap_err_with(|| format!("Config file not found: {}", config_path.display()))?;
    debug!("Loading settings from {}", config_path.display());

    let builder = config::Config::builder()
        .add_source(config::File::from(config_path))
        .add_source(
            config::Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        );

    let raw_settings = builder.build()?.try_deserialize::<RawSettings>()?;
    let settings = AppSettings::try_from(raw_settings)?;

    fs::create_dir_all(&settings.uploads.upload_root)
        .wrap_err("Cannot create upload root folder")?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS_YAML: &str = r"
uploads:
  upload_folder: UPLOAD_ROOT
  manifest_file_name: SampleList.csv
  status_file_name: irida_uploader_status.info
  log_file_name: irida-uploader.log
  sort_manifest: true
  project_name_prefix: QIB
  log_tail_lines: 200
remote:
  base_url: https://irida.example.org/irida/
  timeout_multiplier: 10
  request_timeout_seconds: 60
transfer:
  command: irida-uploader
  upload_mode: default
  detail_lines: 20
worker:
  concurrency: 2
  max_retries: 5
  retry_base_seconds: 60
  poll_interval_ms: 3000
  heartbeat_interval_seconds: 120
  heartbeat_timeout_seconds: 300
  soft_time_limit_seconds: 82800
  hard_time_limit_seconds: 86400
  email_max_attempts: 3
notifications:
  queue_refresh_seconds: 5
  unread_limit: 5
email:
  from_address: no-reply@example.org
logging:
  level: info
database:
  max_connections: 10
  min_connection: 1
  max_lifetime: 1800
  idle_timeout: 600
  acquire_timeout: 30
secrets:
  database_url: postgres://localhost/uploads
  remote_client_id: client
  remote_client_secret: secret
  remote_username: user
  remote_password: password
";

    #[test]
    fn loads_yaml_and_creates_upload_root() -> Result<()> {
        // ARRANGE
        let dir = tempfile::tempdir()?;
        let upload_root = dir.path().join("uploads");
        let config_path = dir.path().join("settings.yaml");
        let yaml = SETTINGS_YAML.replace("UPLOAD_ROOT", &upload_root.to_string_lossy());
        fs::write(&config_path, yaml)?;

        // ACT
        let settings = load_app_settings_from(&config_path)?;

        // ASSERT
        assert!(upload_root.is_dir());
        assert_eq!(settings.uploads.upload_root, upload_root);
        assert_eq!(settings.remote.base_url, "https://irida.example.org/irida");
        assert_eq!(settings.remote.client_id, "client");
        assert_eq!(settings.worker.concurrency, 2);
        Ok(())
    }
}
