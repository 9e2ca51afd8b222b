use crate::{
    DatabaseSettings, EmailSettings, LoggingSettings, NotificationSettings, RawSettings,
    TransferSettings, WorkerSettings,
};
use color_eyre::Result;
use std::path::{Path, PathBuf, absolute};

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub uploads: UploadSettings,
    pub remote: RemoteSettings,
    pub transfer: TransferSettings,
    pub worker: WorkerSettings,
    pub notifications: NotificationSettings,
    pub email: EmailSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub database_url: String,
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// Absolute root under which every user has their own folder.
    pub upload_root: PathBuf,
    pub manifest_file_name: String,
    pub status_file_name: String,
    pub log_file_name: String,
    pub sort_manifest: bool,
    pub paired_end: Option<bool>,
    pub project_name_prefix: String,
    pub log_tail_lines: usize,
}

/// Everything needed to talk to the remote sample repository.
///
/// Injected into the project resolver and the transfer transport, nothing reads
/// these values from the process environment afterwards.
#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub timeout_multiplier: u64,
    pub request_timeout_seconds: u64,
}

impl TryFrom<RawSettings> for AppSettings {
    type Error = color_eyre::Report;

    fn try_from(raw: RawSettings) -> Result<Self> {
        let uploads = UploadSettings {
            upload_root: absolute(&raw.uploads.upload_folder)?,
            manifest_file_name: raw.uploads.manifest_file_name,
            status_file_name: raw.uploads.status_file_name,
            log_file_name: raw.uploads.log_file_name,
            sort_manifest: raw.uploads.sort_manifest,
            paired_end: raw.uploads.paired_end,
            project_name_prefix: raw.uploads.project_name_prefix,
            log_tail_lines: raw.uploads.log_tail_lines,
        };
        let remote = RemoteSettings {
            base_url: raw.remote.base_url.trim_end_matches('/').to_owned(),
            client_id: raw.secrets.remote_client_id,
            client_secret: raw.secrets.remote_client_secret,
            username: raw.secrets.remote_username,
            password: raw.secrets.remote_password,
            timeout_multiplier: raw.remote.timeout_multiplier,
            request_timeout_seconds: raw.remote.request_timeout_seconds,
        };

        Ok(Self {
            uploads,
            remote,
            transfer: raw.transfer,
            worker: raw.worker,
            notifications: raw.notifications,
            email: raw.email,
            logging: raw.logging,
            database: raw.database,
            database_url: raw.secrets.database_url,
        })
    }
}

impl UploadSettings {
    /// The staging directory of one user.
    #[must_use]
    pub fn user_dir(&self, owner_email: &str) -> PathBuf {
        self.upload_root.join(owner_email)
    }

    /// The directory a submission with `folder_name` points at.
    #[must_use]
    pub fn folder_dir(&self, owner_email: &str, folder_name: &str) -> PathBuf {
        self.user_dir(owner_email).join(folder_name)
    }

    #[must_use]
    pub fn manifest_path(&self, folder: &Path) -> PathBuf {
        folder.join(&self.manifest_file_name)
    }

    #[must_use]
    pub fn status_path(&self, folder: &Path) -> PathBuf {
        folder.join(&self.status_file_name)
    }

    #[must_use]
    pub fn log_path(&self, folder: &Path) -> PathBuf {
        folder.join(&self.log_file_name)
    }
}

impl WorkerSettings {
    /// Seconds to wait before retry number `retries + 1` of a failed upload.
    #[must_use]
    pub fn retry_backoff_seconds(&self, retries: i32) -> i64 {
        let exponent = u32::try_from(retries.max(0)).unwrap_or(0);
        self.retry_base_seconds
            .saturating_mul(2_i64.saturating_pow(exponent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker_settings() -> WorkerSettings {
        WorkerSettings {
            concurrency: 2,
            max_retries: 5,
            retry_base_seconds: 60,
            poll_interval_ms: 3000,
            heartbeat_interval_seconds: 120,
            heartbeat_timeout_seconds: 300.,
            soft_time_limit_seconds: 82_800,
            hard_time_limit_seconds: 86_400,
            email_max_attempts: 3,
        }
    }

    #[test]
    fn retry_backoff_doubles_per_retry() {
        let settings = worker_settings();
        let delays: Vec<i64> = (0..5).map(|r| settings.retry_backoff_seconds(r)).collect();
        assert_eq!(delays, vec![60, 120, 240, 480, 960]);
    }

    #[test]
    fn folder_paths_nest_under_owner() {
        let uploads = UploadSettings {
            upload_root: PathBuf::from("/data/uploads"),
            manifest_file_name: "SampleList.csv".to_owned(),
            status_file_name: "irida_uploader_status.info".to_owned(),
            log_file_name: "irida-uploader.log".to_owned(),
            sort_manifest: true,
            paired_end: None,
            project_name_prefix: "QIB".to_owned(),
            log_tail_lines: 200,
        };
        let folder = uploads.folder_dir("ada@example.org", "run_1");
        assert_eq!(folder, PathBuf::from("/data/uploads/ada@example.org/run_1"));
        assert_eq!(
            uploads.status_path(&folder),
            PathBuf::from("/data/uploads/ada@example.org/run_1/irida_uploader_status.info")
        );
    }
}
