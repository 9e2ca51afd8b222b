//! In-memory stand-ins for the database, the remote repository and the uploader tool.

use crate::database::app_user::User;
use crate::database::notification::{NewNotification, Notification};
use crate::database::upload::{NewUpload, Upload};
use crate::database::{DbError, NotificationRepository, UploadRepository};
use crate::irida_client::{ProjectApi, RemoteError, RemoteProject};
use crate::job_queue::JobQueue;
use crate::transfer::{
    TransferError, TransferEvent, TransferEventSink, TransferReport, TransferRequest, Transport,
};
use async_trait::async_trait;
use chrono::Utc;
use common_types::{EmailPayload, NotificationKind, ProcessUploadPayload, UploadStatus};
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::Mutex;

pub const STATUS_FILE_NAME: &str = "irida_uploader_status.info";

/// A fresh `submitted` upload that isn't stored anywhere.
#[must_use]
pub fn upload_fixture(id: i64, user_id: i32, folder_name: &str) -> Upload {
    let now = Utc::now();
    Upload {
        id,
        user_id,
        folder_name: folder_name.to_owned(),
        project_name: None,
        status: UploadStatus::Submitted,
        created_at: now,
        updated_at: now,
        retry_count: 0,
        task_handle: None,
        remote_project_id: None,
        remote_run_id: None,
        sample_count: 0,
        uploaded_samples: Vec::new(),
    }
}

#[derive(Default)]
struct MemoryState {
    users: Vec<User>,
    uploads: Vec<Upload>,
    notifications: Vec<Notification>,
    emails: Vec<EmailPayload>,
    upload_jobs: Vec<ProcessUploadPayload>,
    live_jobs: HashSet<i64>,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Repositories and job queue backed by vectors.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub async fn add_user(&self, email: &str) -> User {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let user = User {
            id: i32::try_from(state.next_id()).unwrap_or(i32::MAX),
            email: email.to_owned(),
            name: email.split('@').next().unwrap_or(email).to_owned(),
            created_at: now,
            updated_at: now,
        };
        state.users.push(user.clone());
        user
    }

    pub async fn insert_upload(&self, user_id: i32, folder_name: &str) -> Upload {
        let mut state = self.state.lock().await;
        let upload = upload_fixture(state.next_id(), user_id, folder_name);
        state.uploads.push(upload.clone());
        upload
    }

    /// Replaces (or adds) an upload without touching `updated_at`.
    pub async fn put_upload(&self, upload: Upload) {
        let mut state = self.state.lock().await;
        state.uploads.retain(|u| u.id != upload.id);
        state.uploads.push(upload);
    }

    pub async fn upload(&self, upload_id: i64) -> Option<Upload> {
        let state = self.state.lock().await;
        state.uploads.iter().find(|u| u.id == upload_id).cloned()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.lock().await.notifications.clone()
    }

    pub async fn emails(&self) -> Vec<EmailPayload> {
        self.state.lock().await.emails.clone()
    }

    pub async fn upload_jobs(&self) -> Vec<ProcessUploadPayload> {
        self.state.lock().await.upload_jobs.clone()
    }

    pub async fn set_live_job(&self, upload_id: i64, live: bool) {
        let mut state = self.state.lock().await;
        if live {
            state.live_jobs.insert(upload_id);
        } else {
            state.live_jobs.remove(&upload_id);
        }
    }
}

#[async_trait]
impl UploadRepository for MemoryStore {
    async fn find_user(&self, user_id: i32) -> Result<Option<User>, DbError> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn create_upload(&self, new_upload: NewUpload) -> Result<Upload, DbError> {
        let mut state = self.state.lock().await;
        let mut upload = upload_fixture(state.next_id(), new_upload.user_id, &new_upload.folder_name);
        upload.project_name = new_upload.project_name;
        state.uploads.push(upload.clone());
        Ok(upload)
    }

    async fn find_upload(&self, upload_id: i64) -> Result<Option<Upload>, DbError> {
        Ok(self.upload(upload_id).await)
    }

    async fn save_upload(&self, upload: &Upload) -> Result<Upload, DbError> {
        let mut state = self.state.lock().await;
        let Some(stored) = state.uploads.iter_mut().find(|u| u.id == upload.id) else {
            return Err(DbError::Sqlx(sqlx::Error::RowNotFound));
        };
        *stored = upload.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn uploads_for_user(&self, user_id: i32) -> Result<Vec<Upload>, DbError> {
        let state = self.state.lock().await;
        let mut uploads: Vec<Upload> = state
            .uploads
            .iter()
            .filter(|u| u.user_id == user_id)
            .cloned()
            .collect();
        uploads.sort_by_key(|u| std::cmp::Reverse((u.created_at, u.id)));
        Ok(uploads)
    }

    async fn active_uploads(&self) -> Result<Vec<Upload>, DbError> {
        let state = self.state.lock().await;
        let mut uploads: Vec<Upload> = state
            .uploads
            .iter()
            .filter(|u| u.status.is_active())
            .cloned()
            .collect();
        uploads.sort_by_key(|u| (u.created_at, u.id));
        Ok(uploads)
    }

    async fn has_live_job(&self, upload_id: i64) -> Result<bool, DbError> {
        Ok(self.state.lock().await.live_jobs.contains(&upload_id))
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, DbError> {
        let mut state = self.state.lock().await;
        let stored = Notification {
            id: state.next_id(),
            user_id: notification.user_id,
            upload_id: notification.upload_id,
            title: notification.title,
            message: notification.message,
            kind: notification.kind,
            read: false,
            created_at: Utc::now(),
        };
        state.notifications.push(stored.clone());
        Ok(stored)
    }

    async fn upsert_queue_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, DbError> {
        {
            let mut state = self.state.lock().await;
            if let Some(existing) = state.notifications.iter_mut().find(|n| {
                n.kind == NotificationKind::Info
                    && n.user_id == notification.user_id
                    && n.upload_id == notification.upload_id
            }) {
                existing.title = notification.title;
                existing.message = notification.message;
                return Ok(existing.clone());
            }
        }
        self.create_notification(NewNotification {
            kind: NotificationKind::Info,
            ..notification
        })
        .await
    }

    async fn unread_notifications(
        &self,
        user_id: i32,
        limit: i64,
    ) -> Result<Vec<Notification>, DbError> {
        let state = self.state.lock().await;
        let mut unread: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.read)
            .cloned()
            .collect();
        unread.sort_by_key(|n| std::cmp::Reverse((n.created_at, n.id)));
        unread.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(unread)
    }

    async fn mark_notification_read(
        &self,
        user_id: i32,
        notification_id: i64,
    ) -> Result<bool, DbError> {
        let mut state = self.state.lock().await;
        let found = state
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.user_id == user_id);
        Ok(found.map(|n| n.read = true).is_some())
    }
}

#[async_trait]
impl JobQueue for MemoryStore {
    async fn enqueue_upload(&self, payload: &ProcessUploadPayload) -> Result<Option<i64>, DbError> {
        let mut state = self.state.lock().await;
        if state.live_jobs.contains(&payload.upload_id) {
            return Ok(None);
        }
        state.live_jobs.insert(payload.upload_id);
        state.upload_jobs.push(payload.clone());
        Ok(Some(state.next_id()))
    }

    async fn enqueue_email(&self, payload: &EmailPayload) -> Result<Option<i64>, DbError> {
        let mut state = self.state.lock().await;
        state.emails.push(payload.clone());
        Ok(Some(state.next_id()))
    }
}

/// A remote repository with a fixed project list that records what gets created.
pub struct StaticProjectApi {
    projects: Vec<RemoteProject>,
    created: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl StaticProjectApi {
    /// `projects` are `(identifier, name)` pairs.
    #[must_use]
    pub fn with_projects(projects: &[(&str, &str)]) -> Self {
        Self {
            projects: projects
                .iter()
                .map(|(identifier, name)| RemoteProject {
                    identifier: (*identifier).to_owned(),
                    name: (*name).to_owned(),
                })
                .collect(),
            created: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// Every call answers 503.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_projects(&[])
        }
    }

    /// `(name, description)` of every created project.
    pub async fn created(&self) -> Vec<(String, String)> {
        self.created.lock().await.clone()
    }

    fn unavailable() -> RemoteError {
        RemoteError::Server {
            status: 503,
            body: "Service Unavailable".to_owned(),
        }
    }
}

#[async_trait]
impl ProjectApi for StaticProjectApi {
    async fn list_projects(&self) -> Result<Vec<RemoteProject>, RemoteError> {
        if self.fail {
            return Err(Self::unavailable());
        }
        Ok(self.projects.clone())
    }

    /// New projects get ids counting up from 100.
    async fn create_project(&self, name: &str, description: &str) -> Result<String, RemoteError> {
        if self.fail {
            return Err(Self::unavailable());
        }
        let mut created = self.created.lock().await;
        created.push((name.to_owned(), description.to_owned()));
        Ok((99 + created.len()).to_string())
    }
}

/// One scripted run of the uploader tool.
#[derive(Debug, Clone, Default)]
pub struct ScriptStep {
    pub exit_code: i32,
    pub lines: Vec<String>,
    /// Written to the folder's status artifact before returning.
    pub artifact: Option<String>,
    pub delay: Option<Duration>,
    pub spawn_failure: bool,
}

/// Plays back `ScriptStep`s, one per call. Once the script runs out every call succeeds.
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<ScriptStep>>,
    calls: Mutex<Vec<TransferRequest>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn exit(exit_code: i32) -> ScriptStep {
        ScriptStep {
            exit_code,
            ..ScriptStep::default()
        }
    }

    pub async fn calls(&self) -> Vec<TransferRequest> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn upload_run(
        &self,
        request: &TransferRequest,
        sink: &dyn TransferEventSink,
    ) -> Result<TransferReport, TransferError> {
        self.calls.lock().await.push(request.clone());
        let step = self.steps.lock().await.pop_front().unwrap_or_default();

        if step.spawn_failure {
            return Err(TransferError::Spawn {
                command: "scripted".to_owned(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not installed"),
            });
        }
        for line in &step.lines {
            sink.emit(TransferEvent::from_line(line));
        }
        if let Some(delay) = step.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(artifact) = &step.artifact {
            std::fs::write(request.directory.join(STATUS_FILE_NAME), artifact)?;
        }
        Ok(TransferReport {
            exit_code: step.exit_code,
            details: step.lines,
        })
    }
}

/// Keeps every event it receives.
#[derive(Default)]
pub struct CollectingSink {
    events: StdMutex<Vec<TransferEvent>>,
}

impl CollectingSink {
    #[must_use]
    pub fn events(&self) -> Vec<TransferEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl TransferEventSink for CollectingSink {
    fn emit(&self, event: TransferEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
