use crate::database::upload::Upload;
use chrono::{DateTime, Utc};
use common_types::UploadStatus;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
    pub upload_id: i64,
    pub user_id: i32,
    pub folder_name: String,
    pub status: UploadStatus,
    pub created_at: DateTime<Utc>,
    /// 1-based.
    pub position: usize,
}

/// Snapshot of everything that is waiting or running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueInfo {
    pub total_in_queue: usize,
    pub running_uploads: usize,
    pub max_concurrent_uploads: usize,
    pub entries: Vec<QueueEntry>,
}

impl QueueInfo {
    /// Builds the queue from active uploads. Order is by submission time, whatever order
    /// `active` comes in.
    #[must_use]
    pub fn from_active(active: &[Upload], max_concurrent_uploads: usize) -> Self {
        let mut queued: Vec<&Upload> = active.iter().filter(|u| u.status.is_active()).collect();
        queued.sort_by_key(|u| (u.created_at, u.id));

        let entries: Vec<QueueEntry> = queued
            .iter()
            .enumerate()
            .map(|(i, u)| QueueEntry {
                upload_id: u.id,
                user_id: u.user_id,
                folder_name: u.folder_name.clone(),
                status: u.status,
                created_at: u.created_at,
                position: i + 1,
            })
            .collect();

        Self {
            total_in_queue: entries.len(),
            running_uploads: entries
                .iter()
                .filter(|e| e.status == UploadStatus::Uploading)
                .count(),
            max_concurrent_uploads,
            entries,
        }
    }

    #[must_use]
    pub fn position_of(&self, upload_id: i64) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.upload_id == upload_id)
            .map(|e| e.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::upload_fixture;
    use chrono::Duration;

    #[test]
    fn fourth_submission_is_position_four() {
        // ARRANGE
        let start = Utc::now();
        let mut uploads: Vec<Upload> = (1..=6)
            .map(|id| {
                let mut u = upload_fixture(id, 1, &format!("run_{id}"));
                u.created_at = start + Duration::seconds(id);
                u
            })
            .collect();
        uploads[0].status = UploadStatus::Uploading;
        uploads[1].status = UploadStatus::Uploading;
        uploads[4].status = UploadStatus::Success;
        // Input order must not matter.
        uploads.reverse();

        // ACT
        let info = QueueInfo::from_active(&uploads, 2);

        // ASSERT
        assert_eq!(info.total_in_queue, 5);
        assert_eq!(info.running_uploads, 2);
        assert_eq!(info.max_concurrent_uploads, 2);
        assert_eq!(info.position_of(4), Some(4));
        assert_eq!(info.position_of(6), Some(5));
        assert_eq!(info.position_of(5), None);
    }
}
