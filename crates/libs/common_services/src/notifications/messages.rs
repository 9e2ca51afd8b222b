//! User facing texts of upload notifications and emails.

pub const TITLE_COMPLETE: &str = "Upload Complete";
pub const TITLE_FAILED: &str = "Upload Failed";
pub const TITLE_IN_QUEUE: &str = "Upload In Queue";
pub const TITLE_ERROR: &str = "Upload Error";

#[must_use]
pub fn completed(folder: &str, sample_count: i32) -> String {
    format!("Upload of {folder} has completed successfully. {sample_count} samples uploaded.")
}

#[must_use]
pub fn already_completed(folder: &str, sample_count: i32) -> String {
    format!("Upload of {folder} was already completed with {sample_count} samples.")
}

#[must_use]
pub fn failed(folder: &str) -> String {
    format!("Upload of {folder} has failed.")
}

#[must_use]
pub fn retries_exhausted(folder: &str, retries: i32) -> String {
    format!("Upload of {folder} has failed after {retries} retries.")
}

/// `position` is left out when the upload isn't in the queue anymore.
#[must_use]
pub fn in_queue(folder: &str, position: Option<usize>, total: usize) -> String {
    let position = position
        .map(|p| format!(" (Position {p} of {total})"))
        .unwrap_or_default();
    format!("Upload of {folder} is in queue{position}. {total} total uploads in queue.")
}

#[must_use]
pub fn email_completed(folder: &str) -> String {
    format!("Your upload of {folder} has completed successfully.")
}

#[must_use]
pub fn email_failed(folder: &str) -> String {
    format!("Your upload of {folder} has failed. Please check the system for more details.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_message_mentions_position_and_depth() {
        assert_eq!(
            in_queue("run_1", Some(4), 6),
            "Upload of run_1 is in queue (Position 4 of 6). 6 total uploads in queue."
        );
        assert_eq!(
            in_queue("run_1", None, 2),
            "Upload of run_1 is in queue. 2 total uploads in queue."
        );
    }
}
