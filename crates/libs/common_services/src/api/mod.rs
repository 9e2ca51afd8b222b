pub mod notifications;
pub mod upload;
