mod job_store;
mod notification_store;
mod upload_store;
mod user_store;

pub use job_store::*;
pub use notification_store::*;
pub use upload_store::*;
pub use user_store::*;
