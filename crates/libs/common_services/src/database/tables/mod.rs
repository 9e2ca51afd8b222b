pub mod app_user;
pub mod jobs;
pub mod notification;
pub mod upload;

pub use app_user::*;
pub use jobs::*;
pub use notification::*;
pub use upload::*;
