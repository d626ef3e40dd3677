//! HTTP request handlers.

pub mod clips;
pub mod health;
pub mod jobs;
pub mod users;

pub use clips::get_signed_urls;
pub use health::{health, ready};
pub use jobs::process_youtube_video;
pub use users::{get_payment_plan, get_upload_status};
