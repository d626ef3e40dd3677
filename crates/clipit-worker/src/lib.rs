//! Background clip jobs.
//!
//! A submitted job runs the external clip processor on a video link, relays
//! its outputs to the object store and flips the user's upload flag. Jobs
//! are detached: the submitter only sees whether scheduling succeeded.

pub mod config;
pub mod error;
pub mod job;
pub mod launcher;
pub mod logging;
pub mod metrics;
pub mod processor;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use job::ClipJob;
pub use launcher::{DetachedJobLauncher, JobLauncher};
pub use logging::JobLogger;
pub use processor::{ClipProcessor, CommandProcessor, ProcessedClip};
