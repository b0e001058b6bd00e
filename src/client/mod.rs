//! Client side of the media service.
//!
//! [`api::DriveApiClient`] speaks the HTTP API; [`queue::UploadQueue`]
//! schedules many uploads through it with a bounded number in flight.

pub mod api;
pub mod queue;

pub use api::{DriveApiClient, DriveApiError, DriveApiErrorKind, ProjectUploadTarget, UploadProgress};
pub use queue::{
    QueueConfig, TaskId, TaskStatus, UploadBackend, UploadQueue, UploadSource, UploadTask,
};
