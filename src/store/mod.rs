pub mod store;
pub mod types;

pub use store::UploadStore;
pub use types::{TaskId, TaskStatus, TaskView, UploadDestination, UploadPayload, UploadTask};
