pub mod client;
pub mod error;
pub mod http;
pub mod memory;
pub mod types;

pub use client::{ProgressSink, RemoteStore};
pub use error::{RemoteError, RemoteResult};
pub use http::{HttpRemoteConfig, HttpRemoteStore};
pub use memory::MemoryRemoteStore;
pub use types::{
    CommittedPart, CreateFile, PartRef, PartReceipt, PartUpload, RemoteFile, ResumeRecord,
};
