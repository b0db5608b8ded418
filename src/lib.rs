pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

pub use config::{
    AccessPolicy, AdapterConfig, AdapterOptions, ClientTuning, SchemaFields, StorageDefaults,
};
pub use error::{AdapterError, AdapterResult};
pub use models::FileDescriptor;
pub use services::adapter::{S3Adapter, SchemaField};
pub use services::naming::{NamingKind, NamingStrategy, SyncStrategy};
pub use services::storage::{ObjectStorageClient, ObjectUpload, UploadReceipt};
