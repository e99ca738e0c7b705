pub mod conformance;
mod document;
mod document_records;
mod error;
mod file;
mod memory;
pub mod profiles;
mod traits;

pub use document::{Document, DocumentStore, MemoryDocumentStore};
pub use document_records::{DocumentRecordStore, RECORDS};
pub use error::StorageError;
pub use file::JsonFileDocumentStore;
pub use memory::MemoryRecordStore;
pub use profiles::{get_profile, list_profiles, put_profile, update_profile, ProfileUpdate};
pub use traits::RecordStore;
