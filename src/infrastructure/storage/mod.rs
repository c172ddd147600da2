pub mod file_blob_storage;

pub use file_blob_storage::FileBlobStorage;
