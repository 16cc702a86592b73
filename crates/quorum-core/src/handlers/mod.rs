//! Production effect handlers

pub mod storage;

pub use storage::FilesystemStorageHandler;
