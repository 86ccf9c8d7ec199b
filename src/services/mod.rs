//! Business logic services.

pub mod ai;
pub mod capture;
pub mod report_builder;
pub mod storage;

pub use storage::{BlobStore, Storage};
