pub mod api;
pub mod blobstore;
pub mod catalog;
pub mod content;
pub mod error;
pub mod taxonomy;
pub mod tracing;
pub mod util;
