//! Product catalog: write model (creation/synchronization), read model
//! (storefront queries) and SKU generation.

pub mod read;
pub mod sku;
pub mod types;
pub mod write;
