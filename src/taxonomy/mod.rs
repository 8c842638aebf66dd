//! Referenced-but-never-owned vocabulary: category trees, brands, attribute
//! definitions and the site-settings store.

pub mod attributes;
pub mod brands;
pub mod categories;
pub mod settings;
