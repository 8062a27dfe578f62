//! Storage modules for Slidepost
//!
//! Provides content addressing and the quota-checked filesystem blob store.

pub mod content_key;
pub mod content_store;

pub use content_key::compute_key;
pub use content_store::{
    BlobEntry, ContentStore, PutBlobResult, QuotaAccounting, SLIDES_DIR, sanitize_key,
};
