//! Document-store contract for TANDEM plus the bundled engines.
//!
//! Application code only ever talks to the [`DocumentStore`] trait; which
//! engine backs it is a deployment decision made at bootstrap.

mod document;
mod error;
mod json;
mod memory;
mod traits;

pub use document::Document;
pub use error::StoreError;
pub use json::JsonStore;
pub use memory::MemoryStore;
pub use traits::DocumentStore;
