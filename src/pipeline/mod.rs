//! Document processing pipeline.
//!
//! Every input flows through:
//! 1. `format`: detection and text extraction
//! 2. `crate::extract`: per-format fields and candidate actions
//! 3. `classifier` / `tone`: intent and email tone
//! 4. `router`: candidate actions to triggered endpoints
//! 5. `processor`: dispatch (with `retry` for email) and result logging

pub mod classifier;
pub mod format;
pub mod processor;
pub mod retry;
pub mod router;
#[cfg(test)]
pub(crate) mod test_support;
pub mod tone;
pub mod types;

pub use format::Document;
pub use processor::{ActionDispatcher, DocumentProcessor, SimulatedDispatcher};
