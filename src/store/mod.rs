//! Result log persistence: append-only storage of per-run results.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlResultLog;
pub use memory::MemoryResultLog;
pub use traits::{ResultLog, ResultLogEntry, ResultLogSnapshot};
