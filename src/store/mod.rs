//! Record store subsystem
//!
//! The validation core reaches persistent data only through the
//! [`RecordStore`] and [`FormSource`] traits. Query predicates cover what the
//! core needs: equality on nested data fields, identifier membership,
//! sub-array existence and element matching.
//!
//! [`MemoryStore`] is a complete in-process implementation used by the test
//! suites and by embedders that keep their data in memory.

mod errors;
mod memory;
mod query;
mod record;
mod source;

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use query::{resolve_path, Query};
pub use record::{Cursor, PartialUpdate, Record, RecordData};
pub use source::{FormSource, RecordStore};
