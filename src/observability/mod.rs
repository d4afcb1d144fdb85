//! Observability subsystem
//!
//! - Structured JSON logging, one line per event
//! - Typed lifecycle events with stable names
//! - Begin/complete scopes for long-running work
//!
//! Observability is read-only: nothing logged here changes control flow,
//! and no state is kept between calls.

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::ObservationScope;
