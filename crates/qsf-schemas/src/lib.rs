//! qsf-schemas
//!
//! Shared wire types for the factory: queue item envelopes, item ids,
//! priorities, worker roles, queue names, and the session marker grammar.
//!
//! Everything here is plain data. No IO, no clock beyond what callers pass
//! in (id generation reads the wall clock once, see `ids`).

mod ids;
mod item;
mod layout;
mod markers;
mod role;

pub use ids::{claim_owner_from_file_name, id_from_file_name, ItemId, ItemIdParseError};
pub use item::{ErrorKind, ItemError, ItemStatus, Priority, QueueItem, QueueName, WORK_QUEUES};
pub use layout::ProjectLayout;
pub use markers::{parse_marker, Marker};
pub use role::{RoleParseError, WorkerRole, ALL_ROLES};
