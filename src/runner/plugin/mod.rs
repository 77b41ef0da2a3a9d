//! Host interop layer.
//!
//! The application exposes its data to scripts through two kinds of host
//! objects, both installed as globals by
//! [`HostEnvironment`](registry::HostEnvironment):
//!
//! - **Action namespaces** ([`ActionNamespace`](types::ActionNamespace)), one
//!   per entity, reachable as `Book`, `Person`, ... with the actions `new`,
//!   `view`, `edit` and `search`. `Book[3]` views a record by primary key and
//!   `Book[year > 2000]` searches.
//! - **UI callbacks** ([`UiCallbacks`](types::UiCallbacks)), reachable as
//!   `ui` with `ask`, `alert`, `display` and `get_data`.
//!
//! ## Sandboxing
//!
//! Records reach scripts only as wrappers gated by a
//! [`RecordSchema`](registry::RecordSchema): reading a field outside the
//! readable list yields `undefined` and writing outside the writable list is
//! ignored. Namespaces and the `ui` object expose exactly their fixed action
//! names. Related records are wrapped with their own entity's schema.
//!
//! ## Search queries
//!
//! Inside `Entity[...]`, bare names that are readable fields of the entity
//! resolve to search names. Comparing a search name builds a
//! [`SearchCondition`](search::SearchCondition); `&&` and `||` combine
//! conditions, and the namespace hands the final condition to
//! [`ActionNamespace::search`](types::ActionNamespace::search).
//!
//! ## Errors
//!
//! A [`HostError`](crate::runner::ds::error::HostError) returned by the host
//! aborts the running script and surfaces from `execute`.

pub mod config;
pub mod record;
pub mod registry;
pub mod search;
pub mod types;

pub use config::EngineConfig;
pub use registry::{HostEnvironment, RecordSchema, SchemaRegistry};
pub use search::{CompareOp, SearchCondition};
pub use types::{ActionNamespace, FieldKind, FieldSpec, HostData, HostRecord, UiCallbacks};
