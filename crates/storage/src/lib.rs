//! SQLite-backed run history for clerk.
//!
//! Every agent run leaves an audit trail here: the query, each tool call and
//! its result, corrective retries, and how the run ended. The history is
//! what `clerk runs` and `clerk logs` read back.
//!
//! # Core Concepts
//!
//! ## EventStore
//!
//! The [`EventStore`] wraps a SQLite database. Events are appended and read
//! back per run in insertion order; [`EventStore::list_runs`] summarizes all
//! runs, newest first.
//!
//! ## Event
//!
//! An [`Event`] has a unique ID, the [`RunId`] it belongs to, a timestamp, and
//! an [`EventKind`]:
//! - `RunStart` / `Answer` / `Failure` — run lifecycle
//! - `ToolCall` / `ToolResult` — tool invocations and what they returned
//! - `Correction` — unparseable model output sent back for another try
//!
//! # Example
//!
//! ```no_run
//! use storage::{Event, EventKind, EventStore, RunId};
//!
//! let store = EventStore::open("runs.db")?;
//!
//! let run = RunId::new();
//! store.append(&Event::new(run, EventKind::RunStart { query: "50€ + 10% VAT?".into() }))?;
//! store.append(&Event::new(run, EventKind::Answer { text: "55€".into() }))?;
//!
//! for summary in store.list_runs()? {
//!     println!("{} {} {}", summary.id, summary.status, summary.query);
//! }
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod event;
mod store;

pub use error::{Error, Result};
pub use event::{Event, EventKind, RunId};
pub use store::{EventStore, RunStatus, RunSummary};
