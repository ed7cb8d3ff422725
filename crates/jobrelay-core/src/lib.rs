//! Queue state machine and reliable-claim protocol for a Redis-backed
//! background job queue.
//!
//! This crate is storage-agnostic: it defines the [`StoreAdapter`] trait
//! the claim protocol is built on, the [`Job`] record and its hash-layout
//! encoding, and the [`Queue`] state machine itself. A concrete Redis
//! implementation lives in `jobrelay-redis`; an in-memory implementation
//! for tests lives in `jobrelay-testing`.

mod clock;
mod error;
mod model;
mod protocol;
mod repository;
mod store;

pub use clock::{Clock, SystemClock};
pub use error::{QueueError, RepositoryError, StoreError};
pub use model::{Job, JobStatus};
pub use protocol::{Queue, QueueConfig};
pub use repository::{decode, encode, job_key};
pub use store::StoreAdapter;
