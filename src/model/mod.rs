//! Polls, the ledger that owns them, and the derived views over them.

pub mod api;

mod id;
mod ledger;
mod poll;
mod status;
mod store;

pub use id::Id;
pub use ledger::{Ledger, SharedLedger};
pub use poll::{Candidate, Poll, Voter, PLACEHOLDER_PHOTO};
pub use status::{gate_voting, rank_candidates, resolve_status, PollStatus};
pub use store::{JsonFileStore, SnapshotStore, StoreError};

#[cfg(test)]
pub use store::MemoryStore;
