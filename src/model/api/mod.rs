//! API-compatible types.
//!
//! Requests deserialize into specs; responses are descriptions derived from
//! the stored polls at the moment of the request.

mod desc;
mod spec;

pub use desc::{PollDescription, PollSummary, StatusDescription};
pub use spec::{CandidateSpec, PollSpec, VoteSpec, VoterSpec};
