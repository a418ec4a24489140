//! Derived, time-dependent views of a poll. Nothing here is stored; callers
//! recompute on every read or tick.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::poll::{Candidate, Poll};

/// Temporal state of a poll relative to its window.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollStatus {
    /// The window has not opened yet.
    Upcoming,
    /// Inside the window, boundaries included. Voting is open.
    Ongoing,
    /// The window has closed.
    Ended,
}

impl PollStatus {
    /// Is voting permitted in this state?
    pub fn permits_voting(self) -> bool {
        self == PollStatus::Ongoing
    }
}

impl Display for PollStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PollStatus::Upcoming => "Upcoming",
            PollStatus::Ongoing => "Ongoing",
            PollStatus::Ended => "Ended",
        };
        write!(f, "{name}")
    }
}

/// Derive the status of `poll` at instant `now`.
///
/// The upcoming check runs first, so a poll configured with its start after
/// its end is `Upcoming` until the start and `Ended` afterwards; it is never
/// `Ongoing`.
pub fn resolve_status(poll: &Poll, now: DateTime<Utc>) -> PollStatus {
    if now < poll.start_date {
        PollStatus::Upcoming
    } else if now > poll.end_date {
        PollStatus::Ended
    } else {
        PollStatus::Ongoing
    }
}

/// Permit voting only while the poll is ongoing.
pub fn gate_voting(status: PollStatus) -> Result<()> {
    if status.permits_voting() {
        Ok(())
    } else {
        Err(Error::VotingClosed(status))
    }
}

/// The poll's candidates ordered by votes, highest first.
/// Tied candidates keep their registration order.
pub fn rank_candidates(poll: &Poll) -> Vec<&Candidate> {
    let mut ranked: Vec<&Candidate> = poll.candidates.iter().collect();
    // `sort_by` is stable.
    ranked.sort_by(|a, b| b.votes.cmp(&a.votes));
    ranked
}
