use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{rank_candidates, resolve_status, Candidate, Id, Poll, PollStatus, Voter};

/// A summary of a poll, shorter than the full `PollDescription`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Status at the time the summary was made.
    pub status: PollStatus,
}

impl PollSummary {
    pub fn new(poll: &Poll, now: DateTime<Utc>) -> Self {
        Self {
            id: poll.id,
            title: poll.title.clone(),
            description: poll.description.clone(),
            start_date: poll.start_date,
            end_date: poll.end_date,
            status: resolve_status(poll, now),
        }
    }
}

/// Everything about a poll, with derived fields filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDescription {
    #[serde(flatten)]
    pub summary: PollSummary,
    pub voting_open: bool,
    pub total_votes: u64,
    /// Candidates, most votes first.
    pub candidates: Vec<Candidate>,
    /// Voters in registration order.
    pub voters: Vec<Voter>,
}

impl PollDescription {
    pub fn new(poll: &Poll, now: DateTime<Utc>) -> Self {
        let summary = PollSummary::new(poll, now);
        Self {
            voting_open: summary.status.permits_voting(),
            summary,
            total_votes: poll.total_votes(),
            candidates: rank_candidates(poll).into_iter().cloned().collect(),
            voters: poll.voters.clone(),
        }
    }
}

/// A poll's status at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDescription {
    pub poll_id: Id,
    pub status: PollStatus,
    pub voting_open: bool,
    pub evaluated_at: DateTime<Utc>,
}

impl StatusDescription {
    pub fn new(poll: &Poll, now: DateTime<Utc>) -> Self {
        let status = resolve_status(poll, now);
        Self {
            poll_id: poll.id,
            status,
            voting_open: status.permits_voting(),
            evaluated_at: now,
        }
    }
}
