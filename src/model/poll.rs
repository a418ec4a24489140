use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::Id;

/// Photo used for candidates registered without one.
pub const PLACEHOLDER_PHOTO: &str = "https://via.placeholder.com/150";

/// A time-boxed poll, as stored in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    /// Unique ID.
    pub id: Id,
    /// Poll title.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// Voting opens at this instant (inclusive).
    pub start_date: DateTime<Utc>,
    /// Voting closes at this instant (inclusive).
    pub end_date: DateTime<Utc>,
    /// Candidates in registration order.
    pub candidates: Vec<Candidate>,
    /// Voters in registration order.
    pub voters: Vec<Voter>,
}

impl Poll {
    /// Create a new poll with empty rosters.
    /// The window is taken as given: `start_date` may even be after `end_date`.
    pub fn new(
        title: String,
        description: String,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Id::new(),
            title,
            description,
            start_date,
            end_date,
            candidates: Vec::new(),
            voters: Vec::new(),
        }
    }

    /// Get a candidate by ID.
    pub fn candidate(&self, candidate_id: Id) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == candidate_id)
    }

    /// Get a voter by their external identifier.
    pub fn voter(&self, identifier: &str) -> Option<&Voter> {
        self.voters.iter().find(|v| v.identifier == identifier)
    }

    /// Total number of votes cast in this poll.
    pub fn total_votes(&self) -> u64 {
        self.candidates.iter().map(|c| c.votes).sum()
    }
}

/// A candidate standing in a single poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Unique ID.
    pub id: Id,
    /// Display name.
    pub name: String,
    /// Candidate statement.
    pub manifesto: String,
    /// Photo URL.
    pub photo: String,
    /// Number of votes received.
    pub votes: u64,
}

impl Candidate {
    /// Create a candidate with zero votes. A missing or empty photo falls back to `placeholder`.
    pub fn new(name: String, manifesto: String, photo: Option<String>, placeholder: &str) -> Self {
        Self {
            id: Id::new(),
            name,
            manifesto,
            photo: photo
                .filter(|photo| !photo.is_empty())
                .unwrap_or_else(|| placeholder.to_string()),
            votes: 0,
        }
    }
}

/// A voter registered for a single poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voter {
    /// Unique internal ID.
    pub id: Id,
    /// Display name.
    pub name: String,
    /// Externally supplied key, unique within the poll.
    pub identifier: String,
    /// Whether this voter has spent their vote.
    pub has_voted: bool,
}

impl Voter {
    /// Create a voter who has not yet voted.
    pub fn new(name: String, identifier: String) -> Self {
        Self {
            id: Id::new(),
            name,
            identifier,
            has_voted: false,
        }
    }
}
