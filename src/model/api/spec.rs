use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Id;

/// A poll specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSpec {
    /// Poll title.
    pub title: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Voting opens.
    pub start_date: DateTime<Utc>,
    /// Voting closes.
    pub end_date: DateTime<Utc>,
}

/// A candidate registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub name: String,
    #[serde(default)]
    pub manifesto: String,
    /// Photo URL; a placeholder is used if absent or empty.
    #[serde(default)]
    pub photo: Option<String>,
}

/// A voter registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterSpec {
    pub name: String,
    /// The voter's own identifier, unique within the poll.
    pub identifier: String,
}

/// A vote that a registered voter wishes to cast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteSpec {
    pub candidate_id: Id,
    pub voter_identifier: String,
}
