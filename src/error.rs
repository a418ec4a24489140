use log::debug;
use rocket::{http::Status, response::Responder, serde::json::Json, Request};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Id, PollStatus};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Voter ID '{0}' already registered in this poll.")]
    DuplicateVoter(String),
    #[error("Poll not found: {0}")]
    PollNotFound(Id),
    #[error("Voter ID '{0}' not found.")]
    VoterNotFound(String),
    #[error("Voter '{0}' has already voted.")]
    AlreadyVoted(String),
    #[error("Candidate not found: {0}")]
    CandidateNotFound(Id),
    #[error("Voting is closed. Poll is {0}")]
    VotingClosed(PollStatus),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl Error {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateVoter(_) => "DuplicateVoter",
            Self::PollNotFound(_) => "PollNotFound",
            Self::VoterNotFound(_) => "VoterNotFound",
            Self::AlreadyVoted(_) => "AlreadyVoted",
            Self::CandidateNotFound(_) => "CandidateNotFound",
            Self::VotingClosed(_) => "VotingClosed",
            Self::BadRequest(_) => "BadRequest",
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::DuplicateVoter(_) | Self::AlreadyVoted(_) => Status::Conflict,
            Self::PollNotFound(_) | Self::VoterNotFound(_) | Self::CandidateNotFound(_) => {
                Status::NotFound
            }
            Self::VotingClosed(_) => Status::Forbidden,
            Self::BadRequest(_) => Status::BadRequest,
        }
    }
}

/// JSON body sent alongside an error status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    /// The resolved poll status, for `VotingClosed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PollStatus>,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        Self {
            error: err.kind().to_string(),
            message: err.to_string(),
            status: match err {
                Error::VotingClosed(status) => Some(*status),
                _ => None,
            },
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        debug!("{self}");
        (self.status(), Json(ErrorBody::from(&self))).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voting_closed_body_carries_status() {
        let body = ErrorBody::from(&Error::VotingClosed(PollStatus::Upcoming));
        assert_eq!(body.error, "VotingClosed");
        assert_eq!(body.message, "Voting is closed. Poll is Upcoming");
        assert_eq!(body.status, Some(PollStatus::Upcoming));

        let body = ErrorBody::from(&Error::AlreadyVoted("v1".into()));
        assert_eq!(body.error, "AlreadyVoted");
        assert_eq!(body.status, None);
    }

    #[test]
    fn statuses() {
        assert_eq!(Error::DuplicateVoter("v1".into()).status(), Status::Conflict);
        assert_eq!(Error::PollNotFound(Id::new()).status(), Status::NotFound);
        assert_eq!(Error::VotingClosed(PollStatus::Ended).status(), Status::Forbidden);
        assert_eq!(Error::BadRequest("bad".into()).status(), Status::BadRequest);
    }
}
