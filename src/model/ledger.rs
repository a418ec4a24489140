use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use rocket::tokio::sync::Mutex;

use crate::error::{Error, Result};

use super::{
    id::Id,
    poll::{Candidate, Poll, Voter, PLACEHOLDER_PHOTO},
    store::{SnapshotStore, StoreError},
};

/// The ledger as shared between request handlers and background tasks.
/// One lock covers the whole collection.
pub type SharedLedger = Arc<Mutex<Ledger>>;

/// Owner of every poll and the only way to change one.
///
/// Each successful mutation is followed by a save of the full collection to
/// the injected store. A failed save is logged and does not undo the change;
/// callers that must know can ask [`Ledger::take_save_error`].
pub struct Ledger {
    polls: Vec<Poll>,
    /// Per-poll index of registered voter identifiers.
    identifiers: HashMap<Id, HashSet<String>>,
    store: Box<dyn SnapshotStore>,
    placeholder_photo: String,
    /// Outcome of the most recent save, if it failed.
    save_error: Option<StoreError>,
}

impl Ledger {
    /// Create a ledger over an existing collection.
    pub fn new(polls: Vec<Poll>, store: Box<dyn SnapshotStore>) -> Self {
        let identifiers = polls
            .iter()
            .map(|poll| {
                let ids = poll.voters.iter().map(|v| v.identifier.clone()).collect();
                (poll.id, ids)
            })
            .collect();
        Self {
            polls,
            identifiers,
            store,
            placeholder_photo: PLACEHOLDER_PHOTO.to_string(),
            save_error: None,
        }
    }

    /// Create a ledger from whatever `store` currently holds.
    pub fn load(store: impl SnapshotStore + 'static) -> std::result::Result<Self, StoreError> {
        let polls = store.load()?;
        Ok(Self::new(polls, Box::new(store)))
    }

    /// Use a different photo for candidates registered without one.
    pub fn with_placeholder_photo(mut self, photo: impl Into<String>) -> Self {
        self.placeholder_photo = photo.into();
        self
    }

    /// Wrap in a lock for sharing.
    pub fn shared(self) -> SharedLedger {
        Arc::new(Mutex::new(self))
    }

    /// All polls, in creation order.
    pub fn polls(&self) -> &[Poll] {
        &self.polls
    }

    /// Get a poll by ID.
    pub fn poll(&self, poll_id: Id) -> Option<&Poll> {
        self.polls.iter().find(|p| p.id == poll_id)
    }

    fn poll_mut(&mut self, poll_id: Id) -> Option<&mut Poll> {
        self.polls.iter_mut().find(|p| p.id == poll_id)
    }

    /// Create and store a new poll. Always succeeds; the window is not validated.
    pub fn create_poll(
        &mut self,
        title: String,
        description: String,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Poll {
        let poll = Poll::new(title, description, start_date, end_date);
        self.identifiers.insert(poll.id, HashSet::new());
        self.polls.push(poll.clone());
        info!("Created poll {} '{}'", poll.id, poll.title);
        self.persist();
        poll
    }

    /// Register a candidate. Does nothing and returns `None` if the poll doesn't exist.
    pub fn add_candidate(
        &mut self,
        poll_id: Id,
        name: String,
        manifesto: String,
        photo: Option<String>,
    ) -> Option<Candidate> {
        let candidate = Candidate::new(name, manifesto, photo, &self.placeholder_photo);
        let Some(poll) = self.poll_mut(poll_id) else {
            debug!("add_candidate: no poll {poll_id}, ignoring");
            return None;
        };
        poll.candidates.push(candidate.clone());
        info!("Added candidate {} to poll {poll_id}", candidate.id);
        self.persist();
        Some(candidate)
    }

    /// Register a voter. Does nothing and returns `Ok(None)` if the poll doesn't exist.
    /// The identifier must not already be registered in this poll.
    pub fn add_voter(
        &mut self,
        poll_id: Id,
        name: String,
        identifier: String,
    ) -> Result<Option<Voter>> {
        let Some(poll) = self.polls.iter_mut().find(|p| p.id == poll_id) else {
            debug!("add_voter: no poll {poll_id}, ignoring");
            return Ok(None);
        };
        let registered = self.identifiers.entry(poll_id).or_default();
        if registered.contains(&identifier) {
            return Err(Error::DuplicateVoter(identifier));
        }

        let voter = Voter::new(name, identifier);
        registered.insert(voter.identifier.clone());
        poll.voters.push(voter.clone());
        info!("Registered voter {} in poll {poll_id}", voter.id);
        self.persist();
        Ok(Some(voter))
    }

    /// Record one vote.
    ///
    /// Checks run in a fixed order, and the first failure wins: poll exists,
    /// voter exists, voter hasn't voted, candidate exists. Whether the poll is
    /// open is the caller's concern; see [`crate::model::gate_voting`].
    pub fn cast_vote(&mut self, poll_id: Id, candidate_id: Id, voter_identifier: &str) -> Result<()> {
        let poll = self.poll_mut(poll_id).ok_or(Error::PollNotFound(poll_id))?;

        let voter_index = poll
            .voters
            .iter()
            .position(|v| v.identifier == voter_identifier)
            .ok_or_else(|| Error::VoterNotFound(voter_identifier.to_string()))?;
        if poll.voters[voter_index].has_voted {
            return Err(Error::AlreadyVoted(voter_identifier.to_string()));
        }
        let candidate_index = poll
            .candidates
            .iter()
            .position(|c| c.id == candidate_id)
            .ok_or(Error::CandidateNotFound(candidate_id))?;

        poll.candidates[candidate_index].votes += 1;
        poll.voters[voter_index].has_voted = true;
        info!("Vote recorded in poll {poll_id}");
        self.persist();
        Ok(())
    }

    /// The error from the most recent save, if that save failed. Clears it.
    pub fn take_save_error(&mut self) -> Option<StoreError> {
        self.save_error.take()
    }

    /// Save the full collection, logging rather than propagating failure.
    ///
    /// This is blocking file I/O done while the ledger lock is held. Snapshots
    /// are small, so the executor stall is accepted.
    fn persist(&mut self) {
        self.save_error = match self.store.save(&self.polls) {
            Ok(()) => None,
            Err(e) => {
                error!("Failed to save poll snapshot: {e}");
                Some(e)
            }
        };
    }
}
