use rocket::{
    serde::json::{Error as JsonError, Json},
    Route, State,
};

use crate::{
    clock::SharedClock,
    error::Result,
    model::{api::VoteSpec, gate_voting, rank_candidates, resolve_status, Candidate, Id, SharedLedger},
};

use super::common::{json_body, poll_by_id};

pub fn routes() -> Vec<Route> {
    routes![cast_vote]
}

/// Cast a vote and respond with the updated results.
#[post("/polls/<poll_id>/votes", data = "<vote>", format = "json")]
async fn cast_vote(
    poll_id: Id,
    vote: std::result::Result<Json<VoteSpec>, JsonError<'_>>,
    ledger: &State<SharedLedger>,
    clock: &State<SharedClock>,
) -> Result<Json<Vec<Candidate>>> {
    let vote = json_body(vote)?;
    let mut ledger = ledger.lock().await;

    // Only open polls accept votes.
    let poll = poll_by_id(&ledger, poll_id)?;
    gate_voting(resolve_status(poll, clock.now()))?;

    ledger.cast_vote(poll_id, vote.candidate_id, &vote.voter_identifier)?;
    let poll = poll_by_id(&ledger, poll_id)?;
    Ok(Json(rank_candidates(poll).into_iter().cloned().collect()))
}
