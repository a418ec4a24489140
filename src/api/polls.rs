use rocket::{
    serde::json::{Error as JsonError, Json},
    Route, State,
};

use crate::{
    clock::SharedClock,
    error::Result,
    model::{
        api::{PollDescription, PollSpec, PollSummary, StatusDescription},
        rank_candidates, Candidate, Id, SharedLedger,
    },
};

use super::common::{json_body, poll_by_id};

pub fn routes() -> Vec<Route> {
    routes![list_polls, create_poll, get_poll, get_status, get_results]
}

#[get("/polls")]
async fn list_polls(
    ledger: &State<SharedLedger>,
    clock: &State<SharedClock>,
) -> Json<Vec<PollSummary>> {
    let now = clock.now();
    let ledger = ledger.lock().await;
    let summaries = ledger
        .polls()
        .iter()
        .map(|poll| PollSummary::new(poll, now))
        .collect();
    Json(summaries)
}

#[post("/polls", data = "<spec>", format = "json")]
async fn create_poll(
    spec: std::result::Result<Json<PollSpec>, JsonError<'_>>,
    ledger: &State<SharedLedger>,
    clock: &State<SharedClock>,
) -> Result<Json<PollDescription>> {
    let spec = json_body(spec)?;
    let poll = ledger.lock().await.create_poll(
        spec.title,
        spec.description,
        spec.start_date,
        spec.end_date,
    );
    Ok(Json(PollDescription::new(&poll, clock.now())))
}

#[get("/polls/<poll_id>")]
async fn get_poll(
    poll_id: Id,
    ledger: &State<SharedLedger>,
    clock: &State<SharedClock>,
) -> Result<Json<PollDescription>> {
    let ledger = ledger.lock().await;
    let poll = poll_by_id(&ledger, poll_id)?;
    Ok(Json(PollDescription::new(poll, clock.now())))
}

#[get("/polls/<poll_id>/status")]
async fn get_status(
    poll_id: Id,
    ledger: &State<SharedLedger>,
    clock: &State<SharedClock>,
) -> Result<Json<StatusDescription>> {
    let ledger = ledger.lock().await;
    let poll = poll_by_id(&ledger, poll_id)?;
    Ok(Json(StatusDescription::new(poll, clock.now())))
}

/// Candidates ordered by votes, most first. Ties keep registration order.
#[get("/polls/<poll_id>/results")]
async fn get_results(poll_id: Id, ledger: &State<SharedLedger>) -> Result<Json<Vec<Candidate>>> {
    let ledger = ledger.lock().await;
    let poll = poll_by_id(&ledger, poll_id)?;
    Ok(Json(rank_candidates(poll).into_iter().cloned().collect()))
}
