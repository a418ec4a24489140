use rocket::{
    serde::json::{Error as JsonError, Json},
    Route, State,
};

use crate::{
    error::Result,
    model::{
        api::{CandidateSpec, VoterSpec},
        Candidate, Id, SharedLedger, Voter,
    },
};

use super::common::json_body;

pub fn routes() -> Vec<Route> {
    routes![add_candidate, add_voter]
}

/// Register a candidate. Responds with `null` if the poll doesn't exist.
#[post("/polls/<poll_id>/candidates", data = "<spec>", format = "json")]
async fn add_candidate(
    poll_id: Id,
    spec: std::result::Result<Json<CandidateSpec>, JsonError<'_>>,
    ledger: &State<SharedLedger>,
) -> Result<Json<Option<Candidate>>> {
    let spec = json_body(spec)?;
    let candidate = ledger
        .lock()
        .await
        .add_candidate(poll_id, spec.name, spec.manifesto, spec.photo);
    Ok(Json(candidate))
}

/// Register a voter. Responds with `null` if the poll doesn't exist.
#[post("/polls/<poll_id>/voters", data = "<spec>", format = "json")]
async fn add_voter(
    poll_id: Id,
    spec: std::result::Result<Json<VoterSpec>, JsonError<'_>>,
    ledger: &State<SharedLedger>,
) -> Result<Json<Option<Voter>>> {
    let spec = json_body(spec)?;
    let voter = ledger
        .lock()
        .await
        .add_voter(poll_id, spec.name, spec.identifier)?;
    Ok(Json(voter))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
    };

    use super::*;
    use crate::api::common::test_helpers::{create_poll, post_json, read_err, read_ok};
    use crate::model::{api::PollSpec, PLACEHOLDER_PHOTO};

    #[backend_test]
    async fn register_candidates(client: Client, ledger: SharedLedger) {
        let poll = create_poll(&client, &PollSpec::current_example()).await;
        let id = poll.summary.id;

        let first: Option<Candidate> =
            read_ok(post_json(&client, uri!(add_candidate(id)).to_string(), &CandidateSpec::example1()).await).await;
        let first = first.unwrap();
        assert_eq!(first.name, CandidateSpec::example1().name);
        assert_eq!(first.photo, PLACEHOLDER_PHOTO);
        assert_eq!(first.votes, 0);

        let second: Option<Candidate> =
            read_ok(post_json(&client, uri!(add_candidate(id)).to_string(), &CandidateSpec::example2()).await).await;
        let second = second.unwrap();
        assert_eq!(Some(second.photo.clone()), CandidateSpec::example2().photo);
        assert_ne!(first.id, second.id);

        let ledger = ledger.lock().await;
        let stored = &ledger.poll(id).unwrap().candidates;
        assert_eq!(stored, &vec![first, second]);
    }

    #[backend_test]
    async fn missing_poll_is_ignored(client: Client, ledger: SharedLedger) {
        let id = Id::new();

        let response = post_json(&client, uri!(add_candidate(id)).to_string(), &CandidateSpec::example1()).await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(response.into_string().await.unwrap(), "null");

        let response = post_json(&client, uri!(add_voter(id)).to_string(), &VoterSpec::example1()).await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(response.into_string().await.unwrap(), "null");

        assert!(ledger.lock().await.polls().is_empty());
    }

    #[backend_test]
    async fn duplicate_voter_rejected(client: Client, ledger: SharedLedger) {
        let poll = create_poll(&client, &PollSpec::current_example()).await;
        let other = create_poll(&client, &PollSpec::future_example()).await;
        let id = poll.summary.id;

        let voter: Option<Voter> =
            read_ok(post_json(&client, uri!(add_voter(id)).to_string(), &VoterSpec::example1()).await).await;
        let voter = voter.unwrap();
        assert_eq!(voter.identifier, VoterSpec::example1().identifier);
        assert!(!voter.has_voted);

        // Same identifier, different name: still a duplicate.
        let again = VoterSpec {
            name: "Someone Else".to_string(),
            ..VoterSpec::example1()
        };
        let body = read_err(
            post_json(&client, uri!(add_voter(id)).to_string(), &again).await,
            Status::Conflict,
        )
        .await;
        assert_eq!(body.error, "DuplicateVoter");
        assert_eq!(body.message, "Voter ID 'u1234567' already registered in this poll.");

        // Other polls don't care.
        let elsewhere: Option<Voter> = read_ok(
            post_json(&client, uri!(add_voter(other.summary.id)).to_string(), &VoterSpec::example1()).await,
        )
        .await;
        assert!(elsewhere.is_some());

        let ledger = ledger.lock().await;
        assert_eq!(ledger.poll(id).unwrap().voters, vec![voter]);
    }

    #[backend_test]
    async fn malformed_voter_rejected(client: Client) {
        let poll = create_poll(&client, &PollSpec::current_example()).await;
        let response = client
            .post(uri!(add_voter(poll.summary.id)))
            .header(ContentType::JSON)
            .body(r#"{"name": "No identifier"}"#)
            .dispatch()
            .await;
        let body = read_err(response, Status::BadRequest).await;
        assert_eq!(body.error, "BadRequest");
    }
}
