use rocket::serde::json::{Error as JsonError, Json};

use crate::error::{Error, Result};
use crate::model::{Id, Ledger, Poll};

/// Look up a poll, failing with `PollNotFound`.
pub fn poll_by_id(ledger: &Ledger, poll_id: Id) -> Result<&Poll> {
    ledger.poll(poll_id).ok_or(Error::PollNotFound(poll_id))
}

/// Unwrap a JSON request body, turning parse failures into `BadRequest`.
pub fn json_body<T>(body: std::result::Result<Json<T>, JsonError<'_>>) -> Result<T> {
    body.map(|json| json.into_inner())
        .map_err(|err| Error::BadRequest(err.to_string()))
}

#[cfg(test)]
pub mod test_helpers {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::serde_json,
    };
    use serde::{de::DeserializeOwned, Serialize};

    use crate::error::ErrorBody;
    use crate::model::api::{PollDescription, PollSpec};

    /// POST `body` as JSON to `uri`.
    pub async fn post_json<'c>(client: &'c Client, uri: String, body: &impl Serialize) -> LocalResponse<'c> {
        client
            .post(uri)
            .header(ContentType::JSON)
            .body(serde_json::to_string(body).unwrap())
            .dispatch()
            .await
    }

    /// Read a successful response body.
    pub async fn read_ok<T: DeserializeOwned>(response: LocalResponse<'_>) -> T {
        assert_eq!(Status::Ok, response.status());
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    /// Read an error response, checking its status.
    pub async fn read_err(response: LocalResponse<'_>, expected: Status) -> ErrorBody {
        assert_eq!(expected, response.status());
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    /// Create a poll through the API.
    pub async fn create_poll(client: &Client, spec: &PollSpec) -> PollDescription {
        read_ok(post_json(client, "/polls".to_string(), spec).await).await
    }
}
