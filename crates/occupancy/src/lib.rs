//! Room-occupancy query adapter.
//!
//! Implements the [`responder::OccupancyQuery`] trait against the status REST
//! service: one `GET {base}/v1/users_in_room` per call, whose JSON body carries
//! the people currently in the room as a `data` array.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport and response-shape checks live here. The
//! [`responder`] crate sees only [`responder::OccupancyResult`].
//!
//! ## Failure handling
//!
//! Every failure (transport error, non-JSON body, non-object body, missing or
//! non-array `data`) is logged with the HTTP status and body when available and
//! collapsed to [`OccupancyResult::QueryFailed`]. There is no retry and no cache;
//! each call performs exactly one fresh request.

use async_trait::async_trait;
use reqwest::Client;
use responder::{EndpointUrl, OccupancyQuery, OccupancyResult, QueryFailure};
use serde_json::Value;
use tracing::{debug, error, instrument};

/// Path of the occupancy resource, appended to the configured base URL.
pub const USERS_IN_ROOM_PATH: &str = "/v1/users_in_room";

/// HTTP client for the status service.
#[derive(Debug, Clone, Default)]
pub struct StatusClient {
    http: Client,
}

impl StatusClient {
    /// Creates a client with transport defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a client that reuses an existing connection pool.
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    /// Full URL of the occupancy resource under `base`.
    ///
    /// A trailing `/` on `base` is dropped so the path separator is not doubled.
    pub fn users_in_room_url(base: &EndpointUrl) -> String {
        format!("{}{}", base.as_str().trim_end_matches('/'), USERS_IN_ROOM_PATH)
    }

    /// Performs the query and reports the precise failure.
    ///
    /// # Errors
    ///
    /// Returns [`QueryFailure`] describing why no count could be read.
    pub async fn try_fetch_count(&self, base: &EndpointUrl) -> Result<usize, QueryFailure> {
        let url = Self::users_in_room_url(base);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| QueryFailure::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| QueryFailure::Transport(e.to_string()))?;

        count_from_body(status, body)
    }
}

#[async_trait]
impl OccupancyQuery for StatusClient {
    #[instrument(name = "fetch_count", skip_all, fields(endpoint = %base))]
    async fn fetch_count(&self, base: &EndpointUrl) -> OccupancyResult {
        match self.try_fetch_count(base).await {
            Ok(count) => {
                debug!(count, "occupancy count received");
                OccupancyResult::Count(count)
            }
            Err(failure) => {
                error!(error = %failure, "failed to get occupancy count");
                OccupancyResult::QueryFailed
            }
        }
    }
}

/// Reads the occupancy count out of a status response body.
///
/// The status code is carried into the error for logging only; the body shape
/// alone decides success.
fn count_from_body(status: u16, body: String) -> Result<usize, QueryFailure> {
    let value: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(_) => return Err(QueryFailure::NotJson { status, body }),
    };

    let Value::Object(object) = value else {
        return Err(QueryFailure::NotAnObject { status, body });
    };

    match object.get("data") {
        Some(Value::Array(people)) => Ok(people.len()),
        _ => Err(QueryFailure::MissingData { status, body }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn server_answering(status: u16, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USERS_IN_ROOM_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    fn base(server: &MockServer) -> EndpointUrl {
        EndpointUrl::new(server.uri()).unwrap()
    }

    #[test]
    fn users_in_room_url_does_not_double_separator() {
        let plain = EndpointUrl::new("https://status.example.org").unwrap();
        let slashed = EndpointUrl::new("https://status.example.org/").unwrap();

        assert_eq!(
            StatusClient::users_in_room_url(&plain),
            "https://status.example.org/v1/users_in_room"
        );
        assert_eq!(
            StatusClient::users_in_room_url(&slashed),
            "https://status.example.org/v1/users_in_room"
        );
    }

    #[test]
    fn count_from_body_reads_data_length() {
        assert_eq!(count_from_body(200, r#"{"data":[]}"#.into()).unwrap(), 0);
        assert_eq!(count_from_body(200, r#"{"data":[1,2,3]}"#.into()).unwrap(), 3);
    }

    #[test]
    fn count_from_body_rejects_non_array_data() {
        let err = count_from_body(200, r#"{"data":"abc"}"#.into()).unwrap_err();
        assert!(matches!(err, QueryFailure::MissingData { status: 200, .. }));

        let err = count_from_body(200, r#"{"data":null}"#.into()).unwrap_err();
        assert!(matches!(err, QueryFailure::MissingData { .. }));
    }

    #[tokio::test]
    async fn two_people_in_room() {
        let server = server_answering(200, r#"{"data":[{"id":1},{"id":2}]}"#).await;

        let result = StatusClient::new().fetch_count(&base(&server)).await;

        assert_eq!(result, OccupancyResult::Count(2));
    }

    #[tokio::test]
    async fn empty_room() {
        let server = server_answering(200, r#"{"data":[]}"#).await;

        let result = StatusClient::new().fetch_count(&base(&server)).await;

        assert_eq!(result, OccupancyResult::Count(0));
    }

    #[tokio::test]
    async fn shared_client_queries_the_same_resource() {
        let server = server_answering(200, r#"{"data":[{"id":1}]}"#).await;

        let result = StatusClient::with_client(reqwest::Client::new())
            .fetch_count(&base(&server))
            .await;

        assert_eq!(result, OccupancyResult::Count(1));
    }

    #[tokio::test]
    async fn non_json_body_fails() {
        let server = server_answering(502, "<html>Bad Gateway</html>").await;

        let client = StatusClient::new();
        let err = client.try_fetch_count(&base(&server)).await.unwrap_err();
        assert!(matches!(err, QueryFailure::NotJson { status: 502, .. }));

        // The server expects exactly one call per query.
        let server = server_answering(502, "<html>Bad Gateway</html>").await;
        assert_eq!(
            client.fetch_count(&base(&server)).await,
            OccupancyResult::QueryFailed
        );
    }

    #[tokio::test]
    async fn json_array_body_fails() {
        let server = server_answering(200, r#"[{"id":1}]"#).await;

        let err = StatusClient::new()
            .try_fetch_count(&base(&server))
            .await
            .unwrap_err();

        assert!(matches!(err, QueryFailure::NotAnObject { .. }));
    }

    #[tokio::test]
    async fn object_without_data_fails() {
        let server = server_answering(200, r#"{"users":[1,2]}"#).await;

        let result = StatusClient::new().fetch_count(&base(&server)).await;

        assert_eq!(result, OccupancyResult::QueryFailed);
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails() {
        // Nothing listens on the discard port.
        let base = EndpointUrl::new("http://127.0.0.1:9").unwrap();

        let err = StatusClient::new().try_fetch_count(&base).await.unwrap_err();
        assert!(matches!(err, QueryFailure::Transport(_)));
    }
}
