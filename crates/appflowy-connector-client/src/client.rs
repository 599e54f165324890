//! Authenticated request wrapper.
//!
//! Every call obtains a token from the [`SessionManager`] first. AppFlowy
//! reports an expired token either as an HTTP 401 or as a 2xx body carrying
//! `"status": 401`; both are mapped to the same outcome before deciding to
//! re-authenticate. The wrapper logs in again and retries exactly once.

use crate::credentials::Credentials;
use crate::error::{ApiError, TransportError};
use crate::session::SessionManager;
use crate::transport::{HttpRequest, Transport};
use appflowy_connector_core::StateStore;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

/// Result of a single attempt, after normalizing the 401 shapes.
#[derive(Debug)]
enum Attempt {
    Success(Value),
    Unauthorized,
    Failed(TransportError),
}

impl From<Result<Value, TransportError>> for Attempt {
    fn from(result: Result<Value, TransportError>) -> Self {
        match result {
            Err(cause) if cause.status() == Some(401) => Self::Unauthorized,
            Err(cause) => Self::Failed(cause),
            Ok(body) if body.get("status").and_then(Value::as_u64) == Some(401) => {
                Self::Unauthorized
            }
            Ok(body) => Self::Success(body),
        }
    }
}

/// Issues authenticated calls against the AppFlowy API.
pub struct ApiClient {
    session: SessionManager,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    /// Create a client that logs in with `credentials` and caches its
    /// session in `store`.
    #[must_use]
    pub fn new(
        credentials: Credentials,
        transport: Arc<dyn Transport>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            session: SessionManager::new(credentials, Arc::clone(&transport), store),
            transport,
        }
    }

    /// Call `path` on the configured host.
    ///
    /// An empty JSON object body and an empty query are not sent at all.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::AuthorizationExpired`] if the server still answers
    /// 401 after one re-authentication, [`ApiError::Request`] on any other
    /// transport failure, and login errors from the session manager.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        query: Vec<(String, String)>,
    ) -> Result<Value, ApiError> {
        let operation = format!("{method} {path}");
        let mut request = HttpRequest::new(method, self.session.credentials().url(path));
        request.body = body.filter(|body| !is_empty_object(body));
        request.query = Some(query).filter(|query| !query.is_empty());
        request.bearer_token = Some(self.session.token(false).await?);

        match Attempt::from(self.transport.send(&request).await) {
            Attempt::Success(body) => return Ok(body),
            Attempt::Failed(cause) => return Err(ApiError::request(operation, cause)),
            Attempt::Unauthorized => {}
        }

        tracing::info!(operation = %operation, "Access token rejected, re-authenticating");
        request.bearer_token = Some(self.session.token(true).await?);

        match Attempt::from(self.transport.send(&request).await) {
            Attempt::Success(body) => Ok(body),
            Attempt::Failed(cause) => Err(ApiError::request(operation, cause)),
            Attempt::Unauthorized => Err(ApiError::AuthorizationExpired { operation }),
        }
    }

    /// `GET` without body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::call`].
    pub async fn get(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<Value, ApiError> {
        self.call(Method::GET, path, None, query).await
    }
}

fn is_empty_object(value: &Value) -> bool {
    value.as_object().is_some_and(serde_json::Map::is_empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{unauthorized, MockTransport, HOST};
    use crate::paths;
    use appflowy_connector_core::MemoryStateStore;
    use serde_json::json;

    fn client(transport: &Arc<MockTransport>) -> ApiClient {
        let credentials = Credentials::new(HOST, "user@appflowy.test", "secret").unwrap();
        ApiClient::new(
            credentials,
            transport.clone(),
            Arc::new(MemoryStateStore::new()),
        )
    }

    #[tokio::test]
    async fn successful_call_passes_body_through() {
        let transport = MockTransport::with_login();
        transport.on(
            Method::GET,
            paths::WORKSPACES,
            Ok(json!({"data": [{"workspace_id": "w1"}]})),
        );
        let client = client(&transport);

        let body = client.get(paths::WORKSPACES, Vec::new()).await.unwrap();
        assert_eq!(body, json!({"data": [{"workspace_id": "w1"}]}));

        let request = transport.requests().pop().unwrap();
        assert_eq!(request.bearer_token.as_deref(), Some("token-1"));
    }

    #[tokio::test]
    async fn token_is_requested_once_across_calls() {
        let transport = MockTransport::with_login();
        transport.on(Method::GET, paths::WORKSPACES, Ok(json!({"data": []})));
        let client = client(&transport);

        for _ in 0..3 {
            client.get(paths::WORKSPACES, Vec::new()).await.unwrap();
        }

        assert_eq!(transport.count(&Method::POST, paths::TOKEN), 1);
        assert_eq!(transport.count(&Method::GET, paths::WORKSPACES), 3);
    }

    #[tokio::test]
    async fn status_401_is_retried_once_with_new_token() {
        let transport = MockTransport::with_login();
        transport.on(Method::GET, paths::WORKSPACES, Err(unauthorized()));
        transport.on(Method::GET, paths::WORKSPACES, Ok(json!({"data": ["ok"]})));
        let client = client(&transport);

        let body = client.get(paths::WORKSPACES, Vec::new()).await.unwrap();

        assert_eq!(body, json!({"data": ["ok"]}));
        assert_eq!(transport.count(&Method::GET, paths::WORKSPACES), 2);
        assert_eq!(transport.count(&Method::POST, paths::TOKEN), 2);
        let retry = transport.requests().pop().unwrap();
        assert_eq!(retry.bearer_token.as_deref(), Some("token-2"));
    }

    #[tokio::test]
    async fn status_401_inside_body_is_retried_once() {
        let transport = MockTransport::with_login();
        transport.on(
            Method::GET,
            paths::WORKSPACES,
            Ok(json!({"status": 401, "message": "expired"})),
        );
        transport.on(Method::GET, paths::WORKSPACES, Ok(json!({"data": []})));
        let client = client(&transport);

        let body = client.get(paths::WORKSPACES, Vec::new()).await.unwrap();

        assert_eq!(body, json!({"data": []}));
        assert_eq!(transport.count(&Method::GET, paths::WORKSPACES), 2);
    }

    #[tokio::test]
    async fn second_401_is_fatal_without_third_attempt() {
        let transport = MockTransport::with_login();
        transport.on(Method::GET, paths::WORKSPACES, Err(unauthorized()));
        let client = client(&transport);

        let err = client.get(paths::WORKSPACES, Vec::new()).await.unwrap_err();

        assert!(matches!(err, ApiError::AuthorizationExpired { .. }));
        assert_eq!(transport.count(&Method::GET, paths::WORKSPACES), 2);
        assert_eq!(transport.count(&Method::POST, paths::TOKEN), 2);
    }

    #[tokio::test]
    async fn rejected_relogin_is_an_authentication_error() {
        let transport = MockTransport::new();
        transport.on(
            Method::POST,
            paths::TOKEN,
            Ok(json!({"access_token": "token-1", "refresh_token": "refresh-1"})),
        );
        transport.on(
            Method::POST,
            paths::TOKEN,
            Err(TransportError::Status {
                status: 400,
                message: "invalid_grant".to_string(),
            }),
        );
        transport.on(Method::GET, paths::WORKSPACES, Err(unauthorized()));
        let client = client(&transport);

        let err = client.get(paths::WORKSPACES, Vec::new()).await.unwrap_err();

        assert!(matches!(err, ApiError::Authentication(_)), "got {err:?}");
        assert_eq!(transport.count(&Method::GET, paths::WORKSPACES), 1);
        assert_eq!(transport.count(&Method::POST, paths::TOKEN), 2);
    }

    #[tokio::test]
    async fn other_failures_are_not_retried() {
        let transport = MockTransport::with_login();
        transport.on(
            Method::GET,
            paths::WORKSPACES,
            Err(TransportError::Status {
                status: 500,
                message: "boom".to_string(),
            }),
        );
        let client = client(&transport);

        let err = client.get(paths::WORKSPACES, Vec::new()).await.unwrap_err();

        match err {
            ApiError::Request { operation, cause } => {
                assert_eq!(operation, "GET /api/workspace");
                assert_eq!(cause.status(), Some(500));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(transport.count(&Method::GET, paths::WORKSPACES), 1);
        assert_eq!(transport.count(&Method::POST, paths::TOKEN), 1);
    }

    #[tokio::test]
    async fn empty_body_and_query_are_omitted() {
        let transport = MockTransport::with_login();
        let path = paths::rows("ws", "db");
        transport.on(Method::POST, &path, Ok(json!({"data": "r1"})));
        let client = client(&transport);

        client
            .call(Method::POST, &path, Some(json!({})), Vec::new())
            .await
            .unwrap();
        client
            .call(
                Method::POST,
                &path,
                Some(json!({"cells": {"Name": "A"}})),
                vec![("with_doc".to_string(), "true".to_string())],
            )
            .await
            .unwrap();

        let requests = transport.requests();
        let (empty, full) = (&requests[1], &requests[2]);
        assert!(empty.body.is_none());
        assert!(empty.query.is_none());
        assert_eq!(full.body, Some(json!({"cells": {"Name": "A"}})));
        assert_eq!(
            full.query,
            Some(vec![("with_doc".to_string(), "true".to_string())])
        );
    }
}
