//! Access-token lifecycle.
//!
//! Tokens come from the password grant and are cached in the node's state
//! store under [`keys::SESSION`], so they survive between invocations of the
//! same node. A cached token is reused until a caller forces a refresh,
//! which [`crate::client::ApiClient`] does after a 401.

use crate::credentials::Credentials;
use crate::error::ApiError;
use crate::paths;
use crate::transport::{HttpRequest, Transport};
use appflowy_connector_core::{keys, SessionState, StateStore, StateStoreExt};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Password-grant response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Owns the bearer token of one node instance.
pub struct SessionManager {
    credentials: Credentials,
    transport: Arc<dyn Transport>,
    store: Arc<dyn StateStore>,
}

impl SessionManager {
    /// Create a session manager.
    #[must_use]
    pub fn new(
        credentials: Credentials,
        transport: Arc<dyn Transport>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            credentials,
            transport,
            store,
        }
    }

    /// Credentials the session logs in with.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Return a bearer token, logging in when none is cached or when
    /// `force_refresh` is set.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Authentication`] if the password grant is
    /// rejected, [`ApiError::Request`] on transport failure, and
    /// [`ApiError::State`] if the session cannot be read or stored.
    pub async fn token(&self, force_refresh: bool) -> Result<String, ApiError> {
        if !force_refresh {
            if let Some(token) = self.cached_token()? {
                return Ok(token);
            }
        }
        self.authenticate().await
    }

    /// Access token currently stored for this node, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the session state cannot be read.
    pub fn cached_token(&self) -> Result<Option<String>, ApiError> {
        let session: Option<SessionState> = self.store.load(keys::SESSION)?;
        Ok(session.and_then(|session| session.access_token))
    }

    /// Exchange username and password for new tokens and store them.
    async fn authenticate(&self) -> Result<String, ApiError> {
        tracing::info!(
            host = self.credentials.host(),
            username = self.credentials.username(),
            "Requesting access token"
        );

        let mut request = HttpRequest::new(Method::POST, self.credentials.url(paths::TOKEN));
        request.query = Some(vec![("grant_type".to_string(), "password".to_string())]);
        request.body = Some(json!({
            "email": self.credentials.username(),
            "password": self.credentials.password(),
        }));

        let body = self.transport.send(&request).await.map_err(|cause| {
            match cause.status() {
                Some(status) if (400..500).contains(&status) => {
                    ApiError::Authentication(cause.to_string())
                }
                _ => ApiError::request("POST /gotrue/token", cause),
            }
        })?;

        let response: TokenResponse = serde_json::from_value(body).map_err(|e| {
            ApiError::Authentication(format!("unexpected token response: {e}"))
        })?;

        self.store.save(
            keys::SESSION,
            &SessionState {
                access_token: Some(response.access_token.clone()),
                refresh_token: response.refresh_token,
            },
        )?;

        Ok(response.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::mock::{MockTransport, HOST};
    use appflowy_connector_core::MemoryStateStore;

    fn session(transport: Arc<MockTransport>, store: Arc<MemoryStateStore>) -> SessionManager {
        let credentials = Credentials::new(HOST, "user@appflowy.test", "secret").unwrap();
        SessionManager::new(credentials, transport, store)
    }

    #[tokio::test]
    async fn token_is_cached_after_first_login() {
        let transport = MockTransport::with_login();
        let store = Arc::new(MemoryStateStore::new());
        let session = session(transport.clone(), store.clone());

        assert_eq!(session.token(false).await.unwrap(), "token-1");
        assert_eq!(session.token(false).await.unwrap(), "token-1");
        assert_eq!(session.token(false).await.unwrap(), "token-1");

        assert_eq!(transport.count(&Method::POST, paths::TOKEN), 1);
        let stored: SessionState = store.load(keys::SESSION).unwrap().unwrap();
        assert_eq!(stored.access_token.as_deref(), Some("token-1"));
        assert_eq!(stored.refresh_token.as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn password_grant_request_shape() {
        let transport = MockTransport::with_login();
        let session = session(transport.clone(), Arc::new(MemoryStateStore::new()));

        session.token(false).await.unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.url, format!("{HOST}/gotrue/token"));
        assert!(request.bearer_token.is_none());
        assert_eq!(
            request.query,
            Some(vec![("grant_type".to_string(), "password".to_string())])
        );
        assert_eq!(
            request.body,
            Some(json!({"email": "user@appflowy.test", "password": "secret"}))
        );
    }

    #[tokio::test]
    async fn forced_refresh_replaces_stored_token() {
        let transport = MockTransport::with_login();
        let store = Arc::new(MemoryStateStore::new());
        let session = session(transport.clone(), store.clone());

        assert_eq!(session.token(false).await.unwrap(), "token-1");
        assert_eq!(session.token(true).await.unwrap(), "token-2");
        assert_eq!(session.token(false).await.unwrap(), "token-2");
        assert_eq!(session.cached_token().unwrap().as_deref(), Some("token-2"));
        assert_eq!(transport.count(&Method::POST, paths::TOKEN), 2);
    }

    #[tokio::test]
    async fn token_from_previous_invocation_is_reused() {
        let transport = MockTransport::with_login();
        let store = Arc::new(MemoryStateStore::new());
        store
            .save(
                keys::SESSION,
                &SessionState {
                    access_token: Some("persisted".to_string()),
                    refresh_token: None,
                },
            )
            .unwrap();

        let session = session(transport.clone(), store);
        assert_eq!(session.token(false).await.unwrap(), "persisted");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn rejected_password_grant_is_authentication_failure() {
        let transport = MockTransport::new();
        transport.on(
            Method::POST,
            paths::TOKEN,
            Err(TransportError::Status {
                status: 400,
                message: "invalid_grant".to_string(),
            }),
        );
        let store = Arc::new(MemoryStateStore::new());
        let session = session(transport.clone(), store.clone());

        let err = session.token(false).await.unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));
        assert!(store.get(keys::SESSION).unwrap().is_none());
    }

    #[tokio::test]
    async fn unreachable_auth_server_is_request_failure() {
        let transport = MockTransport::new();
        transport.on(
            Method::POST,
            paths::TOKEN,
            Err(TransportError::Connect("connection refused".to_string())),
        );
        let session = session(transport, Arc::new(MemoryStateStore::new()));

        let err = session.token(false).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Request {
                cause: TransportError::Connect(_),
                ..
            }
        ));
    }
}
