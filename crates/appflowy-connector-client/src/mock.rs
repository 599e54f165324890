//! Scripted transport for tests.

use crate::error::TransportError;
use crate::transport::{HttpRequest, Transport};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub(crate) const HOST: &str = "https://appflowy.test";

type Reply = Result<Value, TransportError>;

struct Route {
    method: Method,
    path: String,
    replies: VecDeque<Reply>,
}

/// Replays queued replies per method and path; the last reply of a route
/// repeats once the queue is down to one entry.
#[derive(Default)]
pub(crate) struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mock that answers the password grant with `token-1`, `token-2`, ...
    pub(crate) fn with_login() -> Arc<Self> {
        let transport = Self::new();
        for n in 1..=5 {
            transport.on(
                Method::POST,
                crate::paths::TOKEN,
                Ok(json!({
                    "access_token": format!("token-{n}"),
                    "refresh_token": format!("refresh-{n}"),
                })),
            );
        }
        transport
    }

    pub(crate) fn on(&self, method: Method, path: &str, reply: Reply) {
        let mut routes = self.routes.lock().unwrap();
        if let Some(route) = routes
            .iter_mut()
            .find(|route| route.method == method && route.path == path)
        {
            route.replies.push_back(reply);
        } else {
            routes.push(Route {
                method,
                path: path.to_string(),
                replies: VecDeque::from([reply]),
            });
        }
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, method: &Method, path: &str) -> usize {
        let url = format!("{HOST}{path}");
        self.requests()
            .iter()
            .filter(|request| &request.method == method && request.url == url)
            .count()
    }
}

pub(crate) fn unauthorized() -> TransportError {
    TransportError::Status {
        status: 401,
        message: r#"{"code":"UserUnAuthorized"}"#.to_string(),
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &HttpRequest) -> Result<Value, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        let path = request.url.strip_prefix(HOST).unwrap_or(&request.url);
        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .find(|route| route.method == request.method && route.path == path)
            .unwrap_or_else(|| panic!("unexpected request {} {path}", request.method));

        if route.replies.len() > 1 {
            route.replies.pop_front().unwrap()
        } else {
            route.replies.front().cloned().unwrap()
        }
    }
}
