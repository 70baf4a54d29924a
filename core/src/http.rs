//! HTTP transport types and the blocking `ureq` transport.
//!
//! # Design
//! Requests and responses are plain data. `MauticClient` builds an
//! `HttpRequest` and parses an `HttpResponse` without touching the network;
//! a `Transport` sits between the two and performs the round-trip. The
//! default `UreqTransport` is blocking, which matches the one-submission,
//! one-request-at-a-time model of the form pipeline.

use tracing::debug;

use crate::error::TransportError;

/// HTTP method for a request. Mautic's feed endpoints only need these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// An HTTP request described as plain data. `url` is absolute and already
/// carries any query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

/// Executes an `HttpRequest`. Non-2xx statuses are data, not errors: only a
/// failure to complete the exchange is a `TransportError`.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        // 4xx/5xx must come back as responses so the client can read
        // Mautic's error payload.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!(method = request.method.as_str(), url = %request.url, "sending request");

        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&request.url);
                for (k, v) in &request.headers {
                    builder = builder.header(k, v);
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&request.url);
                for (k, v) in &request.headers {
                    builder = builder.header(k, v);
                }
                match &request.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError(e.to_string()))?;

        debug!(status, "received response");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording stub transport shared by the unit tests.

    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    #[derive(Default)]
    pub(crate) struct StubTransport {
        replies: RefCell<VecDeque<Result<HttpResponse, TransportError>>>,
        pub(crate) requests: RefCell<Vec<HttpRequest>>,
        fallback: Option<HttpResponse>,
    }

    impl StubTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Answers every request with `status`/`body` once the queue is empty.
        pub(crate) fn always(status: u16, body: &str) -> Self {
            Self {
                fallback: Some(HttpResponse::new(status, body)),
                ..Self::default()
            }
        }

        pub(crate) fn reply(self, status: u16, body: &str) -> Self {
            self.replies
                .borrow_mut()
                .push_back(Ok(HttpResponse::new(status, body)));
            self
        }

        pub(crate) fn fail(self, message: &str) -> Self {
            self.replies
                .borrow_mut()
                .push_back(Err(TransportError(message.to_string())));
            self
        }

        pub(crate) fn calls(&self) -> usize {
            self.requests.borrow().len()
        }

        pub(crate) fn urls(&self) -> Vec<String> {
            self.requests.borrow().iter().map(|r| r.url.clone()).collect()
        }
    }

    impl Transport for StubTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests.borrow_mut().push(request.clone());
            match self.replies.borrow_mut().pop_front() {
                Some(reply) => reply,
                None => match &self.fallback {
                    Some(resp) => Ok(resp.clone()),
                    None => panic!("unexpected request: {} {}", request.method.as_str(), request.url),
                },
            }
        }
    }
}
