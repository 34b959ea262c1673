//! In-memory [`Transport`] for fully deterministic tests: queued responses,
//! injectable failures, and a log of every request that went out.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use sonic_rs::to_vec;

use super::transport::{BoxFuture, Error, Request, Response, Result, Transport};

/// What the mock does with the next request, ahead of any queued response.
#[derive(Clone, Debug, Default)]
pub enum MockBehavior {
    #[default]
    Pass,
    ConnectError(String),
    ReceiveError(String),
    Drop,
}

impl MockBehavior {
    pub fn connect_error(reason: impl Into<String>) -> Self {
        Self::ConnectError(reason.into())
    }

    pub fn receive_error(reason: impl Into<String>) -> Self {
        Self::ReceiveError(reason.into())
    }

    pub fn drop_response() -> Self {
        Self::Drop
    }
}

#[derive(Clone, Debug)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, Bytes)>,
    pub body: Bytes,
}

impl MockResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, body.into())
    }

    pub fn json<T: Serialize>(status: u16, payload: &T) -> Result<Self> {
        let body = to_vec(payload).map_err(|err| Error::request(err.to_string()))?;
        Ok(Self::new(status, body))
    }
}

#[derive(Clone, Debug)]
pub struct MockSnapshot {
    pub request_count: usize,
    pub last_url: Option<String>,
    pub last_status: Option<u16>,
    pub last_error: Option<String>,
    pub behavior_remaining: usize,
    pub queued_responses: usize,
}

#[derive(Debug, Default)]
struct MockState {
    behaviors: VecDeque<MockBehavior>,
    default_queue: VecDeque<MockResponse>,
    route_queues: HashMap<(Method, String), VecDeque<MockResponse>>,
    outbound_log: Vec<Request>,
    inbound_log: Vec<Response>,
    request_count: usize,
    last_url: Option<String>,
    last_status: Option<u16>,
    last_error: Option<String>,
}

impl MockState {
    fn snapshot(&self) -> MockSnapshot {
        MockSnapshot {
            request_count: self.request_count,
            last_url: self.last_url.clone(),
            last_status: self.last_status,
            last_error: self.last_error.clone(),
            behavior_remaining: self.behaviors.len(),
            queued_responses: self.default_queue.len()
                + self.route_queues.values().map(VecDeque::len).sum::<usize>(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self, context: &str) -> std::sync::MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|_| panic!("mock transport mutex poisoned while {context}"))
    }

    pub fn push_behavior(&self, behavior: MockBehavior) {
        self.lock("pushing behavior").behaviors.push_back(behavior);
    }

    pub fn queue_response(&self, response: MockResponse) {
        self.lock("queueing response")
            .default_queue
            .push_back(response);
    }

    pub fn queue_response_for(
        &self,
        method: Method,
        url: impl Into<String>,
        response: MockResponse,
    ) {
        self.lock("queueing response by route")
            .route_queues
            .entry((method, url.into()))
            .or_default()
            .push_back(response);
    }

    pub fn queue_post_response(&self, url: impl Into<String>, response: MockResponse) {
        self.queue_response_for(Method::POST, url, response);
    }

    pub fn queue_get_response(&self, url: impl Into<String>, response: MockResponse) {
        self.queue_response_for(Method::GET, url, response);
    }

    pub fn snapshot(&self) -> MockSnapshot {
        self.lock("taking snapshot").snapshot()
    }

    /// Every request the mock has seen, in order.
    pub fn outbound_requests(&self) -> Vec<Request> {
        self.lock("reading outbound log").outbound_log.clone()
    }

    pub fn outbound_count(&self) -> usize {
        self.lock("reading outbound count").outbound_log.len()
    }

    pub fn inbound_count(&self) -> usize {
        self.lock("reading inbound count").inbound_log.len()
    }

    fn next_response(&self, request: &Request) -> Option<MockResponse> {
        let mut state = self.lock("selecting response");
        let route_key = (request.method.clone(), request.url.clone());
        if let Some(queue) = state.route_queues.get_mut(&route_key) {
            if let Some(response) = queue.pop_front() {
                return Some(response);
            }
        }
        state.default_queue.pop_front()
    }

    fn fail(&self, status: Option<u16>, message: String) -> Error {
        let mut state = self.lock("recording failure");
        state.last_error = Some(message.clone());
        state.last_status = status;
        Error::transport(status, message)
    }
}

impl Transport for MockTransport {
    fn send(&self, request: Request) -> BoxFuture<Result<Response>> {
        let mock = self.clone();
        Box::pin(async move {
            let behavior = {
                let mut state = mock.lock("updating state before send");
                state.request_count += 1;
                state.last_url = Some(request.url.clone());
                state.last_error = None;
                state.outbound_log.push(request.clone());
                state.behaviors.pop_front().unwrap_or_default()
            };

            match behavior {
                MockBehavior::ConnectError(reason) => return Err(mock.fail(None, reason)),
                MockBehavior::ReceiveError(reason) => return Err(mock.fail(None, reason)),
                MockBehavior::Drop => {
                    return Err(mock.fail(None, "mock transport dropped the response".to_string()));
                }
                MockBehavior::Pass => {}
            }

            // Empty queue falls back to an empty 200, like a server that
            // answered with no body.
            let response = match mock.next_response(&request) {
                Some(response) => Response {
                    status: response.status,
                    headers: response.headers,
                    body: response.body,
                },
                None => Response {
                    status: 200,
                    headers: Vec::new(),
                    body: Bytes::new(),
                },
            };

            let mut state = mock.lock("recording response");
            state.last_status = Some(response.status);
            state.inbound_log.push(response.clone());
            drop(state);

            Ok(response)
        })
    }
}
