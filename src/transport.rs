use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use bytes::Bytes;
use reqwest::header::HeaderValue;
use reqwest::{Client as ReqwestClient, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;
pub type Result<T> = std::result::Result<T, Error>;

/// Failure surfaced by an HTTP exchange.
///
/// No variant is recovered from locally; callers propagate with `?` and the
/// top-level handler reports whatever arrives.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    /// The exchange could not be completed: connect, send, receive, or a
    /// non-success status from the server.
    #[error("transport failure: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },
    /// The response body is not valid JSON.
    #[error("response body is not valid JSON: {0}")]
    Decode(String),
    /// The request could not be built in the first place.
    #[error("invalid request: {0}")]
    Request(String),
}

impl Error {
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    pub fn decode(err: sonic_rs::Error) -> Self {
        Self::Decode(err.to_string())
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self::Request(message.into())
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        Self::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }

    /// HTTP status attached to the failure, when the server got far enough
    /// to produce one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            Self::Decode(_) | Self::Request(_) => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, Bytes)>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `payload` and installs it as the request body.
    pub fn with_json_body<T: Serialize>(self, payload: &T) -> Result<Self> {
        let body = sonic_rs::to_vec(payload).map_err(|err| Error::request(err.to_string()))?;
        Ok(self.with_body(body))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// First header value recorded under `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_ref())
    }
}

#[derive(Clone, Debug)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, Bytes)>,
    pub body: Bytes,
}

impl Response {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        sonic_rs::from_slice(&self.body).map_err(Error::decode)
    }
}

/// Seam between the client and the wire. The reqwest-backed transport is the
/// production implementation; tests inject [`crate::mock::MockTransport`].
pub trait Transport: Send + Sync {
    fn send(&self, request: Request) -> BoxFuture<Result<Response>>;
}

#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
}

impl Client {
    pub fn new() -> Self {
        Self::with_transport(HttpTransport::new())
    }

    pub fn with_transport<T>(transport: T) -> Self
    where
        T: Transport + 'static,
    {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub async fn send(&self, request: Request) -> Result<Response> {
        self.transport.send(request).await
    }

    /// POSTs `payload` as JSON with a `content-type: application/json` header.
    pub async fn post_json<T: Serialize>(
        &self,
        url: impl Into<String>,
        payload: &T,
    ) -> Result<Response> {
        let request = Request::post(url)
            .with_header("content-type", "application/json")
            .with_json_body(payload)?;
        self.send(request).await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: ReqwestClient,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: ReqwestClient::new(),
        }
    }

    pub fn with_client(client: ReqwestClient) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: Request) -> BoxFuture<Result<Response>> {
        let client = self.client.clone();
        Box::pin(async move {
            let mut req = client.request(request.method.clone(), &request.url);

            for (key, value) in request.headers {
                let value = HeaderValue::from_bytes(value.as_ref())
                    .map_err(|err| Error::request(err.to_string()))?;
                req = req.header(key, value);
            }

            if let Some(body) = request.body {
                req = req.body(body);
            }

            if let Some(timeout) = request.timeout {
                req = req.timeout(timeout);
            }

            let resp = req.send().await.map_err(Error::from_reqwest)?;

            let status = resp.status().as_u16();
            let headers = resp
                .headers()
                .iter()
                .map(|(name, value)| (name.to_string(), Bytes::copy_from_slice(value.as_ref())))
                .collect();
            let body = resp.bytes().await.map_err(Error::from_reqwest)?;

            Ok(Response {
                status,
                headers,
                body,
            })
        })
    }
}
