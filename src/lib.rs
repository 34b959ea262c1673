//! One-shot JSON-over-HTTP greeting client: a thin reqwest wrapper behind a
//! transport seam, an in-memory mock transport for fully deterministic
//! tests, and the runner that issues the single fixed greeting request.

pub mod mock;
pub mod runner;
pub mod transport;

pub use reqwest::Method;

pub use mock::{MockBehavior, MockResponse, MockSnapshot, MockTransport};
pub use transport::{
    BoxFuture, Client, Error, HttpTransport, Request, Response, Result, Transport,
};
