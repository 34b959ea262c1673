//! The request runner: one POST to the fixed greeting endpoint, parse the
//! JSON reply, log it, propagate anything that goes wrong.

use serde::Serialize;
use sonic_rs::Value;

use crate::transport::{Client, Error, Result};

pub const GREETING_URL: &str = "http://localhost:8080/api/greeting";

/// Fixed request payload, serialized as `{"firstName":"Corey"}`.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct GreetingPayload {
    #[serde(rename = "firstName")]
    pub first_name: &'static str,
}

pub const PAYLOAD: GreetingPayload = GreetingPayload {
    first_name: "Corey",
};

/// Sends the greeting request and returns the parsed response body.
///
/// Exactly one request goes out per call, and nothing is shared between
/// calls. Connect, send, receive, non-success status, and JSON decode
/// failures all come back unchanged as [`Error`]s.
pub async fn run(client: &Client) -> Result<Value> {
    let response = client.post_json(GREETING_URL, &PAYLOAD).await?;

    if !response.is_success() {
        return Err(Error::transport(
            Some(response.status()),
            format!(
                "greeting endpoint rejected the request: {}",
                String::from_utf8_lossy(response.body())
            ),
        ));
    }

    let value: Value = response.json()?;
    tracing::info!(response = ?value, "greeting response");
    Ok(value)
}
