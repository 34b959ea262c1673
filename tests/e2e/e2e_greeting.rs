//! End-to-end exercise against a local greeting service. The runner's URL is
//! fixed, so the fixture binds 127.0.0.1:8080 and everything runs inside one
//! test body.

use axum::Router;
use axum::http::{HeaderMap, StatusCode, header::CONTENT_TYPE};
use axum::response::{IntoResponse, Response as AxumResponse};
use axum::routing::{get, post};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sonic_rs::{JsonValueTrait, Value};
use tokio::net::TcpListener;

use http_json::{Client, Request, runner};

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GreetingOptions {
    first_name: Option<Value>,
    last_name: Option<Value>,
    nickname: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    status: String,
}

fn null_or_empty(value: &Option<Value>) -> bool {
    match value {
        None => true,
        Some(value) => {
            value.is_null() || value.as_str().map_or(false, |s| s.is_empty())
        }
    }
}

fn required_string(value: &Value) -> Result<String, String> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| "must be string".to_string())
}

fn build_greeting(headers: &HeaderMap, body: &[u8]) -> Result<String, String> {
    let json_content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    if !json_content_type || body.is_empty() {
        return Err("must have required property 'firstName'".to_string());
    }

    let options: GreetingOptions =
        sonic_rs::from_slice(body).map_err(|_| "must be object".to_string())?;

    let name = if !null_or_empty(&options.nickname) {
        required_string(options.nickname.as_ref().expect("nickname checked above"))?
    } else {
        if null_or_empty(&options.first_name) {
            return Err("must have required property 'firstName'".to_string());
        }
        let mut name =
            required_string(options.first_name.as_ref().expect("firstName checked above"))?;
        if !null_or_empty(&options.last_name) {
            let last =
                required_string(options.last_name.as_ref().expect("lastName checked above"))?;
            name.push(' ');
            name.push_str(&last);
        }
        name
    };

    Ok(format!("Hello, {name}!"))
}

fn json_response(status: StatusCode, body: String) -> AxumResponse {
    (status, [(CONTENT_TYPE, "application/json")], body).into_response()
}

async fn greeting(headers: HeaderMap, body: Bytes) -> AxumResponse {
    match build_greeting(&headers, &body) {
        Ok(greeting) => json_response(
            StatusCode::OK,
            sonic_rs::to_string(&greeting).expect("greeting should serialize"),
        ),
        Err(message) => json_response(
            StatusCode::BAD_REQUEST,
            format!(
                r#"{{"message":{},"status":"400"}}"#,
                sonic_rs::to_string(&message).expect("message should serialize")
            ),
        ),
    }
}

async fn ping() -> AxumResponse {
    json_response(StatusCode::OK, r#""Hello, world!""#.to_string())
}

fn app() -> Router {
    Router::new()
        .route("/api/greeting", post(greeting))
        .route("/api/ping", get(ping))
}

#[tokio::test]
async fn e2e_greeting_service_roundtrip() {
    let listener = TcpListener::bind("127.0.0.1:8080")
        .await
        .expect("port 8080 should be free for the greeting fixture");
    tokio::spawn(async move {
        axum::serve(listener, app())
            .await
            .expect("greeting fixture should serve");
    });

    let client = Client::new();

    // Happy path: the fixed payload greets Corey.
    let parsed = runner::run(&client).await.expect("greeting should succeed");
    let expected: Value =
        sonic_rs::from_str(r#""Hello, Corey!""#).expect("fixture should be valid JSON");
    assert_eq!(parsed, expected);

    // A second invocation is independent and identical.
    let again = runner::run(&client)
        .await
        .expect("second greeting should succeed");
    assert_eq!(again, expected);

    // Ping endpoint answers with the canned JSON string.
    let response = client
        .send(Request::get("http://localhost:8080/api/ping"))
        .await
        .expect("ping should succeed");
    assert!(response.is_success());
    assert_eq!(
        response.json::<String>().expect("ping body should decode"),
        "Hello, world!"
    );

    // Full name and nickname handling, straight through the client.
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct FullName {
        first_name: &'static str,
        last_name: &'static str,
    }

    let response = client
        .post_json(
            runner::GREETING_URL,
            &FullName {
                first_name: "Corey",
                last_name: "Ferguson",
            },
        )
        .await
        .expect("full-name greeting should succeed");
    assert_eq!(
        response.json::<String>().expect("body should decode"),
        "Hello, Corey Ferguson!"
    );

    #[derive(Serialize)]
    struct Nicknamed {
        nickname: &'static str,
    }

    let response = client
        .post_json(runner::GREETING_URL, &Nicknamed { nickname: "Core" })
        .await
        .expect("nickname greeting should succeed");
    assert_eq!(
        response.json::<String>().expect("body should decode"),
        "Hello, Core!"
    );

    // Validation failures come back as 400 with the service's error body.
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct LastNameOnly {
        last_name: &'static str,
    }

    let response = client
        .post_json(runner::GREETING_URL, &LastNameOnly { last_name: "Ferguson" })
        .await
        .expect("transport should complete even for a rejected payload");
    assert_eq!(response.status(), 400);
    let error: ErrorBody = response.json().expect("error body should decode");
    assert_eq!(error.message, "must have required property 'firstName'");
    assert_eq!(error.status, "400");

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct NumericName {
        first_name: u32,
    }

    let response = client
        .post_json(runner::GREETING_URL, &NumericName { first_name: 7 })
        .await
        .expect("transport should complete even for a rejected payload");
    assert_eq!(response.status(), 400);
    let error: ErrorBody = response.json().expect("error body should decode");
    assert_eq!(error.message, "must be string");
}
