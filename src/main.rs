use http_json::{Client, runner};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> http_json::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // A failure propagates out of main, printing the diagnostic and exiting
    // non-zero.
    let client = Client::new();
    runner::run(&client).await?;
    Ok(())
}
