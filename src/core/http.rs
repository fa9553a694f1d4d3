use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;
use tracing::debug;

pub const APP_USER_AGENT: &str = "ServerStarter/0.1.0";

const CONNECTIVITY_PROBE_URL: &str = "http://clients3.google.com/generate_204";

pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .build()
}

/// Client with a hard per-request timeout, used for metadata lookups.
pub fn build_http_client_with_timeout(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Returns `true` when the connectivity check answers at all.
pub async fn check_connection(client: &Client) -> bool {
    match client
        .get(CONNECTIVITY_PROBE_URL)
        .timeout(Duration::from_secs(5))
        .send()
        .await
    {
        Ok(_) => true,
        Err(e) => {
            debug!("Connectivity check failed: {}", e);
            false
        }
    }
}
