use crate::{
    webhooks::{sign, SIGNATURE_HEADER, TIMESTAMP_HEADER},
    Client, Config, RetryConfig,
};

/// Create a test client configured to use a wiremock server.
/// Disables retries by default for predictable test behavior.
pub fn test_client(base_url: &str) -> Client {
    test_client_with_retry(base_url, RetryConfig::disabled())
}

/// Create a test client with an explicit retry policy.
pub fn test_client_with_retry(base_url: &str, retry: RetryConfig) -> Client {
    Client::new(Config {
        base_url: Some(base_url.to_string()),
        api_key: Some("sk_test".into()),
        retry: Some(retry),
        ..Default::default()
    })
    .expect("client")
}

/// Headers of a correctly signed webhook delivery.
pub fn signed_webhook_headers(body: &str, secret: &str, timestamp: i64) -> Vec<(String, String)> {
    let ts = timestamp.to_string();
    let signature = sign(body, secret, &ts).expect("sign");
    vec![
        (TIMESTAMP_HEADER.to_string(), ts),
        (SIGNATURE_HEADER.to_string(), signature),
    ]
}

/// Current unix time in seconds.
pub fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .expect("clock before epoch")
}
