use std::time::Duration;

pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    build_http_client_with_timeout(None)
}

/// Proxy discovery is opt-in via `SENTINEL_ENABLE_SYSTEM_PROXY`; if it fails we fall back to no_proxy.
pub fn build_http_client_with_timeout(
    timeout: Option<Duration>,
) -> Result<reqwest::Client, reqwest::Error> {
    let allow_system_proxy = std::env::var("SENTINEL_ENABLE_SYSTEM_PROXY")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if allow_system_proxy {
        match attempt_build(timeout, false) {
            Ok(client) => return Ok(client),
            Err(e) => tracing::warn!(
                "HTTP client initialization with system proxy discovery failed ({}); retrying with no_proxy",
                e
            ),
        }
    }

    attempt_build(timeout, true)
}

fn attempt_build(
    timeout: Option<Duration>,
    no_proxy: bool,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    if no_proxy {
        builder = builder.no_proxy();
    }
    builder.build()
}
