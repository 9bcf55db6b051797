use std::time::Duration;

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};

use crate::config::HttpDefaults;
use crate::errors::Result;

/// Builds a retrying HTTP client from the merged (defaults-overlaid-by-observation)
/// configuration the request is actually issued with.
pub fn build_client(config: &HttpDefaults) -> Result<ClientWithMiddleware> {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .danger_accept_invalid_certs(!config.validate_cert);

    if let Some(ua) = &config.user_agent {
        builder = builder.user_agent(ua);
    }

    let mut headers = reqwest::header::HeaderMap::new();
    for (key, value) in &config.headers {
        let name = reqwest::header::HeaderName::from_bytes(key.as_bytes())?;
        let val = reqwest::header::HeaderValue::from_str(value)?;
        headers.insert(name, val);
    }
    if let (Some(user), Some(pass)) = (&config.auth_username, &config.auth_password) {
        let creds = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            format!("{user}:{pass}"),
        );
        let mut val = reqwest::header::HeaderValue::from_str(&format!("Basic {creds}"))?;
        val.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, val);
    }
    builder = builder.default_headers(headers);

    let inner = builder.build()?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
    let client = ClientBuilder::new(inner)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build();

    Ok(client)
}
