//! Shared HTTP plumbing

use std::time::Duration;

use pricebot_core::{BotError, Result};
use reqwest::{Response, StatusCode};

const USER_AGENT: &str = concat!("pricebot/", env!("CARGO_PKG_VERSION"));

pub(crate) fn client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()?)
}

/// Map upstream status codes: 429 is a rate limit, anything else non-2xx is a provider error
pub(crate) fn check_status(response: Response, provider: &str) -> Result<Response> {
    status_error(response.status(), provider).map_or(Ok(response), Err)
}

pub(crate) fn status_error(status: StatusCode, provider: &str) -> Option<BotError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        Some(BotError::RateLimited(provider.to_string()))
    } else if status.is_success() {
        None
    } else {
        Some(BotError::Provider(format!("{provider} returned status {}", status.as_u16())))
    }
}
