//! Common utilities shared across LLM providers.

use crate::error::{IntentError, Result};
use reqwest::{Client, Response};
use std::time::Duration;

/// Build a standard HTTP client with common timeout settings.
///
/// # Errors
/// Returns error if the HTTP client cannot be created.
pub fn build_http_client(timeout_secs: Option<u64>) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.unwrap_or(60)))
        .build()
        .map_err(|e| IntentError::Internal(format!("failed to create HTTP client: {e}")))
}

/// Turn a non-2xx response into [`IntentError::ApiError`].
pub async fn check_status(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(IntentError::ApiError {
        provider: provider.to_string(),
        status: status.as_u16(),
        message,
    })
}
