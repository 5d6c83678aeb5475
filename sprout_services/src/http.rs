use std::time::Duration;

use reqwest::{Client, Response};

use crate::ServiceError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("sprout/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_client() -> Result<Client, ServiceError> {
    Ok(Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()?)
}

/// Turns a non-success status into [`ServiceError::Status`] carrying the body.
pub(crate) async fn ensure_success(
    service: &'static str,
    response: Response,
) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    log::warn!("[{service}] Request failed with {status}");
    Err(ServiceError::Status {
        service,
        status,
        body,
    })
}
