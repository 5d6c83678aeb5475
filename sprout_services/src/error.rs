use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("{service} responded with {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("Missing {0}")]
    MissingInput(&'static str),
    #[error("Unexpected response from {0}")]
    UnexpectedResponse(&'static str),
}
