//! Error types shared across the report pipeline.

use std::time::Duration;

use thiserror::Error;

/// Misconfiguration discovered while building the pipeline. Always fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{backend} backend requires a model identifier")]
    MissingModel { backend: &'static str },

    #[error("{backend} backend requires an API key")]
    MissingCredentials { backend: &'static str },

    #[error("Unsupported model backend: {0}")]
    UnsupportedBackend(String),

    #[error("Unsupported alert source kind: {0}")]
    UnsupportedSource(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// A single alert source could not be polled.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{source_name}: request failed: {error}")]
    Request {
        source_name: String,
        #[source]
        error: reqwest::Error,
    },

    #[error("{source_name}: feed returned {status}: {body}")]
    Status {
        source_name: String,
        status: u16,
        body: String,
    },

    #[error("{source_name}: failed to decode feed response: {error}")]
    Decode {
        source_name: String,
        #[source]
        error: reqwest::Error,
    },
}

/// A model backend call failed.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("API returned error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// The backend answered, but the answer is not usable as a report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Empty response from model")]
    Empty,

    #[error("Abnormally short response ({len} chars, minimum {min}): {content}")]
    TooShort {
        len: usize,
        min: usize,
        content: String,
    },
}

/// Terminal result of a report generation call once every attempt is spent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Report generation failed after {attempts} attempt(s): {last_error}")]
pub struct GenerationFailure {
    pub attempts: u32,
    pub last_error: String,
}
