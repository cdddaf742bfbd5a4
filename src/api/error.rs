//! API error taxonomy and HTTP response classification

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Longest body excerpt kept in an error message
const BODY_EXCERPT_LEN: usize = 200;

/// Errors produced by the GitHub API client
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Connection, timeout or body-read failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Secondary (abuse) rate limit; `retry_after` is the server-dictated wait
    #[error("Secondary rate limit hit (retry after {retry_after:?})")]
    PlatformAbuse { retry_after: Option<Duration> },

    /// Bad or missing credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-success status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// GraphQL-level error payload
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// Response body did not have the expected shape
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether the retry policy should try again after this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::PlatformAbuse { .. })
    }

    /// Server-provided wait, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::PlatformAbuse { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Classifies a non-success HTTP response
///
/// | Condition | Result |
/// |-----------|--------|
/// | 401 | `Unauthorized` |
/// | 403/429 with `Retry-After`, an exhausted quota or a rate-limit body | `PlatformAbuse` |
/// | anything else | `Http` |
///
/// The abuse wait comes from `Retry-After` (seconds), falling back to
/// `x-ratelimit-reset` (epoch seconds) relative to `now_epoch`.
pub fn classify_status(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    now_epoch: i64,
) -> ApiError {
    if status == StatusCode::UNAUTHORIZED {
        return ApiError::Unauthorized(excerpt(body));
    }

    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = header_u64(headers, "retry-after").map(Duration::from_secs);
        let quota_exhausted = header_u64(headers, "x-ratelimit-remaining") == Some(0);
        let lowered = body.to_ascii_lowercase();
        let rate_limit_body = lowered.contains("secondary rate limit")
            || lowered.contains("abuse")
            || lowered.contains("rate limit exceeded");

        if retry_after.is_some()
            || quota_exhausted
            || rate_limit_body
            || status == StatusCode::TOO_MANY_REQUESTS
        {
            let retry_after = retry_after.or_else(|| {
                let reset = header_u64(headers, "x-ratelimit-reset")?;
                let wait = i64::try_from(reset).ok()?.checked_sub(now_epoch)?;
                u64::try_from(wait).ok().map(Duration::from_secs)
            });
            return ApiError::PlatformAbuse { retry_after };
        }
    }

    ApiError::Http {
        status: status.as_u16(),
        body: excerpt(body),
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
