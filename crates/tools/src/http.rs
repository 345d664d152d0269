//! Shared HTTP plumbing for the web tools.

use std::time::Duration;

use reqwest::StatusCode;
use runtime::tools::ToolError;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; clerk/0.1)";

pub(crate) fn client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Transport failures mean the outside world is unreachable.
pub(crate) fn transport_error(err: reqwest::Error) -> ToolError {
    if err.is_connect() || err.is_timeout() {
        ToolError::Unavailable(err.to_string())
    } else {
        ToolError::Execution(err.to_string())
    }
}

/// Upstream outages abort the run; anything else is for the model to see.
pub(crate) fn status_error(status: StatusCode) -> Option<ToolError> {
    if status.is_success() {
        None
    } else if status.is_server_error() {
        Some(ToolError::Unavailable(format!("upstream returned {status}")))
    } else {
        Some(ToolError::Execution(format!("HTTP error: {status}")))
    }
}

/// GET `url` and return the body text.
pub(crate) async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, ToolError> {
    let response = client.get(url).send().await.map_err(transport_error)?;
    if let Some(err) = status_error(response.status()) {
        return Err(err);
    }
    response.text().await.map_err(transport_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_with_timeout() {
        assert!(client(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn statuses_classify() {
        assert_eq!(status_error(StatusCode::OK), None);
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY),
            Some(ToolError::Unavailable(_))
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS),
            Some(ToolError::Execution(msg)) if msg.contains("429")
        ));
    }
}
