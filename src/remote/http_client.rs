use anyhow::{Context, Result};
use std::time::Duration;

use super::wire::ApiErrorBody;
use crate::utils::config::RetryConsts;

/// Marks an error as permanent so [`with_retries`] gives up immediately.
#[derive(Debug)]
pub(super) struct Permanent(pub String);

impl std::fmt::Display for Permanent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Permanent {}

/// Run `f` up to `RetryConsts::ATTEMPTS` times with exponential backoff.
/// Errors carrying a [`Permanent`] are returned without retrying.
pub fn with_retries<T>(label: &str, mut f: impl FnMut() -> Result<T>) -> Result<T> {
    let mut last: Option<anyhow::Error> = None;
    for i in 0..RetryConsts::ATTEMPTS {
        match f() {
            Ok(v) => return Ok(v),
            Err(err) => {
                if err.downcast_ref::<Permanent>().is_some() {
                    return Err(err.context(label.to_string()));
                }
                log::debug!("{} failed (attempt {}): {:#}", label, i + 1, err);
                last = Some(err);
                if i + 1 < RetryConsts::ATTEMPTS {
                    std::thread::sleep(Duration::from_millis(
                        RetryConsts::BASE_BACKOFF_MS * (1 << i),
                    ));
                }
            }
        }
    }
    Err(last
        .unwrap_or_else(|| anyhow::anyhow!("unknown error"))
        .context(label.to_string()))
}

/// Map a response status to Ok or an error. 4xx are permanent; 5xx are retried.
pub(super) fn ensure_ok(
    resp: reqwest::blocking::Response,
    label: &str,
) -> Result<reqwest::blocking::Response> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Permanent(
            "unauthorized (token invalid/expired; set GITHUB_TOKEN or use --ask-token)".into(),
        )
        .into());
    }
    if status == reqwest::StatusCode::FORBIDDEN {
        let remaining = resp
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("?")
            .to_string();
        return Err(Permanent(format!(
            "forbidden: {} (rate limit remaining: {remaining}; a token raises the limit)",
            api_message(resp)
        ))
        .into());
    }
    if status.is_client_error() {
        let message = api_message(resp);
        return Err(Permanent(format!("{} status {}: {}", label, status, message)).into());
    }
    resp.error_for_status()
        .with_context(|| format!("{} status", label))
}

/// `message` field of a GitHub error body, or the raw body when it is not JSON.
fn api_message(resp: reqwest::blocking::Response) -> String {
    let body = resp.text().unwrap_or_default();
    serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
