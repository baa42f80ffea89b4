//! `apiCall` step execution: renders `url`/`headers`/`body` as templates,
//! issues the request with the step's own timeout/retry policy, and runs each
//! `capture[]` entry against the decoded response body.

use std::time::Duration;

use hyperfleet_adapter_core::{ApiCallStep, RetryBackoff, StepError};
use serde_json::Value;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRY_ATTEMPTS: u32 = 0;
const RETRY_BASE: Duration = Duration::from_millis(200);

pub struct ApiCallOutcome {
    /// Bound under `params[step.name]`.
    pub body: Value,
    /// Bound under `params[capture.name]` for every `capture[]` entry.
    pub captures: Vec<(String, Value)>,
}

pub async fn execute(client: &reqwest::Client, step: &ApiCallStep, scope: &Value) -> Result<ApiCallOutcome, StepError> {
    let url = hyperfleet_adapter_expr::render_template(&step.url, scope)?;

    let mut headers = reqwest::header::HeaderMap::new();
    for (key, value) in &step.headers {
        let rendered = hyperfleet_adapter_expr::render_template(value, scope)?;
        let name = reqwest::header::HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| StepError::Other(format!("invalid header name {key:?}: {e}")))?;
        let value = reqwest::header::HeaderValue::from_str(&rendered)
            .map_err(|e| StepError::Other(format!("invalid header value for {key:?}: {e}")))?;
        headers.insert(name, value);
    }

    let body = match &step.body {
        Some(body) => Some(hyperfleet_adapter_manifest::render_mapping(body, &|s: &str| hyperfleet_adapter_expr::render_template(s, scope))?),
        None => None,
    };

    let timeout = Duration::from_secs(step.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS));
    let attempts = step.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS);
    let backoff = step.retry_backoff.unwrap_or_default();

    let method = reqwest::Method::from_bytes(step.method.as_str().as_bytes()).expect("HttpMethod::as_str is always a valid method token");

    let mut last_err = None;
    for attempt in 0..=attempts {
        let mut request = client.request(method.clone(), &url).timeout(timeout).headers(headers.clone());
        if let Some(body) = &body {
            request = request.json(body);
        }

        match request.send().await {
            Ok(resp) if resp.status().is_success() => {
                let body = resp
                    .json::<Value>()
                    .await
                    .unwrap_or(Value::Null);
                let captures = step
                    .capture
                    .iter()
                    .map(|c| (c.name.clone(), crate::param::resolve_dotted(&c.field, &body).unwrap_or(Value::Null)))
                    .collect();
                return Ok(ApiCallOutcome { body, captures });
            }
            Ok(resp) => {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                last_err = Some(format!("{method} {url} returned {status}: {text}"));
            }
            Err(e) => {
                last_err = Some(format!("{method} {url} failed: {e}"));
            }
        }

        if attempt < attempts {
            tokio::time::sleep(backoff_delay(backoff, attempt + 1)).await;
        }
    }

    Err(StepError::Other(last_err.unwrap_or_else(|| format!("{method} {url} exhausted retries"))))
}

fn backoff_delay(backoff: RetryBackoff, attempt: u32) -> Duration {
    match backoff {
        RetryBackoff::Constant => RETRY_BASE,
        RetryBackoff::Linear => RETRY_BASE * attempt,
        RetryBackoff::Exponential => RETRY_BASE * 2u32.saturating_pow(attempt.saturating_sub(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_backoff_is_flat() {
        assert_eq!(backoff_delay(RetryBackoff::Constant, 1), RETRY_BASE);
        assert_eq!(backoff_delay(RetryBackoff::Constant, 4), RETRY_BASE);
    }

    #[test]
    fn linear_backoff_scales_with_attempt() {
        assert_eq!(backoff_delay(RetryBackoff::Linear, 3), RETRY_BASE * 3);
    }

    #[test]
    fn exponential_backoff_doubles_each_attempt() {
        assert_eq!(backoff_delay(RetryBackoff::Exponential, 1), RETRY_BASE);
        assert_eq!(backoff_delay(RetryBackoff::Exponential, 2), RETRY_BASE * 2);
        assert_eq!(backoff_delay(RetryBackoff::Exponential, 3), RETRY_BASE * 4);
    }
}
