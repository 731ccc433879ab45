use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};
use url::Url;

use super::base::LinkingError;
use crate::USER_AGENT;


pub fn build_client(timeout: Duration) -> Result<Client, LinkingError> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?)
}


/// Resolves `path` against `base`, treating `base` as a directory.
pub fn endpoint(base: &str, path: &str) -> Result<Url, LinkingError> {
    let mut base = Url::parse(base)?;
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    Ok(base.join(path)?)
}


/// How a service signals that the caller must slow down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottlePolicy {
    /// 429 (or 503 with `Retry-After`): wait for the server's hint, else `fallback`.
    ServerHinted { fallback: Duration },
    /// 403: wait a fixed `interval`.
    FixedOnForbidden { interval: Duration },
}

impl ThrottlePolicy {

    pub fn throttle_delay(&self, status: StatusCode, headers: &HeaderMap) -> Option<Duration> {
        match *self {
            Self::ServerHinted { fallback } => {
                let hint = retry_after(headers);
                match status {
                    StatusCode::TOO_MANY_REQUESTS => Some(hint.unwrap_or(fallback)),
                    StatusCode::SERVICE_UNAVAILABLE => hint,
                    _ => None,
                }
            }
            Self::FixedOnForbidden { interval } => {
                (status == StatusCode::FORBIDDEN).then_some(interval)
            }
        }
    }
}


fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}


/// Sends the request built by `build`, re-issuing it after every throttle
/// signal for as long as the server keeps sending them.
pub async fn send_throttled<F>(
    service: &'static str,
    policy: ThrottlePolicy,
    build: F,
) -> Result<Response, LinkingError>
where
    F: Fn() -> RequestBuilder + Send + Sync,
{
    let mut throttled: u32 = 0;

    loop {
        let response = build().send().await?;

        match policy.throttle_delay(response.status(), response.headers()) {
            Some(delay) => {
                throttled += 1;
                warn!(
                    "{} throttled (HTTP {}), retrying in {:?} (signal #{})",
                    service,
                    response.status().as_u16(),
                    delay,
                    throttled
                );
                tokio::time::sleep(delay).await;
            }
            None => {
                if throttled > 0 {
                    debug!("{} accepted request after {} throttle signals", service, throttled);
                }
                return Ok(response);
            }
        }
    }
}


pub fn ensure_success(service: &'static str, response: &Response) -> Result<(), LinkingError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(LinkingError::Status {
            service,
            status: status.as_u16(),
        })
    }
}
