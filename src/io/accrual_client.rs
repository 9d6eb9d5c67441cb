//! HTTP client for the external accrual service
//!
//! Queries `GET {base}/api/orders/{number}` and maps the reply onto the
//! [`AccrualOracle`] contract:
//!
//! | Reply | Result |
//! |---|---|
//! | `200` with a JSON report | `Ok(Some(report))` |
//! | `204`, `404` | `Ok(None)` |
//! | `429` | `OracleError::RateLimited`, delay from `Retry-After` |
//! | `5xx`, anything else, transport failure | `OracleError::Unavailable` |
//! | body that does not decode | `OracleError::Malformed` |
//!
//! Status mapping lives in [`decode_reply`] so it can be tested without a
//! server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use tracing::debug;

use crate::core::traits::AccrualOracle;
use crate::types::{AccrualReport, OracleError};

/// Delay used when a rate-limit reply carries no usable `Retry-After`
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Upper bound on a `Retry-After` delay taken from the service
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(60 * 60);

/// Accrual oracle backed by the accrual service's HTTP API
#[derive(Debug, Clone)]
pub struct HttpAccrualOracle {
    client: Client,
    base_url: String,
}

impl HttpAccrualOracle {
    /// Create a client for the service at `address`
    ///
    /// `address` may omit the scheme, in which case `http://` is assumed.
    /// `timeout` bounds every request end to end.
    pub fn new(address: &str, timeout: Duration) -> Result<Self, OracleError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: normalize_base_url(address),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn order_url(&self, number: &str) -> String {
        format!("{}/api/orders/{}", self.base_url, number)
    }
}

#[async_trait]
impl AccrualOracle for HttpAccrualOracle {
    async fn accrual(&self, number: &str) -> Result<Option<AccrualReport>, OracleError> {
        let response = self.client.get(self.order_url(number)).send().await?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await?;

        debug!(order = number, %status, "Accrual service replied");
        decode_reply(number, status, retry_after.as_deref(), &body)
    }
}

fn normalize_base_url(address: &str) -> String {
    let address = address.trim().trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}

/// Parse a `Retry-After` value given in seconds
///
/// Missing or unparsable values fall back to [`DEFAULT_RETRY_AFTER`];
/// larger values are capped at [`MAX_RETRY_AFTER`].
pub fn parse_retry_after(value: Option<&str>) -> Duration {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs).min(MAX_RETRY_AFTER))
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

/// Map an accrual service reply for `number` onto the oracle contract
///
/// A report for a different order number is treated as malformed.
pub fn decode_reply(
    number: &str,
    status: StatusCode,
    retry_after: Option<&str>,
    body: &[u8],
) -> Result<Option<AccrualReport>, OracleError> {
    match status {
        StatusCode::OK => {
            let report: AccrualReport = serde_json::from_slice(body)
                .map_err(|e| OracleError::malformed(e.to_string()))?;

            if report.order != number {
                return Err(OracleError::malformed(format!(
                    "reply for order '{}' while querying '{}'",
                    report.order, number
                )));
            }

            Ok(Some(report))
        }
        StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(None),
        StatusCode::TOO_MANY_REQUESTS => Err(OracleError::RateLimited {
            retry_after: parse_retry_after(retry_after),
        }),
        status => Err(OracleError::unavailable(format!("HTTP {status}"))),
    }
}
