use std::path::Path;
use std::time::{Duration, Instant};

use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use tracing::{info, warn};

use crate::config::LayoutSettings;
use crate::element::{self, Element};
use crate::error::{Error, Result};

const API_KEY_HEADER: &str = "unstructured-api-key";
const OUTPUT_FORMAT: &str = "application/json";

/// Client for the remote layout-analysis service. One instance per run; no
/// state is shared between documents.
pub struct LayoutClient {
    http: reqwest::Client,
    settings: LayoutSettings,
    api_key: String,
}

impl LayoutClient {
    pub fn new(settings: LayoutSettings) -> Result<Self> {
        let api_key = settings.api_key.clone().ok_or(Error::MissingApiKey)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(LayoutClient {
            http,
            settings,
            api_key,
        })
    }

    /// Upload a PDF and return the raw element JSON.
    pub async fn partition_raw(&self, pdf: &Path) -> Result<String> {
        let bytes = tokio::fs::read(pdf).await?;
        let file_name = pdf
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        let mut attempt = 0u32;
        loop {
            let start = Instant::now();
            let response = self.post(&file_name, bytes.clone()).await?;
            let status = response.status();

            if status.is_success() {
                let body = response.text().await?;
                info!(
                    file = %file_name,
                    bytes = body.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "layout service responded"
                );
                return Ok(body);
            }

            let body = response.text().await.unwrap_or_default();
            if !should_retry(status) || attempt >= self.settings.max_retries {
                return Err(Error::LayoutStatus {
                    status: status.as_u16(),
                    body,
                });
            }

            let backoff = backoff_delay(self.settings.backoff_ms, attempt);
            warn!(
                "Layout service returned {} for {} (attempt {}/{}), backing off {:.1}s",
                status,
                file_name,
                attempt + 1,
                self.settings.max_retries,
                backoff.as_secs_f64()
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    pub async fn partition(&self, pdf: &Path) -> Result<Vec<Element>> {
        let raw = self.partition_raw(pdf).await?;
        element::parse_elements(&raw)
    }

    async fn post(&self, file_name: &str, bytes: Vec<u8>) -> Result<reqwest::Response> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = Form::new()
            .part("files", part)
            .text("strategy", self.settings.strategy.clone())
            .text("output_format", OUTPUT_FORMAT);

        let response = self
            .http
            .post(&self.settings.api_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::ACCEPT, OUTPUT_FORMAT)
            .multipart(form)
            .send()
            .await?;
        Ok(response)
    }
}

/// `base_ms * 2^attempt`, saturating for large retry budgets.
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor))
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_rate_limits_and_server_errors() {
        assert!(should_retry(StatusCode::TOO_MANY_REQUESTS));
        assert!(should_retry(StatusCode::BAD_GATEWAY));
        assert!(should_retry(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!should_retry(StatusCode::UNAUTHORIZED));
        assert!(!should_retry(StatusCode::UNPROCESSABLE_ENTITY));
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(backoff_delay(2000, 0), Duration::from_millis(2000));
        assert_eq!(backoff_delay(2000, 3), Duration::from_millis(16000));
        assert_eq!(backoff_delay(2000, 63), Duration::from_millis(u64::MAX));
        assert_eq!(backoff_delay(2000, 200), Duration::from_millis(u64::MAX));
        assert_eq!(backoff_delay(0, 200), Duration::ZERO);
    }

    #[test]
    fn client_requires_api_key() {
        let settings = LayoutSettings::default();
        assert!(matches!(LayoutClient::new(settings), Err(Error::MissingApiKey)));

        let settings = LayoutSettings {
            api_key: Some("k".into()),
            ..LayoutSettings::default()
        };
        assert!(LayoutClient::new(settings).is_ok());
    }
}
