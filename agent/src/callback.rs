use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::messages::SimulationResult;
use crate::utils::errors::CallbackError;

pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Secondary, best-effort delivery channel for results.
#[async_trait]
pub trait CallbackSink: Send + Sync {
    /// Push `result` to `url`. Returns the HTTP status on any response.
    async fn deliver(&self, url: &str, result: &SimulationResult) -> Result<u16, CallbackError>;
}

/// Posts results as JSON over HTTP.
///
/// Any response counts as delivered; the status code is only reported back.
#[derive(Clone)]
pub struct HttpCallback {
    client: Client,
}

impl HttpCallback {
    pub fn new(timeout: Duration) -> Result<Self, CallbackError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CallbackSink for HttpCallback {
    async fn deliver(&self, url: &str, result: &SimulationResult) -> Result<u16, CallbackError> {
        let response = self
            .client
            .post(url)
            .json(result)
            .send()
            .await?;
        // TODO: treat non-2xx statuses as failed deliveries once callback owners agree on the contract
        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_url_is_an_error() {
        let callback = HttpCallback::new(Duration::from_millis(500)).unwrap();
        let result = SimulationResult::failed("r1", "x");
        // port 9 (discard) is closed on loopback
        let err = callback
            .deliver("http://127.0.0.1:9/callback", &result)
            .await
            .unwrap_err();
        assert!(matches!(err, CallbackError::Request(_)));
    }

    #[tokio::test]
    async fn test_malformed_url_is_an_error() {
        let callback = HttpCallback::new(DEFAULT_CALLBACK_TIMEOUT).unwrap();
        let result = SimulationResult::failed("r1", "x");
        assert!(callback.deliver("not a url", &result).await.is_err());
    }
}
