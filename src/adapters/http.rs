use crate::domain::model::{AddressDuration, CommuteAddress};
use crate::domain::ports::DurationsProvider;
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct CommuteResponse {
    status: String,
    payload: Option<CommutePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommutePayload {
    address_durations: Vec<AddressDuration>,
}

#[derive(Debug, Clone)]
pub struct HttpDurationsProvider {
    client: Client,
    base_url: String,
}

impl HttpDurationsProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/commute/durations", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl DurationsProvider for HttpDurationsProvider {
    async fn durations(&self, addresses: &[CommuteAddress]) -> Result<Vec<AddressDuration>> {
        let endpoint = self.endpoint();
        let addresses_param = serde_json::to_string(addresses)?;

        tracing::debug!("Making API request to: {}", endpoint);
        let response = self
            .client
            .get(&endpoint)
            .query(&[("addresses", addresses_param)])
            .header("Content-Type", "application/json")
            .send()
            .await?;

        tracing::debug!("API response status: {}", response.status());
        if !response.status().is_success() {
            return Err(SyncError::ApiStatusError {
                message: format!("API responded with status: {}", response.status()),
            });
        }

        let body: CommuteResponse = response.json().await?;
        match body.payload {
            Some(payload) if body.status != "error" => Ok(payload.address_durations),
            _ => Err(SyncError::ApiStatusError {
                message: "Failed to load commute times".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn addresses() -> Vec<CommuteAddress> {
        vec![
            CommuteAddress::new("home", "Damrak 1, Amsterdam"),
            CommuteAddress::new("work", "Coolsingel 40, Rotterdam"),
        ]
    }

    #[tokio::test]
    async fn test_durations_sends_addresses_as_query_parameter() {
        let server = MockServer::start();
        let addresses = addresses();
        let expected_param = serde_json::to_string(&addresses).unwrap();

        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/commute/durations")
                .query_param("addresses", expected_param.as_str());
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "status": "ok",
                    "payload": {
                        "addressDurations": [
                            {
                                "address": {"id": "home", "address": "Damrak 1, Amsterdam"},
                                "durations": {"walking": 50, "driving": 15, "transit": 20, "biking": 30}
                            },
                            {
                                "address": {"id": "work", "address": "Coolsingel 40, Rotterdam"},
                                "durations": {"walking": null, "driving": 60, "transit": 75, "biking": null}
                            }
                        ]
                    }
                }));
        });

        let provider = HttpDurationsProvider::new(server.base_url(), Duration::from_secs(5)).unwrap();
        let result = provider.durations(&addresses).await.unwrap();

        api_mock.assert();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].address.id, "home");
        assert_eq!(result[0].durations.transit, Some(20));
        assert_eq!(result[1].durations.walking, None);
    }

    #[tokio::test]
    async fn test_server_error_status_is_reported() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/commute/durations");
            then.status(500);
        });

        let provider = HttpDurationsProvider::new(server.base_url(), Duration::from_secs(5)).unwrap();
        let result = provider.durations(&addresses()).await;

        api_mock.assert();
        match result {
            Err(SyncError::ApiStatusError { message }) => assert!(message.contains("500")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_status_body_is_reported() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/commute/durations");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"status": "error", "payload": null}));
        });

        let provider = HttpDurationsProvider::new(server.base_url(), Duration::from_secs(5)).unwrap();
        let result = provider.durations(&addresses()).await;

        assert!(matches!(result, Err(SyncError::ApiStatusError { .. })));
    }
}
