//! HTTP client for the static yearly season files.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use seasonrisk_core::ReqwestErrorExt;
use tracing::instrument;
use url::Url;

use crate::error::SeasonError;
use crate::types::{season_file_name, SeasonDataMap, SeasonRecord};

#[derive(Debug, Clone)]
pub struct SeasonClient {
    client: Arc<Client>,
    base_url: Url,
}

impl SeasonClient {
    /// Build a client for files under `base_url`. A missing trailing slash is
    /// added so the last path segment is kept as a directory.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SeasonError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| SeasonError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(SeasonError::InvalidBaseUrl(base_url.to_string()));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SeasonError::Network(e.into_network_error()))?;

        Ok(Self {
            client: Arc::new(client),
            base_url,
        })
    }

    /// URL of the yearly file that holds `date`.
    pub fn year_url(&self, date: &str) -> Result<Url, SeasonError> {
        let file = season_file_name(date)
            .ok_or_else(|| SeasonError::InvalidDate(date.to_string()))?;
        self.base_url
            .join(&file)
            .map_err(|e| SeasonError::InvalidBaseUrl(e.to_string()))
    }

    /// Fetch the yearly file for `date` and index it by day. No retries.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_year_data(&self, date: &str) -> Result<SeasonDataMap, SeasonError> {
        let url = self.year_url(date)?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SeasonError::Network(e.into_network_error()))?
            .error_for_status()
            .map_err(|e| SeasonError::Network(e.into_network_error()))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| SeasonError::Network(e.into_network_error()))?;

        let records: Vec<SeasonRecord> = serde_json::from_slice(&body)
            .map_err(|e| SeasonError::Parse(format!("{url}: {e}")))?;

        let map = SeasonDataMap::from_records(records);
        tracing::debug!("Loaded {} season records from {}", map.len(), url);
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SeasonClient {
        SeasonClient::new(&format!("{}/data/", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_year_data() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/season2024.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"date": "2024-06-01", "maxRisk": 3},
                {"date": "2024-06-02", "maxRisk": -1}
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let map = client.fetch_year_data("2024-06-02").await.unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("2024-06-01").and_then(SeasonRecord::risk), Some(3.0));
        assert!(map.get("2024-06-02").unwrap().is_pending());
    }

    #[tokio::test]
    async fn test_only_year_prefix_selects_file() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/season2023.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let map = client.fetch_year_data("2023-whatever").await.unwrap();

        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn test_missing_year_is_network_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/season2031.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let result = client.fetch_year_data("2031-01-01").await;

        assert!(matches!(result, Err(SeasonError::Network(_))));
        assert_eq!(result.unwrap_err().status(), Some(404));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/season2024.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let result = client.fetch_year_data("2024-06-01").await;

        assert!(matches!(result, Err(SeasonError::Parse(_))));
    }

    #[tokio::test]
    async fn test_invalid_date_skips_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let result = client.fetch_year_data("06/01/2024").await;

        assert!(matches!(result, Err(SeasonError::InvalidDate(_))));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client =
            SeasonClient::new("https://risk.example.org/static", Duration::from_secs(1)).unwrap();
        let url = client.year_url("2024-01-01").unwrap();
        assert_eq!(url.as_str(), "https://risk.example.org/static/season2024.json");
    }

    #[test]
    fn test_rejects_unparseable_base_url() {
        let result = SeasonClient::new("not a url", Duration::from_secs(1));
        assert!(matches!(result, Err(SeasonError::InvalidBaseUrl(_))));
    }
}
