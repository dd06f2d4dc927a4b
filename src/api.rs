use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{DashboardError, Result};
use crate::facets::FacetSelection;
use crate::models::{AnalyticsBucket, Department, FacetOptions, OfferPage, OverviewStats, RemoteType};

// --- Source traits ---

#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub filters: FacetSelection,
}

#[async_trait]
pub trait OfferSource: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<OfferPage>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoLevel {
    Region,
    Department,
    City,
}

impl GeoLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeoLevel::Region => "region",
            GeoLevel::Department => "department",
            GeoLevel::City => "city",
        }
    }
}

#[async_trait]
pub trait AnalyticsSource: Send + Sync {
    async fn skills(&self, top: usize) -> Result<Vec<AnalyticsBucket>>;
    async fn contracts(&self) -> Result<Vec<AnalyticsBucket>>;
    async fn geography(&self, level: GeoLevel) -> Result<Vec<AnalyticsBucket>>;
    async fn timeline(&self, interval: &str) -> Result<Vec<AnalyticsBucket>>;
    async fn overview(&self) -> Result<OverviewStats>;
}

#[async_trait]
pub trait FacetSource: Send + Sync {
    async fn facet_options(&self) -> Result<FacetOptions>;
}

// --- HTTP client ---

/// Body of `POST /offers/search`. Only the facets the dashboard drives are sent.
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct FilterRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rome_codes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departments: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_types: Option<Vec<String>>,
}

impl From<&FacetSelection> for FilterRequest {
    fn from(selection: &FacetSelection) -> Self {
        Self {
            rome_codes: selection.job_label.clone().map(|v| vec![v]),
            departments: selection.department.clone().map(|v| vec![v]),
            remote_types: selection.remote_type.as_ref().map(|v| vec![v.to_string()]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DashboardError::from_reqwest("Failed to build HTTP client", e))?;
        Ok(Self {
            base_url: format!("{}/api/v1", config.base_url.trim_end_matches('/')),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let context = format!("GET {}", path);
        debug!(path, ?query, "requesting");
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await
            .map_err(|e| DashboardError::from_reqwest(&context, e))?;
        Self::decode(context, response).await
    }

    async fn decode<T: DeserializeOwned>(context: String, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::Status { context, status: status.as_u16() });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| DashboardError::from_reqwest(context, e))
    }
}

#[async_trait]
impl OfferSource for ApiClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<OfferPage> {
        let query = [
            ("page", request.page.to_string()),
            ("size", request.size.to_string()),
            ("sort_by", "published_at".to_string()),
            ("sort_order", "desc".to_string()),
        ];

        if request.filters.is_empty() {
            return self.get_json("/offers", &query).await;
        }

        let context = "POST /offers/search".to_string();
        let body = FilterRequest::from(&request.filters);
        debug!(page = request.page, size = request.size, ?body, "searching offers");
        let response = self
            .client
            .post(format!("{}/offers/search", self.base_url))
            .query(&query)
            .json(&body)
            .send()
            .await
            .map_err(|e| DashboardError::from_reqwest(&context, e))?;
        Self::decode(context, response).await
    }
}

#[async_trait]
impl AnalyticsSource for ApiClient {
    async fn skills(&self, top: usize) -> Result<Vec<AnalyticsBucket>> {
        self.get_json("/analytics/skills", &[("top", top.to_string())]).await
    }

    async fn contracts(&self) -> Result<Vec<AnalyticsBucket>> {
        self.get_json("/analytics/contracts", &[]).await
    }

    async fn geography(&self, level: GeoLevel) -> Result<Vec<AnalyticsBucket>> {
        self.get_json("/analytics/geography", &[("level", level.as_str().to_string())])
            .await
    }

    async fn timeline(&self, interval: &str) -> Result<Vec<AnalyticsBucket>> {
        self.get_json("/analytics/timeline", &[("interval", interval.to_string())])
            .await
    }

    async fn overview(&self) -> Result<OverviewStats> {
        self.get_json("/stats/overview", &[]).await
    }
}

#[async_trait]
impl FacetSource for ApiClient {
    async fn facet_options(&self) -> Result<FacetOptions> {
        let (job_labels, departments) = tokio::try_join!(
            self.get_json::<Vec<String>>("/filters/rome-codes", &[]),
            self.get_json::<Vec<String>>("/filters/departments", &[]),
        )?;

        Ok(FacetOptions {
            job_labels: job_labels.into_iter().filter(|s| !s.trim().is_empty()).collect(),
            departments: departments
                .iter()
                .filter(|s| !s.trim().is_empty())
                .map(|s| Department::parse(s))
                .collect(),
            remote_types: RemoteType::KNOWN.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: server.base_url(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_filter_request_only_sends_set_facets() {
        let selection = FacetSelection {
            department: Some("75".to_string()),
            ..Default::default()
        };
        let body = serde_json::to_value(FilterRequest::from(&selection)).unwrap();
        assert_eq!(body, json!({"departments": ["75"]}));
    }

    #[tokio::test]
    async fn test_slow_backend_times_out_as_fetch_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/stats/overview");
                then.status(200)
                    .delay(std::time::Duration::from_secs(3))
                    .json_body(json!({"total_offers": 1}));
            })
            .await;

        let client = ApiClient::new(&ApiConfig {
            base_url: server.base_url(),
            timeout_secs: 1,
        })
        .unwrap();
        let err = client.overview().await.unwrap_err();

        assert!(matches!(err, DashboardError::Timeout { .. }), "got {:?}", err);
        assert!(err.is_fetch_failure());
    }

    #[tokio::test]
    async fn test_fetch_page_without_filters_uses_listing() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v1/offers")
                    .query_param("page", "2")
                    .query_param("size", "100");
                then.status(200).json_body(json!({
                    "total": 101, "page": 2, "size": 100, "pages": 2,
                    "items": [{"id": "o-101", "title": "Data Analyst"}]
                }));
            })
            .await;

        let page = client_for(&server)
            .fetch_page(&PageRequest { page: 2, size: 100, filters: FacetSelection::default() })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, 101);
    }

    #[tokio::test]
    async fn test_fetch_page_with_filters_posts_search() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1/offers/search")
                    .query_param("page", "1")
                    .json_body(json!({"remote_types": ["full_remote"]}));
                then.status(200).json_body(json!({
                    "total": 0, "page": 1, "size": 20, "pages": 0, "items": []
                }));
            })
            .await;

        let filters = FacetSelection {
            remote_type: Some(RemoteType::FullRemote),
            ..Default::default()
        };
        let page = client_for(&server)
            .fetch_page(&PageRequest { page: 1, size: 20, filters })
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_status_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/analytics/contracts");
                then.status(500).body("elasticsearch down");
            })
            .await;

        let err = client_for(&server).contracts().await.unwrap_err();
        assert!(matches!(err, DashboardError::Status { status: 500, .. }));
        assert!(err.is_fetch_failure());
    }

    #[tokio::test]
    async fn test_facet_options_parses_departments() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/filters/rome-codes");
                then.status(200).json_body(json!(["M1805", "M1811", ""]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/filters/departments");
                then.status(200).json_body(json!(["75 - Paris", "69 - Rhône"]));
            })
            .await;

        let options = client_for(&server).facet_options().await.unwrap();
        assert_eq!(options.job_labels, vec!["M1805", "M1811"]);
        assert_eq!(options.departments[1].code, "69");
        assert_eq!(options.remote_types.len(), 3);
    }
}
