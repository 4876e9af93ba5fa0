use crate::config::MarketplaceConfig;
use crate::services::conversation::manager::{ProductSearch, SearchItem};
use crate::utils::error::ApiError;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Client for the Rakuten Ichiba item search API.
#[derive(Clone)]
pub struct MarketplaceService {
    client: Client,
    config: MarketplaceConfig,
}

// Response Structures
#[derive(Deserialize)]
struct SearchResponse {
    #[serde(rename = "Items")]
    items: Option<Vec<ItemEnvelope>>,
}

#[derive(Deserialize)]
struct ItemEnvelope {
    #[serde(rename = "Item")]
    item: RawItem,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    item_name: String,
    item_price: PriceField,
    #[serde(default)]
    item_caption: String,
    #[serde(default)]
    medium_image_urls: Vec<ImageUrl>,
    affiliate_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageUrl {
    image_url: String,
}

/// The API documents `itemPrice` as a number, older payloads send a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum PriceField {
    Number(u64),
    Text(String),
}

impl PriceField {
    fn parse(&self) -> Result<u64, ApiError> {
        match self {
            PriceField::Number(n) => Ok(*n),
            PriceField::Text(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| ApiError::MarketplaceError(format!("Invalid itemPrice: {:?}", s))),
        }
    }
}

impl TryFrom<RawItem> for SearchItem {
    type Error = ApiError;

    fn try_from(raw: RawItem) -> Result<Self, Self::Error> {
        let price = raw.item_price.parse()?;
        let image_url = raw
            .medium_image_urls
            .into_iter()
            .next()
            .map(|u| u.image_url)
            .unwrap_or_default();

        Ok(SearchItem {
            name: raw.item_name,
            price,
            caption: raw.item_caption,
            image_url,
            affiliate_url: raw.affiliate_url,
        })
    }
}

impl MarketplaceService {
    pub fn new(config: MarketplaceConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_seconds))
                .build()
                .unwrap_or_else(|e| {
                    warn!("Ichiba client build failed, falling back to defaults without timeout: {}", e);
                    Client::new()
                }),
            config,
        }
    }

    /// Search items by keyword, keeping the API's result order.
    ///
    /// A well-formed response without an `Items` list is an empty result;
    /// transport failures and malformed payloads are errors.
    pub async fn search_items(&self, keyword: &str) -> Result<Vec<SearchItem>, ApiError> {
        debug!("Ichiba search: keyword={:?}, hits={}", keyword, self.config.hits);

        let hits = self.config.hits.to_string();
        let params = [
            ("format", "json"),
            ("keyword", keyword),
            ("applicationId", self.config.application_id.as_str()),
            ("affiliateId", self.config.affiliate_id.as_str()),
            ("hits", hits.as_str()),
            ("sort", self.config.sort.as_str()),
        ];

        let url = Url::parse_with_params(&self.config.endpoint, &params).map_err(|e| {
            ApiError::InternalError(format!("Invalid Ichiba endpoint {:?}: {}", self.config.endpoint, e))
        })?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| {
                ApiError::MarketplaceError(format!("Ichiba Network Error: {}", e.without_url()))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!("Ichiba API returned {}: {}", status, text);
            return Err(ApiError::MarketplaceError(format!(
                "Ichiba API Error ({}): {}",
                status, text
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ApiError::MarketplaceError(format!("Failed to parse Ichiba response: {}", e)))?;

        let items = body
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|envelope| SearchItem::try_from(envelope.item))
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Ichiba search returned {} items", items.len());
        Ok(items)
    }
}

#[async_trait::async_trait]
impl ProductSearch for MarketplaceService {
    async fn search(&self, keyword: &str) -> Result<Vec<SearchItem>, ApiError> {
        self.search_items(keyword).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SEARCH_PATH: &str = "/services/api/IchibaItem/Search/20220601";

    fn service_for(server: &MockServer) -> MarketplaceService {
        MarketplaceService::new(MarketplaceConfig {
            application_id: "app-123".to_string(),
            affiliate_id: "aff-456".to_string(),
            endpoint: format!("{}{}", server.uri(), SEARCH_PATH),
            hits: 3,
            sort: "standard".to_string(),
            timeout_seconds: 5,
        })
    }

    fn item(name: &str, price: serde_json::Value, images: serde_json::Value) -> serde_json::Value {
        json!({
            "Item": {
                "itemName": name,
                "itemPrice": price,
                "itemCaption": format!("{} のキャプション", name),
                "mediumImageUrls": images,
                "affiliateUrl": format!("https://hb.afl.rakuten.co.jp/{}", name),
                "shopName": "テストショップ"
            }
        })
    }

    #[tokio::test]
    async fn test_search_sends_fixed_query_and_keeps_order() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .and(query_param("format", "json"))
            .and(query_param("keyword", "電気シェーバー"))
            .and(query_param("applicationId", "app-123"))
            .and(query_param("affiliateId", "aff-456"))
            .and(query_param("hits", "3"))
            .and(query_param("sort", "standard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 3,
                "Items": [
                    item("A", json!(12800), json!([{ "imageUrl": "https://img/a1" }, { "imageUrl": "https://img/a2" }])),
                    item("B", json!("4980"), json!([{ "imageUrl": "https://img/b1" }])),
                    item("C", json!(0), json!([])),
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let items = service_for(&server).search("電気シェーバー").await.unwrap();

        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(items[0].price, 12800);
        assert_eq!(items[0].image_url, "https://img/a1");
        assert_eq!(items[1].price, 4980);
        assert_eq!(items[2].image_url, "");
        assert_eq!(items[2].affiliate_url, "https://hb.afl.rakuten.co.jp/C");
    }

    #[tokio::test]
    async fn test_missing_items_key_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 0 })))
            .mount(&server)
            .await;

        let items = service_for(&server).search("zzzznoresults").await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = service_for(&server).search("x").await.unwrap_err();
        assert!(matches!(err, ApiError::MarketplaceError(_)));
    }

    #[tokio::test]
    async fn test_bad_price_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Items": [item("A", json!("お問い合わせ"), json!([]))]
            })))
            .mount(&server)
            .await;

        assert!(service_for(&server).search("x").await.is_err());
    }

    #[tokio::test]
    async fn test_error_status_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "wrong_parameter",
                "error_description": "specify valid applicationId"
            })))
            .mount(&server)
            .await;

        let err = service_for(&server).search("x").await.unwrap_err();
        assert!(err.to_string().contains("wrong_parameter"));
    }
}
