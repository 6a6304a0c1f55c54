use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::coords::Coordinates;
use crate::error::{Result, ShopError};

pub const DEFAULT_OVERPASS_ENDPOINT: &str = "http://overpass-api.de/api/interpreter";

/// Name used for shops without a `name` tag
pub const UNNAMED_SHOP: &str = "Unnamed Shop";

const ADDRESS_TAGS: [&str; 3] = ["addr:street", "addr:housenumber", "addr:city"];

/// Overpass lookup configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OverpassConfig {
    /// Interpreter URL queries are POSTed to
    pub endpoint: String,
    /// Search radius around the user, in meters
    pub radius_m: u32,
    /// Value of the OSM `shop` tag to search for
    pub shop_tag: String,
    /// Whole-request timeout, in milliseconds
    pub timeout_ms: u64,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OVERPASS_ENDPOINT.to_string(),
            radius_m: 2000,
            shop_tag: "fertilizer".to_string(),
            timeout_ms: 15_000,
        }
    }
}

impl OverpassConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// One shop near the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Shop {
    pub name: String,
    /// Street, house number and city joined with ", ", empty when unknown
    pub address: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: String,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

impl OverpassElement {
    fn position(&self) -> Option<(f64, f64)> {
        if self.kind == "node" {
            Some((self.lat?, self.lon?))
        } else {
            self.center.as_ref().map(|c| (c.lat, c.lon))
        }
    }

    fn into_shop(self) -> Option<Shop> {
        let (lat, lng) = self.position()?;

        let name = self
            .tags
            .get("name")
            .filter(|n| !n.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| UNNAMED_SHOP.to_string());

        let address = ADDRESS_TAGS
            .iter()
            .filter_map(|key| self.tags.get(*key))
            .filter(|part| !part.trim().is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        Some(Shop { name, address, lat, lng })
    }
}

/// Overpass QL for every node, way and relation with the configured shop tag
/// inside the search radius. Ways and relations come back with a center point.
pub fn build_query(coords: Coordinates, config: &OverpassConfig) -> String {
    let filter = format!(
        "[\"shop\"=\"{}\"](around:{},{},{})",
        config.shop_tag, config.radius_m, coords.lat, coords.lng
    );
    format!(
        "[out:json];\n(\n  node{filter};\n  way{filter};\n  relation{filter};\n);\nout center;\n"
    )
}

/// Map an Overpass JSON answer to shops, in response order.
///
/// Elements without usable coordinates are skipped.
pub fn parse_response(body: &str) -> Result<Vec<Shop>> {
    let response: OverpassResponse =
        serde_json::from_str(body).map_err(|e| ShopError::MalformedResponse(e.to_string()))?;

    let total = response.elements.len();
    let shops: Vec<Shop> = response.elements.into_iter().filter_map(OverpassElement::into_shop).collect();
    if shops.len() < total {
        debug!(skipped = total - shops.len(), "Skipped elements without coordinates");
    }
    Ok(shops)
}

/// Finds shops near a position
#[async_trait]
pub trait ShopLookup: Send + Sync {
    async fn find_shops(&self, coords: Coordinates) -> Result<Vec<Shop>>;
}

/// [`ShopLookup`] backed by the public Overpass API
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: reqwest::Client,
    config: OverpassConfig,
}

impl OverpassClient {
    pub fn new(config: OverpassConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ShopError::Upstream(format!("failed to create HTTP client: {}", e)))?;

        info!(endpoint = %config.endpoint, radius_m = config.radius_m, "Overpass client ready");
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OverpassConfig {
        &self.config
    }

    fn map_transport_error(&self, err: reqwest::Error) -> ShopError {
        if err.is_timeout() {
            ShopError::Timeout(self.config.timeout())
        } else {
            ShopError::from(err)
        }
    }
}

#[async_trait]
impl ShopLookup for OverpassClient {
    async fn find_shops(&self, coords: Coordinates) -> Result<Vec<Shop>> {
        let query = build_query(coords, &self.config);
        debug!(%coords, "Querying Overpass");

        let response = self
            .client
            .post(&self.config.endpoint)
            .form(&[("data", query.as_str())])
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Overpass returned an error status");
            return Err(ShopError::Upstream(format!("Overpass answered with status {}", status)));
        }

        let body = response.text().await.map_err(|e| self.map_transport_error(e))?;
        let shops = parse_response(&body)?;

        info!(%coords, count = shops.len(), "Found shops");
        Ok(shops)
    }
}
