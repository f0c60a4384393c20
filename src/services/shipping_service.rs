//! Nova Poshta address lookups.
//!
//! Every call is a JSON `POST` of `{apiKey, modelName, calledMethod,
//! methodProperties}` to a single endpoint. Successful answers are cached in
//! memory for the configured TTL.

use std::{sync::Arc, time::Duration};

use moka::future::Cache;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};

use crate::{
    config::NovaPoshtaConfig,
    dto::shipping::{City, CityList, CityQuery, Warehouse, WarehouseList, WarehouseQuery},
    error::{AppError, AppResult},
    response::{ApiResponse, Meta},
    state::AppState,
};

const ADDRESS_MODEL: &str = "Address";
const CACHE_CAPACITY: u64 = 1000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_CITY_LIMIT: u32 = 20;
pub const MAX_CITY_LIMIT: u32 = 100;
pub const DEFAULT_WAREHOUSE_LIMIT: u32 = 50;
pub const MAX_WAREHOUSE_LIMIT: u32 = 500;

#[derive(Debug, Clone)]
enum CacheValue {
    Cities(Arc<Vec<City>>),
    Warehouses(Arc<Vec<Warehouse>>),
}

#[derive(Clone)]
pub struct NovaPoshtaClient {
    inner: Arc<NovaPoshtaInner>,
}

struct NovaPoshtaInner {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    cache: Cache<String, CacheValue>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NpRequest<'a> {
    api_key: &'a str,
    model_name: &'a str,
    called_method: &'a str,
    method_properties: &'a Value,
}

#[derive(Debug, Deserialize)]
struct NpResponse<T> {
    success: bool,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    errors: Vec<String>,
}

impl NovaPoshtaClient {
    pub fn new(config: &NovaPoshtaConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(Duration::from_secs(config.cache_ttl_secs.max(1)))
            .build();

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "falling back to default http client");
                reqwest::Client::new()
            });

        Self {
            inner: Arc::new(NovaPoshtaInner {
                client,
                api_url: config.api_url.clone(),
                api_key: config.api_key.clone(),
                cache,
            }),
        }
    }

    pub async fn search_cities(&self, query: &str, limit: u32) -> AppResult<Vec<City>> {
        let method = "getCities";
        let properties = city_properties(query, limit);
        let key = cache_key(method, &properties);

        if let Some(CacheValue::Cities(cities)) = self.inner.cache.get(&key).await {
            tracing::debug!(%key, "nova poshta cache hit");
            return Ok(cities.as_ref().clone());
        }

        let cities: Vec<City> = self.call(method, &properties).await?;
        self.inner
            .cache
            .insert(key, CacheValue::Cities(Arc::new(cities.clone())))
            .await;
        Ok(cities)
    }

    pub async fn warehouses(
        &self,
        city_ref: &str,
        query: Option<&str>,
        page: u32,
        limit: u32,
    ) -> AppResult<Vec<Warehouse>> {
        let method = "getWarehouses";
        let properties = warehouse_properties(city_ref, query, page, limit);
        let key = cache_key(method, &properties);

        if let Some(CacheValue::Warehouses(items)) = self.inner.cache.get(&key).await {
            tracing::debug!(%key, "nova poshta cache hit");
            return Ok(items.as_ref().clone());
        }

        let items: Vec<Warehouse> = self.call(method, &properties).await?;
        self.inner
            .cache
            .insert(key, CacheValue::Warehouses(Arc::new(items.clone())))
            .await;
        Ok(items)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, properties: &Value) -> AppResult<Vec<T>> {
        let body = NpRequest {
            api_key: &self.inner.api_key,
            model_name: ADDRESS_MODEL,
            called_method: method,
            method_properties: properties,
        };

        let response = self
            .inner
            .client
            .post(&self.inner.api_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let parsed: NpResponse<T> = response.json().await?;
        into_data(method, parsed)
    }
}

pub async fn cities(state: &AppState, query: CityQuery) -> AppResult<ApiResponse<CityList>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(AppError::BadRequest("q must not be empty".into()));
    }
    let limit = query
        .limit
        .unwrap_or(DEFAULT_CITY_LIMIT)
        .clamp(1, MAX_CITY_LIMIT);

    let items = state.shipping.search_cities(q, limit).await?;
    Ok(ApiResponse::success("Cities", CityList { items }, Some(Meta::empty())))
}

pub async fn warehouses(
    state: &AppState,
    query: WarehouseQuery,
) -> AppResult<ApiResponse<WarehouseList>> {
    let city_ref = query.city_ref.trim();
    if city_ref.is_empty() {
        return Err(AppError::BadRequest("city_ref must not be empty".into()));
    }
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_WAREHOUSE_LIMIT)
        .clamp(1, MAX_WAREHOUSE_LIMIT);
    let search = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let items = state
        .shipping
        .warehouses(city_ref, search, page, limit)
        .await?;
    Ok(ApiResponse::success(
        "Warehouses",
        WarehouseList { items },
        Some(Meta {
            page: Some(i64::from(page)),
            per_page: Some(i64::from(limit)),
            total: None,
        }),
    ))
}

fn city_properties(query: &str, limit: u32) -> Value {
    json!({
        "FindByString": query,
        "Limit": limit.to_string(),
    })
}

fn warehouse_properties(city_ref: &str, query: Option<&str>, page: u32, limit: u32) -> Value {
    let mut properties = json!({
        "CityRef": city_ref,
        "Page": page.to_string(),
        "Limit": limit.to_string(),
    });
    if let (Some(q), Some(map)) = (query, properties.as_object_mut()) {
        map.insert("FindByString".into(), Value::String(q.to_string()));
    }
    properties
}

/// Properties are always built in the same key order, so equal inputs give equal keys.
fn cache_key(method: &str, properties: &Value) -> String {
    format!("{ADDRESS_MODEL}.{method}:{properties}")
}

fn into_data<T>(method: &str, response: NpResponse<T>) -> AppResult<Vec<T>> {
    if !response.success {
        let detail = if response.errors.is_empty() {
            "unknown error".to_string()
        } else {
            response.errors.join("; ")
        };
        tracing::warn!(method, %detail, "nova poshta request failed");
        return Err(AppError::Upstream(format!("nova poshta: {detail}")));
    }
    Ok(response.data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_nova_poshta_field_names() {
        let properties = city_properties("Kyiv", 20);
        let body = NpRequest {
            api_key: "key",
            model_name: ADDRESS_MODEL,
            called_method: "getCities",
            method_properties: &properties,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["apiKey"], "key");
        assert_eq!(value["modelName"], "Address");
        assert_eq!(value["calledMethod"], "getCities");
        assert_eq!(value["methodProperties"]["FindByString"], "Kyiv");
        assert_eq!(value["methodProperties"]["Limit"], "20");
    }

    #[test]
    fn cache_key_depends_on_all_properties() {
        let a = cache_key("getWarehouses", &warehouse_properties("ref-1", None, 1, 50));
        let b = cache_key("getWarehouses", &warehouse_properties("ref-1", None, 1, 50));
        let c = cache_key("getWarehouses", &warehouse_properties("ref-1", Some("5"), 1, 50));
        let d = cache_key("getWarehouses", &warehouse_properties("ref-1", None, 2, 50));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert!(a.starts_with("Address.getWarehouses:"));
    }

    #[test]
    fn parses_city_response() {
        let raw = r#"{
            "success": true,
            "data": [{"Ref": "e221d64c", "Description": "Київ", "AreaDescription": "Київська", "Extra": 1}],
            "errors": [],
            "warnings": []
        }"#;
        let parsed: NpResponse<City> = serde_json::from_str(raw).unwrap();
        let cities = into_data("getCities", parsed).unwrap();
        assert_eq!(cities.len(), 1);
        assert_eq!(cities[0].r#ref, "e221d64c");
        assert_eq!(cities[0].name, "Київ");
        assert_eq!(cities[0].area, "Київська");
    }

    #[test]
    fn failed_response_is_upstream_error() {
        let raw = r#"{"success": false, "data": [], "errors": ["API key expired"]}"#;
        let parsed: NpResponse<Warehouse> = serde_json::from_str(raw).unwrap();
        match into_data("getWarehouses", parsed) {
            Err(AppError::Upstream(msg)) => assert!(msg.contains("API key expired")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
