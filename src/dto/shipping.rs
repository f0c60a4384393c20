use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CityQuery {
    pub q: String,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WarehouseQuery {
    pub city_ref: String,
    pub q: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct City {
    #[serde(rename(deserialize = "Ref"))]
    pub r#ref: String,
    #[serde(rename(deserialize = "Description"))]
    pub name: String,
    #[serde(rename(deserialize = "AreaDescription"), default)]
    pub area: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Warehouse {
    #[serde(rename(deserialize = "Ref"))]
    pub r#ref: String,
    #[serde(rename(deserialize = "Number"), default)]
    pub number: String,
    #[serde(rename(deserialize = "Description"))]
    pub description: String,
    #[serde(rename(deserialize = "CityRef"), default)]
    pub city_ref: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CityList {
    #[schema(value_type = Vec<City>)]
    pub items: Vec<City>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct WarehouseList {
    #[schema(value_type = Vec<Warehouse>)]
    pub items: Vec<Warehouse>,
}
