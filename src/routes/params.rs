use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::OrderStatus;

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Default, Clone, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    /// `(page, per_page, offset)` with page ≥ 1 and per_page clamped to 1..=100.
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        let offset = (page - 1).saturating_mul(per_page);
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortBy {
    CreatedAt,
    Price,
    Name,
}

// Query structs keep page fields inline: serde_urlencoded cannot parse
// numbers through `#[serde(flatten)]`.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub in_stock: Option<bool>,
    /// Comma separated attribute option ids.
    pub options: Option<String>,
    #[param(inline)]
    pub sort_by: Option<ProductSortBy>,
    #[param(inline)]
    pub sort_order: Option<SortOrder>,
}

impl ProductQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }

    pub fn option_ids(&self) -> Result<Vec<Uuid>, String> {
        let Some(raw) = self.options.as_deref() else {
            return Ok(Vec::new());
        };
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Uuid::parse_str(s).map_err(|_| format!("invalid option id: {s}")))
            .collect()
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    #[param(inline)]
    pub status: Option<OrderStatus>,
    #[param(inline)]
    pub sort_order: Option<SortOrder>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LowStockQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub threshold: Option<i32>,
}

impl LowStockQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_pagination() {
        assert_eq!(Pagination::default().normalize(), (1, 20, 0));
        assert_eq!(Pagination::new(3, 10).normalize(), (3, 10, 20));
        assert_eq!(Pagination::new(0, 1000).normalize(), (1, 100, 0));
        assert_eq!(Pagination::new(-4, 0).normalize(), (1, 1, 0));
        assert_eq!(
            Pagination::new(i64::MAX, 100).normalize(),
            (i64::MAX, 100, i64::MAX)
        );
    }

    #[test]
    fn parses_option_filter() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let query = ProductQuery {
            options: Some(format!("{a}, {b},")),
            ..Default::default()
        };
        assert_eq!(query.option_ids(), Ok(vec![a, b]));

        let bad = ProductQuery {
            options: Some("nope".into()),
            ..Default::default()
        };
        assert!(bad.option_ids().is_err());
    }
}
