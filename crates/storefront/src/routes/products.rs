//! Public product routes.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use hearth_core::Slug;

use crate::db::products::{ProductFilter, ProductSort};
use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::models::{ProductDetail, ProductSummary};
use crate::state::AppState;

/// Default page size.
pub const DEFAULT_PER_PAGE: u32 = 24;

/// Largest accepted page size.
pub const MAX_PER_PAGE: u32 = 100;

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Category slug.
    pub category: Option<String>,
    /// Free-text search over name and description.
    pub q: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// A page of results.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub pages: i64,
}

/// Validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    /// Validate `page` (≥ 1) and `per_page` (1..=100).
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for out-of-range values.
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Result<Self> {
        let page = page.unwrap_or(1);
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE);

        if page == 0 {
            return Err(AppError::BadRequest("page must be at least 1".to_string()));
        }
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(AppError::BadRequest(format!(
                "per_page must be between 1 and {MAX_PER_PAGE}"
            )));
        }

        Ok(Self { page, per_page })
    }

    #[must_use]
    pub fn limit(self) -> i64 {
        i64::from(self.per_page)
    }

    #[must_use]
    pub fn offset(self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    /// Wrap a result set in a page envelope.
    #[must_use]
    pub fn page<T>(self, items: Vec<T>, total: i64) -> Page<T> {
        let per_page = i64::from(self.per_page);
        Page {
            items,
            page: self.page,
            per_page: self.per_page,
            total,
            pages: (total + per_page - 1) / per_page,
        }
    }
}

/// Parse an optional category slug from a query string.
///
/// An unknown-format slug can match nothing, which is reported as a bad
/// request rather than an empty page.
pub(crate) fn parse_category(category: Option<&str>) -> Result<Option<Slug>> {
    category
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Slug::parse(s).map_err(|e| AppError::BadRequest(format!("category: {e}"))))
        .transpose()
}

/// Active products with filters, sort and pagination.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<ProductSummary>>> {
    let pagination = Pagination::new(query.page, query.per_page)?;

    let filter = ProductFilter {
        category: parse_category(query.category.as_deref())?,
        search: query.q,
        sort: query.sort,
        include_inactive: false,
        limit: pagination.limit(),
        offset: pagination.offset(),
    };

    let (products, total) = ProductRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(pagination.page(products, total)))
}

/// Product detail with images and category.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetail>> {
    let not_found = || AppError::NotFound("Product not found".to_string());
    let slug = Slug::parse(&slug).map_err(|_| not_found())?;

    let repo = ProductRepository::new(state.pool());
    let product = repo
        .get_by_slug(&slug)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(not_found)?;

    let images = repo.images(product.id).await?;
    let category = match product.category_id {
        Some(id) => state
            .categories()
            .get_or_load(state.pool())
            .await?
            .iter()
            .find(|c| c.id == id)
            .cloned(),
        None => None,
    };

    Ok(Json(ProductDetail {
        product,
        images,
        category,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let p = Pagination::new(None, None).unwrap();
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, DEFAULT_PER_PAGE);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_pagination_bounds() {
        assert!(Pagination::new(Some(0), None).is_err());
        assert!(Pagination::new(None, Some(0)).is_err());
        assert!(Pagination::new(None, Some(MAX_PER_PAGE + 1)).is_err());
        assert!(Pagination::new(Some(3), Some(MAX_PER_PAGE)).is_ok());
    }

    #[test]
    fn test_pagination_offset_and_page_count() {
        let p = Pagination::new(Some(3), Some(10)).unwrap();
        assert_eq!(p.offset(), 20);
        assert_eq!(p.page(Vec::<()>::new(), 21).pages, 3);
        assert_eq!(p.page(Vec::<()>::new(), 20).pages, 2);
        assert_eq!(p.page(Vec::<()>::new(), 0).pages, 0);
    }

    #[test]
    fn test_parse_category() {
        assert_eq!(parse_category(None).unwrap(), None);
        assert_eq!(parse_category(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_category(Some("living-room")).unwrap().unwrap().as_str(),
            "living-room"
        );
        assert!(parse_category(Some("Living Room")).is_err());
    }
}
