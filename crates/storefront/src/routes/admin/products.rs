//! Product management.

use axum::{extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use hearth_core::{CategoryId, ProductId, Slug};

use crate::db::products::{ProductFilter, ProductImageInput, ProductInput};
use crate::db::{CategoryRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireAdmin;
use crate::models::{Product, ProductDetail, ProductSummary};
use crate::routes::products::{ListQuery, Page, Pagination, parse_category};
use crate::state::AppState;

const MAX_NAME_LEN: usize = 200;
const MAX_IMAGES: usize = 20;

/// Create or replace payload. A missing slug is derived from the name.
#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: Option<CategoryId>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub images: Vec<ProductImageInput>,
}

const fn default_active() -> bool {
    true
}

impl ProductRequest {
    /// Validate and normalize into a repository input.
    fn into_input(self) -> Result<ProductInput> {
        let name = self.name.trim().to_string();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(AppError::BadRequest(format!(
                "name must be 1 to {MAX_NAME_LEN} characters"
            )));
        }

        let slug = match self.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Slug::parse(s).map_err(|e| AppError::BadRequest(format!("slug: {e}")))?,
            None => Slug::from_title(&name).ok_or_else(|| {
                AppError::BadRequest("slug cannot be derived from name".to_string())
            })?,
        };

        if self.price.is_sign_negative() {
            return Err(AppError::BadRequest("price must not be negative".to_string()));
        }
        if self.price.scale() > 2 {
            return Err(AppError::BadRequest(
                "price must have at most 2 decimal places".to_string(),
            ));
        }
        if self.stock < 0 {
            return Err(AppError::BadRequest("stock must not be negative".to_string()));
        }

        if self.images.len() > MAX_IMAGES {
            return Err(AppError::BadRequest(format!(
                "at most {MAX_IMAGES} images per product"
            )));
        }
        for image in &self.images {
            let parsed = url::Url::parse(&image.url)
                .map_err(|_| AppError::BadRequest(format!("invalid image url: {}", image.url)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(AppError::BadRequest(format!(
                    "invalid image url: {}",
                    image.url
                )));
            }
        }

        Ok(ProductInput {
            category_id: self.category_id,
            name,
            slug,
            description: self.description.trim().to_string(),
            price: self.price,
            stock: self.stock,
            is_active: self.is_active,
            images: self.images,
        })
    }
}

async fn ensure_category(state: &AppState, id: Option<CategoryId>) -> Result<()> {
    if let Some(id) = id
        && CategoryRepository::new(state.pool()).get_by_id(id).await?.is_none()
    {
        return Err(AppError::BadRequest(format!("category {id} does not exist")));
    }
    Ok(())
}

/// All products, including inactive ones.
#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<ProductSummary>>> {
    let pagination = Pagination::new(query.page, query.per_page)?;

    let filter = ProductFilter {
        category: parse_category(query.category.as_deref())?,
        search: query.q,
        sort: query.sort,
        include_inactive: true,
        limit: pagination.limit(),
        offset: pagination.offset(),
    };

    let (products, total) = ProductRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(pagination.page(products, total)))
}

#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDetail>> {
    let repo = ProductRepository::new(state.pool());
    let product = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let images = repo.images(id).await?;
    let category = match product.category_id {
        Some(category_id) => CategoryRepository::new(state.pool())
            .get_by_id(category_id)
            .await?,
        None => None,
    };

    Ok(Json(ProductDetail {
        product,
        images,
        category,
    }))
}

#[instrument(skip(state, admin, req), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(req): Json<ProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    let input = req.into_input()?;
    ensure_category(&state, input.category_id).await?;

    let product = ProductRepository::new(state.pool()).create(&input).await?;
    state.categories().invalidate().await;

    tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, admin, req), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(req): Json<ProductRequest>,
) -> Result<Json<Product>> {
    let input = req.into_input()?;
    ensure_category(&state, input.category_id).await?;

    let product = ProductRepository::new(state.pool()).update(id, &input).await?;
    state.categories().invalidate().await;

    tracing::info!(product_id = %product.id, "Product updated");
    Ok(Json(product))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool()).delete(id).await?;
    state.categories().invalidate().await;

    tracing::info!(product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request() -> ProductRequest {
        ProductRequest {
            name: "  Oak Cutting Board ".to_string(),
            slug: None,
            description: String::new(),
            price: Decimal::new(4500, 2),
            stock: 3,
            category_id: None,
            is_active: true,
            images: vec![],
        }
    }

    #[test]
    fn test_slug_derived_from_name() {
        let input = request().into_input().unwrap();
        assert_eq!(input.name, "Oak Cutting Board");
        assert_eq!(input.slug.as_str(), "oak-cutting-board");
    }

    #[test]
    fn test_negative_price_rejected() {
        let mut req = request();
        req.price = Decimal::new(-1, 0);
        assert!(matches!(req.into_input(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_sub_cent_price_rejected() {
        let mut req = request();
        req.price = Decimal::new(10_001, 3);
        assert!(matches!(req.into_input(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_negative_stock_rejected() {
        let mut req = request();
        req.stock = -1;
        assert!(matches!(req.into_input(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_invalid_slug_rejected() {
        let mut req = request();
        req.slug = Some("Not A Slug".to_string());
        assert!(matches!(req.into_input(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_image_url_must_be_http() {
        let mut req = request();
        req.images = vec![ProductImageInput {
            url: "javascript:alert(1)".to_string(),
            alt: None,
        }];
        assert!(matches!(req.into_input(), Err(AppError::BadRequest(_))));

        let mut req = request();
        req.images = vec![ProductImageInput {
            url: "https://img.example.com/board.jpg".to_string(),
            alt: Some("Board".to_string()),
        }];
        assert_eq!(req.into_input().unwrap().images.len(), 1);
    }
}
