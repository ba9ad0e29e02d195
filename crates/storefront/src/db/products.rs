//! Product repository: public catalog queries and admin writes.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};

use hearth_core::{CategoryId, ProductId, Slug};

use super::RepositoryError;
use crate::models::{Product, ProductImage, ProductSummary};

const SUMMARY_SELECT: &str = "
    SELECT p.id, p.category_id, p.name, p.slug, p.description, p.price, p.stock,
           p.is_active, p.created_at, p.updated_at,
           (SELECT i.url FROM shop.product_image i
             WHERE i.product_id = p.id
             ORDER BY i.position, i.id LIMIT 1) AS image,
           c.slug AS category_slug
    FROM shop.product p
    LEFT JOIN shop.category c ON c.id = p.category_id";

const LIST_FILTER: &str = "
    WHERE ($1 OR p.is_active)
      AND ($2::text IS NULL OR c.slug = $2)
      AND ($3::text IS NULL OR p.name ILIKE $3 OR p.description ILIKE $3)";

const PRODUCT_COLUMNS: &str = "id, category_id, name, slug, description, price, stock, \
                               is_active, created_at, updated_at";

/// Listing sort order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "p.created_at DESC, p.id DESC",
            Self::PriceAsc => "p.price ASC, p.id ASC",
            Self::PriceDesc => "p.price DESC, p.id DESC",
            Self::Name => "p.name ASC, p.id ASC",
        }
    }
}

/// Listing filter and page window.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<Slug>,
    pub search: Option<String>,
    pub sort: ProductSort,
    pub include_inactive: bool,
    pub limit: i64,
    pub offset: i64,
}

/// One image in an admin product payload, stored in list order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProductImageInput {
    pub url: String,
    pub alt: Option<String>,
}

/// Fields written by admin create/update.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub is_active: bool,
    pub images: Vec<ProductImageInput>,
}

/// Escape `LIKE` metacharacters and wrap for a substring match.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching `filter`, returning the page and the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
    ) -> Result<(Vec<ProductSummary>, i64), RepositoryError> {
        let category = filter.category.as_ref().map(Slug::as_str);
        let pattern = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM shop.product p
             LEFT JOIN shop.category c ON c.id = p.category_id
             {LIST_FILTER}"
        ))
        .bind(filter.include_inactive)
        .bind(category)
        .bind(pattern.as_deref())
        .fetch_one(self.pool)
        .await?;

        let products = sqlx::query_as::<_, ProductSummary>(&format!(
            "{SUMMARY_SELECT} {LIST_FILTER} ORDER BY {} LIMIT $4 OFFSET $5",
            filter.sort.order_by()
        ))
        .bind(filter.include_inactive)
        .bind(category)
        .bind(pattern.as_deref())
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(self.pool)
        .await?;

        Ok((products, total))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &Slug) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Fetch listing rows for a set of ids, in no particular order.
    /// Missing ids are silently absent from the result.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<ProductSummary>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();

        let products =
            sqlx::query_as::<_, ProductSummary>(&format!("{SUMMARY_SELECT} WHERE p.id = ANY($1)"))
                .bind(raw)
                .fetch_all(self.pool)
                .await?;

        Ok(products)
    }

    /// Images for a product in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn images(&self, id: ProductId) -> Result<Vec<ProductImage>, RepositoryError> {
        let images = sqlx::query_as::<_, ProductImage>(
            "SELECT id, product_id, url, alt, position
             FROM shop.product_image
             WHERE product_id = $1
             ORDER BY position, id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(images)
    }

    /// Create a product together with its images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let product = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO shop.product
                 (category_id, name, slug, description, price, stock, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(input.category_id)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.stock)
        .bind(input.is_active)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "product slug already exists"))?;

        insert_images(&mut tx, product.id, &input.images).await?;
        tx.commit().await?;

        Ok(product)
    }

    /// Replace a product's fields and its full image list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let product = sqlx::query_as::<_, Product>(&format!(
            "UPDATE shop.product
             SET category_id = $2, name = $3, slug = $4, description = $5,
                 price = $6, stock = $7, is_active = $8, updated_at = NOW()
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(input.category_id)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.stock)
        .bind(input.is_active)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "product slug already exists"))?
        .ok_or(RepositoryError::NotFound)?;

        sqlx::query("DELETE FROM shop.product_image WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_images(&mut tx, id, &input.images).await?;
        tx.commit().await?;

        Ok(product)
    }

    /// Delete a product. Order items keep their snapshot with `product_id` cleared.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

async fn insert_images(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    images: &[ProductImageInput],
) -> Result<(), RepositoryError> {
    for (position, image) in (0_i32..).zip(images) {
        sqlx::query(
            "INSERT INTO shop.product_image (product_id, url, alt, position)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(product_id)
        .bind(&image.url)
        .bind(image.alt.as_deref())
        .bind(position)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
