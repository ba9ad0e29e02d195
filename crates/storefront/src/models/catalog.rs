//! Catalog domain types: categories, products and their images.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use hearth_core::{CategoryId, ProductId, ProductImageId, ProductSnapshot, Slug};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    /// Number of active products in the category.
    pub product_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A catalog product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Stock as a cart ceiling; negative values (never stored) read as zero.
    #[must_use]
    pub fn stock_ceiling(&self) -> u32 {
        u32::try_from(self.stock).unwrap_or(0)
    }

    /// Catalog data for adding this product to a cart.
    #[must_use]
    pub fn snapshot(&self, image: Option<String>) -> ProductSnapshot {
        ProductSnapshot {
            product_id: self.id,
            name: self.name.clone(),
            unit_price: self.price,
            image,
            slug: self.slug.to_string(),
            stock: if self.is_active { self.stock_ceiling() } else { 0 },
        }
    }
}

/// A product image, ordered by `position`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub product_id: ProductId,
    pub url: String,
    pub alt: Option<String>,
    pub position: i32,
}

/// Listing row: a product with its primary image and category slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ProductSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub product: Product,
    pub image: Option<String>,
    pub category_slug: Option<Slug>,
}

/// Product detail page data.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub images: Vec<ProductImage>,
    pub category: Option<Category>,
}

impl ProductDetail {
    /// URL of the first image, used as the cart thumbnail.
    #[must_use]
    pub fn primary_image(&self) -> Option<String> {
        self.images.first().map(|img| img.url.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(stock: i32, is_active: bool) -> Product {
        Product {
            id: ProductId::new(1),
            category_id: None,
            name: "Oak Side Table".to_string(),
            slug: Slug::parse("oak-side-table").unwrap(),
            description: String::new(),
            price: Decimal::new(12_900, 2),
            stock,
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_snapshot_carries_catalog_data() {
        let snapshot = product(4, true).snapshot(Some("https://img/1.jpg".to_string()));
        assert_eq!(snapshot.stock, 4);
        assert_eq!(snapshot.unit_price, Decimal::new(12_900, 2));
        assert_eq!(snapshot.slug, "oak-side-table");
        assert_eq!(snapshot.image.as_deref(), Some("https://img/1.jpg"));
    }

    #[test]
    fn test_inactive_product_has_no_stock_for_cart() {
        assert_eq!(product(4, false).snapshot(None).stock, 0);
        assert_eq!(product(-3, true).stock_ceiling(), 0);
    }
}
