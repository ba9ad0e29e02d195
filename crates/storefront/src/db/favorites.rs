//! Favorites repository.

use sqlx::PgPool;

use hearth_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::ProductSummary;

/// Repository for a user's saved products.
pub struct FavoriteRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FavoriteRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Favorited products, most recently saved first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<ProductSummary>, RepositoryError> {
        let products = sqlx::query_as::<_, ProductSummary>(
            "SELECT p.id, p.category_id, p.name, p.slug, p.description, p.price, p.stock,
                    p.is_active, p.created_at, p.updated_at,
                    (SELECT i.url FROM shop.product_image i
                      WHERE i.product_id = p.id
                      ORDER BY i.position, i.id LIMIT 1) AS image,
                    c.slug AS category_slug
             FROM shop.favorite f
             JOIN shop.product p ON p.id = f.product_id
             LEFT JOIN shop.category c ON c.id = p.category_id
             WHERE f.user_id = $1
             ORDER BY f.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Save a product. Adding an existing favorite is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO shop.favorite (user_id, product_id)
             VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product was not a favorite.
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.favorite WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
