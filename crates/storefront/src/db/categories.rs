//! Category repository.

use sqlx::PgPool;

use hearth_core::{CategoryId, Slug};

use super::RepositoryError;
use crate::models::Category;

const CATEGORY_SELECT: &str = "
    SELECT c.id, c.name, c.slug, c.description,
           (SELECT COUNT(*) FROM shop.product p
             WHERE p.category_id = c.id AND p.is_active) AS product_count,
           c.created_at, c.updated_at
    FROM shop.category c";

/// Fields written by admin create/update.
#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List every category with its active product count, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories =
            sqlx::query_as::<_, Category>(&format!("{CATEGORY_SELECT} ORDER BY c.name, c.id"))
                .fetch_all(self.pool)
                .await?;

        Ok(categories)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &Slug) -> Result<Option<Category>, RepositoryError> {
        let category =
            sqlx::query_as::<_, Category>(&format!("{CATEGORY_SELECT} WHERE c.slug = $1"))
                .bind(slug)
                .fetch_optional(self.pool)
                .await?;

        Ok(category)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!("{CATEGORY_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(category)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, input: &CategoryInput) -> Result<Category, RepositoryError> {
        let id: CategoryId = sqlx::query_scalar(
            "INSERT INTO shop.category (name, slug, description)
             VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(&input.name)
        .bind(&input.slug)
        .bind(input.description.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "category slug already exists"))?;

        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Replace a category's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.category
             SET name = $2, slug = $3, description = $4, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(input.description.as_deref())
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "category slug already exists"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a category. Its products become uncategorized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.category WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
