//! Category management. Every write invalidates the public category cache.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use hearth_core::{CategoryId, Slug};

use crate::db::CategoryRepository;
use crate::db::categories::CategoryInput;
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::RequireAdmin;
use crate::models::Category;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

impl CategoryRequest {
    fn into_input(self) -> Result<CategoryInput> {
        let name = self.name.trim().to_string();
        if name.is_empty() || name.chars().count() > 100 {
            return Err(AppError::BadRequest(
                "name must be 1 to 100 characters".to_string(),
            ));
        }

        let slug = match self.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Slug::parse(s).map_err(|e| AppError::BadRequest(format!("slug: {e}")))?,
            None => Slug::from_title(&name).ok_or_else(|| {
                AppError::BadRequest("slug cannot be derived from name".to_string())
            })?,
        };

        Ok(CategoryInput {
            name,
            slug,
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        })
    }
}

#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Category>>> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(Json(categories))
}

#[instrument(skip(state, admin, req), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(req): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let input = req.into_input()?;
    let category = CategoryRepository::new(state.pool()).create(&input).await?;
    state.categories().invalidate().await;

    tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

#[instrument(skip(state, admin, req), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<Category>> {
    let input = req.into_input()?;
    let category = CategoryRepository::new(state.pool())
        .update(id, &input)
        .await?;
    state.categories().invalidate().await;

    tracing::info!(category_id = %category.id, "Category updated");
    Ok(Json(category))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    CategoryRepository::new(state.pool()).delete(id).await?;
    state.categories().invalidate().await;

    tracing::info!(category_id = %id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_description_dropped() {
        let input = CategoryRequest {
            name: "Kitchen".to_string(),
            slug: None,
            description: Some("   ".to_string()),
        }
        .into_input()
        .unwrap();

        assert_eq!(input.slug.as_str(), "kitchen");
        assert!(input.description.is_none());
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = CategoryRequest {
            name: " ".to_string(),
            slug: Some("kitchen".to_string()),
            description: None,
        }
        .into_input();

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
