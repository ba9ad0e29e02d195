//! Public category routes.

use axum::extract::State;
use tracing::instrument;

use hearth_core::Slug;

use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::models::Category;
use crate::state::AppState;

/// All categories with active product counts (cached).
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = state.categories().get_or_load(state.pool()).await?;
    Ok(Json(categories.as_ref().clone()))
}

/// One category by slug.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Category>> {
    let not_found = || AppError::NotFound("Category not found".to_string());
    let slug = Slug::parse(&slug).map_err(|_| not_found())?;

    let categories = state.categories().get_or_load(state.pool()).await?;
    categories
        .iter()
        .find(|c| c.slug == slug)
        .cloned()
        .map(Json)
        .ok_or_else(not_found)
}
