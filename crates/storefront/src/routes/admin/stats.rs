//! Back office summary.

use axum::extract::State;
use tracing::instrument;

use crate::db::StatsRepository;
use crate::db::stats::AdminStats;
use crate::error::Result;
use crate::extract::Json;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<AdminStats>> {
    let stats = StatsRepository::new(state.pool()).for_admin().await?;
    Ok(Json(stats))
}
