//! Aggregate queries for the dashboard and back office.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use hearth_core::UserId;

use super::RepositoryError;

/// Products at or below this stock count as low stock.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

/// Signed-in user's summary numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct UserStats {
    pub order_count: i64,
    pub pending_orders: i64,
    /// Sum over paid, shipped and delivered orders.
    pub total_spent: Decimal,
    pub favorites: i64,
}

/// Back office summary numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct AdminStats {
    pub users: i64,
    pub products: i64,
    pub active_products: i64,
    pub orders: i64,
    pub pending_orders: i64,
    pub revenue: Decimal,
    pub low_stock: i64,
}

/// Repository for aggregate statistics.
pub struct StatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StatsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_user(&self, user_id: UserId) -> Result<UserStats, RepositoryError> {
        let stats = sqlx::query_as::<_, UserStats>(
            "SELECT
                 (SELECT COUNT(*) FROM shop.order WHERE user_id = $1) AS order_count,
                 (SELECT COUNT(*) FROM shop.order
                   WHERE user_id = $1 AND status = 'pending') AS pending_orders,
                 (SELECT COALESCE(SUM(total), 0) FROM shop.order
                   WHERE user_id = $1
                     AND status IN ('paid', 'shipped', 'delivered')) AS total_spent,
                 (SELECT COUNT(*) FROM shop.favorite WHERE user_id = $1) AS favorites",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(stats)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_admin(&self) -> Result<AdminStats, RepositoryError> {
        let stats = sqlx::query_as::<_, AdminStats>(
            "SELECT
                 (SELECT COUNT(*) FROM shop.user) AS users,
                 (SELECT COUNT(*) FROM shop.product) AS products,
                 (SELECT COUNT(*) FROM shop.product WHERE is_active) AS active_products,
                 (SELECT COUNT(*) FROM shop.order) AS orders,
                 (SELECT COUNT(*) FROM shop.order WHERE status = 'pending') AS pending_orders,
                 (SELECT COALESCE(SUM(total), 0) FROM shop.order
                   WHERE status IN ('paid', 'shipped', 'delivered')) AS revenue,
                 (SELECT COUNT(*) FROM shop.product
                   WHERE is_active AND stock <= $1) AS low_stock",
        )
        .bind(LOW_STOCK_THRESHOLD)
        .fetch_one(self.pool)
        .await?;

        Ok(stats)
    }
}
