use sqlx::{postgres::PgPoolOptions, PgPool};
use std::collections::HashSet;

use crate::{
    error::{AppError, AppResult},
    models::{StayRecord, UserId},
    services::record_source::StayRecordSource,
};

/// Creates a PostgreSQL connection pool
///
/// The pool is only used while loading stay history, so it stays small.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

const STAYS_QUERY: &str = "SELECT user_code::BIGINT AS user_code, \
     name, \
     total::DOUBLE PRECISION AS total \
     FROM stays";

const USERS_QUERY: &str = "SELECT DISTINCT user_code::BIGINT \
     FROM users \
     WHERE user_code IS NOT NULL";

/// Raw `stays` row; columns are nullable in the table
#[derive(Debug, sqlx::FromRow)]
struct StayRow {
    user_code: Option<i64>,
    name: Option<String>,
    total: Option<f64>,
}

impl StayRow {
    /// Converts to a record, rejecting rows with missing columns
    fn into_record(self, position: usize) -> AppResult<StayRecord> {
        match (self.user_code, self.name, self.total) {
            (Some(user_code), Some(name), Some(total)) => {
                Ok(StayRecord::new(user_code, name, total))
            }
            (user_code, name, total) => Err(AppError::InvalidData(format!(
                "stay row {} has missing columns (user_code: {:?}, name: {:?}, total: {:?})",
                position, user_code, name, total
            ))),
        }
    }
}

/// Stay records read from the `stays` and `users` tables
#[derive(Clone)]
pub struct PgRecordSource {
    pool: PgPool,
}

impl PgRecordSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl StayRecordSource for PgRecordSource {
    async fn load_stays(&self) -> AppResult<Vec<StayRecord>> {
        let rows = sqlx::query_as::<_, StayRow>(STAYS_QUERY)
            .fetch_all(&self.pool)
            .await?;

        let records = rows
            .into_iter()
            .enumerate()
            .map(|(position, row)| row.into_record(position))
            .collect::<AppResult<Vec<_>>>()?;

        tracing::debug!(count = records.len(), "Loaded stays from database");
        Ok(records)
    }

    async fn load_known_users(&self) -> AppResult<HashSet<UserId>> {
        let users: Vec<(i64,)> = sqlx::query_as(USERS_QUERY).fetch_all(&self.pool).await?;
        Ok(users.into_iter().map(|(id,)| UserId(id)).collect())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
