//! Store snapshots.

use grove_engine::StoreSnapshot;
use sqlx::{types::Json, PgPool, Row};

/// The newest snapshot and the journal sequence it covers.
#[derive(Debug)]
pub struct StoredSnapshot {
    pub covers_seq: i64,
    pub state: StoreSnapshot,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredSnapshot {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        let Json(state): Json<StoreSnapshot> = row.try_get("state")?;
        Ok(StoredSnapshot {
            covers_seq: row.try_get("covers_seq")?,
            state,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Store a snapshot covering every change set up to `covers_seq`.
pub async fn save_snapshot(
    pool: &PgPool,
    covers_seq: i64,
    state: &StoreSnapshot,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO snapshots (covers_seq, state)
        VALUES ($1, $2)
        "#,
    )
    .bind(covers_seq)
    .bind(Json(state))
    .execute(pool)
    .await?;

    Ok(())
}

/// The newest snapshot, if any.
pub async fn latest_snapshot(pool: &PgPool) -> Result<Option<StoredSnapshot>, sqlx::Error> {
    sqlx::query_as::<_, StoredSnapshot>(
        r#"
        SELECT covers_seq, state, created_at
        FROM snapshots
        ORDER BY covers_seq DESC, id DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await
}
