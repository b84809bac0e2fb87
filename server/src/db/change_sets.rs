//! The `change_sets` journal.

use grove_engine::ChangeSet;
use sqlx::{types::Json, PgPool, Row};

/// A journaled change set with its sequence number.
#[derive(Debug)]
pub struct JournalEntry {
    pub seq: i64,
    pub changes: ChangeSet,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for JournalEntry {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        let Json(changes): Json<ChangeSet> = row.try_get("changes")?;
        Ok(JournalEntry {
            seq: row.try_get("seq")?,
            changes,
        })
    }
}

/// Append change sets in one transaction. Returns the sequence number of the
/// last appended entry, or `None` when `sets` is empty.
pub async fn append_change_sets(
    pool: &PgPool,
    sets: &[ChangeSet],
) -> Result<Option<i64>, sqlx::Error> {
    if sets.is_empty() {
        return Ok(None);
    }

    let mut tx = pool.begin().await?;
    let mut last = None;
    for set in sets {
        let (seq,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO change_sets (applied_at, changes)
            VALUES ($1, $2)
            RETURNING seq
            "#,
        )
        .bind(set.at as i64)
        .bind(Json(set))
        .fetch_one(&mut *tx)
        .await?;
        last = Some(seq);
    }
    tx.commit().await?;

    Ok(last)
}

/// Change sets journaled after `seq`, in order.
pub async fn change_sets_after(pool: &PgPool, seq: i64) -> Result<Vec<JournalEntry>, sqlx::Error> {
    sqlx::query_as::<_, JournalEntry>(
        r#"
        SELECT seq, changes
        FROM change_sets
        WHERE seq > $1
        ORDER BY seq ASC
        "#,
    )
    .bind(seq)
    .fetch_all(pool)
    .await
}
