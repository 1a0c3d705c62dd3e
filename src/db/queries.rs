use crate::models::PairSnapshot;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::time::Duration;

/// 快照表的一行: 每个 pair 一条
#[derive(Debug, FromRow)]
pub struct SnapshotRow {
    pub pair_index: i32,
    pub payload: Json<PairSnapshot>,
    pub saved_at: DateTime<Utc>,
}

/// 建表 (幂等)
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS report_snapshot (
            pair_index INTEGER PRIMARY KEY,
            payload    JSONB NOT NULL,
            saved_at   TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map(|_| ())
}

/// 读取全部 pair 的快照
pub async fn list_snapshot_rows(pool: &PgPool) -> Result<Vec<SnapshotRow>, sqlx::Error> {
    sqlx::query_as::<_, SnapshotRow>(
        r#"
        SELECT pair_index, payload, saved_at
        FROM report_snapshot
        ORDER BY pair_index
        "#,
    )
    .fetch_all(pool)
    .await
}

/// 整体替换快照 (同一事务内先删后插)
pub async fn replace_snapshot(
    pool: &PgPool,
    pairs: &[PairSnapshot],
    saved_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM report_snapshot")
        .execute(&mut *tx)
        .await?;

    if !pairs.is_empty() {
        let mut query_builder =
            sqlx::QueryBuilder::new("INSERT INTO report_snapshot (pair_index, payload, saved_at) ");
        query_builder.push_values(pairs.iter(), |mut b, pair| {
            b.push_bind(pair.pair_index as i32)
                .push_bind(Json(pair.clone()))
                .push_bind(saved_at);
        });

        // 超时控制: 30秒
        let execute_result = tokio::time::timeout(
            Duration::from_secs(30),
            query_builder.build().execute(&mut *tx),
        )
        .await;

        match execute_result {
            Ok(Ok(result)) => {
                tracing::info!("Snapshot rows written: {}", result.rows_affected());
            }
            Ok(Err(e)) => {
                tracing::error!("Snapshot insert failed: {:?}", e);
                return Err(e);
            }
            Err(_) => {
                tracing::error!("Snapshot insert timed out (>30s)");
                return Err(sqlx::Error::PoolTimedOut);
            }
        }
    }

    tx.commit().await
}
