use crate::db::queries;
use crate::error::{ReportError, Result};
use crate::models::{PairSnapshot, Snapshot};
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// 上次报表快照的存取, 按 pair 序号寻址
///
/// 一次运行开始时读一次, 结束时整体写一次。
pub trait SnapshotStore: Send + Sync {
    fn load_last(&self) -> BoxFuture<'_, Result<Option<Snapshot>>>;

    fn save_all<'a>(&'a self, snapshot: &'a Snapshot) -> BoxFuture<'a, Result<()>>;

    fn get_last(&self, pair_index: usize) -> BoxFuture<'_, Result<Option<PairSnapshot>>> {
        async move {
            Ok(self
                .load_last()
                .await?
                .and_then(|mut s| s.pairs.remove(&pair_index)))
        }
        .boxed()
    }
}

/// 本地 JSON 文件 (默认 `data/lastReport.json`)
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotStore {
    path: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join("lastReport.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Option<Snapshot>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                tracing::error!("Error reading last report: {}", e);
                Err(e.into())
            }
        }
    }

    /// 先写临时文件再 rename, 避免写一半
    async fn write(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

impl SnapshotStore for JsonFileSnapshotStore {
    fn load_last(&self) -> BoxFuture<'_, Result<Option<Snapshot>>> {
        self.read().boxed()
    }

    fn save_all<'a>(&'a self, snapshot: &'a Snapshot) -> BoxFuture<'a, Result<()>> {
        self.write(snapshot).boxed()
    }
}

/// 进程内快照
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    inner: RwLock<Option<Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load_last(&self) -> BoxFuture<'_, Result<Option<Snapshot>>> {
        async move { Ok(self.inner.read().await.clone()) }.boxed()
    }

    fn save_all<'a>(&'a self, snapshot: &'a Snapshot) -> BoxFuture<'a, Result<()>> {
        async move {
            *self.inner.write().await = Some(snapshot.clone());
            Ok(())
        }
        .boxed()
    }
}

/// Postgres 快照表, 每个 pair 一行 JSONB
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    pub async fn connect(pool: PgPool) -> Result<Self> {
        queries::ensure_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn read(&self) -> Result<Option<Snapshot>> {
        let rows = queries::list_snapshot_rows(&self.pool).await?;
        let Some(timestamp) = rows.iter().map(|r| r.saved_at).max() else {
            return Ok(None);
        };

        let mut pairs = BTreeMap::new();
        for row in rows {
            let index = usize::try_from(row.pair_index)
                .map_err(|_| ReportError::Snapshot(format!("negative pair index {}", row.pair_index)))?;
            pairs.insert(index, row.payload.0);
        }
        Ok(Some(Snapshot { timestamp, pairs }))
    }
}

impl SnapshotStore for PgSnapshotStore {
    fn load_last(&self) -> BoxFuture<'_, Result<Option<Snapshot>>> {
        self.read().boxed()
    }

    fn save_all<'a>(&'a self, snapshot: &'a Snapshot) -> BoxFuture<'a, Result<()>> {
        async move {
            let pairs: Vec<PairSnapshot> = snapshot.pairs.values().cloned().collect();
            queries::replace_snapshot(&self.pool, &pairs, snapshot.timestamp.max(Utc::now())).await?;
            Ok(())
        }
        .boxed()
    }
}
