//! Bounding-box store ("paintings")
//!
//! One `bounding_box` row per detected face, or a single row with `has_face = 0`
//! when the detector found none. The presence of any row for a canonical title is the
//! marker the crawler consults before downloading.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::domain::{BoundingBoxRecord, FaceBox};
use crate::infrastructure::DatabaseConnection;
use crate::infrastructure::store_error::{StoreError, StoreResult};
use crate::infrastructure::store_session::StoreSession;

const CREATE_BOUNDING_BOX_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS bounding_box (
        title TEXT NOT NULL,
        has_face INTEGER NOT NULL,
        xlo INTEGER,
        xhi INTEGER,
        ylo INTEGER,
        yhi INTEGER
    )
";

const CREATE_TITLE_INDEX_SQL: &str = "CREATE INDEX IF NOT EXISTS idx_bounding_box_title ON bounding_box (title)";

const INSERT_RECORD_SQL: &str =
    "INSERT INTO bounding_box (title, has_face, xlo, xhi, ylo, yhi) VALUES (?, ?, ?, ?, ?, ?)";

const QUERY_RECORDS_SQL: &str =
    "SELECT title, has_face, xlo, xhi, ylo, yhi FROM bounding_box WHERE title = ? ORDER BY rowid";

fn record_from_row(row: &SqliteRow) -> StoreResult<BoundingBoxRecord> {
    let title: String = row.try_get("title")?;
    if !row.try_get::<bool, _>("has_face")? {
        return Ok(BoundingBoxRecord::no_face(title));
    }

    let face = FaceBox {
        x_lo: row.try_get("xlo")?,
        x_hi: row.try_get("xhi")?,
        y_lo: row.try_get("ylo")?,
        y_hi: row.try_get("yhi")?,
    };
    Ok(BoundingBoxRecord::with_face(title, face))
}

/// Dedup check and detection outcome recorder, keyed by canonical title
pub struct DedupStore {
    session: StoreSession,
}

impl DedupStore {
    /// Open (creating if needed) the store at `database_url`
    pub async fn open(database_url: &str) -> StoreResult<Self> {
        let db = DatabaseConnection::new(database_url)
            .await
            .map_err(|e| StoreError::Open {
                url: database_url.to_string(),
                reason: format!("{e:#}"),
            })?;
        let store = Self::from_pool(db.into_pool()).await?;
        info!("Opened paintings store at {}", database_url);
        Ok(store)
    }

    /// Private in-memory store
    pub async fn in_memory() -> StoreResult<Self> {
        let db = DatabaseConnection::in_memory()
            .await
            .map_err(|e| StoreError::Open {
                url: "sqlite::memory:".to_string(),
                reason: format!("{e:#}"),
            })?;
        Self::from_pool(db.into_pool()).await
    }

    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        sqlx::query(CREATE_BOUNDING_BOX_SQL).execute(&pool).await?;
        sqlx::query(CREATE_TITLE_INDEX_SQL).execute(&pool).await?;
        Ok(Self {
            session: StoreSession::new(pool),
        })
    }

    /// Every row recorded for `title`, in insertion order
    pub async fn records(&self, title: &str) -> StoreResult<Vec<BoundingBoxRecord>> {
        let query = sqlx::query(QUERY_RECORDS_SQL).bind(title);
        let mut pending = self.session.reader().await;
        let rows = match pending.as_mut() {
            Some(tx) => query.fetch_all(&mut **tx).await?,
            None => query.fetch_all(self.session.pool()).await?,
        };
        rows.iter().map(record_from_row).collect()
    }

    /// True iff at least one row exists for `title`
    pub async fn exists(&self, title: &str) -> StoreResult<bool> {
        let exists = !self.records(title).await?.is_empty();
        debug!("exists({:?}) = {}", title, exists);
        Ok(exists)
    }

    /// Append one detection outcome
    pub async fn record(&self, record: &BoundingBoxRecord) -> StoreResult<()> {
        let face = record.face;
        let mut tx = self.session.writer().await?;
        sqlx::query(INSERT_RECORD_SQL)
            .bind(record.title.as_str())
            .bind(record.has_face())
            .bind(face.map(|f| f.x_lo))
            .bind(face.map(|f| f.x_hi))
            .bind(face.map(|f| f.y_lo))
            .bind(face.map(|f| f.y_hi))
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Record that no face was found in the image for `title`
    pub async fn record_no_face(&self, title: &str) -> StoreResult<()> {
        self.record(&BoundingBoxRecord::no_face(title)).await
    }

    /// Record one detected face for `title`
    pub async fn record_face(&self, title: &str, face: FaceBox) -> StoreResult<()> {
        self.record(&BoundingBoxRecord::with_face(title, face)).await
    }

    /// Whether any face was recorded for `title`.
    ///
    /// Fails with [`StoreError::NotFound`] when the title has no row at all.
    pub async fn has_face(&self, title: &str) -> StoreResult<bool> {
        let records = self.records(title).await?;
        if records.is_empty() {
            return Err(StoreError::not_found(title));
        }
        Ok(records.iter().any(BoundingBoxRecord::has_face))
    }

    pub async fn commit(&self) -> StoreResult<()> {
        self.session.commit().await
    }

    pub async fn close(&self) -> StoreResult<()> {
        self.session.close().await
    }
}
