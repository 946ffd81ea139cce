//! Landmark store ("model")
//!
//! Face-landmark geometry grouped into branch tables that share one layout:
//! `id, emotion_id, points, points_posed`, the two geometry columns holding JSON text.
//! `Total` is the default branch. Rows carry no reference to a painting title.

use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::domain::{Geometry, LandmarkRecord};
use crate::infrastructure::DatabaseConnection;
use crate::infrastructure::store_error::{StoreError, StoreResult};
use crate::infrastructure::store_session::StoreSession;

/// Branch every landmark is written to unless another one is named
pub const DEFAULT_BRANCH: &str = "Total";

/// Branch names become table names, so only plain identifiers are accepted
fn validate_branch(branch: &str) -> StoreResult<&str> {
    let mut chars = branch.chars();
    let valid = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(branch)
    } else {
        Err(StoreError::InvalidBranch(branch.to_string()))
    }
}

fn create_branch_sql(branch: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS "{branch}" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            emotion_id INTEGER NOT NULL,
            points TEXT NOT NULL,
            points_posed TEXT NOT NULL
        )
        "#
    )
}

pub struct LandmarkStore {
    session: StoreSession,
}

impl LandmarkStore {
    /// Open (creating if needed) the store at `database_url`
    pub async fn open(database_url: &str) -> StoreResult<Self> {
        let db = DatabaseConnection::new(database_url)
            .await
            .map_err(|e| StoreError::Open {
                url: database_url.to_string(),
                reason: format!("{e:#}"),
            })?;
        let store = Self::from_pool(db.into_pool()).await?;
        info!("Opened model store at {}", database_url);
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
        sqlx::query(&create_branch_sql(DEFAULT_BRANCH)).execute(&pool).await?;
        Ok(Self {
            session: StoreSession::new(pool),
        })
    }

    /// Create the store and its default branch if they do not exist yet
    pub async fn ensure_schema(database_url: &str) -> StoreResult<()> {
        Self::open(database_url).await?.close().await
    }

    /// Store landmarks in the default branch and return the new row id
    pub async fn store_landmarks(&self, emotion_id: i64, points: &Geometry, posed_points: &Geometry) -> StoreResult<i64> {
        self.store_landmarks_in(DEFAULT_BRANCH, emotion_id, points, posed_points)
            .await
    }

    /// Store landmarks in `branch`, creating the branch table on first use
    pub async fn store_landmarks_in(
        &self,
        branch: &str,
        emotion_id: i64,
        points: &Geometry,
        posed_points: &Geometry,
    ) -> StoreResult<i64> {
        let branch = validate_branch(branch)?;
        let points = points.to_json().map_err(StoreError::Encode)?;
        let posed_points = posed_points.to_json().map_err(StoreError::Encode)?;

        let mut tx = self.session.writer().await?;
        sqlx::query(&create_branch_sql(branch)).execute(&mut **tx).await?;

        let insert = format!(r#"INSERT INTO "{branch}" (emotion_id, points, points_posed) VALUES (?, ?, ?)"#);
        let result = sqlx::query(&insert)
            .bind(emotion_id)
            .bind(points)
            .bind(posed_points)
            .execute(&mut **tx)
            .await?;

        let id = result.last_insert_rowid();
        debug!("Stored landmarks #{} in {}", id, branch);
        Ok(id)
    }

    /// Every landmark row of `branch`, geometry decoded
    pub async fn get_landmarks(&self, branch: &str) -> StoreResult<Vec<LandmarkRecord>> {
        let branch = validate_branch(branch)?;
        let select = format!(r#"SELECT id, emotion_id, points, points_posed FROM "{branch}" ORDER BY id"#);
        let query = sqlx::query(&select);

        let mut pending = self.session.reader().await;
        let rows = match pending.as_mut() {
            Some(tx) => query.fetch_all(&mut **tx).await?,
            None => query.fetch_all(self.session.pool()).await?,
        };

        rows.iter()
            .map(|row| -> StoreResult<LandmarkRecord> {
                let id: i64 = row.try_get("id")?;
                let decode = |column: &str| -> StoreResult<Geometry> {
                    let raw: String = row.try_get(column)?;
                    Geometry::from_json(&raw).map_err(|source| StoreError::Decode {
                        table: branch.to_string(),
                        id,
                        source,
                    })
                };

                Ok(LandmarkRecord {
                    id,
                    emotion_id: row.try_get("emotion_id")?,
                    points: decode("points")?,
                    posed_points: decode("points_posed")?,
                })
            })
            .collect()
    }

    pub async fn commit(&self) -> StoreResult<()> {
        self.session.commit().await
    }

    pub async fn close(&self) -> StoreResult<()> {
        self.session.close().await
    }
}
