//! Analysis repository for persisted coaching results
//!
//! Rows carry an expiry timestamp and a per-user retention cap. Retention is
//! enforced best-effort on save; expired rows are filtered from reads and
//! removed by the periodic purge.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use uuid::Uuid;

use super::DbPool;
use crate::analysis::{AnalysisView, Game, ResponseKind};
use crate::{Error, Result};

/// A persisted coaching analysis
#[derive(Debug, Clone)]
pub struct AnalysisRecord {
    pub id: String,
    pub user_id: String,
    pub user_text: String,
    pub game: Game,
    pub created_at: DateTime<Utc>,
    pub expire_at: DateTime<Utc>,
    pub analysis: AnalysisView,
}

/// Analysis repository
#[derive(Clone)]
pub struct AnalysisRepo {
    pool: DbPool,
    ttl_hours: i64,
    retention_limit: usize,
}

impl AnalysisRepo {
    /// Create a new analysis repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool, ttl_hours: i64, retention_limit: usize) -> Self {
        Self {
            pool,
            ttl_hours,
            retention_limit,
        }
    }

    /// Persist an analysis for a user
    ///
    /// Assigns the creation timestamp and expiry, then trims the user's
    /// history to the retention limit. Trimming failures are logged, never
    /// surfaced.
    ///
    /// # Errors
    ///
    /// Returns error if the insert itself fails
    pub fn save(
        &self,
        user_id: &str,
        user_text: &str,
        game: Game,
        analysis: &AnalysisView,
    ) -> Result<AnalysisRecord> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let expire_at = created_at + Duration::hours(self.ttl_hours);

        let top_tips = serde_json::to_string(&analysis.top_tips)?;
        let training_drills = serde_json::to_string(&analysis.training_drills)?;

        conn.execute(
            "INSERT INTO analyses (id, user_id, user_text, game, created_at, expire_at,
                                   summary, top_tips, training_drills, rating, confidence, response_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rusqlite::params![
                &id,
                user_id,
                user_text,
                game.as_str(),
                format_datetime(created_at),
                format_datetime(expire_at),
                &analysis.summary,
                &top_tips,
                &training_drills,
                analysis.rating,
                analysis.confidence,
                analysis.response_type.as_str(),
            ],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        if let Err(e) = self.enforce_retention(&conn, user_id) {
            tracing::warn!(user_id = %user_id, error = %e, "retention trim failed");
        }

        Ok(AnalysisRecord {
            id,
            user_id: user_id.to_string(),
            user_text: user_text.to_string(),
            game,
            created_at,
            expire_at,
            analysis: analysis.clone(),
        })
    }

    /// List a user's non-expired analyses for a game, newest first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list_recent(&self, user_id: &str, game: Game, limit: usize) -> Result<Vec<AnalysisRecord>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let limit = limit.min(self.retention_limit);

        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, user_text, game, created_at, expire_at,
                        summary, top_tips, training_drills, rating, confidence, response_type
                 FROM analyses
                 WHERE user_id = ?1 AND game = ?2 AND expire_at > ?3
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?4",
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        let records = stmt
            .query_map(
                rusqlite::params![
                    user_id,
                    game.as_str(),
                    format_datetime(Utc::now()),
                    i64::try_from(limit).unwrap_or(i64::MAX),
                ],
                row_to_record,
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .filter_map(std::result::Result::ok)
            .collect();

        Ok(records)
    }

    /// Delete all expired analyses, returning the number removed
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn purge_expired(&self) -> Result<usize> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let deleted = conn
            .execute(
                "DELETE FROM analyses WHERE expire_at <= ?1",
                [format_datetime(Utc::now())],
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        if deleted > 0 {
            tracing::info!(deleted, "purged expired analyses");
        }

        Ok(deleted)
    }

    /// Drop the user's oldest rows beyond the retention limit
    fn enforce_retention(&self, conn: &super::DbConn, user_id: &str) -> Result<()> {
        conn.execute(
            "DELETE FROM analyses
             WHERE user_id = ?1
               AND id NOT IN (
                   SELECT id FROM analyses
                   WHERE user_id = ?1
                   ORDER BY created_at DESC, rowid DESC
                   LIMIT ?2
               )",
            rusqlite::params![user_id, i64::try_from(self.retention_limit).unwrap_or(i64::MAX)],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<AnalysisRecord> {
    let game: String = row.get(3)?;
    let top_tips: String = row.get(7)?;
    let training_drills: String = row.get(8)?;
    let response_type: String = row.get(11)?;

    Ok(AnalysisRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        user_text: row.get(2)?,
        game: Game::from_str_lossy(&game),
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        expire_at: parse_datetime(&row.get::<_, String>(5)?),
        analysis: AnalysisView {
            summary: row.get(6)?,
            top_tips: serde_json::from_str(&top_tips).unwrap_or_default(),
            training_drills: serde_json::from_str(&training_drills).unwrap_or_default(),
            rating: row.get(9)?,
            confidence: row.get(10)?,
            response_type: ResponseKind::from_str_lossy(&response_type),
        },
    })
}

/// Fixed-width RFC 3339 so string comparison matches chronological order
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
