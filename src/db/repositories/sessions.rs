use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{
    helpers::{parse_datetime, parse_kind, parse_optional_datetime, parse_status, to_i64, to_u64},
    models::{SessionRecord, SessionStatus},
    Database,
};

const SESSION_COLUMNS: &str = "id, kind, status, started_at, stopped_at, target_ms, max_samples, \
     sample_count, end_reason, summary_label, summary_age, summary_angle, used_fallback, \
     created_at, updated_at";

fn row_to_session(row: &Row) -> Result<SessionRecord> {
    let kind: String = row.get("kind")?;
    let status: String = row.get("status")?;
    let started_at: String = row.get("started_at")?;
    let stopped_at: Option<String> = row.get("stopped_at")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let target_ms: i64 = row.get("target_ms")?;
    let max_samples: i64 = row.get("max_samples")?;
    let sample_count: i64 = row.get("sample_count")?;
    let used_fallback: i64 = row.get("used_fallback")?;

    Ok(SessionRecord {
        id: row.get("id")?,
        kind: parse_kind(&kind)?,
        status: parse_status(&status)?,
        started_at: parse_datetime(&started_at, "started_at")?,
        stopped_at: parse_optional_datetime(stopped_at, "stopped_at")?,
        target_ms: to_u64(target_ms, "target_ms")?,
        max_samples: to_u64(max_samples, "max_samples")?,
        sample_count: to_u64(sample_count, "sample_count")?,
        end_reason: row.get("end_reason")?,
        summary_label: row.get("summary_label")?,
        summary_age: row.get("summary_age")?,
        summary_angle: row.get("summary_angle")?,
        used_fallback: used_fallback != 0,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn insert_session(&self, session: &SessionRecord) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, kind, status, started_at, stopped_at, target_ms, max_samples, \
                 sample_count, end_reason, summary_label, summary_age, summary_angle, used_fallback, \
                 created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    record.id,
                    record.kind.as_str(),
                    record.status.as_str(),
                    record.started_at.to_rfc3339(),
                    record.stopped_at.as_ref().map(|dt| dt.to_rfc3339()),
                    to_i64(record.target_ms)?,
                    to_i64(record.max_samples)?,
                    to_i64(record.sample_count)?,
                    record.end_reason,
                    record.summary_label,
                    record.summary_age,
                    record.summary_angle,
                    record.used_fallback as i64,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Record a session's terminal state and summary in one write.
    #[allow(clippy::too_many_arguments)]
    pub async fn finalize_session(
        &self,
        session_id: &str,
        status: SessionStatus,
        end_reason: &str,
        sample_count: u64,
        summary_label: Option<String>,
        summary_age: Option<f64>,
        summary_angle: Option<f64>,
        used_fallback: bool,
        stopped_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        let end_reason = end_reason.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE sessions
                 SET status = ?1,
                     end_reason = ?2,
                     sample_count = ?3,
                     summary_label = ?4,
                     summary_age = ?5,
                     summary_angle = ?6,
                     used_fallback = ?7,
                     stopped_at = ?8,
                     updated_at = ?9
                 WHERE id = ?10",
                params![
                    status.as_str(),
                    end_reason,
                    to_i64(sample_count)?,
                    summary_label,
                    summary_age,
                    summary_angle,
                    used_fallback as i64,
                    stopped_at.to_rfc3339(),
                    updated_at.to_rfc3339(),
                    session_id,
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
            ))?;

            let mut rows = stmt.query(params![session_id])?;
            let session = match rows.next()? {
                Some(row) => Some(row_to_session(row)?),
                None => None,
            };
            Ok(session)
        })
        .await
    }

    pub async fn get_incomplete_session(&self) -> Result<Option<SessionRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE status = 'Running'
                 ORDER BY started_at DESC
                 LIMIT 1"
            ))?;

            let mut rows = stmt.query([])?;
            let session = match rows.next()? {
                Some(row) => Some(row_to_session(row)?),
                None => None,
            };
            Ok(session)
        })
        .await
    }

    /// Crash recovery: a session still marked Running at startup was
    /// interrupted, never finalized.
    pub async fn mark_session_interrupted(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE sessions
                 SET status = 'Interrupted',
                     stopped_at = ?1,
                     updated_at = ?2
                 WHERE id = ?3",
                params![now.to_rfc3339(), now.to_rfc3339(), session_id],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn list_recent_sessions(&self, limit: u32) -> Result<Vec<SessionRecord>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 ORDER BY started_at DESC
                 LIMIT ?1"
            ))?;

            let mut rows = stmt.query(params![limit])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }
            Ok(sessions)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::SessionKind;

    fn temp_db_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("fitcare-test-{}.sqlite3", uuid::Uuid::new_v4()))
    }

    fn record(id: &str, status: SessionStatus) -> SessionRecord {
        let now = Utc::now();
        SessionRecord {
            id: id.to_string(),
            kind: SessionKind::Mood,
            status,
            started_at: now,
            stopped_at: None,
            target_ms: 10_000,
            max_samples: 50,
            sample_count: 0,
            end_reason: None,
            summary_label: None,
            summary_age: None,
            summary_angle: None,
            used_fallback: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_finalize_and_read_back() {
        let path = temp_db_path();
        let db = Database::new(path.clone()).unwrap();

        db.insert_session(&record("s1", SessionStatus::Running))
            .await
            .unwrap();

        let now = Utc::now();
        db.finalize_session(
            "s1",
            SessionStatus::Completed,
            "SampleBudget",
            50,
            Some("happy".to_string()),
            Some(27.5),
            None,
            false,
            now,
            now,
        )
        .await
        .unwrap();

        let session = db.get_session("s1").await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.end_reason.as_deref(), Some("SampleBudget"));
        assert_eq!(session.sample_count, 50);
        assert_eq!(session.summary_label.as_deref(), Some("happy"));
        assert_eq!(session.summary_age, Some(27.5));
        assert!(!session.used_fallback);

        drop(db);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn incomplete_session_recovery_roundtrip() {
        let path = temp_db_path();
        let db = Database::new(path.clone()).unwrap();

        db.insert_session(&record("left-running", SessionStatus::Running))
            .await
            .unwrap();

        let incomplete = db.get_incomplete_session().await.unwrap().unwrap();
        assert_eq!(incomplete.id, "left-running");

        db.mark_session_interrupted("left-running", Utc::now())
            .await
            .unwrap();
        assert!(db.get_incomplete_session().await.unwrap().is_none());

        let session = db.get_session("left-running").await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Interrupted);
        assert!(session.stopped_at.is_some());

        drop(db);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn recent_sessions_ordered_newest_first() {
        let path = temp_db_path();
        let db = Database::new(path.clone()).unwrap();

        let mut older = record("older", SessionStatus::Completed);
        older.started_at = Utc::now() - chrono::Duration::minutes(10);
        db.insert_session(&older).await.unwrap();
        db.insert_session(&record("newer", SessionStatus::Completed))
            .await
            .unwrap();

        let sessions = db.list_recent_sessions(10).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, "newer");
        assert_eq!(sessions[1].id, "older");

        drop(db);
        let _ = std::fs::remove_file(path);
    }
}
