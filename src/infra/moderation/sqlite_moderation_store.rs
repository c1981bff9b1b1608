// SQLite-backed moderation store.
//
// Tables:
// - content_filter_configs: one policy row per filter type
// - automated_flags: append-only detected-issue records
// - moderation_reports: reports filed for human review
// - moderation_reporters: identities reports are filed under (holds the
//   synthetic "system" reporter)

use crate::core::moderation::{
    AutomatedFlag, FilterConfig, FilterType, ModerationError, ModerationReport, ModerationStore,
    Sensitivity,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};
use std::collections::BTreeSet;

const SYSTEM_REPORTER_NAME: &str = "system";

pub struct SqliteModerationStore {
    pool: Pool<Sqlite>,
}

impl SqliteModerationStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), ModerationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS content_filter_configs (
                filter_type TEXT PRIMARY KEY,
                enabled BOOLEAN NOT NULL DEFAULT 1,
                sensitivity TEXT NOT NULL DEFAULT 'moderate',
                whitelist TEXT NOT NULL DEFAULT '[]',
                blacklist TEXT NOT NULL DEFAULT '[]',
                updated_by TEXT,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS automated_flags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content_type TEXT NOT NULL,
                content_id INTEGER NOT NULL,
                flag_type TEXT NOT NULL,
                confidence REAL NOT NULL,
                reviewed BOOLEAN NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_automated_flags_content
                ON automated_flags(content_type, content_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moderation_reports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                reporter_id INTEGER NOT NULL,
                reason TEXT NOT NULL,
                details TEXT NOT NULL,
                story_id INTEGER,
                chapter_id INTEGER,
                priority TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moderation_reporters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::Storage(e.to_string()))?;

        Ok(())
    }

    fn row_to_config(row: &sqlx::sqlite::SqliteRow) -> Result<FilterConfig, ModerationError> {
        let filter_type: String = row.get("filter_type");
        let filter_type: FilterType = filter_type
            .parse()
            .map_err(ModerationError::Config)?;

        let sensitivity: String = row.get("sensitivity");
        let sensitivity: Sensitivity = sensitivity
            .parse()
            .map_err(ModerationError::Config)?;

        let whitelist: String = row.get("whitelist");
        let blacklist: String = row.get("blacklist");
        let whitelist: BTreeSet<String> = serde_json::from_str(&whitelist).unwrap_or_default();
        let blacklist: BTreeSet<String> = serde_json::from_str(&blacklist).unwrap_or_default();

        let updated_at: String = row.get("updated_at");
        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(FilterConfig {
            filter_type,
            enabled: row.get("enabled"),
            sensitivity,
            whitelist,
            blacklist,
            updated_by: row.get("updated_by"),
            updated_at,
        })
    }
}

#[async_trait]
impl ModerationStore for SqliteModerationStore {
    async fn get_config(
        &self,
        filter_type: FilterType,
    ) -> Result<Option<FilterConfig>, ModerationError> {
        let row = sqlx::query("SELECT * FROM content_filter_configs WHERE filter_type = ?")
            .bind(filter_type.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ModerationError::Storage(e.to_string()))?;

        row.as_ref().map(Self::row_to_config).transpose()
    }

    async fn upsert_config(&self, config: FilterConfig) -> Result<(), ModerationError> {
        let whitelist = serde_json::to_string(&config.whitelist)
            .map_err(|e| ModerationError::Storage(e.to_string()))?;
        let blacklist = serde_json::to_string(&config.blacklist)
            .map_err(|e| ModerationError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO content_filter_configs (
                filter_type, enabled, sensitivity, whitelist, blacklist,
                updated_by, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(filter_type) DO UPDATE SET
                enabled = excluded.enabled,
                sensitivity = excluded.sensitivity,
                whitelist = excluded.whitelist,
                blacklist = excluded.blacklist,
                updated_by = excluded.updated_by,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(config.filter_type.to_string())
        .bind(config.enabled)
        .bind(config.sensitivity.to_string())
        .bind(&whitelist)
        .bind(&blacklist)
        .bind(&config.updated_by)
        .bind(config.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn insert_flag(&self, flag: AutomatedFlag) -> Result<(), ModerationError> {
        sqlx::query(
            r#"
            INSERT INTO automated_flags (
                content_type, content_id, flag_type, confidence, reviewed, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&flag.content_type)
        .bind(flag.content_id)
        .bind(flag.flag_type.to_string())
        .bind(flag.confidence)
        .bind(flag.reviewed)
        .bind(flag.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn insert_report(&self, report: ModerationReport) -> Result<i64, ModerationError> {
        let result = sqlx::query(
            r#"
            INSERT INTO moderation_reports (
                reporter_id, reason, details, story_id, chapter_id, priority, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(report.reporter_id)
        .bind(&report.reason)
        .bind(&report.details)
        .bind(report.story_id)
        .bind(report.chapter_id)
        .bind(report.priority.to_string())
        .bind(report.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::Storage(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    async fn ensure_system_reporter(&self) -> Result<i64, ModerationError> {
        sqlx::query("INSERT OR IGNORE INTO moderation_reporters (name, created_at) VALUES (?, ?)")
            .bind(SYSTEM_REPORTER_NAME)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| ModerationError::Storage(e.to_string()))?;

        let row = sqlx::query("SELECT id FROM moderation_reporters WHERE name = ?")
            .bind(SYSTEM_REPORTER_NAME)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ModerationError::Storage(e.to_string()))?;

        Ok(row.get::<i64, _>("id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{ContentFlag, ReportPriority};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteModerationStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteModerationStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_missing_config_is_none() {
        let store = store().await;
        let config = store.get_config(FilterType::Spam).await.unwrap();
        assert!(config.is_none());
    }

    #[tokio::test]
    async fn test_config_upsert_roundtrip() {
        let store = store().await;

        let mut config = FilterConfig::default_for(FilterType::Profanity);
        config.sensitivity = Sensitivity::Strict;
        config.whitelist.insert("hellion".to_string());
        config.blacklist.insert("frak".to_string());
        config.updated_by = Some("admin".to_string());
        store.upsert_config(config).await.unwrap();

        let loaded = store
            .get_config(FilterType::Profanity)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.filter_type, FilterType::Profanity);
        assert_eq!(loaded.sensitivity, Sensitivity::Strict);
        assert!(loaded.whitelist.contains("hellion"));
        assert!(loaded.blacklist.contains("frak"));
        assert_eq!(loaded.updated_by.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_filter_type() {
        let store = store().await;

        store
            .upsert_config(FilterConfig::default_for(FilterType::Spam))
            .await
            .unwrap();

        let mut updated = FilterConfig::default_for(FilterType::Spam);
        updated.enabled = false;
        updated.sensitivity = Sensitivity::Permissive;
        store.upsert_config(updated).await.unwrap();

        let loaded = store.get_config(FilterType::Spam).await.unwrap().unwrap();
        assert!(!loaded.enabled);
        assert_eq!(loaded.sensitivity, Sensitivity::Permissive);
    }

    #[tokio::test]
    async fn test_insert_flag_and_report() {
        let store = store().await;

        store
            .insert_flag(AutomatedFlag {
                content_type: "story".to_string(),
                content_id: 9,
                flag_type: ContentFlag::Spam,
                confidence: 0.85,
                reviewed: false,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let reporter_id = store.ensure_system_reporter().await.unwrap();
        let report_id = store
            .insert_report(ModerationReport {
                reporter_id,
                reason: "hate_speech".to_string(),
                details: "Automated filter match: collective_generalization".to_string(),
                story_id: Some(9),
                chapter_id: None,
                priority: ReportPriority::High,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        assert!(report_id > 0);
    }

    #[tokio::test]
    async fn test_ensure_system_reporter_is_idempotent() {
        let store = store().await;
        let first = store.ensure_system_reporter().await.unwrap();
        let second = store.ensure_system_reporter().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_config_persists_across_pools() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let url = format!("sqlite://{}?mode=rwc", tmp.path().display());

        {
            let pool = SqlitePoolOptions::new().connect(&url).await.unwrap();
            let store = SqliteModerationStore::new(pool);
            store.migrate().await.unwrap();
            store
                .upsert_config(FilterConfig::default_for(FilterType::HateSpeech))
                .await
                .unwrap();
        }

        let pool = SqlitePoolOptions::new().connect(&url).await.unwrap();
        let store = SqliteModerationStore::new(pool);
        store.migrate().await.unwrap();
        let loaded = store
            .get_config(FilterType::HateSpeech)
            .await
            .unwrap()
            .unwrap();
        assert!(loaded.enabled);
    }
}
