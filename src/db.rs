use crate::i18n::{Locale, LocaleRegistry};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Legacy marker some old rows carry in a locale column instead of NULL.
/// Treated as "missing" everywhere; new writes never produce it.
pub const LEGACY_NEEDS_TRANSLATION: &str = "[needs translation]";

/// One translation row: a dot-path key with one value per locale.
#[derive(Debug, Clone)]
pub struct TranslationRecord {
    pub key: String,
    pub values: HashMap<String, Option<String>>,
    pub auto_translated: bool,
    pub needs_review: bool,
    pub source_updated_at: String,
    pub translated_at: Option<String>,
    pub updated_at: String,
}

impl TranslationRecord {
    /// Value for a locale, with empty strings and the legacy marker
    /// normalized to None.
    pub fn value(&self, locale: Locale) -> Option<&str> {
        self.values
            .get(locale.code())
            .and_then(|v| v.as_deref())
            .filter(|v| !v.trim().is_empty() && *v != LEGACY_NEEDS_TRANSLATION)
    }

    /// Whether any enabled target locale still lacks a value, or the source
    /// text changed after the last pipeline write.
    pub fn is_incomplete(&self) -> bool {
        let missing_target = Locale::targets().iter().any(|l| self.value(*l).is_none());
        let stale = match &self.translated_at {
            Some(t) => self.source_updated_at.as_str() > t.as_str(),
            None => true,
        };
        missing_target || stale
    }
}

/// Admin-authored override for one field of one section.
#[derive(Debug, Clone)]
pub struct ContentRecord {
    pub section: String,
    pub tag: String,
    pub value: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => anyhow::bail!("Unknown job status: {}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobRecord {
    pub key: String,
    pub source_text: String,
    pub source_locale: String,
    pub target_locales: Vec<String>,
    pub status: JobStatus,
    pub attempt_count: u32,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct JobStats {
    pub pending: u32,
    pub processing: u32,
    pub completed: u32,
    pub failed: u32,
    pub avg_completion_secs: Option<f64>,
}

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open the database and create tables as needed.
    pub fn new(database_path: &str) -> Result<Self> {
        let conn = Connection::open(database_path)
            .context(format!("Failed to open database at {}", database_path))?;

        let locale_columns: Vec<String> = LocaleRegistry::get()
            .list_enabled()
            .iter()
            .map(|l| format!("{} TEXT", l.code))
            .collect();

        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS translations (
                    key TEXT PRIMARY KEY,
                    {},
                    auto_translated INTEGER NOT NULL DEFAULT 0,
                    needs_review INTEGER NOT NULL DEFAULT 0,
                    source_updated_at TEXT NOT NULL,
                    translated_at TEXT,
                    updated_at TEXT NOT NULL
                )",
                locale_columns.join(",\n                    ")
            ),
            [],
        )
        .context("Failed to create translations table")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS content (
                section TEXT NOT NULL,
                tag TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(section, tag)
            )",
            [],
        )
        .context("Failed to create content table")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS translation_jobs (
                key TEXT PRIMARY KEY,
                source_text TEXT NOT NULL,
                source_locale TEXT NOT NULL,
                target_locales TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                attempt_count INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                completed_at TEXT
            )",
            [],
        )
        .context("Failed to create translation_jobs table")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ==================== TranslationStore ====================

    /// Upsert per-locale values for one key as a single atomic row write.
    ///
    /// Merge rule: an empty incoming value is skipped, and a non-empty stored
    /// value is only replaced when `force` is set. Writing a changed
    /// source-locale value bumps `source_updated_at`; pipeline writes
    /// (`auto_translated`) bump `translated_at` and flag the row for review.
    pub fn upsert_translation(
        &self,
        key: &str,
        values: &[(Locale, String)],
        auto_translated: bool,
        force: bool,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let existing = Self::read_translation(&conn, key)?;

        let locales = LocaleRegistry::get().list_enabled();
        let source_code = LocaleRegistry::get().source().code;

        let mut merged: HashMap<&str, Option<String>> = locales
            .iter()
            .map(|l| {
                let current = existing
                    .as_ref()
                    .and_then(|r| r.values.get(l.code).cloned())
                    .flatten()
                    .filter(|v| !v.trim().is_empty() && v != LEGACY_NEEDS_TRANSLATION);
                (l.code, current)
            })
            .collect();

        // Target locales that already held a value before this write; needed
        // below to decide whether a manual edit cleared all machine output.
        let prior_targets: HashSet<&str> = merged
            .iter()
            .filter_map(|(code, value)| {
                if *code != source_code && value.is_some() {
                    Some(*code)
                } else {
                    None
                }
            })
            .collect();

        let mut source_changed = false;
        let mut written_targets: HashSet<&str> = HashSet::new();
        for (locale, value) in values {
            if value.trim().is_empty() {
                continue;
            }
            let slot = merged
                .get_mut(locale.code())
                .context("Locale not present in registry")?;
            if force || slot.is_none() {
                if locale.code() == source_code && slot.as_deref() != Some(value.as_str()) {
                    source_changed = true;
                }
                *slot = Some(value.clone());
                if locale.code() != source_code {
                    written_targets.insert(locale.code());
                }
            }
        }

        let source_updated_at = if source_changed || existing.is_none() {
            now.clone()
        } else {
            existing.as_ref().unwrap().source_updated_at.clone()
        };
        let translated_at = if auto_translated {
            Some(now.clone())
        } else {
            existing.as_ref().and_then(|r| r.translated_at.clone())
        };

        // Machine output awaits review until a manual write has replaced
        // every target value it could have produced.
        let needs_review = if auto_translated {
            true
        } else {
            let prior_review = existing.as_ref().map(|r| r.needs_review).unwrap_or(false);
            prior_review && !prior_targets.is_subset(&written_targets)
        };

        let column_list: Vec<&str> = locales.iter().map(|l| l.code).collect();
        let placeholders: Vec<String> = (2..=column_list.len() + 1).map(|i| format!("?{}", i)).collect();
        let n = column_list.len();

        let sql = format!(
            "INSERT OR REPLACE INTO translations
             (key, {}, auto_translated, needs_review, source_updated_at, translated_at, updated_at)
             VALUES (?1, {}, ?{}, ?{}, ?{}, ?{}, ?{})",
            column_list.join(", "),
            placeholders.join(", "),
            n + 2,
            n + 3,
            n + 4,
            n + 5,
            n + 6,
        );

        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(key.to_string())];
        for code in &column_list {
            params_vec.push(Box::new(merged.get(code).cloned().flatten()));
        }
        params_vec.push(Box::new(auto_translated as i64));
        params_vec.push(Box::new(needs_review as i64));
        params_vec.push(Box::new(source_updated_at));
        params_vec.push(Box::new(translated_at));
        params_vec.push(Box::new(now));

        conn.execute(&sql, rusqlite::params_from_iter(params_vec.iter().map(|p| p.as_ref())))
            .context("Failed to upsert translation")?;

        Ok(())
    }

    pub fn get_translation(&self, key: &str) -> Result<Option<TranslationRecord>> {
        let conn = self.conn.lock().unwrap();
        Self::read_translation(&conn, key)
    }

    fn read_translation(conn: &Connection, key: &str) -> Result<Option<TranslationRecord>> {
        let locales = LocaleRegistry::get().list_enabled();
        let column_list: Vec<&str> = locales.iter().map(|l| l.code).collect();
        let sql = format!(
            "SELECT key, {}, auto_translated, needs_review, source_updated_at, translated_at, updated_at
             FROM translations WHERE key = ?1",
            column_list.join(", ")
        );

        let mut stmt = conn.prepare(&sql)?;
        let record = stmt
            .query_row(params![key], |row| {
                let mut values = HashMap::new();
                for (i, code) in column_list.iter().enumerate() {
                    values.insert(code.to_string(), row.get::<_, Option<String>>(1 + i)?);
                }
                let n = column_list.len();
                Ok(TranslationRecord {
                    key: row.get(0)?,
                    values,
                    auto_translated: row.get::<_, i64>(n + 1)? != 0,
                    needs_review: row.get::<_, i64>(n + 2)? != 0,
                    source_updated_at: row.get(n + 3)?,
                    translated_at: row.get(n + 4)?,
                    updated_at: row.get(n + 5)?,
                })
            })
            .optional()?;

        Ok(record)
    }

    /// All translation rows, for the pipeline scan and section resolution.
    pub fn list_translations(&self) -> Result<Vec<TranslationRecord>> {
        let conn = self.conn.lock().unwrap();
        let keys: Vec<String> = {
            let mut stmt = conn.prepare("SELECT key FROM translations ORDER BY key")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(record) = Self::read_translation(&conn, &key)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Translation keys under `section.` with their records.
    pub fn translations_for_section(&self, section: &str) -> Result<Vec<TranslationRecord>> {
        let prefix = format!("{}.", section);
        Ok(self
            .list_translations()?
            .into_iter()
            .filter(|r| r.key.starts_with(&prefix))
            .collect())
    }

    // ==================== ContentStore ====================

    pub fn upsert_content(&self, section: &str, tag: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO content (section, tag, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(section, tag) DO UPDATE SET value = ?3, updated_at = ?4",
            params![section, tag, value, now],
        )
        .context("Failed to upsert content record")?;
        Ok(())
    }

    pub fn get_content(&self, section: &str, tag: &str) -> Result<Option<ContentRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT section, tag, value, updated_at FROM content WHERE section = ?1 AND tag = ?2",
        )?;
        let record = stmt
            .query_row(params![section, tag], |row| {
                Ok(ContentRecord {
                    section: row.get(0)?,
                    tag: row.get(1)?,
                    value: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            })
            .optional()?;
        Ok(record)
    }

    pub fn list_content_for_section(&self, section: &str) -> Result<Vec<ContentRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT section, tag, value, updated_at FROM content WHERE section = ?1 ORDER BY tag",
        )?;
        let records = stmt
            .query_map(params![section], |row| {
                Ok(ContentRecord {
                    section: row.get(0)?,
                    tag: row.get(1)?,
                    value: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    // ==================== JobQueue ====================

    /// Idempotently upsert a job for `key`. Returns true when a job was
    /// created or reset to pending, false when an equivalent job already
    /// covers this source text.
    pub fn upsert_job(
        &self,
        key: &str,
        source_text: &str,
        source_locale: Locale,
        target_locales: &[Locale],
    ) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let targets = target_locales
            .iter()
            .map(|l| l.code())
            .collect::<Vec<_>>()
            .join(",");

        let existing: Option<(String, String)> = conn
            .prepare("SELECT status, source_text FROM translation_jobs WHERE key = ?1")?
            .query_row(params![key], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        match existing {
            None => {
                conn.execute(
                    "INSERT INTO translation_jobs
                     (key, source_text, source_locale, target_locales, status, attempt_count, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, 'pending', 0, ?5, ?5)",
                    params![key, source_text, source_locale.code(), targets, now],
                )
                .context("Failed to insert translation job")?;
                Ok(true)
            }
            Some((status, _)) if status == "processing" => Ok(false),
            Some((status, text)) if status == "pending" && text == source_text => Ok(false),
            Some((status, text)) if status == "pending" && text != source_text => {
                // Source changed while queued: refresh the job in place.
                conn.execute(
                    "UPDATE translation_jobs
                     SET source_text = ?2, target_locales = ?3, attempt_count = 0,
                         last_error = NULL, updated_at = ?4
                     WHERE key = ?1",
                    params![key, source_text, targets, now],
                )?;
                Ok(true)
            }
            Some(_) => {
                // Completed or failed job for a row that is incomplete again:
                // this is a new unit of work under the same key.
                conn.execute(
                    "UPDATE translation_jobs
                     SET source_text = ?2, target_locales = ?3, status = 'pending',
                         attempt_count = 0, last_error = NULL, completed_at = NULL,
                         created_at = ?4, updated_at = ?4
                     WHERE key = ?1",
                    params![key, source_text, targets, now],
                )?;
                Ok(true)
            }
        }
    }

    pub fn list_pending_jobs(&self, limit: u32) -> Result<Vec<JobRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT key, source_text, source_locale, target_locales, status,
                    attempt_count, last_error, created_at, updated_at, completed_at
             FROM translation_jobs WHERE status = 'pending'
             ORDER BY created_at ASC LIMIT ?1",
        )?;
        let jobs = stmt
            .query_map(params![limit], Self::map_job_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    pub fn get_job(&self, key: &str) -> Result<Option<JobRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT key, source_text, source_locale, target_locales, status,
                    attempt_count, last_error, created_at, updated_at, completed_at
             FROM translation_jobs WHERE key = ?1",
        )?;
        let job = stmt.query_row(params![key], Self::map_job_row).optional()?;
        Ok(job)
    }

    fn map_job_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<JobRecord> {
        let status_str: String = row.get(4)?;
        Ok(JobRecord {
            key: row.get(0)?,
            source_text: row.get(1)?,
            source_locale: row.get(2)?,
            target_locales: row
                .get::<_, String>(3)?
                .split(',')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            status: JobStatus::from_str(&status_str).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    e.into(),
                )
            })?,
            attempt_count: row.get::<_, i64>(5)? as u32,
            last_error: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
            completed_at: row.get(9)?,
        })
    }

    /// Atomically claim a pending job (`pending -> processing`).
    ///
    /// The conditional update is the one transactional guarantee the pipeline
    /// relies on: two concurrent runs cannot both claim the same job.
    pub fn claim_job(&self, key: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let rows = conn
            .execute(
                "UPDATE translation_jobs SET status = 'processing', updated_at = ?2
                 WHERE key = ?1 AND status = 'pending'",
                params![key, now],
            )
            .context("Failed to claim translation job")?;
        Ok(rows > 0)
    }

    pub fn complete_job(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE translation_jobs
             SET status = 'completed', last_error = NULL, completed_at = ?2, updated_at = ?2
             WHERE key = ?1 AND status = 'processing'",
            params![key, now],
        )
        .context("Failed to complete translation job")?;
        Ok(())
    }

    /// Record a failed attempt. Past the ceiling the job goes to `failed`,
    /// otherwise back to `pending` for a later batch.
    pub fn record_job_failure(&self, key: &str, error: &str, max_attempts: u32) -> Result<JobStatus> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let attempts: i64 = conn
            .prepare("SELECT attempt_count FROM translation_jobs WHERE key = ?1")?
            .query_row(params![key], |row| row.get(0))
            .optional()?
            .unwrap_or(0);

        let new_attempts = attempts + 1;
        let status = if new_attempts >= max_attempts as i64 {
            JobStatus::Failed
        } else {
            JobStatus::Pending
        };

        conn.execute(
            "UPDATE translation_jobs
             SET status = ?2, attempt_count = ?3, last_error = ?4, updated_at = ?5
             WHERE key = ?1",
            params![key, status.as_str(), new_attempts, error, now],
        )
        .context("Failed to record job failure")?;

        Ok(status)
    }

    /// Reset failed jobs with attempts below the ceiling back to pending.
    pub fn reset_failed_jobs(&self, max_attempts: u32) -> Result<u32> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let rows = conn
            .execute(
                "UPDATE translation_jobs
                 SET status = 'pending', updated_at = ?2
                 WHERE status = 'failed' AND attempt_count < ?1",
                params![max_attempts, now],
            )
            .context("Failed to reset failed jobs")?;
        Ok(rows as u32)
    }

    pub fn job_stats(&self) -> Result<JobStats> {
        let conn = self.conn.lock().unwrap();
        let mut stats = JobStats::default();

        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM translation_jobs GROUP BY status")?;
        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u32))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for (status, count) in counts {
            match status.as_str() {
                "pending" => stats.pending = count,
                "processing" => stats.processing = count,
                "completed" => stats.completed = count,
                "failed" => stats.failed = count,
                _ => {}
            }
        }

        let mut stmt = conn.prepare(
            "SELECT created_at, completed_at FROM translation_jobs
             WHERE status = 'completed' AND completed_at IS NOT NULL",
        )?;
        let spans = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let durations: Vec<f64> = spans
            .iter()
            .filter_map(|(created, completed)| {
                let c = chrono::DateTime::parse_from_rfc3339(created).ok()?;
                let d = chrono::DateTime::parse_from_rfc3339(completed).ok()?;
                Some((d - c).num_milliseconds() as f64 / 1000.0)
            })
            .collect();
        if !durations.is_empty() {
            stats.avg_completion_secs =
                Some(durations.iter().sum::<f64>() / durations.len() as f64);
        }

        Ok(stats)
    }
}
