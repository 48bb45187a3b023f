//! Background translation pipeline: scan, enqueue, process.
//!
//! The pipeline walks the translation store for rows with missing or stale
//! locale values, turns each into a queued job (one active job per key), and
//! works jobs in bounded batches. Jobs move `pending -> processing ->
//! completed | failed`; a failed attempt below the ceiling puts the job back
//! in `pending` for a later batch. Claiming is atomic, so concurrent batch
//! runs never double-process a key.

use crate::config::Config;
use crate::db::{Database, JobRecord, JobStats, TranslationRecord};
use crate::engine::TranslationEngine;
use crate::i18n::{needs_translation, Locale};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What one batch run did.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct BatchReport {
    pub claimed: u32,
    pub completed: u32,
    pub failed: u32,
}

/// Result of a full scan-and-process pass.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct BulkReport {
    pub enqueued: u32,
    #[serde(flatten)]
    pub batch: BatchReport,
}

pub struct Pipeline {
    db: Database,
    engine: Arc<TranslationEngine>,
    batch_size: u32,
    max_attempts: u32,
    job_timeout: Duration,
}

impl Pipeline {
    pub fn new(db: Database, engine: Arc<TranslationEngine>, config: &Config) -> Self {
        Self {
            db,
            engine,
            batch_size: config.batch_size,
            max_attempts: config.max_job_attempts,
            job_timeout: Duration::from_secs(config.job_timeout_secs),
        }
    }

    /// Scan the translation store and enqueue a job for every row that still
    /// needs pipeline work. Returns how many jobs were created or refreshed.
    ///
    /// Rows are skipped when they have no source text to translate from, or
    /// when the source text has nothing translatable in it.
    pub fn enqueue_missing(&self) -> Result<u32> {
        let records = self.db.list_translations()?;
        let mut enqueued = 0;

        for record in records {
            if !record.is_incomplete() {
                continue;
            }

            let source_text = match record.value(Locale::source()) {
                Some(text) => text.to_string(),
                None => {
                    debug!("Skipping {}: no source text", record.key);
                    continue;
                }
            };

            if !needs_translation(&source_text) {
                debug!("Skipping {}: nothing translatable", record.key);
                continue;
            }

            let targets = job_targets(&record);
            if targets.is_empty() {
                continue;
            }

            if self
                .db
                .upsert_job(&record.key, &source_text, Locale::source(), &targets)?
            {
                enqueued += 1;
            }
        }

        if enqueued > 0 {
            info!("Enqueued {} translation jobs", enqueued);
        }
        Ok(enqueued)
    }

    /// Work one batch of pending jobs, oldest first.
    pub async fn process_pending(&self) -> Result<BatchReport> {
        let jobs = self.db.list_pending_jobs(self.batch_size)?;
        let mut report = BatchReport::default();

        for job in jobs {
            if !self.db.claim_job(&job.key)? {
                // Another run got there first.
                continue;
            }
            report.claimed += 1;

            match self.process_claimed_job(&job).await {
                Ok(true) => report.completed += 1,
                Ok(false) => report.failed += 1,
                Err(e) => {
                    // Job-level errors never abort the batch.
                    warn!("Job {} errored: {:#}", job.key, e);
                    self.db
                        .record_job_failure(&job.key, &e.to_string(), self.max_attempts)?;
                    report.failed += 1;
                }
            }
        }

        if report.claimed > 0 {
            info!(
                "Processed batch: {} claimed, {} completed, {} failed",
                report.claimed, report.completed, report.failed
            );
        }
        Ok(report)
    }

    /// Run one claimed job to completion. Returns true when every target
    /// locale got a translation.
    async fn process_claimed_job(&self, job: &JobRecord) -> Result<bool> {
        if !self.engine.is_available() {
            self.db.record_job_failure(
                &job.key,
                "no translation provider configured",
                self.max_attempts,
            )?;
            return Ok(false);
        }

        let targets: Vec<Locale> = job
            .target_locales
            .iter()
            .filter_map(|code| match Locale::from_code(code) {
                Ok(locale) => Some(locale),
                Err(_) => {
                    warn!("Job {} carries unknown target locale {}", job.key, code);
                    None
                }
            })
            .collect();

        let outcome = tokio::time::timeout(
            self.job_timeout,
            self.engine.translate(&job.source_text, &targets, None),
        )
        .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(_) => {
                self.db.record_job_failure(
                    &job.key,
                    &format!("translation timed out after {:?}", self.job_timeout),
                    self.max_attempts,
                )?;
                return Ok(false);
            }
        };

        // Persist whatever succeeded before deciding the job's fate, so a
        // partial batch still narrows the remaining work.
        if !outcome.per_locale.is_empty() {
            let values: Vec<(Locale, String)> = outcome
                .per_locale
                .iter()
                .filter_map(|(code, text)| {
                    Locale::from_code(code).ok().map(|l| (l, text.clone()))
                })
                .collect();
            self.db
                .upsert_translation(&job.key, &values, true, true)
                .context("Failed to persist translations")?;
        }

        if outcome.is_complete(&targets) {
            self.db.complete_job(&job.key)?;
            Ok(true)
        } else {
            let summary = outcome
                .errors
                .iter()
                .map(|e| format!("{}/{}: {}", e.locale, e.provider, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            self.db
                .record_job_failure(&job.key, &summary, self.max_attempts)?;
            Ok(false)
        }
    }

    /// Scan for work, then process one batch of it.
    pub async fn run_bulk(&self) -> Result<BulkReport> {
        let enqueued = self.enqueue_missing()?;
        let batch = self.process_pending().await?;
        Ok(BulkReport { enqueued, batch })
    }

    /// Translate one key synchronously, bypassing the queue.
    ///
    /// The source text is stored first (manual writes replace the old source),
    /// then each requested target locale is translated and persisted. When no
    /// provider
    /// is configured the outcome echoes the source text for the caller but
    /// nothing is written to the target columns.
    pub async fn translate_now(
        &self,
        key: &str,
        source_text: &str,
        targets: &[Locale],
        context: Option<&str>,
    ) -> Result<crate::engine::TranslationOutcome> {
        self.db.upsert_translation(
            key,
            &[(Locale::source(), source_text.to_string())],
            false,
            true,
        )?;

        let outcome = self.engine.translate(source_text, targets, context).await;

        let translatable = needs_translation(source_text);
        if !translatable || self.engine.is_available() {
            if !outcome.per_locale.is_empty() {
                let values: Vec<(Locale, String)> = outcome
                    .per_locale
                    .iter()
                    .filter_map(|(code, text)| {
                        Locale::from_code(code).ok().map(|l| (l, text.clone()))
                    })
                    .collect();
                self.db.upsert_translation(key, &values, true, true)?;
            }
        }

        Ok(outcome)
    }

    /// Move eligible failed jobs back to pending. Only jobs with attempts
    /// still below the ceiling qualify; exhausted jobs stay failed.
    pub fn retry_failed(&self) -> Result<u32> {
        let retried = self.db.reset_failed_jobs(self.max_attempts)?;
        if retried > 0 {
            info!("Reset {} failed jobs to pending", retried);
        }
        Ok(retried)
    }

    pub fn stats(&self) -> Result<JobStats> {
        self.db.job_stats()
    }
}

/// Which locales a job for this row should cover: only the missing ones when
/// the row is merely incomplete, every target when the source text changed
/// (stale translations must be replaced, not kept).
fn job_targets(record: &TranslationRecord) -> Vec<Locale> {
    let stale = match &record.translated_at {
        Some(t) => record.source_updated_at.as_str() > t.as_str(),
        None => true,
    };
    if stale {
        Locale::targets()
    } else {
        Locale::targets()
            .into_iter()
            .filter(|l| record.value(*l).is_none())
            .collect()
    }
}
