//! HTTP API: content resolution and translation pipeline control.

use crate::db::Database;
use crate::engine::TranslationEngine;
use crate::pipeline::{BatchReport, BulkReport, Pipeline};
use crate::resolver::Resolver;
use crate::i18n::Locale;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application errors surfaced over HTTP.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("not found")]
    NotFound,

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Internals are logged, never leaked to the client.
        let body = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal server error");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub resolver: Arc<Resolver>,
    pub engine: Arc<TranslationEngine>,
    pub pipeline: Arc<Pipeline>,
}

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/content/:section", get(get_section))
        .route("/api/content", post(upsert_content))
        .route("/api/resolve", get(resolve_key))
        .route("/api/translate", post(translate_key))
        .route("/api/translate/batch", post(translate_batch))
        .route("/api/translate/bulk", post(translate_bulk))
        .route("/api/translate/status", get(translation_status))
        .route("/api/translate/stats", get(translation_stats))
        .route("/api/translate/retry-failed", post(retry_failed))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn parse_locale(code: Option<&str>) -> AppResult<Locale> {
    match code {
        None => Ok(Locale::source()),
        Some(code) => {
            Locale::from_code(code).map_err(|_| AppError::BadRequest(format!("unknown locale: {}", code)))
        }
    }
}

// ==================== Health ====================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    translation_available: bool,
    providers: Vec<&'static str>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        translation_available: state.engine.is_available(),
        providers: state.engine.provider_names(),
    })
}

// ==================== Content ====================

#[derive(Deserialize)]
struct LocaleQuery {
    locale: Option<String>,
}

/// One locale when `?locale=` is given, otherwise every supported locale
/// keyed by its code.
async fn get_section(
    State(state): State<AppState>,
    Path(section): Path<String>,
    Query(query): Query<LocaleQuery>,
) -> AppResult<Json<serde_json::Value>> {
    match query.locale.as_deref() {
        Some(code) => {
            let locale = parse_locale(Some(code))?;
            let resolved = state.resolver.resolve_section(locale, &section)?;
            Ok(Json(resolved))
        }
        None => {
            let mut per_locale = serde_json::Map::new();
            for locale in Locale::all() {
                let resolved = state.resolver.resolve_section(locale, &section)?;
                per_locale.insert(locale.code().to_string(), resolved);
            }
            Ok(Json(serde_json::Value::Object(per_locale)))
        }
    }
}

#[derive(Deserialize)]
struct ResolveQuery {
    locale: Option<String>,
    key: String,
    #[serde(default)]
    fallback: String,
}

#[derive(Serialize)]
struct ResolveResponse {
    key: String,
    locale: String,
    value: String,
}

async fn resolve_key(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> AppResult<Json<ResolveResponse>> {
    let locale = parse_locale(query.locale.as_deref())?;
    let value = state.resolver.resolve(locale, &query.key, &query.fallback)?;
    Ok(Json(ResolveResponse {
        key: query.key,
        locale: locale.code().to_string(),
        value,
    }))
}

/// Two accepted write shapes: per-field locale maps (the canonical admin
/// write, landing in both stores), or a single raw tag value for structured
/// payloads and hidden flags.
#[derive(Deserialize)]
#[serde(untagged)]
enum UpsertContentRequest {
    Fields {
        section: String,
        fields: HashMap<String, BTreeMap<String, String>>,
    },
    Raw {
        section: String,
        tag: String,
        value: String,
    },
}

async fn upsert_content(
    State(state): State<AppState>,
    Json(request): Json<UpsertContentRequest>,
) -> AppResult<StatusCode> {
    match request {
        UpsertContentRequest::Fields { section, fields } => {
            if section.trim().is_empty() {
                return Err(AppError::BadRequest("section is required".to_string()));
            }
            if fields.is_empty() {
                return Err(AppError::BadRequest("fields must not be empty".to_string()));
            }

            for (field, locale_values) in &fields {
                if field.trim().is_empty() {
                    return Err(AppError::BadRequest("field names must not be empty".to_string()));
                }

                let mut values = Vec::new();
                for (code, text) in locale_values {
                    let locale = parse_locale(Some(code))?;
                    if !text.trim().is_empty() {
                        values.push((locale, text.clone()));
                    }
                }

                // Manual writes win over machine output, so replace.
                let key = format!("{}.{}", section, field);
                state.db.upsert_translation(&key, &values, false, true)?;

                let raw = serde_json::to_string(locale_values)
                    .map_err(|e| AppError::Internal(e.into()))?;
                state.db.upsert_content(&section, field, &raw)?;
            }

            info!(section = %section, fields = fields.len(), "Content fields updated");
            Ok(StatusCode::NO_CONTENT)
        }
        UpsertContentRequest::Raw { section, tag, value } => {
            if section.trim().is_empty() || tag.trim().is_empty() {
                return Err(AppError::BadRequest("section and tag are required".to_string()));
            }
            state.db.upsert_content(&section, &tag, &value)?;
            info!(section = %section, tag = %tag, "Content updated");
            Ok(StatusCode::NO_CONTENT)
        }
    }
}

// ==================== Translation ====================

/// Largest number of entries one synchronous batch call will take.
const MAX_BATCH_ITEMS: usize = 50;

#[derive(Deserialize)]
struct TranslateRequest {
    key: String,
    text: String,
    source_locale: Option<String>,
    target_locales: Option<Vec<String>>,
    context: Option<String>,
}

/// Resolve the requested target set, defaulting to every non-source locale.
fn parse_targets(codes: Option<&[String]>) -> AppResult<Vec<Locale>> {
    match codes {
        None => Ok(Locale::targets()),
        Some(codes) => {
            if codes.is_empty() {
                return Err(AppError::BadRequest("target_locales must not be empty".to_string()));
            }
            let mut targets = Vec::with_capacity(codes.len());
            for code in codes {
                let locale = parse_locale(Some(code))?;
                if locale.is_source() {
                    return Err(AppError::BadRequest(format!(
                        "{} is the source locale, not a translation target",
                        code
                    )));
                }
                if !targets.contains(&locale) {
                    targets.push(locale);
                }
            }
            Ok(targets)
        }
    }
}

fn validate_source_locale(code: Option<&str>) -> AppResult<()> {
    if let Some(code) = code {
        let locale = parse_locale(Some(code))?;
        if !locale.is_source() {
            return Err(AppError::BadRequest(format!(
                "translations start from {}, got source_locale {}",
                Locale::source().code(),
                code
            )));
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct TranslateResponse {
    key: String,
    translations: HashMap<String, String>,
    errors: Vec<TranslateErrorBody>,
}

#[derive(Serialize)]
struct TranslateErrorBody {
    locale: String,
    provider: String,
    message: String,
}

/// A translate request that has passed validation and is safe to run.
struct PreparedTranslate {
    key: String,
    text: String,
    targets: Vec<Locale>,
    context: Option<String>,
}

fn validate_translate(request: TranslateRequest) -> AppResult<PreparedTranslate> {
    if request.key.trim().is_empty() {
        return Err(AppError::BadRequest("key is required".to_string()));
    }
    if request.text.trim().is_empty() {
        return Err(AppError::BadRequest("text is required".to_string()));
    }
    validate_source_locale(request.source_locale.as_deref())?;
    let targets = parse_targets(request.target_locales.as_deref())?;
    Ok(PreparedTranslate {
        key: request.key,
        text: request.text,
        targets,
        context: request.context,
    })
}

async fn execute_translate(
    state: &AppState,
    request: PreparedTranslate,
) -> AppResult<TranslateResponse> {
    let outcome = state
        .pipeline
        .translate_now(&request.key, &request.text, &request.targets, request.context.as_deref())
        .await?;
    Ok(TranslateResponse {
        key: request.key,
        translations: outcome.per_locale,
        errors: outcome
            .errors
            .into_iter()
            .map(|e| TranslateErrorBody {
                locale: e.locale,
                provider: e.provider,
                message: e.message,
            })
            .collect(),
    })
}

async fn translate_key(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> AppResult<Json<TranslateResponse>> {
    let prepared = validate_translate(request)?;
    let response = execute_translate(&state, prepared).await?;
    Ok(Json(response))
}

#[derive(Deserialize)]
struct TranslateBatchRequest {
    translations: Vec<TranslateRequest>,
}

#[derive(Serialize)]
struct TranslateBatchResponse {
    results: Vec<TranslateResponse>,
}

/// Synchronous batch: each entry is translated in turn, results reported
/// per key. Larger workloads belong on the bulk/queue path.
async fn translate_batch(
    State(state): State<AppState>,
    Json(request): Json<TranslateBatchRequest>,
) -> AppResult<Json<TranslateBatchResponse>> {
    if request.translations.is_empty() {
        return Err(AppError::BadRequest("translations must not be empty".to_string()));
    }
    if request.translations.len() > MAX_BATCH_ITEMS {
        return Err(AppError::BadRequest(format!(
            "at most {} translations per batch",
            MAX_BATCH_ITEMS
        )));
    }

    // Validate every entry before translating any, so a rejected batch
    // leaves no partial writes behind.
    let mut prepared = Vec::with_capacity(request.translations.len());
    for (index, item) in request.translations.into_iter().enumerate() {
        let item = validate_translate(item).map_err(|e| match e {
            AppError::BadRequest(message) => {
                AppError::BadRequest(format!("entry {}: {}", index, message))
            }
            other => other,
        })?;
        prepared.push(item);
    }

    let mut results = Vec::with_capacity(prepared.len());
    for item in prepared {
        results.push(execute_translate(&state, item).await?);
    }
    Ok(Json(TranslateBatchResponse { results }))
}

async fn translate_bulk(State(state): State<AppState>) -> AppResult<Json<BulkReport>> {
    let report = state.pipeline.run_bulk().await?;
    Ok(Json(report))
}

#[derive(Deserialize)]
struct StatusQuery {
    key: Option<String>,
}

#[derive(Serialize)]
struct JobBody {
    key: String,
    status: String,
    attempt_count: u32,
    last_error: Option<String>,
    target_locales: Vec<String>,
    created_at: String,
    completed_at: Option<String>,
}

#[derive(Serialize)]
struct LocaleBody {
    code: &'static str,
    name: &'static str,
    native_name: &'static str,
    is_source: bool,
}

#[derive(Serialize)]
#[serde(untagged)]
enum StatusResponse {
    Job(JobBody),
    Overview {
        translation_available: bool,
        providers: Vec<&'static str>,
        locales: Vec<LocaleBody>,
        jobs: crate::db::JobStats,
    },
}

async fn translation_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> AppResult<Json<StatusResponse>> {
    match query.key {
        Some(key) => {
            let job = state.db.get_job(&key)?.ok_or(AppError::NotFound)?;
            Ok(Json(StatusResponse::Job(JobBody {
                key: job.key,
                status: job.status.as_str().to_string(),
                attempt_count: job.attempt_count,
                last_error: job.last_error,
                target_locales: job.target_locales,
                created_at: job.created_at,
                completed_at: job.completed_at,
            })))
        }
        None => Ok(Json(StatusResponse::Overview {
            translation_available: state.engine.is_available(),
            providers: state.engine.provider_names(),
            locales: Locale::all()
                .into_iter()
                .map(|l| LocaleBody {
                    code: l.code(),
                    name: l.name(),
                    native_name: l.native_name(),
                    is_source: l.is_source(),
                })
                .collect(),
            jobs: state.pipeline.stats()?,
        })),
    }
}

async fn translation_stats(State(state): State<AppState>) -> AppResult<Json<crate::db::JobStats>> {
    Ok(Json(state.pipeline.stats()?))
}

#[derive(Serialize)]
struct RetryResponse {
    retried: u32,
    #[serde(flatten)]
    batch: BatchReport,
}

async fn retry_failed(State(state): State<AppState>) -> AppResult<Json<RetryResponse>> {
    let retried = state.pipeline.retry_failed()?;
    let batch = if retried > 0 {
        state.pipeline.process_pending().await?
    } else {
        BatchReport::default()
    };
    Ok(Json(RetryResponse { retried, batch }))
}
