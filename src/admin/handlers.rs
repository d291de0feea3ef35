//! Rule management handlers.
//!
//! # Responsibilities
//! - Parse and normalize rules from request bodies
//! - Apply mutations to the rule store
//! - Complete every mutation (cache refresh, port reconcile) before replying
//! - Export and import the settings document

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::admin::error::AdminError;
use crate::http::server::AppState;
use crate::routing::{ProxyRule, Settings};

/// Download name offered by the export endpoint.
pub const EXPORT_FILENAME: &str = "server-settings.json";

fn parse<T: DeserializeOwned>(body: &Bytes) -> Result<T, AdminError> {
    Ok(serde_json::from_slice(body)?)
}

fn log_rule(action: &'static str, rule: &ProxyRule) {
    match (rule.port, rule.path_prefix.as_deref()) {
        (Some(port), _) => tracing::info!(
            action,
            rule_id = %rule.id,
            port,
            target = %rule.target_url,
            "Port-based proxy rule"
        ),
        (None, prefix) => tracing::info!(
            action,
            rule_id = %rule.id,
            prefix = prefix.unwrap_or_default(),
            target = %rule.target_url,
            "Path-based proxy rule"
        ),
    }
}

pub async fn list_proxies(State(state): State<AppState>) -> Json<Vec<ProxyRule>> {
    Json(state.rules.list())
}

pub async fn add_proxy(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AdminError> {
    let rule = parse::<ProxyRule>(&body)?.normalize()?;

    state.rules.add(rule.clone());
    state.rules_changed().await;
    log_rule("added", &rule);

    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn update_proxy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ProxyRule>, AdminError> {
    let mut rule = parse::<ProxyRule>(&body)?;
    rule.id = id.clone();
    let rule = rule.normalize()?;

    if !state.rules.update(&id, rule.clone()) {
        return Err(AdminError::NotFound);
    }
    state.rules_changed().await;
    log_rule("updated", &rule);

    Ok(Json(rule))
}

pub async fn delete_proxy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AdminError> {
    if !state.rules.delete(&id) {
        return Err(AdminError::NotFound);
    }
    state.rules_changed().await;
    tracing::info!(rule_id = %id, "Deleted proxy rule");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    Json(Settings::clone(&state.rules.snapshot()))
}

pub async fn export_settings(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AdminError> {
    let body = serde_json::to_vec_pretty(&*state.rules.snapshot()).map_err(AdminError::Export)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={EXPORT_FILENAME}"),
            ),
        ],
        body,
    ))
}

/// Replace the rule list with the document's rules.
///
/// All rules are normalized first; one bad rule rejects the whole import.
pub async fn import_settings(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AdminError> {
    let mut settings: Settings = parse(&body)?;
    settings.proxy_rules = settings
        .proxy_rules
        .into_iter()
        .enumerate()
        .map(|(index, rule)| {
            rule.normalize()
                .map_err(|source| AdminError::InvalidImport { index, source })
        })
        .collect::<Result<_, _>>()?;

    let count = settings.proxy_rules.len();
    state.rules.import(settings);
    state.rules_changed().await;
    tracing::info!(rules = count, "Settings imported successfully");

    Ok(Json(json!({ "message": "Settings imported successfully" })))
}
