//! Audit log read-back

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use oml_core::{AuditLogFilter, PageRequest, Paginated};

use super::parse_param;
use crate::error::AppError;
use crate::state::AppState;

fn parse_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?.trim();
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Build the filter from query parameters; values that do not parse are ignored
fn log_filter(params: &HashMap<String, String>) -> AuditLogFilter {
    let get = |key: &str| params.get(key).map(String::as_str);

    AuditLogFilter {
        user_id: parse_param(get("userId")),
        action_type: parse_param(get("actionType")),
        entity_type: parse_param(get("entityType")),
        start_date: parse_date(get("startDate")),
        end_date: parse_date(get("endDate")),
        page: PageRequest::new(parse_param(get("page")), parse_param(get("pageSize"))),
    }
}

/// GET /api/logs - Filtered audit records, newest first
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let filter = log_filter(&params);
    let (logs, total) = state.audit_logs.list(&filter).await?;
    Ok(Json(Paginated::new(logs, filter.page, total)))
}
