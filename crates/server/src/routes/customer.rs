//! Customer (klant) handlers

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use oml_core::{CustomerFilter, CustomerInput, CustomerPatch, PageRequest, Paginated};
use serde_json::json;

use super::{ApiJson, ApiPath, parse_param};
use crate::error::AppError;
use crate::middleware::AuditTrail;
use crate::state::AppState;

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Customer {} not found", id))
}

/// `search` (also `zoekterm` / `searchTerm`), `page`, `pageSize`
fn list_filter(params: &HashMap<String, String>) -> CustomerFilter {
    let search = ["search", "zoekterm", "searchTerm"]
        .iter()
        .find_map(|key| params.get(*key))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    CustomerFilter {
        search,
        page: PageRequest::new(
            parse_param(params.get("page").map(String::as_str)),
            parse_param(params.get("pageSize").map(String::as_str)),
        ),
    }
}

/// GET /api/klanten - List customers
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let filter = list_filter(&params);
    let (customers, total) = state.customers.list(&filter).await?;
    Ok(Json(Paginated::new(customers, filter.page, total)))
}

/// GET /api/klanten/{id} - Read a customer
pub async fn read(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let customer = state.customers.find(id).await?.ok_or_else(|| not_found(id))?;
    Ok(Json(customer))
}

/// POST /api/klanten - Create a customer
pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CustomerInput>,
) -> Result<impl IntoResponse, AppError> {
    input.validate()?;
    let customer = state.customers.create(&input).await?;
    tracing::debug!(customer_id = customer.id, "Customer created");
    Ok((StatusCode::CREATED, Json(customer)))
}

/// PUT /api/klanten/{id} - Replace a customer
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<CustomerInput>,
) -> Result<impl IntoResponse, AppError> {
    input.validate()?;
    let customer = state
        .customers
        .update(id, &CustomerPatch::from(input))
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(customer))
}

/// PATCH /api/klanten/{id} - Update some fields of a customer
pub async fn patch(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<CustomerPatch>,
) -> Result<impl IntoResponse, AppError> {
    patch.validate()?;
    if patch.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }
    let customer = state
        .customers
        .update(id, &patch)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(customer))
}

/// DELETE /api/klanten/{id} - Delete a customer
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    trail: AuditTrail,
) -> Result<impl IntoResponse, AppError> {
    let customer = state.customers.find(id).await?.ok_or_else(|| not_found(id))?;
    trail.publish(customer.snapshot());

    if !state.customers.delete(id).await? {
        return Err(not_found(id));
    }
    Ok(Json(json!({ "message": "Customer deleted successfully" })))
}
