//! Audit trail middleware
//!
//! Every mutating request under the protected API produces exactly one audit
//! record: the entity state is snapshotted before the handler runs, the
//! submitted payload is read as the new state, and the record is written once
//! the response body has been sent. Nothing here can change the response the
//! client sees; failures are logged and dropped.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{Method, StatusCode, request::Parts},
    middleware::Next,
    response::Response,
};
use bytes::Bytes;
use chrono::Utc;
use http_body::Body as _;
use oml_core::{
    ActionType, Actor, EntityType, NewAuditLog, RequestTarget, Snapshot, describe,
};
use serde_json::Value;

use super::capture::{CapturedResponse, capture_response, spawn_completion};
use super::request_id::RequestId;
use crate::auth::AuthUser;
use crate::db::{AuditRepository, SnapshotProvider};

/// Audit log read endpoint; never audited itself
pub const AUDIT_LOG_PATH: &str = "/api/logs";

/// Largest request payload read for the audit trail
const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// Recorded when the client went away before the handler finished
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Collaborators of the audit middleware
#[derive(Clone)]
pub struct AuditState {
    pub store: Arc<dyn AuditRepository>,
    pub snapshots: Arc<dyn SnapshotProvider>,
    /// Audit GET requests too
    pub log_reads: bool,
}

/// Request-scoped slot where a handler publishes the entity it is about to
/// delete, so the audit record can describe it after it is gone
#[derive(Debug, Clone, Default)]
pub struct AuditTrail(Arc<Mutex<Option<Snapshot>>>);

impl AuditTrail {
    pub fn publish(&self, snapshot: Snapshot) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(snapshot);
        }
    }

    pub fn take(&self) -> Option<Snapshot> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// Outside the audit middleware the trail is a detached slot nobody reads
impl<S: Send + Sync> FromRequestParts<S> for AuditTrail {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuditTrail>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Whether a request gets an audit record
pub fn should_audit(method: &Method, path: &str, log_reads: bool) -> bool {
    if is_audit_log_path(path) {
        return false;
    }
    match *method {
        Method::GET => log_reads,
        Method::HEAD | Method::OPTIONS => false,
        _ => true,
    }
}

fn is_audit_log_path(path: &str) -> bool {
    path == AUDIT_LOG_PATH
        || path
            .strip_prefix(AUDIT_LOG_PATH)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Middleware that records one audit entry per qualifying request
pub async fn audit_middleware(
    State(audit): State<AuditState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if !should_audit(request.method(), &path, audit.log_reads) {
        return next.run(request).await;
    }

    let target = RequestTarget::classify(request.method().as_str(), &path);
    let actor = request
        .extensions()
        .get::<AuthUser>()
        .map(AuthUser::actor)
        .unwrap_or_else(Actor::system);
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let old_data = match target.action {
        ActionType::Update | ActionType::Delete => {
            fetch_snapshot(audit.snapshots.as_ref(), &target).await
        }
        _ => None,
    };

    let (mut request, new_data) = match target.action {
        ActionType::Create | ActionType::Update => read_payload(request).await,
        _ => (request, None),
    };

    let trail = AuditTrail::default();
    request.extensions_mut().insert(trail.clone());

    let mut guard = EmitOnAbort(Some(PendingAudit {
        store: audit.store.clone(),
        target,
        actor,
        request_id,
        old_data,
        new_data,
        trail,
    }));

    let response = next.run(request).await;

    let Some(pending) = guard.0.take() else {
        return response;
    };
    capture_response(response, move |captured| pending.emit(captured))
}

/// Pre-mutation state of the targeted entity; failures leave it empty
async fn fetch_snapshot(provider: &dyn SnapshotProvider, target: &RequestTarget) -> Option<Snapshot> {
    if target.entity_id.is_empty() {
        return None;
    }
    match provider
        .fetch_for_audit(target.entity, &target.entity_id)
        .await
    {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(
                error = %e,
                entity_type = %target.entity,
                entity_id = %target.entity_id,
                "Failed to load entity snapshot for audit"
            );
            None
        }
    }
}

/// Buffer the request body and parse it as the submitted state.
///
/// Bodies without a known size within the limit are passed through untouched
/// and simply not recorded. When reading fails the handler gets a body that
/// replays the failure, so it answers exactly as it would have unaudited.
async fn read_payload(request: Request<Body>) -> (Request<Body>, Option<Snapshot>) {
    let bounded = request
        .body()
        .size_hint()
        .upper()
        .is_some_and(|len| len <= MAX_PAYLOAD_BYTES as u64);
    if !bounded {
        return (request, None);
    }

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_PAYLOAD_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body for audit, new data omitted");
            let replay = futures::stream::once(futures::future::ready(Err::<Bytes, _>(
                std::io::Error::other(e.to_string()),
            )));
            return (Request::from_parts(parts, Body::from_stream(replay)), None);
        }
    };

    let snapshot = if bytes.is_empty() {
        None
    } else {
        match Snapshot::from_json_slice(&bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::debug!(error = %e, "Request body is not a JSON object, new data omitted");
                None
            }
        }
    };

    (Request::from_parts(parts, Body::from(bytes)), snapshot)
}

/// The `id` field of a JSON response body, used to attribute creates
pub fn entity_id_from_response(body: &Bytes) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("id")? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Everything gathered before the handler ran
struct PendingAudit {
    store: Arc<dyn AuditRepository>,
    target: RequestTarget,
    actor: Actor,
    request_id: String,
    old_data: Option<Snapshot>,
    new_data: Option<Snapshot>,
    trail: AuditTrail,
}

impl PendingAudit {
    fn into_record(self, captured: &CapturedResponse) -> NewAuditLog {
        let mut target = self.target;

        let old = match target.action {
            ActionType::Delete => self.trail.take().or(self.old_data),
            _ => self.old_data,
        };
        let new = self.new_data;

        if target.action == ActionType::Create
            && target.entity_id.is_empty()
            && matches!(target.entity, EntityType::User | EntityType::Customer)
            && captured.status.is_success()
        {
            if let Some(id) = entity_id_from_response(&captured.body) {
                target.entity_id = id;
            }
        }

        let description = describe(&target, old.as_ref(), new.as_ref());

        NewAuditLog {
            user_id: self.actor.user_id,
            username: self.actor.username,
            action_type: target.action,
            entity_type: target.entity,
            entity_id: target.entity_id,
            description,
            old_data: old.map(|s| s.to_redacted_json()).unwrap_or_default(),
            new_data: new.map(|s| s.to_redacted_json()).unwrap_or_default(),
            status_code: captured.status.as_u16(),
            created_at: Utc::now(),
        }
    }

    async fn emit(self, captured: CapturedResponse) {
        let store = self.store.clone();
        let request_id = self.request_id.clone();
        let record = self.into_record(&captured);

        match store.append(&record).await {
            Ok(stored) => {
                metrics::counter!(
                    "audit_records_total",
                    "action" => stored.action_type.as_str(),
                    "entity" => stored.entity_type.as_str()
                )
                .increment(1);

                tracing::info!(
                    target: "audit",
                    request_id = %request_id,
                    audit_id = stored.id,
                    user_id = stored.user_id,
                    username = %stored.username,
                    action = %stored.action_type,
                    entity_type = %stored.entity_type,
                    entity_id = %stored.entity_id,
                    status = stored.status_code,
                    "{}",
                    stored.description
                );
            }
            Err(e) => {
                metrics::counter!("audit_write_failures_total").increment(1);
                tracing::error!(
                    request_id = %request_id,
                    error = %e,
                    action = %record.action_type,
                    entity_type = %record.entity_type,
                    "Failed to write audit record"
                );
            }
        }
    }
}

/// Emits with whatever was gathered when the handler future is dropped
/// before it produced a response
struct EmitOnAbort(Option<PendingAudit>);

impl Drop for EmitOnAbort {
    fn drop(&mut self) {
        if let Some(pending) = self.0.take() {
            let status = StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let captured = CapturedResponse {
                status,
                body: Bytes::new(),
            };
            spawn_completion(Box::pin(pending.emit(captured)));
        }
    }
}
