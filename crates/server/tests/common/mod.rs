//! Shared test harness: in-memory repositories and request helpers

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use http_body_util::BodyExt;
use oml_core::{
    AuditLog, AuditLogFilter, Customer, CustomerFilter, CustomerInput, CustomerPatch, NewAuditLog,
    NewUser, Role, User, UserChanges, UserFilter,
};
use serde_json::Value as JsonValue;
use tower::ServiceExt;

use oml_server::auth::{MIN_BCRYPT_COST, TokenService, hash_if_plaintext};
use oml_server::config::Config;
use oml_server::db::{AuditRepository, CustomerRepository, HealthCheck, UserRepository};
use oml_server::error::AppError;
use oml_server::state::AppState;

pub const TEST_SECRET: &str = "test-secret";
pub const TEST_COST: u32 = MIN_BCRYPT_COST;

// ---------------------------------------------------------------------------
// In-memory repositories
// ---------------------------------------------------------------------------

fn page<T: Clone>(rows: &[T], offset: i64, limit: i64) -> Vec<T> {
    rows.iter()
        .skip(offset as usize)
        .take(limit as usize)
        .cloned()
        .collect()
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Default)]
pub struct MemoryUsers {
    rows: Mutex<Vec<User>>,
    next_id: AtomicI64,
}

impl MemoryUsers {
    pub fn all(&self) -> Vec<User> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn list(&self, filter: &UserFilter) -> Result<(Vec<User>, i64), AppError> {
        let rows = self.rows.lock().unwrap();
        let matched: Vec<User> = rows
            .iter()
            .filter(|u| {
                filter.search.as_deref().is_none_or(|s| {
                    contains_ci(&u.username, s) || contains_ci(&u.email, s)
                })
            })
            .filter(|u| filter.role.is_none_or(|r| u.role == r))
            .filter(|u| filter.active.is_none_or(|a| u.active == a))
            .cloned()
            .collect();
        let total = matched.len() as i64;
        Ok((page(&matched, filter.page.offset(), filter.page.limit()), total))
    }

    async fn find(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.rows.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create(&self, user: &NewUser) -> Result<User, AppError> {
        let now = Utc::now();
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|u| u.email == user.email || u.username == user.username) {
            return Err(AppError::Conflict("Record already exists".to_string()));
        }
        let created = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            active: user.active,
            created_at: now,
            updated_at: now,
        };
        rows.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, changes: &UserChanges) -> Result<Option<User>, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(user) = rows.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(username) = &changes.username {
            user.username = username.clone();
        }
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(hash) = &changes.password_hash {
            user.password_hash = hash.clone();
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(active) = changes.active {
            user.active = active;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|u| u.id != id);
        Ok(rows.len() < before)
    }

    async fn count_by_role(&self, role: Role) -> Result<i64, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.role == role)
            .count() as i64)
    }
}

#[derive(Default)]
pub struct MemoryCustomers {
    rows: Mutex<Vec<Customer>>,
    next_id: AtomicI64,
    /// Make lookups fail, as a broken database would
    pub fail_reads: AtomicBool,
}

#[async_trait]
impl CustomerRepository for MemoryCustomers {
    async fn list(&self, filter: &CustomerFilter) -> Result<(Vec<Customer>, i64), AppError> {
        let rows = self.rows.lock().unwrap();
        let mut matched: Vec<Customer> = rows
            .iter()
            .filter(|c| {
                filter
                    .search
                    .as_deref()
                    .is_none_or(|s| contains_ci(&c.name, s) || contains_ci(&c.email, s))
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        let total = matched.len() as i64;
        Ok((page(&matched, filter.page.offset(), filter.page.limit()), total))
    }

    async fn find(&self, id: i64) -> Result<Option<Customer>, AppError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Internal("customer store unavailable".to_string()));
        }
        Ok(self.rows.lock().unwrap().iter().find(|c| c.id == id).cloned())
    }

    async fn create(&self, input: &CustomerInput) -> Result<Customer, AppError> {
        let now = Utc::now();
        let created = Customer {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            name: input.name.clone(),
            email: input.email.clone(),
            phone: input.phone.clone(),
            address: input.address.clone(),
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, patch: &CustomerPatch) -> Result<Option<Customer>, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(customer) = rows.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            customer.name = name.clone();
        }
        if let Some(email) = &patch.email {
            customer.email = email.clone();
        }
        if let Some(phone) = &patch.phone {
            customer.phone = phone.clone();
        }
        if let Some(address) = &patch.address {
            customer.address = address.clone();
        }
        customer.updated_at = Utc::now();
        Ok(Some(customer.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|c| c.id != id);
        Ok(rows.len() < before)
    }
}

#[derive(Default)]
pub struct MemoryAuditLog {
    rows: Mutex<Vec<AuditLog>>,
    next_id: AtomicI64,
    /// Reject every append
    pub fail_writes: AtomicBool,
}

impl MemoryAuditLog {
    /// Stored records in insertion order
    pub fn records(&self) -> Vec<AuditLog> {
        self.rows.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<AuditLog> {
        self.rows.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl AuditRepository for MemoryAuditLog {
    async fn append(&self, log: &NewAuditLog) -> Result<AuditLog, AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Internal("audit store unavailable".to_string()));
        }
        let stored = log
            .clone()
            .into_stored(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.rows.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn list(&self, filter: &AuditLogFilter) -> Result<(Vec<AuditLog>, i64), AppError> {
        let rows = self.rows.lock().unwrap();
        let mut matched: Vec<AuditLog> = rows.iter().filter(|l| filter.matches(l)).cloned().collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = matched.len() as i64;
        Ok((page(&matched, filter.page.offset(), filter.page.limit()), total))
    }
}

pub struct AlwaysHealthy;

#[async_trait]
impl HealthCheck for AlwaysHealthy {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// App harness
// ---------------------------------------------------------------------------

/// Configuration for tests: fast hashing, no effective rate limit
pub fn test_config(extra: &[(&str, &str)]) -> Config {
    let extra: Vec<(String, String)> = extra
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| {
        if let Some((_, v)) = extra.iter().find(|(k, _)| k == key) {
            return Some(v.clone());
        }
        match key {
            "JWT_SECRET" => Some(TEST_SECRET.to_string()),
            "BCRYPT_COST" => Some(TEST_COST.to_string()),
            "RATE_LIMIT_RPS" => Some("10000".to_string()),
            _ => None,
        }
    })
}

pub struct TestApp {
    pub router: Router,
    pub users: Arc<MemoryUsers>,
    pub customers: Arc<MemoryCustomers>,
    pub audit: Arc<MemoryAuditLog>,
    pub tokens: TokenService,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(&test_config(&[]))
    }

    pub fn with_config(config: &Config) -> Self {
        let users = Arc::new(MemoryUsers::default());
        let customers = Arc::new(MemoryCustomers::default());
        let audit = Arc::new(MemoryAuditLog::default());
        let tokens = TokenService::new(&config.jwt_secret, config.jwt_expiration_hours);

        let state = AppState {
            users: users.clone(),
            customers: customers.clone(),
            audit_logs: audit.clone(),
            health: Arc::new(AlwaysHealthy),
            tokens: tokens.clone(),
            password_cost: config.bcrypt_cost,
        };

        Self {
            router: oml_server::build_app(state, config),
            users,
            customers,
            audit,
            tokens,
        }
    }

    /// Insert a user directly, bypassing the API
    pub async fn seed_user(&self, username: &str, email: &str, password: &str, role: Role) -> User {
        self.users
            .create(&NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash: hash_if_plaintext(password, TEST_COST).unwrap(),
                role,
                active: true,
            })
            .await
            .unwrap()
    }

    pub fn token_for(&self, user: &User) -> String {
        self.tokens.issue(user).unwrap().access_token
    }

    /// Seeded administrator and a token for it
    pub async fn admin(&self) -> (User, String) {
        let admin = self.seed_user("admin", "admin@example.com", "admin123", Role::Admin).await;
        let token = self.token_for(&admin);
        (admin, token)
    }

    /// Seeded regular user and a token for it
    pub async fn regular_user(&self) -> (User, String) {
        let user = self.seed_user("jan", "jan@example.com", "welkom01", Role::User).await;
        let token = self.token_for(&user);
        (user, token)
    }

    pub async fn seed_customer(&self, name: &str, email: &str) -> Customer {
        self.customers
            .create(&CustomerInput {
                name: name.to_string(),
                email: email.to_string(),
                phone: String::new(),
                address: String::new(),
            })
            .await
            .unwrap()
    }

    /// Send a request and return (status, body as JSON). The body is read to
    /// the end, so any audit record for the request has been written.
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, JsonValue) {
        let response = self.router.clone().oneshot(req).await.expect("Request failed");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();

        let body = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
        };

        (status, body)
    }
}

// ---------------------------------------------------------------------------
// Request builders
// ---------------------------------------------------------------------------

fn builder(method: &str, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
        None => builder,
    }
}

/// Request without a body
pub fn empty(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    builder(method, uri, token).body(Body::empty()).unwrap()
}

/// Request with a JSON body
pub fn json(method: &str, uri: &str, token: Option<&str>, body: JsonValue) -> Request<Body> {
    builder(method, uri, token)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

/// Request with a raw body, for malformed payloads
pub fn raw(method: &str, uri: &str, token: Option<&str>, body: &'static str) -> Request<Body> {
    builder(method, uri, token)
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .unwrap()
}
