//! oml-core: Shared domain types and audit logic
//!
//! This crate provides the customer and user records, the audit record
//! model, request classification, entity snapshots with their diff,
//! description synthesis and pagination helpers used by the HTTP server.

pub mod audit;
pub mod customer;
pub mod describe;
pub mod error;
pub mod pagination;
pub mod snapshot;
pub mod user;

// Re-export our types
pub use audit::{
    ActionType, Actor, AuditLog, AuditLogFilter, EntityType, NewAuditLog, RequestTarget,
};
pub use customer::{Customer, CustomerFilter, CustomerInput, CustomerPatch};
pub use describe::describe;
pub use error::CoreError;
pub use pagination::{PageRequest, Paginated, Pagination};
pub use snapshot::{NO_CHANGES, PASSWORD_KEY, Snapshot, render_diff};
pub use user::{
    CreateUserRequest, NewUser, Role, UpdateUserRequest, User, UserChanges, UserFilter,
    UserResponse, validate_credentials,
};
