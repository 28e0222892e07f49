//! Human-readable descriptions for audit records

use crate::audit::{ActionType, EntityType, RequestTarget};
use crate::snapshot::{Snapshot, render_diff};

/// Build the description for an audited request.
///
/// `old` is the state before the request (updates and deletes), `new` the
/// submitted payload (creates and updates). Templates that need a field which
/// is missing fall back to a shorter form; nothing here fails.
pub fn describe(target: &RequestTarget, old: Option<&Snapshot>, new: Option<&Snapshot>) -> String {
    let id = target.entity_id.as_str();

    match (target.entity, target.action) {
        (EntityType::User, ActionType::Create) => match new {
            Some(new) => match (new.get_str("username"), new.get_str("email")) {
                (Some(username), Some(email)) => {
                    format!("New user created: {} ({})", username, email)
                }
                (Some(username), None) => format!("New user created: {}", username),
                _ => generic(target),
            },
            None => generic(target),
        },
        (EntityType::Customer, ActionType::Create) => match new.and_then(|n| n.get_str("name")) {
            Some(name) => format!("New customer created: {}", name),
            None => generic(target),
        },
        (EntityType::Auth, ActionType::Create) => "Token refreshed".to_string(),

        (EntityType::User | EntityType::Customer, ActionType::Update) => {
            let head = format!("{} updated (ID: {})", target.entity, id);
            match (old, new) {
                (Some(old), Some(new)) => format!("{}: {}", head, render_diff(&old.diff(new))),
                _ => head,
            }
        }

        (EntityType::User, ActionType::Delete) => {
            let head = format!("user deleted (ID: {})", id);
            let who = old.and_then(|o| o.get_str("username").map(|u| (u, o.get_str("email"))));
            match who {
                Some((username, Some(email))) => {
                    format!("{} - user: {} ({})", head, username, email)
                }
                Some((username, None)) => format!("{} - user: {}", head, username),
                None => head,
            }
        }
        (EntityType::Customer, ActionType::Delete) => {
            let head = format!("customer deleted (ID: {})", id);
            match old.and_then(|o| o.get_str("name")) {
                Some(name) => format!("{} - name: {}", head, name),
                None => head,
            }
        }

        (EntityType::User | EntityType::Customer, ActionType::Read) => {
            if id.is_empty() {
                format!("{} list requested", target.entity)
            } else {
                format!("{} requested (ID: {})", target.entity, id)
            }
        }

        _ => generic(target),
    }
}

/// `"{action} action on {entity} {id}"`, without a trailing id when empty
fn generic(target: &RequestTarget) -> String {
    if target.entity_id.is_empty() {
        format!("{} action on {}", target.action, target.entity)
    } else {
        format!(
            "{} action on {} {}",
            target.action, target.entity, target.entity_id
        )
    }
}
