//! Flat attribute snapshots of entities and the diff between two of them

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Key that never leaves a snapshot once it is stored or diffed
pub const PASSWORD_KEY: &str = "password";

/// Rendered in place of an empty diff list
pub const NO_CHANGES: &str = "no changes";

/// Ordered key → JSON value mapping describing an entity at a point in time.
///
/// Entity payloads differ between users, customers and partial updates, so
/// the mapping stays dynamic. Key order follows insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Map<String, Value>);

impl Snapshot {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Parse a JSON object. Anything other than an object is rejected.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(other) => Err(CoreError::InvalidSnapshot(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
            Err(e) => Err(CoreError::InvalidSnapshot(e.to_string())),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Copy without the password key
    pub fn redacted(&self) -> Self {
        let mut map = self.0.clone();
        map.shift_remove(PASSWORD_KEY);
        Self(map)
    }

    /// JSON text of the redacted snapshot
    pub fn to_redacted_json(&self) -> String {
        Value::Object(self.redacted().0).to_string()
    }

    /// Field-level changes from `self` to `newer`.
    ///
    /// Only keys present in both snapshots are compared, in the order of
    /// `self`. The password key and keys that are null on either side are
    /// skipped. Each change renders as `key: 'old' → 'new'`.
    pub fn diff(&self, newer: &Snapshot) -> Vec<String> {
        self.0
            .iter()
            .filter(|(key, old)| key.as_str() != PASSWORD_KEY && !old.is_null())
            .filter_map(|(key, old)| {
                let new = newer.0.get(key).filter(|v| !v.is_null())?;
                let (old, new) = (render_value(old), render_value(new));
                (old != new).then(|| format!("{}: '{}' → '{}'", key, old, new))
            })
            .collect()
    }
}

impl From<Map<String, Value>> for Snapshot {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Snapshot> for Value {
    fn from(snapshot: Snapshot) -> Self {
        Value::Object(snapshot.0)
    }
}

/// Join a diff list for display, or the no-changes sentinel when empty
pub fn render_diff(changes: &[String]) -> String {
    if changes.is_empty() {
        NO_CHANGES.to_string()
    } else {
        changes.join(", ")
    }
}

/// Plain-text rendering used for comparison: strings without quotes,
/// everything else as compact JSON
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: Value) -> Snapshot {
        Snapshot::from_json_slice(value.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn test_diff_reports_changed_keys_only() {
        let old = snapshot(json!({"name": "A", "email": "x"}));
        let new = snapshot(json!({"name": "B", "email": "x"}));
        assert_eq!(old.diff(&new), vec!["name: 'A' → 'B'".to_string()]);
    }

    #[test]
    fn test_diff_ignores_password_and_one_sided_keys() {
        let old = snapshot(json!({"name": "A", "password": "old", "phone": "1"}));
        let new = snapshot(json!({"name": "A", "password": "new", "address": "Main St"}));
        let changes = old.diff(&new);
        assert!(changes.is_empty());
        assert_eq!(render_diff(&changes), NO_CHANGES);
    }

    #[test]
    fn test_diff_skips_null_values() {
        let old = snapshot(json!({"name": "A", "phone": null, "address": "Main St"}));
        let new = snapshot(json!({"name": "B", "phone": "555", "address": null}));
        assert_eq!(old.diff(&new), vec!["name: 'A' → 'B'".to_string()]);

        let old = snapshot(json!({"phone": null}));
        let new = snapshot(json!({"phone": null}));
        assert_eq!(render_diff(&old.diff(&new)), NO_CHANGES);
    }

    #[test]
    fn test_diff_compares_stringified_values() {
        let old = snapshot(json!({"id": 7, "active": true, "role": "USER"}));
        let new = snapshot(json!({"id": "7", "active": false, "role": "ADMIN"}));
        assert_eq!(
            old.diff(&new),
            vec![
                "active: 'true' → 'false'".to_string(),
                "role: 'USER' → 'ADMIN'".to_string(),
            ]
        );
    }

    #[test]
    fn test_diff_keeps_old_key_order() {
        let old = snapshot(json!({"phone": "1", "name": "A", "email": "x"}));
        let new = snapshot(json!({"email": "y", "name": "B", "phone": "2"}));
        assert_eq!(
            old.diff(&new),
            vec![
                "phone: '1' → '2'".to_string(),
                "name: 'A' → 'B'".to_string(),
                "email: 'x' → 'y'".to_string(),
            ]
        );
        assert_eq!(
            render_diff(&old.diff(&new)),
            "phone: '1' → '2', name: 'A' → 'B', email: 'x' → 'y'"
        );
    }

    #[test]
    fn test_redaction_drops_password() {
        let s = snapshot(json!({"username": "jdoe", "password": "secret"}));
        let json = s.to_redacted_json();
        assert!(!json.contains("password"));
        assert!(!json.contains("secret"));
        assert!(s.contains_key(PASSWORD_KEY));
        assert_eq!(json, r#"{"username":"jdoe"}"#);
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        assert!(Snapshot::from_json_slice(b"[1,2]").is_err());
        assert!(Snapshot::from_json_slice(b"not json").is_err());
        assert!(Snapshot::from_json_slice(b"").is_err());
    }
}
