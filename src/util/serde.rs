//! Identifier aliases and the free-form metadata bag shared across the core.

/// Opaque executor identifier.
pub type ExecutorId = String;

/// Opaque task identifier.
pub type TaskId = String;

/// Opaque scheduler identifier.
pub type SchedulerId = String;

/// Free-form metadata attached to executors and tasks.
///
/// The core never inspects metadata contents; it only merges and versions
/// the bag as a whole. Values are arbitrary JSON.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Merge `patch` into `base`; top-level keys from `patch` win.
pub fn merge_metadata(base: &mut Metadata, patch: &Metadata) {
    for (key, value) in patch {
        base.insert(key.clone(), value.clone());
    }
}

/// Extract a [`Metadata`] bag from a JSON value, or `None` if it is not an
/// object.
#[must_use]
pub fn metadata_from_value(value: serde_json::Value) -> Option<Metadata> {
    match value {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    }
}
