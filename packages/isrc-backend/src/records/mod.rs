//! Record store: a collection-scoped document store.
//!
//! Collections hold JSON objects keyed by either a generated push id
//! ([`RecordStore::append`]) or an explicit key ([`RecordStore::put`]).
//! Scans visit records in insertion order, which for generated keys is also
//! key order.
//!
//! ## Layout
//!
//! - `users/{uid}` - profile mirror written at registration
//! - `certificates/{id}` - uploaded certificate records
//! - `campus-ambassadors/{id}` - ambassador signups

pub mod memory;
pub mod push_id;
pub mod realtime;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::Result;

pub use memory::MemoryRecordStore;
pub use realtime::RealtimeDatabase;

pub const USERS: &str = "users";
pub const CERTIFICATES: &str = "certificates";
pub const CAMPUS_AMBASSADORS: &str = "campus-ambassadors";

/// A record as stored: its key plus the full document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    pub key: String,
    pub value: Value,
}

/// Predicate used by [`RecordStore::scan_first_match`].
pub type Predicate<'a> = dyn Fn(&Value) -> bool + Send + Sync + 'a;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Store `record` under a freshly generated key and return that key.
    ///
    /// The key is also written into the record as `id`.
    async fn append(&self, collection: &str, record: Value) -> Result<String>;

    /// Create or replace the record at `key`.
    async fn put(&self, collection: &str, key: &str, record: Value) -> Result<()>;

    /// First record in insertion order satisfying `predicate`.
    ///
    /// Fails with `NotFound` when the collection is absent, empty, or has no
    /// matching record.
    async fn scan_first_match(
        &self,
        collection: &str,
        predicate: &Predicate<'_>,
    ) -> Result<StoredRecord>;
}

/// Placeholder the store replaces with its own write time in milliseconds.
pub fn server_timestamp() -> Value {
    json!({ ".sv": "timestamp" })
}

fn is_server_timestamp(value: &Value) -> bool {
    value
        .as_object()
        .map_or(false, |obj| obj.len() == 1 && obj.get(".sv") == Some(&json!("timestamp")))
}

/// Replace every server timestamp placeholder inside `value` with `now_ms`.
pub(crate) fn resolve_server_values(value: &mut Value, now_ms: i64) {
    if is_server_timestamp(value) {
        *value = json!(now_ms);
        return;
    }
    match value {
        Value::Object(map) => map
            .values_mut()
            .for_each(|v| resolve_server_values(v, now_ms)),
        Value::Array(items) => items
            .iter_mut()
            .for_each(|v| resolve_server_values(v, now_ms)),
        _ => {}
    }
}

/// Merge the generated `id` into an object record.
pub(crate) fn with_id(mut record: Value, id: &str) -> Value {
    if let Value::Object(map) = &mut record {
        map.insert("id".to_string(), Value::String(id.to_string()));
    }
    record
}

pub(crate) fn not_found(collection: &str) -> crate::error::Error {
    crate::error::Error::NotFound(format!("No matching record in '{}'", collection))
}

/// Current time formatted like `2024-01-31T12:00:00.000Z`.
pub fn iso_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
