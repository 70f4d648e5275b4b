//! In-process record store.
//!
//! Each collection is a vector of records in insertion order. Used by the
//! `memory` backend and by the router tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;

use super::push_id::PushIdGenerator;
use super::{not_found, resolve_server_values, with_id, Predicate, RecordStore, StoredRecord};
use crate::error::Result;

#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    /// collection name -> records in insertion order
    collections: Arc<DashMap<String, Vec<StoredRecord>>>,
    ids: Arc<PushIdGenerator>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records of a collection, in insertion order.
    #[cfg(test)]
    pub fn records(&self, collection: &str) -> Vec<StoredRecord> {
        self.collections
            .get(collection)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn get(&self, collection: &str, key: &str) -> Option<Value> {
        self.collections.get(collection).and_then(|records| {
            records
                .iter()
                .find(|r| r.key == key)
                .map(|r| r.value.clone())
        })
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn append(&self, collection: &str, record: Value) -> Result<String> {
        let id = self.ids.next_id();
        let mut value = with_id(record, &id);
        resolve_server_values(&mut value, Utc::now().timestamp_millis());

        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(StoredRecord {
                key: id.clone(),
                value,
            });

        tracing::debug!(collection, id = id.as_str(), "Record appended");
        Ok(id)
    }

    async fn put(&self, collection: &str, key: &str, mut record: Value) -> Result<()> {
        resolve_server_values(&mut record, Utc::now().timestamp_millis());

        let mut records = self.collections.entry(collection.to_string()).or_default();
        match records.iter().position(|r| r.key == key) {
            Some(idx) => records[idx].value = record,
            None => records.push(StoredRecord {
                key: key.to_string(),
                value: record,
            }),
        }

        tracing::debug!(collection, key, "Record stored");
        Ok(())
    }

    async fn scan_first_match(
        &self,
        collection: &str,
        predicate: &Predicate<'_>,
    ) -> Result<StoredRecord> {
        let records = self
            .collections
            .get(collection)
            .ok_or_else(|| not_found(collection))?;

        records
            .iter()
            .find(|r| predicate(&r.value))
            .cloned()
            .ok_or_else(|| not_found(collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::records::server_timestamp;
    use serde_json::json;

    fn code_is(code: &'static str) -> impl Fn(&Value) -> bool + Send + Sync {
        move |v| v.get("authCode").and_then(Value::as_str) == Some(code)
    }

    #[tokio::test]
    async fn test_append_assigns_unique_ordered_ids() {
        let store = MemoryRecordStore::new();
        let mut ids = Vec::new();
        for i in 0..50 {
            ids.push(store.append("things", json!({ "n": i })).await.unwrap());
        }

        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, ids);

        let records = store.records("things");
        assert_eq!(records.len(), 50);
        assert_eq!(records[0].value["id"], ids[0].as_str());
        assert_eq!(records[49].value["n"], 49);
    }

    #[tokio::test]
    async fn test_append_resolves_server_timestamp() {
        let store = MemoryRecordStore::new();
        let before = Utc::now().timestamp_millis();
        let id = store
            .append("certificates", json!({ "uploadedAt": server_timestamp() }))
            .await
            .unwrap();

        let value = store.get("certificates", &id).unwrap();
        let stamped = value["uploadedAt"].as_i64().unwrap();
        assert!(stamped >= before);
    }

    #[tokio::test]
    async fn test_put_is_idempotent() {
        let store = MemoryRecordStore::new();
        let profile = json!({ "uid": "u1", "email": "a@x.com" });
        store.put("users", "u1", profile.clone()).await.unwrap();
        store.put("users", "u1", profile.clone()).await.unwrap();

        assert_eq!(store.records("users").len(), 1);
        assert_eq!(store.get("users", "u1"), Some(profile));
    }

    #[tokio::test]
    async fn test_put_replaces_in_place() {
        let store = MemoryRecordStore::new();
        store.put("users", "u1", json!({ "v": 1 })).await.unwrap();
        store.put("users", "u2", json!({ "v": 2 })).await.unwrap();
        store.put("users", "u1", json!({ "v": 3 })).await.unwrap();

        let records = store.records("users");
        assert_eq!(records[0].key, "u1");
        assert_eq!(records[0].value["v"], 3);
        assert_eq!(records[1].key, "u2");
    }

    #[tokio::test]
    async fn test_scan_returns_first_in_insertion_order() {
        let store = MemoryRecordStore::new();
        store
            .append("certificates", json!({ "authCode": "DUP", "n": 1 }))
            .await
            .unwrap();
        store
            .append("certificates", json!({ "authCode": "DUP", "n": 2 }))
            .await
            .unwrap();

        let found = store
            .scan_first_match("certificates", &code_is("DUP"))
            .await
            .unwrap();
        assert_eq!(found.value["n"], 1);
    }

    #[tokio::test]
    async fn test_scan_missing_collection_is_not_found() {
        let store = MemoryRecordStore::new();
        let err = store
            .scan_first_match("certificates", &code_is("X"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_scan_without_match_is_not_found() {
        let store = MemoryRecordStore::new();
        store
            .append("certificates", json!({ "authCode": "A" }))
            .await
            .unwrap();
        let err = store
            .scan_first_match("certificates", &code_is("B"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
