//! Firebase Realtime Database adapter (REST).
//!
//! - `append`: mints a push id locally, then `PUT {collection}/{id}.json`
//! - `put`: `PUT {collection}/{key}.json`
//! - `scan_first_match`: `GET {collection}.json`, then a linear scan
//!
//! Server timestamp placeholders are passed through untouched; the database
//! resolves them on write.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::{Map, Value};

use super::push_id::PushIdGenerator;
use super::{not_found, with_id, Predicate, RecordStore, StoredRecord};
use crate::error::{Error, Result};

pub struct RealtimeDatabase {
    client: Client,
    /// e.g. `https://my-project-default-rtdb.firebaseio.com`
    base_url: String,
    /// Database secret or ID token appended as `?auth=`.
    auth: Option<String>,
    ids: PushIdGenerator,
}

impl RealtimeDatabase {
    pub fn new(client: Client, base_url: &str, auth: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            ids: PushIdGenerator::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    fn auth_query(&self) -> Vec<(&'static str, &str)> {
        self.auth
            .as_deref()
            .map(|token| vec![("auth", token)])
            .unwrap_or_default()
    }

    async fn write(&self, path: &str, record: &Value) -> Result<()> {
        let response = self
            .client
            .put(self.url(path))
            .query(&self.auth_query())
            .json(record)
            .send()
            .await
            .map_err(unavailable)?;
        check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for RealtimeDatabase {
    async fn append(&self, collection: &str, record: Value) -> Result<String> {
        let id = self.ids.next_id();
        let value = with_id(record, &id);
        self.write(&format!("{}/{}", collection, id), &value).await?;
        tracing::info!(collection, id = id.as_str(), "Record appended");
        Ok(id)
    }

    async fn put(&self, collection: &str, key: &str, record: Value) -> Result<()> {
        self.write(&format!("{}/{}", collection, key), &record).await?;
        tracing::info!(collection, key, "Record stored");
        Ok(())
    }

    async fn scan_first_match(
        &self,
        collection: &str,
        predicate: &Predicate<'_>,
    ) -> Result<StoredRecord> {
        let response = self
            .client
            .get(self.url(collection))
            .query(&self.auth_query())
            .send()
            .await
            .map_err(unavailable)?;
        let snapshot: Value = check(response)
            .await?
            .json()
            .await
            .map_err(unavailable)?;

        first_match(snapshot, predicate).ok_or_else(|| not_found(collection))
    }
}

/// Scan a collection snapshot.
///
/// An absent collection reads as `null`. Push ids sort chronologically, so
/// visiting children in key order is visiting them in insertion order.
fn first_match(snapshot: Value, predicate: &Predicate<'_>) -> Option<StoredRecord> {
    let children: Map<String, Value> = match snapshot {
        Value::Object(map) => map,
        _ => return None,
    };
    let mut children: Vec<(String, Value)> = children.into_iter().collect();
    children.sort_by(|a, b| a.0.cmp(&b.0));
    children
        .into_iter()
        .find(|(_, value)| predicate(value))
        .map(|(key, value)| StoredRecord { key, value })
}

fn unavailable(err: reqwest::Error) -> Error {
    Error::StoreUnavailable(err.to_string())
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), body = body.as_str(), "Realtime Database request failed");
    Err(Error::StoreUnavailable(format!(
        "database responded {}: {}",
        status, body
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn db(auth: Option<&str>) -> RealtimeDatabase {
        RealtimeDatabase::new(
            Client::new(),
            "https://isrc-test-default-rtdb.firebaseio.com/",
            auth.map(String::from),
        )
    }

    #[test]
    fn test_url_building() {
        let db = db(None);
        assert_eq!(
            db.url("certificates/-Nabc"),
            "https://isrc-test-default-rtdb.firebaseio.com/certificates/-Nabc.json"
        );
        assert_eq!(
            db.url("/users/"),
            "https://isrc-test-default-rtdb.firebaseio.com/users.json"
        );
    }

    #[test]
    fn test_auth_query() {
        assert!(db(None).auth_query().is_empty());
        assert_eq!(db(Some("secret")).auth_query(), vec![("auth", "secret")]);
    }

    #[test]
    fn test_first_match_follows_key_order() {
        // Children arrive as a JSON object; the later push id is listed first.
        let snapshot = json!({
            "-NzzzLATER000000000": { "authCode": "DUP", "certificateUrl": "second" },
            "-NaaaEARLIER0000000": { "authCode": "DUP", "certificateUrl": "first" },
        });
        let found = first_match(snapshot, &|v: &Value| v["authCode"] == "DUP").unwrap();
        assert_eq!(found.key, "-NaaaEARLIER0000000");
        assert_eq!(found.value["certificateUrl"], "first");
    }

    #[test]
    fn test_first_match_on_null_snapshot() {
        assert!(first_match(Value::Null, &|_: &Value| true).is_none());
    }

    #[test]
    fn test_first_match_without_match() {
        let snapshot = json!({ "-Na": { "authCode": "A" } });
        assert!(first_match(snapshot, &|v: &Value| v["authCode"] == "B").is_none());
    }
}
