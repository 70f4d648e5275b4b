//! Campus ambassador signups.
//!
//! Every field is required. A signup is appended to `campus-ambassadors`
//! with a generated id and an ISO-8601 `createdAt`.

pub mod api;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fields::lenient_string;
use crate::records::{iso_now, RecordStore, CAMPUS_AMBASSADORS};

pub const ALL_FIELDS_REQUIRED: &str = "All fields are required";

/// Signup form as received; any field may be missing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbassadorSignup {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub college: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub year_of_study: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub degree_program: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbassadorRecord {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub state: String,
    pub city: String,
    pub college: String,
    pub year_of_study: String,
    pub degree_program: String,
    pub created_at: String,
}

impl AmbassadorSignup {
    /// Require every field and stamp the creation time.
    pub fn into_record(self) -> Result<AmbassadorRecord> {
        let missing = || Error::InvalidInput(ALL_FIELDS_REQUIRED.to_string());
        Ok(AmbassadorRecord {
            name: self.name.ok_or_else(missing)?,
            email: self.email.ok_or_else(missing)?,
            phone: self.phone.ok_or_else(missing)?,
            state: self.state.ok_or_else(missing)?,
            city: self.city.ok_or_else(missing)?,
            college: self.college.ok_or_else(missing)?,
            year_of_study: self.year_of_study.ok_or_else(missing)?,
            degree_program: self.degree_program.ok_or_else(missing)?,
            created_at: iso_now(),
        })
    }
}

#[derive(Clone)]
pub struct AmbassadorRegistry {
    records: Arc<dyn RecordStore>,
}

impl AmbassadorRegistry {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Validate and store a signup. Returns the generated record id.
    pub async fn register(&self, signup: AmbassadorSignup) -> Result<String> {
        let record = signup.into_record()?;
        let value = serde_json::to_value(&record)
            .map_err(|e| Error::StoreUnavailable(format!("Failed to encode signup: {}", e)))?;

        let id = self.records.append(CAMPUS_AMBASSADORS, value).await?;
        tracing::info!(id = id.as_str(), college = record.college.as_str(), "Campus ambassador registered");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::MemoryRecordStore;

    fn full_signup() -> AmbassadorSignup {
        AmbassadorSignup {
            name: Some("A".into()),
            email: Some("a@x.com".into()),
            phone: Some("1".into()),
            state: Some("S".into()),
            city: Some("C".into()),
            college: Some("Col".into()),
            year_of_study: Some("2".into()),
            degree_program: Some("CS".into()),
        }
    }

    #[test]
    fn test_into_record_requires_every_field() {
        let clears: [fn(&mut AmbassadorSignup); 8] = [
            |s| s.name = None,
            |s| s.email = None,
            |s| s.phone = None,
            |s| s.state = None,
            |s| s.city = None,
            |s| s.college = None,
            |s| s.year_of_study = None,
            |s| s.degree_program = None,
        ];
        for clear in clears {
            let mut signup = full_signup();
            clear(&mut signup);
            match signup.into_record().unwrap_err() {
                Error::InvalidInput(msg) => assert_eq!(msg, ALL_FIELDS_REQUIRED),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_register_appends_one_record() {
        let records = MemoryRecordStore::new();
        let registry = AmbassadorRegistry::new(Arc::new(records.clone()));

        let id = registry.register(full_signup()).await.unwrap();

        let stored = records.records(CAMPUS_AMBASSADORS);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].key, id);
        assert_eq!(stored[0].value["degreeProgram"], "CS");
        assert_eq!(stored[0].value["yearOfStudy"], "2");
        assert!(stored[0].value["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_invalid_signup_writes_nothing() {
        let records = MemoryRecordStore::new();
        let registry = AmbassadorRegistry::new(Arc::new(records.clone()));

        let mut signup = full_signup();
        signup.city = None;
        assert!(registry.register(signup).await.is_err());
        assert!(records.records(CAMPUS_AMBASSADORS).is_empty());
    }
}
