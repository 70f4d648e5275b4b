//! Request body helpers shared by the JSON routes.
//!
//! Form clients send some fields (phone numbers, year of study) as JSON
//! numbers, so text fields accept any scalar. A missing, `null` or empty
//! field counts as absent.

use axum::{extract::rejection::JsonRejection, Json};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize a scalar as `Option<String>`, treating `null` and `""` as `None`.
///
/// Use with `#[serde(default, deserialize_with = "lenient_string")]`.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => {
            return Err(serde::de::Error::custom(format!(
                "expected a string, found {}",
                kind(&other)
            )))
        }
    };
    Ok(text.filter(|s| !s.is_empty()))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
        _ => "a scalar",
    }
}

/// Unwrap a JSON body, falling back to an empty request.
///
/// A body that is absent or fails to parse is treated as if no fields were
/// sent, so the route answers with its usual "required fields" error.
pub fn body_or_default<T: Default>(payload: Result<Json<T>, JsonRejection>) -> T {
    match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "Unusable JSON body, treating as empty");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Form {
        #[serde(default, deserialize_with = "lenient_string")]
        year_of_study: Option<String>,
    }

    fn parse(body: &str) -> Form {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_accepts_strings_and_numbers() {
        assert_eq!(parse(r#"{"yearOfStudy":"2"}"#).year_of_study.as_deref(), Some("2"));
        assert_eq!(parse(r#"{"yearOfStudy":2}"#).year_of_study.as_deref(), Some("2"));
        assert_eq!(parse(r#"{"yearOfStudy":true}"#).year_of_study.as_deref(), Some("true"));
    }

    #[test]
    fn test_missing_null_and_empty_are_absent() {
        assert_eq!(parse("{}").year_of_study, None);
        assert_eq!(parse(r#"{"yearOfStudy":null}"#).year_of_study, None);
        assert_eq!(parse(r#"{"yearOfStudy":""}"#).year_of_study, None);
    }

    #[test]
    fn test_rejects_structures() {
        assert!(serde_json::from_str::<Form>(r#"{"yearOfStudy":[1]}"#).is_err());
    }
}
