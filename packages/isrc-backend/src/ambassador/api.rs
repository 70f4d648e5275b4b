//! Campus ambassador signup handler.
//!
//! - `POST /campus-ambassador` - `{ name, email, phone, state, city, college,
//!   yearOfStudy, degreeProgram }`

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Serialize;

use super::{AmbassadorRegistry, AmbassadorSignup};
use crate::error::ApiError;
use crate::fields::body_or_default;

const SIGNUP_FAILED: &str = "Internal Server Error";

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
}

/// POST /campus-ambassador
pub async fn register(
    State(registry): State<AmbassadorRegistry>,
    payload: Result<Json<AmbassadorSignup>, JsonRejection>,
) -> Result<Json<SignupResponse>, ApiError> {
    let signup = body_or_default(payload);
    registry
        .register(signup)
        .await
        .map_err(ApiError::opaque(SIGNUP_FAILED))?;

    Ok(Json(SignupResponse {
        message: "Campus Ambassador registered successfully".to_string(),
    }))
}
