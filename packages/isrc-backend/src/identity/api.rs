//! Registration and login handlers.
//!
//! - `POST /register` - `{ email, password }`
//! - `POST /login`    - `{ email, password }`

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

use super::{Account, IdentityGateway};
use crate::error::ApiError;
use crate::fields::{body_or_default, lenient_string};

const REGISTER_FAILED: &str = "Error registering user";
const REGISTERED_PENDING: &str =
    "User registered successfully. Please verify your email before logging in.";
const REGISTERED_VERIFIED: &str = "User registered successfully";
const LOGIN_FAILED: &str = "Error logging in";

#[derive(Debug, Default, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    pub user: Account,
    pub id_token: String,
    /// Set while the account still has to confirm its email.
    pub verification_pending: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub user: Account,
    pub id_token: String,
}

/// POST /register
pub async fn register(
    State(gateway): State<IdentityGateway>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let req = body_or_default(payload);
    let session = gateway
        .register(
            req.email.as_deref().unwrap_or_default(),
            req.password.as_deref().unwrap_or_default(),
        )
        .await
        .map_err(ApiError::with(REGISTER_FAILED))?;

    let verification_pending = !session.account.email_verified;
    let message = if verification_pending {
        REGISTERED_PENDING
    } else {
        REGISTERED_VERIFIED
    };

    Ok(Json(RegisterResponse {
        message: message.to_string(),
        verification_pending,
        user: session.account,
        id_token: session.id_token,
    }))
}

/// POST /login
pub async fn login(
    State(gateway): State<IdentityGateway>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let req = body_or_default(payload);
    let session = gateway
        .login(
            req.email.as_deref().unwrap_or_default(),
            req.password.as_deref().unwrap_or_default(),
        )
        .await
        .map_err(ApiError::with(LOGIN_FAILED))?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        user: session.account,
        id_token: session.id_token,
    }))
}
