// src/auth.rs

use actix_web::{web, HttpResponse};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::error::{store_failure, ApiError, ApiResult};
use crate::middleware::AuthenticatedUser;
use crate::models::{PublicUser, User};
use crate::store::Write;
use crate::validation;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Hex id of the user.
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// JWT Creation
pub fn create_jwt(
    user_id: &str,
    secret: &str,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp().max(0) as usize,
        exp: (now + ttl).timestamp().max(0) as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))
}

// JWT Validation
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Map a rejected token to the 401 the client sees.
pub fn token_error(err: jsonwebtoken::errors::Error) -> ApiError {
    match err.kind() {
        ErrorKind::ExpiredSignature => {
            ApiError::Unauthorized("Token expired, please log in again".to_string())
        }
        _ => ApiError::Unauthorized("Invalid token".to_string()),
    }
}

/// bcrypt is slow on purpose, so it runs on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> ApiResult<String> {
    web::block(move || hash(password, cost))
        .await
        .map_err(|e| {
            error!("Password hashing task failed: {}", e);
            ApiError::Internal("Error hashing password".to_string())
        })?
        .map_err(|e| {
            error!("Error hashing password: {}", e);
            ApiError::Internal("Error hashing password".to_string())
        })
}

pub async fn verify_password(password: String, password_hash: String) -> ApiResult<bool> {
    let outcome = web::block(move || verify(password, &password_hash))
        .await
        .map_err(|e| {
            error!("Password verification task failed: {}", e);
            ApiError::Internal("Error logging in".to_string())
        })?;
    // A corrupt stored hash is treated as a mismatch.
    Ok(outcome.unwrap_or_else(|e| {
        warn!("Stored password hash could not be verified: {}", e);
        false
    }))
}

/// POST /api/auth/register
pub async fn register(
    data: web::Data<AppState>,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let name = validation::name(&payload.name)?;
    let email = validation::email(&payload.email)?;
    validation::password(&payload.password)?;

    let existing = data
        .store
        .user_by_email(&email)
        .await
        .map_err(store_failure("Error registering user"))?;
    if existing.is_some() {
        return Err(ApiError::BadRequest("User already exists".to_string()));
    }

    let password_hash = hash_password(payload.password, data.config.bcrypt_cost).await?;
    let user = User::new(name, email, password_hash);
    let user_id = user.id;

    // The unique index still guards against a concurrent registration.
    data.store
        .commit(Write::InsertUser(user).into())
        .await
        .map_err(store_failure("Error registering user"))?;

    info!("Registered user {}", user_id);
    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "User registered successfully"
    })))
}

/// POST /api/auth/login
pub async fn login(
    data: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let user = data
        .store
        .user_by_email(payload.email.trim())
        .await
        .map_err(store_failure("Error logging in"))?
        .ok_or_else(invalid)?;

    if !verify_password(payload.password, user.password.clone()).await? {
        return Err(invalid());
    }

    let token = create_jwt(
        &user.id.to_hex(),
        &data.config.jwt_secret,
        data.config.token_ttl(),
    )
    .map_err(|e| {
        error!("Error signing token: {}", e);
        ApiError::Internal("Error logging in".to_string())
    })?;

    info!("User {} logged in", user.id);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "token": token })))
}

/// GET /api/auth/verify
pub async fn verify_session(
    data: web::Data<AppState>,
    current: AuthenticatedUser,
) -> ApiResult<HttpResponse> {
    let user = data
        .store
        .user(current.id)
        .await
        .map_err(store_failure("Error verifying user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "user": PublicUser::from(&user) })))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn tokens_round_trip_the_subject() {
        let token = create_jwt("65f0c0ffee0000000000abcd", SECRET, Duration::hours(1)).unwrap();
        let claims = validate_jwt(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "65f0c0ffee0000000000abcd");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_tokens_get_their_own_message() {
        let token = create_jwt("abc", SECRET, Duration::hours(-2)).unwrap();
        let err = validate_jwt(&token, SECRET).unwrap_err();
        match token_error(err) {
            ApiError::Unauthorized(msg) => assert!(msg.contains("expired")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_jwt("abc", SECRET, Duration::hours(1)).unwrap();
        let err = validate_jwt(&token, "other-secret").unwrap_err();
        match token_error(err) {
            ApiError::Unauthorized(msg) => assert_eq!(msg, "Invalid token"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[actix_web::test]
    async fn password_hashes_verify() {
        let hashed = hash_password("hunter22".into(), 4).await.unwrap();
        assert!(verify_password("hunter22".into(), hashed.clone()).await.unwrap());
        assert!(!verify_password("wrong".into(), hashed).await.unwrap());
        assert!(!verify_password("x".into(), "not-a-hash".into()).await.unwrap());
    }
}
