// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, ROLE_STUDENT, RegisterRequest, User},
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

/// Subject assigned to locally registered accounts. Tokens minted by an
/// external identity provider carry their own subject.
fn local_subject(email: &str) -> String {
    format!("local|{}", email)
}

/// Resolves the authenticated user from token claims, creating a student
/// account on first contact. The subject claim is the external key.
pub async fn ensure_user(pool: &PgPool, claims: &Claims) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (subject, email, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (subject) DO UPDATE SET email = EXCLUDED.email
        RETURNING id, subject, email, password, role, created_at
        "#,
    )
    .bind(&claims.sub)
    .bind(&claims.email)
    .bind(ROLE_STUDENT)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to resolve user {}: {:?}", claims.sub, e);
        AppError::from(e)
    })?;

    Ok(user)
}

/// Registers a new student account.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(pool): State<PgPool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (subject, email, password, role)
        VALUES ($1, $2, $3, $4)
        RETURNING id, subject, email, password, role, created_at
        "#,
    )
    .bind(local_subject(&payload.email))
    .bind(&payload.email)
    .bind(hashed_password)
    .bind(ROLE_STUDENT)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        // Postgres error code for unique violation is 23505
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict(format!("Account '{}' already exists", payload.email))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and returns a JWT token.
///
/// Verifies the email and password against the database. If valid, signs a
/// JWT whose subject, email and role claims come from the stored user.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, subject, email, password, role, created_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(&payload.email)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let user = user.ok_or(AppError::AuthError("User not found".to_string()))?;

    // Accounts provisioned from external tokens have no local password.
    let stored_hash = user
        .password
        .as_deref()
        .ok_or(AppError::AuthError("Invalid password".to_string()))?;

    let is_valid = verify_password(&payload.password, stored_hash)?;

    if !is_valid {
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    let token = sign_jwt(
        &user.subject,
        &user.email,
        &user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "role": user.role
    })))
}
