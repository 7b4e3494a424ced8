//! Account endpoints: registration, login, and the authenticated profile.

use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::{
    auth::{extract_ip_address, password, AuthUser},
    error::{ApiError, ApiResult},
    state::AppState,
};

const USERNAME_MIN_LENGTH: usize = 3;
const USERNAME_MAX_LENGTH: usize = 50;
const EMAIL_MAX_LENGTH: usize = 100;

/// Planning-day bounds applied when a registration omits or mangles them.
const DEFAULT_DAY_START: i32 = 6;
const DEFAULT_DAY_END: i32 = 18;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub time_start: Option<i32>,
    pub time_end: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// User record as returned to clients. Never carries the password hash.
#[derive(Debug, Serialize, FromRow)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub time_start: i32,
    pub time_end: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
struct CredentialRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    time_start: i32,
    time_end: i32,
    created_at: OffsetDateTime,
}

impl From<CredentialRow> for PublicUser {
    fn from(row: CredentialRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            time_start: row.time_start,
            time_end: row.time_end,
            created_at: row.created_at,
        }
    }
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let username = body.username.trim().to_string();
    let email = body.email.trim().to_lowercase();

    validate_username(&username)?;
    validate_email(&email)?;
    if body.password.len() < state.config.password_min_length {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters long",
            state.config.password_min_length
        )));
    }

    let client_ip = client_ip(&headers);
    let window = Duration::from_secs(state.config.auth_rate_window_seconds);
    if !state.rate_limiter.check_and_record(
        &format!("register_{client_ip}"),
        state.config.auth_rate_limit,
        window,
    ) {
        return Err(ApiError::RateLimited(
            "Too many registration attempts. Please try again later.".to_string(),
        ));
    }

    // Duplicate check up front for the friendlier message; the unique
    // constraints still win any race.
    let existing: Option<(String, String)> =
        sqlx::query_as("SELECT username, email FROM users WHERE username = $1 OR email = $2")
            .bind(&username)
            .bind(&email)
            .fetch_optional(&state.pool)
            .await?;

    if let Some((existing_username, _)) = existing {
        return Err(if existing_username == username {
            ApiError::Conflict("Username is already taken".to_string())
        } else {
            ApiError::Conflict("Email address is already registered".to_string())
        });
    }

    let password_hash = password::hash_password(&body.password, state.config.password_hash_cost)?;
    let (time_start, time_end) = normalize_day_bounds(body.time_start, body.time_end);

    let user: PublicUser = sqlx::query_as(
        r#"
        INSERT INTO users (username, email, password_hash, time_start, time_end)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, username, email, time_start, time_end, created_at
        "#,
    )
    .bind(&username)
    .bind(&email)
    .bind(&password_hash)
    .bind(time_start)
    .bind(time_end)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(user_id = user.id, username = %user.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user": user
        })),
    ))
}

/// POST /api/auth/login
///
/// The identifier matches username or email. Unknown identifier and wrong
/// password return byte-identical 401 responses.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let identifier = body.username.trim().to_string();
    if identifier.is_empty() || body.password.is_empty() {
        return Err(ApiError::Validation(
            "Username and password are required".to_string(),
        ));
    }

    let client_ip = client_ip(&headers);
    let window = Duration::from_secs(state.config.auth_rate_window_seconds);
    if !state.rate_limiter.check_and_record(
        &format!("login_{client_ip}"),
        state.config.auth_rate_limit,
        window,
    ) {
        return Err(ApiError::RateLimited(
            "Too many login attempts. Please try again later.".to_string(),
        ));
    }

    let row: Option<CredentialRow> = sqlx::query_as(
        r#"
        SELECT id, username, email, password_hash, time_start, time_end, created_at
        FROM users
        WHERE username = $1 OR email = $1
        "#,
    )
    .bind(&identifier)
    .fetch_optional(&state.pool)
    .await?;

    let Some(user) = row else {
        tracing::warn!(identifier = %identifier, "login failed: unknown user");
        return Err(ApiError::InvalidCredentials);
    };

    if !password::verify_password(&body.password, &user.password_hash)? {
        tracing::warn!(user_id = user.id, "login failed: wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.jwt_manager.issue(user.id, Some(&user.username))?;
    tracing::info!(user_id = user.id, username = %user.username, "login successful");

    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": PublicUser::from(user)
    })))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<serde_json::Value>> {
    let user: Option<PublicUser> = sqlx::query_as(
        r#"
        SELECT id, username, email, time_start, time_end, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(auth_user.user_id)
    .fetch_optional(&state.pool)
    .await?;

    // A verified token for a since-deleted account gets the same 401 as any
    // other rejection.
    let Some(user) = user else {
        tracing::warn!(user_id = auth_user.user_id, "token subject no longer exists");
        return Err(ApiError::Unauthorized);
    };

    Ok(Json(json!({ "user": user })))
}

fn client_ip(headers: &HeaderMap) -> String {
    extract_ip_address(headers).unwrap_or_else(|| "unknown".to_string())
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.len() < USERNAME_MIN_LENGTH || username.len() > USERNAME_MAX_LENGTH {
        return Err(ApiError::Validation(format!(
            "Username must be between {USERNAME_MIN_LENGTH} and {USERNAME_MAX_LENGTH} characters"
        )));
    }

    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-');
    if !username.chars().all(allowed) {
        return Err(ApiError::Validation(
            "Username can only contain letters, numbers, dots, hyphens, and underscores"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.len() > EMAIL_MAX_LENGTH {
        return Err(ApiError::Validation(format!(
            "Email address is too long (maximum {EMAIL_MAX_LENGTH} characters)"
        )));
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };

    if !valid {
        return Err(ApiError::Validation(
            "Invalid email address format".to_string(),
        ));
    }

    Ok(())
}

/// Resolves the planning-day bounds, silently falling back to 6..18 for
/// missing or out-of-range values (matching existing client expectations).
fn normalize_day_bounds(start: Option<i32>, end: Option<i32>) -> (i32, i32) {
    let mut start = start.unwrap_or(DEFAULT_DAY_START);
    let mut end = end.unwrap_or(DEFAULT_DAY_END);

    if !(0..=23).contains(&start) {
        start = DEFAULT_DAY_START;
    }
    if !(0..=23).contains(&end) || end <= start {
        end = DEFAULT_DAY_END;
    }
    // A start at or past the default end leaves no usable day; reset both.
    if end <= start {
        start = DEFAULT_DAY_START;
    }

    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(validate_username("ana").is_ok());
        assert!(validate_username("an.a-b_c9").is_ok());

        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"x".repeat(51)).is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("emoji🙂").is_err());
    }

    #[test]
    fn email_rules() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("a.b+c@sub.example.org").is_ok());

        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ana@").is_err());
        assert!(validate_email("ana@nodot").is_err());
        assert!(validate_email("ana@.com").is_err());
        assert!(validate_email("a b@example.com").is_err());
        assert!(validate_email(&format!("{}@example.com", "x".repeat(100))).is_err());
    }

    #[test]
    fn day_bounds_fall_back_to_defaults() {
        assert_eq!(normalize_day_bounds(None, None), (6, 18));
        assert_eq!(normalize_day_bounds(Some(8), Some(20)), (8, 20));
        assert_eq!(normalize_day_bounds(Some(-1), Some(20)), (6, 20));
        assert_eq!(normalize_day_bounds(Some(9), Some(24)), (9, 18));
        assert_eq!(normalize_day_bounds(Some(9), Some(9)), (9, 18));
        // An inverted pair that cannot be salvaged resets entirely.
        assert_eq!(normalize_day_bounds(Some(20), Some(10)), (6, 18));
    }
}
