use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, GoogleLoginRequest, LoginRequest, MessageResponse, PublicUser,
            RegisterRequest, VerifyOtpRequest,
        },
        google::VerifyError,
        jwt::JwtKeys,
        otp::{check_otp, generate_otp, verification_email},
        password::{hash_password, random_unusable_password, verify_password},
        repo::{is_unique_violation, User},
    },
    error::ApiError,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/login", post(login))
        .route("/auth/google", post(google_login))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Unknown email and wrong password answer identically; no enumeration.
fn invalid_credentials() -> ApiError {
    ApiError::Authentication("Invalid email or password".into())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("Name is required".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::Validation("Password too short".into()));
    }

    if User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(ApiError::Dependency)?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&payload.password).map_err(ApiError::Dependency)?;
    let code = generate_otp();

    let user = match User::create_pending(&state.db, payload.name.trim(), &payload.email, &hash, &code)
        .await
    {
        Ok(u) => u,
        // Concurrent registration slipped past the pre-check; the store wins.
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %payload.email, "email already registered");
            return Err(ApiError::Conflict("Email already registered".into()));
        }
        Err(e) => return Err(ApiError::Dependency(e)),
    };

    // The row is already inserted; a mail failure leaves a pending account
    // and surfaces as a generic server error (no rollback, no resend path).
    let (subject, body) = verification_email(&user.name, &code);
    state
        .mailer
        .send(&user.email, &subject, &body)
        .await
        .map_err(ApiError::Dependency)?;

    info!(user_id = %user.id, email = %user.email, "user registered, otp dispatched");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Registration successful! Check your email for the verification code.".into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &email)
        .await
        .map_err(ApiError::Dependency)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if let Err(e) = check_otp(user.is_verified, user.otp_code.as_deref(), &payload.otp) {
        warn!(email = %email, "verification refused");
        return Err(e);
    }

    User::mark_verified(&state.db, &email)
        .await
        .map_err(ApiError::Dependency)?;

    info!(user_id = %user.id, email = %email, "account verified");
    Ok(Json(MessageResponse {
        message: "Verification successful! You can now log in.".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(ApiError::Dependency)?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            invalid_credentials()
        })?;

    if !user.is_verified {
        return Err(ApiError::NeedsVerification);
    }

    let ok = verify_password(&payload.password, &user.password_hash)
        .map_err(ApiError::Dependency)?;
    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(invalid_credentials());
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, user.role).map_err(ApiError::Dependency)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn google_login(
    State(state): State<AppState>,
    Json(payload): Json<GoogleLoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let credential = payload
        .credential
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Google credential is required".into()))?;

    let profile = match state.google.verify(&credential).await {
        Ok(p) => p,
        Err(VerifyError::Unavailable) => {
            return Err(ApiError::Dependency(anyhow::anyhow!(
                "google token verifier unavailable"
            )))
        }
        Err(e) => {
            warn!(error = %e, "google token verification failed");
            return Err(ApiError::Authentication(
                "Could not verify Google token".into(),
            ));
        }
    };

    let user = match User::find_by_email(&state.db, &profile.email)
        .await
        .map_err(ApiError::Dependency)?
    {
        Some(u) => u,
        None => {
            // Auto-provision: the placeholder secret is hashed and dropped,
            // so this account only ever authenticates via Google.
            let hash =
                hash_password(&random_unusable_password()).map_err(ApiError::Dependency)?;
            match User::create_verified(&state.db, &profile.name, &profile.email, &hash).await {
                Ok(u) => u,
                // Lost a race against a concurrent federated login for the
                // same email; the earlier insert is authoritative.
                Err(e) if is_unique_violation(&e) => User::find_by_email(&state.db, &profile.email)
                    .await
                    .map_err(ApiError::Dependency)?
                    .ok_or_else(|| {
                        ApiError::Dependency(anyhow::anyhow!("user vanished after unique conflict"))
                    })?,
                Err(e) => return Err(ApiError::Dependency(e)),
            }
        }
    };

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, user.role).map_err(ApiError::Dependency)?;

    info!(user_id = %user.id, email = %user.email, "google login succeeded");
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(user),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation_accepts_plain_addresses() {
        assert!(is_valid_email("ada@x.com"));
        assert!(is_valid_email("a.b+tag@sub.domain.io"));
    }

    #[test]
    fn email_validation_rejects_garbage() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@x.com"));
    }

    #[test]
    fn credential_failures_share_one_error_shape() {
        let err = invalid_credentials();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "Invalid email or password");
    }

    #[tokio::test]
    async fn google_login_requires_credential() {
        let state = AppState::fake();
        let err = google_login(
            State(state),
            Json(GoogleLoginRequest { credential: None }),
        )
        .await
        .err()
        .expect("missing credential rejected");
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn google_login_rejects_unverifiable_token() {
        let state = AppState::fake();
        let err = google_login(
            State(state),
            Json(GoogleLoginRequest {
                credential: Some("tampered".into()),
            }),
        )
        .await
        .err()
        .expect("bad credential rejected");
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
