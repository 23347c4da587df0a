use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Role fixed at creation; never derived from client input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_verified: bool,
    /// Present only during the pending-verification window.
    pub otp_code: Option<String>,
    pub created_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, is_verified, otp_code, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Insert a password registration: unverified, holding its OTP.
    pub async fn create_pending(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
        otp_code: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, role, is_verified, otp_code)
            VALUES ($1, $2, $3, 'user', FALSE, $4)
            RETURNING id, name, email, password_hash, role, is_verified, otp_code, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(otp_code)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Insert a federated registration: verified immediately, no OTP step.
    pub async fn create_verified(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, role, is_verified)
            VALUES ($1, $2, $3, 'user', TRUE)
            RETURNING id, name, email, password_hash, role, is_verified, otp_code, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Flip the account to verified and clear its OTP.
    pub async fn mark_verified(db: &PgPool, email: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET is_verified = TRUE, otp_code = NULL WHERE email = $1")
            .bind(email)
            .execute(db)
            .await?;
        Ok(())
    }
}

/// The unique-email constraint is enforced by the store itself, closing the
/// race between concurrent registrations that both pass the pre-check.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}
