use axum::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// Verified identity extracted from a Google ID token. Trusted once the token
/// passes validation, unlike user-supplied registration fields.
#[derive(Debug, Clone)]
pub struct GoogleProfile {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// Bad signature, wrong audience, expired, or otherwise not our token.
    #[error("token rejected")]
    Rejected,
    #[error("verifier unavailable")]
    Unavailable,
    #[error("invalid verifier response")]
    InvalidResponse,
}

#[async_trait]
pub trait GoogleVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<GoogleProfile, VerifyError>;
}

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Validates ID tokens against Google's tokeninfo endpoint, constrained to
/// this application's registered client id.
pub struct GoogleTokenVerifier {
    http: reqwest::Client,
    endpoint: String,
    client_id: String,
}

impl GoogleTokenVerifier {
    pub fn new(client_id: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: TOKENINFO_URL.to_string(),
            client_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    email: Option<String>,
    email_verified: Option<String>,
    name: Option<String>,
}

fn profile_from(info: TokenInfo, client_id: &str) -> Result<GoogleProfile, VerifyError> {
    if info.aud != client_id {
        warn!(aud = %info.aud, "google token audience mismatch");
        return Err(VerifyError::Rejected);
    }
    if info.email_verified.as_deref() != Some("true") {
        return Err(VerifyError::Rejected);
    }
    let email = info.email.ok_or(VerifyError::InvalidResponse)?;
    let name = match info.name {
        Some(n) => n,
        None => email.split('@').next().unwrap_or_default().to_string(),
    };
    Ok(GoogleProfile { email, name })
}

#[async_trait]
impl GoogleVerifier for GoogleTokenVerifier {
    async fn verify(&self, credential: &str) -> Result<GoogleProfile, VerifyError> {
        let res = self
            .http
            .get(&self.endpoint)
            .query(&[("id_token", credential)])
            .send()
            .await
            .map_err(|_| VerifyError::Unavailable)?;

        if !res.status().is_success() {
            return if res.status().is_client_error() {
                Err(VerifyError::Rejected)
            } else {
                Err(VerifyError::Unavailable)
            };
        }

        let info: TokenInfo = res.json().await.map_err(|_| VerifyError::InvalidResponse)?;
        profile_from(info, &self.client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(aud: &str, email: Option<&str>, verified: Option<&str>, name: Option<&str>) -> TokenInfo {
        TokenInfo {
            aud: aud.into(),
            email: email.map(Into::into),
            email_verified: verified.map(Into::into),
            name: name.map(Into::into),
        }
    }

    #[test]
    fn accepts_matching_audience() {
        let profile = profile_from(
            info("client-1", Some("ada@x.com"), Some("true"), Some("Ada")),
            "client-1",
        )
        .expect("valid payload");
        assert_eq!(profile.email, "ada@x.com");
        assert_eq!(profile.name, "Ada");
    }

    #[test]
    fn rejects_audience_mismatch() {
        let err = profile_from(
            info("someone-else", Some("ada@x.com"), Some("true"), Some("Ada")),
            "client-1",
        )
        .unwrap_err();
        assert_eq!(err, VerifyError::Rejected);
    }

    #[test]
    fn rejects_unverified_email() {
        let err = profile_from(
            info("client-1", Some("ada@x.com"), Some("false"), None),
            "client-1",
        )
        .unwrap_err();
        assert_eq!(err, VerifyError::Rejected);
    }

    #[test]
    fn missing_email_is_invalid_response() {
        let err = profile_from(info("client-1", None, Some("true"), None), "client-1").unwrap_err();
        assert_eq!(err, VerifyError::InvalidResponse);
    }

    #[test]
    fn name_falls_back_to_email_local_part() {
        let profile = profile_from(
            info("client-1", Some("ada@x.com"), Some("true"), None),
            "client-1",
        )
        .expect("valid payload");
        assert_eq!(profile.name, "ada");
    }
}
