use rand::Rng;

use crate::error::ApiError;

/// Draw a uniformly random 6-digit verification code.
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// Decide whether a submitted code verifies the account. A code only works
/// once: verification clears it, so a replay trips the already-verified guard.
pub fn check_otp(
    is_verified: bool,
    stored: Option<&str>,
    submitted: &str,
) -> Result<(), ApiError> {
    if is_verified {
        return Err(ApiError::Validation("Account already verified".into()));
    }
    if stored != Some(submitted) {
        return Err(ApiError::Validation("Incorrect verification code".into()));
    }
    Ok(())
}

/// Subject and HTML body of the verification mail sent on registration.
pub fn verification_email(name: &str, otp: &str) -> (String, String) {
    let subject = "Your verification code".to_string();
    let body = format!(
        "<h3>Hello {name},</h3>\
         <p>Thanks for registering. Here is your verification code:</p>\
         <h1 style=\"color: #2563eb; letter-spacing: 5px;\">{otp}</h1>\
         <p>Enter this code on the website to activate your account.</p>"
    );
    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..200 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
            let n: u32 = otp.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn check_otp_accepts_exact_match() {
        assert!(check_otp(false, Some("123456"), "123456").is_ok());
    }

    #[test]
    fn check_otp_rejects_wrong_code_as_validation() {
        let err = check_otp(false, Some("123456"), "654321").unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Incorrect verification code");
    }

    #[test]
    fn check_otp_rejects_already_verified_account() {
        // Covers replay too: verification clears the stored code.
        let err = check_otp(true, None, "123456").unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Account already verified");
    }

    #[test]
    fn check_otp_rejects_missing_stored_code() {
        assert!(check_otp(false, None, "123456").is_err());
    }

    #[test]
    fn email_includes_name_and_code() {
        let (subject, body) = verification_email("Ada", "123456");
        assert!(!subject.is_empty());
        assert!(body.contains("Ada"));
        assert!(body.contains("123456"));
    }
}
