//! Request-boundary plumbing for admin multipart forms.

use bytes::Bytes;

use crate::{error::ApiError, state::AppState, storage::object_key};

/// A file part lifted out of a multipart form.
pub struct UploadPart {
    pub file_name: String,
    pub content_type: String,
    pub body: Bytes,
}

/// Admin forms send `is_published` as a string; only "true" and "1" publish.
pub fn parse_published(raw: Option<&str>) -> bool {
    matches!(raw, Some("true") | Some("1"))
}

pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Store a file part under a fresh namespaced key, if one was sent.
pub async fn upload_part(
    state: &AppState,
    prefix: &str,
    part: Option<UploadPart>,
) -> Result<Option<String>, ApiError> {
    let Some(part) = part else {
        return Ok(None);
    };
    let key = object_key(prefix, &part.file_name);
    state
        .storage
        .put_object(&key, part.body, &part.content_type)
        .await
        .map_err(ApiError::Dependency)?;
    Ok(Some(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_published_accepts_true_and_one() {
        assert!(parse_published(Some("true")));
        assert!(parse_published(Some("1")));
    }

    #[test]
    fn parse_published_defaults_to_draft() {
        assert!(!parse_published(Some("false")));
        assert!(!parse_published(Some("0")));
        assert!(!parse_published(Some("yes")));
        assert!(!parse_published(Some("")));
        assert!(!parse_published(None));
    }

    #[test]
    fn non_empty_strips_blank_values() {
        assert_eq!(non_empty(Some("x".into())), Some("x".into()));
        assert_eq!(non_empty(Some("   ".into())), None);
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(None), None);
    }
}
