use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::Project;
use crate::storage::StorageClient;

/// Project as returned to clients; storage keys are turned into URLs here.
#[derive(Debug, Serialize)]
pub struct ProjectView {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub demo_url: Option<String>,
    pub is_published: bool,
    pub category: String,
    pub created_at: OffsetDateTime,
}

impl ProjectView {
    pub fn from_row(p: Project, storage: &dyn StorageClient) -> Self {
        Self {
            id: p.id,
            title: p.title,
            slug: p.slug,
            description: p.description,
            thumbnail_url: p.thumbnail_key.map(|k| storage.public_url(&k)),
            demo_url: p.demo_url,
            is_published: p.is_published,
            category: p.category,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::async_trait;
    use bytes::Bytes;

    struct TestStorage;
    #[async_trait]
    impl StorageClient for TestStorage {
        async fn put_object(&self, _k: &str, _b: Bytes, _ct: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn delete_object(&self, _k: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn presign_get(&self, k: &str, _s: u64) -> anyhow::Result<String> {
            Ok(format!("https://cdn.test/signed/{}", k))
        }
        fn public_url(&self, k: &str) -> String {
            format!("https://cdn.test/{}", k)
        }
    }

    fn project(thumbnail_key: Option<&str>) -> Project {
        Project {
            id: Uuid::new_v4(),
            title: "Demo".into(),
            slug: "demo".into(),
            description: None,
            thumbnail_key: thumbnail_key.map(Into::into),
            demo_url: None,
            archive_key: Some("projects/x.zip".into()),
            is_published: true,
            category: "Web".into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn view_derives_thumbnail_url_from_key() {
        let view = ProjectView::from_row(project(Some("thumbnails/a.png")), &TestStorage);
        assert_eq!(
            view.thumbnail_url.as_deref(),
            Some("https://cdn.test/thumbnails/a.png")
        );
    }

    #[test]
    fn view_omits_thumbnail_url_without_key() {
        let view = ProjectView::from_row(project(None), &TestStorage);
        assert!(view.thumbnail_url.is_none());
    }

    #[test]
    fn view_never_exposes_archive_key() {
        let json =
            serde_json::to_string(&ProjectView::from_row(project(None), &TestStorage)).unwrap();
        assert!(!json.contains("archive"));
    }
}
