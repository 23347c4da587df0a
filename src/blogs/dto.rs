use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::Blog;
use crate::storage::StorageClient;

/// Listing entry; body content is left out.
#[derive(Debug, Serialize)]
pub struct BlogListItem {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub cover_url: Option<String>,
    pub is_published: bool,
    pub category: String,
    pub created_at: OffsetDateTime,
    pub author_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BlogView {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub cover_url: Option<String>,
    pub is_published: bool,
    pub category: String,
    pub created_at: OffsetDateTime,
    pub author_name: Option<String>,
}

impl BlogListItem {
    pub fn from_row(b: Blog, storage: &dyn StorageClient) -> Self {
        Self {
            id: b.id,
            title: b.title,
            slug: b.slug,
            cover_url: b.cover_key.map(|k| storage.public_url(&k)),
            is_published: b.is_published,
            category: b.category,
            created_at: b.created_at,
            author_name: b.author_name,
        }
    }
}

impl BlogView {
    pub fn from_row(b: Blog, storage: &dyn StorageClient) -> Self {
        Self {
            id: b.id,
            title: b.title,
            slug: b.slug,
            content: b.content,
            cover_url: b.cover_key.map(|k| storage.public_url(&k)),
            is_published: b.is_published,
            category: b.category,
            created_at: b.created_at,
            author_name: b.author_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
