use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub thumbnail_key: Option<String>,
    pub demo_url: Option<String>,
    /// Gated archive; downloads go through a presigned URL, never directly.
    pub archive_key: Option<String>,
    pub is_published: bool,
    pub category: String,
    pub created_at: OffsetDateTime,
}

/// Column values for insert/update; files are already uploaded by the caller.
#[derive(Debug)]
pub struct ProjectFields {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub thumbnail_key: Option<String>,
    pub demo_url: Option<String>,
    pub archive_key: Option<String>,
    pub is_published: bool,
    pub category: String,
}

impl Project {
    pub async fn list(db: &PgPool, include_drafts: bool) -> anyhow::Result<Vec<Project>> {
        let sql = if include_drafts {
            r#"
            SELECT id, title, slug, description, thumbnail_key, demo_url, archive_key,
                   is_published, category, created_at
            FROM projects
            ORDER BY created_at DESC
            "#
        } else {
            r#"
            SELECT id, title, slug, description, thumbnail_key, demo_url, archive_key,
                   is_published, category, created_at
            FROM projects
            WHERE is_published = TRUE
            ORDER BY created_at DESC
            "#
        };
        let rows = sqlx::query_as::<_, Project>(sql).fetch_all(db).await?;
        Ok(rows)
    }

    pub async fn find_by_slug(db: &PgPool, slug: &str) -> anyhow::Result<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, title, slug, description, thumbnail_key, demo_url, archive_key,
                   is_published, category, created_at
            FROM projects
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(db)
        .await?;
        Ok(project)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, title, slug, description, thumbnail_key, demo_url, archive_key,
                   is_published, category, created_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(project)
    }

    pub async fn create(db: &PgPool, f: &ProjectFields) -> anyhow::Result<Project> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (title, slug, description, thumbnail_key, demo_url,
                                  archive_key, is_published, category)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, title, slug, description, thumbnail_key, demo_url, archive_key,
                      is_published, category, created_at
            "#,
        )
        .bind(&f.title)
        .bind(&f.slug)
        .bind(&f.description)
        .bind(&f.thumbnail_key)
        .bind(&f.demo_url)
        .bind(&f.archive_key)
        .bind(f.is_published)
        .bind(&f.category)
        .fetch_one(db)
        .await?;
        Ok(project)
    }

    pub async fn update(db: &PgPool, id: Uuid, f: &ProjectFields) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE projects
            SET title = $1, slug = $2, description = $3, thumbnail_key = $4,
                demo_url = $5, archive_key = $6, is_published = $7, category = $8
            WHERE id = $9
            "#,
        )
        .bind(&f.title)
        .bind(&f.slug)
        .bind(&f.description)
        .bind(&f.thumbnail_key)
        .bind(&f.demo_url)
        .bind(&f.archive_key)
        .bind(f.is_published)
        .bind(&f.category)
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Published slugs with creation dates, for the sitemap.
    pub async fn published_slugs(db: &PgPool) -> anyhow::Result<Vec<(String, OffsetDateTime)>> {
        let rows = sqlx::query_as::<_, (String, OffsetDateTime)>(
            "SELECT slug, created_at FROM projects WHERE is_published = TRUE",
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

/// One row per gated download, keyed by who and what.
pub async fn log_download(db: &PgPool, user_id: Uuid, project_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO download_logs (user_id, project_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(project_id)
        .execute(db)
        .await?;
    Ok(())
}
