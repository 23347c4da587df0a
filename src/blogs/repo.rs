use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Blog row joined with its author's display name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Blog {
    pub id: Uuid,
    pub author_id: Option<Uuid>,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub cover_key: Option<String>,
    pub is_published: bool,
    pub category: String,
    pub created_at: OffsetDateTime,
    pub author_name: Option<String>,
}

/// Column values for insert/update; the cover is already uploaded.
#[derive(Debug)]
pub struct BlogFields {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub cover_key: Option<String>,
    pub is_published: bool,
    pub category: String,
}

const BLOG_SELECT: &str = r#"
    SELECT b.id, b.author_id, b.title, b.slug, b.content, b.cover_key,
           b.is_published, b.category, b.created_at, u.name AS author_name
    FROM blogs b
    LEFT JOIN users u ON u.id = b.author_id
"#;

impl Blog {
    pub async fn list_published(db: &PgPool) -> anyhow::Result<Vec<Blog>> {
        let sql = format!("{BLOG_SELECT} WHERE b.is_published = TRUE ORDER BY b.created_at DESC");
        let rows = sqlx::query_as::<_, Blog>(&sql).fetch_all(db).await?;
        Ok(rows)
    }

    pub async fn find_by_slug(db: &PgPool, slug: &str) -> anyhow::Result<Option<Blog>> {
        let sql = format!("{BLOG_SELECT} WHERE b.slug = $1");
        let blog = sqlx::query_as::<_, Blog>(&sql)
            .bind(slug)
            .fetch_optional(db)
            .await?;
        Ok(blog)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Blog>> {
        let sql = format!("{BLOG_SELECT} WHERE b.id = $1");
        let blog = sqlx::query_as::<_, Blog>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(blog)
    }

    pub async fn create(db: &PgPool, author_id: Uuid, f: &BlogFields) -> anyhow::Result<Uuid> {
        let (id,) = sqlx::query_as::<_, (Uuid,)>(
            r#"
            INSERT INTO blogs (author_id, title, slug, content, cover_key, is_published, category)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(author_id)
        .bind(&f.title)
        .bind(&f.slug)
        .bind(&f.content)
        .bind(&f.cover_key)
        .bind(f.is_published)
        .bind(&f.category)
        .fetch_one(db)
        .await?;
        Ok(id)
    }

    pub async fn update(db: &PgPool, id: Uuid, f: &BlogFields) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE blogs
            SET title = $1, slug = $2, content = $3, cover_key = $4,
                is_published = $5, category = $6
            WHERE id = $7
            "#,
        )
        .bind(&f.title)
        .bind(&f.slug)
        .bind(&f.content)
        .bind(&f.cover_key)
        .bind(f.is_published)
        .bind(&f.category)
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}
