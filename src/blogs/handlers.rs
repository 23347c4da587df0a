use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{BlogListItem, BlogView, MessageResponse},
    repo::{Blog, BlogFields},
};
use crate::{
    auth::{jwt::AdminUser, repo::is_unique_violation},
    error::ApiError,
    forms::{non_empty, parse_published, upload_part, UploadPart},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/blogs", get(list_blogs).post(create_blog))
        .route(
            "/blogs/:slug",
            get(get_blog).put(update_blog).delete(delete_blog),
        )
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB: cover images
}

#[instrument(skip(state))]
pub async fn list_blogs(
    State(state): State<AppState>,
) -> Result<Json<Vec<BlogListItem>>, ApiError> {
    let blogs = Blog::list_published(&state.db)
        .await
        .map_err(ApiError::Dependency)?;
    let items = blogs
        .into_iter()
        .map(|b| BlogListItem::from_row(b, state.storage.as_ref()))
        .collect();
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn get_blog(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BlogView>, ApiError> {
    let blog = Blog::find_by_slug(&state.db, &slug)
        .await
        .map_err(ApiError::Dependency)?
        .ok_or_else(|| ApiError::NotFound("Article not found".into()))?;
    Ok(Json(BlogView::from_row(blog, state.storage.as_ref())))
}

#[instrument(skip(state, mp))]
pub async fn create_blog(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    mp: Multipart,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let form = read_form(mp).await?;
    let fields = build_fields(&state, form, None).await?;

    let blog_id = match Blog::create(&state.db, admin_id, &fields).await {
        Ok(id) => id,
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::Conflict("Slug already in use".into()))
        }
        Err(e) => return Err(ApiError::Dependency(e)),
    };

    info!(%admin_id, %blog_id, slug = %fields.slug, "blog created");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Article created".into(),
        }),
    ))
}

#[instrument(skip(state, mp))]
pub async fn update_blog(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
    mp: Multipart,
) -> Result<Json<MessageResponse>, ApiError> {
    let old = Blog::find_by_id(&state.db, id)
        .await
        .map_err(ApiError::Dependency)?
        .ok_or_else(|| ApiError::NotFound("Article not found".into()))?;

    let form = read_form(mp).await?;
    let fields = build_fields(&state, form, Some(old)).await?;

    match Blog::update(&state.db, id, &fields).await {
        Ok(()) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::Conflict("Slug already in use".into()))
        }
        Err(e) => return Err(ApiError::Dependency(e)),
    }

    info!(%admin_id, blog_id = %id, "blog updated");
    Ok(Json(MessageResponse {
        message: "Article updated".into(),
    }))
}

#[instrument(skip(state))]
pub async fn delete_blog(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let blog = Blog::find_by_id(&state.db, id)
        .await
        .map_err(ApiError::Dependency)?
        .ok_or_else(|| ApiError::NotFound("Article not found".into()))?;

    Blog::delete(&state.db, id)
        .await
        .map_err(ApiError::Dependency)?;

    if let Some(key) = blog.cover_key {
        if let Err(e) = state.storage.delete_object(&key).await {
            warn!(error = %e, %key, "failed to delete cover object");
        }
    }

    info!(%admin_id, blog_id = %id, "blog deleted");
    Ok(Json(MessageResponse {
        message: "Article deleted".into(),
    }))
}

// --- multipart plumbing ---

#[derive(Default)]
struct BlogForm {
    title: Option<String>,
    slug: Option<String>,
    content: Option<String>,
    is_published: Option<String>,
    category: Option<String>,
    cover: Option<UploadPart>,
}

async fn read_form(mut mp: Multipart) -> Result<BlogForm, ApiError> {
    let malformed = || ApiError::Validation("Malformed multipart body".into());
    let mut form = BlogForm::default();

    while let Some(field) = mp.next_field().await.map_err(|_| malformed())? {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };
        if name == "cover_image" {
            let file_name = field.file_name().unwrap_or("cover").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let body = field.bytes().await.map_err(|_| malformed())?;
            form.cover = Some(UploadPart {
                file_name,
                content_type,
                body,
            });
        } else {
            let text = field.text().await.map_err(|_| malformed())?;
            match name.as_str() {
                "title" => form.title = Some(text),
                "slug" => form.slug = Some(text),
                "content" => form.content = Some(text),
                "is_published" => form.is_published = Some(text),
                "category" => form.category = Some(text),
                _ => {}
            }
        }
    }
    Ok(form)
}

/// Validate the form and resolve fallbacks against the previous row, if any.
async fn build_fields(
    state: &AppState,
    form: BlogForm,
    old: Option<Blog>,
) -> Result<BlogFields, ApiError> {
    let title = non_empty(form.title)
        .ok_or_else(|| ApiError::Validation("Title is required".into()))?;
    let slug = non_empty(form.slug)
        .ok_or_else(|| ApiError::Validation("Slug is required".into()))?;
    let content = non_empty(form.content)
        .ok_or_else(|| ApiError::Validation("Content is required".into()))?;

    let cover_key = match upload_part(state, "covers", form.cover).await? {
        Some(key) => Some(key),
        None => old.as_ref().and_then(|o| o.cover_key.clone()),
    };

    let category = non_empty(form.category)
        .or_else(|| old.as_ref().map(|o| o.category.clone()))
        .unwrap_or_else(|| "Uncategorized".into());

    Ok(BlogFields {
        title,
        slug,
        content,
        cover_key,
        is_published: parse_published(form.is_published.as_deref()),
        category,
    })
}
