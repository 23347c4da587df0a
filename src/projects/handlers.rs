use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::Redirect,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{MessageResponse, ProjectView},
    repo::{log_download, Project, ProjectFields},
};
use crate::{
    auth::{
        jwt::{AdminUser, AuthUser},
        repo::is_unique_violation,
    },
    error::ApiError,
    forms::{non_empty, parse_published, upload_part, UploadPart},
    state::AppState,
};

/// Presigned download URLs stay valid for ten minutes.
const DOWNLOAD_URL_TTL_SECS: u64 = 600;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/:slug",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/projects/:id/download", get(download_project))
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024)) // 50MB: archives + thumbnails
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub admin: Option<String>,
}

#[instrument(skip(state, admin))]
pub async fn list_projects(
    State(state): State<AppState>,
    admin: Option<AdminUser>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<ProjectView>>, ApiError> {
    // Drafts are listed only for an authenticated admin asking for them.
    let include_drafts = q.admin.as_deref() == Some("true") && admin.is_some();
    let projects = Project::list(&state.db, include_drafts)
        .await
        .map_err(ApiError::Dependency)?;
    let items = projects
        .into_iter()
        .map(|p| ProjectView::from_row(p, state.storage.as_ref()))
        .collect();
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn get_project(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProjectView>, ApiError> {
    let project = Project::find_by_slug(&state.db, &slug)
        .await
        .map_err(ApiError::Dependency)?
        .ok_or_else(|| ApiError::NotFound("Project not found".into()))?;
    Ok(Json(ProjectView::from_row(project, state.storage.as_ref())))
}

#[instrument(skip(state))]
pub async fn download_project(
    State(state): State<AppState>,
    AuthUser { id: user_id, .. }: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Redirect, ApiError> {
    let project = Project::find_by_id(&state.db, id)
        .await
        .map_err(ApiError::Dependency)?
        .ok_or_else(|| ApiError::NotFound("Project file not found".into()))?;

    let Some(key) = project.archive_key else {
        return Err(ApiError::NotFound("Project file not found".into()));
    };

    log_download(&state.db, user_id, project.id)
        .await
        .map_err(ApiError::Dependency)?;

    let url = state
        .storage
        .presign_get(&key, DOWNLOAD_URL_TTL_SECS)
        .await
        .map_err(ApiError::Dependency)?;

    info!(%user_id, project_id = %project.id, "gated download");
    Ok(Redirect::temporary(&url))
}

#[instrument(skip(state, mp))]
pub async fn create_project(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    mp: Multipart,
) -> Result<(StatusCode, Json<ProjectView>), ApiError> {
    let form = read_form(mp).await?;
    let (title, slug) = require_title_and_slug(&form)?;

    let thumbnail_key = upload_part(&state, "thumbnails", form.thumbnail).await?;
    let archive_key = upload_part(&state, "projects", form.archive).await?;

    let fields = ProjectFields {
        title,
        slug,
        description: form.description,
        thumbnail_key,
        demo_url: form.demo_url,
        archive_key,
        is_published: parse_published(form.is_published.as_deref()),
        category: non_empty(form.category).unwrap_or_else(|| "Uncategorized".into()),
    };

    let project = match Project::create(&state.db, &fields).await {
        Ok(p) => p,
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::Conflict("Slug already in use".into()))
        }
        Err(e) => return Err(ApiError::Dependency(e)),
    };

    info!(%admin_id, project_id = %project.id, slug = %project.slug, "project created");
    Ok((
        StatusCode::CREATED,
        Json(ProjectView::from_row(project, state.storage.as_ref())),
    ))
}

#[instrument(skip(state, mp))]
pub async fn update_project(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
    mp: Multipart,
) -> Result<Json<ProjectView>, ApiError> {
    let old = Project::find_by_id(&state.db, id)
        .await
        .map_err(ApiError::Dependency)?
        .ok_or_else(|| ApiError::NotFound("Project not found".into()))?;

    let form = read_form(mp).await?;
    let (title, slug) = require_title_and_slug(&form)?;

    // Absent file parts keep the stored objects.
    let thumbnail_key = match upload_part(&state, "thumbnails", form.thumbnail).await? {
        Some(key) => Some(key),
        None => old.thumbnail_key,
    };
    let archive_key = match upload_part(&state, "projects", form.archive).await? {
        Some(key) => Some(key),
        None => old.archive_key,
    };

    let fields = ProjectFields {
        title,
        slug,
        description: form.description,
        thumbnail_key,
        demo_url: form.demo_url,
        archive_key,
        is_published: parse_published(form.is_published.as_deref()),
        category: non_empty(form.category)
            .or_else(|| non_empty(Some(old.category)))
            .unwrap_or_else(|| "Uncategorized".into()),
    };

    match Project::update(&state.db, id, &fields).await {
        Ok(()) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::Conflict("Slug already in use".into()))
        }
        Err(e) => return Err(ApiError::Dependency(e)),
    }

    info!(%admin_id, project_id = %id, "project updated");
    let updated = Project {
        id,
        title: fields.title,
        slug: fields.slug,
        description: fields.description,
        thumbnail_key: fields.thumbnail_key,
        demo_url: fields.demo_url,
        archive_key: fields.archive_key,
        is_published: fields.is_published,
        category: fields.category,
        created_at: old.created_at,
    };
    Ok(Json(ProjectView::from_row(updated, state.storage.as_ref())))
}

#[instrument(skip(state))]
pub async fn delete_project(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let project = Project::find_by_id(&state.db, id)
        .await
        .map_err(ApiError::Dependency)?
        .ok_or_else(|| ApiError::NotFound("Project not found".into()))?;

    Project::delete(&state.db, id)
        .await
        .map_err(ApiError::Dependency)?;

    // Orphaned objects are preferable to a failed delete; just log.
    for key in [project.thumbnail_key, project.archive_key].into_iter().flatten() {
        if let Err(e) = state.storage.delete_object(&key).await {
            warn!(error = %e, %key, "failed to delete stored object");
        }
    }

    info!(%admin_id, project_id = %id, "project deleted");
    Ok(Json(MessageResponse {
        message: "Project deleted".into(),
    }))
}

// --- multipart plumbing ---

#[derive(Default)]
struct ProjectForm {
    title: Option<String>,
    slug: Option<String>,
    description: Option<String>,
    demo_url: Option<String>,
    is_published: Option<String>,
    category: Option<String>,
    thumbnail: Option<UploadPart>,
    archive: Option<UploadPart>,
}

async fn read_form(mut mp: Multipart) -> Result<ProjectForm, ApiError> {
    let malformed = || ApiError::Validation("Malformed multipart body".into());
    let mut form = ProjectForm::default();

    while let Some(field) = mp.next_field().await.map_err(|_| malformed())? {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };
        match name.as_str() {
            "thumbnail" | "project_file" => {
                let file_name = field.file_name().unwrap_or("file").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let body = field.bytes().await.map_err(|_| malformed())?;
                let part = UploadPart {
                    file_name,
                    content_type,
                    body,
                };
                if name == "thumbnail" {
                    form.thumbnail = Some(part);
                } else {
                    form.archive = Some(part);
                }
            }
            _ => {
                let text = field.text().await.map_err(|_| malformed())?;
                match name.as_str() {
                    "title" => form.title = Some(text),
                    "slug" => form.slug = Some(text),
                    "description" => form.description = Some(text),
                    "demo_url" => form.demo_url = Some(text),
                    "is_published" => form.is_published = Some(text),
                    "category" => form.category = Some(text),
                    _ => {}
                }
            }
        }
    }
    Ok(form)
}

fn require_title_and_slug(form: &ProjectForm) -> Result<(String, String), ApiError> {
    let title = non_empty(form.title.clone())
        .ok_or_else(|| ApiError::Validation("Title is required".into()))?;
    let slug = non_empty(form.slug.clone())
        .ok_or_else(|| ApiError::Validation("Slug is required".into()))?;
    Ok((title, slug))
}
