//! Admin category handlers

use axum::{extract::{State, Path}, http::StatusCode, Json};
use uuid::Uuid;
use validator::Validate;

use crate::{AppState, AppResult, AppError, AppJson};
use crate::models::{slugify, Category, CreateCategory, UpdateCategory};
use crate::middleware::auth::AdminSession;

/// All categories, including inactive ones
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(Category::list_all(&state.pool).await?))
}

pub async fn create(
    State(state): State<AppState>,
    _admin: AdminSession,
    AppJson(req): AppJson<CreateCategory>,
) -> AppResult<(StatusCode, Json<Category>)> {
    req.validate()?;

    let source = req.slug.as_deref().unwrap_or(&req.name);
    let slug = resolve_slug(source)?;

    let category = Category::create(&state.pool, req, slug)
        .await
        .map_err(slug_conflict)?;

    tracing::info!("Category created: {} ({})", category.slug, category.id);

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateCategory>,
) -> AppResult<Json<Category>> {
    req.validate()?;

    let slug = req.slug.as_deref().map(resolve_slug).transpose()?;

    let category = Category::update(&state.pool, id, req, slug)
        .await
        .map_err(slug_conflict)?
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

    tracing::info!("Category updated: {} ({})", category.slug, category.id);

    Ok(Json(category))
}

pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    if !Category::delete(&state.pool, id).await? {
        return Err(AppError::NotFound("Category not found".to_string()));
    }

    tracing::info!("Category deleted: {}", id);

    Ok(Json(serde_json::json!({ "deleted": true })))
}

fn resolve_slug(source: &str) -> AppResult<String> {
    let slug = slugify(source);
    if slug.is_empty() {
        return Err(AppError::ValidationError(
            "slug: must contain at least one letter or digit".to_string(),
        ));
    }
    Ok(slug)
}

fn slug_conflict(err: sqlx::Error) -> AppError {
    match AppError::from(err) {
        AppError::AlreadyExists(_) => {
            AppError::AlreadyExists("A category with this slug already exists".to_string())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_from_name_or_explicit_value() {
        assert_eq!(resolve_slug("Butterfly Garden").unwrap(), "butterfly-garden");
        assert_eq!(resolve_slug("My-Custom_Slug").unwrap(), "my-custom-slug");
        assert!(matches!(resolve_slug("***"), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn non_unique_errors_pass_through() {
        assert!(matches!(
            slug_conflict(sqlx::Error::PoolTimedOut),
            AppError::DatabaseError(_)
        ));
    }
}
