//! Public catalog handlers

use axum::{extract::{State, Path, Query}, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, AppResult, AppError};
use crate::models::{featured_count, Category, Facets, Page, Plant, PlantDto, PlantFilter};

#[derive(Debug, Deserialize)]
pub struct FeaturedQuery {
    pub count: Option<i64>,
}

/// Filtered, sorted, paginated listing of active plants
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<PlantFilter>,
) -> AppResult<Json<Page<PlantDto>>> {
    let query = filter.normalize(state.config.max_page_size);
    let page = Plant::search(&state.pool, &query).await?;

    let Page { items, total_count, page, page_size, .. } = page;
    let items = PlantDto::load(&state.pool, items).await?;

    Ok(Json(Page::new(items, total_count, page, page_size)))
}

/// Single active plant
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PlantDto>> {
    let plant = Plant::find_active_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Plant not found".to_string()))?;

    let dto = PlantDto::load(&state.pool, vec![plant])
        .await?
        .pop()
        .ok_or_else(|| AppError::InternalError("Plant vanished while loading".to_string()))?;

    Ok(Json(dto))
}

/// Newest active plants
pub async fn featured(
    State(state): State<AppState>,
    Query(query): Query<FeaturedQuery>,
) -> AppResult<Json<Vec<PlantDto>>> {
    let count = featured_count(query.count, state.config.max_page_size);

    let plants = Plant::list_featured(&state.pool, count).await?;
    Ok(Json(PlantDto::load(&state.pool, plants).await?))
}

/// Distinct life cycles, sun exposures and water needs
pub async fn facets(State(state): State<AppState>) -> AppResult<Json<Facets>> {
    Ok(Json(Plant::facets(&state.pool).await?))
}

/// Active categories
pub async fn categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(Category::list_active(&state.pool).await?))
}
