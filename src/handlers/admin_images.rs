//! Admin image handlers: ordering and primary reassignment

use axum::{extract::{State, Path}, http::StatusCode, Json};
use uuid::Uuid;
use validator::Validate;

use crate::{AppState, AppResult, AppError, AppJson};
use crate::models::{
    after_removal, reordered, with_primary, AddImageRequest, Plant, PlantImage,
    ReorderImagesRequest,
};
use crate::middleware::auth::AdminSession;

/// Images of a plant in display order
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(plant_id): Path<Uuid>,
) -> AppResult<Json<Vec<PlantImage>>> {
    if Plant::find_by_id(&state.pool, plant_id).await?.is_none() {
        return Err(AppError::NotFound("Plant not found".to_string()));
    }

    Ok(Json(PlantImage::list_by_plant(&state.pool, plant_id).await?))
}

/// Append an image to a plant
pub async fn add(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(plant_id): Path<Uuid>,
    AppJson(req): AppJson<AddImageRequest>,
) -> AppResult<(StatusCode, Json<PlantImage>)> {
    req.validate()?;

    let url = req.image_url.trim();
    if url.is_empty() {
        return Err(AppError::ValidationError("image_url: Image URL is required".to_string()));
    }
    let alt_text = req.alt_text.as_deref().map(str::trim).filter(|a| !a.is_empty());

    let mut tx = state.pool.begin().await?;

    if !Plant::lock(&mut *tx, plant_id).await? {
        return Err(AppError::NotFound("Plant not found".to_string()));
    }

    let image = PlantImage::append(&mut *tx, plant_id, url, alt_text).await?;

    tx.commit().await?;

    tracing::info!(
        "Image {} added to plant {} at position {}{}",
        image.id,
        plant_id,
        image.display_order,
        if image.is_primary { " (primary)" } else { "" }
    );

    Ok((StatusCode::CREATED, Json(image)))
}

/// Delete an image, compacting the order and promoting a new primary if needed
pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(image_id): Path<Uuid>,
) -> AppResult<Json<Vec<PlantImage>>> {
    let mut tx = state.pool.begin().await?;

    let image = PlantImage::find_by_id(&mut *tx, image_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".to_string()))?;

    // Lock order: plant, then its images
    Plant::lock(&mut *tx, image.plant_id).await?;
    let before = PlantImage::lock_slots(&mut *tx, image.plant_id).await?;

    PlantImage::delete(&mut *tx, image_id).await?;

    let after = after_removal(&before, image_id);
    let updated = PlantImage::apply_slots(&mut *tx, &before, &after).await?;

    tx.commit().await?;

    tracing::info!(
        "Image {} deleted from plant {} ({} sibling rows updated)",
        image_id,
        image.plant_id,
        updated
    );

    Ok(Json(PlantImage::list_by_plant(&state.pool, image.plant_id).await?))
}

/// Make one image the plant's only primary image
pub async fn set_primary(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path((plant_id, image_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Vec<PlantImage>>> {
    let mut tx = state.pool.begin().await?;

    if !Plant::lock(&mut *tx, plant_id).await? {
        return Err(AppError::NotFound("Plant not found".to_string()));
    }

    let before = PlantImage::lock_slots(&mut *tx, plant_id).await?;
    let after = with_primary(&before, image_id)
        .ok_or_else(|| AppError::NotFound("Image not found for this plant".to_string()))?;

    PlantImage::apply_slots(&mut *tx, &before, &after).await?;

    tx.commit().await?;

    tracing::info!("Image {} is now primary for plant {}", image_id, plant_id);

    Ok(Json(PlantImage::list_by_plant(&state.pool, plant_id).await?))
}

/// Set display order from a full list of the plant's image ids
pub async fn reorder(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(plant_id): Path<Uuid>,
    AppJson(req): AppJson<ReorderImagesRequest>,
) -> AppResult<Json<Vec<PlantImage>>> {
    let mut tx = state.pool.begin().await?;

    if !Plant::lock(&mut *tx, plant_id).await? {
        return Err(AppError::NotFound("Plant not found".to_string()));
    }

    let before = PlantImage::lock_slots(&mut *tx, plant_id).await?;
    let after = reordered(&before, &req.image_ids)
        .map_err(|e| AppError::ValidationError(format!("image_ids: {}", e)))?;

    PlantImage::apply_slots(&mut *tx, &before, &after).await?;

    tx.commit().await?;

    tracing::info!("Images reordered for plant {}", plant_id);

    Ok(Json(PlantImage::list_by_plant(&state.pool, plant_id).await?))
}
