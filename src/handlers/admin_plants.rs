//! Admin plant handlers

use axum::{extract::{State, Path}, http::StatusCode, Json};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::{AppState, AppResult, AppError, AppJson};
use crate::models::{
    primary_url, Category, Plant, PlantDto, PlantEditModel, PlantImage,
    SetPlantCategories, Stock,
};
use crate::middleware::auth::AdminSession;

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

/// Every plant, including inactive ones
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> AppResult<Json<Vec<PlantDto>>> {
    let plants = Plant::list_all(&state.pool).await?;
    Ok(Json(PlantDto::load(&state.pool, plants).await?))
}

/// Plant as an edit form
pub async fn get(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PlantEditModel>> {
    let model = load_edit_model(&state, id).await?;
    Ok(Json(model))
}

/// Create plant with its stock row and optional primary image
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminSession,
    AppJson(req): AppJson<PlantEditModel>,
) -> AppResult<(StatusCode, Json<CreatedResponse>)> {
    req.validate()?;

    let mut tx = state.pool.begin().await?;

    let plant = Plant::create(&mut *tx, &req).await?;
    Stock::upsert(
        &mut *tx,
        plant.id,
        req.quantity_available,
        &req.seed_packet_sizes,
        &req.plant_pot_sizes,
    ).await?;

    if let Some(url) = req.primary_image() {
        PlantImage::insert(&mut *tx, plant.id, &url, None, 0, true).await?;
    }

    tx.commit().await?;

    tracing::info!("Plant created: {} ({})", plant.common_name, plant.id);

    Ok((StatusCode::CREATED, Json(CreatedResponse { id: plant.id })))
}

/// Update plant fields and stock; the path id wins over any id in the body
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<PlantEditModel>,
) -> AppResult<Json<PlantEditModel>> {
    req.validate()?;

    let mut tx = state.pool.begin().await?;

    let plant = Plant::update(&mut *tx, id, &req)
        .await?
        .ok_or_else(|| AppError::NotFound("Plant not found".to_string()))?;

    Stock::upsert(
        &mut *tx,
        id,
        req.quantity_available,
        &req.seed_packet_sizes,
        &req.plant_pot_sizes,
    ).await?;

    if let Some(url) = req.primary_image() {
        PlantImage::promote_url(&mut *tx, id, &url).await?;
    }

    tx.commit().await?;

    tracing::info!("Plant updated: {} ({})", plant.common_name, plant.id);

    Ok(Json(load_edit_model(&state, id).await?))
}

/// Delete plant; images, stock and category links cascade
pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let deleted = Plant::delete(&state.pool, id).await?;

    if !deleted {
        return Err(AppError::NotFound("Plant not found".to_string()));
    }

    tracing::info!("Plant deleted: {}", id);

    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Replace the plant's categories
pub async fn set_categories(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<SetPlantCategories>,
) -> AppResult<Json<Vec<String>>> {
    let mut tx = state.pool.begin().await?;

    if !Plant::lock(&mut *tx, id).await? {
        return Err(AppError::NotFound("Plant not found".to_string()));
    }

    let unknown = Category::set_for_plant(&mut *tx, id, &req.category_ids).await?;
    if !unknown.is_empty() {
        let ids: Vec<String> = unknown.iter().map(Uuid::to_string).collect();
        return Err(AppError::ValidationError(format!(
            "category_ids: unknown categories {}",
            ids.join(", ")
        )));
    }

    tx.commit().await?;

    tracing::info!("Plant {} assigned {} categories", id, req.category_ids.len());

    let slugs = Category::slugs_by_plants(&state.pool, &[id])
        .await?
        .into_iter()
        .map(|(_, slug)| slug)
        .collect();

    Ok(Json(slugs))
}

async fn load_edit_model(state: &AppState, id: Uuid) -> AppResult<PlantEditModel> {
    let plant = Plant::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Plant not found".to_string()))?;

    let stock = Stock::find_by_plant(&state.pool, id).await?;
    let images = PlantImage::list_by_plant(&state.pool, id).await?;

    Ok(PlantEditModel::from_plant(plant, stock.as_ref(), primary_url(&images)))
}
