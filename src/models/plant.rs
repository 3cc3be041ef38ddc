//! Plant model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::category::Category;
use super::filter::{Page, PlantQuery};
use super::image::{primary_url, PlantImage};
use super::stock::Stock;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Plant {
    pub id: Uuid,
    pub common_name: String,
    pub latin_name: Option<String>,
    pub description: Option<String>,
    pub life_cycle: Option<String>,
    pub size: Option<String>,
    pub soil_moisture: Option<String>,
    pub sun_exposure: Option<String>,
    pub is_florida_native: bool,
    pub price_cents: i32,
    pub edible: bool,
    pub water_needs: Option<String>,
    pub cold_tolerance: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Catalog view of a plant with its images and stock folded in
#[derive(Debug, Clone, Serialize)]
pub struct PlantDto {
    pub id: Uuid,
    pub common_name: String,
    pub latin_name: Option<String>,
    pub description: Option<String>,
    pub life_cycle: Option<String>,
    pub size: Option<String>,
    pub soil_moisture: Option<String>,
    pub sun_exposure: Option<String>,
    pub is_florida_native: bool,
    pub price_cents: i32,
    pub price: String,
    pub edible: bool,
    pub water_needs: Option<String>,
    pub cold_tolerance: Option<String>,
    pub primary_image_url: Option<String>,
    pub image_urls: Vec<String>,
    pub in_stock: bool,
    pub quantity_available: i32,
    pub seed_packet_sizes: Vec<f64>,
    pub plant_pot_sizes: Vec<i32>,
    pub category_slugs: Vec<String>,
    pub is_active: bool,
}

/// Admin create/update payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PlantEditModel {
    pub id: Option<Uuid>,

    #[validate(
        length(max = 200, message = "Common name cannot exceed 200 characters"),
        custom(function = "not_blank", message = "Common name is required")
    )]
    #[serde(default)]
    pub common_name: String,

    #[validate(length(max = 200, message = "Latin name cannot exceed 200 characters"))]
    pub latin_name: Option<String>,

    #[validate(length(max = 4000, message = "Description cannot exceed 4000 characters"))]
    pub description: Option<String>,

    #[validate(length(max = 50, message = "Life cycle cannot exceed 50 characters"))]
    pub life_cycle: Option<String>,

    #[validate(length(max = 100, message = "Size cannot exceed 100 characters"))]
    pub size: Option<String>,

    #[validate(length(max = 50, message = "Soil moisture cannot exceed 50 characters"))]
    pub soil_moisture: Option<String>,

    #[validate(length(max = 50, message = "Sun exposure cannot exceed 50 characters"))]
    pub sun_exposure: Option<String>,

    #[serde(default)]
    pub is_florida_native: bool,

    #[validate(range(min = 1, max = 999_999, message = "Price must be between $0.01 and $9,999.99"))]
    #[serde(default)]
    pub price_cents: i32,

    #[serde(default)]
    pub edible: bool,

    #[validate(length(max = 50, message = "Water needs cannot exceed 50 characters"))]
    pub water_needs: Option<String>,

    #[validate(length(max = 50, message = "Cold tolerance cannot exceed 50 characters"))]
    pub cold_tolerance: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,

    // Inventory
    #[validate(range(min = 0, message = "Quantity must be 0 or greater"))]
    #[serde(default)]
    pub quantity_available: i32,

    #[validate(custom(function = "positive_sizes", message = "Seed packet sizes must be positive"))]
    #[serde(default)]
    pub seed_packet_sizes: Vec<f64>,

    #[validate(custom(function = "positive_pots", message = "Pot sizes must be positive"))]
    #[serde(default)]
    pub plant_pot_sizes: Vec<i32>,

    #[validate(length(max = 500, message = "Image URL cannot exceed 500 characters"))]
    pub primary_image_url: Option<String>,
}

fn default_true() -> bool {
    true
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

fn positive_sizes(sizes: &[f64]) -> Result<(), ValidationError> {
    if sizes.iter().any(|s| !s.is_finite() || *s <= 0.0) {
        return Err(ValidationError::new("positive"));
    }
    Ok(())
}

fn positive_pots(sizes: &[i32]) -> Result<(), ValidationError> {
    if sizes.iter().any(|s| *s <= 0) {
        return Err(ValidationError::new("positive"));
    }
    Ok(())
}

/// Distinct attribute values offered as filter choices
#[derive(Debug, Clone, Serialize)]
pub struct Facets {
    pub life_cycles: Vec<String>,
    pub sun_exposures: Vec<String>,
    pub water_needs: Vec<String>,
}

/// `1234` -> `"12.34"`
pub fn format_price(cents: i32) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl PlantDto {
    /// `images` must belong to `plant`; they are ordered here
    pub fn assemble(
        plant: Plant,
        mut images: Vec<PlantImage>,
        stock: Option<&Stock>,
        category_slugs: Vec<String>,
    ) -> Self {
        images.sort_by_key(|i| (i.display_order, i.id));

        let primary_image_url = primary_url(&images);

        PlantDto {
            id: plant.id,
            price: format_price(plant.price_cents),
            common_name: plant.common_name,
            latin_name: plant.latin_name,
            description: plant.description,
            life_cycle: plant.life_cycle,
            size: plant.size,
            soil_moisture: plant.soil_moisture,
            sun_exposure: plant.sun_exposure,
            is_florida_native: plant.is_florida_native,
            price_cents: plant.price_cents,
            edible: plant.edible,
            water_needs: plant.water_needs,
            cold_tolerance: plant.cold_tolerance,
            primary_image_url,
            image_urls: images.into_iter().map(|i| i.image_url).collect(),
            in_stock: stock.map_or(false, Stock::in_stock),
            quantity_available: stock.map_or(0, |s| s.quantity_available),
            seed_packet_sizes: stock.map(|s| s.seed_packet_sizes.0.clone()).unwrap_or_default(),
            plant_pot_sizes: stock.map(|s| s.plant_pot_sizes.0.clone()).unwrap_or_default(),
            category_slugs,
            is_active: plant.is_active,
        }
    }

    /// Load images, stock and categories for `plants` in three batched queries
    pub async fn load(pool: &PgPool, plants: Vec<Plant>) -> Result<Vec<Self>, sqlx::Error> {
        if plants.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = plants.iter().map(|p| p.id).collect();

        let mut images: HashMap<Uuid, Vec<PlantImage>> = HashMap::new();
        for image in PlantImage::list_by_plants(pool, &ids).await? {
            images.entry(image.plant_id).or_default().push(image);
        }

        let stocks: HashMap<Uuid, Stock> = Stock::list_by_plants(pool, &ids)
            .await?
            .into_iter()
            .map(|s| (s.plant_id, s))
            .collect();

        let mut slugs: HashMap<Uuid, Vec<String>> = HashMap::new();
        for (plant_id, slug) in Category::slugs_by_plants(pool, &ids).await? {
            slugs.entry(plant_id).or_default().push(slug);
        }

        Ok(plants
            .into_iter()
            .map(|plant| {
                let id = plant.id;
                PlantDto::assemble(
                    plant,
                    images.remove(&id).unwrap_or_default(),
                    stocks.get(&id),
                    slugs.remove(&id).unwrap_or_default(),
                )
            })
            .collect())
    }
}

impl PlantEditModel {
    pub fn from_plant(plant: Plant, stock: Option<&Stock>, primary_image_url: Option<String>) -> Self {
        PlantEditModel {
            id: Some(plant.id),
            common_name: plant.common_name,
            latin_name: plant.latin_name,
            description: plant.description,
            life_cycle: plant.life_cycle,
            size: plant.size,
            soil_moisture: plant.soil_moisture,
            sun_exposure: plant.sun_exposure,
            is_florida_native: plant.is_florida_native,
            price_cents: plant.price_cents,
            edible: plant.edible,
            water_needs: plant.water_needs,
            cold_tolerance: plant.cold_tolerance,
            is_active: plant.is_active,
            quantity_available: stock.map_or(0, |s| s.quantity_available),
            seed_packet_sizes: stock.map(|s| s.seed_packet_sizes.0.clone()).unwrap_or_default(),
            plant_pot_sizes: stock.map(|s| s.plant_pot_sizes.0.clone()).unwrap_or_default(),
            primary_image_url,
        }
    }

    /// Requested primary image, if any
    pub fn primary_image(&self) -> Option<String> {
        trimmed(&self.primary_image_url)
    }
}

impl Plant {
    /// Filtered, sorted page of active plants
    pub async fn search(pool: &PgPool, query: &PlantQuery) -> Result<Page<Plant>, sqlx::Error> {
        let total_count: i64 = query
            .count_query()
            .build_query_scalar::<i64>()
            .fetch_one(pool)
            .await?;

        let plants = query
            .page_query()
            .build_query_as::<Plant>()
            .fetch_all(pool)
            .await?;

        Ok(Page::new(plants, total_count, query.page, query.page_size))
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Plant>("SELECT * FROM plants WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_active_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Plant>("SELECT * FROM plants WHERE id = $1 AND is_active = true")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lock the plant row so concurrent image edits serialize
    pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        let found = sqlx::query_scalar::<_, Uuid>("SELECT id FROM plants WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(found.is_some())
    }

    pub async fn list_featured(pool: &PgPool, count: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Plant>(
            r#"
            SELECT * FROM plants
            WHERE is_active = true
            ORDER BY created_at DESC, id
            LIMIT $1
            "#
        )
        .bind(count)
        .fetch_all(pool)
        .await
    }

    /// Every plant, active or not, for the back-office
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Plant>("SELECT * FROM plants ORDER BY common_name, id")
            .fetch_all(pool)
            .await
    }

    pub async fn facets(pool: &PgPool) -> Result<Facets, sqlx::Error> {
        Ok(Facets {
            life_cycles: Self::distinct_values(pool, FacetColumn::LifeCycle).await?,
            sun_exposures: Self::distinct_values(pool, FacetColumn::SunExposure).await?,
            water_needs: Self::distinct_values(pool, FacetColumn::WaterNeeds).await?,
        })
    }

    async fn distinct_values(pool: &PgPool, column: FacetColumn) -> Result<Vec<String>, sqlx::Error> {
        let sql = format!(
            "SELECT DISTINCT {col} FROM plants WHERE is_active = true AND {col} IS NOT NULL ORDER BY {col}",
            col = column.as_str()
        );
        sqlx::query_scalar::<_, String>(&sql)
            .fetch_all(pool)
            .await
    }

    pub async fn create(conn: &mut PgConnection, data: &PlantEditModel) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Plant>(
            r#"
            INSERT INTO plants (
                common_name, latin_name, description, life_cycle, size, soil_moisture,
                sun_exposure, is_florida_native, price_cents, edible, water_needs,
                cold_tolerance, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#
        )
        .bind(data.common_name.trim())
        .bind(trimmed(&data.latin_name))
        .bind(trimmed(&data.description))
        .bind(trimmed(&data.life_cycle))
        .bind(trimmed(&data.size))
        .bind(trimmed(&data.soil_moisture))
        .bind(trimmed(&data.sun_exposure))
        .bind(data.is_florida_native)
        .bind(data.price_cents)
        .bind(data.edible)
        .bind(trimmed(&data.water_needs))
        .bind(trimmed(&data.cold_tolerance))
        .bind(data.is_active)
        .fetch_one(conn)
        .await
    }

    pub async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        data: &PlantEditModel,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Plant>(
            r#"
            UPDATE plants
            SET common_name = $2,
                latin_name = $3,
                description = $4,
                life_cycle = $5,
                size = $6,
                soil_moisture = $7,
                sun_exposure = $8,
                is_florida_native = $9,
                price_cents = $10,
                edible = $11,
                water_needs = $12,
                cold_tolerance = $13,
                is_active = $14,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#
        )
        .bind(id)
        .bind(data.common_name.trim())
        .bind(trimmed(&data.latin_name))
        .bind(trimmed(&data.description))
        .bind(trimmed(&data.life_cycle))
        .bind(trimmed(&data.size))
        .bind(trimmed(&data.soil_moisture))
        .bind(trimmed(&data.sun_exposure))
        .bind(data.is_florida_native)
        .bind(data.price_cents)
        .bind(data.edible)
        .bind(trimmed(&data.water_needs))
        .bind(trimmed(&data.cold_tolerance))
        .bind(data.is_active)
        .fetch_optional(conn)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM plants WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone, Copy)]
enum FacetColumn {
    LifeCycle,
    SunExposure,
    WaterNeeds,
}

impl FacetColumn {
    fn as_str(&self) -> &'static str {
        match self {
            FacetColumn::LifeCycle => "life_cycle",
            FacetColumn::SunExposure => "sun_exposure",
            FacetColumn::WaterNeeds => "water_needs",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;

    fn plant() -> Plant {
        Plant {
            id: Uuid::from_u128(1),
            common_name: "Firebush".into(),
            latin_name: Some("Hamelia patens".into()),
            description: None,
            life_cycle: Some("Perennial".into()),
            size: None,
            soil_moisture: None,
            sun_exposure: Some("Full Sun".into()),
            is_florida_native: true,
            price_cents: 1299,
            edible: true,
            water_needs: Some("Medium".into()),
            cold_tolerance: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn image(n: u128, order: i32, primary: bool) -> PlantImage {
        PlantImage {
            id: Uuid::from_u128(100 + n),
            plant_id: Uuid::from_u128(1),
            image_url: format!("/images/plants/{n}.jpg"),
            alt_text: None,
            display_order: order,
            is_primary: primary,
        }
    }

    fn edit_model() -> PlantEditModel {
        PlantEditModel {
            common_name: "Coontie".into(),
            price_cents: 2499,
            is_active: true,
            quantity_available: 15,
            plant_pot_sizes: vec![6, 10],
            ..Default::default()
        }
    }

    #[test]
    fn price_formatting() {
        assert_eq!(format_price(499), "4.99");
        assert_eq!(format_price(2400), "24.00");
        assert_eq!(format_price(5), "0.05");
        assert_eq!(format_price(999_999), "9999.99");
        assert_eq!(format_price(-150), "-1.50");
    }

    #[test]
    fn dto_prefers_flagged_primary_image() {
        let images = vec![image(1, 1, false), image(2, 0, false), image(3, 2, true)];
        let dto = PlantDto::assemble(plant(), images, None, vec![]);

        assert_eq!(dto.primary_image_url.as_deref(), Some("/images/plants/3.jpg"));
        assert_eq!(
            dto.image_urls,
            vec!["/images/plants/2.jpg", "/images/plants/1.jpg", "/images/plants/3.jpg"]
        );
        assert_eq!(dto.price, "12.99");
    }

    #[test]
    fn dto_falls_back_to_first_image_by_order() {
        let images = vec![image(1, 5, false), image(2, 3, false)];
        let dto = PlantDto::assemble(plant(), images, None, vec![]);
        assert_eq!(dto.primary_image_url.as_deref(), Some("/images/plants/2.jpg"));

        let dto = PlantDto::assemble(plant(), vec![], None, vec![]);
        assert_eq!(dto.primary_image_url, None);
        assert!(dto.image_urls.is_empty());
    }

    #[test]
    fn dto_without_stock_is_out_of_stock() {
        let dto = PlantDto::assemble(plant(), vec![], None, vec!["shrubs".into()]);
        assert!(!dto.in_stock);
        assert_eq!(dto.quantity_available, 0);
        assert!(dto.seed_packet_sizes.is_empty());
        assert!(dto.plant_pot_sizes.is_empty());
        assert_eq!(dto.category_slugs, vec!["shrubs"]);
    }

    #[test]
    fn dto_with_stock() {
        let stock = Stock {
            plant_id: Uuid::from_u128(1),
            seed_packet_sizes: Json(vec![0.5, 1.0, 2.0]),
            plant_pot_sizes: Json(vec![4, 6]),
            quantity_available: 50,
        };
        let dto = PlantDto::assemble(plant(), vec![], Some(&stock), vec![]);
        assert!(dto.in_stock);
        assert_eq!(dto.quantity_available, 50);
        assert_eq!(dto.seed_packet_sizes, vec![0.5, 1.0, 2.0]);
        assert_eq!(dto.plant_pot_sizes, vec![4, 6]);
    }

    #[test]
    fn edit_model_accepts_valid_input() {
        assert!(edit_model().validate().is_ok());
    }

    #[test]
    fn edit_model_requires_common_name() {
        let model = PlantEditModel { common_name: "   ".into(), ..edit_model() };
        let errors = model.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("common_name"));
    }

    #[test]
    fn edit_model_length_limits() {
        let model = PlantEditModel {
            common_name: "x".repeat(201),
            description: Some("d".repeat(4001)),
            life_cycle: Some("l".repeat(51)),
            size: Some("s".repeat(101)),
            ..edit_model()
        };
        let errors = model.validate().unwrap_err();
        let fields = errors.field_errors();
        for field in ["common_name", "description", "life_cycle", "size"] {
            assert!(fields.contains_key(field), "{field} should fail");
        }
    }

    #[test]
    fn edit_model_price_and_quantity_ranges() {
        let free = PlantEditModel { price_cents: 0, ..edit_model() };
        assert!(free.validate().is_err());

        let too_dear = PlantEditModel { price_cents: 1_000_000, ..edit_model() };
        assert!(too_dear.validate().is_err());

        let bounds = PlantEditModel { price_cents: 999_999, quantity_available: 0, ..edit_model() };
        assert!(bounds.validate().is_ok());

        let negative = PlantEditModel { quantity_available: -1, ..edit_model() };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn edit_model_sizes_must_be_positive() {
        let seeds = PlantEditModel { seed_packet_sizes: vec![0.5, 0.0], ..edit_model() };
        assert!(seeds.validate().is_err());

        let pots = PlantEditModel { plant_pot_sizes: vec![4, -6], ..edit_model() };
        assert!(pots.validate().is_err());
    }

    #[test]
    fn edit_model_round_trips_a_plant() {
        let model = PlantEditModel::from_plant(plant(), None, Some("/a.jpg".into()));
        assert_eq!(model.id, Some(Uuid::from_u128(1)));
        assert_eq!(model.price_cents, 1299);
        assert_eq!(model.quantity_available, 0);
        assert_eq!(model.primary_image(), Some("/a.jpg".to_string()));
        assert!(model.validate().is_ok());
    }

    #[test]
    fn blank_primary_image_is_ignored() {
        let model = PlantEditModel { primary_image_url: Some("  ".into()), ..edit_model() };
        assert_eq!(model.primary_image(), None);
    }

    #[test]
    fn edit_model_json_defaults() {
        let model: PlantEditModel =
            serde_json::from_str(r#"{"common_name":"Tickseed","price_cents":399}"#).unwrap();
        assert!(model.is_active);
        assert!(!model.edible);
        assert_eq!(model.quantity_available, 0);
        assert!(model.seed_packet_sizes.is_empty());
    }

    #[test]
    fn missing_required_fields_reach_validation() {
        let model: PlantEditModel = serde_json::from_str("{}").unwrap();
        let errors = model.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("common_name"));
        assert!(fields.contains_key("price_cents"));
    }
}
