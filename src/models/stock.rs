//! Stock model

use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Stock {
    pub plant_id: Uuid,
    /// Seed packet sizes in ounces
    pub seed_packet_sizes: Json<Vec<f64>>,
    /// Pot sizes in inches
    pub plant_pot_sizes: Json<Vec<i32>>,
    pub quantity_available: i32,
}

impl Stock {
    pub fn in_stock(&self) -> bool {
        self.quantity_available > 0
    }

    pub async fn find_by_plant(pool: &PgPool, plant_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Stock>("SELECT * FROM stocks WHERE plant_id = $1")
            .bind(plant_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_plants(pool: &PgPool, plant_ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Stock>("SELECT * FROM stocks WHERE plant_id = ANY($1)")
            .bind(plant_ids)
            .fetch_all(pool)
            .await
    }

    pub async fn upsert(
        conn: &mut PgConnection,
        plant_id: Uuid,
        quantity_available: i32,
        seed_packet_sizes: &[f64],
        plant_pot_sizes: &[i32],
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Stock>(
            r#"
            INSERT INTO stocks (plant_id, quantity_available, seed_packet_sizes, plant_pot_sizes)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (plant_id) DO UPDATE SET
                quantity_available = EXCLUDED.quantity_available,
                seed_packet_sizes = EXCLUDED.seed_packet_sizes,
                plant_pot_sizes = EXCLUDED.plant_pot_sizes
            RETURNING *
            "#
        )
        .bind(plant_id)
        .bind(quantity_available)
        .bind(Json(seed_packet_sizes))
        .bind(Json(plant_pot_sizes))
        .fetch_one(conn)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_stock_requires_positive_quantity() {
        let mut stock = Stock {
            plant_id: Uuid::nil(),
            seed_packet_sizes: Json(vec![0.5, 1.0]),
            plant_pot_sizes: Json(vec![4, 6]),
            quantity_available: 0,
        };
        assert!(!stock.in_stock());

        stock.quantity_available = 1;
        assert!(stock.in_stock());
    }
}
