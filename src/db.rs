//! Database module - PostgreSQL connection and migrations

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Multi-statement script, so it goes through the simple query protocol
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Plants
CREATE TABLE IF NOT EXISTS plants (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    common_name VARCHAR(200) NOT NULL,
    latin_name VARCHAR(200),
    description VARCHAR(4000),
    life_cycle VARCHAR(50),
    size VARCHAR(100),
    soil_moisture VARCHAR(50),
    sun_exposure VARCHAR(50),
    is_florida_native BOOLEAN NOT NULL DEFAULT false,
    price_cents INT NOT NULL CHECK (price_cents > 0),
    edible BOOLEAN NOT NULL DEFAULT false,
    water_needs VARCHAR(50),
    cold_tolerance VARCHAR(50),
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ
);

-- Plant images (ordered, one primary per plant)
CREATE TABLE IF NOT EXISTS plant_images (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    plant_id UUID NOT NULL REFERENCES plants(id) ON DELETE CASCADE,
    image_url VARCHAR(500) NOT NULL,
    alt_text VARCHAR(200),
    display_order INT NOT NULL DEFAULT 0,
    is_primary BOOLEAN NOT NULL DEFAULT false
);

-- Stock (one row per plant)
CREATE TABLE IF NOT EXISTS stocks (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    plant_id UUID NOT NULL UNIQUE REFERENCES plants(id) ON DELETE CASCADE,
    seed_packet_sizes JSONB NOT NULL DEFAULT '[]'::jsonb,
    plant_pot_sizes JSONB NOT NULL DEFAULT '[]'::jsonb,
    quantity_available INT NOT NULL DEFAULT 0 CHECK (quantity_available >= 0)
);

-- Categories
CREATE TABLE IF NOT EXISTS categories (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(100) NOT NULL,
    description VARCHAR(500),
    slug VARCHAR(100) NOT NULL,
    display_order INT NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true
);

-- Plant <-> Category
CREATE TABLE IF NOT EXISTS plant_categories (
    plant_id UUID NOT NULL REFERENCES plants(id) ON DELETE CASCADE,
    category_id UUID NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
    PRIMARY KEY (plant_id, category_id)
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_plants_common_name ON plants(common_name);
CREATE INDEX IF NOT EXISTS idx_plants_is_active ON plants(is_active);
CREATE INDEX IF NOT EXISTS idx_plants_florida_native ON plants(is_florida_native);
CREATE INDEX IF NOT EXISTS idx_plant_images_plant ON plant_images(plant_id);
CREATE INDEX IF NOT EXISTS idx_plant_categories_category ON plant_categories(category_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_categories_slug ON categories(slug);
"#;

#[cfg(test)]
mod tests {
    use super::SCHEMA_SQL;

    #[test]
    fn schema_is_idempotent() {
        for line in SCHEMA_SQL.lines().map(str::trim) {
            if line.starts_with("CREATE TABLE") {
                assert!(line.starts_with("CREATE TABLE IF NOT EXISTS"), "{line}");
            }
            if line.starts_with("CREATE INDEX") || line.starts_with("CREATE UNIQUE INDEX") {
                assert!(line.contains("IF NOT EXISTS"), "{line}");
            }
        }
    }

    #[test]
    fn children_cascade_with_their_plant() {
        for table in ["plant_images", "stocks", "plant_categories"] {
            let start = SCHEMA_SQL
                .find(&format!("CREATE TABLE IF NOT EXISTS {table}"))
                .expect("table present");
            let body = &SCHEMA_SQL[start..];
            let end = body.find(");").expect("table terminated");
            assert!(
                body[..end].contains("REFERENCES plants(id) ON DELETE CASCADE"),
                "{table} must cascade"
            );
        }
    }
}
