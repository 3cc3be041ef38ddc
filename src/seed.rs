//! Development seed data

use sqlx::PgPool;

use crate::models::{slugify, Category, CreateCategory, Plant, PlantEditModel, PlantImage, Stock};

struct SeedPlant {
    common_name: &'static str,
    latin_name: &'static str,
    description: &'static str,
    life_cycle: &'static str,
    size: &'static str,
    soil_moisture: &'static str,
    sun_exposure: &'static str,
    price_cents: i32,
    edible: bool,
    water_needs: &'static str,
    cold_tolerance: &'static str,
    image: (&'static str, &'static str),
    quantity: i32,
    seed_packets: &'static [f64],
    pots: &'static [i32],
    categories: &'static [&'static str],
}

const SEED_CATEGORIES: &[(&str, &str)] = &[
    ("Wildflowers", "Annual and perennial native wildflowers"),
    ("Shrubs", "Woody natives for hedges and wildlife gardens"),
    ("Wetland", "Plants for rain gardens, pond edges and wet areas"),
];

const SEED_PLANTS: &[SeedPlant] = &[
    SeedPlant {
        common_name: "Blanket Flower",
        latin_name: "Gaillardia pulchella",
        description: "A vibrant Florida native wildflower with red and yellow daisy-like blooms. Extremely drought tolerant and attracts butterflies.",
        life_cycle: "Annual",
        size: "12-24 inches",
        soil_moisture: "Dry to Medium",
        sun_exposure: "Full Sun",
        price_cents: 499,
        edible: false,
        water_needs: "Low",
        cold_tolerance: "Zone 8-11",
        image: ("/images/plants/blanket-flower.jpg", "Blanket Flower bloom"),
        quantity: 50,
        seed_packets: &[0.5, 1.0, 2.0],
        pots: &[4, 6],
        categories: &["wildflowers"],
    },
    SeedPlant {
        common_name: "Coontie",
        latin_name: "Zamia integrifolia",
        description: "Florida's only native cycad, an ancient palm-like plant. Host plant for the Atala butterfly. Very low maintenance once established.",
        life_cycle: "Perennial",
        size: "2-3 feet",
        soil_moisture: "Dry to Medium",
        sun_exposure: "Part Shade",
        price_cents: 2499,
        edible: false,
        water_needs: "Low",
        cold_tolerance: "Zone 8-11",
        image: ("/images/plants/coontie.jpg", "Coontie plant"),
        quantity: 15,
        seed_packets: &[],
        pots: &[6, 10],
        categories: &["shrubs"],
    },
    SeedPlant {
        common_name: "Firebush",
        latin_name: "Hamelia patens",
        description: "Stunning native shrub with tubular orange-red flowers that bloom year-round. A hummingbird and butterfly magnet!",
        life_cycle: "Perennial",
        size: "6-12 feet",
        soil_moisture: "Medium",
        sun_exposure: "Full Sun",
        price_cents: 1299,
        edible: true,
        water_needs: "Medium",
        cold_tolerance: "Zone 9-11",
        image: ("/images/plants/firebush.jpg", "Firebush flowers"),
        quantity: 25,
        seed_packets: &[],
        pots: &[4, 6, 10],
        categories: &["shrubs"],
    },
    SeedPlant {
        common_name: "Tickseed",
        latin_name: "Coreopsis leavenworthii",
        description: "Florida's state wildflower! Bright yellow blooms on delicate stems. Self-seeds readily and provides nectar for pollinators.",
        life_cycle: "Annual",
        size: "12-24 inches",
        soil_moisture: "Medium to Wet",
        sun_exposure: "Full Sun",
        price_cents: 399,
        edible: false,
        water_needs: "Medium",
        cold_tolerance: "Zone 8-11",
        image: ("/images/plants/tickseed.jpg", "Tickseed yellow flowers"),
        quantity: 100,
        seed_packets: &[0.5, 1.0, 5.0],
        pots: &[4],
        categories: &["wildflowers"],
    },
    SeedPlant {
        common_name: "Simpson's Stopper",
        latin_name: "Myrcianthes fragrans",
        description: "Elegant native shrub with fragrant white flowers and edible orange berries. Excellent for hedges and wildlife gardens.",
        life_cycle: "Perennial",
        size: "6-20 feet",
        soil_moisture: "Dry to Medium",
        sun_exposure: "Part Shade",
        price_cents: 1899,
        edible: true,
        water_needs: "Low",
        cold_tolerance: "Zone 9-11",
        image: ("/images/plants/simpsons-stopper.jpg", "Simpson's Stopper berries"),
        quantity: 8,
        seed_packets: &[],
        pots: &[6, 10, 15],
        categories: &["shrubs"],
    },
    SeedPlant {
        common_name: "Blue Flag Iris",
        latin_name: "Iris virginica",
        description: "Beautiful native iris with violet-blue flowers. Perfect for rain gardens, pond edges, and wet areas.",
        life_cycle: "Perennial",
        size: "2-3 feet",
        soil_moisture: "Wet",
        sun_exposure: "Full Sun",
        price_cents: 999,
        edible: false,
        water_needs: "High",
        cold_tolerance: "Zone 5-9",
        image: ("/images/plants/blue-flag-iris.jpg", "Blue Flag Iris flower"),
        quantity: 0,
        seed_packets: &[],
        pots: &[4, 6],
        categories: &["wetland"],
    },
];

/// Seed the catalog when the plants table is empty
pub async fn seed_if_empty(pool: &PgPool) -> Result<bool, sqlx::Error> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM plants")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(false);
    }

    let mut tx = pool.begin().await?;

    let mut categories = Vec::with_capacity(SEED_CATEGORIES.len());
    for (order, (name, description)) in SEED_CATEGORIES.iter().enumerate() {
        let category = Category::create(
            &mut *tx,
            CreateCategory {
                name: name.to_string(),
                description: Some(description.to_string()),
                slug: None,
                display_order: Some(order as i32),
                is_active: Some(true),
            },
            slugify(name),
        )
        .await?;
        categories.push(category);
    }

    for seed in SEED_PLANTS {
        let model = seed.edit_model();
        let plant = Plant::create(&mut *tx, &model).await?;
        Stock::upsert(&mut *tx, plant.id, seed.quantity, seed.seed_packets, seed.pots).await?;

        let (url, alt) = seed.image;
        PlantImage::insert(&mut *tx, plant.id, url, Some(alt), 0, true).await?;

        let category_ids: Vec<_> = categories
            .iter()
            .filter(|c| seed.categories.contains(&c.slug.as_str()))
            .map(|c| c.id)
            .collect();
        Category::set_for_plant(&mut *tx, plant.id, &category_ids).await?;
    }

    tx.commit().await?;

    tracing::info!(
        "Seeded {} plants and {} categories",
        SEED_PLANTS.len(),
        categories.len()
    );
    Ok(true)
}

impl SeedPlant {
    fn edit_model(&self) -> PlantEditModel {
        PlantEditModel {
            id: None,
            common_name: self.common_name.to_string(),
            latin_name: Some(self.latin_name.to_string()),
            description: Some(self.description.to_string()),
            life_cycle: Some(self.life_cycle.to_string()),
            size: Some(self.size.to_string()),
            soil_moisture: Some(self.soil_moisture.to_string()),
            sun_exposure: Some(self.sun_exposure.to_string()),
            is_florida_native: true,
            price_cents: self.price_cents,
            edible: self.edible,
            water_needs: Some(self.water_needs.to_string()),
            cold_tolerance: Some(self.cold_tolerance.to_string()),
            is_active: true,
            quantity_available: self.quantity,
            seed_packet_sizes: self.seed_packets.to_vec(),
            plant_pot_sizes: self.pots.to_vec(),
            primary_image_url: Some(self.image.0.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn seed_plants_pass_admin_validation() {
        for seed in SEED_PLANTS {
            assert!(seed.edit_model().validate().is_ok(), "{}", seed.common_name);
        }
    }

    #[test]
    fn seed_categories_resolve() {
        let slugs: Vec<String> = SEED_CATEGORIES.iter().map(|(name, _)| slugify(name)).collect();
        for seed in SEED_PLANTS {
            for wanted in seed.categories {
                assert!(slugs.iter().any(|s| s == wanted), "{} -> {}", seed.common_name, wanted);
            }
        }
    }
}
