//! Category model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgExecutor, PgPool};
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

use super::plant::not_blank;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub slug: String,
    pub display_order: i32,
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategory {
    #[validate(
        length(max = 100, message = "Name cannot exceed 100 characters"),
        custom(function = "not_blank", message = "Name is required")
    )]
    #[serde(default)]
    pub name: String,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    #[validate(length(max = 100, message = "Slug cannot exceed 100 characters"))]
    pub slug: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategory {
    #[validate(
        length(max = 100, message = "Name cannot exceed 100 characters"),
        custom(function = "not_blank", message = "Name cannot be blank")
    )]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    #[validate(length(max = 100, message = "Slug cannot exceed 100 characters"))]
    pub slug: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SetPlantCategories {
    pub category_ids: Vec<Uuid>,
}

/// URL slug: lowercase ASCII alphanumerics joined by single dashes
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

impl Category {
    pub async fn create<'e, E>(executor: E, data: CreateCategory, slug: String) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description, slug, display_order, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#
        )
        .bind(data.name.trim())
        .bind(&data.description)
        .bind(&slug)
        .bind(data.display_order.unwrap_or(0))
        .bind(data.is_active.unwrap_or(true))
        .fetch_one(executor)
        .await
    }

    pub async fn list_active(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE is_active = true ORDER BY display_order, name"
        )
        .fetch_all(pool)
        .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY display_order, name")
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateCategory,
        slug: Option<String>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                slug = COALESCE($4, slug),
                display_order = COALESCE($5, display_order),
                is_active = COALESCE($6, is_active)
            WHERE id = $1
            RETURNING *
            "#
        )
        .bind(id)
        .bind(data.name.as_deref().map(str::trim))
        .bind(&data.description)
        .bind(&slug)
        .bind(data.display_order)
        .bind(data.is_active)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Category slugs per plant, in category display order
    pub async fn slugs_by_plants(
        pool: &PgPool,
        plant_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, String)>, sqlx::Error> {
        sqlx::query_as::<_, (Uuid, String)>(
            r#"
            SELECT pc.plant_id, c.slug
            FROM plant_categories pc
            JOIN categories c ON c.id = pc.category_id
            WHERE pc.plant_id = ANY($1)
            ORDER BY c.display_order, c.name
            "#
        )
        .bind(plant_ids)
        .fetch_all(pool)
        .await
    }

    /// Replace a plant's category links. Returns the ids that do not exist.
    pub async fn set_for_plant(
        conn: &mut PgConnection,
        plant_id: Uuid,
        category_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        let wanted: Vec<Uuid> = {
            let mut seen = HashSet::new();
            category_ids.iter().copied().filter(|id| seen.insert(*id)).collect()
        };

        let existing: HashSet<Uuid> = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM categories WHERE id = ANY($1)"
        )
        .bind(&wanted)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .collect();

        let unknown: Vec<Uuid> = wanted.iter().copied().filter(|id| !existing.contains(id)).collect();
        if !unknown.is_empty() {
            return Ok(unknown);
        }

        sqlx::query("DELETE FROM plant_categories WHERE plant_id = $1")
            .bind(plant_id)
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO plant_categories (plant_id, category_id)
            SELECT $1, UNNEST($2::uuid[])
            "#
        )
        .bind(plant_id)
        .bind(&wanted)
        .execute(&mut *conn)
        .await?;

        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Wildflowers"), "wildflowers");
        assert_eq!(slugify("Shrubs & Hedges"), "shrubs-hedges");
        assert_eq!(slugify("  Rain -- Garden  "), "rain-garden");
        assert_eq!(slugify("Zone 9-11 Natives!"), "zone-9-11-natives");
        assert_eq!(slugify("Simpson's Stopper"), "simpson-s-stopper");
    }

    #[test]
    fn slugify_can_be_empty() {
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("Ñandú"), "and");
    }

    #[test]
    fn create_category_validation() {
        let ok = CreateCategory {
            name: "Wetland".into(),
            description: None,
            slug: None,
            display_order: None,
            is_active: None,
        };
        assert!(ok.validate().is_ok());

        let bad = CreateCategory {
            name: String::new(),
            description: Some("x".repeat(501)),
            slug: None,
            display_order: None,
            is_active: None,
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("description"));
    }

    #[test]
    fn whitespace_name_is_rejected() {
        let create = CreateCategory {
            name: "   ".into(),
            description: None,
            slug: Some("wetland".into()),
            display_order: None,
            is_active: None,
        };
        assert!(create.validate().unwrap_err().field_errors().contains_key("name"));

        let rename = UpdateCategory {
            name: Some(" \t ".into()),
            description: None,
            slug: None,
            display_order: None,
            is_active: None,
        };
        assert!(rename.validate().unwrap_err().field_errors().contains_key("name"));

        let untouched = UpdateCategory {
            name: None,
            description: None,
            slug: None,
            display_order: Some(2),
            is_active: None,
        };
        assert!(untouched.validate().is_ok());
    }

    #[test]
    fn missing_name_reaches_validation() {
        let create: CreateCategory = serde_json::from_str(r#"{"slug":"shrubs"}"#).unwrap();
        assert!(create.validate().unwrap_err().field_errors().contains_key("name"));
    }
}
