//! Plant image model and ordering rules
//!
//! Every plant with images has exactly one primary image, and `display_order`
//! is dense (`0..n`) after deletes and reorders. The rules are computed over an
//! in-memory snapshot of the plant's images ([`Slot`]) and only the rows that
//! changed are written back.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlantImage {
    pub id: Uuid,
    pub plant_id: Uuid,
    pub image_url: String,
    pub alt_text: Option<String>,
    pub display_order: i32,
    pub is_primary: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddImageRequest {
    #[validate(length(min = 1, max = 500, message = "Image URL is required and cannot exceed 500 characters"))]
    #[serde(default)]
    pub image_url: String,
    #[validate(length(max = 200, message = "Alt text cannot exceed 200 characters"))]
    pub alt_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderImagesRequest {
    pub image_ids: Vec<Uuid>,
}

/// Ordering-relevant view of one image row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub id: Uuid,
    pub display_order: i32,
    pub is_primary: bool,
}

impl From<&PlantImage> for Slot {
    fn from(image: &PlantImage) -> Self {
        Slot {
            id: image.id,
            display_order: image.display_order,
            is_primary: image.is_primary,
        }
    }
}

fn sorted(images: &[Slot]) -> Vec<Slot> {
    let mut slots = images.to_vec();
    slots.sort_by_key(|s| (s.display_order, s.id));
    slots
}

/// Display order for an image appended to `images`
pub fn next_display_order(images: &[Slot]) -> i32 {
    images
        .iter()
        .map(|s| s.display_order)
        .max()
        .map_or(0, |max| max + 1)
}

/// Layout after removing `removed`: renumbered densely, and if no primary
/// remains the first image takes over.
pub fn after_removal(images: &[Slot], removed: Uuid) -> Vec<Slot> {
    let mut remaining: Vec<Slot> = sorted(images)
        .into_iter()
        .filter(|s| s.id != removed)
        .collect();

    for (index, slot) in remaining.iter_mut().enumerate() {
        slot.display_order = index as i32;
    }

    let mut seen_primary = false;
    for slot in remaining.iter_mut() {
        if slot.is_primary {
            if seen_primary {
                slot.is_primary = false;
            }
            seen_primary = true;
        }
    }
    if !seen_primary {
        if let Some(first) = remaining.first_mut() {
            first.is_primary = true;
        }
    }

    remaining
}

/// Layout with `primary` as the only primary image, or `None` if it is not
/// one of `images`.
pub fn with_primary(images: &[Slot], primary: Uuid) -> Option<Vec<Slot>> {
    if !images.iter().any(|s| s.id == primary) {
        return None;
    }
    Some(
        sorted(images)
            .into_iter()
            .map(|s| Slot { is_primary: s.id == primary, ..s })
            .collect(),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReorderError {
    #[error("image {0} listed more than once")]
    Duplicate(Uuid),
    #[error("image {0} does not belong to this plant")]
    Unknown(Uuid),
    #[error("{0} image(s) missing from the new order")]
    Missing(usize),
}

/// Layout following `order`, which must be a permutation of the image ids.
pub fn reordered(images: &[Slot], order: &[Uuid]) -> Result<Vec<Slot>, ReorderError> {
    let known: HashSet<Uuid> = images.iter().map(|s| s.id).collect();
    let mut seen = HashSet::with_capacity(order.len());

    for id in order {
        if !known.contains(id) {
            return Err(ReorderError::Unknown(*id));
        }
        if !seen.insert(*id) {
            return Err(ReorderError::Duplicate(*id));
        }
    }
    if seen.len() != known.len() {
        return Err(ReorderError::Missing(known.len() - seen.len()));
    }

    Ok(order
        .iter()
        .enumerate()
        .filter_map(|(index, id)| {
            images
                .iter()
                .find(|s| s.id == *id)
                .map(|s| Slot { display_order: index as i32, ..*s })
        })
        .collect())
}

/// Plan for making one image the only primary. With `existing` set and
/// present, that image is promoted in place. Otherwise every current image is
/// demoted and the returned `display_order` is where the new primary goes.
pub fn promotion(images: &[Slot], existing: Option<Uuid>) -> (Option<i32>, Vec<Slot>) {
    if let Some(after) = existing.and_then(|id| with_primary(images, id)) {
        return (None, after);
    }

    let demoted = sorted(images)
        .into_iter()
        .map(|s| Slot { is_primary: false, ..s })
        .collect();
    (Some(next_display_order(images)), demoted)
}

/// URL shown for a plant: the flagged primary image, otherwise the first by
/// display order
pub fn primary_url(images: &[PlantImage]) -> Option<String> {
    images
        .iter()
        .filter(|i| i.is_primary)
        .min_by_key(|i| (i.display_order, i.id))
        .or_else(|| images.iter().min_by_key(|i| (i.display_order, i.id)))
        .map(|i| i.image_url.clone())
}

/// Slots in `after` whose order or primary flag differ from `before`
pub fn changed(before: &[Slot], after: &[Slot]) -> Vec<Slot> {
    after
        .iter()
        .filter(|slot| !before.contains(slot))
        .copied()
        .collect()
}

impl PlantImage {
    pub async fn list_by_plant(pool: &PgPool, plant_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PlantImage>(
            "SELECT * FROM plant_images WHERE plant_id = $1 ORDER BY display_order, id"
        )
        .bind(plant_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list_by_plants(pool: &PgPool, plant_ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PlantImage>(
            "SELECT * FROM plant_images WHERE plant_id = ANY($1) ORDER BY plant_id, display_order, id"
        )
        .bind(plant_ids)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, PlantImage>("SELECT * FROM plant_images WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Snapshot of a plant's images, locked until the transaction ends
    pub async fn lock_slots(conn: &mut PgConnection, plant_id: Uuid) -> Result<Vec<Slot>, sqlx::Error> {
        let images = sqlx::query_as::<_, PlantImage>(
            "SELECT * FROM plant_images WHERE plant_id = $1 ORDER BY display_order, id FOR UPDATE"
        )
        .bind(plant_id)
        .fetch_all(conn)
        .await?;

        Ok(images.iter().map(Slot::from).collect())
    }

    pub async fn insert(
        conn: &mut PgConnection,
        plant_id: Uuid,
        image_url: &str,
        alt_text: Option<&str>,
        display_order: i32,
        is_primary: bool,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, PlantImage>(
            r#"
            INSERT INTO plant_images (plant_id, image_url, alt_text, display_order, is_primary)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#
        )
        .bind(plant_id)
        .bind(image_url)
        .bind(alt_text)
        .bind(display_order)
        .bind(is_primary)
        .fetch_one(conn)
        .await
    }

    /// Append an image; the first image of a plant becomes primary
    pub async fn append(
        conn: &mut PgConnection,
        plant_id: Uuid,
        image_url: &str,
        alt_text: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        let slots = Self::lock_slots(&mut *conn, plant_id).await?;
        let order = next_display_order(&slots);
        Self::insert(conn, plant_id, image_url, alt_text, order, slots.is_empty()).await
    }

    /// Make the image with `image_url` the only primary, appending it if the
    /// plant has no such image
    pub async fn promote_url(
        conn: &mut PgConnection,
        plant_id: Uuid,
        image_url: &str,
    ) -> Result<(), sqlx::Error> {
        let slots = Self::lock_slots(&mut *conn, plant_id).await?;

        let existing = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM plant_images
            WHERE plant_id = $1 AND image_url = $2
            ORDER BY display_order, id
            LIMIT 1
            "#
        )
        .bind(plant_id)
        .bind(image_url)
        .fetch_optional(&mut *conn)
        .await?;

        let (append_at, after) = promotion(&slots, existing);
        Self::apply_slots(&mut *conn, &slots, &after).await?;

        if let Some(display_order) = append_at {
            Self::insert(conn, plant_id, image_url, None, display_order, true).await?;
        }
        Ok(())
    }

    pub async fn delete(conn: &mut PgConnection, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM plant_images WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Write back the slots whose order or primary flag changed
    pub async fn apply_slots(
        conn: &mut PgConnection,
        before: &[Slot],
        after: &[Slot],
    ) -> Result<usize, sqlx::Error> {
        let updates = changed(before, after);
        for slot in &updates {
            sqlx::query("UPDATE plant_images SET display_order = $2, is_primary = $3 WHERE id = $1")
                .bind(slot.id)
                .bind(slot.display_order)
                .bind(slot.is_primary)
                .execute(&mut *conn)
                .await?;
        }
        Ok(updates.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(n: usize, primary: usize) -> Vec<Slot> {
        (0..n)
            .map(|i| Slot {
                id: Uuid::from_u128(i as u128 + 1),
                display_order: i as i32,
                is_primary: i == primary,
            })
            .collect()
    }

    fn primaries(slots: &[Slot]) -> Vec<Uuid> {
        slots.iter().filter(|s| s.is_primary).map(|s| s.id).collect()
    }

    #[test]
    fn appended_images_go_last() {
        assert_eq!(next_display_order(&[]), 0);
        assert_eq!(next_display_order(&slots(3, 0)), 3);

        let gappy = vec![
            Slot { id: Uuid::from_u128(1), display_order: 0, is_primary: true },
            Slot { id: Uuid::from_u128(2), display_order: 7, is_primary: false },
        ];
        assert_eq!(next_display_order(&gappy), 8);
    }

    #[test]
    fn removing_primary_promotes_first_remaining() {
        let before = slots(3, 0);
        let after = after_removal(&before, before[0].id);

        assert_eq!(after.len(), 2);
        assert_eq!(primaries(&after), vec![before[1].id]);
        assert_eq!(after[0].display_order, 0);
        assert_eq!(after[1].display_order, 1);
    }

    #[test]
    fn removing_non_primary_keeps_primary_and_compacts() {
        let before = slots(4, 2);
        let after = after_removal(&before, before[1].id);

        assert_eq!(primaries(&after), vec![before[2].id]);
        let orders: Vec<i32> = after.iter().map(|s| s.display_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(after[1].id, before[2].id);

        // only the rows behind the gap move
        let updates = changed(&before, &after);
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|s| s.id != before[0].id));
    }

    #[test]
    fn removing_last_image_leaves_nothing() {
        let before = slots(1, 0);
        assert!(after_removal(&before, before[0].id).is_empty());
    }

    #[test]
    fn removal_repairs_missing_or_duplicate_primaries() {
        let mut before = slots(3, 99);
        let after = after_removal(&before, Uuid::from_u128(42));
        assert_eq!(primaries(&after), vec![before[0].id]);

        before[1].is_primary = true;
        before[2].is_primary = true;
        let after = after_removal(&before, before[0].id);
        assert_eq!(primaries(&after), vec![before[1].id]);
    }

    #[test]
    fn set_primary_is_exclusive() {
        let before = slots(3, 0);
        let after = with_primary(&before, before[2].id).unwrap();
        assert_eq!(primaries(&after), vec![before[2].id]);
        assert_eq!(changed(&before, &after).len(), 2);

        assert!(with_primary(&before, Uuid::from_u128(77)).is_none());
    }

    #[test]
    fn promoting_a_known_url_keeps_a_single_primary() {
        let before = slots(3, 0);
        let (append_at, after) = promotion(&before, Some(before[2].id));

        assert_eq!(append_at, None);
        assert_eq!(primaries(&after), vec![before[2].id]);
        let orders: Vec<i32> = after.iter().map(|s| s.display_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn promoting_a_new_url_appends_the_only_primary() {
        let before = slots(3, 1);
        let (append_at, after) = promotion(&before, None);

        assert_eq!(append_at, Some(3));
        assert!(primaries(&after).is_empty());
        assert_eq!(changed(&before, &after), vec![Slot { is_primary: false, ..before[1] }]);

        // the appended image is inserted as primary
        let mut layout = after;
        layout.push(Slot { id: Uuid::from_u128(900), display_order: 3, is_primary: true });
        assert_eq!(primaries(&layout), vec![Uuid::from_u128(900)]);
    }

    #[test]
    fn promoting_onto_an_empty_plant() {
        let (append_at, after) = promotion(&[], None);
        assert_eq!(append_at, Some(0));
        assert!(after.is_empty());

        // a stale id falls back to appending
        let before = slots(2, 0);
        let (append_at, after) = promotion(&before, Some(Uuid::from_u128(404)));
        assert_eq!(append_at, Some(2));
        assert!(primaries(&after).is_empty());
    }

    #[test]
    fn reorder_errors_describe_the_problem() {
        let id = Uuid::from_u128(7);
        assert_eq!(
            ReorderError::Duplicate(id).to_string(),
            format!("image {} listed more than once", id)
        );
        assert_eq!(ReorderError::Missing(2).to_string(), "2 image(s) missing from the new order");
    }

    #[test]
    fn reorder_follows_the_given_permutation() {
        let before = slots(3, 1);
        let order = vec![before[2].id, before[0].id, before[1].id];
        let after = reordered(&before, &order).unwrap();

        let ids: Vec<Uuid> = after.iter().map(|s| s.id).collect();
        assert_eq!(ids, order);
        let orders: Vec<i32> = after.iter().map(|s| s.display_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(primaries(&after), vec![before[1].id]);
    }

    #[test]
    fn reorder_rejects_anything_but_a_permutation() {
        let before = slots(3, 0);

        let missing = vec![before[0].id, before[1].id];
        assert_eq!(reordered(&before, &missing), Err(ReorderError::Missing(1)));

        let dup = vec![before[0].id, before[0].id, before[1].id];
        assert_eq!(reordered(&before, &dup), Err(ReorderError::Duplicate(before[0].id)));

        let stranger = Uuid::from_u128(500);
        let unknown = vec![before[0].id, before[1].id, stranger];
        assert_eq!(reordered(&before, &unknown), Err(ReorderError::Unknown(stranger)));
    }

    #[test]
    fn add_image_request_validation() {
        let ok = AddImageRequest { image_url: "/images/plants/a.jpg".into(), alt_text: None };
        assert!(ok.validate().is_ok());

        let empty = AddImageRequest { image_url: String::new(), alt_text: None };
        assert!(empty.validate().is_err());

        let long_alt = AddImageRequest {
            image_url: "/a.jpg".into(),
            alt_text: Some("x".repeat(201)),
        };
        assert!(long_alt.validate().is_err());
    }
}
