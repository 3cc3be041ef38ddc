//! Catalog filtering, sorting and pagination

use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

pub const DEFAULT_PAGE_SIZE: i64 = 12;
pub const DEFAULT_FEATURED_COUNT: i64 = 6;

/// Raw query-string filter for the public plant listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlantFilter {
    pub search: Option<String>,
    pub florida_native: Option<bool>,
    pub edible: Option<bool>,
    pub life_cycle: Option<String>,
    pub sun_exposure: Option<String>,
    pub water_needs: Option<String>,
    pub min_price_cents: Option<i32>,
    pub max_price_cents: Option<i32>,
    #[serde(default)]
    pub in_stock_only: bool,
    pub category: Option<String>,
    pub sort_by: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    NameAsc,
    NameDesc,
    PriceAsc,
    PriceDesc,
    Newest,
}

impl SortOrder {
    /// Unknown values fall back to name ascending
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "name_desc" => SortOrder::NameDesc,
            "price_asc" => SortOrder::PriceAsc,
            "price_desc" => SortOrder::PriceDesc,
            "newest" => SortOrder::Newest,
            _ => SortOrder::NameAsc,
        }
    }

    fn order_by(&self) -> &'static str {
        match self {
            SortOrder::NameAsc => "p.common_name ASC, p.id ASC",
            SortOrder::NameDesc => "p.common_name DESC, p.id ASC",
            SortOrder::PriceAsc => "p.price_cents ASC, p.id ASC",
            SortOrder::PriceDesc => "p.price_cents DESC, p.id ASC",
            SortOrder::Newest => "p.created_at DESC, p.id ASC",
        }
    }
}

/// Normalized listing query: blanks dropped, paging clamped
#[derive(Debug, Clone, PartialEq)]
pub struct PlantQuery {
    pub search: Option<String>,
    pub florida_native: Option<bool>,
    pub edible: Option<bool>,
    pub life_cycle: Option<String>,
    pub sun_exposure: Option<String>,
    pub water_needs: Option<String>,
    pub min_price_cents: Option<i32>,
    pub max_price_cents: Option<i32>,
    pub in_stock_only: bool,
    pub category: Option<String>,
    pub sort: SortOrder,
    pub page: i64,
    pub page_size: i64,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl PlantFilter {
    pub fn normalize(self, max_page_size: i64) -> PlantQuery {
        let max_page_size = max_page_size.max(1);

        PlantQuery {
            search: non_blank(self.search),
            florida_native: self.florida_native,
            edible: self.edible,
            life_cycle: non_blank(self.life_cycle),
            sun_exposure: non_blank(self.sun_exposure),
            water_needs: non_blank(self.water_needs),
            min_price_cents: self.min_price_cents,
            max_price_cents: self.max_price_cents,
            in_stock_only: self.in_stock_only,
            category: non_blank(self.category),
            sort: self.sort_by.as_deref().map(SortOrder::parse).unwrap_or_default(),
            page: self.page.unwrap_or(1).max(1),
            page_size: self
                .page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, max_page_size),
        }
    }
}

/// Featured plant count, clamped like a page size
pub fn featured_count(requested: Option<i64>, max_page_size: i64) -> i64 {
    requested
        .unwrap_or(DEFAULT_FEATURED_COUNT)
        .clamp(1, max_page_size.max(1))
}

/// Escape LIKE wildcards so the term matches literally
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl PlantQuery {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// `SELECT COUNT(*)` over the filtered set
    pub fn count_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM plants p WHERE p.is_active = true");
        self.push_conditions(&mut qb);
        qb
    }

    /// One sorted page of the filtered set
    pub fn page_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT p.* FROM plants p WHERE p.is_active = true");
        self.push_conditions(&mut qb);
        qb.push(" ORDER BY ");
        qb.push(self.sort.order_by());
        qb.push(" LIMIT ");
        qb.push_bind(self.page_size);
        qb.push(" OFFSET ");
        qb.push_bind(self.offset());
        qb
    }

    fn push_conditions(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        if let Some(search) = &self.search {
            let pattern = like_pattern(search);
            qb.push(" AND (p.common_name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\' OR p.latin_name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\' OR p.description ILIKE ");
            qb.push_bind(pattern);
            qb.push(" ESCAPE '\\')");
        }

        if let Some(native) = self.florida_native {
            qb.push(" AND p.is_florida_native = ");
            qb.push_bind(native);
        }

        if let Some(edible) = self.edible {
            qb.push(" AND p.edible = ");
            qb.push_bind(edible);
        }

        if let Some(life_cycle) = &self.life_cycle {
            qb.push(" AND p.life_cycle = ");
            qb.push_bind(life_cycle.clone());
        }

        if let Some(sun) = &self.sun_exposure {
            qb.push(" AND p.sun_exposure = ");
            qb.push_bind(sun.clone());
        }

        if let Some(water) = &self.water_needs {
            qb.push(" AND p.water_needs = ");
            qb.push_bind(water.clone());
        }

        if let Some(min) = self.min_price_cents {
            qb.push(" AND p.price_cents >= ");
            qb.push_bind(min);
        }

        if let Some(max) = self.max_price_cents {
            qb.push(" AND p.price_cents <= ");
            qb.push_bind(max);
        }

        if self.in_stock_only {
            qb.push(
                " AND EXISTS (SELECT 1 FROM stocks s WHERE s.plant_id = p.id AND s.quantity_available > 0)",
            );
        }

        if let Some(slug) = &self.category {
            qb.push(
                " AND EXISTS (SELECT 1 FROM plant_categories pc \
                 JOIN categories c ON c.id = pc.category_id \
                 WHERE pc.plant_id = p.id AND c.is_active = true AND c.slug = ",
            );
            qb.push_bind(slug.clone());
            qb.push(")");
        }
    }
}

/// One page of results plus navigation metadata
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if page_size > 0 {
            (total_count + page_size - 1) / page_size
        } else {
            0
        };

        Self {
            items,
            total_count,
            page,
            page_size,
            total_pages,
            has_previous: page > 1,
            has_next: page < total_pages,
        }
    }
}
