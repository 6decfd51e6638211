//! Category models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a category record from the `categorys` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Category {
    pub id: i32,
    pub category_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Category row joined through `blogs_categorys`, tagged with the blog it
/// belongs to. Used to attach categories to many blogs with one query.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BlogCategoryRow {
    pub blog_id: i32,
    pub id: i32,
    pub category_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BlogCategoryRow> for Category {
    fn from(row: BlogCategoryRow) -> Self {
        Self {
            id: row.id,
            category_name: row.category_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Request body for creating a category.
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub category_name: String,
}
