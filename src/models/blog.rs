//! Blog data models and API request types.
//!
//! This module defines:
//! - `BlogRow`: flat row produced by the blogs ⋈ users query
//! - `Blog`: nested entity returned to clients (author + categories)
//! - `BlogRequest`: admin payload for creating or editing a blog

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::category::{BlogCategoryRow, Category};

/// One row of `blogs LEFT JOIN users`.
///
/// The author columns are nullable because of the left join.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BlogRow {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub createdby_id: i32,
    pub description: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_id: Option<i32>,
    pub author_first_name: Option<String>,
}

/// Partial author eagerly joined onto every blog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Author {
    pub id: i32,
    pub first_name: String,
}

/// A blog with its author and category set.
///
/// `categories` is always rebuilt from `blogs_categorys` on read, ordered by
/// category name. `category_ids` is the same set as bare ids, in the same order.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": 1,
///   "title": "My Blog",
///   "slug": "my-blog",
///   "createdby_id": 1,
///   "created_by": { "id": 1, "first_name": "Jack" },
///   "description": "My description",
///   "content": "...",
///   "categories": [{ "id": 1, "category_name": "Fantasy", "...": "..." }],
///   "category_ids": [1],
///   "created_at": "2025-12-20T10:00:00Z",
///   "updated_at": "2025-12-20T10:00:00Z"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Blog {
    pub id: i32,
    pub title: String,
    pub slug: String,
    #[serde(rename = "createdby_id")]
    pub created_by_id: i32,
    pub created_by: Option<Author>,
    pub description: String,
    pub content: String,
    pub categories: Vec<Category>,
    pub category_ids: Vec<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Blog {
    /// Build the nested entity from a flat row and its categories.
    ///
    /// `categories` must already be ordered by name.
    pub fn from_row(row: BlogRow, categories: Vec<Category>) -> Self {
        let created_by = match (row.author_id, row.author_first_name) {
            (Some(id), Some(first_name)) => Some(Author { id, first_name }),
            _ => None,
        };
        let category_ids = categories.iter().map(|c| c.id).collect();

        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            created_by_id: row.createdby_id,
            created_by,
            description: row.description,
            content: row.content,
            categories,
            category_ids,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Attach batched category rows to their blogs.
///
/// Blog order is kept as given; category order within each blog follows the
/// order of `category_rows`.
pub fn assemble_blogs(rows: Vec<BlogRow>, category_rows: Vec<BlogCategoryRow>) -> Vec<Blog> {
    let mut by_blog: HashMap<i32, Vec<Category>> = HashMap::new();
    for row in category_rows {
        by_blog.entry(row.blog_id).or_default().push(row.into());
    }

    rows.into_iter()
        .map(|row| {
            let categories = by_blog.remove(&row.id).unwrap_or_default();
            Blog::from_row(row, categories)
        })
        .collect()
}

/// Request body for the admin "save blog" endpoint.
///
/// `id` absent or 0 creates a blog authored by the caller, otherwise the blog
/// is updated. The slug and author are never taken from the client.
///
/// `category_ids` absent leaves an existing blog's categories untouched;
/// an empty list clears them.
///
/// # JSON Example
///
/// ```json
/// {
///   "title": "My Blog",
///   "description": "My description",
///   "content": "...",
///   "category_ids": [1, 2]
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct BlogRequest {
    #[serde(default)]
    pub id: i32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category_ids: Option<Vec<i32>>,
}

/// Query string for `GET /api/blogs/page`.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    10
}

/// Body for `POST /admin/blogs/delete` and `POST /admin/users/delete`.
#[derive(Debug, Deserialize)]
pub struct IdRequest {
    pub id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i32, title: &str) -> BlogRow {
        BlogRow {
            id,
            title: title.to_string(),
            slug: title.to_lowercase().replace(' ', "-"),
            createdby_id: 1,
            description: String::new(),
            content: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            author_id: Some(1),
            author_first_name: Some("Jack".to_string()),
        }
    }

    fn category_row(blog_id: i32, id: i32, name: &str) -> BlogCategoryRow {
        BlogCategoryRow {
            blog_id,
            id,
            category_name: name.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn assemble_groups_categories_per_blog_and_keeps_order() {
        let blogs = assemble_blogs(
            vec![row(2, "Alpha"), row(1, "Beta"), row(3, "Gamma")],
            vec![
                category_row(1, 2, "Fantasy"),
                category_row(2, 2, "Fantasy"),
                category_row(1, 6, "Horror"),
            ],
        );

        let titles: Vec<_> = blogs.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, ["Alpha", "Beta", "Gamma"]);

        assert_eq!(blogs[0].category_ids, vec![2]);
        assert_eq!(blogs[1].category_ids, vec![2, 6]);
        let names: Vec<_> = blogs[1]
            .categories
            .iter()
            .map(|c| c.category_name.as_str())
            .collect();
        assert_eq!(names, ["Fantasy", "Horror"]);
        assert!(blogs[2].categories.is_empty());
        assert!(blogs[2].category_ids.is_empty());
    }

    #[test]
    fn missing_author_yields_no_created_by() {
        let mut orphan = row(1, "Orphan");
        orphan.author_id = None;
        orphan.author_first_name = None;

        let blog = Blog::from_row(orphan, Vec::new());
        assert!(blog.created_by.is_none());
        assert_eq!(blog.created_by_id, 1);
    }

    #[test]
    fn blog_serializes_author_id_as_createdby_id() {
        let blog = Blog::from_row(row(1, "My Blog"), Vec::new());
        let json = serde_json::to_value(&blog).unwrap();

        assert_eq!(json["createdby_id"], 1);
        assert_eq!(json["created_by"]["first_name"], "Jack");
        assert!(json["categories"].as_array().unwrap().is_empty());
    }

    #[test]
    fn request_distinguishes_absent_and_empty_category_ids() {
        let absent: BlogRequest = serde_json::from_str(r#"{"id": 4, "title": "T"}"#).unwrap();
        let empty: BlogRequest =
            serde_json::from_str(r#"{"id": 4, "title": "T", "category_ids": []}"#).unwrap();

        assert_eq!(absent.category_ids, None);
        assert_eq!(empty.category_ids, Some(Vec::new()));
    }
}
