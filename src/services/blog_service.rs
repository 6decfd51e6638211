//! Blog service - blogs and their many-to-many category links.
//!
//! This service handles:
//! - Reading blogs with their author and category set rebuilt from the join table
//! - Creating and updating a blog together with its `blogs_categorys` rows
//! - Deleting a blog and its join rows
//!
//! # Atomicity Guarantees
//!
//! Every write runs in one PostgreSQL transaction: a blog row is never
//! committed without the category links that were requested with it.
//! Updates apply only the difference between the stored and requested
//! category sets.

use std::collections::BTreeSet;

use sqlx::PgConnection;

use crate::{
    db::{DbPool, Store},
    error::AppError,
    models::{
        blog::{Blog, BlogRequest, BlogRow, assemble_blogs},
        category::{BlogCategoryRow, Category},
    },
};

/// Upper bound for `page_size` on paginated reads.
pub const MAX_PAGE_SIZE: i64 = 100;

const BLOG_SELECT: &str = r#"
    SELECT b.id, b.title, b.slug, b.createdby_id, b.description, b.content,
           b.created_at, b.updated_at,
           u.id AS author_id, u.first_name AS author_first_name
    FROM blogs b
    LEFT JOIN users u ON b.createdby_id = u.id
"#;

/// URL-safe slug derived from a title ("My Blog" -> "my-blog").
pub fn slug_for(title: &str) -> String {
    slug::slugify(title)
}

/// Sorted, de-duplicated copy of requested category ids.
pub fn normalize_ids(ids: &[i32]) -> Vec<i32> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Split the change from `current` to `desired` into (removed, added) ids.
///
/// Both outputs are sorted and free of duplicates.
pub fn diff_categories(current: &[i32], desired: &[i32]) -> (Vec<i32>, Vec<i32>) {
    let current: BTreeSet<i32> = current.iter().copied().collect();
    let desired: BTreeSet<i32> = desired.iter().copied().collect();

    let removed = current.difference(&desired).copied().collect();
    let added = desired.difference(&current).copied().collect();
    (removed, added)
}

/// Translate a 1-based page number into `(limit, offset)`.
pub fn page_window(page: i64, page_size: i64) -> Result<(i64, i64), AppError> {
    if page < 1 {
        return Err(AppError::InvalidRequest("page must be at least 1".to_string()));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(AppError::InvalidRequest(format!(
            "page_size must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }

    let offset = (page - 1)
        .checked_mul(page_size)
        .ok_or_else(|| AppError::InvalidRequest("page is out of range".to_string()))?;

    Ok((page_size, offset))
}

/// Title and slug for a save request, rejecting titles that slug to nothing.
fn title_and_slug(request: &BlogRequest) -> Result<(&str, String), AppError> {
    let title = request.title.trim();
    let slug = slug_for(title);
    if slug.is_empty() {
        return Err(AppError::InvalidRequest(
            "title must contain at least one letter or digit".to_string(),
        ));
    }
    Ok((title, slug))
}

/// Category rows for the given blogs, ordered by category name.
async fn load_category_rows(
    pool: &DbPool,
    blog_ids: &[i32],
) -> Result<Vec<BlogCategoryRow>, sqlx::Error> {
    if blog_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, BlogCategoryRow>(
        r#"
        SELECT bc.blog_id, c.id, c.category_name, c.created_at, c.updated_at
        FROM blogs_categorys bc
        JOIN categorys c ON c.id = bc.category_id
        WHERE bc.blog_id = ANY($1)
        ORDER BY c.category_name, c.id
        "#,
    )
    .bind(blog_ids)
    .fetch_all(pool)
    .await
}

/// Reject ids that do not name a category.
///
/// `FOR KEY SHARE` keeps the categories from being deleted before commit.
async fn ensure_categories_exist(conn: &mut PgConnection, ids: &[i32]) -> Result<(), AppError> {
    if ids.is_empty() {
        return Ok(());
    }

    let found: Vec<i32> =
        sqlx::query_scalar("SELECT id FROM categorys WHERE id = ANY($1) FOR KEY SHARE")
            .bind(ids)
            .fetch_all(&mut *conn)
            .await?;

    let (missing, _) = diff_categories(ids, &found);
    if !missing.is_empty() {
        return Err(AppError::InvalidRequest(format!(
            "unknown category ids: {missing:?}"
        )));
    }

    Ok(())
}

/// Insert one join row per category id.
async fn insert_category_links(
    conn: &mut PgConnection,
    blog_id: i32,
    category_ids: &[i32],
) -> Result<(), sqlx::Error> {
    for category_id in category_ids {
        sqlx::query(
            r#"
            INSERT INTO blogs_categorys (blog_id, category_id, created_at, updated_at)
            VALUES ($1, $2, NOW(), NOW())
            "#,
        )
        .bind(blog_id)
        .bind(category_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Bring the join rows of `blog_id` in line with `desired`, touching only the delta.
async fn sync_category_links(
    conn: &mut PgConnection,
    blog_id: i32,
    desired: &[i32],
) -> Result<(), sqlx::Error> {
    let current: Vec<i32> =
        sqlx::query_scalar("SELECT category_id FROM blogs_categorys WHERE blog_id = $1")
            .bind(blog_id)
            .fetch_all(&mut *conn)
            .await?;

    let (removed, added) = diff_categories(&current, desired);

    if !removed.is_empty() {
        sqlx::query("DELETE FROM blogs_categorys WHERE blog_id = $1 AND category_id = ANY($2)")
            .bind(blog_id)
            .bind(&removed)
            .execute(&mut *conn)
            .await?;
    }

    insert_category_links(conn, blog_id, &added).await
}

#[derive(Debug, Clone)]
pub struct BlogService {
    store: Store,
}

impl BlogService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Every blog ordered by title, each with its categories.
    ///
    /// Categories for all blogs are fetched with one batched query.
    pub async fn get_all(&self) -> Result<Vec<Blog>, AppError> {
        self.store
            .run(async {
                let rows = sqlx::query_as::<_, BlogRow>(&format!("{BLOG_SELECT} ORDER BY b.title, b.id"))
                    .fetch_all(self.store.pool())
                    .await?;

                self.attach_categories(rows).await
            })
            .await
    }

    /// One page of [`get_all`](Self::get_all), `page` starting at 1.
    pub async fn get_all_paginated(&self, page: i64, page_size: i64) -> Result<Vec<Blog>, AppError> {
        let (limit, offset) = page_window(page, page_size)?;

        self.store
            .run(async {
                let rows = sqlx::query_as::<_, BlogRow>(&format!(
                    "{BLOG_SELECT} ORDER BY b.title, b.id LIMIT $1 OFFSET $2"
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(self.store.pool())
                .await?;

                self.attach_categories(rows).await
            })
            .await
    }

    pub async fn get_one_by_id(&self, id: i32) -> Result<Blog, AppError> {
        self.store
            .run(async {
                let row = sqlx::query_as::<_, BlogRow>(&format!("{BLOG_SELECT} WHERE b.id = $1"))
                    .bind(id)
                    .fetch_optional(self.store.pool())
                    .await?
                    .ok_or(AppError::NotFound("blog"))?;

                self.attach_one(row).await
            })
            .await
    }

    pub async fn get_one_by_slug(&self, slug: &str) -> Result<Blog, AppError> {
        self.store
            .run(async {
                let row = sqlx::query_as::<_, BlogRow>(&format!("{BLOG_SELECT} WHERE b.slug = $1"))
                    .bind(slug)
                    .fetch_optional(self.store.pool())
                    .await?
                    .ok_or(AppError::NotFound("blog"))?;

                self.attach_one(row).await
            })
            .await
    }

    /// Categories of one blog ordered by name, plus their ids in the same order.
    pub async fn categories_for_blog(&self, id: i32) -> Result<(Vec<Category>, Vec<i32>), AppError> {
        self.store
            .run(async {
                let rows = load_category_rows(self.store.pool(), &[id]).await?;
                let categories: Vec<Category> = rows.into_iter().map(Category::from).collect();
                let ids = categories.iter().map(|c| c.id).collect();
                Ok::<_, AppError>((categories, ids))
            })
            .await
    }

    /// Create a blog authored by `author_id` and link its categories.
    ///
    /// # Process
    ///
    /// 1. Start database transaction
    /// 2. Check every requested category exists
    /// 3. Insert the blog with a slug derived from the title
    /// 4. Insert one join row per distinct category id
    /// 5. Commit (or rollback on error)
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: empty title or unknown category ids
    /// - `Conflict`: another blog already has this slug
    /// - `CategoryWrite`: join rows could not be written; nothing was saved
    pub async fn create(&self, author_id: i32, request: &BlogRequest) -> Result<i32, AppError> {
        let (title, slug) = title_and_slug(request)?;
        let category_ids = normalize_ids(request.category_ids.as_deref().unwrap_or_default());

        self.store
            .run(async {
                let mut tx = self.store.pool().begin().await?;

                ensure_categories_exist(&mut *tx, &category_ids).await?;

                let id: i32 = sqlx::query_scalar(
                    r#"
                    INSERT INTO blogs (title, slug, createdby_id, description, content, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
                    RETURNING id
                    "#,
                )
                .bind(title)
                .bind(&slug)
                .bind(author_id)
                .bind(&request.description)
                .bind(&request.content)
                .fetch_one(&mut *tx)
                .await?;

                insert_category_links(&mut *tx, id, &category_ids)
                    .await
                    .map_err(AppError::CategoryWrite)?;

                tx.commit().await?;

                Ok::<_, AppError>(id)
            })
            .await
    }

    /// Update a blog's text fields, re-derive its slug and sync its categories.
    ///
    /// The author is never changed. When `category_ids` is absent the
    /// category links are left alone.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no blog with this id
    /// - `InvalidRequest`: empty title or unknown category ids
    /// - `Conflict`: another blog already has the new slug
    /// - `CategoryWrite`: join rows could not be rewritten; nothing was saved
    pub async fn update(&self, id: i32, request: &BlogRequest) -> Result<(), AppError> {
        let (title, slug) = title_and_slug(request)?;
        let desired = request.category_ids.as_deref().map(normalize_ids);

        self.store
            .run(async {
                let mut tx = self.store.pool().begin().await?;

                // Row lock taken here serializes concurrent updates of this blog
                let updated = sqlx::query(
                    r#"
                    UPDATE blogs
                    SET title = $1,
                        slug = $2,
                        description = $3,
                        content = $4,
                        updated_at = NOW()
                    WHERE id = $5
                    "#,
                )
                .bind(title)
                .bind(&slug)
                .bind(&request.description)
                .bind(&request.content)
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

                if updated == 0 {
                    tx.rollback().await?;
                    return Err(AppError::NotFound("blog"));
                }

                if let Some(desired) = &desired {
                    ensure_categories_exist(&mut *tx, desired).await?;
                    sync_category_links(&mut *tx, id, desired)
                        .await
                        .map_err(AppError::CategoryWrite)?;
                }

                tx.commit().await?;

                Ok::<_, AppError>(())
            })
            .await
    }

    /// Delete a blog and its join rows.
    pub async fn delete_by_id(&self, id: i32) -> Result<(), AppError> {
        self.store
            .run(async {
                let mut tx = self.store.pool().begin().await?;

                sqlx::query("DELETE FROM blogs_categorys WHERE blog_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;

                let deleted = sqlx::query("DELETE FROM blogs WHERE id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();

                if deleted == 0 {
                    tx.rollback().await?;
                    return Err(AppError::NotFound("blog"));
                }

                tx.commit().await?;

                Ok::<_, AppError>(())
            })
            .await
    }

    async fn attach_categories(&self, rows: Vec<BlogRow>) -> Result<Vec<Blog>, AppError> {
        let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
        let category_rows = load_category_rows(self.store.pool(), &ids).await?;

        Ok(assemble_blogs(rows, category_rows))
    }

    async fn attach_one(&self, row: BlogRow) -> Result<Blog, AppError> {
        let category_rows = load_category_rows(self.store.pool(), &[row.id]).await?;
        let categories = category_rows.into_iter().map(Category::from).collect();

        Ok(Blog::from_row(row, categories))
    }
}
