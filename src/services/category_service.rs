//! Category service - the independent side of the blog/category relationship.

use crate::{
    db::Store,
    error::AppError,
    models::category::{Category, CategoryRequest},
};

#[derive(Debug, Clone)]
pub struct CategoryService {
    store: Store,
}

impl CategoryService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// All categories ordered by name.
    pub async fn get_all(&self) -> Result<Vec<Category>, AppError> {
        self.store
            .run(async {
                let categories = sqlx::query_as::<_, Category>(
                    r#"
                    SELECT id, category_name, created_at, updated_at
                    FROM categorys
                    ORDER BY category_name, id
                    "#,
                )
                .fetch_all(self.store.pool())
                .await?;
                Ok::<_, AppError>(categories)
            })
            .await
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Category, AppError> {
        self.store
            .run(async {
                sqlx::query_as::<_, Category>(
                    "SELECT id, category_name, created_at, updated_at FROM categorys WHERE id = $1",
                )
                .bind(id)
                .fetch_optional(self.store.pool())
                .await?
                .ok_or(AppError::NotFound("category"))
            })
            .await
    }

    pub async fn create(&self, request: &CategoryRequest) -> Result<Category, AppError> {
        let name = request.category_name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidRequest(
                "category_name must not be empty".to_string(),
            ));
        }

        self.store
            .run(async {
                let category = sqlx::query_as::<_, Category>(
                    r#"
                    INSERT INTO categorys (category_name, created_at, updated_at)
                    VALUES ($1, NOW(), NOW())
                    RETURNING id, category_name, created_at, updated_at
                    "#,
                )
                .bind(name)
                .fetch_one(self.store.pool())
                .await?;
                Ok::<_, AppError>(category)
            })
            .await
    }
}
