// src/db/category_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::items::Category};

/// Categorias de insumos e de produtos têm o mesmo formato, em tabelas separadas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    Item,
    Product,
}

impl CategoryKind {
    fn table(self) -> &'static str {
        match self {
            CategoryKind::Item => "item_categories",
            CategoryKind::Product => "product_categories",
        }
    }

    fn unique_name_constraint(self) -> &'static str {
        match self {
            CategoryKind::Item => "item_categories_org_name_key",
            CategoryKind::Product => "product_categories_org_name_key",
        }
    }
}

#[derive(Clone)]
pub struct CategoryRepository {
    pool: PgPool,
}

impl CategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Nome duplicado na mesma empresa vira conflito (409).
    fn map_unique(kind: CategoryKind, name: &str, e: sqlx::Error) -> AppError {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() && db_err.constraint() == Some(kind.unique_name_constraint()) {
                return AppError::CategoryNameAlreadyExists(name.to_string());
            }
        }
        e.into()
    }

    pub async fn list(&self, kind: CategoryKind, organization_id: Uuid) -> Result<Vec<Category>, AppError> {
        let sql = format!(
            "SELECT id, organization_id, name, description, created_at, updated_at \
             FROM {} WHERE organization_id = $1 ORDER BY name ASC",
            kind.table()
        );
        let categories = sqlx::query_as::<_, Category>(&sql)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    pub async fn find(&self, kind: CategoryKind, organization_id: Uuid, id: Uuid) -> Result<Option<Category>, AppError> {
        let sql = format!(
            "SELECT id, organization_id, name, description, created_at, updated_at \
             FROM {} WHERE organization_id = $1 AND id = $2",
            kind.table()
        );
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(organization_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    pub async fn create(
        &self,
        kind: CategoryKind,
        organization_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Category, AppError> {
        let sql = format!(
            "INSERT INTO {} (organization_id, name, description) VALUES ($1, $2, $3) \
             RETURNING id, organization_id, name, description, created_at, updated_at",
            kind.table()
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(organization_id)
            .bind(name)
            .bind(description)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Self::map_unique(kind, name, e))
    }

    pub async fn update(
        &self,
        kind: CategoryKind,
        organization_id: Uuid,
        id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Option<Category>, AppError> {
        let sql = format!(
            "UPDATE {} SET name = $3, description = $4, updated_at = NOW() \
             WHERE organization_id = $1 AND id = $2 \
             RETURNING id, organization_id, name, description, created_at, updated_at",
            kind.table()
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(organization_id)
            .bind(id)
            .bind(name)
            .bind(description)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::map_unique(kind, name, e))
    }

    /// Remove a categoria. Insumos/produtos dela ficam sem categoria (ON DELETE SET NULL).
    pub async fn delete(&self, kind: CategoryKind, organization_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let sql = format!("DELETE FROM {} WHERE organization_id = $1 AND id = $2", kind.table());
        let result = sqlx::query(&sql)
            .bind(organization_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
