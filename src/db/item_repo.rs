// src/db/item_repo.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::items::{Item, ItemPayload, ItemPriceHistoryEntry, ItemWithCategory},
};

const ITEM_COLUMNS: &str = "i.id, i.organization_id, i.category_id, i.name, i.description, i.unit, \
     i.price, i.discounted_price, i.active, i.created_at, i.updated_at";

#[derive(Clone)]
pub struct ItemRepository {
    pool: PgPool,
}

impl ItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insumos ativos da empresa, por nome, com a categoria embutida.
    pub async fn list_active(&self, organization_id: Uuid) -> Result<Vec<ItemWithCategory>, AppError> {
        let sql = format!(
            r#"
            SELECT {ITEM_COLUMNS}, c.name AS category_name
            FROM items i
            LEFT JOIN item_categories c ON c.id = i.category_id
            WHERE i.organization_id = $1 AND i.active = TRUE
            ORDER BY i.name ASC
            "#
        );
        let items = sqlx::query_as::<_, ItemWithCategory>(&sql)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn find_with_category(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ItemWithCategory>, AppError> {
        let sql = format!(
            r#"
            SELECT {ITEM_COLUMNS}, c.name AS category_name
            FROM items i
            LEFT JOIN item_categories c ON c.id = i.category_id
            WHERE i.organization_id = $1 AND i.id = $2
            "#
        );
        let item = sqlx::query_as::<_, ItemWithCategory>(&sql)
            .bind(organization_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    pub async fn find(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Item>, AppError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items i WHERE i.organization_id = $1 AND i.id = $2");
        let item = sqlx::query_as::<_, Item>(&sql)
            .bind(organization_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    pub async fn create(&self, organization_id: Uuid, payload: &ItemPayload) -> Result<Item, AppError> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (organization_id, category_id, name, description, unit, price, discounted_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, organization_id, category_id, name, description, unit,
                      price, discounted_price, active, created_at, updated_at
            "#,
        )
        .bind(organization_id)
        .bind(payload.category_id)
        .bind(&payload.name)
        .bind(&payload.description)
        .bind(payload.unit)
        .bind(payload.price)
        .bind(payload.discounted_price)
        .fetch_one(&self.pool)
        .await?;
        Ok(item)
    }

    // Campos descritivos. Preço e desconto só mudam por `update_price`.
    pub async fn update_details(&self, organization_id: Uuid, id: Uuid, payload: &ItemPayload) -> Result<Option<Item>, AppError> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            UPDATE items
            SET category_id = $3, name = $4, description = $5, unit = $6, updated_at = NOW()
            WHERE organization_id = $1 AND id = $2
            RETURNING id, organization_id, category_id, name, description, unit,
                      price, discounted_price, active, created_at, updated_at
            "#,
        )
        .bind(organization_id)
        .bind(id)
        .bind(payload.category_id)
        .bind(&payload.name)
        .bind(&payload.description)
        .bind(payload.unit)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    pub async fn update_price(&self, id: Uuid, price: Decimal, discounted_price: Option<Decimal>) -> Result<Item, AppError> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            UPDATE items
            SET price = $2, discounted_price = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, organization_id, category_id, name, description, unit,
                      price, discounted_price, active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(price)
        .bind(discounted_price)
        .fetch_one(&self.pool)
        .await?;
        Ok(item)
    }

    /// Exclusão lógica: o insumo some das listas mas as linhas antigas continuam válidas.
    pub async fn deactivate(&self, organization_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE items SET active = FALSE, updated_at = NOW() WHERE organization_id = $1 AND id = $2",
        )
        .bind(organization_id)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // Alguma linha de produto (ativo ou não) usa o insumo?
    pub async fn is_used_in_products(&self, id: Uuid) -> Result<bool, AppError> {
        let used = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM product_item_lines WHERE item_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(used)
    }

    pub async fn append_price_history(&self, item_id: Uuid, old_price: Decimal, new_price: Decimal) -> Result<(), AppError> {
        sqlx::query("INSERT INTO item_price_history (item_id, old_price, new_price) VALUES ($1, $2, $3)")
            .bind(item_id)
            .bind(old_price)
            .bind(new_price)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Histórico do insumo, mais recente primeiro.
    pub async fn price_history(&self, organization_id: Uuid, item_id: Uuid) -> Result<Vec<ItemPriceHistoryEntry>, AppError> {
        let history = sqlx::query_as::<_, ItemPriceHistoryEntry>(
            r#"
            SELECT h.id, h.item_id, h.old_price, h.new_price, h.changed_at
            FROM item_price_history h
            INNER JOIN items i ON i.id = h.item_id
            WHERE i.organization_id = $1 AND h.item_id = $2
            ORDER BY h.changed_at DESC
            "#,
        )
        .bind(organization_id)
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(history)
    }
}
