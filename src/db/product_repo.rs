// src/db/product_repo.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        items::Unit,
        products::{
            ItemLineDetail, NewItemLine, Product, ProductItemLine, ProductPayload, ProductPriceHistoryEntry,
            ProductWithCategory,
        },
    },
};

const PRODUCT_COLUMNS: &str = "p.id, p.organization_id, p.category_id, p.name, p.description, p.sale_price, \
     p.promotional_price, p.total_cost, p.margin, p.active, p.created_at, p.updated_at";

const PRODUCT_RETURNING: &str = "RETURNING id, organization_id, category_id, name, description, sale_price, \
     promotional_price, total_cost, margin, active, created_at, updated_at";

const LINE_RETURNING: &str = "RETURNING id, product_id, item_id, quantity, unit, cost, created_at, updated_at";

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Produtos
    // ---

    pub async fn list_active(&self, organization_id: Uuid) -> Result<Vec<ProductWithCategory>, AppError> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}, c.name AS category_name
            FROM products p
            LEFT JOIN product_categories c ON c.id = p.category_id
            WHERE p.organization_id = $1 AND p.active = TRUE
            ORDER BY p.name ASC
            "#
        );
        let products = sqlx::query_as::<_, ProductWithCategory>(&sql)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    pub async fn find_with_category(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ProductWithCategory>, AppError> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}, c.name AS category_name
            FROM products p
            LEFT JOIN product_categories c ON c.id = p.category_id
            WHERE p.organization_id = $1 AND p.id = $2
            "#
        );
        let product = sqlx::query_as::<_, ProductWithCategory>(&sql)
            .bind(organization_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn find(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Product>, AppError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.organization_id = $1 AND p.id = $2");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(organization_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    // Custo e margem começam em zero (defaults da tabela).
    pub async fn create(&self, organization_id: Uuid, payload: &ProductPayload) -> Result<Product, AppError> {
        let sql = format!(
            r#"
            INSERT INTO products (organization_id, category_id, name, description, sale_price, promotional_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            {PRODUCT_RETURNING}
            "#
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(organization_id)
            .bind(payload.category_id)
            .bind(&payload.name)
            .bind(&payload.description)
            .bind(payload.sale_price)
            .bind(payload.promotional_price)
            .fetch_one(&self.pool)
            .await?;
        Ok(product)
    }

    // Tudo menos o preço de venda e os campos derivados.
    pub async fn update_details(
        &self,
        organization_id: Uuid,
        id: Uuid,
        payload: &ProductPayload,
    ) -> Result<Option<Product>, AppError> {
        let sql = format!(
            r#"
            UPDATE products
            SET category_id = $3, name = $4, description = $5, promotional_price = $6, updated_at = NOW()
            WHERE organization_id = $1 AND id = $2
            {PRODUCT_RETURNING}
            "#
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(organization_id)
            .bind(id)
            .bind(payload.category_id)
            .bind(&payload.name)
            .bind(&payload.description)
            .bind(payload.promotional_price)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn update_sale_price(&self, id: Uuid, sale_price: Decimal) -> Result<Product, AppError> {
        let sql = format!("UPDATE products SET sale_price = $2, updated_at = NOW() WHERE id = $1 {PRODUCT_RETURNING}");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(sale_price)
            .fetch_one(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn write_derived(&self, id: Uuid, total_cost: Decimal, margin: Decimal) -> Result<Product, AppError> {
        let sql = format!(
            "UPDATE products SET total_cost = $2, margin = $3, updated_at = NOW() WHERE id = $1 {PRODUCT_RETURNING}"
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(total_cost)
            .bind(margin)
            .fetch_one(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn deactivate(&self, organization_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE products SET active = FALSE, updated_at = NOW() WHERE organization_id = $1 AND id = $2",
        )
        .bind(organization_id)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn append_price_history(&self, product_id: Uuid, old_price: Decimal, new_price: Decimal) -> Result<(), AppError> {
        sqlx::query("INSERT INTO product_price_history (product_id, old_price, new_price) VALUES ($1, $2, $3)")
            .bind(product_id)
            .bind(old_price)
            .bind(new_price)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn price_history(
        &self,
        organization_id: Uuid,
        product_id: Uuid,
    ) -> Result<Vec<ProductPriceHistoryEntry>, AppError> {
        let history = sqlx::query_as::<_, ProductPriceHistoryEntry>(
            r#"
            SELECT h.id, h.product_id, h.old_price, h.new_price, h.changed_at
            FROM product_price_history h
            INNER JOIN products p ON p.id = h.product_id
            WHERE p.organization_id = $1 AND h.product_id = $2
            ORDER BY h.changed_at DESC
            "#,
        )
        .bind(organization_id)
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(history)
    }

    // ---
    // Linhas (insumos do produto)
    // ---

    pub async fn list_lines(&self, product_id: Uuid) -> Result<Vec<ProductItemLine>, AppError> {
        let lines = sqlx::query_as::<_, ProductItemLine>(
            r#"
            SELECT id, product_id, item_id, quantity, unit, cost, created_at, updated_at
            FROM product_item_lines
            WHERE product_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    // Linhas com nome, unidade e categoria do insumo.
    pub async fn list_line_details(&self, product_id: Uuid) -> Result<Vec<ItemLineDetail>, AppError> {
        let lines = sqlx::query_as::<_, ItemLineDetail>(
            r#"
            SELECT l.id, l.product_id, l.item_id, l.quantity, l.unit, l.cost, l.created_at, l.updated_at,
                   i.name AS item_name, i.unit AS item_unit, c.name AS item_category_name
            FROM product_item_lines l
            INNER JOIN items i ON i.id = l.item_id
            LEFT JOIN item_categories c ON c.id = i.category_id
            WHERE l.product_id = $1
            ORDER BY l.created_at ASC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    pub async fn find_line(&self, product_id: Uuid, line_id: Uuid) -> Result<Option<ProductItemLine>, AppError> {
        let line = sqlx::query_as::<_, ProductItemLine>(
            r#"
            SELECT id, product_id, item_id, quantity, unit, cost, created_at, updated_at
            FROM product_item_lines
            WHERE product_id = $1 AND id = $2
            "#,
        )
        .bind(product_id)
        .bind(line_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(line)
    }

    pub async fn insert_line(&self, line: &NewItemLine) -> Result<ProductItemLine, AppError> {
        let sql = format!(
            r#"
            INSERT INTO product_item_lines (product_id, item_id, quantity, unit, cost)
            VALUES ($1, $2, $3, $4, $5)
            {LINE_RETURNING}
            "#
        );
        let row = sqlx::query_as::<_, ProductItemLine>(&sql)
            .bind(line.product_id)
            .bind(line.item_id)
            .bind(line.quantity)
            .bind(line.unit)
            .bind(line.cost)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn update_line(
        &self,
        line_id: Uuid,
        quantity: Decimal,
        unit: Unit,
        cost: Decimal,
    ) -> Result<ProductItemLine, AppError> {
        let sql = format!(
            "UPDATE product_item_lines SET quantity = $2, unit = $3, cost = $4, updated_at = NOW() \
             WHERE id = $1 {LINE_RETURNING}"
        );
        let row = sqlx::query_as::<_, ProductItemLine>(&sql)
            .bind(line_id)
            .bind(quantity)
            .bind(unit)
            .bind(cost)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::LineNotFound)?;
        Ok(row)
    }

    pub async fn delete_line(&self, line_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM product_item_lines WHERE id = $1")
            .bind(line_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
