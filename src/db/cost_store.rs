// src/db/cost_store.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ItemRepository, ProductRepository},
    models::{
        items::{Item, Unit},
        products::{NewItemLine, Product, ProductItemLine},
    },
    services::cost_engine::CostStore,
};

// Liga o motor de custos aos repositórios de insumos e produtos.
#[derive(Clone)]
pub struct PgCostStore {
    items: ItemRepository,
    products: ProductRepository,
}

impl PgCostStore {
    pub fn new(items: ItemRepository, products: ProductRepository) -> Self {
        Self { items, products }
    }
}

#[async_trait]
impl CostStore for PgCostStore {
    async fn find_item(&self, organization_id: Uuid, item_id: Uuid) -> Result<Option<Item>, AppError> {
        self.items.find(organization_id, item_id).await
    }

    async fn find_product(&self, organization_id: Uuid, product_id: Uuid) -> Result<Option<Product>, AppError> {
        self.products.find(organization_id, product_id).await
    }

    async fn find_line(&self, product_id: Uuid, line_id: Uuid) -> Result<Option<ProductItemLine>, AppError> {
        self.products.find_line(product_id, line_id).await
    }

    async fn list_lines(&self, product_id: Uuid) -> Result<Vec<ProductItemLine>, AppError> {
        self.products.list_lines(product_id).await
    }

    async fn insert_line(&self, line: &NewItemLine) -> Result<ProductItemLine, AppError> {
        self.products.insert_line(line).await
    }

    async fn update_line(
        &self,
        line_id: Uuid,
        quantity: Decimal,
        unit: Unit,
        cost: Decimal,
    ) -> Result<ProductItemLine, AppError> {
        self.products.update_line(line_id, quantity, unit, cost).await
    }

    async fn delete_line(&self, line_id: Uuid) -> Result<(), AppError> {
        self.products.delete_line(line_id).await
    }

    async fn write_derived(&self, product_id: Uuid, total_cost: Decimal, margin: Decimal) -> Result<Product, AppError> {
        self.products.write_derived(product_id, total_cost, margin).await
    }

    async fn write_sale_price(&self, product_id: Uuid, sale_price: Decimal) -> Result<Product, AppError> {
        self.products.update_sale_price(product_id, sale_price).await
    }

    async fn write_item_price(
        &self,
        item_id: Uuid,
        price: Decimal,
        discounted_price: Option<Decimal>,
    ) -> Result<Item, AppError> {
        self.items.update_price(item_id, price, discounted_price).await
    }

    async fn append_item_price_history(&self, item_id: Uuid, old_price: Decimal, new_price: Decimal) -> Result<(), AppError> {
        self.items.append_price_history(item_id, old_price, new_price).await
    }

    async fn append_product_price_history(
        &self,
        product_id: Uuid,
        old_price: Decimal,
        new_price: Decimal,
    ) -> Result<(), AppError> {
        self.products.append_price_history(product_id, old_price, new_price).await
    }
}
