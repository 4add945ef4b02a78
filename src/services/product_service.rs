// src/services/product_service.rs

use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{CategoryKind, PgCostStore, ProductRepository},
    models::products::{
        validate_product_prices, AddItemLinePayload, ItemLineChange, ItemLineDetail, ProductDetail, ProductPayload,
        ProductPriceHistoryEntry, ProductView, UpdateItemLinePayload,
    },
    services::{category_service::CategoryService, cost_engine::CostEngine},
};

#[derive(Clone)]
pub struct ProductService {
    product_repo: ProductRepository,
    categories: CategoryService,
    engine: CostEngine<PgCostStore>,
}

fn validate_payload(payload: &ProductPayload) -> Result<(), AppError> {
    payload.validate()?;
    validate_product_prices(payload.sale_price, payload.promotional_price)
}

impl ProductService {
    pub fn new(product_repo: ProductRepository, categories: CategoryService, engine: CostEngine<PgCostStore>) -> Self {
        Self { product_repo, categories, engine }
    }

    pub async fn list(&self, organization_id: Uuid) -> Result<Vec<ProductView>, AppError> {
        let products = self.product_repo.list_active(organization_id).await?;
        Ok(products.into_iter().map(ProductView::from).collect())
    }

    /// Produto com as linhas (cada uma com nome, unidade e categoria do insumo).
    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> Result<ProductDetail, AppError> {
        let product = self
            .product_repo
            .find_with_category(organization_id, id)
            .await?
            .ok_or(AppError::ProductNotFound)?;
        let lines = self.product_repo.list_line_details(id).await?;

        Ok(ProductDetail {
            product: product.into(),
            lines,
        })
    }

    pub async fn create(&self, organization_id: Uuid, payload: &ProductPayload) -> Result<ProductDetail, AppError> {
        validate_payload(payload)?;
        self.categories
            .ensure_exists(CategoryKind::Product, organization_id, payload.category_id)
            .await?;

        let product = self.product_repo.create(organization_id, payload).await?;
        tracing::info!(%organization_id, product_id = %product.id, "Produto criado");

        self.get(organization_id, product.id).await
    }

    // Dados descritivos direto no repositório; o preço de venda pelo motor
    // (histórico + recálculo da margem).
    pub async fn update(&self, organization_id: Uuid, id: Uuid, payload: &ProductPayload) -> Result<ProductDetail, AppError> {
        validate_payload(payload)?;
        self.categories
            .ensure_exists(CategoryKind::Product, organization_id, payload.category_id)
            .await?;

        self.product_repo
            .update_details(organization_id, id, payload)
            .await?
            .ok_or(AppError::ProductNotFound)?;

        self.engine
            .update_sale_price(organization_id, id, payload.sale_price)
            .await?;

        self.get(organization_id, id).await
    }

    pub async fn deactivate(&self, organization_id: Uuid, id: Uuid) -> Result<(), AppError> {
        if !self.product_repo.deactivate(organization_id, id).await? {
            return Err(AppError::ProductNotFound);
        }
        tracing::info!(%organization_id, product_id = %id, "Produto desativado");
        Ok(())
    }

    pub async fn price_history(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Vec<ProductPriceHistoryEntry>, AppError> {
        self.product_repo
            .find(organization_id, id)
            .await?
            .ok_or(AppError::ProductNotFound)?;
        self.product_repo.price_history(organization_id, id).await
    }

    // ---
    // Linhas
    // ---

    pub async fn list_lines(&self, organization_id: Uuid, product_id: Uuid) -> Result<Vec<ItemLineDetail>, AppError> {
        self.product_repo
            .find(organization_id, product_id)
            .await?
            .ok_or(AppError::ProductNotFound)?;
        self.product_repo.list_line_details(product_id).await
    }

    pub async fn add_line(
        &self,
        organization_id: Uuid,
        product_id: Uuid,
        payload: &AddItemLinePayload,
    ) -> Result<ItemLineChange, AppError> {
        let (line, product) = self
            .engine
            .add_item_line(organization_id, product_id, payload.item_id, payload.quantity, payload.unit)
            .await?;
        Ok(ItemLineChange { line, product: product.into() })
    }

    pub async fn update_line(
        &self,
        organization_id: Uuid,
        product_id: Uuid,
        line_id: Uuid,
        payload: &UpdateItemLinePayload,
    ) -> Result<ItemLineChange, AppError> {
        let (line, product) = self
            .engine
            .update_item_line(organization_id, product_id, line_id, payload.quantity, payload.unit)
            .await?;
        Ok(ItemLineChange { line, product: product.into() })
    }

    pub async fn remove_line(&self, organization_id: Uuid, product_id: Uuid, line_id: Uuid) -> Result<ProductView, AppError> {
        let product = self
            .engine
            .remove_item_line(organization_id, product_id, line_id)
            .await?;
        Ok(product.into())
    }
}
