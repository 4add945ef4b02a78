// src/services/item_service.rs

use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{CategoryKind, ItemRepository, PgCostStore},
    models::items::{validate_item_prices, ItemPayload, ItemPriceHistoryEntry, ItemWithCategory, Unit},
    services::{category_service::CategoryService, cost_engine::CostEngine},
};

#[derive(Clone)]
pub struct ItemService {
    item_repo: ItemRepository,
    categories: CategoryService,
    engine: CostEngine<PgCostStore>,
}

// Tudo que pode ser checado sem ir ao banco.
fn validate_payload(payload: &ItemPayload) -> Result<(), AppError> {
    payload.validate()?;
    validate_item_prices(payload.price, payload.discounted_price)
}

// Linhas guardam quantidade na unidade escolhida; trocar a grandeza do insumo
// deixaria essas linhas sem conversão possível.
fn check_unit_change(current: Unit, new: Unit, used_in_products: bool) -> Result<(), AppError> {
    if used_in_products && current.dimension() != new.dimension() {
        return Err(AppError::invalid_field(
            "unit",
            "unit_dimension_in_use",
            "O insumo já é usado em produtos; a nova unidade deve ser da mesma grandeza",
        ));
    }
    Ok(())
}

impl ItemService {
    pub fn new(item_repo: ItemRepository, categories: CategoryService, engine: CostEngine<PgCostStore>) -> Self {
        Self { item_repo, categories, engine }
    }

    pub async fn list(&self, organization_id: Uuid) -> Result<Vec<ItemWithCategory>, AppError> {
        self.item_repo.list_active(organization_id).await
    }

    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> Result<ItemWithCategory, AppError> {
        self.item_repo
            .find_with_category(organization_id, id)
            .await?
            .ok_or(AppError::ItemNotFound)
    }

    pub async fn create(&self, organization_id: Uuid, payload: &ItemPayload) -> Result<ItemWithCategory, AppError> {
        validate_payload(payload)?;
        self.categories
            .ensure_exists(CategoryKind::Item, organization_id, payload.category_id)
            .await?;

        let item = self.item_repo.create(organization_id, payload).await?;
        tracing::info!(%organization_id, item_id = %item.id, "Insumo criado");

        self.get(organization_id, item.id).await
    }

    /// Atualiza os dados do insumo. Mudança de preço passa pelo motor de custos
    /// (gera histórico); produtos que já usam o insumo não são recalculados.
    pub async fn update(&self, organization_id: Uuid, id: Uuid, payload: &ItemPayload) -> Result<ItemWithCategory, AppError> {
        validate_payload(payload)?;
        self.categories
            .ensure_exists(CategoryKind::Item, organization_id, payload.category_id)
            .await?;

        let current = self
            .item_repo
            .find(organization_id, id)
            .await?
            .ok_or(AppError::ItemNotFound)?;
        if current.unit != payload.unit {
            let used = self.item_repo.is_used_in_products(id).await?;
            check_unit_change(current.unit, payload.unit, used)?;
        }

        self.item_repo
            .update_details(organization_id, id, payload)
            .await?
            .ok_or(AppError::ItemNotFound)?;

        self.engine
            .update_item_price(organization_id, id, payload.price, payload.discounted_price)
            .await?;

        self.get(organization_id, id).await
    }

    pub async fn deactivate(&self, organization_id: Uuid, id: Uuid) -> Result<(), AppError> {
        if !self.item_repo.deactivate(organization_id, id).await? {
            return Err(AppError::ItemNotFound);
        }
        tracing::info!(%organization_id, item_id = %id, "Insumo desativado");
        Ok(())
    }

    pub async fn price_history(&self, organization_id: Uuid, id: Uuid) -> Result<Vec<ItemPriceHistoryEntry>, AppError> {
        self.item_repo
            .find(organization_id, id)
            .await?
            .ok_or(AppError::ItemNotFound)?;
        self.item_repo.price_history(organization_id, id).await
    }
}
