// src/models/products.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    models::items::{check_stored_amount, Unit},
};

/// Abaixo desta margem (%) o produto é sinalizado como "margem baixa".
pub const LOW_MARGIN_THRESHOLD: Decimal = Decimal::from_parts(30, 0, 0, false, 0);

// --- 1. Produto ---
// `total_cost` e `margin` são derivados: só o motor de custos os escreve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub category_id: Option<Uuid>,
    #[schema(example = "Pão de queijo (dúzia)")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "30.00")]
    pub sale_price: Decimal,
    pub promotional_price: Option<Decimal>,
    #[schema(example = "15.00")]
    pub total_cost: Decimal,
    #[schema(example = "50.00")]
    pub margin: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn has_low_margin(&self) -> bool {
        self.margin < LOW_MARGIN_THRESHOLD
    }
}

// Produto com a categoria embutida (LEFT JOIN)
#[derive(Debug, Clone, FromRow)]
pub struct ProductWithCategory {
    #[sqlx(flatten)]
    pub product: Product,
    pub category_name: Option<String>,
}

// Formato de listagem/detalhe: inclui o indicador de margem baixa,
// que é só apresentação e nunca é gravado.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub category_name: Option<String>,
    pub low_margin: bool,
}

impl From<ProductWithCategory> for ProductView {
    fn from(row: ProductWithCategory) -> Self {
        let low_margin = row.product.has_low_margin();
        Self {
            product: row.product,
            category_name: row.category_name,
            low_margin,
        }
    }
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        let low_margin = product.has_low_margin();
        Self {
            product,
            category_name: None,
            low_margin,
        }
    }
}

// `total_cost` e `margin` não entram: começam em zero e são do motor de custos.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    #[validate(length(min = 1, message = "O nome do produto é obrigatório."))]
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    #[schema(example = "30.00")]
    pub sale_price: Decimal,
    pub promotional_price: Option<Decimal>,
}

// --- 2. Insumo do Produto (linha de composição) ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductItemLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub item_id: Uuid,
    #[schema(example = "500")]
    pub quantity: Decimal,
    pub unit: Unit,
    #[schema(example = "10.00")]
    pub cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Dados de uma nova linha, já com o custo calculado
#[derive(Debug, Clone, PartialEq)]
pub struct NewItemLine {
    pub product_id: Uuid,
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub unit: Unit,
    pub cost: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddItemLinePayload {
    pub item_id: Uuid,
    #[schema(example = "500")]
    pub quantity: Decimal,
    /// Unidade da quantidade; sem ela vale a unidade do insumo.
    pub unit: Option<Unit>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemLinePayload {
    pub quantity: Decimal,
    pub unit: Option<Unit>,
}

// Resposta de uma mutação de linha: a linha e o produto já recalculado
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemLineChange {
    pub line: ProductItemLine,
    pub product: ProductView,
}

// Linha com os dados do insumo embutidos (para a tela do produto)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemLineDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub line: ProductItemLine,
    pub item_name: String,
    pub item_unit: Unit,
    pub item_category_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: ProductView,
    pub lines: Vec<ItemLineDetail>,
}

// --- 3. Histórico de preço de venda ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPriceHistoryEntry {
    pub id: Uuid,
    pub product_id: Uuid,
    pub old_price: Decimal,
    pub new_price: Decimal,
    pub changed_at: DateTime<Utc>,
}

/// Regras de preço de um produto, checadas antes de qualquer escrita.
pub fn validate_product_prices(sale_price: Decimal, promotional_price: Option<Decimal>) -> Result<(), AppError> {
    check_stored_amount("salePrice", sale_price)?;
    if let Some(promo) = promotional_price {
        check_stored_amount("promotionalPrice", promo)?;
    }

    if sale_price <= Decimal::ZERO {
        return Err(AppError::invalid_field(
            "salePrice",
            "price_not_positive",
            "O preço de venda deve ser maior que zero",
        ));
    }

    if let Some(promo) = promotional_price {
        if promo <= Decimal::ZERO || promo >= sale_price {
            return Err(AppError::invalid_field(
                "promotionalPrice",
                "promotion_out_of_range",
                "O preço promocional deve ser maior que zero e menor que o preço de venda",
            ));
        }
    }

    Ok(())
}
