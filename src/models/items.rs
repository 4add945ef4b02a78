// src/models/items.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

// Preços, quantidades e custos de linha são gravados como NUMERIC(14,4).
pub const STORED_SCALE: u32 = 4;
// 10^10: primeiro valor que não cabe em NUMERIC(14,4).
pub const STORED_LIMIT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

/// Garante que `value` cabe numa coluna NUMERIC(14,4) sem arredondamento do banco.
pub fn check_stored_amount(field: &'static str, value: Decimal) -> Result<(), AppError> {
    if value.normalize().scale() > STORED_SCALE {
        return Err(AppError::invalid_field(
            field,
            "too_many_decimals",
            "Use no máximo 4 casas decimais",
        ));
    }
    if value.abs() >= STORED_LIMIT {
        return Err(AppError::invalid_field(
            field,
            "amount_out_of_range",
            "Valor acima do máximo permitido",
        ));
    }
    Ok(())
}

fn quantity_out_of_range() -> AppError {
    AppError::invalid_field(
        "quantity",
        "quantity_out_of_range",
        "Quantidade grande demais para ser convertida",
    )
}

// --- 1. Unidades de Medida ---
// Catálogo fixo, espelhado no enum `unit_of_measure` do banco.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "unit_of_measure", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    G,
    Kg,
    Mg,
    Oz,
    Lb,
    Ml,
    L,
    Unidade,
    Pacote,
    Caixa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Mass,
    Volume,
    Count,
}

impl Unit {
    pub const ALL: [Unit; 10] = [
        Unit::G,
        Unit::Kg,
        Unit::Mg,
        Unit::Oz,
        Unit::Lb,
        Unit::Ml,
        Unit::L,
        Unit::Unidade,
        Unit::Pacote,
        Unit::Caixa,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Unit::G => "Gramas",
            Unit::Kg => "Quilogramas",
            Unit::Mg => "Miligramas",
            Unit::Oz => "Onças",
            Unit::Lb => "Libras",
            Unit::Ml => "Mililitros",
            Unit::L => "Litros",
            Unit::Unidade => "Unidade",
            Unit::Pacote => "Pacote",
            Unit::Caixa => "Caixa",
        }
    }

    pub fn dimension(self) -> Dimension {
        match self {
            Unit::G | Unit::Kg | Unit::Mg | Unit::Oz | Unit::Lb => Dimension::Mass,
            Unit::Ml | Unit::L => Dimension::Volume,
            Unit::Unidade | Unit::Pacote | Unit::Caixa => Dimension::Count,
        }
    }

    /// Quantidade de referência do preço de um insumo nesta unidade.
    ///
    /// Insumos em g, ml e mg têm o preço cadastrado por kg, litro e grama,
    /// respectivamente; as quantidades dos produtos vêm na unidade miúda.
    pub fn price_basis(self) -> Decimal {
        match self {
            Unit::G | Unit::Ml | Unit::Mg => Decimal::ONE_THOUSAND,
            _ => Decimal::ONE,
        }
    }

    // Fator para a unidade base da dimensão (g para massa, ml para volume).
    fn base_factor(self) -> Decimal {
        match self {
            Unit::Mg => Decimal::new(1, 3),
            Unit::G | Unit::Ml => Decimal::ONE,
            Unit::Kg | Unit::L => Decimal::ONE_THOUSAND,
            Unit::Oz => Decimal::new(28_349_523_125, 9),
            Unit::Lb => Decimal::new(45_359_237, 5),
            Unit::Unidade | Unit::Pacote | Unit::Caixa => Decimal::ONE,
        }
    }

    /// Converte `value` desta unidade para `target`.
    ///
    /// Unidades de contagem (unidade, pacote, caixa) só "convertem" para si mesmas.
    pub fn convert(self, value: Decimal, target: Unit) -> Result<Decimal, AppError> {
        if self == target {
            return Ok(value);
        }

        if self.dimension() == Dimension::Count
            || target.dimension() == Dimension::Count
            || self.dimension() != target.dimension()
        {
            return Err(AppError::invalid_field(
                "unit",
                "incompatible_unit",
                "Não é possível converter entre unidades de grandezas diferentes.",
            ));
        }

        value
            .checked_mul(self.base_factor())
            .and_then(|v| v.checked_div(target.base_factor()))
            .ok_or_else(quantity_out_of_range)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UnitInfo {
    pub value: Unit,
    pub name: String,
}

impl From<Unit> for UnitInfo {
    fn from(unit: Unit) -> Self {
        Self { value: unit, name: unit.label().to_string() }
    }
}

// --- 2. Categorias ---
// Mesmo formato para categorias de insumos e de produtos (tabelas separadas).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub organization_id: Uuid,
    #[schema(example = "Laticínios")]
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPayload {
    #[validate(length(min = 1, message = "O nome da categoria é obrigatório."))]
    pub name: String,
    pub description: Option<String>,
}

// --- 3. Insumos ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub category_id: Option<Uuid>,
    #[schema(example = "Farinha de trigo")]
    pub name: String,
    pub description: Option<String>,
    pub unit: Unit,
    #[schema(example = "5.90")]
    pub price: Decimal,
    pub discounted_price: Option<Decimal>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Preço usado no custo: o com desconto, quando houver.
    pub fn effective_price(&self) -> Decimal {
        self.discounted_price.unwrap_or(self.price)
    }
}

// Insumo com o nome da categoria embutido (LEFT JOIN)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemWithCategory {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub item: Item,
    pub category_name: Option<String>,
}

// Mesmo payload para criação e edição (edição sobrescreve todos os campos).
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemPayload {
    #[validate(length(min = 1, message = "O nome do insumo é obrigatório."))]
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub unit: Unit,
    #[schema(example = "20.00")]
    pub price: Decimal,
    pub discounted_price: Option<Decimal>,
}

// --- 4. Histórico de preços (somente inserção) ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemPriceHistoryEntry {
    pub id: Uuid,
    pub item_id: Uuid,
    pub old_price: Decimal,
    pub new_price: Decimal,
    pub changed_at: DateTime<Utc>,
}

/// Regras de preço de um insumo, checadas antes de qualquer escrita.
pub fn validate_item_prices(price: Decimal, discounted_price: Option<Decimal>) -> Result<(), AppError> {
    check_stored_amount("price", price)?;
    if let Some(discounted) = discounted_price {
        check_stored_amount("discountedPrice", discounted)?;
    }

    if price <= Decimal::ZERO {
        return Err(AppError::invalid_field(
            "price",
            "price_not_positive",
            "O preço deve ser maior que zero",
        ));
    }

    if let Some(discounted) = discounted_price {
        if discounted <= Decimal::ZERO {
            return Err(AppError::invalid_field(
                "discountedPrice",
                "discount_not_positive",
                "O preço com desconto deve ser maior que zero",
            ));
        }
        if discounted >= price {
            return Err(AppError::invalid_field(
                "discountedPrice",
                "discount_not_below_price",
                "O preço com desconto deve ser menor que o preço original",
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn discount_above_price_is_rejected() {
        let err = validate_item_prices(dec("10.00"), Some(dec("12.00"))).unwrap_err();
        match err {
            AppError::ValidationError(errors) => {
                assert!(errors.field_errors().contains_key("discountedPrice"));
            }
            other => panic!("esperava erro de validação, veio {other:?}"),
        }
    }

    #[test]
    fn discount_equal_to_price_is_rejected() {
        assert!(validate_item_prices(dec("10.00"), Some(dec("10.00"))).is_err());
    }

    #[test]
    fn non_positive_prices_are_rejected() {
        assert!(validate_item_prices(Decimal::ZERO, None).is_err());
        assert!(validate_item_prices(dec("10"), Some(Decimal::ZERO)).is_err());
        assert!(validate_item_prices(dec("10"), Some(dec("9.99"))).is_ok());
    }

    #[test]
    fn discount_beyond_stored_scale_is_rejected() {
        // 9,99999 viraria 10,0000 no banco, igual ao preço
        let err = validate_item_prices(dec("10"), Some(dec("9.99999"))).unwrap_err();
        match err {
            AppError::ValidationError(errors) => {
                assert_eq!(errors.field_errors()["discountedPrice"][0].code, "too_many_decimals");
            }
            other => panic!("esperava erro de validação, veio {other:?}"),
        }
        // zeros à direita não contam
        assert!(validate_item_prices(dec("10.000000"), Some(dec("9.990000"))).is_ok());
    }

    #[test]
    fn prices_that_do_not_fit_the_column_are_rejected() {
        assert!(validate_item_prices(dec("9999999999.9999"), None).is_ok());
        let err = validate_item_prices(dec("10000000000"), None).unwrap_err();
        match err {
            AppError::ValidationError(errors) => {
                assert_eq!(errors.field_errors()["price"][0].code, "amount_out_of_range");
            }
            other => panic!("esperava erro de validação, veio {other:?}"),
        }
    }

    #[test]
    fn huge_quantity_conversion_fails_without_panicking() {
        let err = Unit::Kg.convert(Decimal::MAX, Unit::G).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn price_basis_follows_unit_granularity() {
        assert_eq!(Unit::G.price_basis(), dec("1000"));
        assert_eq!(Unit::Ml.price_basis(), dec("1000"));
        assert_eq!(Unit::Kg.price_basis(), Decimal::ONE);
        assert_eq!(Unit::Unidade.price_basis(), Decimal::ONE);
    }

    #[test]
    fn converts_within_a_dimension() {
        assert_eq!(Unit::G.convert(dec("500"), Unit::Kg).unwrap(), dec("0.5"));
        assert_eq!(Unit::L.convert(dec("1.5"), Unit::Ml).unwrap(), dec("1500"));
        assert_eq!(Unit::Mg.convert(dec("250"), Unit::G).unwrap(), dec("0.25"));
    }

    #[test]
    fn refuses_to_convert_across_dimensions() {
        assert!(Unit::G.convert(dec("1"), Unit::Ml).is_err());
        assert!(Unit::Unidade.convert(dec("1"), Unit::Caixa).is_err());
        assert_eq!(Unit::Caixa.convert(dec("3"), Unit::Caixa).unwrap(), dec("3"));
    }

    #[test]
    fn effective_price_prefers_discount() {
        let mut item = Item {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            category_id: None,
            name: "Manteiga".into(),
            description: None,
            unit: Unit::G,
            price: dec("40"),
            discounted_price: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(item.effective_price(), dec("40"));
        item.discounted_price = Some(dec("35"));
        assert_eq!(item.effective_price(), dec("35"));
    }
}
