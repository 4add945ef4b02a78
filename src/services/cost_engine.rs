// src/services/cost_engine.rs
//
// Motor de custos: único lugar que escreve `total_cost` e `margin` de um produto.
// Toda mudança nas linhas (insumos do produto) passa por `mutate_lines`,
// que recalcula o produto logo depois da escrita.

use std::future::Future;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        items::{check_stored_amount, validate_item_prices, Item, Unit, STORED_LIMIT, STORED_SCALE},
        products::{validate_product_prices, NewItemLine, Product, ProductItemLine},
    },
};

/// Acesso ao banco de que o motor precisa. Tudo já filtrado pela empresa.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CostStore: Send + Sync {
    async fn find_item(&self, organization_id: Uuid, item_id: Uuid) -> Result<Option<Item>, AppError>;
    async fn find_product(&self, organization_id: Uuid, product_id: Uuid) -> Result<Option<Product>, AppError>;
    async fn find_line(&self, product_id: Uuid, line_id: Uuid) -> Result<Option<ProductItemLine>, AppError>;
    async fn list_lines(&self, product_id: Uuid) -> Result<Vec<ProductItemLine>, AppError>;

    async fn insert_line(&self, line: &NewItemLine) -> Result<ProductItemLine, AppError>;
    async fn update_line(
        &self,
        line_id: Uuid,
        quantity: Decimal,
        unit: Unit,
        cost: Decimal,
    ) -> Result<ProductItemLine, AppError>;
    async fn delete_line(&self, line_id: Uuid) -> Result<(), AppError>;

    async fn write_derived(&self, product_id: Uuid, total_cost: Decimal, margin: Decimal) -> Result<Product, AppError>;
    async fn write_sale_price(&self, product_id: Uuid, sale_price: Decimal) -> Result<Product, AppError>;
    async fn write_item_price(
        &self,
        item_id: Uuid,
        price: Decimal,
        discounted_price: Option<Decimal>,
    ) -> Result<Item, AppError>;

    async fn append_item_price_history(&self, item_id: Uuid, old_price: Decimal, new_price: Decimal) -> Result<(), AppError>;
    async fn append_product_price_history(
        &self,
        product_id: Uuid,
        old_price: Decimal,
        new_price: Decimal,
    ) -> Result<(), AppError>;
}

/// Custo de `quantity` (em `unit`) do insumo.
///
/// O preço do insumo é dado por `price_basis` unidades (ex.: insumo em gramas
/// tem preço por kg), então: `preço efetivo / base × quantidade na unidade do insumo`.
pub fn line_cost(item: &Item, quantity: Decimal, unit: Unit) -> Result<Decimal, AppError> {
    let quantity_in_item_unit = unit.convert(quantity, item.unit)?;
    let cost = item
        .effective_price()
        .checked_div(item.unit.price_basis())
        .and_then(|per_unit| per_unit.checked_mul(quantity_in_item_unit))
        .map(|cost| cost.round_dp(STORED_SCALE))
        .filter(|cost| *cost < STORED_LIMIT)
        .ok_or_else(|| out_of_range("cost_out_of_range", "O custo desta quantidade passa do máximo permitido"))?;
    Ok(cost)
}

/// Margem (%) sobre o preço de venda. Zero quando não há custo ou preço.
pub fn margin(sale_price: Decimal, total_cost: Decimal) -> Result<Decimal, AppError> {
    if total_cost <= Decimal::ZERO || sale_price <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    sale_price
        .checked_sub(total_cost)
        .and_then(|profit| profit.checked_div(sale_price))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|pct| pct.round_dp(STORED_SCALE))
        .ok_or_else(|| out_of_range("margin_out_of_range", "A margem do produto não pode ser calculada"))
}

fn out_of_range(code: &'static str, message: &'static str) -> AppError {
    AppError::invalid_field("quantity", code, message)
}

fn validate_quantity(quantity: Decimal) -> Result<(), AppError> {
    check_stored_amount("quantity", quantity)?;
    if quantity <= Decimal::ZERO {
        return Err(AppError::invalid_field(
            "quantity",
            "quantity_not_positive",
            "A quantidade deve ser maior que zero",
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct CostEngine<S> {
    store: S,
}

impl<S: CostStore> CostEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    // Executa a mutação das linhas e, se ela deu certo, recalcula o produto.
    // Sem transação: se o recálculo falhar a linha fica gravada e os campos
    // derivados ficam desatualizados até a próxima mutação.
    async fn mutate_lines<T, F, Fut>(
        &self,
        organization_id: Uuid,
        product_id: Uuid,
        mutation: F,
    ) -> Result<(T, Product), AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let outcome = mutation().await?;

        match self.recompute_product(organization_id, product_id).await {
            Ok(product) => Ok((outcome, product)),
            Err(e) => {
                tracing::warn!(%product_id, "Linha gravada, mas o recálculo do produto falhou: {}", e);
                Err(e)
            }
        }
    }

    async fn load_product(&self, organization_id: Uuid, product_id: Uuid) -> Result<Product, AppError> {
        self.store
            .find_product(organization_id, product_id)
            .await?
            .ok_or(AppError::ProductNotFound)
    }

    async fn load_item(&self, organization_id: Uuid, item_id: Uuid) -> Result<Item, AppError> {
        self.store
            .find_item(organization_id, item_id)
            .await?
            .ok_or(AppError::ItemNotFound)
    }

    /// Adiciona um insumo ao produto. Sem `unit`, usa a unidade do próprio insumo.
    pub async fn add_item_line(
        &self,
        organization_id: Uuid,
        product_id: Uuid,
        item_id: Uuid,
        quantity: Decimal,
        unit: Option<Unit>,
    ) -> Result<(ProductItemLine, Product), AppError> {
        validate_quantity(quantity)?;

        let product = self.load_product(organization_id, product_id).await?;
        let item = self.load_item(organization_id, item_id).await?;
        if !item.active {
            return Err(AppError::InactiveItem);
        }

        let unit = unit.unwrap_or(item.unit);
        let new_line = NewItemLine {
            product_id: product.id,
            item_id: item.id,
            quantity,
            unit,
            cost: line_cost(&item, quantity, unit)?,
        };

        self.mutate_lines(organization_id, product.id, || self.store.insert_line(&new_line))
            .await
    }

    pub async fn update_item_line(
        &self,
        organization_id: Uuid,
        product_id: Uuid,
        line_id: Uuid,
        quantity: Decimal,
        unit: Option<Unit>,
    ) -> Result<(ProductItemLine, Product), AppError> {
        validate_quantity(quantity)?;

        let product = self.load_product(organization_id, product_id).await?;
        let line = self
            .store
            .find_line(product.id, line_id)
            .await?
            .ok_or(AppError::LineNotFound)?;
        let item = self.load_item(organization_id, line.item_id).await?;

        let unit = unit.unwrap_or(line.unit);
        let cost = line_cost(&item, quantity, unit)?;

        self.mutate_lines(organization_id, product.id, || {
            self.store.update_line(line.id, quantity, unit, cost)
        })
        .await
    }

    pub async fn remove_item_line(
        &self,
        organization_id: Uuid,
        product_id: Uuid,
        line_id: Uuid,
    ) -> Result<Product, AppError> {
        let product = self.load_product(organization_id, product_id).await?;
        let line = self
            .store
            .find_line(product.id, line_id)
            .await?
            .ok_or(AppError::LineNotFound)?;

        let ((), product) = self
            .mutate_lines(organization_id, product.id, || self.store.delete_line(line.id))
            .await?;
        Ok(product)
    }

    /// Recalcula e grava `total_cost` e `margin` a partir das linhas atuais.
    pub async fn recompute_product(&self, organization_id: Uuid, product_id: Uuid) -> Result<Product, AppError> {
        let product = self.load_product(organization_id, product_id).await?;
        let lines = self.store.list_lines(product.id).await?;

        let total_cost = lines
            .iter()
            .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.cost))
            .ok_or_else(|| out_of_range("total_cost_out_of_range", "O custo total do produto passa do máximo permitido"))?;
        let margin = margin(product.sale_price, total_cost)?;

        tracing::debug!(%product_id, %total_cost, %margin, "Produto recalculado");
        self.store.write_derived(product.id, total_cost, margin).await
    }

    /// Novo preço de venda: grava histórico e recalcula a margem.
    /// Preço igual ao atual não gera histórico nem recálculo.
    pub async fn update_sale_price(
        &self,
        organization_id: Uuid,
        product_id: Uuid,
        new_price: Decimal,
    ) -> Result<Product, AppError> {
        validate_product_prices(new_price, None)?;

        let product = self.load_product(organization_id, product_id).await?;
        if product.sale_price == new_price {
            return Ok(product);
        }
        validate_product_prices(new_price, product.promotional_price)?;

        self.store
            .append_product_price_history(product.id, product.sale_price, new_price)
            .await?;
        self.store.write_sale_price(product.id, new_price).await?;

        self.recompute_product(organization_id, product.id).await
    }

    /// Novo preço (e desconto) de um insumo. Linhas já gravadas mantêm o custo antigo.
    pub async fn update_item_price(
        &self,
        organization_id: Uuid,
        item_id: Uuid,
        new_price: Decimal,
        discounted_price: Option<Decimal>,
    ) -> Result<Item, AppError> {
        validate_item_prices(new_price, discounted_price)?;

        let item = self.load_item(organization_id, item_id).await?;
        if item.price == new_price && item.discounted_price == discounted_price {
            return Ok(item);
        }

        if item.price != new_price {
            self.store
                .append_item_price_history(item.id, item.price, new_price)
                .await?;
        }

        self.store
            .write_item_price(item.id, new_price, discounted_price)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    // --- Banco em memória ---
    #[derive(Default)]
    struct Tables {
        items: HashMap<Uuid, Item>,
        products: HashMap<Uuid, Product>,
        lines: Vec<ProductItemLine>,
        item_history: Vec<(Uuid, Decimal, Decimal)>,
        product_history: Vec<(Uuid, Decimal, Decimal)>,
    }

    #[derive(Clone, Default)]
    struct MemoryStore {
        tables: Arc<Mutex<Tables>>,
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    impl MemoryStore {
        fn add_item(&self, org: Uuid, unit: Unit, price: &str, discounted: Option<&str>) -> Item {
            let item = Item {
                id: Uuid::new_v4(),
                organization_id: org,
                category_id: None,
                name: "Insumo".into(),
                description: None,
                unit,
                price: dec(price),
                discounted_price: discounted.map(dec),
                active: true,
                created_at: now(),
                updated_at: now(),
            };
            self.tables.lock().unwrap().items.insert(item.id, item.clone());
            item
        }

        fn add_product(&self, org: Uuid, sale_price: &str) -> Product {
            let product = Product {
                id: Uuid::new_v4(),
                organization_id: org,
                category_id: None,
                name: "Produto".into(),
                description: None,
                sale_price: dec(sale_price),
                promotional_price: None,
                total_cost: Decimal::ZERO,
                margin: Decimal::ZERO,
                active: true,
                created_at: now(),
                updated_at: now(),
            };
            self.tables.lock().unwrap().products.insert(product.id, product.clone());
            product
        }

        fn deactivate(&self, item_id: Uuid) {
            if let Some(item) = self.tables.lock().unwrap().items.get_mut(&item_id) {
                item.active = false;
            }
        }

        fn product(&self, id: Uuid) -> Product {
            self.tables.lock().unwrap().products[&id].clone()
        }

        fn line_cost_sum(&self, product_id: Uuid) -> Decimal {
            self.tables
                .lock()
                .unwrap()
                .lines
                .iter()
                .filter(|l| l.product_id == product_id)
                .map(|l| l.cost)
                .sum()
        }

        fn product_history_len(&self) -> usize {
            self.tables.lock().unwrap().product_history.len()
        }
    }

    #[async_trait]
    impl CostStore for MemoryStore {
        async fn find_item(&self, org: Uuid, item_id: Uuid) -> Result<Option<Item>, AppError> {
            let t = self.tables.lock().unwrap();
            Ok(t.items.get(&item_id).filter(|i| i.organization_id == org).cloned())
        }

        async fn find_product(&self, org: Uuid, product_id: Uuid) -> Result<Option<Product>, AppError> {
            let t = self.tables.lock().unwrap();
            Ok(t.products.get(&product_id).filter(|p| p.organization_id == org).cloned())
        }

        async fn find_line(&self, product_id: Uuid, line_id: Uuid) -> Result<Option<ProductItemLine>, AppError> {
            let t = self.tables.lock().unwrap();
            Ok(t.lines
                .iter()
                .find(|l| l.id == line_id && l.product_id == product_id)
                .cloned())
        }

        async fn list_lines(&self, product_id: Uuid) -> Result<Vec<ProductItemLine>, AppError> {
            let t = self.tables.lock().unwrap();
            Ok(t.lines.iter().filter(|l| l.product_id == product_id).cloned().collect())
        }

        async fn insert_line(&self, line: &NewItemLine) -> Result<ProductItemLine, AppError> {
            let row = ProductItemLine {
                id: Uuid::new_v4(),
                product_id: line.product_id,
                item_id: line.item_id,
                quantity: line.quantity,
                unit: line.unit,
                cost: line.cost,
                created_at: now(),
                updated_at: now(),
            };
            self.tables.lock().unwrap().lines.push(row.clone());
            Ok(row)
        }

        async fn update_line(
            &self,
            line_id: Uuid,
            quantity: Decimal,
            unit: Unit,
            cost: Decimal,
        ) -> Result<ProductItemLine, AppError> {
            let mut t = self.tables.lock().unwrap();
            let line = t
                .lines
                .iter_mut()
                .find(|l| l.id == line_id)
                .ok_or(AppError::LineNotFound)?;
            line.quantity = quantity;
            line.unit = unit;
            line.cost = cost;
            Ok(line.clone())
        }

        async fn delete_line(&self, line_id: Uuid) -> Result<(), AppError> {
            self.tables.lock().unwrap().lines.retain(|l| l.id != line_id);
            Ok(())
        }

        async fn write_derived(&self, product_id: Uuid, total_cost: Decimal, margin: Decimal) -> Result<Product, AppError> {
            let mut t = self.tables.lock().unwrap();
            let p = t.products.get_mut(&product_id).ok_or(AppError::ProductNotFound)?;
            p.total_cost = total_cost;
            p.margin = margin;
            Ok(p.clone())
        }

        async fn write_sale_price(&self, product_id: Uuid, sale_price: Decimal) -> Result<Product, AppError> {
            let mut t = self.tables.lock().unwrap();
            let p = t.products.get_mut(&product_id).ok_or(AppError::ProductNotFound)?;
            p.sale_price = sale_price;
            Ok(p.clone())
        }

        async fn write_item_price(
            &self,
            item_id: Uuid,
            price: Decimal,
            discounted_price: Option<Decimal>,
        ) -> Result<Item, AppError> {
            let mut t = self.tables.lock().unwrap();
            let i = t.items.get_mut(&item_id).ok_or(AppError::ItemNotFound)?;
            i.price = price;
            i.discounted_price = discounted_price;
            Ok(i.clone())
        }

        async fn append_item_price_history(&self, item_id: Uuid, old: Decimal, new: Decimal) -> Result<(), AppError> {
            self.tables.lock().unwrap().item_history.push((item_id, old, new));
            Ok(())
        }

        async fn append_product_price_history(&self, product_id: Uuid, old: Decimal, new: Decimal) -> Result<(), AppError> {
            self.tables.lock().unwrap().product_history.push((product_id, old, new));
            Ok(())
        }
    }

    fn setup() -> (CostEngine<MemoryStore>, MemoryStore, Uuid) {
        let store = MemoryStore::default();
        (CostEngine::new(store.clone()), store, Uuid::new_v4())
    }

    // --- Fórmulas ---

    #[test]
    fn margin_is_zero_without_cost_or_price() {
        assert_eq!(margin(dec("30"), Decimal::ZERO).unwrap(), Decimal::ZERO);
        assert_eq!(margin(Decimal::ZERO, dec("10")).unwrap(), Decimal::ZERO);
        assert_eq!(margin(dec("30"), dec("15")).unwrap(), dec("50"));
        assert_eq!(margin(dec("10"), dec("15")).unwrap(), dec("-50"));
    }

    #[test]
    fn line_cost_uses_discount_and_unit_conversion() {
        let store = MemoryStore::default();
        let flour = store.add_item(Uuid::new_v4(), Unit::G, "8.00", Some("6.00"));
        // 6,00/kg × 2 kg convertidos para 2000 g
        assert_eq!(line_cost(&flour, dec("2"), Unit::Kg).unwrap(), dec("12"));
        assert!(line_cost(&flour, dec("1"), Unit::Ml).is_err());
    }

    // --- Cenários ---

    #[tokio::test]
    async fn cost_propagates_through_lines_and_sale_price() {
        let (engine, store, org) = setup();
        let flour = store.add_item(org, Unit::G, "20.00", None);
        let egg = store.add_item(org, Unit::Unidade, "5.00", None);
        let product = store.add_product(org, "1.00");

        let (line, p) = engine
            .add_item_line(org, product.id, flour.id, dec("500"), None)
            .await
            .unwrap();
        assert_eq!(line.cost, dec("10"));
        assert_eq!(p.total_cost, dec("10"));

        let (_, p) = engine
            .add_item_line(org, product.id, egg.id, dec("1"), None)
            .await
            .unwrap();
        assert_eq!(p.total_cost, dec("15"));

        let p = engine.update_sale_price(org, product.id, dec("30.00")).await.unwrap();
        assert_eq!(p.margin, dec("50"));
        assert!(!crate::models::products::ProductView::from(p).low_margin);
    }

    #[tokio::test]
    async fn total_cost_matches_lines_after_any_sequence() {
        let (engine, store, org) = setup();
        let milk = store.add_item(org, Unit::Ml, "6.50", None);
        let sugar = store.add_item(org, Unit::Kg, "4.20", Some("3.99"));
        let product = store.add_product(org, "25");

        let (a, _) = engine.add_item_line(org, product.id, milk.id, dec("350"), None).await.unwrap();
        let (b, _) = engine
            .add_item_line(org, product.id, sugar.id, dec("250"), Some(Unit::G))
            .await
            .unwrap();
        engine.update_item_line(org, product.id, a.id, dec("1.2"), Some(Unit::L)).await.unwrap();
        engine.add_item_line(org, product.id, milk.id, dec("10"), None).await.unwrap();
        let p = engine.remove_item_line(org, product.id, b.id).await.unwrap();

        assert_eq!(p.total_cost, store.line_cost_sum(product.id));
        assert_eq!(p.margin, margin(p.sale_price, p.total_cost).unwrap());
        assert_eq!(store.product(product.id), p);
    }

    #[tokio::test]
    async fn add_then_remove_restores_previous_totals() {
        let (engine, store, org) = setup();
        let butter = store.add_item(org, Unit::G, "42.00", None);
        let product = store.add_product(org, "18");
        engine.add_item_line(org, product.id, butter.id, dec("100"), None).await.unwrap();
        let before = store.product(product.id);

        let (line, _) = engine.add_item_line(org, product.id, butter.id, dec("37"), None).await.unwrap();
        let after = engine.remove_item_line(org, product.id, line.id).await.unwrap();

        assert_eq!(after.total_cost, before.total_cost);
        assert_eq!(after.margin, before.margin);
    }

    #[tokio::test]
    async fn empty_product_has_zero_cost_and_margin() {
        let (engine, store, org) = setup();
        let product = store.add_product(org, "12");

        let p = engine.recompute_product(org, product.id).await.unwrap();

        assert_eq!(p.total_cost, Decimal::ZERO);
        assert_eq!(p.margin, Decimal::ZERO);
    }

    #[tokio::test]
    async fn same_sale_price_is_a_no_op() {
        let (engine, store, org) = setup();
        let product = store.add_product(org, "30");

        engine.update_sale_price(org, product.id, dec("30")).await.unwrap();
        assert_eq!(store.product_history_len(), 0);

        engine.update_sale_price(org, product.id, dec("32")).await.unwrap();
        engine.update_sale_price(org, product.id, dec("32")).await.unwrap();
        assert_eq!(store.product_history_len(), 1);
    }

    #[tokio::test]
    async fn same_sale_price_keeps_cost_and_margin() {
        let (engine, store, org) = setup();
        let cocoa = store.add_item(org, Unit::G, "60.00", None);
        let product = store.add_product(org, "30");
        let (_, before) = engine
            .add_item_line(org, product.id, cocoa.id, dec("125"), None)
            .await
            .unwrap();
        assert_eq!(before.total_cost, dec("7.5"));

        let after = engine.update_sale_price(org, product.id, dec("30.00")).await.unwrap();

        assert_eq!(after, before);
        assert_eq!(store.product(product.id), before);
        assert_eq!(store.product_history_len(), 0);
    }

    #[tokio::test]
    async fn same_sale_price_writes_nothing() {
        let org = Uuid::new_v4();
        let mut product = MemoryStore::default().add_product(org, "30");
        product.total_cost = dec("7.5");
        product.margin = dec("75");

        let mut mock = MockCostStore::new();
        let current = product.clone();
        mock.expect_find_product().returning(move |_, _| Ok(Some(current.clone())));
        mock.expect_write_derived().never();
        mock.expect_write_sale_price().never();
        mock.expect_append_product_price_history().never();

        let engine = CostEngine::new(mock);
        let unchanged = engine.update_sale_price(org, product.id, dec("30")).await.unwrap();

        assert_eq!(unchanged.total_cost, dec("7.5"));
        assert_eq!(unchanged.margin, dec("75"));
    }

    #[tokio::test]
    async fn huge_quantities_are_rejected_instead_of_overflowing() {
        let (engine, store, org) = setup();
        let flour = store.add_item(org, Unit::G, "20.00", None);
        let product = store.add_product(org, "30");

        // Cabe na coluna, mas 9.999.999.999 kg em gramas custa mais que o máximo gravável.
        let err = engine
            .add_item_line(org, product.id, flour.id, dec("9999999999"), Some(Unit::Kg))
            .await
            .unwrap_err();
        match err {
            AppError::ValidationError(errors) => {
                assert_eq!(errors.field_errors()["quantity"][0].code, "cost_out_of_range");
            }
            other => panic!("esperava erro de validação, veio {other:?}"),
        }

        let err = engine
            .add_item_line(org, product.id, flour.id, dec("100000000000000000000000000"), Some(Unit::Kg))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        assert_eq!(store.line_cost_sum(product.id), Decimal::ZERO);
        assert_eq!(store.product(product.id).total_cost, Decimal::ZERO);
    }

    #[tokio::test]
    async fn item_price_change_writes_history_once() {
        let (engine, store, org) = setup();
        let item = store.add_item(org, Unit::Kg, "10.00", None);

        engine.update_item_price(org, item.id, dec("10.00"), None).await.unwrap();
        let updated = engine.update_item_price(org, item.id, dec("11.00"), Some(dec("9.50"))).await.unwrap();

        assert_eq!(updated.effective_price(), dec("9.50"));
        let history = store.tables.lock().unwrap().item_history.clone();
        assert_eq!(history, vec![(item.id, dec("10.00"), dec("11.00"))]);
    }

    #[tokio::test]
    async fn inactive_items_cannot_be_added() {
        let (engine, store, org) = setup();
        let item = store.add_item(org, Unit::Caixa, "3", None);
        store.deactivate(item.id);
        let product = store.add_product(org, "10");

        let err = engine
            .add_item_line(org, product.id, item.id, dec("1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InactiveItem));
    }

    #[tokio::test]
    async fn items_from_another_organization_are_invisible() {
        let (engine, store, org) = setup();
        let foreign = store.add_item(Uuid::new_v4(), Unit::G, "3", None);
        let product = store.add_product(org, "10");

        let err = engine
            .add_item_line(org, product.id, foreign.id, dec("1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ItemNotFound));
    }

    // --- Falhas (mockall) ---

    #[tokio::test]
    async fn invalid_input_never_reaches_the_store() {
        // Sem expectativas: qualquer chamada ao mock faria o teste falhar.
        let engine = CostEngine::new(MockCostStore::new());
        let (org, id) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(engine.add_item_line(org, id, id, Decimal::ZERO, None).await.is_err());
        assert!(engine.update_item_line(org, id, id, dec("-1"), None).await.is_err());
        // 0,00001 seria gravado como 0 e violaria quantity > 0
        assert!(engine.add_item_line(org, id, id, dec("0.00001"), None).await.is_err());
        assert!(engine.update_sale_price(org, id, dec("10.00001")).await.is_err());
        assert!(engine.update_sale_price(org, id, Decimal::ZERO).await.is_err());
        let err = engine
            .update_item_price(org, id, dec("10.00"), Some(dec("12.00")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn recompute_failure_after_line_write_is_reported() {
        let org = Uuid::new_v4();
        let store = MemoryStore::default();
        let product = store.add_product(org, "20");
        let item = store.add_item(org, Unit::Unidade, "2", None);

        let mut mock = MockCostStore::new();
        let (p, i) = (product.clone(), item.clone());
        // A primeira leitura (validação) funciona; a do recálculo falha.
        let calls = std::sync::atomic::AtomicUsize::new(0);
        mock.expect_find_product().returning(move |_, _| {
            if calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                Ok(Some(p.clone()))
            } else {
                Err(AppError::InternalServerError(anyhow::anyhow!("conexão perdida")))
            }
        });
        mock.expect_find_item().returning(move |_, _| Ok(Some(i.clone())));
        mock.expect_insert_line().times(1).returning(|line| {
            Ok(ProductItemLine {
                id: Uuid::new_v4(),
                product_id: line.product_id,
                item_id: line.item_id,
                quantity: line.quantity,
                unit: line.unit,
                cost: line.cost,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
        });
        mock.expect_write_derived().never();

        let engine = CostEngine::new(mock);
        let err = engine
            .add_item_line(org, product.id, item.id, dec("3"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InternalServerError(_)));
    }
}
