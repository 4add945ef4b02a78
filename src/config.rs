// src/config.rs

use std::{env, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        CategoryRepository, ClientStateRepository, ItemRepository, PgCostStore, ProductRepository,
        TenancyRepository, UserRepository,
    },
    services::{
        auth::AuthService, category_service::CategoryService, cost_engine::CostEngine,
        item_service::ItemService, product_service::ProductService, tenancy_service::TenancyService,
    },
};

// Configuração lida do ambiente (.env incluído)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub jwt_ttl_days: i64,
    pub password_reset_ttl_minutes: i64,
}

fn var_or<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{} tem um valor inválido: '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:3000".to_string())?,
            db_max_connections: var_or("DB_MAX_CONNECTIONS", 5)?,
            jwt_ttl_days: var_or("JWT_TTL_DAYS", 7)?,
            password_reset_ttl_minutes: var_or("PASSWORD_RESET_TTL_MINUTES", 60)?,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub tenancy_service: TenancyService,
    pub category_service: CategoryService,
    pub item_service: ItemService,
    pub product_service: ProductService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::from_pool(db_pool, config))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_pool(db_pool: PgPool, config: &Config) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let tenancy_repo = TenancyRepository::new(db_pool.clone());
        let client_state_repo = ClientStateRepository::new(db_pool.clone());
        let category_repo = CategoryRepository::new(db_pool.clone());
        let item_repo = ItemRepository::new(db_pool.clone());
        let product_repo = ProductRepository::new(db_pool.clone());

        let engine = CostEngine::new(PgCostStore::new(item_repo.clone(), product_repo.clone()));
        let category_service = CategoryService::new(category_repo);

        let auth_service = AuthService::new(
            user_repo,
            config.jwt_secret.clone(),
            chrono::Duration::days(config.jwt_ttl_days),
            chrono::Duration::minutes(config.password_reset_ttl_minutes),
            db_pool.clone(),
        );
        let tenancy_service = TenancyService::new(tenancy_repo, client_state_repo, db_pool.clone());
        let item_service = ItemService::new(item_repo, category_service.clone(), engine.clone());
        let product_service = ProductService::new(product_repo, category_service.clone(), engine);

        Self {
            db_pool,
            auth_service,
            tenancy_service,
            category_service,
            item_service,
            product_service,
        }
    }
}
