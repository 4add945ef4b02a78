pub mod auth;
pub mod category_service;
pub mod cost_engine;
pub mod item_service;
pub mod product_service;
pub mod resolver;
pub mod tenancy_service;
pub mod tenant_session;
