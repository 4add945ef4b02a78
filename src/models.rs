pub mod auth;
pub mod items;
pub mod products;
pub mod tenancy;
