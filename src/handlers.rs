pub mod auth;
pub mod categories;
pub mod items;
pub mod products;
pub mod tenancy;
