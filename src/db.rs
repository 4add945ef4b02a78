pub mod category_repo;
pub use category_repo::{CategoryKind, CategoryRepository};
pub mod client_state_repo;
pub use client_state_repo::ClientStateRepository;
pub mod cost_store;
pub use cost_store::PgCostStore;
pub mod item_repo;
pub use item_repo::ItemRepository;
pub mod product_repo;
pub use product_repo::ProductRepository;
pub mod tenancy_repo;
pub use tenancy_repo::TenancyRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
