// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::request_password_reset,
        handlers::auth::confirm_password_reset,

        // --- Users ---
        handlers::auth::get_me,

        // --- Tenancy ---
        handlers::tenancy::list_my_organizations,
        handlers::tenancy::create_organization,
        handlers::tenancy::select_organization,
        handlers::tenancy::get_session,

        // --- Categories ---
        handlers::categories::list_item_categories,
        handlers::categories::create_item_category,
        handlers::categories::update_item_category,
        handlers::categories::delete_item_category,
        handlers::categories::list_product_categories,
        handlers::categories::create_product_category,
        handlers::categories::update_product_category,
        handlers::categories::delete_product_category,

        // --- Items ---
        handlers::items::list_units,
        handlers::items::list_items,
        handlers::items::create_item,
        handlers::items::get_item,
        handlers::items::update_item,
        handlers::items::delete_item,
        handlers::items::get_item_price_history,

        // --- Products ---
        handlers::products::list_products,
        handlers::products::create_product,
        handlers::products::get_product,
        handlers::products::update_product,
        handlers::products::delete_product,
        handlers::products::get_product_price_history,
        handlers::products::list_product_lines,
        handlers::products::add_product_line,
        handlers::products::update_product_line,
        handlers::products::remove_product_line,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::PasswordResetRequestPayload,
            models::auth::PasswordResetConfirmPayload,
            models::auth::AuthResponse,

            // --- Tenancy ---
            models::tenancy::Organization,
            models::tenancy::MembershipRole,
            models::tenancy::Membership,
            models::tenancy::CreateOrganizationPayload,
            models::tenancy::SelectOrganizationPayload,

            // --- Sessão ---
            services::resolver::AuthStatus,
            services::resolver::MembershipStatus,
            services::resolver::TenantPhase,
            services::resolver::Action,
            services::resolver::Decision,
            services::tenant_session::CachedHint,
            services::tenant_session::SessionSnapshot,

            // --- Items ---
            models::items::Unit,
            models::items::UnitInfo,
            models::items::Category,
            models::items::CategoryPayload,
            models::items::Item,
            models::items::ItemWithCategory,
            models::items::ItemPayload,
            models::items::ItemPriceHistoryEntry,

            // --- Products ---
            models::products::Product,
            models::products::ProductView,
            models::products::ProductPayload,
            models::products::ProductItemLine,
            models::products::AddItemLinePayload,
            models::products::UpdateItemLinePayload,
            models::products::ItemLineChange,
            models::products::ItemLineDetail,
            models::products::ProductDetail,
            models::products::ProductPriceHistoryEntry,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Usuário"),
        (name = "Tenancy", description = "Empresas, seleção da empresa atual e decisão de navegação"),
        (name = "Categories", description = "Categorias de Insumos e Produtos"),
        (name = "Items", description = "Insumos e Unidades de Medida"),
        (name = "Products", description = "Produtos, Composição, Custo e Margem")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme("api_jwt", SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));
    }
}
