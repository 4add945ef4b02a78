// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::AppState,
    docs::ApiDoc,
    handlers,
    middleware::auth::{auth_guard, tenant_guard},
};

pub fn build_router(app_state: AppState) -> Router {
    // Rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/password-reset", post(handlers::auth::request_password_reset))
        .route("/password-reset/confirm", post(handlers::auth::confirm_password_reset));

    // Logout precisa do token atual
    let logout_route = Router::new()
        .route("/logout", post(handlers::auth::logout))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Empresas: só exigem login (ainda não há empresa escolhida)
    let organization_routes = Router::new()
        .route(
            "/",
            post(handlers::tenancy::create_organization).get(handlers::tenancy::list_my_organizations),
        )
        .route("/select", post(handlers::tenancy::select_organization))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Tudo abaixo exige login + x-tenant-id de uma empresa do usuário
    let tenant_routes = Router::new()
        .route(
            "/item-categories",
            get(handlers::categories::list_item_categories).post(handlers::categories::create_item_category),
        )
        .route(
            "/item-categories/{id}",
            put(handlers::categories::update_item_category).delete(handlers::categories::delete_item_category),
        )
        .route(
            "/product-categories",
            get(handlers::categories::list_product_categories).post(handlers::categories::create_product_category),
        )
        .route(
            "/product-categories/{id}",
            put(handlers::categories::update_product_category).delete(handlers::categories::delete_product_category),
        )
        .route(
            "/items",
            get(handlers::items::list_items).post(handlers::items::create_item),
        )
        .route(
            "/items/{id}",
            get(handlers::items::get_item)
                .put(handlers::items::update_item)
                .delete(handlers::items::delete_item),
        )
        .route("/items/{id}/price-history", get(handlers::items::get_item_price_history))
        .route(
            "/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/products/{id}",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route(
            "/products/{id}/price-history",
            get(handlers::products::get_product_price_history),
        )
        .route(
            "/products/{id}/lines",
            get(handlers::products::list_product_lines).post(handlers::products::add_product_line),
        )
        .route(
            "/products/{id}/lines/{line_id}",
            put(handlers::products::update_product_line).delete(handlers::products::remove_product_line),
        )
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/units", get(handlers::items::list_units))
        .route("/api/session", get(handlers::tenancy::get_session))
        .nest("/api/auth", auth_routes.merge(logout_route))
        .nest("/api/users", user_routes)
        .nest("/api/organizations", organization_routes)
        .nest("/api", tenant_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
