// src/handlers/categories.rs
//
// Categorias de insumos (/api/item-categories) e de produtos
// (/api/product-categories). Mesmos handlers, tabelas diferentes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    db::CategoryKind,
    middleware::tenancy::TenantContext,
    models::items::{Category, CategoryPayload},
};

async fn list(app_state: &AppState, kind: CategoryKind, tenant: TenantContext) -> Result<Json<Vec<Category>>, AppError> {
    let categories = app_state.category_service.list(kind, tenant.0).await?;
    Ok(Json(categories))
}

async fn create(
    app_state: &AppState,
    kind: CategoryKind,
    tenant: TenantContext,
    payload: &CategoryPayload,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let category = app_state.category_service.create(kind, tenant.0, payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

// --- Insumos ---

#[utoipa::path(
    get,
    path = "/api/item-categories",
    tag = "Categories",
    responses((status = 200, description = "Categorias de insumos, por nome", body = Vec<Category>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    security(("api_jwt" = []))
)]
pub async fn list_item_categories(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    list(&app_state, CategoryKind::Item, tenant).await
}

#[utoipa::path(
    post,
    path = "/api/item-categories",
    tag = "Categories",
    request_body = CategoryPayload,
    responses(
        (status = 201, description = "Categoria criada", body = Category),
        (status = 409, description = "Já existe categoria com esse nome")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    security(("api_jwt" = []))
)]
pub async fn create_item_category(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CategoryPayload>,
) -> Result<impl IntoResponse, AppError> {
    create(&app_state, CategoryKind::Item, tenant, &payload).await
}

#[utoipa::path(
    put,
    path = "/api/item-categories/{id}",
    tag = "Categories",
    request_body = CategoryPayload,
    responses(
        (status = 200, description = "Categoria atualizada", body = Category),
        (status = 404, description = "Categoria não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Categoria"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_item_category(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryPayload>,
) -> Result<Json<Category>, AppError> {
    let category = app_state
        .category_service
        .update(CategoryKind::Item, tenant.0, id, &payload)
        .await?;
    Ok(Json(category))
}

#[utoipa::path(
    delete,
    path = "/api/item-categories/{id}",
    tag = "Categories",
    responses(
        (status = 204, description = "Categoria removida; insumos ficam sem categoria"),
        (status = 404, description = "Categoria não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Categoria"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_item_category(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state
        .category_service
        .delete(CategoryKind::Item, tenant.0, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Produtos ---

#[utoipa::path(
    get,
    path = "/api/product-categories",
    tag = "Categories",
    responses((status = 200, description = "Categorias de produtos, por nome", body = Vec<Category>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    security(("api_jwt" = []))
)]
pub async fn list_product_categories(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    list(&app_state, CategoryKind::Product, tenant).await
}

#[utoipa::path(
    post,
    path = "/api/product-categories",
    tag = "Categories",
    request_body = CategoryPayload,
    responses(
        (status = 201, description = "Categoria criada", body = Category),
        (status = 409, description = "Já existe categoria com esse nome")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    security(("api_jwt" = []))
)]
pub async fn create_product_category(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CategoryPayload>,
) -> Result<impl IntoResponse, AppError> {
    create(&app_state, CategoryKind::Product, tenant, &payload).await
}

#[utoipa::path(
    put,
    path = "/api/product-categories/{id}",
    tag = "Categories",
    request_body = CategoryPayload,
    responses(
        (status = 200, description = "Categoria atualizada", body = Category),
        (status = 404, description = "Categoria não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Categoria"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_product_category(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryPayload>,
) -> Result<Json<Category>, AppError> {
    let category = app_state
        .category_service
        .update(CategoryKind::Product, tenant.0, id, &payload)
        .await?;
    Ok(Json(category))
}

#[utoipa::path(
    delete,
    path = "/api/product-categories/{id}",
    tag = "Categories",
    responses(
        (status = 204, description = "Categoria removida; produtos ficam sem categoria"),
        (status = 404, description = "Categoria não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Categoria"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_product_category(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state
        .category_service
        .delete(CategoryKind::Product, tenant.0, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
