// src/handlers/products.rs

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
    middleware::tenancy::TenantContext,
    models::products::{
        AddItemLinePayload, ItemLineChange, ItemLineDetail, ProductDetail, ProductPayload, ProductPriceHistoryEntry,
        ProductView, UpdateItemLinePayload,
    },
};

#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Products",
    responses((status = 200, description = "Produtos ativos, com margem e alerta de margem baixa", body = Vec<ProductView>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<Json<Vec<ProductView>>, AppError> {
    let products = app_state.product_service.list(tenant.0).await?;
    Ok(Json(products))
}

#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Products",
    request_body = ProductPayload,
    responses(
        (status = 201, description = "Produto criado (custo e margem zerados)", body = ProductDetail),
        (status = 400, description = "Preço de venda ou promocional inválido")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<ProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    let product = app_state.product_service.create(tenant.0, &payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Products",
    responses(
        (status = 200, description = "Produto com seus insumos", body = ProductDetail),
        (status = 404, description = "Produto não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Produto"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductDetail>, AppError> {
    let product = app_state.product_service.get(tenant.0, id).await?;
    Ok(Json(product))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    tag = "Products",
    request_body = ProductPayload,
    responses(
        (status = 200, description = "Produto atualizado; novo preço de venda gera histórico e nova margem", body = ProductDetail),
        (status = 404, description = "Produto não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Produto"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<ProductDetail>, AppError> {
    let product = app_state.product_service.update(tenant.0, id, &payload).await?;
    Ok(Json(product))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    tag = "Products",
    responses(
        (status = 204, description = "Produto desativado"),
        (status = 404, description = "Produto não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Produto"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_product(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.product_service.deactivate(tenant.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/products/{id}/price-history",
    tag = "Products",
    responses((status = 200, description = "Histórico do preço de venda, mais recente primeiro", body = Vec<ProductPriceHistoryEntry>)),
    params(
        ("id" = Uuid, Path, description = "ID do Produto"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_product_price_history(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ProductPriceHistoryEntry>>, AppError> {
    let history = app_state.product_service.price_history(tenant.0, id).await?;
    Ok(Json(history))
}

// ---
// Insumos do produto
// ---

#[utoipa::path(
    get,
    path = "/api/products/{id}/lines",
    tag = "Products",
    responses((status = 200, description = "Insumos do produto", body = Vec<ItemLineDetail>)),
    params(
        ("id" = Uuid, Path, description = "ID do Produto"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_product_lines(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ItemLineDetail>>, AppError> {
    let lines = app_state.product_service.list_lines(tenant.0, id).await?;
    Ok(Json(lines))
}

#[utoipa::path(
    post,
    path = "/api/products/{id}/lines",
    tag = "Products",
    request_body = AddItemLinePayload,
    responses(
        (status = 201, description = "Insumo adicionado; custo e margem recalculados", body = ItemLineChange),
        (status = 400, description = "Quantidade inválida, unidade incompatível ou insumo inativo"),
        (status = 404, description = "Produto ou insumo não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Produto"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_product_line(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddItemLinePayload>,
) -> Result<impl IntoResponse, AppError> {
    let change = app_state.product_service.add_line(tenant.0, id, &payload).await?;
    Ok((StatusCode::CREATED, Json(change)))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}/lines/{line_id}",
    tag = "Products",
    request_body = UpdateItemLinePayload,
    responses(
        (status = 200, description = "Quantidade alterada; custo e margem recalculados", body = ItemLineChange),
        (status = 404, description = "Produto ou linha não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Produto"),
        ("line_id" = Uuid, Path, description = "ID da Linha"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_product_line(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateItemLinePayload>,
) -> Result<Json<ItemLineChange>, AppError> {
    let change = app_state
        .product_service
        .update_line(tenant.0, id, line_id, &payload)
        .await?;
    Ok(Json(change))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}/lines/{line_id}",
    tag = "Products",
    responses(
        (status = 200, description = "Insumo removido; produto recalculado", body = ProductView),
        (status = 404, description = "Produto ou linha não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Produto"),
        ("line_id" = Uuid, Path, description = "ID da Linha"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_product_line(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ProductView>, AppError> {
    let product = app_state
        .product_service
        .remove_line(tenant.0, id, line_id)
        .await?;
    Ok(Json(product))
}
