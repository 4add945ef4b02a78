// src/handlers/items.rs

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
    models::items::{ItemPayload, ItemPriceHistoryEntry, ItemWithCategory, Unit, UnitInfo},
};

#[utoipa::path(
    get,
    path = "/api/units",
    tag = "Items",
    responses((status = 200, description = "Unidades de medida disponíveis", body = Vec<UnitInfo>))
)]
pub async fn list_units() -> Json<Vec<UnitInfo>> {
    Json(Unit::ALL.into_iter().map(UnitInfo::from).collect())
}

#[utoipa::path(
    get,
    path = "/api/items",
    tag = "Items",
    responses((status = 200, description = "Insumos ativos, por nome", body = Vec<ItemWithCategory>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    security(("api_jwt" = []))
)]
pub async fn list_items(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<Json<Vec<ItemWithCategory>>, AppError> {
    let items = app_state.item_service.list(tenant.0).await?;
    Ok(Json(items))
}

#[utoipa::path(
    post,
    path = "/api/items",
    tag = "Items",
    request_body = ItemPayload,
    responses(
        (status = 201, description = "Insumo criado", body = ItemWithCategory),
        (status = 400, description = "Preço ou desconto inválido")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    security(("api_jwt" = []))
)]
pub async fn create_item(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<ItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    let item = app_state.item_service.create(tenant.0, &payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    get,
    path = "/api/items/{id}",
    tag = "Items",
    responses(
        (status = 200, description = "Insumo", body = ItemWithCategory),
        (status = 404, description = "Insumo não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Insumo"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_item(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ItemWithCategory>, AppError> {
    let item = app_state.item_service.get(tenant.0, id).await?;
    Ok(Json(item))
}

#[utoipa::path(
    put,
    path = "/api/items/{id}",
    tag = "Items",
    request_body = ItemPayload,
    responses(
        (status = 200, description = "Insumo atualizado (mudança de preço gera histórico)", body = ItemWithCategory),
        (status = 404, description = "Insumo não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Insumo"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_item(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ItemPayload>,
) -> Result<Json<ItemWithCategory>, AppError> {
    let item = app_state.item_service.update(tenant.0, id, &payload).await?;
    Ok(Json(item))
}

#[utoipa::path(
    delete,
    path = "/api/items/{id}",
    tag = "Items",
    responses(
        (status = 204, description = "Insumo desativado"),
        (status = 404, description = "Insumo não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Insumo"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_item(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.item_service.deactivate(tenant.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/items/{id}/price-history",
    tag = "Items",
    responses((status = 200, description = "Histórico de preços, mais recente primeiro", body = Vec<ItemPriceHistoryEntry>)),
    params(
        ("id" = Uuid, Path, description = "ID do Insumo"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_item_price_history(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ItemPriceHistoryEntry>>, AppError> {
    let history = app_state.item_service.price_history(tenant.0, id).await?;
    Ok(Json(history))
}
