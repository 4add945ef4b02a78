// src/handlers/tenancy.rs

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::{bearer_token, AuthenticatedUser},
    models::tenancy::{CreateOrganizationPayload, Organization, SelectOrganizationPayload},
    services::tenant_session::SessionSnapshot,
};

#[utoipa::path(
    get,
    path = "/api/organizations",
    tag = "Tenancy",
    responses(
        (status = 200, description = "Empresas das quais o usuário é membro", body = Vec<Organization>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_my_organizations(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<Organization>>, AppError> {
    let organizations = app_state.tenancy_service.list_my_organizations(user.id).await?;
    Ok(Json(organizations))
}

#[utoipa::path(
    post,
    path = "/api/organizations",
    tag = "Tenancy",
    request_body = CreateOrganizationPayload,
    responses(
        (status = 201, description = "Empresa criada; o usuário vira ADMIN e ela passa a ser a atual", body = Organization)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_organization(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateOrganizationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let tax_id = payload.tax_id.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let organization = app_state
        .tenancy_service
        .create_organization(user.id, payload.name.trim(), tax_id)
        .await?;

    Ok((StatusCode::CREATED, Json(organization)))
}

#[utoipa::path(
    post,
    path = "/api/organizations/select",
    tag = "Tenancy",
    request_body = SelectOrganizationPayload,
    responses(
        (status = 200, description = "Empresa selecionada como atual", body = Organization),
        (status = 403, description = "Usuário não é membro da empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn select_organization(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<SelectOrganizationPayload>,
) -> Result<Json<Organization>, AppError> {
    let organization = app_state
        .tenancy_service
        .select_organization(user.id, payload.organization_id)
        .await?;
    Ok(Json(organization))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SessionQuery {
    /// Rota que o cliente quer abrir (ex.: `/produtos`)
    pub route: Option<String>,
}

// Rota pública: sem token (ou com token inválido/revogado) a sessão é
// tratada como deslogada e a decisão manda para o login.
#[utoipa::path(
    get,
    path = "/api/session",
    tag = "Tenancy",
    params(SessionQuery),
    responses(
        (status = 200, description = "Decisão de navegação e empresa ativa", body = SessionSnapshot)
    )
)]
pub async fn get_session(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let user_id = match bearer_token(&headers) {
        Some(token) => match app_state.auth_service.validate_token(&token).await {
            Ok((user, _)) => Some(user.id),
            Err(AppError::InvalidToken) => None,
            Err(e) => return Err(e),
        },
        None => None,
    };

    let route = query.route.as_deref().unwrap_or("/");
    let snapshot = app_state.tenancy_service.session(user_id, route).await?;
    Ok(Json(snapshot))
}
