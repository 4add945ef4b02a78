// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::{tenant_id_from_headers, TenantContext},
    models::auth::{Claims, User},
};

// Usuário da requisição, inserido nos "extensions" pelos guards
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

// Claims do token atual (usado no logout)
#[derive(Debug, Clone)]
pub struct SessionClaims(pub Claims);

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|Authorization(bearer)| bearer.token().to_string())
}

async fn authenticate(app_state: &AppState, headers: &HeaderMap) -> Result<(User, Claims), AppError> {
    let token = bearer_token(headers).ok_or(AppError::InvalidToken)?;
    app_state.auth_service.validate_token(&token).await
}

/// Exige `Authorization: Bearer <jwt>` válido e não revogado.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (user, claims) = authenticate(&app_state, request.headers()).await?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    request.extensions_mut().insert(SessionClaims(claims));
    Ok(next.run(request).await)
}

/// Igual ao `auth_guard` e, além disso, exige `x-tenant-id` de uma empresa
/// da qual o usuário é membro.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (user, claims) = authenticate(&app_state, request.headers()).await?;
    let organization_id = tenant_id_from_headers(request.headers())?;

    if !app_state.tenancy_service.is_member(user.id, organization_id).await? {
        tracing::warn!(user_id = %user.id, %organization_id, "Acesso negado: usuário não é membro da empresa");
        return Err(AppError::NotAMember);
    }

    request.extensions_mut().insert(AuthenticatedUser(user));
    request.extensions_mut().insert(SessionClaims(claims));
    request.extensions_mut().insert(TenantContext(organization_id));
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}

impl<S> FromRequestParts<S> for SessionClaims
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionClaims>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, HeaderValue};

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn ignores_other_schemes() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&headers), None);
    }
}
