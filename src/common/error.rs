use std::borrow::Cow;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Token de recuperação inválido ou expirado")]
    InvalidResetToken,

    // --- Tenancy ---
    #[error("Cabeçalho x-tenant-id ausente ou inválido")]
    MissingTenant,

    #[error("Usuário não é membro da empresa")]
    NotAMember,

    // --- Catálogo ---
    #[error("Categoria não encontrada")]
    CategoryNotFound,

    #[error("Categoria '{0}' já existe")]
    CategoryNameAlreadyExists(String),

    #[error("Insumo não encontrado")]
    ItemNotFound,

    #[error("Insumo inativo não pode ser usado em produtos")]
    InactiveItem,

    #[error("Produto não encontrado")]
    ProductNotFound,

    #[error("Insumo do produto não encontrado")]
    LineNotFound,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Atalho para um erro de validação de um único campo.
    pub fn invalid_field(field: &'static str, code: &'static str, message: &'static str) -> Self {
        let mut error = ValidationError::new(code);
        error.message = Some(Cow::Borrowed(message));

        let mut errors = ValidationErrors::new();
        errors.add(field, error);
        AppError::ValidationError(errors)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::EmailAlreadyExists => (StatusCode::CONFLICT, "Este e-mail já está em uso.".to_string()),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "E-mail ou senha inválidos.".to_string()),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Token de autenticação inválido ou ausente.".to_string(),
            ),
            AppError::InvalidResetToken => (
                StatusCode::BAD_REQUEST,
                "Link de recuperação inválido ou expirado.".to_string(),
            ),
            AppError::MissingTenant => (
                StatusCode::BAD_REQUEST,
                "O cabeçalho x-tenant-id é obrigatório e deve ser um UUID.".to_string(),
            ),
            AppError::NotAMember => (StatusCode::FORBIDDEN, "Você não tem acesso a esta empresa.".to_string()),
            AppError::CategoryNotFound => (StatusCode::NOT_FOUND, "Categoria não encontrada.".to_string()),
            AppError::CategoryNameAlreadyExists(name) => (
                StatusCode::CONFLICT,
                format!("Já existe uma categoria chamada '{}'.", name),
            ),
            AppError::ItemNotFound => (StatusCode::NOT_FOUND, "Insumo não encontrado.".to_string()),
            AppError::InactiveItem => (
                StatusCode::BAD_REQUEST,
                "Este insumo está inativo e não pode ser adicionado.".to_string(),
            ),
            AppError::ProductNotFound => (StatusCode::NOT_FOUND, "Produto não encontrado.".to_string()),
            AppError::LineNotFound => (
                StatusCode::NOT_FOUND,
                "Insumo do produto não encontrado.".to_string(),
            ),

            // Todos os outros erros (DatabaseError, InternalServerError, ...) viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` montou.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_errors_carry_field_details() {
        let response = AppError::invalid_field(
            "discountedPrice",
            "discount_not_below_price",
            "O preço com desconto deve ser menor que o preço original",
        )
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(
            body["details"]["discountedPrice"][0],
            "O preço com desconto deve ser menor que o preço original"
        );
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let response = AppError::InternalServerError(anyhow::anyhow!("pool fechado")).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Ocorreu um erro inesperado.");
    }

    #[test]
    fn tenancy_errors_map_to_client_statuses() {
        assert_eq!(AppError::NotAMember.into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::MissingTenant.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::ProductNotFound.into_response().status(), StatusCode::NOT_FOUND);
    }
}
