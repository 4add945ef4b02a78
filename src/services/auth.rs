// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, User},
};

// Token válido de um usuário que não existe mais vale como token inválido (401).
fn token_owner(user: Option<User>) -> Result<User, AppError> {
    user.ok_or(AppError::InvalidToken)
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    token_ttl: Duration,
    reset_ttl: Duration,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        jwt_secret: String,
        token_ttl: Duration,
        reset_ttl: Duration,
        pool: PgPool,
    ) -> Self {
        Self { user_repo, jwt_secret, token_ttl, reset_ttl, pool }
    }

    async fn hash_password(password: &str) -> Result<String, AppError> {
        // bcrypt é caro: roda fora do executor assíncrono
        let password = password.to_owned();
        let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
        Ok(hashed)
    }

    pub async fn register_user(&self, email: &str, name: &str, password: &str) -> Result<String, AppError> {
        let hashed_password = Self::hash_password(password).await?;

        let new_user = self
            .user_repo
            .create_user(&self.pool, email, name, &hashed_password)
            .await?;

        tracing::info!(user_id = %new_user.id, "Novo usuário registrado");
        self.create_token(new_user.id)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(user.id)
    }

    /// Sai da sessão: o `jti` do token vai para a lista de revogados até expirar.
    pub async fn logout(&self, claims: &Claims) -> Result<(), AppError> {
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp as i64, 0).unwrap_or_else(Utc::now);
        self.user_repo.revoke_token(claims.jti, expires_at).await?;
        tracing::info!(user_id = %claims.sub, "Sessão encerrada");
        Ok(())
    }

    /// Valida assinatura, expiração e revogação; devolve o usuário e os claims.
    pub async fn validate_token(&self, token: &str) -> Result<(User, Claims), AppError> {
        let claims = self.decode_claims(token)?;

        if self.user_repo.is_token_revoked(claims.jti).await? {
            return Err(AppError::InvalidToken);
        }

        let user = token_owner(self.user_repo.find_by_id(claims.sub).await?)?;
        Ok((user, claims))
    }

    /// Gera um token de recuperação de senha. E-mail desconhecido não é erro
    /// (não revela quem tem conta).
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AppError> {
        let Some(user) = self.user_repo.find_by_email(email).await? else {
            tracing::debug!("Recuperação de senha pedida para e-mail sem conta");
            return Ok(());
        };

        let token = self
            .user_repo
            .create_password_reset(user.id, Utc::now() + self.reset_ttl)
            .await?;

        // Sem canal de envio: o token só aparece no log de debug.
        tracing::debug!(user_id = %user.id, %token, "Token de recuperação de senha gerado");
        Ok(())
    }

    pub async fn confirm_password_reset(&self, token: Uuid, new_password: &str) -> Result<(), AppError> {
        let hashed_password = Self::hash_password(new_password).await?;

        let mut tx = self.pool.begin().await?;

        let user_id = self
            .user_repo
            .consume_password_reset(&mut *tx, token)
            .await?
            .ok_or(AppError::InvalidResetToken)?;

        self.user_repo
            .update_password(&mut *tx, user_id, &hashed_password)
            .await?;

        tx.commit().await?;

        tracing::info!(%user_id, "Senha redefinida");
        Ok(())
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(token_data.claims)
    }

    fn create_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + self.token_ttl;

        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
            jti: Uuid::new_v4(),
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn service(secret: &str) -> AuthService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/precificacao_test")
            .unwrap();
        AuthService::new(
            UserRepository::new(pool.clone()),
            secret.to_string(),
            Duration::days(7),
            Duration::minutes(60),
            pool,
        )
    }

    #[tokio::test]
    async fn issued_tokens_carry_subject_and_unique_id() {
        let auth = service("segredo");
        let user_id = Uuid::new_v4();

        let first = auth.decode_claims(&auth.create_token(user_id).unwrap()).unwrap();
        let second = auth.decode_claims(&auth.create_token(user_id).unwrap()).unwrap();

        assert_eq!(first.sub, user_id);
        assert_ne!(first.jti, second.jti);
        assert!(first.exp > first.iat);
    }

    #[tokio::test]
    async fn tokens_signed_with_another_secret_are_rejected() {
        let token = service("outro-segredo").create_token(Uuid::new_v4()).unwrap();

        let err = service("segredo").decode_claims(&token).unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[test]
    fn token_of_a_deleted_user_is_unauthorized() {
        let err = token_owner(None).unwrap_err();

        assert!(matches!(err, AppError::InvalidToken));
        let response = axum::response::IntoResponse::into_response(err);
        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
