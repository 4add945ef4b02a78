// src/db/tenancy_repo.rs

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::tenancy::{Membership, MembershipRole, Organization},
    services::tenant_session::MembershipSource,
};

#[derive(Clone)]
pub struct TenancyRepository {
    pool: PgPool,
}

impl TenancyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verifica se existe vínculo entre o usuário e a empresa.
    /// É a única checagem de autorização das rotas de tenant.
    pub async fn is_member(&self, user_id: Uuid, organization_id: Uuid) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_organization_memberships
                WHERE user_id = $1 AND organization_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Empresas do usuário, em ordem alfabética.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Organization>, AppError> {
        let organizations = sqlx::query_as::<_, Organization>(
            r#"
            SELECT o.id, o.name, o.tax_id, o.active, o.created_at, o.updated_at
            FROM organizations o
            INNER JOIN user_organization_memberships m ON m.organization_id = o.id
            WHERE m.user_id = $1
            ORDER BY o.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(organizations)
    }

    pub async fn create_organization<'e, E>(
        &self,
        executor: E,
        name: &str,
        tax_id: Option<&str>,
    ) -> Result<Organization, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let organization = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (name, tax_id)
            VALUES ($1, $2)
            RETURNING id, name, tax_id, active, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(tax_id)
        .fetch_one(executor)
        .await?;
        Ok(organization)
    }

    pub async fn add_member<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        organization_id: Uuid,
        role: MembershipRole,
    ) -> Result<Membership, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO user_organization_memberships (user_id, organization_id, role)
            VALUES ($1, $2, $3)
            RETURNING user_id, organization_id, role, created_at
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .bind(role)
        .fetch_one(executor)
        .await?;
        Ok(membership)
    }
}

#[async_trait]
impl MembershipSource for TenancyRepository {
    async fn organizations_for_user(&self, user_id: Uuid) -> Result<Vec<Organization>, AppError> {
        self.list_for_user(user_id).await
    }
}
