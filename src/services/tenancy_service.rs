// src/services/tenancy_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ClientStateRepository, TenancyRepository},
    models::tenancy::{MembershipRole, Organization},
    services::tenant_session::{SessionSnapshot, TenantSession},
};

pub type PgTenantSession = TenantSession<ClientStateRepository, TenancyRepository>;

#[derive(Clone)]
pub struct TenancyService {
    tenancy_repo: TenancyRepository,
    session: PgTenantSession,
    pool: PgPool,
}

impl TenancyService {
    pub fn new(tenancy_repo: TenancyRepository, client_state: ClientStateRepository, pool: PgPool) -> Self {
        let session = TenantSession::new(client_state, tenancy_repo.clone());
        Self { tenancy_repo, session, pool }
    }

    pub async fn is_member(&self, user_id: Uuid, organization_id: Uuid) -> Result<bool, AppError> {
        self.tenancy_repo.is_member(user_id, organization_id).await
    }

    pub async fn list_my_organizations(&self, user_id: Uuid) -> Result<Vec<Organization>, AppError> {
        self.tenancy_repo.list_for_user(user_id).await
    }

    /// Cria a empresa e, na mesma transação, o vínculo ADMIN de quem criou.
    /// Depois disso ela vira a empresa atual do usuário.
    pub async fn create_organization(
        &self,
        owner_id: Uuid,
        name: &str,
        tax_id: Option<&str>,
    ) -> Result<Organization, AppError> {
        let mut tx = self.pool.begin().await?;

        let organization = self
            .tenancy_repo
            .create_organization(&mut *tx, name, tax_id)
            .await?;

        self.tenancy_repo
            .add_member(&mut *tx, owner_id, organization.id, MembershipRole::Admin)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = %owner_id, organization_id = %organization.id, "Empresa criada");

        self.session.remember_created(owner_id, &organization).await?;
        Ok(organization)
    }

    pub async fn select_organization(&self, user_id: Uuid, organization_id: Uuid) -> Result<Organization, AppError> {
        self.session.select(user_id, organization_id).await
    }

    /// Decisão de navegação para `route`. `None` = sessão sem usuário.
    pub async fn session(&self, user_id: Option<Uuid>, route: &str) -> Result<SessionSnapshot, AppError> {
        self.session.evaluate(user_id, route).await
    }
}
