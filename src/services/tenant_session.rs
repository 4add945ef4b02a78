// src/services/tenant_session.rs
//
// Estado de sessão por usuário: o "cache do cliente" (lista de empresas e
// empresa atual) e a reconciliação dele com os vínculos vivos do banco.
//
// O cache é só uma dica (`cached_hint`) para a primeira renderização; a
// empresa ativa de verdade (`resolved`) só existe depois que os vínculos são
// carregados e a auto-resolução roda.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::tenancy::Organization,
    services::resolver::{
        auto_resolve, resolve, AuthStatus, AutoResolution, Decision, MembershipStatus, ResolverInput,
    },
};

/// Chave do cache com a lista de empresas do usuário.
pub const ORGANIZATIONS_KEY: &str = "empresas";
/// Chave do cache com o id da empresa atual.
pub const ACTIVE_ORGANIZATION_KEY: &str = "empresaAtualId";

/// Armazenamento chave/valor durável, por usuário.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClientStateStore: Send + Sync {
    async fn read(&self, user_id: Uuid, key: &str) -> Result<Option<Value>, AppError>;
    async fn write(&self, user_id: Uuid, key: &str, value: Value) -> Result<(), AppError>;
    async fn remove(&self, user_id: Uuid, key: &str) -> Result<(), AppError>;
}

/// De onde vêm os vínculos usuário-empresa "ao vivo".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipSource: Send + Sync {
    async fn organizations_for_user(&self, user_id: Uuid) -> Result<Vec<Organization>, AppError>;
}

/// Fase 1: o que estava no cache, sem validação nenhuma.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CachedHint {
    pub active_organization_id: Option<Uuid>,
    pub organizations: Vec<Organization>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub decision: Decision,
    pub auth_status: AuthStatus,
    pub membership_status: MembershipStatus,
    pub cached_hint: CachedHint,
    pub organizations: Vec<Organization>,
    pub active_organization: Option<Organization>,
}

#[derive(Clone)]
pub struct TenantSession<S, M> {
    store: S,
    memberships: M,
}

impl<S, M> TenantSession<S, M>
where
    S: ClientStateStore,
    M: MembershipSource,
{
    pub fn new(store: S, memberships: M) -> Self {
        Self { store, memberships }
    }

    /// Lê o cache. Valores corrompidos são tratados como ausentes.
    pub async fn hydrate(&self, user_id: Uuid) -> Result<CachedHint, AppError> {
        let active_organization_id = self
            .store
            .read(user_id, ACTIVE_ORGANIZATION_KEY)
            .await?
            .and_then(|value| serde_json::from_value::<Uuid>(value).ok());

        let organizations = self
            .store
            .read(user_id, ORGANIZATIONS_KEY)
            .await?
            .and_then(|value| serde_json::from_value::<Vec<Organization>>(value).ok())
            .unwrap_or_default();

        Ok(CachedHint {
            active_organization_id,
            organizations,
        })
    }

    /// Fase 2: aplica a auto-resolução sobre os vínculos vivos e persiste o resultado.
    pub async fn reconcile(
        &self,
        user_id: Uuid,
        hint: &CachedHint,
        live: &[Organization],
    ) -> Result<Option<Organization>, AppError> {
        self.store
            .write(user_id, ORGANIZATIONS_KEY, serde_json::to_value(live).map_err(anyhow::Error::from)?)
            .await?;

        let resolution = auto_resolve(hint.active_organization_id, live);
        match &resolution {
            AutoResolution::AutoSelect(org) => {
                tracing::info!(%user_id, organization_id = %org.id, "Empresa única selecionada automaticamente");
                self.persist_active(user_id, org.id).await?;
            }
            AutoResolution::Clear => {
                tracing::info!(%user_id, "Empresa do cache não pertence mais ao usuário; seleção descartada");
                self.store.remove(user_id, ACTIVE_ORGANIZATION_KEY).await?;
            }
            AutoResolution::Keep(_) | AutoResolution::Unset => {}
        }

        Ok(resolution.active().cloned())
    }

    /// Roda o ciclo completo (cache → vínculos → auto-resolução → decisão).
    ///
    /// `user_id = None` significa sessão deslogada: nada é lido nem gravado.
    pub async fn evaluate(&self, user_id: Option<Uuid>, route: &str) -> Result<SessionSnapshot, AppError> {
        let Some(user_id) = user_id else {
            let decision = resolve(&ResolverInput {
                auth_status: AuthStatus::SignedOut,
                membership_status: MembershipStatus::Idle,
                organizations: &[],
                active_organization: None,
                current_route: route,
            });
            return Ok(SessionSnapshot {
                decision,
                auth_status: AuthStatus::SignedOut,
                membership_status: MembershipStatus::Idle,
                cached_hint: CachedHint::default(),
                organizations: Vec::new(),
                active_organization: None,
            });
        };

        let cached_hint = self.hydrate(user_id).await?;

        let (membership_status, organizations, active_organization) =
            match self.memberships.organizations_for_user(user_id).await {
                Ok(live) => {
                    let active = self.reconcile(user_id, &cached_hint, &live).await?;
                    (MembershipStatus::Loaded, live, active)
                }
                Err(e) => {
                    // Sem vínculos confiáveis: não decide empresa nenhuma.
                    tracing::warn!(%user_id, "Falha ao carregar empresas do usuário: {}", e);
                    (MembershipStatus::Error, Vec::new(), None)
                }
            };

        let decision = resolve(&ResolverInput {
            auth_status: AuthStatus::SignedIn,
            membership_status,
            organizations: &organizations,
            active_organization: active_organization.as_ref(),
            current_route: route,
        });

        Ok(SessionSnapshot {
            decision,
            auth_status: AuthStatus::SignedIn,
            membership_status,
            cached_hint,
            organizations,
            active_organization,
        })
    }

    /// Seleção explícita feita pelo usuário na tela de empresas.
    pub async fn select(&self, user_id: Uuid, organization_id: Uuid) -> Result<Organization, AppError> {
        let live = self.memberships.organizations_for_user(user_id).await?;
        let org = live
            .iter()
            .find(|o| o.id == organization_id)
            .cloned()
            .ok_or(AppError::NotAMember)?;

        self.store
            .write(user_id, ORGANIZATIONS_KEY, serde_json::to_value(&live).map_err(anyhow::Error::from)?)
            .await?;
        self.persist_active(user_id, org.id).await?;
        Ok(org)
    }

    /// Empresa recém-criada: entra no cache e vira a atual.
    pub async fn remember_created(&self, user_id: Uuid, org: &Organization) -> Result<(), AppError> {
        let mut cached = self.hydrate(user_id).await?.organizations;
        cached.retain(|o| o.id != org.id);
        cached.push(org.clone());

        self.store
            .write(user_id, ORGANIZATIONS_KEY, serde_json::to_value(&cached).map_err(anyhow::Error::from)?)
            .await?;
        self.persist_active(user_id, org.id).await
    }

    async fn persist_active(&self, user_id: Uuid, organization_id: Uuid) -> Result<(), AppError> {
        self.store
            .write(user_id, ACTIVE_ORGANIZATION_KEY, Value::from(organization_id.to_string()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::resolver::{Action, TenantPhase, SELECT_ORGANIZATION_ROUTE};
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MemoryStore {
        entries: Arc<Mutex<HashMap<(Uuid, String), Value>>>,
    }

    impl MemoryStore {
        fn get(&self, user_id: Uuid, key: &str) -> Option<Value> {
            self.entries.lock().unwrap().get(&(user_id, key.to_string())).cloned()
        }
    }

    #[async_trait]
    impl ClientStateStore for MemoryStore {
        async fn read(&self, user_id: Uuid, key: &str) -> Result<Option<Value>, AppError> {
            Ok(self.get(user_id, key))
        }

        async fn write(&self, user_id: Uuid, key: &str, value: Value) -> Result<(), AppError> {
            self.entries.lock().unwrap().insert((user_id, key.to_string()), value);
            Ok(())
        }

        async fn remove(&self, user_id: Uuid, key: &str) -> Result<(), AppError> {
            self.entries.lock().unwrap().remove(&(user_id, key.to_string()));
            Ok(())
        }
    }

    struct FixedMemberships(Vec<Organization>);

    #[async_trait]
    impl MembershipSource for FixedMemberships {
        async fn organizations_for_user(&self, _user_id: Uuid) -> Result<Vec<Organization>, AppError> {
            Ok(self.0.clone())
        }
    }

    fn org(name: &str) -> Organization {
        Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            tax_id: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn cached_active(store: &MemoryStore, user_id: Uuid) -> Option<Uuid> {
        store
            .get(user_id, ACTIVE_ORGANIZATION_KEY)
            .and_then(|v| serde_json::from_value(v).ok())
    }

    #[tokio::test]
    async fn single_membership_is_auto_selected_and_route_renders() {
        let user_id = Uuid::new_v4();
        let only = org("Padaria");
        let store = MemoryStore::default();
        let session = TenantSession::new(store.clone(), FixedMemberships(vec![only.clone()]));

        let snapshot = session.evaluate(Some(user_id), "/produtos").await.unwrap();

        assert_eq!(snapshot.decision.action, Action::Render);
        assert_eq!(snapshot.decision.phase, TenantPhase::Ready);
        assert_eq!(snapshot.active_organization.as_ref(), Some(&only));
        assert_eq!(cached_active(&store, user_id), Some(only.id));
    }

    #[tokio::test]
    async fn stale_cached_selection_is_discarded_for_many_memberships() {
        let user_id = Uuid::new_v4();
        let store = MemoryStore::default();
        let stale = Uuid::new_v4();
        store
            .write(user_id, ACTIVE_ORGANIZATION_KEY, Value::from(stale.to_string()))
            .await
            .unwrap();
        let session = TenantSession::new(store.clone(), FixedMemberships(vec![org("A"), org("B")]));

        let snapshot = session.evaluate(Some(user_id), "/insumos").await.unwrap();

        // A dica do cache aparece, mas não decide a rota.
        assert_eq!(snapshot.cached_hint.active_organization_id, Some(stale));
        assert!(snapshot.active_organization.is_none());
        assert_eq!(
            snapshot.decision.action,
            Action::Redirect { route: SELECT_ORGANIZATION_ROUTE.to_string() }
        );
        assert_eq!(cached_active(&store, user_id), None);
    }

    #[tokio::test]
    async fn valid_cached_selection_survives_reload() {
        let user_id = Uuid::new_v4();
        let orgs = vec![org("A"), org("B")];
        let store = MemoryStore::default();
        let session = TenantSession::new(store.clone(), FixedMemberships(orgs.clone()));

        session.select(user_id, orgs[1].id).await.unwrap();
        let snapshot = session.evaluate(Some(user_id), "/dashboard").await.unwrap();

        assert_eq!(snapshot.active_organization.as_ref(), Some(&orgs[1]));
        assert_eq!(snapshot.cached_hint.organizations.len(), 2);
    }

    #[tokio::test]
    async fn selecting_a_foreign_organization_is_refused() {
        let session = TenantSession::new(MemoryStore::default(), FixedMemberships(vec![org("A")]));
        let err = session.select(Uuid::new_v4(), Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotAMember));
    }

    #[tokio::test]
    async fn membership_failure_keeps_cache_untouched() {
        let user_id = Uuid::new_v4();
        let cached = Uuid::new_v4();
        let store = MemoryStore::default();
        store
            .write(user_id, ACTIVE_ORGANIZATION_KEY, Value::from(cached.to_string()))
            .await
            .unwrap();

        let mut memberships = MockMembershipSource::new();
        memberships
            .expect_organizations_for_user()
            .returning(|_| Err(AppError::InternalServerError(anyhow::anyhow!("timeout"))));
        let session = TenantSession::new(store.clone(), memberships);

        let snapshot = session.evaluate(Some(user_id), "/produtos").await.unwrap();

        assert_eq!(snapshot.membership_status, MembershipStatus::Error);
        assert!(snapshot.decision.retry);
        assert_eq!(snapshot.decision.action, Action::Render);
        assert_eq!(cached_active(&store, user_id), Some(cached));
    }

    #[tokio::test]
    async fn signed_out_session_touches_nothing() {
        let store = MockClientStateStore::new();
        let memberships = MockMembershipSource::new();
        let session = TenantSession::new(store, memberships);

        let snapshot = session.evaluate(None, "/produtos").await.unwrap();

        assert_eq!(snapshot.auth_status, AuthStatus::SignedOut);
        assert_eq!(snapshot.decision.phase, TenantPhase::Unauthenticated);
    }

    #[tokio::test]
    async fn corrupted_cache_is_ignored() {
        let user_id = Uuid::new_v4();
        let store = MemoryStore::default();
        store
            .write(user_id, ACTIVE_ORGANIZATION_KEY, Value::from(42))
            .await
            .unwrap();
        store
            .write(user_id, ORGANIZATIONS_KEY, Value::from("lixo"))
            .await
            .unwrap();
        let session = TenantSession::new(store, FixedMemberships(vec![]));

        let hint = session.hydrate(user_id).await.unwrap();
        assert_eq!(hint, CachedHint::default());
    }

    #[tokio::test]
    async fn created_organization_becomes_current() {
        let user_id = Uuid::new_v4();
        let store = MemoryStore::default();
        let session = TenantSession::new(store.clone(), FixedMemberships(vec![]));
        let created = org("Nova");

        session.remember_created(user_id, &created).await.unwrap();

        assert_eq!(cached_active(&store, user_id), Some(created.id));
        let hint = session.hydrate(user_id).await.unwrap();
        assert_eq!(hint.organizations, vec![created]);
    }
}
