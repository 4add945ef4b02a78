// src/services/resolver.rs
//
// Decisão de navegação de uma sessão: dado o estado de autenticação, as
// empresas do usuário e a rota pedida, diz se a rota pode ser exibida ou para
// onde redirecionar. Função pura; quem chama é que aplica o resultado.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::tenancy::Organization;

pub const SIGN_IN_ROUTE: &str = "/auth/login";
pub const CREATE_ORGANIZATION_ROUTE: &str = "/empresas/nova";
pub const SELECT_ORGANIZATION_ROUTE: &str = "/empresas/selecionar";

const PUBLIC_AUTH_PREFIX: &str = "/auth";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum AuthStatus {
    Loading,
    SignedOut,
    SignedIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum MembershipStatus {
    Idle,
    Loading,
    Loaded,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum TenantPhase {
    AuthPending,
    Unauthenticated,
    MembershipPending,
    MembershipFailed,
    NoOrganization,
    OrganizationAmbiguous,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    PublicAuth,
    OrganizationSetup,
    Protected,
}

/// Classifica a rota ignorando query string e barra final.
pub fn classify_route(route: &str) -> RouteClass {
    let path = route.split(['?', '#']).next().unwrap_or_default();
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    if path == CREATE_ORGANIZATION_ROUTE || path == SELECT_ORGANIZATION_ROUTE {
        return RouteClass::OrganizationSetup;
    }

    if path == PUBLIC_AUTH_PREFIX
        || path
            .strip_prefix(PUBLIC_AUTH_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
    {
        return RouteClass::PublicAuth;
    }

    RouteClass::Protected
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    Render,
    Redirect { route: String },
}

impl Action {
    fn redirect(route: &str) -> Self {
        Action::Redirect { route: route.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub phase: TenantPhase,
    pub action: Action,
    /// Enquanto verdadeiro a tela mostra só o "Carregando...".
    pub loading_only: bool,
    /// Falha ao buscar as empresas: a tela oferece "tentar novamente".
    pub retry: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ResolverInput<'a> {
    pub auth_status: AuthStatus,
    pub membership_status: MembershipStatus,
    pub organizations: &'a [Organization],
    pub active_organization: Option<&'a Organization>,
    pub current_route: &'a str,
}

/// Regras avaliadas em ordem; a primeira que casar decide.
pub fn resolve(input: &ResolverInput<'_>) -> Decision {
    let route_class = classify_route(input.current_route);
    let signed_in = input.auth_status == AuthStatus::SignedIn;

    // 1. Ainda carregando sessão ou empresas
    if input.auth_status == AuthStatus::Loading {
        return loading(TenantPhase::AuthPending);
    }
    if signed_in
        && matches!(
            input.membership_status,
            MembershipStatus::Idle | MembershipStatus::Loading
        )
    {
        return loading(TenantPhase::MembershipPending);
    }

    // 2. Deslogado fora das rotas públicas de autenticação
    if input.auth_status == AuthStatus::SignedOut {
        let action = if route_class == RouteClass::PublicAuth {
            Action::Render
        } else {
            Action::redirect(SIGN_IN_ROUTE)
        };
        return decided(TenantPhase::Unauthenticated, action);
    }

    // Falha ao buscar vínculos nunca escolhe empresa por conta própria.
    if input.membership_status == MembershipStatus::Error {
        return Decision {
            phase: TenantPhase::MembershipFailed,
            action: Action::Render,
            loading_only: false,
            retry: true,
        };
    }

    let setup_route = route_class == RouteClass::OrganizationSetup;

    // 3. Nenhuma empresa: vai para o cadastro
    if input.organizations.is_empty() {
        let action = if setup_route {
            Action::Render
        } else {
            Action::redirect(CREATE_ORGANIZATION_ROUTE)
        };
        return decided(TenantPhase::NoOrganization, action);
    }

    // 4. Empresas existem mas nenhuma está ativa: vai para a seleção
    if input.active_organization.is_none() {
        let action = if setup_route {
            Action::Render
        } else {
            Action::redirect(SELECT_ORGANIZATION_ROUTE)
        };
        return decided(TenantPhase::OrganizationAmbiguous, action);
    }

    // 5. Exibe a rota pedida
    decided(TenantPhase::Ready, Action::Render)
}

fn loading(phase: TenantPhase) -> Decision {
    Decision {
        phase,
        action: Action::Render,
        loading_only: true,
        retry: false,
    }
}

fn decided(phase: TenantPhase, action: Action) -> Decision {
    Decision {
        phase,
        action,
        loading_only: false,
        retry: false,
    }
}

// ---
// Auto-resolução da empresa ativa
// ---

#[derive(Debug, Clone, PartialEq)]
pub enum AutoResolution {
    /// A empresa do cache ainda é válida.
    Keep(Organization),
    /// Só existe uma empresa: selecionada (e persistida) automaticamente.
    AutoSelect(Organization),
    /// O id do cache não pertence mais ao usuário e não há escolha óbvia.
    Clear,
    /// Nada no cache e várias (ou nenhuma) empresas: o usuário escolhe.
    Unset,
}

impl AutoResolution {
    pub fn active(&self) -> Option<&Organization> {
        match self {
            AutoResolution::Keep(org) | AutoResolution::AutoSelect(org) => Some(org),
            AutoResolution::Clear | AutoResolution::Unset => None,
        }
    }
}

/// Reconcilia o id guardado no cache com os vínculos carregados agora.
pub fn auto_resolve(cached_id: Option<Uuid>, organizations: &[Organization]) -> AutoResolution {
    if let Some(id) = cached_id {
        if let Some(org) = organizations.iter().find(|o| o.id == id) {
            return AutoResolution::Keep(org.clone());
        }
    }

    if let [only] = organizations {
        return AutoResolution::AutoSelect(only.clone());
    }

    match cached_id {
        Some(_) => AutoResolution::Clear,
        None => AutoResolution::Unset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

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

    fn input<'a>(
        auth_status: AuthStatus,
        membership_status: MembershipStatus,
        organizations: &'a [Organization],
        active_organization: Option<&'a Organization>,
        current_route: &'a str,
    ) -> ResolverInput<'a> {
        ResolverInput {
            auth_status,
            membership_status,
            organizations,
            active_organization,
            current_route,
        }
    }

    fn redirect_to(route: &str) -> Action {
        Action::Redirect { route: route.to_string() }
    }

    #[test]
    fn classifies_routes() {
        assert_eq!(classify_route("/auth/login"), RouteClass::PublicAuth);
        assert_eq!(classify_route("/auth/recuperar-senha?email=x"), RouteClass::PublicAuth);
        assert_eq!(classify_route("/authors"), RouteClass::Protected);
        assert_eq!(classify_route("/empresas/nova/"), RouteClass::OrganizationSetup);
        assert_eq!(classify_route("/empresas/selecionar"), RouteClass::OrganizationSetup);
        assert_eq!(classify_route("/produtos"), RouteClass::Protected);
        assert_eq!(classify_route(""), RouteClass::Protected);
    }

    #[test]
    fn auth_loading_shows_placeholder_without_navigation() {
        let decision = resolve(&input(AuthStatus::Loading, MembershipStatus::Idle, &[], None, "/produtos"));
        assert!(decision.loading_only);
        assert_eq!(decision.action, Action::Render);
        assert_eq!(decision.phase, TenantPhase::AuthPending);
    }

    #[test]
    fn membership_loading_shows_placeholder() {
        for status in [MembershipStatus::Idle, MembershipStatus::Loading] {
            let decision = resolve(&input(AuthStatus::SignedIn, status, &[], None, "/produtos"));
            assert!(decision.loading_only);
            assert_eq!(decision.phase, TenantPhase::MembershipPending);
        }
    }

    #[test]
    fn signed_out_goes_to_login_except_on_auth_routes() {
        let protected = resolve(&input(AuthStatus::SignedOut, MembershipStatus::Idle, &[], None, "/insumos"));
        assert_eq!(protected.action, redirect_to(SIGN_IN_ROUTE));
        assert_eq!(protected.phase, TenantPhase::Unauthenticated);

        let setup = resolve(&input(AuthStatus::SignedOut, MembershipStatus::Idle, &[], None, "/empresas/nova"));
        assert_eq!(setup.action, redirect_to(SIGN_IN_ROUTE));

        let login = resolve(&input(AuthStatus::SignedOut, MembershipStatus::Idle, &[], None, "/auth/login"));
        assert_eq!(login.action, Action::Render);
        assert!(!login.loading_only);
    }

    #[test]
    fn no_organization_goes_to_creation() {
        let decision = resolve(&input(AuthStatus::SignedIn, MembershipStatus::Loaded, &[], None, "/dashboard"));
        assert_eq!(decision.action, redirect_to(CREATE_ORGANIZATION_ROUTE));
        assert_eq!(decision.phase, TenantPhase::NoOrganization);

        let on_setup = resolve(&input(AuthStatus::SignedIn, MembershipStatus::Loaded, &[], None, "/empresas/nova"));
        assert_eq!(on_setup.action, Action::Render);
    }

    #[test]
    fn unresolved_selection_goes_to_selection_for_any_count() {
        let one = [org("A")];
        let two = [org("A"), org("B")];
        for orgs in [&one[..], &two[..]] {
            let decision = resolve(&input(AuthStatus::SignedIn, MembershipStatus::Loaded, orgs, None, "/produtos"));
            assert_eq!(decision.action, redirect_to(SELECT_ORGANIZATION_ROUTE));
            assert_eq!(decision.phase, TenantPhase::OrganizationAmbiguous);
        }

        let on_setup = resolve(&input(
            AuthStatus::SignedIn,
            MembershipStatus::Loaded,
            &two,
            None,
            "/empresas/selecionar",
        ));
        assert_eq!(on_setup.action, Action::Render);
    }

    #[test]
    fn ready_renders_requested_route() {
        let orgs = [org("A"), org("B")];
        let decision = resolve(&input(
            AuthStatus::SignedIn,
            MembershipStatus::Loaded,
            &orgs,
            Some(&orgs[1]),
            "/produtos/123",
        ));
        assert_eq!(decision.action, Action::Render);
        assert_eq!(decision.phase, TenantPhase::Ready);
    }

    #[test]
    fn membership_failure_offers_retry_and_never_redirects() {
        let decision = resolve(&input(AuthStatus::SignedIn, MembershipStatus::Error, &[], None, "/produtos"));
        assert_eq!(decision.action, Action::Render);
        assert!(decision.retry);
        assert_eq!(decision.phase, TenantPhase::MembershipFailed);
    }

    #[test]
    fn cached_id_still_valid_is_kept() {
        let orgs = [org("A"), org("B")];
        let resolution = auto_resolve(Some(orgs[1].id), &orgs);
        assert_eq!(resolution, AutoResolution::Keep(orgs[1].clone()));
    }

    #[test]
    fn single_organization_is_auto_selected() {
        let orgs = [org("Única")];
        assert_eq!(auto_resolve(None, &orgs), AutoResolution::AutoSelect(orgs[0].clone()));
    }

    #[test]
    fn stale_cached_id_is_auto_selected_or_cleared() {
        let stale = Some(Uuid::new_v4());
        for size in 0..4 {
            let orgs: Vec<Organization> = (0..size).map(|i| org(&format!("Empresa {i}"))).collect();
            let resolution = auto_resolve(stale, &orgs);
            if size == 1 {
                assert_eq!(resolution, AutoResolution::AutoSelect(orgs[0].clone()));
            } else {
                assert_eq!(resolution, AutoResolution::Clear);
                assert!(resolution.active().is_none());
            }
        }
    }

    #[test]
    fn many_organizations_without_cache_stay_unset() {
        let orgs = [org("A"), org("B")];
        assert_eq!(auto_resolve(None, &orgs), AutoResolution::Unset);
        assert_eq!(auto_resolve(None, &[]), AutoResolution::Unset);
    }
}
