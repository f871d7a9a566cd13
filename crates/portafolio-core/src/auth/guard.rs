//! Route guard: decides, on every navigation, whether a view may render.

use anyhow::Result;
use tracing::{debug, info};

use super::session::{now_millis, Session, SessionContext, SessionGrant};
use super::store::KeyValueStore;
use crate::models::Role;

const ADMIN_ONLY: &[Role] = &[Role::Administrator];
const TEACHER_ONLY: &[Role] = &[Role::Teacher];
const STAFF: &[Role] = &[Role::Administrator, Role::Teacher];

/// Every view the client can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Home,
    Profile,
    AdminHome,
    AdminUsers,
    TeacherDashboard,
    Portfolios,
    PortfolioDetail(String),
}

impl Route {
    /// Views reachable without a session.
    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login)
    }

    /// Roles allowed to see the view; `None` admits any authenticated user.
    pub fn permitted_roles(&self) -> Option<&'static [Role]> {
        match self {
            Route::Login | Route::Home | Route::Profile => None,
            Route::AdminHome | Route::AdminUsers => Some(ADMIN_ONLY),
            Route::TeacherDashboard => Some(TEACHER_ONLY),
            Route::Portfolios | Route::PortfolioDetail(_) => Some(STAFF),
        }
    }

    /// Where unauthorized-but-authenticated requests are sent.
    pub fn default_landing() -> Route {
        Route::Home
    }

    /// Where a fresh login lands.
    pub fn landing_for(role: Option<Role>) -> Route {
        match role {
            Some(Role::Administrator) => Route::AdminHome,
            Some(Role::Teacher) => Route::TeacherDashboard,
            None => Route::default_landing(),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Login => "Login",
            Route::Home => "Search",
            Route::Profile => "Profile",
            Route::AdminHome => "Admin",
            Route::AdminUsers => "Teachers",
            Route::TeacherDashboard => "Dashboard",
            Route::Portfolios => "Portfolios",
            Route::PortfolioDetail(_) => "Portfolio",
        }
    }
}

/// Outcome of a guard evaluation. A redirect is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Render(Route),
    RedirectToLogin,
    RedirectToDefault,
}

/// Pure guard: session validity first, then role membership.
pub fn evaluate(session: &Session, now_ms: i64, route: &Route) -> GuardDecision {
    if route.is_public() {
        return GuardDecision::Render(route.clone());
    }

    if !session.is_valid_at(now_ms) {
        return GuardDecision::RedirectToLogin;
    }

    match route.permitted_roles() {
        Some(roles) if !session.role().is_some_and(|role| roles.contains(&role)) => {
            GuardDecision::RedirectToDefault
        }
        _ => GuardDecision::Render(route.clone()),
    }
}

/// Holds the injected session context and the currently rendered view.
#[derive(Debug)]
pub struct Router<S> {
    session: SessionContext<S>,
    current: Route,
    last_decision: GuardDecision,
}

impl<S: KeyValueStore> Router<S> {
    pub fn new(session: SessionContext<S>) -> Self {
        Self {
            session,
            current: Route::Login,
            last_decision: GuardDecision::Render(Route::Login),
        }
    }

    pub fn current(&self) -> &Route {
        &self.current
    }

    /// Decision taken by the most recent navigation.
    pub fn last_decision(&self) -> &GuardDecision {
        &self.last_decision
    }

    pub fn session(&self) -> &SessionContext<S> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionContext<S> {
        &mut self.session
    }

    /// Navigate to `route`, applying the guard. Returns the view that
    /// actually renders.
    ///
    /// A session found stale on the way to login is purged.
    pub fn navigate_at(&mut self, route: Route, now_ms: i64) -> Result<&Route> {
        let snapshot = self.session.snapshot();
        let decision = evaluate(&snapshot, now_ms, &route);

        self.current = match decision {
            GuardDecision::Render(ref target) => target.clone(),
            GuardDecision::RedirectToLogin => {
                if !snapshot.is_empty() {
                    info!(?route, "Stale session found during navigation");
                    self.session.purge()?;
                }
                Route::Login
            }
            GuardDecision::RedirectToDefault => {
                debug!(?route, role = ?snapshot.role, "Role not permitted, redirecting");
                Route::default_landing()
            }
        };
        self.last_decision = decision;
        Ok(&self.current)
    }

    pub fn navigate(&mut self, route: Route) -> Result<&Route> {
        self.navigate_at(route, now_millis())
    }

    /// Re-run the guard for the view already on screen. Returns true when
    /// the view had to change.
    pub fn revalidate_at(&mut self, now_ms: i64) -> Result<bool> {
        let before = self.current.clone();
        let after = self.navigate_at(before.clone(), now_ms)?;
        Ok(*after != before)
    }

    pub fn revalidate(&mut self) -> Result<bool> {
        self.revalidate_at(now_millis())
    }

    /// Store a fresh login and land on the role's home view.
    pub fn login_at(&mut self, grant: &SessionGrant, now_ms: i64) -> Result<&Route> {
        self.session.establish_at(grant, now_ms)?;
        let landing = Route::landing_for(self.session.snapshot().role());
        self.navigate_at(landing, now_ms)
    }

    pub fn login(&mut self, grant: &SessionGrant) -> Result<&Route> {
        self.login_at(grant, now_millis())
    }

    pub fn logout(&mut self) -> Result<()> {
        self.session.purge()?;
        self.current = Route::Login;
        self.last_decision = GuardDecision::Render(Route::Login);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::{EXPIRY_KEY, ROLE_KEY, TOKEN_KEY};
    use crate::auth::store::MemoryStore;

    const NOW: i64 = 1_700_000_000_000;
    const HOUR_MS: i64 = 3_600_000;

    fn valid_session(role: Option<&str>) -> Session {
        Session {
            token: Some("abc".to_string()),
            expiry: Some((NOW + HOUR_MS).to_string()),
            role: role.map(String::from),
            ..Session::default()
        }
    }

    fn router_with(entries: &[(&str, &str)]) -> Router<MemoryStore> {
        Router::new(SessionContext::new(MemoryStore::with_entries(entries.iter().copied())))
    }

    fn grant(role: &str) -> SessionGrant {
        SessionGrant {
            token: "abc".to_string(),
            user_id: "1".to_string(),
            role: Some(role.to_string()),
            email: None,
        }
    }

    #[test]
    fn test_valid_session_renders_requested_view() {
        let decision = evaluate(&valid_session(Some("DOCENTE")), NOW, &Route::Home);
        assert_eq!(decision, GuardDecision::Render(Route::Home));
    }

    #[test]
    fn test_invalid_session_redirects_to_login() {
        let expired = Session {
            token: Some("abc".to_string()),
            expiry: Some(NOW.to_string()),
            ..Session::default()
        };
        assert_eq!(evaluate(&expired, NOW, &Route::Home), GuardDecision::RedirectToLogin);
        assert_eq!(
            evaluate(&Session::default(), NOW, &Route::AdminUsers),
            GuardDecision::RedirectToLogin
        );
    }

    #[test]
    fn test_wrong_role_redirects_to_default() {
        let decision = evaluate(&valid_session(Some("DOCENTE")), NOW, &Route::AdminUsers);
        assert_eq!(decision, GuardDecision::RedirectToDefault);
    }

    #[test]
    fn test_missing_role_redirects_role_gated_views() {
        let session = valid_session(None);
        assert_eq!(evaluate(&session, NOW, &Route::Portfolios), GuardDecision::RedirectToDefault);
        assert_eq!(evaluate(&session, NOW, &Route::Profile), GuardDecision::Render(Route::Profile));
    }

    #[test]
    fn test_login_is_public() {
        assert_eq!(
            evaluate(&Session::default(), NOW, &Route::Login),
            GuardDecision::Render(Route::Login)
        );
    }

    #[test]
    fn test_staff_routes_admit_both_roles() {
        let detail = Route::PortfolioDetail("p1".to_string());
        for role in ["ADMINISTRADOR", "DOCENTE"] {
            assert_eq!(
                evaluate(&valid_session(Some(role)), NOW, &detail),
                GuardDecision::Render(detail.clone())
            );
        }
    }

    #[test]
    fn test_router_teacher_cannot_open_admin() {
        let expiry = (NOW + HOUR_MS).to_string();
        let mut router = router_with(&[
            (TOKEN_KEY, "abc"),
            (EXPIRY_KEY, expiry.as_str()),
            (ROLE_KEY, "DOCENTE"),
        ]);

        let rendered = router.navigate_at(Route::AdminHome, NOW).unwrap().clone();

        assert_eq!(rendered, Route::Home);
        assert_eq!(router.last_decision(), &GuardDecision::RedirectToDefault);
        assert!(router.session().is_valid_at(NOW));
    }

    #[test]
    fn test_router_purges_expired_session_on_navigation() {
        let expiry = (NOW - 1).to_string();
        let mut router = router_with(&[(TOKEN_KEY, "abc"), (EXPIRY_KEY, expiry.as_str())]);

        let rendered = router.navigate_at(Route::Portfolios, NOW).unwrap().clone();

        assert_eq!(rendered, Route::Login);
        assert!(router.session().store().is_empty());
    }

    #[test]
    fn test_router_login_lands_on_role_home() {
        let mut router = router_with(&[]);
        assert_eq!(router.login_at(&grant("ADMINISTRADOR"), NOW).unwrap(), &Route::AdminHome);

        let mut router = router_with(&[]);
        assert_eq!(router.login_at(&grant("DOCENTE"), NOW).unwrap(), &Route::TeacherDashboard);

        let mut router = router_with(&[]);
        assert_eq!(router.login_at(&grant("INVITADO"), NOW).unwrap(), &Route::Home);
    }

    #[test]
    fn test_router_revalidate_after_expiry() {
        let mut router = router_with(&[]);
        router.login_at(&grant("DOCENTE"), NOW).unwrap();

        assert!(!router.revalidate_at(NOW + 1).unwrap());
        assert!(router.revalidate_at(NOW + HOUR_MS).unwrap());
        assert_eq!(router.current(), &Route::Login);
    }

    #[test]
    fn test_router_logout() {
        let mut router = router_with(&[]);
        router.login_at(&grant("DOCENTE"), NOW).unwrap();
        router.logout().unwrap();

        assert_eq!(router.current(), &Route::Login);
        assert!(router.session().store().is_empty());
    }
}
