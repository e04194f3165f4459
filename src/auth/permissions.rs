//! Role and Permission Checks
//!
//! Every check first confirms the session is authenticated; an anonymous
//! request fails all of them. Superusers pass every permission check but
//! not role checks.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use super::errors::{AuthError, AuthResult};
use super::http::Redirect;
use super::service::Auth;
use super::session::SessionStore;
use super::user::{AuthUser, Role, UserStore};

/// One or more roles, any of which satisfies a check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCheck(Vec<Role>);

impl RoleCheck {
    pub fn roles(&self) -> &[Role] {
        &self.0
    }
}

impl From<&str> for RoleCheck {
    fn from(role: &str) -> Self {
        Self(vec![role.to_string()])
    }
}

impl From<String> for RoleCheck {
    fn from(role: String) -> Self {
        Self(vec![role])
    }
}

impl From<&[&str]> for RoleCheck {
    fn from(roles: &[&str]) -> Self {
        Self(roles.iter().map(|r| r.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for RoleCheck {
    fn from(roles: [&str; N]) -> Self {
        Self(roles.iter().map(|r| r.to_string()).collect())
    }
}

impl From<Vec<&str>> for RoleCheck {
    fn from(roles: Vec<&str>) -> Self {
        Self(roles.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for RoleCheck {
    fn from(roles: Vec<String>) -> Self {
        Self(roles)
    }
}

impl From<&[String]> for RoleCheck {
    fn from(roles: &[String]) -> Self {
        Self(roles.to_vec())
    }
}

impl From<HashSet<Role>> for RoleCheck {
    fn from(roles: HashSet<Role>) -> Self {
        Self(roles.into_iter().collect())
    }
}

/// Parse a JSON permission list. Anything but an array of strings is a
/// caller bug.
pub fn permission_list(value: &Value) -> AuthResult<Vec<String>> {
    let items = value.as_array().ok_or_else(|| {
        AuthError::InvalidArgument(format!("expected an array of permissions, got {}", value))
    })?;

    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                AuthError::InvalidArgument(format!("permission must be a string, got {}", item))
            })
        })
        .collect()
}

impl<U: AuthUser, R: UserStore<U>, S: SessionStore> Auth<U, R, S> {
    /// True iff authenticated and holding at least one of the given roles.
    pub fn has_role(&mut self, check: impl Into<RoleCheck>) -> bool {
        if !self.is_authenticated() {
            return false;
        }

        let check = check.into();
        let granted = check.roles().iter().any(|r| self.ctx.roles.contains(r));
        if !granted {
            debug!(event = "AUTH_ROLE_DENIED", roles = ?check.roles(), "role check failed");
        }
        granted
    }

    /// True iff authenticated and either a superuser or holding `perm`.
    pub fn has_perm(&mut self, perm: &str) -> bool {
        if !self.is_authenticated() {
            return false;
        }

        if self.ctx.is_superuser() {
            return true;
        }

        let granted = self.ctx.permissions.contains(perm);
        if !granted {
            debug!(event = "AUTH_PERM_DENIED", perm = perm, "permission check failed");
        }
        granted
    }

    /// True iff every permission passes [`Auth::has_perm`]. Stops at the
    /// first failure; an empty list is vacuously true.
    pub fn has_perms<I, P>(&mut self, perms: I) -> bool
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        perms.into_iter().all(|perm| self.has_perm(perm.as_ref()))
    }

    /// [`Auth::has_perms`] over a JSON list, e.g. one read from a route
    /// table. A non-array is `InvalidArgument`.
    pub fn has_perms_value(&mut self, perms: &Value) -> AuthResult<bool> {
        let perms = permission_list(perms)?;
        Ok(self.has_perms(perms))
    }

    /// Gate: send anonymous users to `route`, or the configured login
    /// route. Propagate the error with `?`.
    pub fn require_login(&mut self, route: Option<&str>) -> Result<(), Redirect> {
        if self.is_authenticated() {
            return Ok(());
        }
        Err(Redirect::to(route.unwrap_or(self.config.login_route.as_str())))
    }

    /// Gate: send users lacking `perm` to `route`, or the configured
    /// unauthorized route.
    pub fn require_perm(&mut self, perm: &str, route: Option<&str>) -> Result<(), Redirect> {
        if self.has_perm(perm) {
            return Ok(());
        }
        Err(Redirect::to(route.unwrap_or(self.config.unauthorized_route.as_str())))
    }

    /// Gate: like [`Auth::require_perm`] for roles.
    pub fn require_role(
        &mut self,
        check: impl Into<RoleCheck>,
        route: Option<&str>,
    ) -> Result<(), Redirect> {
        if self.has_role(check) {
            return Ok(());
        }
        Err(Redirect::to(route.unwrap_or(self.config.unauthorized_route.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::crypto::test_manager;
    use crate::auth::service::tests::{Fixture, TestAuth};
    use crate::auth::user::User;
    use serde_json::json;

    fn logged_in(fx: &Fixture, user: User) -> TestAuth {
        let username = user.username.clone();
        let hash = test_manager().hash("pw").unwrap();
        let mut user = user;
        user.set_password_hash(hash);
        fx.add(user);

        let mut auth = fx.request(None);
        auth.login(&username, "pw").unwrap();
        auth
    }

    #[test]
    fn test_has_role_any_of() {
        let fx = Fixture::new();
        let mut auth = logged_in(&fx, User::new("alice", "").with_roles(["editor"]));

        assert!(auth.has_role(["admin", "editor"]));
        assert!(!auth.has_role("admin"));
        assert!(auth.has_role("editor"));
        assert!(!auth.has_role(Vec::<String>::new()));
    }

    #[test]
    fn test_has_role_anonymous() {
        let fx = Fixture::new();
        let mut auth = fx.request(None);
        assert!(!auth.has_role("editor"));
    }

    #[test]
    fn test_superuser_does_not_bypass_roles() {
        let fx = Fixture::new();
        let mut auth = logged_in(&fx, User::new("root", "").superuser());
        assert!(!auth.has_role("admin"));
    }

    #[test]
    fn test_has_perm() {
        let fx = Fixture::new();
        let mut auth = logged_in(&fx, User::new("alice", "").with_permissions(["can_edit"]));

        assert!(auth.has_perm("can_edit"));
        assert!(!auth.has_perm("can_delete"));
    }

    #[test]
    fn test_superuser_bypass() {
        let fx = Fixture::new();
        let mut auth = logged_in(&fx, User::new("root", "").superuser());

        assert!(auth.has_perm("anything"));
        assert!(auth.has_perms(["a", "b", "c"]));
    }

    #[test]
    fn test_has_perm_anonymous() {
        let fx = Fixture::new();
        let mut auth = fx.request(None);
        assert!(!auth.has_perm("can_edit"));
    }

    #[test]
    fn test_has_perms_and_semantics() {
        let fx = Fixture::new();
        let mut auth = logged_in(
            &fx,
            User::new("alice", "").with_permissions(["can_edit", "can_view"]),
        );

        assert!(auth.has_perms(Vec::<&str>::new()));
        assert!(auth.has_perms(["can_edit"]));
        assert!(auth.has_perms(["can_edit", "can_view"]));
        assert!(!auth.has_perms(["can_edit", "can_delete"]));
        assert!(!auth.has_perms(["can_delete", "can_edit"]));
    }

    #[test]
    fn test_has_perms_single_matches_has_perm() {
        let fx = Fixture::new();
        let mut auth = logged_in(&fx, User::new("alice", "").with_permissions(["p"]));

        for perm in ["p", "q"] {
            let single = auth.has_perm(perm);
            assert_eq!(auth.has_perms([perm]), single);
        }
    }

    #[test]
    fn test_has_perms_value() {
        let fx = Fixture::new();
        let mut auth = logged_in(&fx, User::new("alice", "").with_permissions(["can_edit"]));

        assert!(auth.has_perms_value(&json!(["can_edit"])).unwrap());
        assert!(!auth.has_perms_value(&json!(["can_edit", "can_delete"])).unwrap());
        assert!(auth.has_perms_value(&json!([])).unwrap());
    }

    #[test]
    fn test_has_perms_value_rejects_non_sequence() {
        let fx = Fixture::new();
        let mut auth = fx.request(None);

        let result = auth.has_perms_value(&json!("can_edit"));
        assert!(matches!(result, Err(AuthError::InvalidArgument(_))));

        let result = auth.has_perms_value(&json!(["can_edit", 7]));
        assert!(matches!(result, Err(AuthError::InvalidArgument(_))));

        // Programmer errors are not security events
        assert!(auth.last_error().is_none());
    }

    #[test]
    fn test_require_login() {
        let fx = Fixture::new();
        let mut anon = fx.request(None);

        assert_eq!(anon.require_login(None), Err(Redirect::to("login")));
        assert_eq!(
            anon.require_login(Some("/signin")),
            Err(Redirect::to("/signin"))
        );

        let mut auth = logged_in(&fx, User::new("alice", ""));
        assert_eq!(auth.require_login(None), Ok(()));
    }

    #[test]
    fn test_require_perm() {
        let fx = Fixture::new();
        let mut auth = logged_in(&fx, User::new("alice", "").with_permissions(["can_edit"]));

        assert_eq!(auth.require_perm("can_edit", None), Ok(()));
        assert_eq!(
            auth.require_perm("can_delete", None),
            Err(Redirect::to("unauthorized-access"))
        );
        assert_eq!(
            auth.require_perm("can_delete", Some("/nope")),
            Err(Redirect::to("/nope"))
        );
    }

    #[test]
    fn test_require_role() {
        let fx = Fixture::new();
        let mut auth = logged_in(&fx, User::new("alice", "").with_roles(["editor"]));

        assert_eq!(auth.require_role("editor", None), Ok(()));
        assert_eq!(
            auth.require_role("admin", None),
            Err(Redirect::to("unauthorized-access"))
        );
    }

    #[test]
    fn test_gate_aborts_protected_logic() {
        fn protected(auth: &mut TestAuth, ran: &mut bool) -> Result<(), Redirect> {
            auth.require_perm("can_delete", None)?;
            *ran = true;
            Ok(())
        }

        let fx = Fixture::new();
        let mut auth = fx.request(None);
        let mut ran = false;

        assert!(protected(&mut auth, &mut ran).is_err());
        assert!(!ran);
    }

    #[test]
    fn test_permission_list() {
        assert_eq!(
            permission_list(&json!(["a", "b"])).unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(permission_list(&json!({"a": 1})).is_err());
    }
}
