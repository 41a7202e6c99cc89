//! Source of the current user's identity.

use crate::stroke::UserId;

/// Supplies the authenticated user, if any.
///
/// Whiteboard sessions refuse to open without one.
pub trait IdentityProvider {
    fn current_user(&self) -> Option<UserId>;
}

/// Fixed identity, for tools and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<UserId>);

impl StaticIdentity {
    pub fn signed_in(user: impl Into<String>) -> Self {
        Self(Some(UserId::new(user)))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.0.clone()
    }
}

impl<F> IdentityProvider for F
where
    F: Fn() -> Option<UserId>,
{
    fn current_user(&self) -> Option<UserId> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_identity() {
        assert_eq!(
            StaticIdentity::signed_in("alice").current_user(),
            Some(UserId::new("alice"))
        );
        assert!(StaticIdentity::anonymous().current_user().is_none());
    }

    #[test]
    fn test_closure_identity() {
        let provider = || Some(UserId::new("bob"));
        assert_eq!(provider.current_user().unwrap().as_str(), "bob");
    }
}
