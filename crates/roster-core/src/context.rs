//! The per-request identity context.

use crate::user::UserView;

/// Who is calling. Built once per request by the identity resolver and never
/// mutated afterwards; there are deliberately no setters.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
  current_user: Option<UserView>,
}

impl AuthContext {
  pub fn anonymous() -> Self { Self::default() }

  pub fn authenticated(user: UserView) -> Self {
    Self { current_user: Some(user) }
  }

  /// The resolved user, with friends expanded.
  pub fn current_user(&self) -> Option<&UserView> { self.current_user.as_ref() }

  pub fn is_authenticated(&self) -> bool { self.current_user.is_some() }
}
