//! Authorization decisions, independent of routing.

use warbler_types::models::UserId;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// No authenticated user; send them to the login page.
    Redirect,
    Forbidden,
}

/// Decide whether `session_user` may perform `action` on resources owned by
/// `target_user`. Reads are open to any logged-in user; writes only to the
/// owner.
pub fn authorize(session_user: Option<UserId>, target_user: UserId, action: Action) -> Decision {
    match (session_user, action) {
        (None, _) => Decision::Redirect,
        (Some(_), Action::Read) => Decision::Allow,
        (Some(user), Action::Write) if user == target_user => Decision::Allow,
        (Some(_), Action::Write) => Decision::Forbidden,
    }
}

impl Decision {
    pub fn check(self) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Redirect => Err(AppError::AuthenticationRequired),
            Decision::Forbidden => Err(AppError::Forbidden),
        }
    }
}
