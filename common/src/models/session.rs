// common/src/models/session.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of one guest-side authentication session. `Failed -> Pending`
/// is the only backward transition and happens only through `retry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthState {
    Pending,
    Authenticating,
    Authenticated,
    Failed,
}

impl AuthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthState::Pending => "pending",
            AuthState::Authenticating => "authenticating",
            AuthState::Authenticated => "authenticated",
            AuthState::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("cannot begin authentication from state {0}")]
    BeginFrom(&'static str),
    #[error("cannot complete authentication from state {0}")]
    CompleteFrom(&'static str),
    #[error("retry is only allowed from the failed state, not {0}")]
    RetryFrom(&'static str),
}

/// Guest-side authentication session. Created in `Pending` at guest start,
/// mutated only by the SSO state machine, dropped on teardown (no
/// persistence across reloads).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub state: AuthState,
    /// Email of the current/last authentication attempt.
    pub email: Option<String>,
    /// Human-readable error from the last failed attempt.
    pub error: Option<String>,
    /// Timestamp of the session's creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last state transition.
    pub updated_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            state: AuthState::Pending,
            email: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Enter `Authenticating` for the given email. Only legal from
    /// `Pending`.
    pub fn begin(&mut self, email: &str) -> Result<(), TransitionError> {
        if self.state != AuthState::Pending {
            return Err(TransitionError::BeginFrom(self.state.as_str()));
        }
        self.state = AuthState::Authenticating;
        self.email = Some(email.to_string());
        self.error = None;
        self.touch();
        Ok(())
    }

    /// Enter `Authenticated`. Only legal from `Authenticating`.
    pub fn complete(&mut self) -> Result<(), TransitionError> {
        if self.state != AuthState::Authenticating {
            return Err(TransitionError::CompleteFrom(self.state.as_str()));
        }
        self.state = AuthState::Authenticated;
        self.error = None;
        self.touch();
        Ok(())
    }

    /// Enter `Failed` with a descriptive error. Legal from any state; a
    /// request rejected before the exchange fails straight from `Pending`.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.state = AuthState::Failed;
        self.error = Some(error.into());
        self.touch();
    }

    /// User-initiated retry: back to `Pending`, clearing the error. The
    /// parent user record is owned elsewhere and deliberately untouched.
    pub fn retry(&mut self) -> Result<(), TransitionError> {
        if self.state != AuthState::Failed {
            return Err(TransitionError::RetryFrom(self.state.as_str()));
        }
        self.state = AuthState::Pending;
        self.error = None;
        self.touch();
        Ok(())
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_pending() {
        let session = AuthSession::new();
        assert_eq!(session.state, AuthState::Pending);
        assert_eq!(session.email, None);
        assert_eq!(session.error, None);
    }

    #[test]
    fn full_success_path() {
        let mut session = AuthSession::new();
        session.begin("a@dmail.ai").unwrap();
        assert_eq!(session.state, AuthState::Authenticating);
        assert_eq!(session.email.as_deref(), Some("a@dmail.ai"));
        session.complete().unwrap();
        assert_eq!(session.state, AuthState::Authenticated);
    }

    #[test]
    fn begin_is_rejected_while_authenticating() {
        let mut session = AuthSession::new();
        session.begin("a@dmail.ai").unwrap();
        let err = session.begin("b@dmail.ai").unwrap_err();
        assert_eq!(err, TransitionError::BeginFrom("authenticating"));
        assert_eq!(session.email.as_deref(), Some("a@dmail.ai"));
    }

    #[test]
    fn retry_only_from_failed() {
        let mut session = AuthSession::new();
        assert!(session.retry().is_err());
        session.fail("boom");
        assert_eq!(session.state, AuthState::Failed);
        session.retry().unwrap();
        assert_eq!(session.state, AuthState::Pending);
        assert_eq!(session.error, None);
    }
}
