// Guest Console - sso.rs
// guest-console/src/sso.rs
use common::envelope::{
    AuthStatusKind, CompletionStatus, Envelope, ReadyStatus, SsoAuthRequest, SsoCredentials,
};
use common::models::session::{AuthSession, AuthState, TransitionError};
use tokio::sync::mpsc::UnboundedSender;

use crate::exchange::{AccountSession, CredentialExchange, ExchangeError, SsoLoginParams};

/// A validated authentication attempt, ready for the credential exchange.
/// Produced by `begin_request`, consumed by the transport layer which runs
/// the exchange and feeds the result back through `finish_login`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginJob {
    pub credentials: SsoCredentials,
}

/// Guest-side SSO authentication state machine:
/// `pending -> authenticating -> authenticated | failed`, with
/// `failed -> pending` only via the explicit user retry. All host-visible
/// output goes through the outbox channel, in emission order.
///
/// The credential exchange itself is not owned here; the machine hands out
/// a `LoginJob` and is resumed with the exchange result, so the sync
/// transitions stay testable without any async runtime.
pub struct SsoAuthenticator {
    session: AuthSession,
    outbox: UnboundedSender<Envelope>,
}

impl SsoAuthenticator {
    pub fn new(outbox: UnboundedSender<Envelope>) -> Self {
        Self {
            session: AuthSession::new(),
            outbox,
        }
    }

    pub fn state(&self) -> AuthState {
        self.session.state
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    fn emit(&self, envelope: Envelope) {
        // The receiver lives as long as the owning session; a send failure
        // means teardown is already underway.
        if self.outbox.send(envelope).is_err() {
            tracing::debug!("Outbox closed, dropping envelope");
        }
    }

    /// `REQUEST_SSO_AUTH` readiness probe: answered from any state, exactly
    /// one reply, no transition.
    pub fn handle_probe(&self) {
        self.emit(Envelope::RequestSsoAuthResponse {
            status: ReadyStatus::Ready,
        });
    }

    /// Process an inbound `SSO_AUTH_REQUEST`. Returns the exchange job when
    /// the request was accepted; `None` means the request was rejected and
    /// any reporting has already been emitted.
    pub fn begin_request(&mut self, request: &SsoAuthRequest) -> Option<LoginJob> {
        match self.session.state {
            AuthState::Authenticating => {
                // One attempt in flight at a time; overlapping requests get
                // a defined rejection and leave the attempt untouched.
                tracing::warn!("Rejecting SSO request while authentication is in progress");
                self.emit(Envelope::SsoAuthComplete {
                    status: CompletionStatus::Error,
                    email: request.email.clone(),
                    error: Some("authentication already in progress".to_string()),
                });
                None
            }
            AuthState::Authenticated | AuthState::Failed => {
                tracing::debug!(
                    "Ignoring SSO request in state {}",
                    self.session.state.as_str()
                );
                None
            }
            AuthState::Pending => match request.credentials() {
                Err(err) => {
                    let message = err.to_string();
                    tracing::warn!("SSO request rejected: {}", message);
                    self.session.fail(message.clone());
                    self.emit(Envelope::SsoAuthComplete {
                        status: CompletionStatus::Error,
                        email: request.email.clone(),
                        error: Some(message),
                    });
                    None
                }
                Ok(credentials) => {
                    if let Err(err) = self.session.begin(&credentials.email) {
                        // Unreachable from Pending; logged rather than
                        // propagated so a bug cannot take the session down.
                        tracing::error!("Illegal transition: {}", err);
                        return None;
                    }
                    self.emit(Envelope::AuthStatus {
                        status: AuthStatusKind::Authenticating,
                        email: Some(credentials.email.clone()),
                    });
                    Some(LoginJob { credentials })
                }
            },
        }
    }

    /// Resume with the credential-exchange outcome.
    pub fn finish_login(&mut self, result: Result<AccountSession, ExchangeError>) {
        if self.session.state != AuthState::Authenticating {
            tracing::warn!(
                "Dropping exchange result in state {}",
                self.session.state.as_str()
            );
            return;
        }
        let email = self.session.email.clone();
        match result {
            Ok(_) => {
                if let Err(err) = self.session.complete() {
                    tracing::error!("Illegal transition: {}", err);
                    return;
                }
                self.emit(Envelope::SsoAuthComplete {
                    status: CompletionStatus::Success,
                    email,
                    error: None,
                });
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!("SSO authentication failed: {}", message);
                self.session.fail(message.clone());
                self.emit(Envelope::SsoAuthComplete {
                    status: CompletionStatus::Error,
                    email,
                    error: Some(message),
                });
            }
        }
    }

    /// User-initiated retry after a failure. Resets the machine to
    /// `pending` and nothing else; a previously received parent user record
    /// is not cleared.
    pub fn retry(&mut self) -> Result<(), TransitionError> {
        self.session.retry()
    }

    /// Run a full request against an exchange client: begin, exchange,
    /// finish. Convenience for non-actor callers and tests; the actor runs
    /// the same three steps with the exchange as a spawned future.
    pub async fn run_request<C: CredentialExchange + ?Sized>(
        &mut self,
        client: &C,
        request: &SsoAuthRequest,
    ) {
        if let Some(job) = self.begin_request(request) {
            let params = SsoLoginParams::from(&job.credentials);
            let result = client.login(&job.credentials.email, &params).await;
            self.finish_login(result);
        }
    }
}

/// Edge detector for the externally observed linked-account count. When the
/// count becomes non-zero the host is told `AUTH_STATUS{authenticated}` —
/// a signal path independent of the SSO request flow, so authentication
/// reached through other means (a pre-existing session) is still visible to
/// the host. Does not touch the state machine.
pub struct AccountWatch {
    linked_seen: bool,
}

impl AccountWatch {
    pub fn new() -> Self {
        Self { linked_seen: false }
    }

    pub fn observe(&mut self, linked_accounts: usize) -> Option<Envelope> {
        if linked_accounts == 0 {
            self.linked_seen = false;
            return None;
        }
        if self.linked_seen {
            return None;
        }
        self.linked_seen = true;
        Some(Envelope::AuthStatus {
            status: AuthStatusKind::Authenticated,
            email: None,
        })
    }
}

impl Default for AccountWatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::AccountLedger;
    use crate::exchange::DevCredentialExchange;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    struct FailingExchange {
        error: ExchangeError,
    }

    #[async_trait]
    impl CredentialExchange for FailingExchange {
        async fn login(
            &self,
            _email: &str,
            _params: &SsoLoginParams,
        ) -> Result<AccountSession, ExchangeError> {
            Err(self.error.clone())
        }
    }

    fn machine() -> (SsoAuthenticator, UnboundedReceiver<Envelope>) {
        let (tx, rx) = unbounded_channel();
        (SsoAuthenticator::new(tx), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<Envelope>) -> Vec<Envelope> {
        let mut out = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            out.push(envelope);
        }
        out
    }

    fn valid_request() -> SsoAuthRequest {
        SsoAuthRequest {
            provider: Some("dmail".to_string()),
            email: Some("a@dmail.ai".to_string()),
            user_id: Some("u1".to_string()),
            session_token: Some("t1".to_string()),
            timestamp: Some(1_724_563_200_000),
        }
    }

    #[tokio::test]
    async fn successful_flow_emits_status_then_completion() {
        let (mut sso, mut rx) = machine();
        let ledger = Arc::new(AccountLedger::new());
        let client = DevCredentialExchange::new(ledger, Duration::from_millis(1));

        sso.run_request(&client, &valid_request()).await;

        assert_eq!(sso.state(), AuthState::Authenticated);
        assert_eq!(
            drain(&mut rx),
            vec![
                Envelope::AuthStatus {
                    status: AuthStatusKind::Authenticating,
                    email: Some("a@dmail.ai".to_string()),
                },
                Envelope::SsoAuthComplete {
                    status: CompletionStatus::Success,
                    email: Some("a@dmail.ai".to_string()),
                    error: None,
                },
            ]
        );
    }

    #[test]
    fn missing_token_fails_fast_without_auth_status() {
        let (mut sso, mut rx) = machine();
        let request = SsoAuthRequest {
            session_token: None,
            ..valid_request()
        };

        assert_eq!(sso.begin_request(&request), None);

        assert_eq!(sso.state(), AuthState::Failed);
        let error = sso.session().error.clone().unwrap();
        assert!(error.contains("dmail"), "error should name the provider: {error}");
        // Exactly one emission, and it is not AUTH_STATUS.
        assert_eq!(
            drain(&mut rx),
            vec![Envelope::SsoAuthComplete {
                status: CompletionStatus::Error,
                email: Some("a@dmail.ai".to_string()),
                error: Some("missing required SSO credentials for provider dmail".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn client_not_ready_is_reported_verbatim() {
        let (mut sso, mut rx) = machine();
        let client = FailingExchange {
            error: ExchangeError::NotReady,
        };

        sso.run_request(&client, &valid_request()).await;

        assert_eq!(sso.state(), AuthState::Failed);
        let emitted = drain(&mut rx);
        assert_eq!(
            emitted.last(),
            Some(&Envelope::SsoAuthComplete {
                status: CompletionStatus::Error,
                email: Some("a@dmail.ai".to_string()),
                error: Some("Client not initialized".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn rejection_message_is_surfaced() {
        let (mut sso, mut rx) = machine();
        let client = FailingExchange {
            error: ExchangeError::Rejected("token expired".to_string()),
        };

        sso.run_request(&client, &valid_request()).await;

        assert_eq!(sso.session().error.as_deref(), Some("token expired"));
        let emitted = drain(&mut rx);
        assert!(matches!(
            emitted.last(),
            Some(Envelope::SsoAuthComplete {
                status: CompletionStatus::Error,
                error: Some(e),
                ..
            }) if e == "token expired"
        ));
    }

    #[test]
    fn probe_replies_ready_from_any_state_without_transition() {
        let (mut sso, mut rx) = machine();
        let ready = Envelope::RequestSsoAuthResponse {
            status: ReadyStatus::Ready,
        };

        sso.handle_probe();
        assert_eq!(drain(&mut rx), vec![ready.clone()]);
        assert_eq!(sso.state(), AuthState::Pending);

        sso.session.fail("boom");
        sso.handle_probe();
        assert_eq!(drain(&mut rx), vec![ready]);
        assert_eq!(sso.state(), AuthState::Failed);
    }

    #[test]
    fn overlapping_request_is_rejected_with_busy_error() {
        let (mut sso, mut rx) = machine();
        let job = sso.begin_request(&valid_request());
        assert!(job.is_some());
        drain(&mut rx);

        let second = SsoAuthRequest {
            email: Some("b@dmail.ai".to_string()),
            ..valid_request()
        };
        assert_eq!(sso.begin_request(&second), None);

        assert_eq!(sso.state(), AuthState::Authenticating);
        assert_eq!(sso.session().email.as_deref(), Some("a@dmail.ai"));
        assert_eq!(
            drain(&mut rx),
            vec![Envelope::SsoAuthComplete {
                status: CompletionStatus::Error,
                email: Some("b@dmail.ai".to_string()),
                error: Some("authentication already in progress".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn retry_after_failure_allows_a_fresh_attempt() {
        let (mut sso, mut rx) = machine();
        let failing = FailingExchange {
            error: ExchangeError::Failed,
        };
        sso.run_request(&failing, &valid_request()).await;
        assert_eq!(sso.state(), AuthState::Failed);

        sso.retry().unwrap();
        assert_eq!(sso.state(), AuthState::Pending);
        drain(&mut rx);

        let ledger = Arc::new(AccountLedger::new());
        let client = DevCredentialExchange::new(ledger, Duration::from_millis(1));
        sso.run_request(&client, &valid_request()).await;
        assert_eq!(sso.state(), AuthState::Authenticated);
    }

    #[test]
    fn request_after_failure_is_ignored_until_retry() {
        let (mut sso, mut rx) = machine();
        sso.session.fail("boom");

        assert_eq!(sso.begin_request(&valid_request()), None);
        assert_eq!(sso.state(), AuthState::Failed);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn account_watch_fires_once_per_rising_edge() {
        let mut watch = AccountWatch::new();
        assert_eq!(watch.observe(0), None);
        let fired = watch.observe(1);
        assert!(matches!(
            fired,
            Some(Envelope::AuthStatus {
                status: AuthStatusKind::Authenticated,
                email: None,
            })
        ));
        assert_eq!(watch.observe(1), None);
        assert_eq!(watch.observe(2), None);
        assert_eq!(watch.observe(0), None);
        assert!(watch.observe(3).is_some());
    }
}
