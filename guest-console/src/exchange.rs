// Guest Console - exchange.rs
// guest-console/src/exchange.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::envelope::SsoCredentials;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;

/// Parameters handed to the external credential-exchange client, mirroring
/// its `login(email, {sso})` call shape.
#[derive(Debug, Clone, PartialEq)]
pub struct SsoLoginParams {
    pub auth_provider: String,
    pub external_user_id: String,
    pub external_session_token: String,
}

impl From<&SsoCredentials> for SsoLoginParams {
    fn from(creds: &SsoCredentials) -> Self {
        Self {
            auth_provider: creds.provider.clone(),
            external_user_id: creds.user_id.clone(),
            external_session_token: creds.session_token.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExchangeError {
    /// The underlying client was not initialized when the exchange was
    /// attempted. Treated like any other exchange failure.
    #[error("Client not initialized")]
    NotReady,
    /// The exchange ran and the provider rejected the credentials.
    #[error("{0}")]
    Rejected(String),
    /// The exchange failed without a descriptive message.
    #[error("SSO authentication failed")]
    Failed,
}

/// An account session established by a successful exchange. Opaque to the
/// state machine, which only inspects success/error.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSession {
    pub email: String,
    pub provider: String,
    pub linked_at: DateTime<Utc>,
}

/// The external credential-exchange capability: converts SSO parameters
/// into an authenticated account session. Provider-specific token
/// verification happens on the other side of this seam.
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    async fn login(
        &self,
        email: &str,
        params: &SsoLoginParams,
    ) -> Result<AccountSession, ExchangeError>;
}

/// In-process store of linked account sessions. Backs the dev exchange and
/// the linked-account observer signal.
pub struct AccountLedger {
    linked: RwLock<Vec<AccountSession>>,
}

impl AccountLedger {
    pub fn new() -> Self {
        Self {
            linked: RwLock::new(Vec::new()),
        }
    }

    pub fn link(&self, session: AccountSession) {
        tracing::info!("Linked account for {}", session.email);
        self.linked
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(session);
    }

    pub fn linked_accounts(&self) -> usize {
        self.linked
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for AccountLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Development stand-in for the real exchange client: accepts any complete
/// set of credentials after a simulated round-trip and records the account
/// in the ledger. The real client lives outside this codebase.
pub struct DevCredentialExchange {
    ledger: std::sync::Arc<AccountLedger>,
    delay: Duration,
}

impl DevCredentialExchange {
    pub fn new(ledger: std::sync::Arc<AccountLedger>, delay: Duration) -> Self {
        Self { ledger, delay }
    }
}

#[async_trait]
impl CredentialExchange for DevCredentialExchange {
    async fn login(
        &self,
        email: &str,
        params: &SsoLoginParams,
    ) -> Result<AccountSession, ExchangeError> {
        tokio::time::sleep(self.delay).await;
        let session = AccountSession {
            email: email.to_string(),
            provider: params.auth_provider.clone(),
            linked_at: Utc::now(),
        };
        self.ledger.link(session.clone());
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn login_params_map_credential_fields() {
        let creds = SsoCredentials {
            provider: "dmail".to_string(),
            email: "a@dmail.ai".to_string(),
            user_id: "u1".to_string(),
            session_token: "t1".to_string(),
        };
        let params = SsoLoginParams::from(&creds);
        assert_eq!(params.auth_provider, "dmail");
        assert_eq!(params.external_user_id, "u1");
        assert_eq!(params.external_session_token, "t1");
    }

    #[test]
    fn exchange_errors_render_the_expected_messages() {
        assert_eq!(ExchangeError::NotReady.to_string(), "Client not initialized");
        assert_eq!(
            ExchangeError::Rejected("token expired".to_string()).to_string(),
            "token expired"
        );
        assert_eq!(ExchangeError::Failed.to_string(), "SSO authentication failed");
    }

    #[tokio::test]
    async fn dev_exchange_links_an_account() {
        let ledger = Arc::new(AccountLedger::new());
        let exchange = DevCredentialExchange::new(ledger.clone(), Duration::from_millis(1));
        assert_eq!(ledger.linked_accounts(), 0);
        let params = SsoLoginParams {
            auth_provider: "dmail".to_string(),
            external_user_id: "u1".to_string(),
            external_session_token: "t1".to_string(),
        };
        let session = exchange.login("a@dmail.ai", &params).await.unwrap();
        assert_eq!(session.email, "a@dmail.ai");
        assert_eq!(ledger.linked_accounts(), 1);
    }
}
