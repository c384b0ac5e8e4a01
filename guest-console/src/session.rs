// Guest Console - session.rs
// guest-console/src/session.rs
use common::envelope::Envelope;
use common::models::session::{AuthState, TransitionError};
use common::models::user::ParentUser;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::handshake::HandshakeController;
use crate::origin::{OriginDecision, OriginTrust};
use crate::sso::{LoginJob, SsoAuthenticator};

/// What one inbound frame amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Dropped: untrusted origin, unparseable frame, or a message with no
    /// defined reaction. Zero observable effects.
    Ignored,
    /// Handled synchronously; any replies are already in the outbox.
    Handled,
    /// An accepted SSO request; the caller must run the credential exchange
    /// and resume via `finish_login`.
    Login(LoginJob),
}

/// One host connection's view of the protocol: origin check, boundary
/// parse, then handshake/SSO dispatch. Everything the guest sends goes out
/// through the outbox channel in order. Transport-free, so the whole
/// protocol is testable without a server; the websocket actor is a thin
/// wrapper around this.
pub struct BridgeSession {
    id: Uuid,
    trust: Arc<OriginTrust>,
    handshake: HandshakeController,
    sso: SsoAuthenticator,
    outbox: UnboundedSender<Envelope>,
}

impl BridgeSession {
    pub fn new(
        id: Uuid,
        url: impl Into<String>,
        trust: Arc<OriginTrust>,
        outbox: UnboundedSender<Envelope>,
    ) -> Self {
        Self {
            id,
            trust,
            handshake: HandshakeController::new(url),
            sso: SsoAuthenticator::new(outbox.clone()),
            outbox,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn send(&self, envelope: Envelope) {
        if self.outbox.send(envelope).is_err() {
            tracing::debug!("Outbox closed, dropping envelope");
        }
    }

    /// The unconditional `CONSOLE_LOADED` announcement, sent once at
    /// session start. This is the only send allowed before a trusted
    /// origin exists (the wildcard-target case).
    pub fn announce(&self) {
        self.send(self.handshake.announce());
    }

    /// Process one raw inbound frame together with its transport origin.
    pub fn handle_raw(&mut self, origin: &str, raw: &str) -> Inbound {
        match self.trust.evaluate(origin) {
            OriginDecision::Rejected => {
                tracing::debug!("Dropping message from untrusted origin {}", origin);
                return Inbound::Ignored;
            }
            OriginDecision::Established => {
                tracing::info!("Session {} bound to origin {}", self.id, origin);
            }
            OriginDecision::Accepted => {}
        }

        let Some(envelope) = Envelope::parse(raw) else {
            return Inbound::Ignored;
        };
        tracing::debug!("Session {} received {}", self.id, envelope.type_name());

        if let Some(reply) = self.handshake.handle(&envelope) {
            self.send(reply);
            return Inbound::Handled;
        }

        match envelope {
            Envelope::RequestSsoAuth => {
                self.sso.handle_probe();
                Inbound::Handled
            }
            Envelope::SsoAuthRequest(request) => match self.sso.begin_request(&request) {
                Some(job) => Inbound::Login(job),
                None => Inbound::Handled,
            },
            // Guest-emitted types arriving inbound have no defined reaction.
            _ => Inbound::Ignored,
        }
    }

    /// Resume an accepted request with the credential-exchange outcome.
    pub fn finish_login(
        &mut self,
        result: Result<crate::exchange::AccountSession, crate::exchange::ExchangeError>,
    ) {
        self.sso.finish_login(result);
    }

    /// User-initiated retry of a failed authentication.
    pub fn retry(&mut self) -> Result<(), TransitionError> {
        self.sso.retry()
    }

    /// Ask the host to navigate the outer page.
    pub fn request_navigation(&self, url: impl Into<String>) {
        self.send(Envelope::RequestNavigation { url: url.into() });
    }

    pub fn auth_state(&self) -> AuthState {
        self.sso.state()
    }

    pub fn parent_user(&self) -> Option<&ParentUser> {
        self.handshake.parent_user()
    }

    /// Whether this connection's origin is the trusted one. Gates every
    /// send other than the initial announcement.
    pub fn is_trusted(&self, origin: &str) -> bool {
        self.trust.is_trusted(origin)
    }
}
