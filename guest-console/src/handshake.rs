// Guest Console - handshake.rs
// guest-console/src/handshake.rs
use common::envelope::Envelope;
use common::models::user::ParentUser;

/// Guest-side handshake with the embedding host. Two independent phases
/// that may interleave: the unconditional load announcement, and the
/// init/user relay driven by host messages. No retries anywhere; if the
/// host never sends `IFRAME_INIT` or `USER_AUTH` the guest simply keeps
/// waiting, since the SSO flow does not depend on either.
pub struct HandshakeController {
    url: String,
    parent_user: Option<ParentUser>,
}

impl HandshakeController {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            parent_user: None,
        }
    }

    /// The fire-and-forget load announcement, sent once at session start
    /// before any origin is trusted.
    pub fn announce(&self) -> Envelope {
        Envelope::ConsoleLoaded {
            url: self.url.clone(),
        }
    }

    /// React to a host envelope. Returns the reply to send, or `None` when
    /// the envelope is not a handshake message.
    pub fn handle(&mut self, envelope: &Envelope) -> Option<Envelope> {
        match envelope {
            Envelope::IframeInit => Some(Envelope::ConsoleReady {
                url: self.url.clone(),
            }),
            Envelope::UserAuth { user } => {
                tracing::info!("Received user identity from host: {}", user.email);
                self.parent_user = Some(user.clone());
                Some(Envelope::AuthReceived { user: user.clone() })
            }
            _ => None,
        }
    }

    /// The last identity pushed by the host, if any. Overwritten on every
    /// `USER_AUTH`, never cleared by authentication failures.
    pub fn parent_user(&self) -> Option<&ParentUser> {
        self.parent_user.as_ref()
    }
}
